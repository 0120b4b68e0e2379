/*!
FBO feed module.

Holds the typed view of one evaluation cycle's data and the collaborator
trait used to obtain it:

- `FboRecord`    -> one row of the FBO feed, validated once on decode
- `FeedSnapshot` -> ordered rows for one cycle (several feeds concatenated)
- `FeedSource`   -> anything that can produce a snapshot
- `decode.rs`    -> CSV decoding with column validation
- `http.rs`      -> `HttpFeed`, one GET per configured access key
- `file.rs`      -> `FileFeed`, local CSV files (offline / test mode)

Column lookups happen once, in `decode::parse_snapshot`. Everything downstream
works on `FboRecord` fields and cannot hit a missing column.
*/

use std::future::Future;
use thiserror::Error;

pub mod decode;
pub mod file;
pub mod http;

pub use file::FileFeed;
pub use http::HttpFeed;

/// Failure to obtain a usable snapshot. Either variant aborts the check cycle.
#[derive(Debug, Error)]
pub enum FeedError {
    /// Fetching (or reading) the raw feed failed.
    #[error("feed unavailable from {origin}: {reason}")]
    Unavailable { origin: String, reason: String },

    /// The feed arrived but does not have the expected shape.
    #[error("feed data shape error: {0}")]
    DataShape(#[from] DataShapeError),
}

impl FeedError {
    pub fn unavailable(origin: impl Into<String>, reason: impl ToString) -> Self {
        Self::Unavailable {
            origin: origin.into(),
            reason: reason.to_string(),
        }
    }
}

/// Specific shape problems found while decoding a feed.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DataShapeError {
    #[error("missing required column '{0}'")]
    MissingColumn(&'static str),

    #[error("row {row}: column '{column}' is not a number: '{value}'")]
    NotANumber {
        row: usize,
        column: &'static str,
        value: String,
    },

    #[error("row {row}: {reason}")]
    Malformed { row: usize, reason: String },
}

/// One FBO as reported by the feed.
#[derive(Debug, Clone, PartialEq)]
pub struct FboRecord {
    pub airport_code: String,
    pub supplied_days: f64,
    /// Jet-A on hand, kg.
    pub jet_a_quantity: f64,
    /// Jet-A price per gallon; 0 means the FBO does not sell Jet-A.
    pub jet_a_price_per_gal: f64,
    /// 100LL on hand, kg.
    pub avgas_quantity: f64,
    /// 100LL price per gallon; 0 means the FBO does not sell avgas.
    pub avgas_price_per_gal: f64,
}

impl FboRecord {
    pub fn sells_jet_a(&self) -> bool {
        self.jet_a_price_per_gal != 0.0
    }

    pub fn sells_avgas(&self) -> bool {
        self.avgas_price_per_gal != 0.0
    }
}

/// Immutable, ordered rows for one evaluation cycle.
///
/// Order is feed arrival order. Rows are not deduplicated: an airport present
/// in two feeds appears twice.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedSnapshot {
    records: Vec<FboRecord>,
}

impl FeedSnapshot {
    pub fn new(records: Vec<FboRecord>) -> Self {
        Self { records }
    }

    /// Concatenate snapshots, preserving the order of both the parts and their rows.
    pub fn concat<I>(parts: I) -> Self
    where
        I: IntoIterator<Item = FeedSnapshot>,
    {
        Self {
            records: parts.into_iter().flat_map(|s| s.records).collect(),
        }
    }

    pub fn records(&self) -> &[FboRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FboRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl<'a> IntoIterator for &'a FeedSnapshot {
    type Item = &'a FboRecord;
    type IntoIter = std::slice::Iter<'a, FboRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Collaborator that produces a snapshot for one check cycle.
pub trait FeedSource: Send + Sync {
    /// Human-readable identifier (used in logs and diagnostics).
    fn name(&self) -> &str;

    /// Fetch and decode every configured feed, concatenated in order.
    fn fetch(&self) -> impl Future<Output = Result<FeedSnapshot, FeedError>> + Send;
}
