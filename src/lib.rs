#![forbid(unsafe_code)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! fbowatch: watches FSE FBO inventory and relays warnings to a chat channel.
//!
//! Two long-running processes share one file:
//! - the checker fetches the FBO feed on a schedule, evaluates threshold rules
//!   and appends the resulting notifications to a JSON queue file;
//! - the delivery worker drains that file into a webhook once a minute.
//!
//! Modules:
//! - `config`: Configuration models, loader, and schema helpers.
//! - `feed`: Typed FBO records, CSV decoding and feed sources (HTTP, file).
//! - `rules`: Supply, Jet-A and avgas threshold rules.
//! - `queue`: The locked, file-backed notification queue.
//! - `delivery`: Channel sinks and the delivery worker loop.
//! - `scheduler`: Timetable and the job runner for the checker process.
//! - `report`: Monthly flight-hour maintenance report.
//! - `utils`: Template interpolation and table formatting.
//!
//! Use `fbowatch::prelude::*` to bring commonly used items into scope quickly.

pub mod config;
pub mod delivery;
pub mod feed;
pub mod notification;
pub mod queue;
pub mod report;
pub mod rules;
pub mod scheduler;
pub mod utils;

/// Crate-level constants for consumers that want to inspect package metadata at runtime.
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Returns the crate version (e.g., "0.1.0").
#[inline]
pub const fn version() -> &'static str {
    PKG_VERSION
}

/// Parse a simple level name (trace|debug|info|warn|error).
pub fn parse_level(s: &str) -> Option<tracing::Level> {
    use tracing::Level;
    match s.to_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" | "warning" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

/// Initialize tracing (logging).
/// - Uses `level` when given, else the `RUST_LOG` environment variable as a simple level.
/// - Falls back to `info` level.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init_tracing(level: Option<&str>) {
    use tracing_subscriber::fmt;

    let level = level
        .map(str::to_string)
        .or_else(|| std::env::var("RUST_LOG").ok())
        .and_then(|s| parse_level(&s))
        .unwrap_or(tracing::Level::INFO);

    // Ignore the error if the global subscriber was already set.
    let _ = fmt().with_max_level(level).try_init();
}

/// A convenient set of exports for most consumers.
///
/// Bring this into scope with:
/// `use fbowatch::prelude::*;`
pub mod prelude {
    // Common result/error handling
    pub use anyhow::{Context, Error, Result, anyhow, bail, ensure};

    // Tracing macros
    pub use tracing::{debug, error, info, instrument, trace, warn};

    // Frequently used types
    pub use crate::config::Config;
    pub use crate::delivery::{ChannelSink, DeliveryWorker, WebhookSink};
    pub use crate::feed::{FboRecord, FeedSnapshot, FeedSource, FileFeed, HttpFeed};
    pub use crate::notification::NotificationEvent;
    pub use crate::queue::{NotificationQueue, QueueEntry, QueueError};
    pub use crate::rules::RuleEvaluator;
    pub use crate::scheduler::{CheckRunner, Job, Schedule};
}
