//! CSV decoding for the FBO feed.
//!
//! Required columns are resolved by header name once per feed; extra columns
//! are ignored and column order does not matter.

use csv::{ReaderBuilder, StringRecord, Trim};
use std::io::Read;
use tracing::warn;

use super::{DataShapeError, FboRecord, FeedSnapshot};

pub const COL_AIRPORT: &str = "Airport";
pub const COL_SUPPLIED_DAYS: &str = "SuppliedDays";
pub const COL_JET_A: &str = "FuelJetA";
pub const COL_JET_A_PRICE: &str = "PriceJetAGal";
pub const COL_AVGAS: &str = "Fuel100LL";
pub const COL_AVGAS_PRICE: &str = "Price100LLGal";

/// Header positions for a set of required column names.
#[derive(Debug)]
pub struct Columns<const N: usize> {
    names: [&'static str; N],
    positions: [usize; N],
}

impl<const N: usize> Columns<N> {
    /// Resolve every name in `names` against `headers`.
    pub fn resolve(
        headers: &StringRecord,
        names: [&'static str; N],
    ) -> Result<Self, DataShapeError> {
        let mut positions = [0usize; N];
        for (slot, name) in positions.iter_mut().zip(names) {
            *slot = headers
                .iter()
                .position(|h| h.trim_start_matches('\u{feff}') == name)
                .ok_or(DataShapeError::MissingColumn(name))?;
        }
        Ok(Self { names, positions })
    }

    /// Raw cell for the `i`-th requested column.
    pub fn text<'r>(
        &self,
        record: &'r StringRecord,
        i: usize,
        row: usize,
    ) -> Result<&'r str, DataShapeError> {
        record
            .get(self.positions[i])
            .ok_or_else(|| DataShapeError::Malformed {
                row,
                reason: format!("missing value for column '{}'", self.names[i]),
            })
    }

    /// Numeric cell for the `i`-th requested column.
    pub fn number(
        &self,
        record: &StringRecord,
        i: usize,
        row: usize,
    ) -> Result<f64, DataShapeError> {
        let raw = self.text(record, i, row)?;
        raw.parse::<f64>()
            .ok()
            .filter(|v| !v.is_nan())
            .ok_or_else(|| DataShapeError::NotANumber {
                row,
                column: self.names[i],
                value: raw.to_string(),
            })
    }
}

/// Build a CSV reader configured the way every feed is read.
pub fn reader<R: Read>(input: R) -> csv::Reader<R> {
    ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .flexible(true)
        .from_reader(input)
}

/// Decode one feed into a snapshot.
///
/// A missing column or unreadable CSV fails the whole feed. A row with an
/// empty or non-numeric cell is skipped with a warning; the other rows are
/// still evaluated.
///
/// Row numbers are 1-based data rows (the header is not counted).
pub fn parse_snapshot<R: Read>(input: R) -> Result<FeedSnapshot, DataShapeError> {
    let mut rdr = reader(input);
    let headers = rdr
        .headers()
        .map_err(|e| DataShapeError::Malformed {
            row: 0,
            reason: e.to_string(),
        })?
        .clone();

    let cols = Columns::resolve(
        &headers,
        [
            COL_AIRPORT,
            COL_SUPPLIED_DAYS,
            COL_JET_A,
            COL_JET_A_PRICE,
            COL_AVGAS,
            COL_AVGAS_PRICE,
        ],
    )?;

    let mut records = Vec::new();
    for (idx, result) in rdr.records().enumerate() {
        let row = idx + 1;
        let record = result.map_err(|e| DataShapeError::Malformed {
            row,
            reason: e.to_string(),
        })?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        match decode_row(&cols, &record, row) {
            Ok(fbo) => records.push(fbo),
            Err(e) => warn!(target: "fbowatch::feed", error = %e, "Skipping feed row"),
        }
    }

    Ok(FeedSnapshot::new(records))
}

fn decode_row(
    cols: &Columns<6>,
    record: &StringRecord,
    row: usize,
) -> Result<FboRecord, DataShapeError> {
    Ok(FboRecord {
        airport_code: cols.text(record, 0, row)?.to_string(),
        supplied_days: cols.number(record, 1, row)?,
        jet_a_quantity: cols.number(record, 2, row)?,
        jet_a_price_per_gal: cols.number(record, 3, row)?,
        avgas_quantity: cols.number(record, 4, row)?,
        avgas_price_per_gal: cols.number(record, 5, row)?,
    })
}
