//! Local CSV feed source.
//!
//! Reads the same CSV layout as the live feed from files on disk. Used for
//! offline runs (`--feed-file`) against captured feed exports.

use std::path::PathBuf;
use tokio::fs as afs;
use tracing::info;

use super::{FeedError, FeedSnapshot, FeedSource, decode};

/// Reads snapshots from local CSV files, concatenated in the given order.
#[derive(Debug, Clone)]
pub struct FileFeed {
    paths: Vec<PathBuf>,
}

impl FileFeed {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }
}

impl FeedSource for FileFeed {
    fn name(&self) -> &str {
        "file"
    }

    async fn fetch(&self) -> Result<FeedSnapshot, FeedError> {
        let mut parts = Vec::with_capacity(self.paths.len());
        for path in &self.paths {
            let bytes = afs::read(path)
                .await
                .map_err(|e| FeedError::unavailable(path.display().to_string(), e))?;
            parts.push(decode::parse_snapshot(bytes.as_slice())?);
        }
        let snapshot = FeedSnapshot::concat(parts);
        info!(
            target: "fbowatch::feed",
            files = self.paths.len(),
            rows = snapshot.len(),
            "Loaded FBO feeds from disk"
        );
        Ok(snapshot)
    }
}
