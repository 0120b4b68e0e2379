//! HTTP feed source.
//!
//! Issues one GET per configured access key, in configuration order, and
//! concatenates the decoded snapshots. Any request or decode failure fails
//! the whole fetch; partial snapshots are never returned.
//!
//! URLs carry secrets (user and access keys), so logs refer to feeds by
//! position only.

use anyhow::{Result, bail};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{FeedError, FeedSnapshot, FeedSource, decode};
use crate::config::FeedConfig;
use crate::utils::interpolation::{has_unexpanded_tokens, interpolate_string};

/// Fetches the FBO feed over HTTP.
#[derive(Debug, Clone)]
pub struct HttpFeed {
    client: reqwest::Client,
    urls: Vec<String>,
}

impl HttpFeed {
    /// Build the request list from config. Fails if no access key is configured.
    pub fn from_config(cfg: &FeedConfig) -> Result<Self> {
        if cfg.access_keys.is_empty() {
            bail!("No feed access keys configured (set feed.access_keys or FSEGROUP1..n)");
        }
        let urls = feed_urls(cfg);
        if urls.iter().any(|u| has_unexpanded_tokens(u)) {
            warn!(
                target: "fbowatch::feed",
                "Feed URL template has unknown tokens; requests will likely fail"
            );
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;
        Ok(Self { client, urls })
    }

    async fn fetch_one(&self, index: usize, url: &str) -> Result<FeedSnapshot, FeedError> {
        let origin = format!("feed {}/{}", index + 1, self.urls.len());
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| FeedError::unavailable(&origin, e.without_url()))?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| FeedError::unavailable(&origin, e.without_url()))?;
        debug!(target: "fbowatch::feed", %origin, bytes = bytes.len(), "Feed downloaded");
        Ok(decode::parse_snapshot(&bytes[..])?)
    }
}

impl FeedSource for HttpFeed {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch(&self) -> Result<FeedSnapshot, FeedError> {
        let mut parts = Vec::with_capacity(self.urls.len());
        for (index, url) in self.urls.iter().enumerate() {
            parts.push(self.fetch_one(index, url).await?);
        }
        let snapshot = FeedSnapshot::concat(parts);
        info!(
            target: "fbowatch::feed",
            feeds = self.urls.len(),
            rows = snapshot.len(),
            "Fetched FBO feeds"
        );
        Ok(snapshot)
    }
}

/// Expand the URL template once per access key.
fn feed_urls(cfg: &FeedConfig) -> Vec<String> {
    cfg.access_keys
        .iter()
        .map(|key| {
            let vars = HashMap::from([
                ("user_key", cfg.user_key.clone()),
                ("access_key", key.clone()),
            ]);
            interpolate_string(&cfg.url_template, &vars)
        })
        .collect()
}
