//! Channel sinks.
//!
//! A sink posts one `(title, body)` message to the outbound channel. The
//! worker never looks at why a send failed; any error leaves the entry queued.

use anyhow::{Result, bail};
use serde_json::json;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::config::ChannelConfig;

/// Embed limits enforced by the webhook endpoint.
const MAX_TITLE_CHARS: usize = 256;
const MAX_DESCRIPTION_CHARS: usize = 4096;

#[derive(Debug, Error)]
pub enum SinkError {
    /// The request never got a response (DNS, connect, timeout...).
    #[error("channel transport error: {0}")]
    Transport(String),

    /// The endpoint answered with a non-success status.
    #[error("channel rejected message with status {status}: {detail}")]
    Rejected { status: u16, detail: String },
}

/// Outbound channel collaborator.
pub trait ChannelSink: Send + Sync {
    fn send(&self, title: &str, body: &str) -> impl Future<Output = Result<(), SinkError>> + Send;
}

/// Posts messages as a single embed to a Discord-compatible webhook.
#[derive(Debug, Clone)]
pub struct WebhookSink {
    client: reqwest::Client,
    url: String,
}

impl WebhookSink {
    pub fn from_config(cfg: &ChannelConfig) -> Result<Self> {
        if cfg.webhook_url.trim().is_empty() {
            bail!("No channel webhook configured (set channel.webhook_url or FBOHOOK)");
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            url: cfg.webhook_url.clone(),
        })
    }
}

impl ChannelSink for WebhookSink {
    async fn send(&self, title: &str, body: &str) -> Result<(), SinkError> {
        let response = self
            .client
            .post(&self.url)
            .json(&embed_payload(title, body))
            .send()
            .await
            .map_err(|e| SinkError::Transport(e.without_url().to_string()))?;

        let status = response.status();
        if status.is_success() {
            debug!(
                target: "fbowatch::delivery",
                status = status.as_u16(),
                "Webhook accepted message"
            );
            return Ok(());
        }
        let detail = response.text().await.unwrap_or_default();
        Err(SinkError::Rejected {
            status: status.as_u16(),
            detail: truncate(&detail, 200),
        })
    }
}

/// Webhook body: one embed, title omitted when empty.
fn embed_payload(title: &str, body: &str) -> serde_json::Value {
    let mut embed = serde_json::Map::new();
    if !title.is_empty() {
        embed.insert("title".into(), json!(truncate(title, MAX_TITLE_CHARS)));
    }
    if !body.is_empty() || title.is_empty() {
        let description = if body.is_empty() { "(empty notification)" } else { body };
        embed.insert(
            "description".into(),
            json!(truncate(description, MAX_DESCRIPTION_CHARS)),
        );
    }
    json!({ "embeds": [embed] })
}

/// Cut `s` to at most `max` characters, marking the cut with an ellipsis.
fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}
