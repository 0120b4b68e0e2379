/*!
Delivery module for fbowatch.

This module wires together:
- `sink`: the `ChannelSink` collaborator trait and the webhook implementation
- `worker`: `DeliveryWorker`, the interval loop that drains the queue into a sink

Typical usage:
```no_run
use fbowatch::config::Config;
use fbowatch::delivery::{DeliveryWorker, WebhookSink};
use tokio_util::sync::CancellationToken;

# async fn demo(cfg: Config) -> anyhow::Result<()> {
let sink = WebhookSink::from_config(&cfg.channel)?;
let worker = DeliveryWorker::new(&cfg, sink);
worker.run(CancellationToken::new()).await;
# Ok(())
# }
```
*/

pub mod sink;
pub mod worker;

pub use sink::{ChannelSink, SinkError, WebhookSink};
pub use worker::{DeliveryReport, DeliveryWorker};
