use anyhow::{Context, Result, anyhow, bail};
use schemars::{Schema, schema_for};
use serde_valid::Validate;
use std::path::Path;
use tracing::debug;

use super::models::{AircraftRates, Config};
use crate::scheduler::TimeOfDay;

/// Load configuration from a string slice (no environment overrides).
pub fn load_from_str(s: &str) -> Result<Config> {
    let cfg: Config =
        serde_json::from_str(s).context("Failed to parse JSON config string into Config")?;
    validate_config(&cfg)?;
    Ok(cfg)
}

/// Load configuration from a file path asynchronously (Tokio), then apply
/// environment overrides for secrets and validate the result.
///
/// A missing file is not an error: defaults plus environment are used, which
/// matches container deployments that only pass secrets through the env.
pub async fn load_from_path_async<P: AsRef<Path>>(path: P) -> Result<Config> {
    use tokio::fs;
    let path_ref = path.as_ref();
    let mut cfg = match fs::read(path_ref).await {
        Ok(bytes) => serde_json::from_slice::<Config>(&bytes)
            .with_context(|| format!("Failed to parse JSON config from {}", path_ref.display()))?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(
                target: "fbowatch::config",
                path = %path_ref.display(),
                "Config file not found; using defaults"
            );
            Config::default()
        }
        Err(e) => {
            return Err(e)
                .with_context(|| format!("Failed to read config file {}", path_ref.display()));
        }
    };
    apply_env_overrides(&mut cfg, |key| std::env::var(key).ok())?;
    validate_config(&cfg)?;
    debug!(target: "fbowatch::config", path = %path_ref.display(), "Loaded config");
    Ok(cfg)
}

/// Overlay secrets from the environment.
///
/// - `FBOHOOK` -> `channel.webhook_url`
/// - `FSEUSER` -> `feed.user_key`
/// - `FSEGROUP1`, `FSEGROUP2`, ... -> `feed.access_keys` (read until the first gap)
/// - `AIRCRAFT` -> `maintenance.aircraft`, a JSON object of registration to hourly rate
///
/// Values equal to `Not Set` are ignored, as are empty strings.
pub fn apply_env_overrides<F>(cfg: &mut Config, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.is_empty() && v != "Not Set");

    if let Some(hook) = get("FBOHOOK") {
        cfg.channel.webhook_url = hook;
    }
    if let Some(user) = get("FSEUSER") {
        cfg.feed.user_key = user;
    }

    let groups: Vec<String> = (1..)
        .map(|i| get(&format!("FSEGROUP{i}")))
        .take_while(Option::is_some)
        .flatten()
        .collect();
    if !groups.is_empty() {
        cfg.feed.access_keys = groups;
    }

    if let Some(raw) = get("AIRCRAFT") {
        cfg.maintenance.aircraft = serde_json::from_str::<AircraftRates>(&raw)
            .context("AIRCRAFT must be a JSON object of registration to hourly rate")?;
    }
    Ok(())
}

/// Generate the JSON Schema for the Config model (for external validation or tooling).
pub fn generate_schema() -> Schema {
    schema_for!(Config)
}

/// Range checks (derived) plus cross-field checks the derive cannot express.
pub fn validate_config(cfg: &Config) -> Result<()> {
    cfg.validate()
        .map_err(|e| anyhow!("Invalid configuration: {e}"))?;

    for (idx, raw) in cfg.schedule.check_times.iter().enumerate() {
        raw.parse::<TimeOfDay>()
            .with_context(|| format!("Invalid schedule.check_times[{idx}]"))?;
    }

    if cfg.maintenance.is_enabled() {
        cfg.maintenance
            .report_time
            .parse::<TimeOfDay>()
            .context("Invalid maintenance.report_time")?;
        for (reg, rate) in &cfg.maintenance.aircraft {
            if !rate.is_finite() || *rate < 0.0 {
                bail!("Aircraft '{}' has an invalid hourly rate {}", reg, rate);
            }
        }
    }

    Ok(())
}
