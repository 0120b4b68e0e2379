//! Configuration module for fbowatch.
//!
//! This module wires together the data models and loading/validation helpers used
//! throughout the crate. Import from here for a convenient, stable API.
//!
//! Example:
//! use fbowatch::config::{Config, load_from_path_async};
//!
//! let cfg = load_from_path_async("config/fbowatch.json").await?;

pub mod loader;
pub mod models;

// Re-export core data models
pub use models::{
    AircraftRates, ChannelConfig, Config, FeedConfig, MaintenanceConfig, QueueConfig,
    ScheduleConfig, Thresholds,
};

// Re-export loader utilities
pub use loader::{
    apply_env_overrides, generate_schema, load_from_path_async, load_from_str, validate_config,
};
