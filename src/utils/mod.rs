//! Utilities for fbowatch.
//!
//! Submodules:
//! - `interpolation`: `{{var}}` expansion for feed URL templates.
//! - `table`: fixed-width column rendering for message bodies.

pub mod interpolation;
pub mod table;

#[cfg(test)]
pub(crate) mod test_server;
