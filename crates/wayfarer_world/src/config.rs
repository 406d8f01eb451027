//! # Engine Configuration
//!
//! Plain configuration structs loaded once at startup, optionally from
//! TOML. No runtime reflection; a parse failure is fatal.

use serde::Deserialize;

use crate::error::{CatalogError, CatalogResult};
use crate::streaming::StreamingConfig;

/// Top-level engine configuration.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Streaming cache policy.
    pub streaming: StreamingConfig,
    /// Frame-time target in milliseconds (60 FPS default).
    pub target_frame_time_ms: f32,
    /// Whether sustained severe overload may trigger the emergency
    /// de-optimization path.
    pub aggressive_optimization: bool,
    /// Side-bias factor pulling wild personalities to left branches.
    pub left_path_bias: f32,
    /// Side-bias factor pulling scenic personalities to right branches.
    pub right_path_bias: f32,
    /// Event channel capacity.
    pub event_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            streaming: StreamingConfig::default(),
            target_frame_time_ms: 1_000.0 / 60.0,
            aggressive_optimization: false,
            left_path_bias: 0.6,
            right_path_bias: 0.7,
            event_capacity: 1024,
        }
    }
}

impl EngineConfig {
    /// Parses a configuration from TOML.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Parse`] when the source is malformed.
    pub fn from_toml_str(source: &str) -> CatalogResult<Self> {
        toml::from_str(source).map_err(|e| CatalogError::Parse(e.to_string()))
    }
}
