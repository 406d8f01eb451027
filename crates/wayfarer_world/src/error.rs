//! # Catalog Error Types
//!
//! Configuration errors are fatal at load time. There are no silent
//! defaults for a malformed catalog.

use thiserror::Error;
use wayfarer_shared::Biome;

/// Errors raised while loading or editing biome configuration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CatalogError {
    /// A biome has no entry in the catalog.
    #[error("biome {} is missing from the catalog", .0.name())]
    MissingBiome(Biome),

    /// A biome's transition graph has no outgoing edges.
    #[error("biome {} has no valid transitions", .0.name())]
    NoTransitions(Biome),

    /// A biome lists itself-excluded or otherwise invalid targets.
    #[error("biome {} lists {} as a transition target but {} is not in the catalog",
            .from.name(), .to.name(), .to.name())]
    UnknownTransitionTarget {
        /// Biome whose rules reference the target.
        from: Biome,
        /// The target missing from the catalog.
        to: Biome,
    },

    /// A probability or penalty factor fell outside `[0, 1]`.
    #[error("biome {}: {field} = {value} is outside [0, 1]", .biome.name())]
    ProbabilityOutOfRange {
        /// Biome carrying the bad value.
        biome: Biome,
        /// Field name for diagnostics.
        field: &'static str,
        /// The offending value.
        value: f32,
    },

    /// LOD distance thresholds must be strictly increasing.
    #[error("LOD thresholds for {} are not strictly increasing", .0.name())]
    NonMonotonicLod(Biome),

    /// An LOD distance threshold fell outside its documented clamp range.
    #[error("LOD threshold {field} = {value} for {} is outside [{min}, {max}]", .biome.name())]
    LodDistanceOutOfRange {
        /// Biome carrying the bad config.
        biome: Biome,
        /// Field name for diagnostics.
        field: &'static str,
        /// The offending value.
        value: f32,
        /// Lower clamp bound.
        min: f32,
        /// Upper clamp bound.
        max: f32,
    },

    /// The TOML source failed to parse.
    #[error("failed to parse configuration: {0}")]
    Parse(String),
}

/// Result type for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;
