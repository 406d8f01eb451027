//! # WAYFARER World Engine
//!
//! Procedural world streaming and biome generation for an endless
//! exploration ride.
//!
//! ## Design Principles
//!
//! 1. **Deterministic**: Same seed always produces the same world
//! 2. **Budgeted**: Resident sections never cross the memory budget
//! 3. **Adaptive**: Intersection hints learn from player choices
//! 4. **Non-blocking**: Every operation returns after bookkeeping
//!
//! ## Core Components
//!
//! - `BiomeCatalog`: transition rules and generation parameters
//! - `TransitionGenerator`: anti-repetition biome sequences
//! - `PathPersonalityModel`: adaptive per-branch personality hints
//! - `SectionStreamingCache`: budgeted streaming with prefetch
//! - `LodController`: frame-time-driven adaptive detail
//! - `WorldEngine`: the per-tick orchestration facade
//!
//! ## Example
//!
//! ```rust,ignore
//! use wayfarer_world::{BiomeCatalog, EngineConfig, TickInput, WorldEngine, WorldSeed};
//!
//! let mut engine = WorldEngine::new(
//!     WorldSeed::new(12345),
//!     BiomeCatalog::standard(),
//!     EngineConfig::default(),
//! )?;
//!
//! // Once per frame, from the host loop:
//! engine.tick(TickInput { position, velocity, frame_time_ms, memory_mb, now_s });
//! for event in engine.events().drain() {
//!     // drive rendering / audio / UI
//! }
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod biome;
pub mod config;
pub mod engine;
pub mod error;
pub mod generator;
pub mod lod;
pub mod personality;
pub mod streaming;

pub use biome::{BiomeCatalog, BiomeEntry, GenerationParams, TransitionRules};
pub use config::EngineConfig;
pub use engine::{TickInput, WorldEngine};
pub use error::{CatalogError, CatalogResult};
pub use generator::{BiomeHistory, TransitionGenerator, WorldSeed, BIOME_HISTORY_CAPACITY};
pub use lod::{
    LodConfig, LodController, ParticleHandle, PerformanceSample, PropHandle, TrackedObject,
};
pub use personality::{
    BranchTraits, PathHints, PathPersonalityModel, PlayerChoiceHistory, CHOICE_HISTORY_CAPACITY,
};
pub use streaming::{
    GeneratedProp, Intersection, PropKind, SectionStreamingCache, StreamingConfig,
    StreamingRejected, StreamingStats, WorldSection,
};
