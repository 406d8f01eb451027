//! # WAYFARER Shared Types
//!
//! Types shared between the world engine and its host collaborators
//! (renderer, audio, UI). This crate is GPU-free and side-effect-free:
//! identity enums, math primitives, and the event surface the engine
//! emits on.
//!
//! ## Core Components
//!
//! - `Vec3` / `Aabb`: canonical math representations
//! - `Biome` / `Personality` / `IntersectionKind` / `LodLevel`: identity values
//! - `WorldEvent` + `EventBus`: bounded engine-to-host event channel

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod events;
pub mod math;
pub mod types;

pub use events::{EventBus, EventReceiver, EventSender, OptimizationKind, WorldEvent};
pub use math::{Aabb, Vec3};
pub use types::{Biome, IntersectionKind, LodLevel, Personality, SectionCoord};
