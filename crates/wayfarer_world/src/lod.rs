//! # Adaptive LOD Controller
//!
//! Per-biome distance-to-LOD mapping plus an adaptive bias computed
//! from a rolling frame-time history, with an emergency
//! de-optimization path for sustained overload.
//!
//! Bias above 1.0 divides the distance thresholds, so detail drops
//! sooner; bias below 1.0 stretches them, restoring detail when the
//! frame budget has headroom.

use std::collections::{HashMap, VecDeque};

use serde::Deserialize;
use tracing::{info, warn};
use wayfarer_shared::{Biome, EventSender, LodLevel, OptimizationKind, Vec3, WorldEvent};

use crate::error::{CatalogError, CatalogResult};

/// Rolling performance window length (one second at 60 FPS).
const SAMPLE_WINDOW: usize = 60;

/// Samples required before adaptive decisions are made.
const MIN_SAMPLES: usize = 10;

/// Adaptive bias ceiling.
const BIAS_MAX: f32 = 2.0;

/// Adaptive bias floor.
const BIAS_MIN: f32 = 0.5;

/// Frame-time ratio above which detail is reduced.
const DEGRADE_RATIO: f32 = 1.2;

/// Frame-time ratio below which detail is restored.
const RECOVER_RATIO: f32 = 0.8;

/// Frame-time ratio that triggers the emergency path.
const EMERGENCY_RATIO: f32 = 2.0;

/// Range within which props stay visible during an emergency.
const CLOSE_RANGE: f32 = 2_000.0;

/// Range beyond which props are hidden in normal operation.
const PROP_HIDE_RANGE: f32 = 5_000.0;

/// One frame's performance reading.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PerformanceSample {
    /// Frame time in milliseconds.
    pub frame_time_ms: f32,
    /// Process memory usage in megabytes.
    pub memory_mb: f32,
}

/// Distance thresholds for one biome's LOD tiers.
///
/// Invariant: `lod0 < lod1 < lod2 < cull`, enforced on every edit.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub struct LodConfig {
    /// Distance for highest detail.
    pub lod0: f32,
    /// Distance for medium detail.
    pub lod1: f32,
    /// Distance for low detail.
    pub lod2: f32,
    /// Distance beyond which objects are culled completely.
    pub cull: f32,
}

impl Default for LodConfig {
    fn default() -> Self {
        Self {
            lod0: 1_000.0,
            lod1: 3_000.0,
            lod2: 6_000.0,
            cull: 10_000.0,
        }
    }
}

impl LodConfig {
    /// Checks the monotonicity invariant and documented clamp ranges.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] when thresholds are out of order or out
    /// of range.
    pub fn validate(&self, biome: Biome) -> CatalogResult<()> {
        let ranges = [
            ("lod0", self.lod0, 100.0, 2_000.0),
            ("lod1", self.lod1, 1_000.0, 5_000.0),
            ("lod2", self.lod2, 2_000.0, 8_000.0),
            ("cull", self.cull, 5_000.0, 15_000.0),
        ];
        for (field, value, min, max) in ranges {
            if !(min..=max).contains(&value) {
                return Err(CatalogError::LodDistanceOutOfRange {
                    biome,
                    field,
                    value,
                    min,
                    max,
                });
            }
        }
        if !(self.lod0 < self.lod1 && self.lod1 < self.lod2 && self.lod2 < self.cull) {
            return Err(CatalogError::NonMonotonicLod(biome));
        }
        Ok(())
    }
}

/// A mesh-bearing object tracked for detail control.
#[derive(Clone, Copy, Debug)]
pub struct TrackedObject {
    /// Host-side identity.
    pub id: u64,
    /// World position.
    pub position: Vec3,
    /// Biome context used for threshold lookup.
    pub biome: Biome,
    /// Current detail tier.
    pub level: LodLevel,
}

/// A particle-system handle tracked for optimization.
#[derive(Clone, Copy, Debug)]
pub struct ParticleHandle {
    /// Host-side identity.
    pub id: u64,
    /// World position.
    pub position: Vec3,
    /// Whether the system is currently active.
    pub active: bool,
}

/// A procedurally generated actor tracked for distance hiding.
#[derive(Clone, Copy, Debug)]
pub struct PropHandle {
    /// Host-side identity.
    pub id: u64,
    /// World position.
    pub position: Vec3,
    /// Whether the actor is currently hidden.
    pub hidden: bool,
}

/// Feedback-driven level-of-detail controller.
pub struct LodController {
    configs: HashMap<Biome, LodConfig>,
    samples: VecDeque<PerformanceSample>,
    bias: f32,
    particle_optimization_level: u8,
    aggressive_optimization: bool,
    emergency_active: bool,
    objects: Vec<TrackedObject>,
    particles: Vec<ParticleHandle>,
    props: Vec<PropHandle>,
    last_player_position: Vec3,
    events: EventSender,
}

impl LodController {
    /// Creates a controller with the standard per-biome thresholds.
    #[must_use]
    pub fn new(events: EventSender) -> Self {
        Self {
            configs: Self::standard_configs(),
            samples: VecDeque::with_capacity(SAMPLE_WINDOW),
            bias: 1.0,
            particle_optimization_level: 1,
            aggressive_optimization: false,
            emergency_active: false,
            objects: Vec::new(),
            particles: Vec::new(),
            props: Vec::new(),
            last_player_position: Vec3::ZERO,
            events,
        }
    }

    /// Enables or disables the emergency de-optimization path.
    pub fn set_aggressive_optimization(&mut self, enabled: bool) {
        self.aggressive_optimization = enabled;
    }

    /// Replaces a biome's thresholds after validating them.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] and leaves the old config in place when
    /// the new thresholds are non-monotonic or out of range.
    pub fn set_config(&mut self, biome: Biome, config: LodConfig) -> CatalogResult<()> {
        config.validate(biome)?;
        self.configs.insert(biome, config);
        Ok(())
    }

    /// Thresholds active for a biome.
    #[must_use]
    pub fn config(&self, biome: Biome) -> LodConfig {
        self.configs.get(&biome).copied().unwrap_or_default()
    }

    /// Maps a distance to a detail tier under the current bias.
    ///
    /// Non-decreasing in distance for fixed bias and in bias for fixed
    /// distance.
    #[must_use]
    pub fn lod_level(&self, distance: f32, biome: Biome) -> LodLevel {
        let config = self.config(biome);
        if distance <= config.lod0 / self.bias {
            LodLevel::Lod0
        } else if distance <= config.lod1 / self.bias {
            LodLevel::Lod1
        } else if distance <= config.lod2 / self.bias {
            LodLevel::Lod2
        } else if distance <= config.cull / self.bias {
            LodLevel::Lod3
        } else {
            LodLevel::Culled
        }
    }

    /// Records one frame's performance reading into the rolling window.
    pub fn record_sample(&mut self, sample: PerformanceSample) {
        if self.samples.len() == SAMPLE_WINDOW {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// Average frame time over the window, if any samples exist.
    #[must_use]
    pub fn average_frame_time_ms(&self) -> Option<f32> {
        if self.samples.is_empty() {
            return None;
        }
        let sum: f32 = self.samples.iter().map(|s| s.frame_time_ms).sum();
        Some(sum / self.samples.len() as f32)
    }

    /// Recomputes the adaptive bias from the rolling window.
    ///
    /// Sustained overload raises the bias (cap 2.0) and steps particle
    /// optimization up; headroom lowers it (floor 0.5) and steps back
    /// down. Sustained severe overload fires the emergency path once
    /// per degradation episode when aggressive optimization is enabled.
    pub fn recompute_adaptive_bias(&mut self, target_frame_time_ms: f32) {
        if self.samples.len() < MIN_SAMPLES {
            return;
        }
        let Some(average) = self.average_frame_time_ms() else {
            return;
        };

        if average > target_frame_time_ms * DEGRADE_RATIO {
            self.bias = (self.bias * 1.1).min(BIAS_MAX);
            if self.particle_optimization_level < 2 {
                self.particle_optimization_level += 1;
                let _ = self.events.send(WorldEvent::AdaptiveOptimizationApplied {
                    level: self.particle_optimization_level,
                    kind: OptimizationKind::Particles,
                });
            }
            if average >= target_frame_time_ms * EMERGENCY_RATIO
                && self.aggressive_optimization
                && !self.emergency_active
            {
                self.emergency_optimize();
            }
        } else {
            if self.emergency_active {
                self.release_emergency();
            }
            if average < target_frame_time_ms * RECOVER_RATIO {
                self.bias = (self.bias * 0.95).max(BIAS_MIN);
                if self.particle_optimization_level > 0 {
                    self.particle_optimization_level -= 1;
                    let _ = self.events.send(WorldEvent::AdaptiveOptimizationApplied {
                        level: self.particle_optimization_level,
                        kind: OptimizationKind::Particles,
                    });
                }
            }
        }
    }

    /// Last-resort de-optimization: every tracked object drops to LOD 2,
    /// particles deactivate, and props beyond close range hide.
    ///
    /// Reversible; released automatically once the frame-time average
    /// recovers.
    pub fn emergency_optimize(&mut self) {
        warn!("emergency optimization engaged");
        self.emergency_active = true;
        for index in 0..self.objects.len() {
            let old = self.objects[index].level;
            if old != LodLevel::Lod2 {
                self.objects[index].level = LodLevel::Lod2;
                let _ = self.events.send(WorldEvent::LodLevelChanged {
                    old,
                    new: LodLevel::Lod2,
                });
            }
        }
        for particle in &mut self.particles {
            particle.active = false;
        }
        let center = self.last_player_position;
        for prop in &mut self.props {
            prop.hidden = prop.position.distance(center) > CLOSE_RANGE;
        }
        let _ = self.events.send(WorldEvent::AdaptiveOptimizationApplied {
            level: 2,
            kind: OptimizationKind::Emergency,
        });
    }

    /// Recomputes tiers for all tracked handles around the player.
    pub fn update_lods(&mut self, player_pos: Vec3) {
        self.last_player_position = player_pos;

        for index in 0..self.objects.len() {
            let (position, biome, old) = {
                let object = &self.objects[index];
                (object.position, object.biome, object.level)
            };
            let distance = position.distance(player_pos);
            let new = if self.emergency_active {
                LodLevel::Lod2
            } else {
                self.lod_level(distance, biome)
            };
            if new != old {
                self.objects[index].level = new;
                let _ = self
                    .events
                    .send(WorldEvent::LodLevelChanged { old, new });
            }
        }

        if !self.emergency_active {
            let active_range = match self.particle_optimization_level {
                0 => 3_000.0,
                1 => 2_000.0,
                _ => 1_000.0,
            };
            for particle in &mut self.particles {
                particle.active = particle.position.distance(player_pos) <= active_range;
            }
            for prop in &mut self.props {
                prop.hidden = prop.position.distance(player_pos) > PROP_HIDE_RANGE;
            }
        }
    }

    /// Tracks a mesh-bearing object.
    pub fn register_object(&mut self, id: u64, position: Vec3, biome: Biome) {
        self.objects.push(TrackedObject {
            id,
            position,
            biome,
            level: LodLevel::Lod0,
        });
    }

    /// Tracks a particle system.
    pub fn register_particles(&mut self, id: u64, position: Vec3) {
        self.particles.push(ParticleHandle {
            id,
            position,
            active: true,
        });
    }

    /// Tracks a procedurally generated actor.
    pub fn register_prop(&mut self, id: u64, position: Vec3) {
        self.props.push(PropHandle {
            id,
            position,
            hidden: false,
        });
    }

    /// Stops tracking every handle with the given id.
    pub fn unregister(&mut self, id: u64) {
        self.objects.retain(|object| object.id != id);
        self.particles.retain(|particle| particle.id != id);
        self.props.retain(|prop| prop.id != id);
    }

    /// Current adaptive bias.
    #[must_use]
    pub fn bias(&self) -> f32 {
        self.bias
    }

    /// Current particle optimization level (0 = off, 2 = aggressive).
    #[must_use]
    pub fn particle_optimization_level(&self) -> u8 {
        self.particle_optimization_level
    }

    /// Whether the emergency path is currently engaged.
    #[must_use]
    pub fn emergency_active(&self) -> bool {
        self.emergency_active
    }

    /// Tracked objects, in registration order.
    #[must_use]
    pub fn objects(&self) -> &[TrackedObject] {
        &self.objects
    }

    /// Tracked particle systems, in registration order.
    #[must_use]
    pub fn particles(&self) -> &[ParticleHandle] {
        &self.particles
    }

    /// Tracked props, in registration order.
    #[must_use]
    pub fn props(&self) -> &[PropHandle] {
        &self.props
    }

    fn release_emergency(&mut self) {
        info!("emergency optimization released");
        self.emergency_active = false;
        for particle in &mut self.particles {
            particle.active = true;
        }
        for prop in &mut self.props {
            prop.hidden = false;
        }
    }

    fn standard_configs() -> HashMap<Biome, LodConfig> {
        let mut configs = HashMap::new();
        configs.insert(
            Biome::Forest,
            LodConfig { lod0: 800.0, lod1: 2_500.0, lod2: 5_000.0, cull: 8_000.0 },
        );
        configs.insert(
            Biome::Urban,
            LodConfig { lod0: 1_200.0, lod1: 3_500.0, lod2: 6_000.0, cull: 10_000.0 },
        );
        configs.insert(
            Biome::Desert,
            LodConfig { lod0: 1_500.0, lod1: 4_000.0, lod2: 8_000.0, cull: 12_000.0 },
        );
        configs.insert(
            Biome::Beach,
            LodConfig { lod0: 1_200.0, lod1: 3_000.0, lod2: 6_000.0, cull: 10_000.0 },
        );
        configs.insert(
            Biome::Mountains,
            LodConfig { lod0: 1_000.0, lod1: 3_000.0, lod2: 7_000.0, cull: 12_000.0 },
        );
        configs.insert(
            Biome::Countryside,
            LodConfig { lod0: 1_000.0, lod1: 3_000.0, lod2: 6_000.0, cull: 10_000.0 },
        );
        configs.insert(
            Biome::Wetlands,
            LodConfig { lod0: 800.0, lod1: 2_500.0, lod2: 5_000.0, cull: 8_000.0 },
        );
        configs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wayfarer_shared::EventBus;

    fn controller(bus: &EventBus) -> LodController {
        LodController::new(bus.sender())
    }

    #[test]
    fn test_standard_configs_validate() {
        let bus = EventBus::new(64);
        let lod = controller(&bus);
        for biome in Biome::ALL {
            assert!(lod.config(biome).validate(biome).is_ok(), "{biome:?}");
        }
    }

    #[test]
    fn test_non_monotonic_config_rejected() {
        let bus = EventBus::new(64);
        let mut lod = controller(&bus);
        let bad = LodConfig { lod0: 1_500.0, lod1: 1_200.0, lod2: 6_000.0, cull: 10_000.0 };
        assert_eq!(
            lod.set_config(Biome::Urban, bad),
            Err(CatalogError::NonMonotonicLod(Biome::Urban))
        );
        // The old config survives a rejected edit.
        assert!((lod.config(Biome::Urban).lod0 - 1_200.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_out_of_range_config_rejected() {
        let bus = EventBus::new(64);
        let mut lod = controller(&bus);
        let bad = LodConfig { lod0: 50.0, lod1: 3_000.0, lod2: 6_000.0, cull: 10_000.0 };
        assert!(matches!(
            lod.set_config(Biome::Beach, bad),
            Err(CatalogError::LodDistanceOutOfRange { .. })
        ));
    }

    #[test]
    fn test_lod_monotonic_in_distance() {
        let bus = EventBus::new(64);
        let lod = controller(&bus);
        for biome in Biome::ALL {
            let mut previous = LodLevel::Lod0;
            for step in 0..300 {
                let level = lod.lod_level(step as f32 * 50.0, biome);
                assert!(level >= previous, "{biome:?} regressed at step {step}");
                previous = level;
            }
        }
    }

    #[test]
    fn test_lod_monotonic_in_bias() {
        let bus = EventBus::new(64);
        let mut lod = controller(&bus);
        let distances = [400.0, 900.0, 2_600.0, 5_500.0, 9_500.0, 14_000.0];
        for distance in distances {
            let mut previous = LodLevel::Lod0;
            for step in 0..30 {
                lod.bias = 0.5 + step as f32 * 0.05;
                let level = lod.lod_level(distance, Biome::Countryside);
                assert!(level >= previous, "distance {distance} regressed at bias {}", lod.bias);
                previous = level;
            }
            lod.bias = 1.0;
        }
    }

    #[test]
    fn test_bias_rises_and_emergency_fires_once() {
        let bus = EventBus::new(1024);
        let receiver = bus.receiver();
        let mut lod = controller(&bus);
        lod.set_aggressive_optimization(true);
        let target = 16.0;

        let mut previous_bias = lod.bias();
        for _ in 0..10 {
            lod.record_sample(PerformanceSample { frame_time_ms: target * 2.0, memory_mb: 512.0 });
            lod.recompute_adaptive_bias(target);
            assert!(lod.bias() >= previous_bias, "bias must rise monotonically");
            previous_bias = lod.bias();
        }
        // Keep degrading; bias saturates at the cap and the emergency
        // path does not re-fire.
        for _ in 0..20 {
            lod.record_sample(PerformanceSample { frame_time_ms: target * 2.0, memory_mb: 512.0 });
            lod.recompute_adaptive_bias(target);
        }
        assert!((lod.bias() - 2.0).abs() < f32::EPSILON, "bias caps at 2.0");
        assert!(lod.emergency_active());

        let emergencies = receiver
            .drain()
            .into_iter()
            .filter(|event| {
                matches!(
                    event,
                    WorldEvent::AdaptiveOptimizationApplied {
                        kind: OptimizationKind::Emergency,
                        ..
                    }
                )
            })
            .count();
        assert_eq!(emergencies, 1, "emergency fires exactly once per episode");
    }

    #[test]
    fn test_recovery_lowers_bias_and_releases_emergency() {
        let bus = EventBus::new(1024);
        let mut lod = controller(&bus);
        lod.set_aggressive_optimization(true);
        lod.register_particles(1, Vec3::ZERO);
        let target = 16.0;

        for _ in 0..15 {
            lod.record_sample(PerformanceSample { frame_time_ms: target * 2.5, memory_mb: 512.0 });
            lod.recompute_adaptive_bias(target);
        }
        assert!(lod.emergency_active());
        assert!(!lod.particles()[0].active);

        // Flood the window with fast frames.
        for _ in 0..60 {
            lod.record_sample(PerformanceSample { frame_time_ms: target * 0.5, memory_mb: 256.0 });
        }
        let high = lod.bias();
        lod.recompute_adaptive_bias(target);
        assert!(!lod.emergency_active(), "recovery releases the emergency");
        assert!(lod.particles()[0].active, "particles reactivate on release");
        assert!(lod.bias() < high, "bias falls with headroom");

        for _ in 0..200 {
            lod.recompute_adaptive_bias(target);
        }
        assert!((lod.bias() - BIAS_MIN).abs() < 1e-6, "bias floors at 0.5");
        assert_eq!(lod.particle_optimization_level(), 0);
    }

    #[test]
    fn test_update_lods_emits_changes() {
        let bus = EventBus::new(1024);
        let receiver = bus.receiver();
        let mut lod = controller(&bus);
        lod.register_object(1, Vec3::new(4_000.0, 0.0, 0.0), Biome::Countryside);

        lod.update_lods(Vec3::ZERO);
        // 4000 lands in the Lod2 band for Countryside (3000..6000).
        assert_eq!(lod.objects()[0].level, LodLevel::Lod2);
        let changes: Vec<_> = receiver
            .drain()
            .into_iter()
            .filter(|event| matches!(event, WorldEvent::LodLevelChanged { .. }))
            .collect();
        assert_eq!(changes.len(), 1);

        // No movement, no further events.
        lod.update_lods(Vec3::ZERO);
        assert!(!receiver.has_events());
    }

    #[test]
    fn test_emergency_forces_lod2_and_hides_distant_props() {
        let bus = EventBus::new(1024);
        let mut lod = controller(&bus);
        lod.register_object(1, Vec3::new(100.0, 0.0, 0.0), Biome::Forest);
        lod.register_prop(2, Vec3::new(500.0, 0.0, 0.0));
        lod.register_prop(3, Vec3::new(4_000.0, 0.0, 0.0));
        lod.update_lods(Vec3::ZERO);
        assert_eq!(lod.objects()[0].level, LodLevel::Lod0);

        lod.emergency_optimize();
        assert_eq!(lod.objects()[0].level, LodLevel::Lod2);
        assert!(!lod.props()[0].hidden, "close props stay visible");
        assert!(lod.props()[1].hidden, "distant props hide");

        // Even close objects stay pinned at Lod2 while the emergency holds.
        lod.update_lods(Vec3::ZERO);
        assert_eq!(lod.objects()[0].level, LodLevel::Lod2);
    }

    #[test]
    fn test_particle_range_tightens_with_optimization_level() {
        let bus = EventBus::new(1024);
        let mut lod = controller(&bus);
        lod.register_particles(1, Vec3::new(2_500.0, 0.0, 0.0));

        lod.particle_optimization_level = 0;
        lod.update_lods(Vec3::ZERO);
        assert!(lod.particles()[0].active);

        lod.particle_optimization_level = 2;
        lod.update_lods(Vec3::ZERO);
        assert!(!lod.particles()[0].active);
    }

    #[test]
    fn test_unregister_drops_handles() {
        let bus = EventBus::new(64);
        let mut lod = controller(&bus);
        lod.register_object(7, Vec3::ZERO, Biome::Desert);
        lod.register_particles(7, Vec3::ZERO);
        lod.register_prop(7, Vec3::ZERO);
        lod.unregister(7);
        assert!(lod.objects().is_empty());
        assert!(lod.particles().is_empty());
        assert!(lod.props().is_empty());
    }
}
