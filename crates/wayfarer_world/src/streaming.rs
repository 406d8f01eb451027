//! # Section Streaming Cache
//!
//! Spatial grid of world sections with load/unload orchestration,
//! memory-budget enforcement, predictive prefetch, and distance/time
//! based eviction.
//!
//! This is an LRU-like, distance-aware cache: eviction priority is
//! distance first, recency second. The cache never blocks the caller;
//! a rejected stream-in is simply retried on a later tick once budget
//! frees up.

use std::collections::BTreeMap;

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use wayfarer_shared::{
    Aabb, Biome, EventSender, IntersectionKind, Personality, SectionCoord, Vec3, WorldEvent,
};

use crate::generator::{BiomeHistory, TransitionGenerator};
use crate::personality::{PathHints, PathPersonalityModel, PlayerChoiceHistory};

/// Base memory estimate per section in KB (10 MB).
const SECTION_BASE_COST_KB: f32 = 10_240.0;

/// Memory surcharge for a spawned intersection in KB (2 MB).
const INTERSECTION_COST_KB: f32 = 2_048.0;

/// Sections are visible (and protected from forced eviction) within
/// this multiple of the section size.
const NEAR_RANGE_FACTOR: f32 = 1.5;

/// Streaming policy knobs, loaded once at startup.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    /// Maximum streaming distance in world units.
    pub max_streaming_distance: f32,
    /// Maximum number of resident sections (3x3 grid by default).
    pub max_active_sections: usize,
    /// Size of each world section in world units.
    pub section_size: f32,
    /// Maximum memory budget in KB (4 GB default).
    pub memory_budget_kb: u32,
    /// Idle seconds before an untouched section is reclaimed.
    pub unload_time_threshold: f32,
    /// Enable predictive loading along the velocity vector.
    pub predictive_loading: bool,
    /// Lookahead multiplier applied to velocity for prediction.
    pub predictive_multiplier: f32,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            max_streaming_distance: 5_000.0,
            max_active_sections: 9,
            section_size: 2_000.0,
            memory_budget_kb: 4_194_304,
            unload_time_threshold: 30.0,
            predictive_loading: true,
            predictive_multiplier: 2.0,
        }
    }
}

/// Why a stream-in request was refused.
///
/// Both conditions are recoverable resource pressure, reported as
/// events and retried by the update loop; they never panic and never
/// propagate as hard errors.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamingRejected {
    /// The projected resident total would cross the memory budget.
    #[error("memory budget exceeded: {current_kb} KB resident")]
    BudgetExceeded {
        /// Resident memory at rejection time.
        current_kb: u32,
    },

    /// The resident section cap is reached and cleanup freed nothing.
    #[error("active section cap reached: {resident} sections resident")]
    CapacityExceeded {
        /// Resident section count at rejection time.
        resident: usize,
    },
}

/// A generated decision point between two biome-flavored branches.
///
/// Owned by its section; destroyed with it.
#[derive(Clone, Debug)]
pub struct Intersection {
    /// Visual style of the decision point.
    pub kind: IntersectionKind,
    /// Biome the left branch leads to.
    pub left_biome: Biome,
    /// Biome the right branch leads to.
    pub right_biome: Biome,
    /// Personality hints for both branches.
    pub hints: PathHints,
    /// Normalized direction of the left branch.
    pub left_direction: Vec3,
    /// Normalized direction of the right branch.
    pub right_direction: Vec3,
}

impl Intersection {
    /// Personality hint of the left branch.
    #[must_use]
    pub fn left_personality(&self) -> Personality {
        self.hints.left.personality
    }

    /// Personality hint of the right branch.
    #[must_use]
    pub fn right_personality(&self) -> Personality {
        self.hints.right.personality
    }
}

/// What a generated prop represents; the host decides the actual mesh.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropKind {
    /// Trees, bushes, reeds.
    Vegetation,
    /// Boulders and outcrops.
    Rock,
    /// Small clutter along the path.
    Detail,
}

/// Descriptive handle for one procedurally placed prop.
///
/// Owned by the section; purely descriptive, realized by the renderer.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeneratedProp {
    /// Offset from the section center.
    pub offset: Vec3,
    /// Prop category.
    pub kind: PropKind,
}

/// A streaming world section: the unit of load/unload.
#[derive(Clone, Debug)]
pub struct WorldSection {
    /// Grid coordinate identity.
    pub coord: SectionCoord,
    /// Biome generated for this section.
    pub biome: Biome,
    /// World position of the section center.
    pub world_position: Vec3,
    /// Section bounds in world space.
    pub bounds: Aabb,
    /// Whether content realization has been requested.
    pub loaded: bool,
    /// Whether the section is within visible range.
    pub visible: bool,
    /// Host-clock seconds of the last player access.
    pub last_access_time: f32,
    /// Estimated memory cost in KB.
    pub memory_cost_kb: u32,
    /// Decision point, if this section carries one.
    pub intersection: Option<Intersection>,
    /// Procedurally placed props.
    pub props: Vec<GeneratedProp>,
}

impl WorldSection {
    /// Whether this section carries a decision point.
    #[must_use]
    pub fn has_intersection(&self) -> bool {
        self.intersection.is_some()
    }
}

/// Streaming throughput counters.
#[derive(Clone, Copy, Debug, Default)]
pub struct StreamingStats {
    /// Sections streamed in this session.
    pub loaded_total: u32,
    /// Sections evicted this session.
    pub unloaded_total: u32,
    /// Sections currently resident.
    pub resident_sections: usize,
    /// Sections currently within visible range.
    pub visible_sections: usize,
    /// Total resident memory in KB.
    pub total_memory_kb: u32,
    /// Whether the resident total is under budget.
    pub within_budget: bool,
}

/// Budgeted spatial cache of world sections.
///
/// Owns its sections exclusively: eviction drops the intersection and
/// props before the section record, and nothing outside the cache holds
/// references into it.
pub struct SectionStreamingCache {
    config: StreamingConfig,
    generator: TransitionGenerator,
    personality: PathPersonalityModel,
    sections: BTreeMap<SectionCoord, WorldSection>,
    biome_history: BiomeHistory,
    choice_history: PlayerChoiceHistory,
    stats: StreamingStats,
    events: EventSender,
}

impl SectionStreamingCache {
    /// Creates a cache over the injected generator and personality model.
    #[must_use]
    pub fn new(
        generator: TransitionGenerator,
        personality: PathPersonalityModel,
        config: StreamingConfig,
        events: EventSender,
    ) -> Self {
        info!(
            budget_kb = config.memory_budget_kb,
            max_sections = config.max_active_sections,
            "streaming cache initialized"
        );
        Self {
            config,
            generator,
            personality,
            sections: BTreeMap::new(),
            biome_history: BiomeHistory::new(),
            choice_history: PlayerChoiceHistory::new(),
            stats: StreamingStats::default(),
            events,
        }
    }

    /// Grid cells the player currently requires.
    ///
    /// A square neighborhood sized from `max_active_sections`, bounded
    /// by the maximum streaming distance.
    #[must_use]
    pub fn required_cells(&self, player_pos: Vec3) -> Vec<SectionCoord> {
        let center = SectionCoord::from_world(player_pos, self.config.section_size);
        let radius = ((self.config.max_active_sections as f32).sqrt().floor() as i32) / 2;
        let mut cells = Vec::with_capacity(self.config.max_active_sections);
        for dx in -radius..=radius {
            for dy in -radius..=radius {
                let coord = SectionCoord::new(center.x + dx, center.y + dy, center.z);
                let distance = coord
                    .world_center(self.config.section_size)
                    .distance(player_pos);
                if distance <= self.config.max_streaming_distance {
                    cells.push(coord);
                }
            }
        }
        cells
    }

    /// Streams in the section at `player_pos + direction * section_size`.
    ///
    /// Idempotent for resident cells: the access time is refreshed and
    /// no duplicate section is created. Over-budget and over-capacity
    /// requests trigger a forced cleanup pass before failing.
    ///
    /// # Errors
    ///
    /// [`StreamingRejected`] when the budget or section cap still holds
    /// after forced cleanup. Rejections are retried by `update` on later
    /// ticks.
    pub fn stream_in(
        &mut self,
        player_pos: Vec3,
        biome: Biome,
        direction: Vec3,
        now: f32,
        rng: &mut ChaCha8Rng,
    ) -> Result<(), StreamingRejected> {
        let target = player_pos + direction * self.config.section_size;
        let coord = SectionCoord::from_world(target, self.config.section_size);

        if let Some(section) = self.sections.get_mut(&coord) {
            section.last_access_time = now;
            return Ok(());
        }

        let wants_intersection = (coord.x + coord.y).abs() % 3 == 0;
        let cost = Self::estimate_cost(biome, wants_intersection);

        if self.total_memory_kb() + cost > self.config.memory_budget_kb {
            warn!(
                current_kb = self.total_memory_kb(),
                "memory budget pressure, forcing cleanup"
            );
            self.cleanup(player_pos, true, now);
            if self.total_memory_kb() + cost > self.config.memory_budget_kb {
                let current_kb = self.total_memory_kb();
                let _ = self
                    .events
                    .send(WorldEvent::MemoryBudgetExceeded { current_kb });
                return Err(StreamingRejected::BudgetExceeded { current_kb });
            }
        }

        if self.sections.len() >= self.config.max_active_sections {
            self.cleanup(player_pos, true, now);
            if self.sections.len() >= self.config.max_active_sections {
                warn!(
                    resident = self.sections.len(),
                    "section cap reached, rejecting stream-in"
                );
                return Err(StreamingRejected::CapacityExceeded {
                    resident: self.sections.len(),
                });
            }
        }

        let world_position = coord.world_center(self.config.section_size);
        let half = self.config.section_size * 0.5;
        let intersection = if wants_intersection {
            Some(self.spawn_intersection(biome, rng))
        } else {
            None
        };
        let props = self.generate_props(biome, rng);

        let section = WorldSection {
            coord,
            biome,
            world_position,
            bounds: Aabb::from_center_half_extent(world_position, Vec3::new(half, half, half)),
            loaded: true,
            visible: false,
            last_access_time: now,
            memory_cost_kb: cost,
            intersection,
            props,
        };

        info!(
            x = coord.x,
            y = coord.y,
            biome = biome.name(),
            cost_kb = cost,
            "section streamed in"
        );
        if let Some(intersection) = &section.intersection {
            let _ = self.events.send(WorldEvent::IntersectionSpawned {
                coord,
                left_biome: intersection.left_biome,
                right_biome: intersection.right_biome,
                left_personality: intersection.left_personality(),
                right_personality: intersection.right_personality(),
            });
        }
        self.sections.insert(coord, section);
        self.stats.loaded_total += 1;
        let _ = self.events.send(WorldEvent::SectionLoaded { coord, biome });
        Ok(())
    }

    /// Per-tick streaming update.
    ///
    /// Streams in required (and velocity-predicted) cells best-effort,
    /// refreshes visibility, and finishes with a non-forced cleanup.
    /// A rejection on one cell never aborts the others.
    pub fn update(&mut self, player_pos: Vec3, velocity: Vec3, now: f32, rng: &mut ChaCha8Rng) {
        let current = SectionCoord::from_world(player_pos, self.config.section_size);
        if let Some(section) = self.sections.get_mut(&current) {
            section.last_access_time = now;
            section.visible = true;
        }

        let mut required = self.required_cells(player_pos);
        if self.config.predictive_loading && velocity.length_squared() > 0.0 {
            let predicted = player_pos + velocity * self.config.predictive_multiplier;
            for coord in self.required_cells(predicted) {
                if !required.contains(&coord) {
                    required.push(coord);
                }
            }
        }

        for coord in required {
            if self.sections.contains_key(&coord) {
                continue;
            }
            let biome = self.determine_section_biome(coord, rng);
            let target = coord.world_center(self.config.section_size);
            match self.stream_in(target, biome, Vec3::ZERO, now, rng) {
                Ok(()) => self.biome_history.push(biome),
                Err(rejected) => {
                    debug!(error = %rejected, "section stream-in deferred");
                }
            }
        }

        let near_range = self.config.section_size * NEAR_RANGE_FACTOR;
        for section in self.sections.values_mut() {
            section.visible = section.world_position.distance(player_pos) <= near_range;
        }

        self.cleanup(player_pos, false, now);
        self.refresh_stats();
    }

    /// Preloads sections ahead of the player along a movement direction.
    pub fn preload_direction(
        &mut self,
        player_pos: Vec3,
        movement_direction: Vec3,
        depth: u32,
        now: f32,
        rng: &mut ChaCha8Rng,
    ) {
        if movement_direction.length_squared() == 0.0 {
            return;
        }
        let direction = movement_direction.normalized();
        for step in 1..=depth {
            let target = player_pos + direction * (self.config.section_size * step as f32);
            let coord = SectionCoord::from_world(target, self.config.section_size);
            if self.sections.contains_key(&coord) {
                continue;
            }
            let biome = self.determine_section_biome(coord, rng);
            if self.stream_in(target, biome, Vec3::ZERO, now, rng).is_ok() {
                self.biome_history.push(biome);
            }
        }
    }

    /// Evicts sections by distance and idle time.
    ///
    /// Non-forced: beyond the streaming distance or idle past the
    /// unload threshold. Forced: everything outside the near range.
    /// Candidates are evicted farthest-first, then least recently
    /// accessed.
    pub fn cleanup(&mut self, player_pos: Vec3, force: bool, now: f32) {
        let near_range = self.config.section_size * NEAR_RANGE_FACTOR;
        let mut victims: Vec<(SectionCoord, f32, f32)> = Vec::new();

        for (coord, section) in &self.sections {
            let distance = section.world_position.distance(player_pos);
            let idle = now - section.last_access_time;
            let evict = if force {
                distance > near_range
            } else {
                distance > self.config.max_streaming_distance
                    || idle > self.config.unload_time_threshold
            };
            if evict {
                victims.push((*coord, distance, section.last_access_time));
            }
        }

        // Distance first, recency second.
        victims.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.2.total_cmp(&b.2)));

        let count = victims.len();
        for (coord, _, _) in victims {
            self.evict(coord);
        }
        if count > 0 {
            debug!(count, force, "cleaned up distant sections");
            self.refresh_stats();
        }
    }

    /// Force-unloads a specific section, if resident.
    pub fn force_unload(&mut self, coord: SectionCoord) {
        if self.sections.contains_key(&coord) {
            self.evict(coord);
            self.refresh_stats();
        }
    }

    /// Records the player's branch choice at the intersection in their
    /// current section, feeding the adaptive model.
    ///
    /// Returns the chosen branch's biome and personality, or `None` when
    /// the current section has no intersection.
    pub fn record_choice(
        &mut self,
        player_pos: Vec3,
        chose_left: bool,
    ) -> Option<(Biome, Personality)> {
        let coord = SectionCoord::from_world(player_pos, self.config.section_size);
        let (biome, personality) = {
            let intersection = self.sections.get(&coord)?.intersection.as_ref()?;
            if chose_left {
                (intersection.left_biome, intersection.left_personality())
            } else {
                (intersection.right_biome, intersection.right_personality())
            }
        };
        self.personality
            .update_history(&mut self.choice_history, chose_left, biome, personality);
        Some((biome, personality))
    }

    /// Total resident memory in KB.
    #[must_use]
    pub fn total_memory_kb(&self) -> u32 {
        self.sections
            .values()
            .map(|section| section.memory_cost_kb)
            .sum()
    }

    /// Whether resident memory is under the configured budget.
    #[must_use]
    pub fn within_budget(&self) -> bool {
        self.total_memory_kb() < self.config.memory_budget_kb
    }

    /// Number of resident sections.
    #[must_use]
    pub fn resident_count(&self) -> usize {
        self.sections.len()
    }

    /// The section containing a world position, if resident.
    #[must_use]
    pub fn section_at(&self, position: Vec3) -> Option<&WorldSection> {
        self.sections
            .get(&SectionCoord::from_world(position, self.config.section_size))
    }

    /// Iterates resident sections in coordinate order.
    pub fn sections(&self) -> impl Iterator<Item = &WorldSection> {
        self.sections.values()
    }

    /// Streaming throughput counters.
    #[must_use]
    pub fn stats(&self) -> StreamingStats {
        self.stats
    }

    /// The recent-biome ring backing anti-repetition.
    #[must_use]
    pub fn biome_history(&self) -> &BiomeHistory {
        &self.biome_history
    }

    /// The player's adaptive choice history.
    #[must_use]
    pub fn choice_history(&self) -> &PlayerChoiceHistory {
        &self.choice_history
    }

    /// Replaces both session histories, used by host re-hydration.
    pub fn restore_histories(&mut self, choices: PlayerChoiceHistory, biomes: BiomeHistory) {
        self.choice_history = choices;
        self.biome_history = biomes;
    }

    /// Active streaming configuration.
    #[must_use]
    pub fn config(&self) -> &StreamingConfig {
        &self.config
    }

    fn estimate_cost(biome: Biome, with_intersection: bool) -> u32 {
        let multiplier = match biome {
            Biome::Forest => 1.5,
            Biome::Urban => 1.3,
            Biome::Desert => 0.7,
            Biome::Beach => 0.8,
            Biome::Countryside | Biome::Mountains | Biome::Wetlands => 1.0,
        };
        let mut cost = SECTION_BASE_COST_KB * multiplier;
        if with_intersection {
            cost += INTERSECTION_COST_KB;
        }
        cost as u32
    }

    /// Picks the biome for a new cell from the nearest resident
    /// section's biome as transition context.
    fn determine_section_biome(&self, coord: SectionCoord, rng: &mut ChaCha8Rng) -> Biome {
        let target = coord.world_center(self.config.section_size);
        let mut context = Biome::fallback();
        let mut closest = f32::MAX;
        for section in self.sections.values() {
            let distance = target.distance(section.world_position);
            if distance < closest {
                closest = distance;
                context = section.biome;
            }
        }
        let chose_left = (coord.x + coord.y) % 2 == 0;
        self.generator
            .next_biome(context, chose_left, &self.biome_history, rng)
    }

    fn spawn_intersection(&self, current: Biome, rng: &mut ChaCha8Rng) -> Intersection {
        let left_biome = self
            .generator
            .next_biome(current, true, &self.biome_history, rng);
        let right_biome = self
            .generator
            .next_biome(current, false, &self.biome_history, rng);
        let hints = self.personality.generate_hints(
            current,
            left_biome,
            right_biome,
            &self.choice_history,
            rng,
        );
        let kind = self
            .generator
            .catalog()
            .rules(current)
            .map_or(IntersectionKind::YFork, |rules| {
                let preferred = &rules.preferred_intersection_kinds;
                if preferred.is_empty() {
                    IntersectionKind::YFork
                } else {
                    preferred[rng.gen_range(0..preferred.len())]
                }
            });
        let (left_direction, right_direction) = kind.directions();
        Intersection {
            kind,
            left_biome,
            right_biome,
            hints,
            left_direction,
            right_direction,
        }
    }

    /// Places descriptive props from the biome's generation parameters.
    fn generate_props(&self, biome: Biome, rng: &mut ChaCha8Rng) -> Vec<GeneratedProp> {
        let Some(params) = self.generator.catalog().params(biome).copied() else {
            return Vec::new();
        };
        let half = self.config.section_size * 0.5;
        let mut props = Vec::new();
        let clusters = [
            (params.vegetation_density, PropKind::Vegetation, 8.0),
            (params.rock_density, PropKind::Rock, 5.0),
            (params.detail_density, PropKind::Detail, 6.0),
        ];
        for (density, kind, scale) in clusters {
            let count = (density * scale) as usize;
            for _ in 0..count {
                props.push(GeneratedProp {
                    offset: Vec3::new(
                        rng.gen_range(-half..half),
                        rng.gen_range(-half..half),
                        0.0,
                    ),
                    kind,
                });
            }
        }
        props
    }

    fn evict(&mut self, coord: SectionCoord) {
        let Some(mut section) = self.sections.remove(&coord) else {
            return;
        };
        let biome = section.biome;
        // Children go first: intersection, then props, then the record.
        drop(section.intersection.take());
        section.props.clear();
        drop(section);
        self.stats.unloaded_total += 1;
        info!(x = coord.x, y = coord.y, biome = biome.name(), "section unloaded");
        let _ = self
            .events
            .send(WorldEvent::SectionUnloaded { coord, biome });
    }

    fn refresh_stats(&mut self) {
        self.stats.resident_sections = self.sections.len();
        self.stats.visible_sections = self
            .sections
            .values()
            .filter(|section| section.visible)
            .count();
        self.stats.total_memory_kb = self.total_memory_kb();
        self.stats.within_budget = self.within_budget();
    }
}
