//! # World Engine Facade
//!
//! Owns the single seeded PRNG, the streaming cache, the LOD
//! controller, and the event bus, and runs one logical update per tick.
//!
//! The engine spawns no threads and performs no blocking I/O; a host
//! embedding it in a worker thread must serialize all mutating calls
//! (single-writer discipline).

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::info;
use wayfarer_shared::{Biome, EventBus, EventReceiver, Personality, Vec3};

use crate::biome::BiomeCatalog;
use crate::config::EngineConfig;
use crate::error::CatalogResult;
use crate::generator::{BiomeHistory, TransitionGenerator, WorldSeed};
use crate::lod::{LodController, PerformanceSample};
use crate::personality::{PathPersonalityModel, PlayerChoiceHistory};
use crate::streaming::SectionStreamingCache;

/// Host-supplied inputs for one tick.
#[derive(Clone, Copy, Debug)]
pub struct TickInput {
    /// Player world position.
    pub position: Vec3,
    /// Player velocity in world units per second.
    pub velocity: Vec3,
    /// Last frame time in milliseconds.
    pub frame_time_ms: f32,
    /// Process memory usage in megabytes.
    pub memory_mb: f32,
    /// Monotonic host clock in seconds.
    pub now_s: f32,
}

/// The world-streaming and biome-generation engine.
pub struct WorldEngine {
    seed: WorldSeed,
    rng: ChaCha8Rng,
    cache: SectionStreamingCache,
    lod: LodController,
    bus: EventBus,
    target_frame_time_ms: f32,
}

impl WorldEngine {
    /// Builds an engine over a validated catalog.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::CatalogError`] when the catalog violates
    /// an invariant; configuration errors are fatal at load time.
    pub fn new(seed: WorldSeed, catalog: BiomeCatalog, config: EngineConfig) -> CatalogResult<Self> {
        catalog.validate()?;

        let bus = EventBus::new(config.event_capacity);
        let generator = TransitionGenerator::new(catalog);
        let personality = PathPersonalityModel::new(
            config.left_path_bias,
            config.right_path_bias,
            bus.sender(),
        );
        let cache = SectionStreamingCache::new(
            generator,
            personality,
            config.streaming.clone(),
            bus.sender(),
        );
        let mut lod = LodController::new(bus.sender());
        lod.set_aggressive_optimization(config.aggressive_optimization);

        info!(seed = seed.value(), "world engine initialized");
        Ok(Self {
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed.value()),
            cache,
            lod,
            bus,
            target_frame_time_ms: config.target_frame_time_ms,
        })
    }

    /// Runs one logical update: performance sampling, adaptive bias,
    /// streaming, and per-object LOD.
    pub fn tick(&mut self, input: TickInput) {
        self.lod.record_sample(PerformanceSample {
            frame_time_ms: input.frame_time_ms,
            memory_mb: input.memory_mb,
        });
        self.lod.recompute_adaptive_bias(self.target_frame_time_ms);
        self.cache
            .update(input.position, input.velocity, input.now_s, &mut self.rng);
        self.lod.update_lods(input.position);
    }

    /// Records the player's branch choice at their current intersection.
    ///
    /// Returns the chosen branch's biome and personality, or `None` when
    /// the player is not standing in a section with an intersection.
    pub fn choose(&mut self, player_pos: Vec3, chose_left: bool) -> Option<(Biome, Personality)> {
        self.cache.record_choice(player_pos, chose_left)
    }

    /// Hands a subscriber the engine's event stream.
    #[must_use]
    pub fn events(&self) -> EventReceiver {
        self.bus.receiver()
    }

    /// Re-hydrates session state from a host-persisted blob and reseeds
    /// the PRNG.
    pub fn restore(
        &mut self,
        choices: PlayerChoiceHistory,
        biomes: BiomeHistory,
        seed: WorldSeed,
    ) {
        info!(seed = seed.value(), "restoring session state");
        self.seed = seed;
        self.rng = ChaCha8Rng::seed_from_u64(seed.value());
        self.cache.restore_histories(choices, biomes);
    }

    /// The seed this engine generates from.
    #[must_use]
    pub fn seed(&self) -> WorldSeed {
        self.seed
    }

    /// The streaming cache.
    #[must_use]
    pub fn cache(&self) -> &SectionStreamingCache {
        &self.cache
    }

    /// Mutable access to the streaming cache for host-driven operations
    /// (directional preload, forced unload).
    pub fn cache_mut(&mut self) -> &mut SectionStreamingCache {
        &mut self.cache
    }

    /// The LOD controller.
    #[must_use]
    pub fn lod(&self) -> &LodController {
        &self.lod
    }

    /// Mutable access to the LOD controller for host registration of
    /// tracked objects.
    pub fn lod_mut(&mut self) -> &mut LodController {
        &mut self.lod
    }

    /// Requests sections ahead of the player along a movement direction,
    /// without waiting for the next tick's prediction.
    pub fn preload(&mut self, position: Vec3, direction: Vec3, depth: u32, now_s: f32) {
        self.cache
            .preload_direction(position, direction, depth, now_s, &mut self.rng);
    }
}
