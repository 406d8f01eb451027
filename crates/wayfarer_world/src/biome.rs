//! # Biome Catalog
//!
//! Static per-biome generation parameters and transition rules.
//!
//! The catalog is plain immutable configuration loaded once at startup:
//! either the built-in standard catalog or a TOML file. Validation is
//! fatal at load time; a biome with no outgoing transitions is a
//! configuration error, never a silent default.

use std::collections::HashMap;

use serde::Deserialize;
use wayfarer_shared::{Biome, IntersectionKind};

use crate::error::{CatalogError, CatalogResult};

/// Rules constraining how a biome transitions to its neighbors.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct TransitionRules {
    /// Biomes this biome may transition into.
    pub valid_transitions: Vec<Biome>,
    /// Maximum consecutive sections of the same biome.
    pub max_consecutive_same: u32,
    /// Base probability of transitioning to a new biome type.
    pub base_transition_probability: f32,
    /// Penalty multiplier applied per consecutive same-biome repeat.
    pub consecutive_penalty: f32,
    /// Whether the player may immediately return to the previous biome.
    pub allow_immediate_return: bool,
    /// Intersection styles this biome prefers to spawn.
    pub preferred_intersection_kinds: Vec<IntersectionKind>,
}

impl Default for TransitionRules {
    fn default() -> Self {
        Self {
            valid_transitions: Vec::new(),
            max_consecutive_same: 3,
            base_transition_probability: 0.7,
            consecutive_penalty: 0.3,
            allow_immediate_return: false,
            preferred_intersection_kinds: Vec::new(),
        }
    }
}

/// Descriptive generation parameters consumed by external renderers.
///
/// The engine never interprets these beyond clamping; they ride along on
/// sections for the host to realize.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub struct GenerationParams {
    /// Density of vegetation placement (0.0 - 1.0).
    pub vegetation_density: f32,
    /// Density of rock and geological features (0.0 - 1.0).
    pub rock_density: f32,
    /// How winding the paths should be (0.0 = straight, 1.0 = very winding).
    pub path_windiness: f32,
    /// Width of the main path in world units (100 - 1000).
    pub path_width: f32,
    /// Distance over which biome transitions occur (500 - 5000).
    pub transition_length: f32,
    /// Density of small detail objects (0.0 - 1.0).
    pub detail_density: f32,
    /// Rate at which wildlife encounters spawn (0.0 - 1.0).
    pub wildlife_spawn_rate: f32,
    /// Probability of weather events in this biome (0.0 - 1.0).
    pub weather_event_probability: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            vegetation_density: 0.5,
            rock_density: 0.3,
            path_windiness: 0.5,
            path_width: 400.0,
            transition_length: 2000.0,
            detail_density: 0.4,
            wildlife_spawn_rate: 0.2,
            weather_event_probability: 0.15,
        }
    }
}

impl GenerationParams {
    /// Returns a copy with every field clamped to its documented range.
    #[must_use]
    pub fn clamped(self) -> Self {
        Self {
            vegetation_density: self.vegetation_density.clamp(0.0, 1.0),
            rock_density: self.rock_density.clamp(0.0, 1.0),
            path_windiness: self.path_windiness.clamp(0.0, 1.0),
            path_width: self.path_width.clamp(100.0, 1000.0),
            transition_length: self.transition_length.clamp(500.0, 5000.0),
            detail_density: self.detail_density.clamp(0.0, 1.0),
            wildlife_spawn_rate: self.wildlife_spawn_rate.clamp(0.0, 1.0),
            weather_event_probability: self.weather_event_probability.clamp(0.0, 1.0),
        }
    }
}

/// One catalog entry: rules plus generation parameters for a biome.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct BiomeEntry {
    /// Transition rules for the biome.
    pub rules: TransitionRules,
    /// Generation parameters for the biome.
    pub params: GenerationParams,
}

/// Static catalog of rules and parameters for all biomes.
#[derive(Clone, Debug, Deserialize)]
pub struct BiomeCatalog {
    /// Entries keyed by biome.
    biomes: HashMap<Biome, BiomeEntry>,
}

impl BiomeCatalog {
    /// Builds the standard catalog shipped with the engine.
    #[must_use]
    pub fn standard() -> Self {
        let mut biomes = HashMap::new();
        for biome in Biome::ALL {
            biomes.insert(
                biome,
                BiomeEntry {
                    rules: Self::standard_rules(biome),
                    params: Self::standard_params(biome).clamped(),
                },
            );
        }
        Self { biomes }
    }

    /// Parses a catalog from TOML, clamps descriptive parameters, and
    /// validates.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] for parse failures or rule violations.
    pub fn from_toml_str(source: &str) -> CatalogResult<Self> {
        let mut catalog: Self =
            toml::from_str(source).map_err(|e| CatalogError::Parse(e.to_string()))?;
        for entry in catalog.biomes.values_mut() {
            entry.params = entry.params.clamped();
        }
        catalog.validate()?;
        Ok(catalog)
    }

    /// Checks every catalog invariant.
    ///
    /// # Errors
    ///
    /// Returns the first violation found: a missing biome, an empty
    /// transition graph, or a probability outside `[0, 1]`.
    pub fn validate(&self) -> CatalogResult<()> {
        for biome in Biome::ALL {
            let Some(entry) = self.biomes.get(&biome) else {
                return Err(CatalogError::MissingBiome(biome));
            };
            let rules = &entry.rules;
            if rules.valid_transitions.is_empty() {
                return Err(CatalogError::NoTransitions(biome));
            }
            for target in &rules.valid_transitions {
                if !self.biomes.contains_key(target) {
                    return Err(CatalogError::UnknownTransitionTarget {
                        from: biome,
                        to: *target,
                    });
                }
            }
            if !(0.0..=1.0).contains(&rules.base_transition_probability) {
                return Err(CatalogError::ProbabilityOutOfRange {
                    biome,
                    field: "base_transition_probability",
                    value: rules.base_transition_probability,
                });
            }
            if !(0.0..=1.0).contains(&rules.consecutive_penalty) {
                return Err(CatalogError::ProbabilityOutOfRange {
                    biome,
                    field: "consecutive_penalty",
                    value: rules.consecutive_penalty,
                });
            }
        }
        Ok(())
    }

    /// Transition rules for a biome, if cataloged.
    #[inline]
    #[must_use]
    pub fn rules(&self, biome: Biome) -> Option<&TransitionRules> {
        self.biomes.get(&biome).map(|entry| &entry.rules)
    }

    /// Generation parameters for a biome, if cataloged.
    #[inline]
    #[must_use]
    pub fn params(&self, biome: Biome) -> Option<&GenerationParams> {
        self.biomes.get(&biome).map(|entry| &entry.params)
    }

    fn standard_rules(biome: Biome) -> TransitionRules {
        let mut rules = TransitionRules::default();
        match biome {
            Biome::Forest => {
                rules.valid_transitions =
                    vec![Biome::Mountains, Biome::Countryside, Biome::Wetlands];
                rules.preferred_intersection_kinds =
                    vec![IntersectionKind::YFork, IntersectionKind::CaveEntrance];
            }
            Biome::Beach => {
                rules.valid_transitions = vec![Biome::Urban, Biome::Countryside, Biome::Wetlands];
                rules.preferred_intersection_kinds =
                    vec![IntersectionKind::Boardwalk, IntersectionKind::Bridge];
            }
            Biome::Desert => {
                rules.valid_transitions = vec![Biome::Mountains, Biome::Urban, Biome::Countryside];
                rules.preferred_intersection_kinds =
                    vec![IntersectionKind::RockPass, IntersectionKind::YFork];
            }
            Biome::Urban => {
                rules.valid_transitions = vec![Biome::Beach, Biome::Desert, Biome::Countryside];
                rules.preferred_intersection_kinds =
                    vec![IntersectionKind::Roundabout, IntersectionKind::TJunction];
            }
            Biome::Countryside => {
                rules.valid_transitions = vec![
                    Biome::Forest,
                    Biome::Beach,
                    Biome::Desert,
                    Biome::Urban,
                    Biome::Mountains,
                ];
                rules.preferred_intersection_kinds = vec![
                    IntersectionKind::TJunction,
                    IntersectionKind::YFork,
                    IntersectionKind::Bridge,
                ];
            }
            Biome::Mountains => {
                rules.valid_transitions = vec![Biome::Forest, Biome::Desert, Biome::Countryside];
                rules.preferred_intersection_kinds = vec![
                    IntersectionKind::RockPass,
                    IntersectionKind::Bridge,
                    IntersectionKind::CaveEntrance,
                ];
            }
            Biome::Wetlands => {
                rules.valid_transitions = vec![Biome::Forest, Biome::Beach, Biome::Countryside];
                rules.preferred_intersection_kinds = vec![
                    IntersectionKind::RiverCrossing,
                    IntersectionKind::Bridge,
                    IntersectionKind::Boardwalk,
                ];
            }
        }
        rules
    }

    fn standard_params(biome: Biome) -> GenerationParams {
        let mut params = GenerationParams::default();
        match biome {
            Biome::Forest => {
                params.vegetation_density = 0.85;
                params.rock_density = 0.2;
                params.path_windiness = 0.75;
                params.path_width = 350.0;
                params.detail_density = 0.8;
                params.wildlife_spawn_rate = 0.4;
                params.weather_event_probability = 0.2;
            }
            Biome::Beach => {
                params.vegetation_density = 0.2;
                params.rock_density = 0.4;
                params.path_windiness = 0.3;
                params.path_width = 450.0;
                params.detail_density = 0.3;
                params.wildlife_spawn_rate = 0.25;
                params.weather_event_probability = 0.35;
            }
            Biome::Desert => {
                params.vegetation_density = 0.15;
                params.rock_density = 0.6;
                params.path_windiness = 0.2;
                params.path_width = 500.0;
                params.detail_density = 0.2;
                params.wildlife_spawn_rate = 0.1;
                params.weather_event_probability = 0.1;
            }
            Biome::Urban => {
                params.vegetation_density = 0.4;
                params.rock_density = 0.1;
                params.path_windiness = 0.1;
                params.path_width = 600.0;
                params.detail_density = 0.9;
                params.wildlife_spawn_rate = 0.05;
                params.weather_event_probability = 0.05;
            }
            Biome::Countryside => {
                params.vegetation_density = 0.6;
                params.rock_density = 0.2;
                params.path_windiness = 0.4;
                params.path_width = 400.0;
                params.detail_density = 0.5;
                params.wildlife_spawn_rate = 0.3;
                params.weather_event_probability = 0.15;
            }
            Biome::Mountains => {
                params.vegetation_density = 0.3;
                params.rock_density = 0.8;
                params.path_windiness = 0.6;
                params.path_width = 300.0;
                params.detail_density = 0.4;
                params.wildlife_spawn_rate = 0.2;
                params.weather_event_probability = 0.4;
            }
            Biome::Wetlands => {
                params.vegetation_density = 0.7;
                params.rock_density = 0.1;
                params.path_windiness = 0.8;
                params.path_width = 320.0;
                params.detail_density = 0.6;
                params.wildlife_spawn_rate = 0.5;
                params.weather_event_probability = 0.3;
            }
        }
        params
    }
}
