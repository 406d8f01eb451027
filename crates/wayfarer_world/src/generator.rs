//! # Biome Transition Generator
//!
//! Weighted random biome sequences with anti-repetition and
//! history-aware probability.
//!
//! ## Determinism Guarantee
//!
//! All randomness flows through the single `ChaCha8Rng` owned by the
//! engine. Given the same `WorldSeed` and the same history, this
//! generator produces **exactly** the same sequence on any platform,
//! any time.

use std::collections::VecDeque;

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use wayfarer_shared::Biome;

use crate::biome::BiomeCatalog;

/// World seed for deterministic generation.
///
/// All procedural decisions derive from this seed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorldSeed(u64);

impl WorldSeed {
    /// Creates a new world seed.
    #[inline]
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self(seed)
    }

    /// Returns the raw seed value.
    #[inline]
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl Default for WorldSeed {
    fn default() -> Self {
        Self(0xDEAD_BEEF_CAFE_BABE)
    }
}

/// Capacity of the recent-biome ring.
pub const BIOME_HISTORY_CAPACITY: usize = 10;

/// Bounded ordered record of recently generated biomes.
///
/// Used only for anti-repetition and probability weighting. The oldest
/// entry drops silently once the ring is full.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BiomeHistory {
    entries: VecDeque<Biome>,
}

impl BiomeHistory {
    /// Creates an empty history.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: VecDeque::with_capacity(BIOME_HISTORY_CAPACITY),
        }
    }

    /// Records a biome, dropping the oldest entry when full.
    pub fn push(&mut self, biome: Biome) {
        if self.entries.len() == BIOME_HISTORY_CAPACITY {
            self.entries.pop_front();
        }
        self.entries.push_back(biome);
    }

    /// The most recently recorded biome.
    #[must_use]
    pub fn last(&self) -> Option<Biome> {
        self.entries.back().copied()
    }

    /// Number of trailing entries equal to `biome`.
    #[must_use]
    pub fn consecutive_count(&self, biome: Biome) -> u32 {
        self.entries
            .iter()
            .rev()
            .take_while(|entry| **entry == biome)
            .count() as u32
    }

    /// Number of recorded entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries oldest-first.
    pub fn iter(&self) -> impl Iterator<Item = Biome> + '_ {
        self.entries.iter().copied()
    }
}

/// History-aware biome sequence generator.
///
/// Owns the immutable catalog; all selection randomness is drawn from
/// the caller-supplied PRNG so sequences replay exactly from a seed.
pub struct TransitionGenerator {
    catalog: BiomeCatalog,
}

impl TransitionGenerator {
    /// Penalty applied to an immediate return when the rules disallow it.
    const IMMEDIATE_RETURN_PENALTY: f32 = 0.1;

    /// Creates a generator over the given catalog.
    #[must_use]
    pub fn new(catalog: BiomeCatalog) -> Self {
        Self { catalog }
    }

    /// The catalog this generator draws rules from.
    #[must_use]
    pub fn catalog(&self) -> &BiomeCatalog {
        &self.catalog
    }

    /// Whether `current` may transition into `target`.
    #[must_use]
    pub fn can_transition(&self, current: Biome, target: Biome) -> bool {
        self.catalog
            .rules(current)
            .is_some_and(|rules| rules.valid_transitions.contains(&target))
    }

    /// Picks the next biome after `current`.
    ///
    /// The candidate set is `valid_transitions`, minus the immediately
    /// previous biome unless returns are allowed, minus `current` itself
    /// once it has repeated `max_consecutive_same` times. An empty
    /// candidate set falls back to the unfiltered transitions, then to
    /// the documented default biome.
    #[must_use]
    pub fn next_biome(
        &self,
        current: Biome,
        chose_left: bool,
        history: &BiomeHistory,
        rng: &mut ChaCha8Rng,
    ) -> Biome {
        let Some(rules) = self.catalog.rules(current) else {
            debug!(biome = current.name(), "no transition rules, using fallback");
            return Biome::fallback();
        };

        let mut candidates: Vec<Biome> = rules.valid_transitions.clone();
        if let Some(previous) = history.last() {
            if !rules.allow_immediate_return {
                candidates.retain(|candidate| *candidate != previous);
            }
            if history.consecutive_count(current) >= rules.max_consecutive_same {
                candidates.retain(|candidate| *candidate != current);
            }
        }

        if candidates.is_empty() {
            debug!(
                biome = current.name(),
                "candidate set exhausted, falling back to unfiltered transitions"
            );
            candidates.clone_from(&rules.valid_transitions);
        }
        if candidates.is_empty() {
            debug!(biome = current.name(), "transition graph empty, using fallback");
            return Biome::fallback();
        }

        let next = candidates[rng.gen_range(0..candidates.len())];
        trace!(
            from = current.name(),
            to = next.name(),
            chose_left,
            "biome transition"
        );
        next
    }

    /// Probability of transitioning from `current` to `target` given the
    /// recent history. Zero for invalid pairs; always within `[0, 1]`.
    #[must_use]
    pub fn transition_probability(
        &self,
        current: Biome,
        target: Biome,
        history: &BiomeHistory,
    ) -> f32 {
        if !self.can_transition(current, target) {
            return 0.0;
        }
        // can_transition guarantees the rules exist.
        let Some(rules) = self.catalog.rules(current) else {
            return 0.0;
        };

        let mut probability = rules.base_transition_probability;
        if target == current {
            let consecutive = history.consecutive_count(current);
            probability *= rules.consecutive_penalty.powi(consecutive as i32);
        } else if history.last() == Some(target) && !rules.allow_immediate_return {
            probability *= Self::IMMEDIATE_RETURN_PENALTY;
        }

        probability.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn generator() -> TransitionGenerator {
        TransitionGenerator::new(BiomeCatalog::standard())
    }

    fn ride(seed: u64, steps: usize) -> Vec<Biome> {
        let generator = generator();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut history = BiomeHistory::new();
        let mut current = Biome::Forest;
        let mut sequence = Vec::with_capacity(steps);
        for step in 0..steps {
            let next = generator.next_biome(current, step % 2 == 0, &history, &mut rng);
            history.push(next);
            sequence.push(next);
            current = next;
        }
        sequence
    }

    #[test]
    fn test_history_ring_drops_oldest() {
        let mut history = BiomeHistory::new();
        for i in 0..15 {
            history.push(if i % 2 == 0 { Biome::Forest } else { Biome::Beach });
        }
        assert_eq!(history.len(), BIOME_HISTORY_CAPACITY);
        assert_eq!(history.last(), Some(Biome::Forest));
    }

    #[test]
    fn test_consecutive_count() {
        let mut history = BiomeHistory::new();
        history.push(Biome::Beach);
        history.push(Biome::Forest);
        history.push(Biome::Forest);
        assert_eq!(history.consecutive_count(Biome::Forest), 2);
        assert_eq!(history.consecutive_count(Biome::Beach), 0);
    }

    #[test]
    fn test_next_biome_only_valid_transitions() {
        let generator = generator();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let history = BiomeHistory::new();
        for _ in 0..100 {
            let next = generator.next_biome(Biome::Forest, true, &history, &mut rng);
            assert!(generator.can_transition(Biome::Forest, next));
        }
    }

    #[test]
    fn test_no_immediate_return() {
        let generator = generator();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mut history = BiomeHistory::new();
        history.push(Biome::Mountains);
        // From Forest with Mountains just visited, Mountains must not
        // come back immediately.
        for _ in 0..100 {
            let next = generator.next_biome(Biome::Forest, false, &history, &mut rng);
            assert_ne!(next, Biome::Mountains);
        }
    }

    #[test]
    fn test_max_consecutive_enforced() {
        let sequence = ride(42, 200);
        let mut run = 1;
        for window in sequence.windows(2) {
            if window[0] == window[1] {
                run += 1;
            } else {
                run = 1;
            }
            assert!(run <= 3, "biome repeated more than 3 times consecutively");
        }
    }

    #[test]
    fn test_determinism_same_seed() {
        assert_eq!(ride(12345, 20), ride(12345, 20));
    }

    #[test]
    fn test_seed_changes_sequence() {
        let a = ride(12345, 20);
        let b = ride(54321, 20);
        let differing = a.iter().zip(&b).filter(|(x, y)| x != y).count();
        assert!(
            differing >= 3,
            "seeds 12345 and 54321 should diverge in at least 3 positions, got {differing}"
        );
    }

    #[test]
    fn test_invalid_pairs_have_zero_probability() {
        let generator = generator();
        let history = BiomeHistory::new();
        for from in Biome::ALL {
            for to in Biome::ALL {
                if !generator.can_transition(from, to) {
                    assert_eq!(
                        generator.transition_probability(from, to, &history),
                        0.0,
                        "{from:?} -> {to:?}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_probability_penalizes_immediate_return() {
        let generator = generator();
        let mut history = BiomeHistory::new();
        history.push(Biome::Mountains);
        let penalized = generator.transition_probability(Biome::Forest, Biome::Mountains, &history);
        let fresh = generator.transition_probability(Biome::Forest, Biome::Wetlands, &history);
        assert!(penalized < fresh);
        assert!((penalized - fresh * 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_probability_within_unit_range() {
        let generator = generator();
        let mut history = BiomeHistory::new();
        for _ in 0..5 {
            history.push(Biome::Countryside);
        }
        for from in Biome::ALL {
            for to in Biome::ALL {
                let p = generator.transition_probability(from, to, &history);
                assert!((0.0..=1.0).contains(&p), "{from:?} -> {to:?} = {p}");
            }
        }
    }
}
