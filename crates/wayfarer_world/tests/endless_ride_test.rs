//! # Endless Ride Integration Test
//!
//! Proves the player can ride forever: sections stream in ahead, evict
//! behind, and the memory budget holds over arbitrary trajectories.

use std::time::Instant;

use wayfarer_shared::{Biome, Vec3, WorldEvent};
use wayfarer_world::{
    BiomeCatalog, EngineConfig, StreamingConfig, TickInput, WorldEngine, WorldSeed,
};

fn tick_input(position: Vec3, velocity: Vec3, now_s: f32) -> TickInput {
    TickInput {
        position,
        velocity,
        frame_time_ms: 16.0,
        memory_mb: 1_024.0,
        now_s,
    }
}

/// Test: Ride 3,000 ticks east without ever losing the ground under the
/// player or crossing the section cap.
#[test]
fn test_endless_ride_east() {
    let mut engine = WorldEngine::new(
        WorldSeed::new(42),
        BiomeCatalog::standard(),
        EngineConfig::default(),
    )
    .expect("standard catalog validates");
    let receiver = engine.events();
    let cap = engine.cache().config().max_active_sections;
    let budget = engine.cache().config().memory_budget_kb;

    let start = Instant::now();
    let mut loaded = 0usize;
    let mut unloaded = 0usize;
    let mut intersections = 0usize;

    for step in 0..3_000u32 {
        let position = Vec3::new(step as f32 * 250.0, 0.0, 0.0);
        engine.tick(tick_input(position, Vec3::new(250.0, 0.0, 0.0), step as f32 * 0.05));

        assert!(
            engine.cache().resident_count() <= cap,
            "section cap breached at tick {step}: {}",
            engine.cache().resident_count()
        );
        assert!(
            engine.cache().total_memory_kb() <= budget,
            "budget breached at tick {step}: {} KB",
            engine.cache().total_memory_kb()
        );
        assert!(
            engine.cache().section_at(position).is_some(),
            "no section under the player at tick {step}"
        );

        for event in receiver.drain() {
            match event {
                WorldEvent::SectionLoaded { .. } => loaded += 1,
                WorldEvent::SectionUnloaded { .. } => unloaded += 1,
                WorldEvent::IntersectionSpawned { .. } => intersections += 1,
                _ => {}
            }
        }
    }

    let elapsed = start.elapsed();
    println!("Rode 750km east in {elapsed:?}");
    println!("Sections loaded: {loaded}, unloaded: {unloaded}");
    println!("Intersections spawned: {intersections}");

    assert!(loaded > 100, "a 750km ride must stream hundreds of sections");
    assert!(unloaded > 0, "sections behind the player must evict");
    assert!(intersections > 0, "the ride must offer decision points");
    assert_eq!(engine.cache().stats().loaded_total as usize, loaded);
    assert_eq!(engine.cache().stats().unloaded_total as usize, unloaded);
}

/// Test: Spiral outward covering a huge area; the cache follows the
/// player the whole way.
#[test]
fn test_spiral_ride_coverage() {
    let mut engine = WorldEngine::new(
        WorldSeed::new(12_345),
        BiomeCatalog::standard(),
        EngineConfig::default(),
    )
    .expect("standard catalog validates");
    let receiver = engine.events();
    let cap = engine.cache().config().max_active_sections;

    let mut x = 0.0f32;
    let mut y = 0.0f32;
    let mut direction = 0; // 0=E, 1=N, 2=W, 3=S
    let mut leg_length = 1;
    let mut steps_in_leg = 0;
    let mut legs_completed = 0;

    for step in 0..2_000u32 {
        match direction {
            0 => x += 500.0,
            1 => y += 500.0,
            2 => x -= 500.0,
            _ => y -= 500.0,
        }
        steps_in_leg += 1;
        if steps_in_leg >= leg_length {
            steps_in_leg = 0;
            direction = (direction + 1) % 4;
            legs_completed += 1;
            if legs_completed % 2 == 0 {
                leg_length += 1;
            }
        }

        let position = Vec3::new(x, y, 0.0);
        engine.tick(tick_input(position, Vec3::ZERO, step as f32 * 0.1));
        let _ = receiver.drain();

        assert!(engine.cache().resident_count() <= cap, "cap breached at step {step}");
        assert!(
            engine.cache().section_at(position).is_some(),
            "no section under the player at step {step} ({x}, {y})"
        );
    }

    println!("Spiral final position: ({x}, {y})");
    println!("Sections loaded total: {}", engine.cache().stats().loaded_total);
    assert!(engine.cache().within_budget());
}

/// Test: Teleport across the world and verify streaming recovers at
/// every destination.
#[test]
fn test_teleport_stress() {
    let mut engine = WorldEngine::new(
        WorldSeed::new(99_999),
        BiomeCatalog::standard(),
        EngineConfig::default(),
    )
    .expect("standard catalog validates");
    let receiver = engine.events();

    let destinations = [
        (0.0, 0.0),
        (50_000.0, 0.0),
        (-40_000.0, 25_000.0),
        (10_000.0, -60_000.0),
        (0.0, 0.0), // Return to origin
    ];

    for (index, (x, y)) in destinations.into_iter().enumerate() {
        let position = Vec3::new(x, y, 0.0);
        engine.tick(tick_input(position, Vec3::ZERO, index as f32));
        let _ = receiver.drain();

        assert!(
            engine.cache().section_at(position).is_some(),
            "no section at teleport destination ({x}, {y})"
        );
        assert!(engine.cache().within_budget());
        println!(
            "Teleported to ({x}, {y}) - {} sections resident",
            engine.cache().resident_count()
        );
    }
}

/// Test: A tight memory budget is enforced on every tick; pressure is
/// reported as events, never a panic.
#[test]
fn test_tight_budget_holds_under_pressure() {
    let config = EngineConfig {
        streaming: StreamingConfig {
            memory_budget_kb: 60_000,
            ..StreamingConfig::default()
        },
        ..EngineConfig::default()
    };
    let mut engine = WorldEngine::new(WorldSeed::new(7), BiomeCatalog::standard(), config)
        .expect("standard catalog validates");
    let receiver = engine.events();

    let mut pressure_events = 0usize;
    for step in 0..500u32 {
        let position = Vec3::new(step as f32 * 300.0, (step % 5) as f32 * 200.0, 0.0);
        engine.tick(tick_input(position, Vec3::new(300.0, 0.0, 0.0), step as f32 * 0.05));

        assert!(
            engine.cache().total_memory_kb() <= 60_000,
            "budget breached at tick {step}: {} KB",
            engine.cache().total_memory_kb()
        );
        pressure_events += receiver
            .drain()
            .iter()
            .filter(|event| matches!(event, WorldEvent::MemoryBudgetExceeded { .. }))
            .count();
    }

    println!("Budget pressure events: {pressure_events}");
    assert!(
        pressure_events > 0,
        "a 60MB budget cannot fit the full neighborhood without pressure"
    );
}

/// Test: Same seed replays the exact event stream; a different seed
/// generates a different world.
#[test]
fn test_deterministic_world_replay() {
    fn ride(seed: u64) -> Vec<WorldEvent> {
        let mut engine = WorldEngine::new(
            WorldSeed::new(seed),
            BiomeCatalog::standard(),
            EngineConfig::default(),
        )
        .expect("standard catalog validates");
        let receiver = engine.events();
        let mut events = Vec::new();
        for step in 0..300u32 {
            let position = Vec3::new(step as f32 * 220.0, 0.0, 0.0);
            engine.tick(tick_input(position, Vec3::new(220.0, 0.0, 0.0), step as f32 * 0.05));
            events.extend(receiver.drain());
        }
        events
    }

    let first = ride(12_345);
    let second = ride(12_345);
    assert_eq!(first, second, "same seed must replay the identical world");

    let other = ride(54_321);
    let biomes = |events: &[WorldEvent]| -> Vec<Biome> {
        events
            .iter()
            .filter_map(|event| match event {
                WorldEvent::SectionLoaded { biome, .. } => Some(*biome),
                _ => None,
            })
            .collect()
    };
    let a = biomes(&first);
    let b = biomes(&other);
    let differing = a.iter().zip(&b).filter(|(x, y)| x != y).count();
    println!("Seeds 12345 vs 54321 diverge in {differing} loaded biomes");
    assert!(
        differing >= 3,
        "different seeds must generate visibly different worlds"
    );
}
