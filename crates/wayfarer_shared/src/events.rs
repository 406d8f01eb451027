//! # WAYFARER Event Surface
//!
//! Bounded channel communication from the world engine to host
//! collaborators (renderer, audio, UI).
//!
//! ```text
//! ┌─────────────┐      ┌─────────────┐      ┌─────────────┐
//! │   World     │─────>│   Event     │─────>│   Renderer  │
//! │   Engine    │      │   Channel   │      │             │
//! └─────────────┘      └─────────────┘      └─────────────┘
//!       │                    │                    │
//!       │              ┌─────┴─────┐              │
//!       └─────────────>│  Audio/UI │<────────────┘
//!                      └───────────┘
//! ```
//!
//! Events flow FROM the engine TO the host. Uses crossbeam channels for
//! zero-allocation in the hot path; senders never block.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

use crate::types::{Biome, LodLevel, Personality, SectionCoord};

/// The optimization knob an adaptive adjustment touched.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OptimizationKind {
    /// Particle density stepped up or down.
    Particles,
    /// Last-resort full de-optimization engaged.
    Emergency,
}

/// Events emitted by the world engine.
///
/// These events are the "API" between the engine and its host. Each
/// collaborator only processes the events relevant to it.
#[derive(Clone, Debug, PartialEq)]
pub enum WorldEvent {
    /// A world section finished streaming in.
    ///
    /// Consumed by: renderer (attach content), audio (ambience).
    SectionLoaded {
        /// Grid coordinate of the section.
        coord: SectionCoord,
        /// Biome generated for the section.
        biome: Biome,
    },

    /// A world section was evicted and destroyed.
    SectionUnloaded {
        /// Grid coordinate of the section.
        coord: SectionCoord,
        /// Biome the section carried.
        biome: Biome,
    },

    /// Resident memory crossed the configured budget.
    ///
    /// Recoverable pressure signal; the cache retries after cleanup.
    MemoryBudgetExceeded {
        /// Total resident section memory in KB.
        current_kb: u32,
    },

    /// A decision point spawned inside a freshly streamed section.
    IntersectionSpawned {
        /// Grid coordinate of the hosting section.
        coord: SectionCoord,
        /// Biome the left branch leads to.
        left_biome: Biome,
        /// Biome the right branch leads to.
        right_biome: Biome,
        /// Personality hint for the left branch.
        left_personality: Personality,
        /// Personality hint for the right branch.
        right_personality: Personality,
    },

    /// The adaptive model detected a stable player preference.
    PlayerPatternDetected {
        /// The personality the player gravitates toward.
        personality: Personality,
        /// Preference score in (0.5, 1.0] that crossed the confidence gate.
        confidence: f32,
    },

    /// A tracked object's detail tier changed.
    LodLevelChanged {
        /// Previous tier.
        old: LodLevel,
        /// New tier.
        new: LodLevel,
    },

    /// The adaptive controller stepped an optimization level.
    AdaptiveOptimizationApplied {
        /// New optimization level (0 = off, 2 = aggressive).
        level: u8,
        /// Which knob was touched.
        kind: OptimizationKind,
    },
}

/// Event bus for engine-to-host communication.
///
/// Pre-allocates a bounded channel to prevent memory growth in the hot
/// path.
pub struct EventBus {
    /// Sender end - held by the engine.
    sender: Sender<WorldEvent>,
    /// Receiver end - held by host consumers.
    receiver: Receiver<WorldEvent>,
}

impl EventBus {
    /// Creates a new event bus.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum events in flight before new events are
    ///   dropped. Use 1024 for a typical game loop.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self { sender, receiver }
    }

    /// Creates a sender handle (clone for multiple producers).
    #[must_use]
    pub fn sender(&self) -> EventSender {
        EventSender {
            sender: self.sender.clone(),
        }
    }

    /// Creates a receiver handle (clone for multiple consumers).
    #[must_use]
    pub fn receiver(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.receiver.clone(),
        }
    }
}

/// Handle for emitting events.
#[derive(Clone)]
pub struct EventSender {
    sender: Sender<WorldEvent>,
}

impl EventSender {
    /// Sends an event (non-blocking).
    ///
    /// Returns `false` if the channel is full or disconnected; the event
    /// is dropped to preserve frame rate.
    #[inline]
    pub fn send(&self, event: WorldEvent) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_) | TrySendError::Disconnected(_)) => false,
        }
    }
}

/// Handle for receiving events.
#[derive(Clone)]
pub struct EventReceiver {
    receiver: Receiver<WorldEvent>,
}

impl EventReceiver {
    /// Receives all pending events (non-blocking).
    ///
    /// Returns an empty vector if no events are pending. Use this once
    /// per frame on the host side.
    #[inline]
    #[must_use]
    pub fn drain(&self) -> Vec<WorldEvent> {
        let mut events = Vec::with_capacity(64);
        while let Ok(event) = self.receiver.try_recv() {
            events.push(event);
        }
        events
    }

    /// Receives one event (non-blocking).
    #[inline]
    #[must_use]
    pub fn try_recv(&self) -> Option<WorldEvent> {
        self.receiver.try_recv().ok()
    }

    /// Returns the number of pending events.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Checks if there are pending events.
    #[inline]
    #[must_use]
    pub fn has_events(&self) -> bool {
        !self.receiver.is_empty()
    }
}
