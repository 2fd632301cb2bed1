//! Feeding actors: one thread per cat or mouse.

use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::Sender;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use trough_arbiter::Arbiter;
use trough_core::{BowlId, Species};

use crate::ledger::FeedingLedger;
use crate::report::MealRecord;

// ── ActorId ────────────────────────────────────────────────────────

/// Identifies one actor: its species and its number within the species.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActorId {
    /// The actor's species.
    pub species: Species,
    /// 0-based number among actors of the same species.
    pub index: usize,
}

impl ActorId {
    /// The `index`-th actor of `species`.
    pub fn new(species: Species, index: usize) -> Self {
        Self { species, index }
    }

    /// Name of the actor's thread, e.g. `trough-cat-3`.
    pub fn thread_name(self) -> String {
        format!("trough-{self}")
    }

    /// Per-actor seed mixed into the run's base seed.
    fn seed_mix(self) -> u64 {
        let raw = ((self.species.index() as u64) << 32) | self.index as u64;
        raw.wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.species, self.index)
    }
}

// ── BowlPicker ─────────────────────────────────────────────────────

/// Uniform, reproducible bowl choice for one actor.
///
/// The RNG is seeded from `seed XOR mix(actor)`, so identical seeds give
/// each actor the same sequence of bowls on every run.
#[derive(Clone, Debug)]
pub struct BowlPicker {
    rng: ChaCha8Rng,
    bowl_count: u32,
}

impl BowlPicker {
    /// A picker over bowls `1..=bowl_count` for `actor`.
    ///
    /// `bowl_count` is clamped to at least 1 and at most `u32::MAX`.
    pub fn new(seed: u64, actor: ActorId, bowl_count: usize) -> Self {
        let bowl_count = u32::try_from(bowl_count).unwrap_or(u32::MAX).max(1);
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed ^ actor.seed_mix()),
            bowl_count,
        }
    }

    /// The next bowl to visit.
    pub fn next_bowl(&mut self) -> BowlId {
        BowlId(self.rng.gen_range(1..=self.bowl_count))
    }
}

// ── Actor ──────────────────────────────────────────────────────────

/// Timing for one actor's life.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Schedule {
    pub iterations: u32,
    pub eat: Duration,
    pub sleep: Duration,
}

/// State moved onto an actor thread.
pub(crate) struct Actor {
    pub id: ActorId,
    pub schedule: Schedule,
    pub picker: BowlPicker,
    pub arbiter: Arc<dyn Arbiter>,
    pub ledger: Arc<FeedingLedger>,
    pub meals: Sender<MealRecord>,
}

impl Actor {
    /// Sleep, eat, repeat. Every meal is reported on the meals channel.
    pub fn run(mut self) {
        let species = self.id.species;
        for round in 0..self.schedule.iterations {
            thread::sleep(self.schedule.sleep);

            let bowl = self.picker.next_bowl();
            let asked = Instant::now();
            self.arbiter.before_feeding(bowl, species);
            let waited = asked.elapsed();

            self.ledger.meal_started(self.id, bowl);
            tracing::trace!(actor = %self.id, %bowl, round, ?waited, "eating");
            thread::sleep(self.schedule.eat);
            self.ledger.meal_finished(self.id, bowl);

            self.arbiter.after_feeding(bowl, species);

            // The collector only disappears if the run is being torn down.
            let _ = self.meals.send(MealRecord {
                actor: self.id,
                bowl,
                round,
                waited,
            });
        }
        tracing::debug!(actor = %self.id, "actor finished");
    }
}
