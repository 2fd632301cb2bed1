//! Per-meal records and the end-of-run report.

use std::fmt;
use std::time::Duration;

use trough_core::{ArbiterMetrics, BowlId, Species};

use crate::actor::ActorId;
use crate::ledger::Violation;

/// One completed meal, sent from an actor to the collector.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MealRecord {
    /// Who ate.
    pub actor: ActorId,
    /// Where.
    pub bowl: BowlId,
    /// 0-based meal number for this actor.
    pub round: u32,
    /// Time spent blocked in `before_feeding`.
    pub waited: Duration,
}

/// Meals and waiting time of one actor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActorStats {
    /// The actor.
    pub actor: ActorId,
    /// Meals completed.
    pub meals: u32,
    /// Sum of the time spent waiting for a bowl.
    pub total_wait: Duration,
    /// Longest single wait.
    pub max_wait: Duration,
}

impl ActorStats {
    /// Stats for an actor that has not eaten yet.
    pub fn new(actor: ActorId) -> Self {
        Self {
            actor,
            meals: 0,
            total_wait: Duration::ZERO,
            max_wait: Duration::ZERO,
        }
    }

    /// Fold one meal into the totals.
    pub fn record(&mut self, meal: &MealRecord) {
        self.meals += 1;
        self.total_wait += meal.waited;
        self.max_wait = self.max_wait.max(meal.waited);
    }

    /// Average wait per meal, zero if the actor never ate.
    pub fn mean_wait(&self) -> Duration {
        if self.meals == 0 {
            Duration::ZERO
        } else {
            self.total_wait / self.meals
        }
    }
}

/// Outcome of a [`Simulation`](crate::Simulation) run.
#[derive(Clone, Debug)]
pub struct SimReport {
    /// Per-actor stats, cats first, each species in index order.
    pub actors: Vec<ActorStats>,
    /// Meals each actor was asked to eat.
    pub iterations: u32,
    /// Exclusion rules broken, as observed by the ledger.
    pub violations: Vec<Violation>,
    /// Highest number of simultaneous feeders the ledger saw.
    pub peak_feeders: usize,
    /// Wall-clock duration of the run.
    pub elapsed: Duration,
    /// The arbiter's final counters.
    pub arbiter: ArbiterMetrics,
}

impl SimReport {
    /// No violations and every actor ate every meal.
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty() && self.actors.iter().all(|a| a.meals == self.iterations)
    }

    /// Total meals eaten by `species`.
    pub fn meals(&self, species: Species) -> u64 {
        self.actors
            .iter()
            .filter(|a| a.actor.species == species)
            .map(|a| u64::from(a.meals))
            .sum()
    }

    /// Stats of one actor, if it took part.
    pub fn actor(&self, id: ActorId) -> Option<&ActorStats> {
        self.actors.iter().find(|a| a.actor == id)
    }
}

impl fmt::Display for SimReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} cat meals, {} mouse meals in {:?}",
            self.meals(Species::Cat),
            self.meals(Species::Mouse),
            self.elapsed
        )?;
        writeln!(
            f,
            "peak feeders {}, hand-offs {}, forced hand-offs {}, re-checks {}",
            self.peak_feeders,
            self.arbiter.hand_offs,
            self.arbiter.forced_hand_offs,
            self.arbiter.rechecks
        )?;
        for a in &self.actors {
            writeln!(
                f,
                "  {:<10} meals {:>3}  mean wait {:>10?}  max wait {:>10?}",
                a.actor.to_string(),
                a.meals,
                a.mean_wait(),
                a.max_wait
            )?;
        }
        if self.violations.is_empty() {
            write!(f, "no violations")
        } else {
            write!(f, "{} violations", self.violations.len())?;
            for v in &self.violations {
                write!(f, "\n  {v}")?;
            }
            Ok(())
        }
    }
}
