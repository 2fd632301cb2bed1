//! Running a simulation: spawn actors, collect meals, shut down.
//!
//! ```text
//!   trough-cat-0 ─┐
//!   trough-cat-1 ─┤  MealRecord    ┌───────────┐
//!        ...      ├──────────────▶ │ collector │ ─▶ SimReport
//!   trough-mouse-0┤   [unbounded]  └───────────┘
//!        ...     ─┘
//!          │ before/after_feeding        ▲
//!          ▼                             │ violations, peak
//!      Arc<dyn Arbiter>            Arc<FeedingLedger>
//! ```

use std::error::Error;
use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use trough_arbiter::{Arbiter, ArbiterConfig};
use trough_core::{ConfigError, ShutdownError, Species};

use crate::actor::{Actor, ActorId, BowlPicker, Schedule};
use crate::config::{SimConfig, SimConfigError};
use crate::ledger::FeedingLedger;
use crate::report::{ActorStats, MealRecord, SimReport};

// ── SimError ───────────────────────────────────────────────────────

/// Errors that stop a simulation run.
#[derive(Debug)]
pub enum SimError {
    /// The simulation configuration is invalid.
    Config(SimConfigError),
    /// The arbiter could not be created.
    Arbiter(ConfigError),
    /// An actor thread could not be spawned.
    ThreadSpawnFailed {
        /// Which actor.
        actor: ActorId,
        /// OS error text.
        reason: String,
    },
    /// An actor thread panicked.
    ActorPanicked {
        /// Which actor.
        actor: ActorId,
    },
    /// The arbiter refused to shut down after every actor finished.
    Shutdown(ShutdownError),
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Arbiter(e) => write!(f, "arbiter: {e}"),
            Self::ThreadSpawnFailed { actor, reason } => {
                write!(f, "failed to spawn {actor}: {reason}")
            }
            Self::ActorPanicked { actor } => write!(f, "{actor} panicked"),
            Self::Shutdown(e) => write!(f, "shutdown: {e}"),
        }
    }
}

impl Error for SimError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Arbiter(e) => Some(e),
            Self::Shutdown(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SimConfigError> for SimError {
    fn from(e: SimConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<ConfigError> for SimError {
    fn from(e: ConfigError) -> Self {
        Self::Arbiter(e)
    }
}

impl From<ShutdownError> for SimError {
    fn from(e: ShutdownError) -> Self {
        Self::Shutdown(e)
    }
}

// ── Simulation ─────────────────────────────────────────────────────

/// Entry points for running the feeding simulation.
pub struct Simulation;

impl Simulation {
    /// Build an arbiter of `config.mode` over `config.bowls` bowls and run.
    pub fn run(config: &SimConfig) -> Result<SimReport, SimError> {
        config.validate()?;
        let arbiter = trough_arbiter::build(config.mode, ArbiterConfig::new(config.bowls))?;
        Self::run_with(config, arbiter)
    }

    /// Run against a caller-supplied arbiter.
    ///
    /// Actors pick bowls from the arbiter's own pool; `config.bowls` is
    /// only used by [`run`](Self::run). The arbiter is shut down once every
    /// actor has finished.
    pub fn run_with(config: &SimConfig, arbiter: Arc<dyn Arbiter>) -> Result<SimReport, SimError> {
        config.validate()?;
        let bowl_count = arbiter.bowl_count();
        let ledger = Arc::new(FeedingLedger::new(bowl_count));
        let (meals_tx, meals_rx) = crossbeam_channel::unbounded::<MealRecord>();

        tracing::info!(
            bowls = bowl_count,
            cats = config.cats,
            mice = config.mice,
            iterations = config.iterations,
            seed = config.seed,
            "simulation starting"
        );
        let started = Instant::now();

        let mut stats: Vec<ActorStats> = Vec::with_capacity(config.cats + config.mice);
        let mut handles: Vec<(ActorId, JoinHandle<()>)> = Vec::with_capacity(stats.capacity());
        let mut spawn_error = None;

        'spawn: for species in Species::ALL {
            for index in 0..config.population(species) {
                let id = ActorId::new(species, index);
                let actor = Actor {
                    id,
                    schedule: Schedule {
                        iterations: config.iterations,
                        eat: config.eat_time(species),
                        sleep: config.sleep_time(species),
                    },
                    picker: BowlPicker::new(config.seed, id, bowl_count),
                    arbiter: Arc::clone(&arbiter),
                    ledger: Arc::clone(&ledger),
                    meals: meals_tx.clone(),
                };
                match thread::Builder::new()
                    .name(id.thread_name())
                    .spawn(move || actor.run())
                {
                    Ok(handle) => {
                        stats.push(ActorStats::new(id));
                        handles.push((id, handle));
                    }
                    Err(e) => {
                        spawn_error = Some(SimError::ThreadSpawnFailed {
                            actor: id,
                            reason: e.to_string(),
                        });
                        break 'spawn;
                    }
                }
            }
        }
        drop(meals_tx);

        // Drains until every actor has dropped its sender.
        for meal in meals_rx.iter() {
            if let Some(s) = stats.iter_mut().find(|s| s.actor == meal.actor) {
                s.record(&meal);
            }
        }

        let mut panicked = None;
        for (id, handle) in handles {
            if handle.join().is_err() {
                tracing::error!(actor = %id, "actor panicked");
                panicked.get_or_insert(SimError::ActorPanicked { actor: id });
            }
        }
        if let Some(e) = spawn_error.or(panicked) {
            return Err(e);
        }

        let metrics = arbiter.shutdown()?;
        let report = SimReport {
            actors: stats,
            iterations: config.iterations,
            violations: ledger.violations(),
            peak_feeders: ledger.peak_feeders(),
            elapsed: started.elapsed(),
            arbiter: metrics,
        };

        if report.violations.is_empty() {
            tracing::info!(
                elapsed = ?report.elapsed,
                hand_offs = report.arbiter.hand_offs,
                peak = report.peak_feeders,
                "simulation finished"
            );
        } else {
            tracing::warn!(
                violations = report.violations.len(),
                "simulation finished with exclusion violations"
            );
        }
        Ok(report)
    }
}
