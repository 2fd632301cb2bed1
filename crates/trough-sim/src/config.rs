//! Simulation configuration and validation.

use std::error::Error;
use std::fmt;
use std::time::Duration;

use trough_arbiter::ArbiterMode;
use trough_core::Species;

// ── SimConfig ──────────────────────────────────────────────────────

/// Parameters for one simulation run.
#[derive(Clone, Debug)]
pub struct SimConfig {
    /// Number of bowls in the pool. Default: 5.
    pub bowls: usize,
    /// Number of cat actors. Default: 6.
    pub cats: usize,
    /// Number of mouse actors. Default: 2.
    pub mice: usize,
    /// Meals each actor eats before it stops. Default: 4.
    pub iterations: u32,
    /// Time a cat spends at the bowl. Default: 2 ms.
    pub cat_eat: Duration,
    /// Time a cat sleeps before each meal. Default: 4 ms.
    pub cat_sleep: Duration,
    /// Time a mouse spends at the bowl. Default: 1 ms.
    pub mouse_eat: Duration,
    /// Time a mouse sleeps before each meal. Default: 4 ms.
    pub mouse_sleep: Duration,
    /// Base seed for the actors' bowl choices. Default: 42.
    pub seed: u64,
    /// Which arbiter [`Simulation::run`](crate::Simulation::run) builds.
    pub mode: ArbiterMode,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            bowls: 5,
            cats: 6,
            mice: 2,
            iterations: 4,
            cat_eat: Duration::from_millis(2),
            cat_sleep: Duration::from_millis(4),
            mouse_eat: Duration::from_millis(1),
            mouse_sleep: Duration::from_millis(4),
            seed: 42,
            mode: ArbiterMode::Monitor,
        }
    }
}

impl SimConfig {
    /// Check that the run can make progress.
    pub fn validate(&self) -> Result<(), SimConfigError> {
        if self.bowls == 0 {
            return Err(SimConfigError::NoBowls);
        }
        if self.cats == 0 && self.mice == 0 {
            return Err(SimConfigError::NoActors);
        }
        if self.iterations == 0 {
            return Err(SimConfigError::NoIterations);
        }
        Ok(())
    }

    /// Number of actors of `species`.
    pub fn population(&self, species: Species) -> usize {
        match species {
            Species::Cat => self.cats,
            Species::Mouse => self.mice,
        }
    }

    /// How long `species` eats per meal.
    pub fn eat_time(&self, species: Species) -> Duration {
        match species {
            Species::Cat => self.cat_eat,
            Species::Mouse => self.mouse_eat,
        }
    }

    /// How long `species` sleeps between meals.
    pub fn sleep_time(&self, species: Species) -> Duration {
        match species {
            Species::Cat => self.cat_sleep,
            Species::Mouse => self.mouse_sleep,
        }
    }
}

// ── SimConfigError ─────────────────────────────────────────────────

/// Errors detected by [`SimConfig::validate`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SimConfigError {
    /// The pool has no bowls.
    NoBowls,
    /// Neither cats nor mice were requested.
    NoActors,
    /// Actors would not eat at all.
    NoIterations,
}

impl fmt::Display for SimConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoBowls => write!(f, "simulation needs at least one bowl"),
            Self::NoActors => write!(f, "simulation needs at least one cat or mouse"),
            Self::NoIterations => write!(f, "iterations must be at least 1"),
        }
    }
}

impl Error for SimConfigError {}
