//! The feeding-arbitration state machine.
//!
//! [`ArbiterState`] holds everything the arbiter knows: which bowls are
//! occupied, which species holds the turn, and how many actors of each
//! species are blocked waiting to feed. It performs no locking and never
//! blocks; the arbiter front-ends serialise every call (a mutex in the
//! monitor, a single owning thread in the dispatcher) and turn
//! [`Admission::Blocked`] into an actual suspension.
//!
//! # Turn hand-off
//!
//! The turn only moves while the floor is empty. When the last feeder of
//! a species leaves, the turn is offered to the other species first and
//! falls back to the leaving species only if nobody of the other species
//! is waiting. A waiter that finds the floor empty but the turn held by
//! the other species runs the same hand-off with itself as the preferred
//! species (a *forced* hand-off), so the first arrival on an idle floor
//! never waits for an unrelated exit.

use crate::error::{ConfigError, InvariantViolation, ProtocolError, ShutdownError};
use crate::id::BowlId;
use crate::metrics::ArbiterMetrics;
use crate::species::{Species, SpeciesMap};

// ── Outcomes ───────────────────────────────────────────────────────

/// Result of evaluating the admission predicate for one waiter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Admission {
    /// The waiter now holds its bowl.
    Granted {
        /// Species chosen by a forced hand-off performed during this
        /// check, whose waiters must be woken.
        hand_off: Option<Species>,
    },
    /// The predicate is false; the waiter must suspend and re-check later.
    Blocked {
        /// Species chosen by a forced hand-off performed during this
        /// check, whose waiters must be woken.
        hand_off: Option<Species>,
    },
}

impl Admission {
    /// Whether the waiter was admitted.
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted { .. })
    }

    /// Species whose waiters must be woken, if a hand-off happened.
    pub fn hand_off(&self) -> Option<Species> {
        match *self {
            Self::Granted { hand_off } | Self::Blocked { hand_off } => hand_off,
        }
    }
}

/// Result of a successful exit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Release {
    /// Species that received the turn because the floor became empty.
    /// Its waiters must be woken.
    pub hand_off: Option<Species>,
}

/// A consistent copy of the arbiter state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArbiterSnapshot {
    /// Species currently holding the turn.
    pub active: Option<Species>,
    /// Number of occupied bowls.
    pub active_count: usize,
    /// Occupied bowls, in ascending order.
    pub occupied: Vec<BowlId>,
    /// Actors blocked in enter, per species.
    pub waiting: SpeciesMap<usize>,
    /// Whether the arbiter has been shut down.
    pub shut_down: bool,
}

impl ArbiterSnapshot {
    /// Whether nobody is feeding and nobody is waiting.
    pub fn is_idle(&self) -> bool {
        self.active_count == 0
            && self.waiting[Species::Cat] == 0
            && self.waiting[Species::Mouse] == 0
    }
}

// ── ArbiterState ───────────────────────────────────────────────────

/// Bowl occupancy, turn and waiter bookkeeping for one bowl pool.
#[derive(Debug)]
pub struct ArbiterState {
    occupied: Vec<bool>,
    active: Option<Species>,
    active_count: usize,
    waiting: SpeciesMap<usize>,
    shut_down: bool,
    metrics: ArbiterMetrics,
}

impl ArbiterState {
    /// Create the state for a pool of `bowl_count` bowls, all free.
    ///
    /// # Errors
    ///
    /// [`ConfigError::NoBowls`] if `bowl_count` is zero,
    /// [`ConfigError::AllocationFailed`] if the occupancy table cannot be
    /// allocated.
    pub fn new(bowl_count: usize) -> Result<Self, ConfigError> {
        if bowl_count == 0 {
            return Err(ConfigError::NoBowls);
        }
        let mut occupied = Vec::new();
        occupied
            .try_reserve_exact(bowl_count)
            .map_err(|_| ConfigError::AllocationFailed { bowl_count })?;
        occupied.resize(bowl_count, false);
        Ok(Self {
            occupied,
            active: None,
            active_count: 0,
            waiting: SpeciesMap::default(),
            shut_down: false,
            metrics: ArbiterMetrics::default(),
        })
    }

    /// Number of bowls in the pool.
    pub fn bowl_count(&self) -> usize {
        self.occupied.len()
    }

    /// Species currently holding the turn.
    pub fn active(&self) -> Option<Species> {
        self.active
    }

    /// Number of occupied bowls.
    pub fn active_count(&self) -> usize {
        self.active_count
    }

    /// Actors of `species` currently blocked in enter.
    pub fn waiting(&self, species: Species) -> usize {
        self.waiting[species]
    }

    /// Whether the arbiter has been shut down.
    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// Counters accumulated so far.
    pub fn metrics(&self) -> &ArbiterMetrics {
        &self.metrics
    }

    /// Translate a boundary bowl id into a slot index.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::BowlOutOfRange`] when `bowl` is not in
    /// `[1, bowl_count]`.
    pub fn slot(&self, bowl: BowlId) -> Result<usize, ProtocolError> {
        bowl.index(self.bowl_count())
            .ok_or(ProtocolError::BowlOutOfRange {
                bowl,
                bowl_count: self.bowl_count(),
            })
    }

    /// Register a new waiter of `species` for `bowl`.
    ///
    /// Must be followed by [`try_admit`](Self::try_admit) calls with the
    /// returned slot until one is granted.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::ShutDown`] or [`ProtocolError::BowlOutOfRange`];
    /// the state is not modified.
    pub fn begin_wait(&mut self, bowl: BowlId, species: Species) -> Result<usize, ProtocolError> {
        if self.shut_down {
            return Err(ProtocolError::ShutDown);
        }
        let slot = self.slot(bowl)?;
        self.waiting[species] += 1;
        Ok(slot)
    }

    /// Evaluate the admission predicate for a registered waiter.
    ///
    /// `recheck` marks a re-evaluation after the waiter was woken; it only
    /// affects metrics. On [`Admission::Granted`] the waiter is no longer
    /// counted as waiting and holds bowl `slot`.
    pub fn try_admit(&mut self, slot: usize, species: Species, recheck: bool) -> Admission {
        debug_assert!(self.waiting[species] > 0, "try_admit without begin_wait");
        if recheck {
            self.metrics.rechecks += 1;
        }

        let mut hand_off = None;
        let mut ready = true;

        if self.active != Some(species) {
            if self.active_count == 0 {
                // Claiming a never-used floor is not counted as forced.
                if self.active.is_some() {
                    self.metrics.forced_hand_offs += 1;
                }
                let chosen = self.hand_off(species);
                hand_off = Some(chosen);
                ready = chosen == species;
            } else {
                ready = false;
            }
        }
        // Redundant with the bowl check while capacity equals the bowl count.
        if self.active_count >= self.bowl_count() {
            ready = false;
        }
        if self.occupied[slot] {
            ready = false;
        }

        if !ready {
            return Admission::Blocked { hand_off };
        }

        self.waiting[species] -= 1;
        self.occupied[slot] = true;
        self.active_count += 1;
        self.active.get_or_insert(species);
        self.metrics.grants[species] += 1;
        self.metrics.peak_occupancy = self.metrics.peak_occupancy.max(self.active_count);
        Admission::Granted { hand_off }
    }

    /// Release `bowl`, held by a feeder of `species`.
    ///
    /// When the floor becomes empty the turn is handed off with the other
    /// species preferred.
    ///
    /// # Errors
    ///
    /// Any [`ProtocolError`] leaves the state untouched.
    pub fn release(&mut self, bowl: BowlId, species: Species) -> Result<Release, ProtocolError> {
        if self.shut_down {
            return Err(ProtocolError::ShutDown);
        }
        let slot = self.slot(bowl)?;
        if !self.occupied[slot] {
            return Err(ProtocolError::BowlNotOccupied { bowl });
        }
        if self.active != Some(species) {
            return Err(ProtocolError::WrongSpecies {
                bowl,
                species,
                active: self.active,
            });
        }

        self.occupied[slot] = false;
        self.active_count -= 1;
        self.metrics.exits += 1;

        let hand_off = if self.active_count == 0 {
            Some(self.hand_off(species.opposite()))
        } else {
            None
        };
        Ok(Release { hand_off })
    }

    /// Give the turn to `preferred` if any of its members are waiting,
    /// otherwise to the other species. Returns the new turn holder.
    ///
    /// Only legal while the floor is empty.
    pub fn hand_off(&mut self, preferred: Species) -> Species {
        debug_assert_eq!(self.active_count, 0, "hand-off with feeders present");
        let chosen = if self.waiting[preferred] > 0 {
            preferred
        } else {
            preferred.opposite()
        };
        if self.active.is_some_and(|prev| prev != chosen) {
            self.metrics.hand_offs += 1;
        }
        self.active = Some(chosen);
        chosen
    }

    /// Mark the arbiter shut down and return the final counters.
    ///
    /// Idempotent.
    ///
    /// # Errors
    ///
    /// [`ShutdownError::Busy`] while any bowl is occupied or any actor is
    /// waiting; the arbiter keeps running.
    pub fn shutdown(&mut self) -> Result<ArbiterMetrics, ShutdownError> {
        if self.shut_down {
            return Ok(self.metrics.clone());
        }
        let waiting_cats = self.waiting[Species::Cat];
        let waiting_mice = self.waiting[Species::Mouse];
        if self.active_count > 0 || waiting_cats > 0 || waiting_mice > 0 {
            return Err(ShutdownError::Busy {
                occupied: self.active_count,
                waiting_cats,
                waiting_mice,
            });
        }
        self.shut_down = true;
        Ok(self.metrics.clone())
    }

    /// Verify the bookkeeping invariants.
    ///
    /// Checks that the occupied count matches the table, that occupied
    /// bowls imply a turn holder, and that the count never exceeds the
    /// pool. Cross-species exclusion follows from the single turn holder
    /// and is checked externally by the simulation ledger.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let occupied = self.occupied.iter().filter(|o| **o).count();
        if occupied != self.active_count {
            return Err(InvariantViolation::CountMismatch {
                active_count: self.active_count,
                occupied,
            });
        }
        if self.active_count > 0 && self.active.is_none() {
            return Err(InvariantViolation::OccupiedWithoutTurn {
                active_count: self.active_count,
            });
        }
        if self.active_count > self.bowl_count() {
            return Err(InvariantViolation::OverCapacity {
                active_count: self.active_count,
                bowl_count: self.bowl_count(),
            });
        }
        Ok(())
    }

    /// Copy out the current state.
    pub fn snapshot(&self) -> ArbiterSnapshot {
        ArbiterSnapshot {
            active: self.active,
            active_count: self.active_count,
            occupied: self
                .occupied
                .iter()
                .enumerate()
                .filter(|(_, o)| **o)
                .map(|(slot, _)| BowlId::from_index(slot))
                .collect(),
            waiting: self.waiting,
            shut_down: self.shut_down,
        }
    }
}
