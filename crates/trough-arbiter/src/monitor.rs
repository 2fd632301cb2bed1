//! Monitor-based arbiter: one mutex, one condition variable per species.
//!
//! [`FeedingArbiter`] wraps an [`ArbiterState`] in a `Mutex`. A caller that
//! cannot be admitted sleeps on its species' condvar, which atomically
//! releases the mutex; when a hand-off gives the turn to a species, every
//! member of that species is woken and each re-evaluates the full admission
//! predicate, going back to sleep if its bowl is still taken.
//!
//! Protocol violations are detected before any mutation and reported after
//! the guard is released, so the state is consistent at every unlock. A
//! poisoned mutex is therefore recovered rather than propagated.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use trough_core::{
    ArbiterMetrics, ArbiterSnapshot, ArbiterState, BowlId, ConfigError, ProtocolError,
    ShutdownError, Species, SpeciesMap,
};

use crate::arbiter::Arbiter;
use crate::config::ArbiterConfig;
use crate::fatal;

/// Lock-plus-condvar arbiter, shared by reference between actor threads.
///
/// # Example
///
/// ```
/// use trough_arbiter::{Arbiter, ArbiterConfig, FeedingArbiter};
/// use trough_core::{BowlId, Species};
///
/// let arbiter = FeedingArbiter::new(ArbiterConfig::new(2)).unwrap();
/// arbiter.before_feeding(BowlId(1), Species::Mouse);
/// arbiter.before_feeding(BowlId(2), Species::Mouse);
/// assert_eq!(arbiter.snapshot().active_count, 2);
/// arbiter.after_feeding(BowlId(1), Species::Mouse);
/// arbiter.after_feeding(BowlId(2), Species::Mouse);
/// arbiter.shutdown().unwrap();
/// ```
pub struct FeedingArbiter {
    state: Mutex<ArbiterState>,
    turn: SpeciesMap<Condvar>,
    verify_invariants: bool,
}

// Compile-time assertion: FeedingArbiter must be Send + Sync.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<FeedingArbiter>();
};

impl FeedingArbiter {
    /// Create an arbiter with every bowl free and no species holding the
    /// turn.
    ///
    /// # Errors
    ///
    /// [`ConfigError::NoBowls`] or [`ConfigError::AllocationFailed`].
    pub fn new(config: ArbiterConfig) -> Result<Self, ConfigError> {
        let state = ArbiterState::new(config.bowl_count)?;
        tracing::debug!(bowls = config.bowl_count, "feeding arbiter initialised");
        Ok(Self {
            state: Mutex::new(state),
            turn: SpeciesMap::new(Condvar::new(), Condvar::new()),
            verify_invariants: config.verify_invariants,
        })
    }

    fn lock(&self) -> MutexGuard<'_, ArbiterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn verify(&self, state: &ArbiterState) {
        if self.verify_invariants {
            if let Err(v) = state.check_invariants() {
                fatal::invariant_violation(&v);
            }
        }
    }
}

impl Arbiter for FeedingArbiter {
    fn bowl_count(&self) -> usize {
        self.lock().bowl_count()
    }

    fn try_before_feeding(&self, bowl: BowlId, species: Species) -> Result<(), ProtocolError> {
        let mut state = self.lock();
        let slot = state.begin_wait(bowl, species)?;

        let mut recheck = false;
        loop {
            let admission = state.try_admit(slot, species, recheck);
            if let Some(next) = admission.hand_off() {
                tracing::debug!(turn = %next, "turn taken on idle floor");
                self.turn[next].notify_all();
            }
            if admission.is_granted() {
                break;
            }
            state = self.turn[species]
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
            recheck = true;
        }

        self.verify(&state);
        tracing::trace!(%bowl, %species, feeding = state.active_count(), "bowl granted");
        Ok(())
    }

    fn try_after_feeding(&self, bowl: BowlId, species: Species) -> Result<(), ProtocolError> {
        let mut state = self.lock();
        let release = state.release(bowl, species)?;
        self.verify(&state);
        tracing::trace!(%bowl, %species, feeding = state.active_count(), "bowl released");

        if let Some(next) = release.hand_off {
            tracing::debug!(
                from = %species,
                to = %next,
                waiting = state.waiting(next),
                "turn handed off"
            );
            self.turn[next].notify_all();
        }
        Ok(())
    }

    fn snapshot(&self) -> ArbiterSnapshot {
        self.lock().snapshot()
    }

    fn metrics(&self) -> ArbiterMetrics {
        self.lock().metrics().clone()
    }

    fn shutdown(&self) -> Result<ArbiterMetrics, ShutdownError> {
        let mut state = self.lock();
        let already = state.is_shut_down();
        match state.shutdown() {
            Ok(metrics) => {
                if !already {
                    tracing::debug!(
                        grants = metrics.total_grants(),
                        hand_offs = metrics.hand_offs,
                        "feeding arbiter shut down"
                    );
                }
                Ok(metrics)
            }
            Err(e) => {
                tracing::warn!(error = %e, "shutdown refused");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use trough_test_utils::{is_isolated_child, run_isolated};

    fn arbiter(bowls: usize) -> Arc<FeedingArbiter> {
        Arc::new(FeedingArbiter::new(ArbiterConfig::new(bowls)).unwrap())
    }

    #[test]
    fn zero_bowls_is_a_config_error() {
        assert_eq!(
            FeedingArbiter::new(ArbiterConfig::new(0)).err(),
            Some(ConfigError::NoBowls)
        );
    }

    #[test]
    fn first_grant_sets_turn() {
        let arb = arbiter(1);
        assert_eq!(arb.snapshot().active, None);
        arb.before_feeding(BowlId(1), Species::Cat);
        let snap = arb.snapshot();
        assert_eq!(snap.active, Some(Species::Cat));
        assert_eq!(snap.occupied, vec![BowlId(1)]);
        arb.after_feeding(BowlId(1), Species::Cat);
        assert!(arb.snapshot().is_idle());
    }

    #[test]
    fn waiter_is_counted_while_blocked() {
        let arb = arbiter(1);
        arb.before_feeding(BowlId(1), Species::Mouse);

        let waiter = {
            let arb = Arc::clone(&arb);
            thread::spawn(move || {
                arb.before_feeding(BowlId(1), Species::Cat);
                arb.after_feeding(BowlId(1), Species::Cat);
            })
        };

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while arb.snapshot().waiting[Species::Cat] == 0 {
            assert!(std::time::Instant::now() < deadline, "cat never started waiting");
            thread::yield_now();
        }
        assert_eq!(
            arb.shutdown().unwrap_err(),
            ShutdownError::Busy {
                occupied: 1,
                waiting_cats: 1,
                waiting_mice: 0,
            }
        );

        arb.after_feeding(BowlId(1), Species::Mouse);
        waiter.join().unwrap();

        let metrics = arb.shutdown().unwrap();
        assert_eq!(metrics.grants[Species::Cat], 1);
        assert_eq!(metrics.grants[Species::Mouse], 1);
        assert_eq!(metrics.hand_offs, 1);
        assert!(metrics.rechecks >= 1);
    }

    #[test]
    fn rejected_exit_leaves_state_unchanged() {
        let arb = arbiter(2);
        arb.before_feeding(BowlId(1), Species::Mouse);
        let before = arb.snapshot();
        assert_eq!(
            arb.try_after_feeding(BowlId(1), Species::Cat),
            Err(ProtocolError::WrongSpecies {
                bowl: BowlId(1),
                species: Species::Cat,
                active: Some(Species::Mouse),
            })
        );
        assert_eq!(
            arb.try_after_feeding(BowlId(2), Species::Mouse),
            Err(ProtocolError::BowlNotOccupied { bowl: BowlId(2) })
        );
        assert_eq!(arb.snapshot(), before);

        // A rejected call leaves the arbiter fully usable.
        arb.after_feeding(BowlId(1), Species::Mouse);
        arb.before_feeding(BowlId(2), Species::Cat);
        arb.after_feeding(BowlId(2), Species::Cat);
        assert!(arb.shutdown().is_ok());
    }

    #[test]
    fn exit_by_wrong_species_aborts_the_process() {
        if is_isolated_child() {
            let arb = arbiter(1);
            arb.before_feeding(BowlId(1), Species::Mouse);
            arb.after_feeding(BowlId(1), Species::Cat);
            return;
        }
        run_isolated("monitor::tests::exit_by_wrong_species_aborts_the_process")
            .assert_aborted_with(
                "feeding protocol violation: cat exiting bowl 1 while the turn belongs to mouse",
            );
    }
}
