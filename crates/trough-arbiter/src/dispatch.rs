//! Channel-based arbiter: a single dispatch thread owns the state.
//!
//! ```text
//! Actor threads                          Dispatch thread
//!     |                                        |
//!     |--Enter{bowl, species, reply}---------->| begin_wait + try_admit
//!     |   [requests: bounded(request_queue)]   |   granted -> reply Ok
//!     |   blocks on reply                      |   blocked -> park
//!     |                                        |
//!     |--Exit{bowl, species, reply}----------->| release
//!     |<--Ok / ProtocolError-------------------|   hand-off -> re-scan parked
//!     |                                        |   requests of the new turn
//!     |<--Ok (parked enter admitted)-----------|
//! ```
//!
//! Every state transition is serialised by the dispatch thread, so this is
//! semantically the same arbiter as [`FeedingArbiter`](crate::FeedingArbiter)
//! without a lock on the actors' side.
//!
//! The thread only stops cleanly after a successful shutdown or when the
//! handle is dropped. If it dies any other way, the next call that notices
//! (enter, exit, snapshot, metrics, shutdown or drop) aborts the process
//! with the thread's panic message rather than reporting a shutdown.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use crossbeam_channel::Sender;

use trough_core::{
    ArbiterMetrics, ArbiterSnapshot, ArbiterState, BowlId, ConfigError, ProtocolError,
    ShutdownError, Species,
};

use crate::arbiter::Arbiter;
use crate::config::ArbiterConfig;
use crate::dispatch_thread::{DispatchThreadState, Request};
use crate::fatal;

/// Arbiter whose state lives on a dedicated thread.
///
/// Dropping the handle disconnects the request channel and joins the
/// thread.
pub struct DispatchArbiter {
    requests: Option<Sender<Request>>,
    thread: Mutex<Option<JoinHandle<ArbiterState>>>,
    /// Final state recovered from the dispatch thread after it stops.
    retired: Mutex<Option<ArbiterState>>,
    bowl_count: usize,
}

// Compile-time assertion: DispatchArbiter must be Send + Sync.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<DispatchArbiter>();
};

impl DispatchArbiter {
    /// Create the arbiter and spawn its dispatch thread.
    ///
    /// # Errors
    ///
    /// [`ConfigError::NoBowls`], [`ConfigError::AllocationFailed`] or
    /// [`ConfigError::ThreadSpawnFailed`].
    pub fn new(config: ArbiterConfig) -> Result<Self, ConfigError> {
        Self::spawn(config, DispatchThreadState::run)
    }

    /// Spawn the dispatch thread with `serve` as its request loop.
    fn spawn(
        config: ArbiterConfig,
        serve: fn(DispatchThreadState) -> ArbiterState,
    ) -> Result<Self, ConfigError> {
        let state = ArbiterState::new(config.bowl_count)?;
        let (tx, rx) = crossbeam_channel::bounded(config.request_queue);
        let verify = config.verify_invariants;

        let handle = thread::Builder::new()
            .name("trough-dispatch".into())
            .spawn(move || serve(DispatchThreadState::new(state, rx, verify)))
            .map_err(|e| ConfigError::ThreadSpawnFailed {
                reason: format!("dispatch thread: {e}"),
            })?;

        tracing::debug!(bowls = config.bowl_count, "dispatch arbiter started");
        Ok(Self {
            requests: Some(tx),
            thread: Mutex::new(Some(handle)),
            retired: Mutex::new(None),
            bowl_count: config.bowl_count,
        })
    }

    /// Send a request and wait for its reply.
    ///
    /// Returns `None` once the dispatch thread has stopped.
    fn request<T>(&self, make: impl FnOnce(Sender<T>) -> Request) -> Option<T> {
        let requests = self.requests.as_ref()?;
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        requests.send(make(reply_tx)).ok()?;
        reply_rx.recv().ok()
    }

    /// Join the stopped dispatch thread (once) and expose its final state.
    ///
    /// A thread that panicked has no state to hand back; that is fatal.
    fn reap(&self) -> MutexGuard<'_, Option<ArbiterState>> {
        let mut retired = self.retired.lock().unwrap_or_else(PoisonError::into_inner);
        if retired.is_none() {
            let handle = self
                .thread
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take();
            if let Some(handle) = handle {
                match handle.join() {
                    Ok(state) => *retired = Some(state),
                    Err(payload) => fatal::dispatch_failed(fatal::panic_message(&*payload)),
                }
            }
        }
        retired
    }

    fn with_retired<T>(&self, f: impl FnOnce(&ArbiterState) -> T) -> T {
        match self.reap().as_ref() {
            Some(state) => f(state),
            None => fatal::dispatch_failed("no final state was recorded"),
        }
    }
}

impl Arbiter for DispatchArbiter {
    fn bowl_count(&self) -> usize {
        self.bowl_count
    }

    fn try_before_feeding(&self, bowl: BowlId, species: Species) -> Result<(), ProtocolError> {
        self.request(|reply| Request::Enter {
            bowl,
            species,
            reply,
        })
        .unwrap_or_else(|| self.with_retired(|_| Err(ProtocolError::ShutDown)))
    }

    fn try_after_feeding(&self, bowl: BowlId, species: Species) -> Result<(), ProtocolError> {
        self.request(|reply| Request::Exit {
            bowl,
            species,
            reply,
        })
        .unwrap_or_else(|| self.with_retired(|_| Err(ProtocolError::ShutDown)))
    }

    fn snapshot(&self) -> ArbiterSnapshot {
        self.request(|reply| Request::Snapshot { reply })
            .unwrap_or_else(|| self.with_retired(ArbiterState::snapshot))
    }

    fn metrics(&self) -> ArbiterMetrics {
        self.request(|reply| Request::Metrics { reply })
            .unwrap_or_else(|| self.with_retired(|s| s.metrics().clone()))
    }

    fn shutdown(&self) -> Result<ArbiterMetrics, ShutdownError> {
        match self.request(|reply| Request::Shutdown { reply }) {
            Some(Err(e)) => {
                tracing::warn!(error = %e, "shutdown refused");
                Err(e)
            }
            Some(Ok(metrics)) => {
                drop(self.reap());
                tracing::debug!(
                    grants = metrics.total_grants(),
                    hand_offs = metrics.hand_offs,
                    "dispatch arbiter shut down"
                );
                Ok(metrics)
            }
            None => Ok(self.with_retired(|s| s.metrics().clone())),
        }
    }
}

impl Drop for DispatchArbiter {
    fn drop(&mut self) {
        // Disconnecting the channel ends the request loop.
        self.requests.take();
        drop(self.reap());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trough_test_utils::{is_isolated_child, run_isolated};

    fn lose_state(_: DispatchThreadState) -> ArbiterState {
        panic!("request loop lost its state")
    }

    #[test]
    fn shutdown_is_idempotent_and_blocks_further_requests() {
        let arb = DispatchArbiter::new(ArbiterConfig::new(2)).unwrap();
        arb.before_feeding(BowlId(2), Species::Cat);
        assert!(matches!(arb.shutdown(), Err(ShutdownError::Busy { occupied: 1, .. })));
        arb.after_feeding(BowlId(2), Species::Cat);

        let first = arb.shutdown().unwrap();
        let second = arb.shutdown().unwrap();
        assert_eq!(first, second);
        assert_eq!(first.grants[Species::Cat], 1);

        assert_eq!(
            arb.try_before_feeding(BowlId(1), Species::Cat),
            Err(ProtocolError::ShutDown)
        );
        let snap = arb.snapshot();
        assert!(snap.shut_down);
        assert!(snap.is_idle());
    }

    #[test]
    fn drop_without_shutdown_joins_thread() {
        let arb = DispatchArbiter::new(ArbiterConfig::new(1)).unwrap();
        arb.before_feeding(BowlId(1), Species::Mouse);
        arb.after_feeding(BowlId(1), Species::Mouse);
        drop(arb);
    }

    #[test]
    fn out_of_range_bowl_is_reported() {
        let arb = DispatchArbiter::new(ArbiterConfig::new(1)).unwrap();
        assert_eq!(
            arb.try_before_feeding(BowlId(2), Species::Mouse),
            Err(ProtocolError::BowlOutOfRange {
                bowl: BowlId(2),
                bowl_count: 1,
            })
        );
        assert!(arb.snapshot().is_idle());
    }

    #[test]
    fn dead_dispatch_thread_aborts_an_enter() {
        if is_isolated_child() {
            let arb = DispatchArbiter::spawn(ArbiterConfig::new(1), lose_state).unwrap();
            let _ = arb.try_before_feeding(BowlId(1), Species::Cat);
            return;
        }
        run_isolated("dispatch::tests::dead_dispatch_thread_aborts_an_enter")
            .assert_aborted_with("dispatch thread failed: request loop lost its state");
    }

    #[test]
    fn dead_dispatch_thread_aborts_a_snapshot() {
        if is_isolated_child() {
            let arb = DispatchArbiter::spawn(ArbiterConfig::new(1), lose_state).unwrap();
            let _ = arb.snapshot();
            return;
        }
        run_isolated("dispatch::tests::dead_dispatch_thread_aborts_a_snapshot")
            .assert_aborted_with("dispatch thread failed: request loop lost its state");
    }

    #[test]
    fn enter_after_shutdown_is_still_a_shutdown_error() {
        let arb = DispatchArbiter::new(ArbiterConfig::new(1)).unwrap();
        arb.shutdown().unwrap();
        for _ in 0..2 {
            assert_eq!(
                arb.try_after_feeding(BowlId(1), Species::Mouse),
                Err(ProtocolError::ShutDown)
            );
        }
        assert_eq!(arb.metrics().total_grants(), 0);
    }
}
