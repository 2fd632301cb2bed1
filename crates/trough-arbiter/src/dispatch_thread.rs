//! Request loop for the dispatch arbiter.
//!
//! The dispatch thread owns [`ArbiterState`] exclusively (moved in via
//! `thread::spawn`). Requests arrive over a bounded crossbeam channel, each
//! carrying a one-shot reply channel. An enter request that cannot be
//! admitted is parked in its species' list without a reply; the requester
//! stays blocked on its reply channel until a hand-off re-scans the list and
//! admits it. The scan works in place, so once the parked lists have grown
//! to the peak number of waiters, serving requests does not reallocate them.

use crossbeam_channel::{Receiver, Sender};

use trough_core::{
    ArbiterMetrics, ArbiterSnapshot, ArbiterState, BowlId, ProtocolError, ShutdownError, Species,
    SpeciesMap,
};

use crate::fatal;

/// One message from an arbiter handle to the dispatch thread.
pub(crate) enum Request {
    Enter {
        bowl: BowlId,
        species: Species,
        reply: Sender<Result<(), ProtocolError>>,
    },
    Exit {
        bowl: BowlId,
        species: Species,
        reply: Sender<Result<(), ProtocolError>>,
    },
    Snapshot {
        reply: Sender<ArbiterSnapshot>,
    },
    Metrics {
        reply: Sender<ArbiterMetrics>,
    },
    Shutdown {
        reply: Sender<Result<ArbiterMetrics, ShutdownError>>,
    },
}

/// An enter request waiting for its species to be woken.
struct Parked {
    slot: usize,
    reply: Sender<Result<(), ProtocolError>>,
}

/// State held by the dispatch thread's main loop.
pub(crate) struct DispatchThreadState {
    state: ArbiterState,
    parked: SpeciesMap<Vec<Parked>>,
    requests: Receiver<Request>,
    verify_invariants: bool,
}

impl DispatchThreadState {
    pub fn new(state: ArbiterState, requests: Receiver<Request>, verify_invariants: bool) -> Self {
        let room = state.bowl_count();
        Self {
            state,
            parked: SpeciesMap::new(Vec::with_capacity(room), Vec::with_capacity(room)),
            requests,
            verify_invariants,
        }
    }

    /// Serve requests until a shutdown succeeds or every handle is gone.
    ///
    /// Consumes self and returns the final state so the handle can keep
    /// answering snapshot and metrics queries after shutdown.
    pub fn run(mut self) -> ArbiterState {
        while let Ok(request) = self.requests.recv() {
            match request {
                Request::Enter {
                    bowl,
                    species,
                    reply,
                } => self.enter(bowl, species, reply),
                Request::Exit {
                    bowl,
                    species,
                    reply,
                } => {
                    let result = self.exit(bowl, species);
                    let _ = reply.send(result);
                }
                Request::Snapshot { reply } => {
                    let _ = reply.send(self.state.snapshot());
                }
                Request::Metrics { reply } => {
                    let _ = reply.send(self.state.metrics().clone());
                }
                Request::Shutdown { reply } => {
                    let result = self.state.shutdown();
                    let done = result.is_ok();
                    let _ = reply.send(result);
                    if done {
                        break;
                    }
                }
            }
        }
        tracing::debug!("dispatch thread stopped");
        self.state
    }

    fn enter(&mut self, bowl: BowlId, species: Species, reply: Sender<Result<(), ProtocolError>>) {
        let slot = match self.state.begin_wait(bowl, species) {
            Ok(slot) => slot,
            Err(e) => {
                let _ = reply.send(Err(e));
                return;
            }
        };

        let admission = self.state.try_admit(slot, species, false);
        if admission.is_granted() {
            self.verify();
            tracing::trace!(%bowl, %species, "bowl granted");
            let _ = reply.send(Ok(()));
        } else {
            self.parked[species].push(Parked { slot, reply });
        }
        if let Some(next) = admission.hand_off() {
            tracing::debug!(turn = %next, "turn taken on idle floor");
            self.wake(next);
        }
    }

    fn exit(&mut self, bowl: BowlId, species: Species) -> Result<(), ProtocolError> {
        let release = self.state.release(bowl, species)?;
        self.verify();
        tracing::trace!(%bowl, %species, "bowl released");
        if let Some(next) = release.hand_off {
            tracing::debug!(from = %species, to = %next, "turn handed off");
            self.wake(next);
        }
        Ok(())
    }

    /// Re-check every parked request of `species` in arrival order,
    /// admitting those whose bowl is free and leaving the rest parked.
    fn wake(&mut self, species: Species) {
        let mut i = 0;
        while i < self.parked[species].len() {
            let admission = self.state.try_admit(self.parked[species][i].slot, species, true);
            // The woken species already holds the turn.
            debug_assert!(admission.hand_off().is_none());
            if admission.is_granted() {
                let p = self.parked[species].remove(i);
                self.verify();
                let _ = p.reply.send(Ok(()));
            } else {
                i += 1;
            }
        }
    }

    fn verify(&self) {
        if self.verify_invariants {
            if let Err(v) = self.state.check_invariants() {
                fatal::invariant_violation(&v);
            }
        }
    }
}
