//! The [`Arbiter`] trait: the boundary between feeding actors and the
//! arbitration engine.

use trough_core::{ArbiterMetrics, ArbiterSnapshot, BowlId, ProtocolError, ShutdownError, Species};

use crate::fatal;

/// Grants and revokes bowl occupancy under the two-species rules.
///
/// An actor calls [`before_feeding`](Arbiter::before_feeding), eats
/// without holding the arbiter, then calls
/// [`after_feeding`](Arbiter::after_feeding) with the same bowl and
/// species. Implementations must be shareable across actor threads.
pub trait Arbiter: Send + Sync {
    /// Number of bowls in the pool. Valid bowls are `1..=bowl_count()`.
    fn bowl_count(&self) -> usize;

    /// Block until `species` may eat at `bowl`, then take the bowl.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::BowlOutOfRange`] or [`ProtocolError::ShutDown`].
    /// Waiting is never an error: the call blocks until admitted.
    fn try_before_feeding(&self, bowl: BowlId, species: Species) -> Result<(), ProtocolError>;

    /// Give back `bowl`, previously granted to `species`.
    ///
    /// # Errors
    ///
    /// Any [`ProtocolError`] when the bowl was not held by the current
    /// turn's species; the arbiter state is not modified.
    fn try_after_feeding(&self, bowl: BowlId, species: Species) -> Result<(), ProtocolError>;

    /// A consistent copy of the current state.
    fn snapshot(&self) -> ArbiterSnapshot;

    /// Counters accumulated so far.
    fn metrics(&self) -> ArbiterMetrics;

    /// Release the arbiter once every actor has finished.
    ///
    /// Idempotent; legal on an arbiter that was never used.
    ///
    /// # Errors
    ///
    /// [`ShutdownError::Busy`] while bowls are occupied or actors wait.
    fn shutdown(&self) -> Result<ArbiterMetrics, ShutdownError>;

    /// Block until `species` may eat at `bowl`, then take the bowl.
    ///
    /// A protocol violation (bad bowl, arbiter shut down) aborts the
    /// process after writing a diagnostic naming the violated rule. Use
    /// [`try_before_feeding`](Arbiter::try_before_feeding) to handle it.
    fn before_feeding(&self, bowl: BowlId, species: Species) {
        if let Err(e) = self.try_before_feeding(bowl, species) {
            fatal::protocol_violation(&e);
        }
    }

    /// Give back `bowl`, possibly handing the turn to the other species.
    ///
    /// A protocol violation (double exit, wrong species, bad bowl, arbiter
    /// shut down) aborts the process after writing a diagnostic naming the
    /// violated rule. The state is left as it was before the call.
    fn after_feeding(&self, bowl: BowlId, species: Species) {
        if let Err(e) = self.try_after_feeding(bowl, species) {
            fatal::protocol_violation(&e);
        }
    }
}
