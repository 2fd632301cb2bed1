//! Error types for the Trough arbiter.
//!
//! Organised by who is at fault: [`ConfigError`] for startup failures,
//! [`ProtocolError`] for callers breaking the enter/exit contract,
//! [`ShutdownError`] for a shutdown requested while the floor is busy, and
//! [`InvariantViolation`] for bugs inside the arbiter itself.

use std::error::Error;
use std::fmt;

use crate::id::BowlId;
use crate::species::Species;

// ── ConfigError ────────────────────────────────────────────────────

/// Errors raised while constructing an arbiter.
///
/// All of these are fatal for startup: there is no degraded mode and no
/// partially initialised arbiter is ever handed out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// The bowl pool must contain at least one bowl.
    NoBowls,
    /// The occupancy table could not be allocated.
    AllocationFailed {
        /// The requested number of bowls.
        bowl_count: usize,
    },
    /// A background thread could not be spawned.
    ThreadSpawnFailed {
        /// Description of which thread failed and why.
        reason: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoBowls => write!(f, "bowl_count must be at least 1"),
            Self::AllocationFailed { bowl_count } => {
                write!(f, "could not allocate occupancy table for {bowl_count} bowls")
            }
            Self::ThreadSpawnFailed { reason } => write!(f, "thread spawn failed: {reason}"),
        }
    }
}

impl Error for ConfigError {}

// ── ProtocolError ──────────────────────────────────────────────────

/// A caller broke the feeding protocol.
///
/// These are programming-contract violations, not environmental failures.
/// When one is detected the arbiter state is left exactly as it was.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProtocolError {
    /// The bowl number lies outside `[1, bowl_count]`.
    BowlOutOfRange {
        /// The offending bowl.
        bowl: BowlId,
        /// Number of bowls in the pool.
        bowl_count: usize,
    },
    /// Exit was called for a bowl nobody is eating at (e.g. a double exit).
    BowlNotOccupied {
        /// The offending bowl.
        bowl: BowlId,
    },
    /// Exit was called by a species that does not hold the current turn.
    WrongSpecies {
        /// The bowl named in the exit call.
        bowl: BowlId,
        /// The species named in the exit call.
        species: Species,
        /// The species currently holding the turn, if any.
        active: Option<Species>,
    },
    /// The arbiter has already been shut down.
    ShutDown,
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BowlOutOfRange { bowl, bowl_count } => {
                write!(f, "bowl {bowl} is outside the valid range 1..={bowl_count}")
            }
            Self::BowlNotOccupied { bowl } => {
                write!(f, "exit from bowl {bowl}, which is not occupied")
            }
            Self::WrongSpecies {
                bowl,
                species,
                active,
            } => {
                write!(f, "{species} exiting bowl {bowl} while the turn belongs to ")?;
                match active {
                    Some(a) => write!(f, "{a}"),
                    None => write!(f, "nobody"),
                }
            }
            Self::ShutDown => write!(f, "arbiter has been shut down"),
        }
    }
}

impl Error for ProtocolError {}

// ── ShutdownError ──────────────────────────────────────────────────

/// Shutdown was requested while actors were still using the arbiter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ShutdownError {
    /// Bowls are occupied or actors are blocked waiting to feed.
    Busy {
        /// Number of occupied bowls.
        occupied: usize,
        /// Cats blocked in enter.
        waiting_cats: usize,
        /// Mice blocked in enter.
        waiting_mice: usize,
    },
}

impl fmt::Display for ShutdownError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Busy {
                occupied,
                waiting_cats,
                waiting_mice,
            } => write!(
                f,
                "arbiter still busy: {occupied} bowls occupied, \
                 {waiting_cats} cats and {waiting_mice} mice waiting"
            ),
        }
    }
}

impl Error for ShutdownError {}

// ── InvariantViolation ─────────────────────────────────────────────

/// An internal arbiter invariant does not hold.
///
/// Unlike [`ProtocolError`] this is never the caller's fault.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvariantViolation {
    /// `active_count` disagrees with the number of occupied bowls.
    CountMismatch {
        /// The tracked count.
        active_count: usize,
        /// The number of bowls actually marked occupied.
        occupied: usize,
    },
    /// Bowls are occupied but no species holds the turn.
    OccupiedWithoutTurn {
        /// The tracked count.
        active_count: usize,
    },
    /// More bowls are occupied than exist.
    OverCapacity {
        /// The tracked count.
        active_count: usize,
        /// Number of bowls in the pool.
        bowl_count: usize,
    },
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CountMismatch {
                active_count,
                occupied,
            } => write!(
                f,
                "active_count {active_count} does not match {occupied} occupied bowls"
            ),
            Self::OccupiedWithoutTurn { active_count } => {
                write!(f, "{active_count} bowls occupied but no species holds the turn")
            }
            Self::OverCapacity {
                active_count,
                bowl_count,
            } => write!(f, "active_count {active_count} exceeds {bowl_count} bowls"),
        }
    }
}

impl Error for InvariantViolation {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrong_species_names_the_turn_holder() {
        let e = ProtocolError::WrongSpecies {
            bowl: BowlId(1),
            species: Species::Cat,
            active: Some(Species::Mouse),
        };
        assert_eq!(
            e.to_string(),
            "cat exiting bowl 1 while the turn belongs to mouse"
        );

        let e = ProtocolError::WrongSpecies {
            bowl: BowlId(2),
            species: Species::Mouse,
            active: None,
        };
        assert!(e.to_string().ends_with("nobody"));
    }

    #[test]
    fn out_of_range_reports_valid_range() {
        let e = ProtocolError::BowlOutOfRange {
            bowl: BowlId(0),
            bowl_count: 4,
        };
        assert_eq!(e.to_string(), "bowl 0 is outside the valid range 1..=4");
    }

    #[test]
    fn busy_reports_all_counts() {
        let e = ShutdownError::Busy {
            occupied: 2,
            waiting_cats: 1,
            waiting_mice: 3,
        };
        let msg = e.to_string();
        assert!(msg.contains("2 bowls occupied"));
        assert!(msg.contains("1 cats"));
        assert!(msg.contains("3 mice"));
    }
}
