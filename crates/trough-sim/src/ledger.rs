//! Independent record of who is eating where.
//!
//! The ledger does not trust the arbiter. Actors report each meal's start
//! right after being admitted and its end right before giving the bowl
//! back; the ledger keeps its own bowl table and flags any meal that starts
//! at a bowl someone else holds, or while the other species is eating.

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use trough_core::{BowlId, Species, SpeciesMap};

use crate::actor::ActorId;

/// An exclusion rule broken during the run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Violation {
    /// `actor` started eating at a bowl `holder` was still using.
    BowlShared {
        /// The contested bowl.
        bowl: BowlId,
        /// Actor that arrived.
        actor: ActorId,
        /// Actor already at the bowl.
        holder: ActorId,
    },
    /// `actor` started eating while `feeding` members of the other species
    /// were at their bowls.
    SpeciesMixed {
        /// Bowl the actor took.
        bowl: BowlId,
        /// Actor that arrived.
        actor: ActorId,
        /// Other-species feeders present at that moment.
        feeding: usize,
    },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BowlShared {
                bowl,
                actor,
                holder,
            } => write!(f, "{actor} started eating at bowl {bowl} while {holder} was there"),
            Self::SpeciesMixed {
                bowl,
                actor,
                feeding,
            } => write!(
                f,
                "{actor} started eating at bowl {bowl} with {feeding} {} still feeding",
                actor.species.opposite()
            ),
        }
    }
}

#[derive(Debug)]
struct LedgerInner {
    bowls: Vec<Option<ActorId>>,
    feeding: SpeciesMap<usize>,
    peak_feeders: usize,
    violations: Vec<Violation>,
}

/// Thread-safe meal ledger shared by every actor of a run.
#[derive(Debug)]
pub struct FeedingLedger {
    inner: Mutex<LedgerInner>,
}

impl FeedingLedger {
    /// A ledger for `bowl_count` bowls, all empty.
    pub fn new(bowl_count: usize) -> Self {
        Self {
            inner: Mutex::new(LedgerInner {
                bowls: vec![None; bowl_count],
                feeding: SpeciesMap::default(),
                peak_feeders: 0,
                violations: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LedgerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record `actor` sitting down at `bowl`.
    ///
    /// Bowls outside the ledger's table are ignored; the arbiter rejects
    /// them before a meal can start.
    pub fn meal_started(&self, actor: ActorId, bowl: BowlId) {
        let mut inner = self.lock();
        let Some(slot) = bowl.index(inner.bowls.len()) else {
            return;
        };

        if let Some(holder) = inner.bowls[slot] {
            tracing::error!(%actor, %holder, %bowl, "bowl shared");
            inner.violations.push(Violation::BowlShared {
                bowl,
                actor,
                holder,
            });
        }
        let others = inner.feeding[actor.species.opposite()];
        if others > 0 {
            tracing::error!(%actor, %bowl, others, "species mixed");
            inner.violations.push(Violation::SpeciesMixed {
                bowl,
                actor,
                feeding: others,
            });
        }

        inner.bowls[slot] = Some(actor);
        inner.feeding[actor.species] += 1;
        let total = inner.feeding[Species::Cat] + inner.feeding[Species::Mouse];
        inner.peak_feeders = inner.peak_feeders.max(total);
    }

    /// Record `actor` leaving `bowl`.
    pub fn meal_finished(&self, actor: ActorId, bowl: BowlId) {
        let mut inner = self.lock();
        let Some(slot) = bowl.index(inner.bowls.len()) else {
            return;
        };
        if inner.bowls[slot] == Some(actor) {
            inner.bowls[slot] = None;
        }
        let feeding = &mut inner.feeding[actor.species];
        *feeding = feeding.saturating_sub(1);
    }

    /// Violations recorded so far.
    pub fn violations(&self) -> Vec<Violation> {
        self.lock().violations.clone()
    }

    /// Highest number of actors seen eating at the same time.
    pub fn peak_feeders(&self) -> usize {
        self.lock().peak_feeders
    }

    /// Number of actors currently at a bowl.
    pub fn feeding(&self) -> usize {
        let inner = self.lock();
        inner.feeding[Species::Cat] + inner.feeding[Species::Mouse]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trough_core::Species::{Cat, Mouse};

    fn cat(i: usize) -> ActorId {
        ActorId::new(Cat, i)
    }

    fn mouse(i: usize) -> ActorId {
        ActorId::new(Mouse, i)
    }

    #[test]
    fn legal_meals_leave_no_violations() {
        let ledger = FeedingLedger::new(2);
        ledger.meal_started(cat(0), BowlId(1));
        ledger.meal_started(cat(1), BowlId(2));
        ledger.meal_finished(cat(0), BowlId(1));
        ledger.meal_finished(cat(1), BowlId(2));
        ledger.meal_started(mouse(0), BowlId(1));
        ledger.meal_finished(mouse(0), BowlId(1));

        assert!(ledger.violations().is_empty());
        assert_eq!(ledger.peak_feeders(), 2);
        assert_eq!(ledger.feeding(), 0);
    }

    #[test]
    fn shared_bowl_is_flagged() {
        let ledger = FeedingLedger::new(1);
        ledger.meal_started(cat(0), BowlId(1));
        ledger.meal_started(cat(1), BowlId(1));
        assert_eq!(
            ledger.violations(),
            vec![Violation::BowlShared {
                bowl: BowlId(1),
                actor: cat(1),
                holder: cat(0),
            }]
        );
    }

    #[test]
    fn mixed_species_is_flagged() {
        let ledger = FeedingLedger::new(3);
        ledger.meal_started(mouse(0), BowlId(1));
        ledger.meal_started(mouse(1), BowlId(2));
        ledger.meal_started(cat(0), BowlId(3));

        let violations = ledger.violations();
        assert_eq!(
            violations,
            vec![Violation::SpeciesMixed {
                bowl: BowlId(3),
                actor: cat(0),
                feeding: 2,
            }]
        );
        assert_eq!(
            violations[0].to_string(),
            "cat-0 started eating at bowl 3 with 2 mouse still feeding"
        );
    }

    #[test]
    fn finishing_someone_elses_meal_keeps_the_holder() {
        let ledger = FeedingLedger::new(1);
        ledger.meal_started(cat(0), BowlId(1));
        ledger.meal_finished(cat(1), BowlId(1));
        ledger.meal_started(cat(2), BowlId(1));
        assert!(matches!(
            ledger.violations()[..],
            [Violation::BowlShared { holder, .. }] if holder == cat(0)
        ));
    }
}
