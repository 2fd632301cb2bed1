//! Cumulative counters maintained by the arbiter state machine.
//!
//! [`ArbiterMetrics`] is updated under the same serialisation as the rest
//! of [`ArbiterState`](crate::ArbiterState), so every copy handed out is a
//! consistent view.

use crate::species::{Species, SpeciesMap};

/// Counters collected over the lifetime of one arbiter.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ArbiterMetrics {
    /// Successful enters, per species.
    pub grants: SpeciesMap<u64>,
    /// Successful exits.
    pub exits: u64,
    /// Hand-offs that moved the turn from one species to the other.
    pub hand_offs: u64,
    /// Hand-offs run by an arrival that found the floor empty while the
    /// other species held the turn. The first claim of a never-used floor
    /// is not counted.
    pub forced_hand_offs: u64,
    /// Admission checks repeated after a waiter was woken.
    pub rechecks: u64,
    /// Highest number of bowls occupied at once.
    pub peak_occupancy: usize,
}

impl ArbiterMetrics {
    /// Total successful enters across both species.
    pub fn total_grants(&self) -> u64 {
        self.grants[Species::Cat] + self.grants[Species::Mouse]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_metrics_are_zero() {
        let m = ArbiterMetrics::default();
        assert_eq!(m.total_grants(), 0);
        assert_eq!(m.exits, 0);
        assert_eq!(m.hand_offs, 0);
        assert_eq!(m.forced_hand_offs, 0);
        assert_eq!(m.rechecks, 0);
        assert_eq!(m.peak_occupancy, 0);
    }

    #[test]
    fn total_grants_sums_species() {
        let m = ArbiterMetrics {
            grants: SpeciesMap::new(3, 4),
            ..Default::default()
        };
        assert_eq!(m.total_grants(), 7);
    }
}
