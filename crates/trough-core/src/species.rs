//! The two mutually exclusive feeding classes.

use std::fmt;
use std::ops::{Index, IndexMut};

/// One of the two classes of actors competing for the bowls.
///
/// Members of the same species may feed side by side (one per bowl);
/// members of different species may never feed at the same time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Species {
    /// The first class.
    Cat,
    /// The second class.
    Mouse,
}

impl Species {
    /// Both species, in index order.
    pub const ALL: [Species; 2] = [Species::Cat, Species::Mouse];

    /// The other species.
    pub fn opposite(self) -> Self {
        match self {
            Self::Cat => Self::Mouse,
            Self::Mouse => Self::Cat,
        }
    }

    /// Dense index of this species, usable for two-slot tables.
    pub fn index(self) -> usize {
        match self {
            Self::Cat => 0,
            Self::Mouse => 1,
        }
    }

    /// Lower-case name, as used in thread names and log fields.
    pub fn name(self) -> &'static str {
        match self {
            Self::Cat => "cat",
            Self::Mouse => "mouse",
        }
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A two-slot table keyed by [`Species`].
///
/// Used for per-species counters (waiting actors, grants) and for the
/// per-species wait channels in the arbiters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SpeciesMap<T>([T; 2]);

impl<T> SpeciesMap<T> {
    /// Build a map from explicit cat and mouse values.
    pub fn new(cat: T, mouse: T) -> Self {
        Self([cat, mouse])
    }

    /// Iterate `(species, value)` pairs in index order.
    pub fn iter(&self) -> impl Iterator<Item = (Species, &T)> {
        Species::ALL.into_iter().zip(self.0.iter())
    }
}

impl<T> Index<Species> for SpeciesMap<T> {
    type Output = T;

    fn index(&self, species: Species) -> &T {
        &self.0[species.index()]
    }
}

impl<T> IndexMut<Species> for SpeciesMap<T> {
    fn index_mut(&mut self, species: Species) -> &mut T {
        &mut self.0[species.index()]
    }
}
