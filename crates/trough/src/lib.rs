//! Trough: arbitration of a pool of feeding bowls between two species.
//!
//! Cats and mice share `n` bowls. Any number of actors of one species may
//! eat at once, one per bowl, but a cat and a mouse never eat at the same
//! time. When the last feeder of a species leaves, the turn goes to the
//! other species if any of its members are waiting.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all Trough sub-crates.
//!
//! # Quick start
//!
//! ```rust
//! use std::sync::Arc;
//! use std::thread;
//!
//! use trough::prelude::*;
//!
//! let arbiter = Arc::new(FeedingArbiter::new(ArbiterConfig::new(1)).unwrap());
//! arbiter.before_feeding(BowlId(1), Species::Mouse);
//!
//! // The cat blocks until the mouse is done.
//! let cat = {
//!     let arbiter = Arc::clone(&arbiter);
//!     thread::spawn(move || {
//!         arbiter.before_feeding(BowlId(1), Species::Cat);
//!         arbiter.after_feeding(BowlId(1), Species::Cat);
//!     })
//! };
//! arbiter.after_feeding(BowlId(1), Species::Mouse);
//! cat.join().unwrap();
//!
//! let metrics = arbiter.shutdown().unwrap();
//! assert_eq!(metrics.total_grants(), 2);
//! ```
//!
//! Whole populations are driven by the simulation:
//!
//! ```rust
//! use trough::prelude::*;
//!
//! let report = Simulation::run(&SimConfig {
//!     iterations: 2,
//!     ..SimConfig::default()
//! })
//! .unwrap();
//! assert!(report.is_clean());
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `trough-core` | Species, bowl ids, errors, the arbitration state machine |
//! | [`arbiter`] | `trough-arbiter` | The `Arbiter` trait, monitor and dispatch arbiters |
//! | [`sim`] | `trough-sim` | Threaded simulation, exclusion ledger, reports |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types and the arbitration state machine (`trough-core`).
///
/// [`types::ArbiterState`] holds the admission, release and hand-off
/// rules without any locking; both arbiters wrap it.
pub use trough_core as types;

/// Arbiter front-ends (`trough-arbiter`).
///
/// [`arbiter::FeedingArbiter`] is a mutex-and-condvar monitor,
/// [`arbiter::DispatchArbiter`] serves requests from a dedicated thread.
pub use trough_arbiter as arbiter;

/// Simulation driver (`trough-sim`).
///
/// [`sim::Simulation::run`] spawns the actor threads and returns a
/// [`sim::SimReport`].
pub use trough_sim as sim;

/// Common imports for typical Trough usage.
///
/// ```rust
/// use trough::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use trough_core::{ArbiterMetrics, ArbiterSnapshot, BowlId, Species};

    // Errors
    pub use trough_core::{ConfigError, ProtocolError, ShutdownError};

    // Arbiters
    pub use trough_arbiter::{Arbiter, ArbiterConfig, ArbiterMode, DispatchArbiter, FeedingArbiter};

    // Simulation
    pub use trough_sim::{SimConfig, SimError, SimReport, Simulation};
}
