//! Threaded feeding simulation for the Trough arbiters.
//!
//! [`Simulation::run`] spawns one thread per cat and mouse. Each actor
//! sleeps, picks a bowl at random, asks the arbiter for it, eats, and gives
//! it back, a fixed number of times. A [`FeedingLedger`] watches every meal
//! independently of the arbiter and records any broken exclusion rule; the
//! resulting [`SimReport`] carries per-actor waiting statistics, the
//! ledger's findings and the arbiter's own counters.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod actor;
pub mod config;
pub mod ledger;
pub mod report;
pub mod runner;

pub use actor::{ActorId, BowlPicker};
pub use config::{SimConfig, SimConfigError};
pub use ledger::{FeedingLedger, Violation};
pub use report::{ActorStats, MealRecord, SimReport};
pub use runner::{SimError, Simulation};
