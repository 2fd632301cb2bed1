//! Core types for the Trough feeding arbiter.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! two feeding species, the 1-based [`BowlId`] used at the arbiter
//! boundary, the error types, and [`ArbiterState`]: the lock-agnostic
//! state machine that both arbiter front-ends drive under their own
//! serialisation.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod id;
pub mod metrics;
pub mod species;
pub mod state;

pub use error::{ConfigError, InvariantViolation, ProtocolError, ShutdownError};
pub use id::BowlId;
pub use metrics::ArbiterMetrics;
pub use species::{Species, SpeciesMap};
pub use state::{Admission, ArbiterSnapshot, ArbiterState, Release};
