//! Arbiters granting feeding bowls to two mutually exclusive species.
//!
//! Two interchangeable front-ends drive the same
//! [`ArbiterState`](trough_core::ArbiterState) machine:
//!
//! - [`FeedingArbiter`]: a monitor. One mutex guards the state and each
//!   species has its own condition variable; blocked callers sleep on their
//!   species' condvar and are woken by broadcast when the turn is handed to
//!   them.
//! - [`DispatchArbiter`]: a dedicated thread owns the state and serves
//!   enter/exit requests arriving over a channel, parking blocked requests
//!   until a hand-off lets them through.
//!
//! Both implement [`Arbiter`], which is what the simulation driver uses.
//!
//! Broken protocol and broken arbiters are fatal: the blocking entry
//! points, invariant checks and a dead dispatch thread abort the process
//! with a diagnostic instead of unwinding into one actor while the others
//! wait forever.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod arbiter;
pub mod config;
pub mod dispatch;
mod dispatch_thread;
mod fatal;
pub mod monitor;

pub use arbiter::Arbiter;
pub use config::{ArbiterConfig, ArbiterMode};
pub use dispatch::DispatchArbiter;
pub use monitor::FeedingArbiter;

use std::sync::Arc;

use trough_core::ConfigError;

/// Build an arbiter of the requested kind behind a shared handle.
pub fn build(mode: ArbiterMode, config: ArbiterConfig) -> Result<Arc<dyn Arbiter>, ConfigError> {
    Ok(match mode {
        ArbiterMode::Monitor => Arc::new(FeedingArbiter::new(config)?),
        ArbiterMode::Dispatch => Arc::new(DispatchArbiter::new(config)?),
    })
}
