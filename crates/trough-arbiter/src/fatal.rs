//! Process-ending failures.
//!
//! A protocol violation or a broken arbiter leaves every other actor
//! waiting on state that can no longer be trusted, so these paths do not
//! unwind: they log, write the diagnostic to stderr (no subscriber may be
//! installed) and abort.

use std::any::Any;

use trough_core::{InvariantViolation, ProtocolError};

#[cold]
fn abort_with(diagnostic: &str) -> ! {
    eprintln!("{diagnostic}");
    std::process::abort();
}

/// An actor broke the enter/exit protocol.
#[cold]
pub(crate) fn protocol_violation(e: &ProtocolError) -> ! {
    tracing::error!(error = %e, "feeding protocol violation");
    abort_with(&format!("feeding protocol violation: {e}"))
}

/// The arbiter state failed its own consistency check.
#[cold]
pub(crate) fn invariant_violation(v: &InvariantViolation) -> ! {
    tracing::error!(violation = %v, "arbiter invariant violated");
    abort_with(&format!("arbiter invariant violated: {v}"))
}

/// The dispatch thread stopped without handing back its state.
#[cold]
pub(crate) fn dispatch_failed(reason: &str) -> ! {
    tracing::error!(reason, "dispatch thread failed");
    abort_with(&format!("dispatch thread failed: {reason}"))
}

/// Text of a panic payload, as carried by `panic!` with or without
/// format arguments.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("panic payload is not a string")
}
