//! Arbiter configuration.

// ── ArbiterMode ────────────────────────────────────────────────────

/// Which arbiter front-end to build.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ArbiterMode {
    /// Mutex plus one condition variable per species.
    #[default]
    Monitor,
    /// A single arbitration thread serving requests over channels.
    Dispatch,
}

// ── ArbiterConfig ──────────────────────────────────────────────────

/// Configuration shared by both arbiter front-ends.
#[derive(Clone, Debug)]
pub struct ArbiterConfig {
    /// Number of bowls in the pool. Must be at least 1.
    pub bowl_count: usize,
    /// Re-check the state invariants after every mutation and abort the
    /// process on failure. Default: on in debug builds.
    pub verify_invariants: bool,
    /// Capacity of the dispatch thread's request channel. Senders block
    /// while it is full. Ignored by the monitor. Default: 256.
    pub request_queue: usize,
}

impl ArbiterConfig {
    /// Default configuration for a pool of `bowl_count` bowls.
    pub fn new(bowl_count: usize) -> Self {
        Self {
            bowl_count,
            verify_invariants: cfg!(debug_assertions),
            request_queue: 256,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_sets_defaults() {
        let config = ArbiterConfig::new(3);
        assert_eq!(config.bowl_count, 3);
        assert_eq!(config.verify_invariants, cfg!(debug_assertions));
        assert_eq!(config.request_queue, 256);
    }

    #[test]
    fn monitor_is_default_mode() {
        assert_eq!(ArbiterMode::default(), ArbiterMode::Monitor);
    }
}
