//! Benchmark profiles and utilities for the Trough arbiters.
//!
//! Provides pre-built [`SimConfig`] profiles for benchmarks and examples:
//!
//! - [`contended_profile`]: few bowls, many actors of both species
//! - [`roomy_profile`]: a bowl per actor, little waiting
//! - [`zero_delay`]: strip every sleep from a profile

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::time::Duration;

use trough_arbiter::ArbiterMode;
use trough_sim::SimConfig;

/// Two bowls shared by 8 cats and 8 mice, short meals.
///
/// Most entries block, so this measures hand-off and wake-up cost.
pub fn contended_profile(mode: ArbiterMode, seed: u64) -> SimConfig {
    SimConfig {
        bowls: 2,
        cats: 8,
        mice: 8,
        iterations: 25,
        cat_eat: Duration::from_micros(50),
        cat_sleep: Duration::from_micros(50),
        mouse_eat: Duration::from_micros(50),
        mouse_sleep: Duration::from_micros(50),
        seed,
        mode,
    }
}

/// 16 bowls for 4 cats and 4 mice: species turns dominate, bowl clashes
/// are rare.
pub fn roomy_profile(mode: ArbiterMode, seed: u64) -> SimConfig {
    SimConfig {
        bowls: 16,
        cats: 4,
        mice: 4,
        iterations: 25,
        ..contended_profile(mode, seed)
    }
}

/// The same profile with every eat and sleep time set to zero.
pub fn zero_delay(config: SimConfig) -> SimConfig {
    SimConfig {
        cat_eat: Duration::ZERO,
        cat_sleep: Duration::ZERO,
        mouse_eat: Duration::ZERO,
        mouse_sleep: Duration::ZERO,
        ..config
    }
}
