//! End-to-end simulation runs against both arbiters.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::time::Duration;

use trough_arbiter::{Arbiter, ArbiterMode};
use trough_core::{
    ArbiterMetrics, ArbiterSnapshot, BowlId, ProtocolError, ShutdownError, Species,
};
use trough_sim::{SimConfig, Simulation, Violation};
use trough_test_utils::{is_isolated_child, run_isolated};

const MODES: [ArbiterMode; 2] = [ArbiterMode::Monitor, ArbiterMode::Dispatch];

#[test]
fn one_bowl_two_cats_two_mice() {
    const ROUNDS: u32 = 5;
    for mode in MODES {
        let config = SimConfig {
            bowls: 1,
            cats: 2,
            mice: 2,
            iterations: ROUNDS,
            mode,
            ..SimConfig::default()
        };
        let report = Simulation::run(&config).unwrap();

        assert!(report.is_clean(), "{mode:?}\n{report}");
        for stats in &report.actors {
            assert_eq!(stats.meals, ROUNDS, "{}", stats.actor);
        }
        assert_eq!(report.peak_feeders, 1);
        assert_eq!(report.arbiter.grants[Species::Cat], u64::from(2 * ROUNDS));
        assert_eq!(report.arbiter.grants[Species::Mouse], u64::from(2 * ROUNDS));
        assert_eq!(report.arbiter.peak_occupancy, 1);
    }
}

#[test]
fn default_population_runs_clean() {
    for mode in MODES {
        let report = Simulation::run(&SimConfig {
            mode,
            ..SimConfig::default()
        })
        .unwrap();
        assert!(report.is_clean(), "{mode:?}\n{report}");
        assert_eq!(report.actors.len(), 8);
        assert!(report.peak_feeders <= 5);
        assert_eq!(report.arbiter.exits, report.arbiter.total_grants());
    }
}

#[test]
fn crowded_stress_run_has_no_violations() {
    for mode in MODES {
        let config = SimConfig {
            bowls: 3,
            cats: 12,
            mice: 12,
            iterations: 20,
            cat_eat: Duration::from_micros(200),
            cat_sleep: Duration::from_micros(100),
            mouse_eat: Duration::from_micros(100),
            mouse_sleep: Duration::from_micros(100),
            seed: 0xfeed,
            mode,
        };
        let report = Simulation::run(&config).unwrap();
        assert!(report.is_clean(), "{mode:?}\n{report}");
        assert_eq!(report.meals(Species::Cat), 240);
        assert_eq!(report.meals(Species::Mouse), 240);
        assert!(report.peak_feeders <= 3);
    }
}

#[test]
fn single_species_never_hands_off() {
    let config = SimConfig {
        bowls: 4,
        cats: 0,
        mice: 6,
        iterations: 10,
        ..SimConfig::default()
    };
    let report = Simulation::run(&config).unwrap();
    assert!(report.is_clean(), "{report}");
    assert_eq!(report.arbiter.hand_offs, 0);
    assert_eq!(report.meals(Species::Mouse), 60);
}

/// Grants everything immediately. Only useful for checking the ledger.
struct Permissive {
    bowls: usize,
    start: Barrier,
}

impl Arbiter for Permissive {
    fn bowl_count(&self) -> usize {
        self.bowls
    }

    fn try_before_feeding(&self, _: BowlId, _: Species) -> Result<(), ProtocolError> {
        self.start.wait();
        Ok(())
    }

    fn try_after_feeding(&self, _: BowlId, _: Species) -> Result<(), ProtocolError> {
        Ok(())
    }

    fn snapshot(&self) -> ArbiterSnapshot {
        ArbiterSnapshot {
            active: None,
            active_count: 0,
            occupied: Vec::new(),
            waiting: Default::default(),
            shut_down: false,
        }
    }

    fn metrics(&self) -> ArbiterMetrics {
        ArbiterMetrics::default()
    }

    fn shutdown(&self) -> Result<ArbiterMetrics, ShutdownError> {
        Ok(ArbiterMetrics::default())
    }
}

#[test]
fn ledger_catches_an_arbiter_without_exclusion() {
    let config = SimConfig {
        bowls: 1,
        cats: 2,
        mice: 2,
        iterations: 1,
        cat_eat: Duration::from_millis(300),
        cat_sleep: Duration::ZERO,
        mouse_eat: Duration::from_millis(300),
        mouse_sleep: Duration::ZERO,
        ..SimConfig::default()
    };
    // Everyone is released onto the single bowl at once.
    let arbiter = Arc::new(Permissive {
        bowls: 1,
        start: Barrier::new(4),
    });
    let report = Simulation::run_with(&config, arbiter).unwrap();

    assert!(!report.is_clean());
    assert!(report.peak_feeders >= 2);
    assert!(report
        .violations
        .iter()
        .any(|v| matches!(v, Violation::BowlShared { .. })));
    assert!(report
        .violations
        .iter()
        .any(|v| matches!(v, Violation::SpeciesMixed { .. })));
}

/// Passes everything through to a real arbiter, except that the first
/// exit is reported under the other species.
struct MislabelledFirstExit {
    inner: Arc<dyn Arbiter>,
    mislabelled: AtomicBool,
}

impl Arbiter for MislabelledFirstExit {
    fn bowl_count(&self) -> usize {
        self.inner.bowl_count()
    }

    fn try_before_feeding(&self, bowl: BowlId, species: Species) -> Result<(), ProtocolError> {
        self.inner.try_before_feeding(bowl, species)
    }

    fn try_after_feeding(&self, bowl: BowlId, species: Species) -> Result<(), ProtocolError> {
        let species = if self.mislabelled.swap(true, Ordering::SeqCst) {
            species
        } else {
            species.opposite()
        };
        self.inner.try_after_feeding(bowl, species)
    }

    fn snapshot(&self) -> ArbiterSnapshot {
        self.inner.snapshot()
    }

    fn metrics(&self) -> ArbiterMetrics {
        self.inner.metrics()
    }

    fn shutdown(&self) -> Result<ArbiterMetrics, ShutdownError> {
        self.inner.shutdown()
    }
}

/// The other actors are left waiting on the bowl the violator still
/// holds, so the run must end the process rather than wait for them.
fn mislabelled_exit_ends_the_run(test: &str, mode: ArbiterMode) {
    if is_isolated_child() {
        let config = SimConfig {
            bowls: 1,
            cats: 2,
            mice: 2,
            iterations: 3,
            mode,
            ..SimConfig::default()
        };
        let inner = trough_arbiter::build(mode, trough_arbiter::ArbiterConfig::new(1)).unwrap();
        let arbiter = Arc::new(MislabelledFirstExit {
            inner,
            mislabelled: AtomicBool::new(false),
        });
        let _ = Simulation::run_with(&config, arbiter);
        return;
    }
    let run = run_isolated(test);
    run.assert_aborted_with("feeding protocol violation: ");
    assert!(
        run.stderr.contains("exiting bowl 1 while the turn belongs to"),
        "{}",
        run.stderr
    );
}

#[test]
fn mislabelled_exit_ends_a_monitor_run() {
    mislabelled_exit_ends_the_run("mislabelled_exit_ends_a_monitor_run", ArbiterMode::Monitor);
}

#[test]
fn mislabelled_exit_ends_a_dispatch_run() {
    mislabelled_exit_ends_the_run("mislabelled_exit_ends_a_dispatch_run", ArbiterMode::Dispatch);
}
