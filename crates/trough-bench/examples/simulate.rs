//! Run the default cat-and-mouse simulation with both arbiters.
//!
//! Log output goes to stderr; set `RUST_LOG=trough_arbiter=debug` to see
//! every hand-off, or `RUST_LOG=trace` for each grant and release.

use tracing::Level;
use tracing_subscriber::EnvFilter;

use trough_arbiter::ArbiterMode;
use trough_sim::{SimConfig, Simulation};

fn main() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with_writer(std::io::stderr)
        .try_init();

    println!("=== Trough Feeding Simulation ===\n");

    for mode in [ArbiterMode::Monitor, ArbiterMode::Dispatch] {
        let config = SimConfig {
            mode,
            ..SimConfig::default()
        };
        println!(
            "{mode:?}: {} bowls, {} cats, {} mice, {} meals each",
            config.bowls, config.cats, config.mice, config.iterations
        );

        match Simulation::run(&config) {
            Ok(report) => {
                println!("{report}\n");
                if !report.is_clean() {
                    std::process::exit(1);
                }
            }
            Err(e) => {
                eprintln!("simulation failed: {e}");
                std::process::exit(1);
            }
        }
    }
}
