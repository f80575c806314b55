//! CLI entrypoint (spec §6): reads the config, constructs the topology,
//! runs it, and logs per-role learning rate. Exit code: 0 on normal
//! termination; non-zero if a protocol violation is observed.

use arrrg::CommandLine;
use arrrg_derive::CommandLine;

use gpaxos_topology::{launch, TopologyConfig};

#[derive(Clone, CommandLine, Debug, Eq, PartialEq)]
struct GpaxosOptions {
    #[arrrg(optional, "Path to the YAML topology config.")]
    config: String,
    #[arrrg(optional, "Root PRNG seed for the run (overrides none in the config; the config carries no seed key of its own).")]
    seed: u64,
    #[arrrg(optional, "Number of proposer processes to launch.")]
    proposers: u64,
}

impl Default for GpaxosOptions {
    fn default() -> Self {
        Self {
            config: String::new(),
            seed: 0,
            proposers: 1,
        }
    }
}

fn main() {
    tracing_subscriber::fmt::init();

    let (options, free) = GpaxosOptions::from_command_line("USAGE: gpaxos --config <path> [OPTIONS]");
    if options.config.is_empty() {
        eprintln!("must provide --config <path>");
        std::process::exit(1);
    }
    if !free.is_empty() {
        eprintln!("unexpected positional arguments: {:?}", free);
        std::process::exit(1);
    }

    let yaml = std::fs::read_to_string(&options.config).unwrap_or_else(|err| {
        eprintln!("could not read {}: {}", options.config, err);
        std::process::exit(1);
    });
    let config = TopologyConfig::from_yaml(&yaml).unwrap_or_else(|err| {
        eprintln!("invalid topology config: {}", err);
        std::process::exit(1);
    });

    let mut monitor = launch(&config, options.seed, options.proposers);
    monitor.await_termination();

    for (learner, rate) in monitor.learning_rates() {
        println!("{}: learning rate {:.3}", learner, rate);
    }

    if !monitor.violations().is_empty() {
        for violation in monitor.violations() {
            eprintln!("protocol violation: {}", violation);
        }
        std::process::exit(1);
    }
}
