//! Command-line surface of the daemon.

use std::path::PathBuf;

use clap::{Arg, ArgAction, ArgMatches, Command};

use crate::app::RunOptions;
use crate::config::DaemonConfig;

pub fn command() -> Command {
    Command::new("thermo_daemon")
        .about("Periodic temperature sampling and classification")
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .value_parser(clap::value_parser!(PathBuf))
                .help("YAML or JSON configuration file"),
        )
        .arg(
            Arg::new("cycles")
                .long("cycles")
                .value_name("N")
                .value_parser(clap::value_parser!(u64).range(1..))
                .help("Stop after N reports instead of running until Ctrl-C"),
        )
        .arg(
            Arg::new("fail-rate")
                .long("fail-rate")
                .value_name("P")
                .value_parser(clap::value_parser!(f64))
                .help("Probability that a simulated sensor read fails"),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .value_name("N")
                .value_parser(clap::value_parser!(u64))
                .help("Seed for the simulated sensor"),
        )
        .arg(
            Arg::new("print-config")
                .long("print-config")
                .action(ArgAction::SetTrue)
                .help("Print the effective configuration as YAML and exit"),
        )
}

/// Apply the sensor overrides given on the command line.
pub fn apply_overrides(matches: &ArgMatches, config: &mut DaemonConfig) {
    if let Some(rate) = matches.get_one::<f64>("fail-rate") {
        config.sensor.failure_rate = *rate;
    }
    if let Some(seed) = matches.get_one::<u64>("seed") {
        config.sensor.seed = Some(*seed);
    }
}

pub fn run_options(matches: &ArgMatches) -> RunOptions {
    RunOptions { cycles: matches.get_one::<u64>("cycles").copied() }
}
