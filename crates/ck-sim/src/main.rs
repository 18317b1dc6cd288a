use std::error::Error;

use clap::{Parser, Subcommand};
use commands::{
    cluster::{self, ClusterArgs},
    info::{self, InfoArgs},
    scan::{self, ScanArgs},
    stability::{self, StabilityArgs},
};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser, Debug)]
#[command(name = "ck-sim", version, about = "Scan, cluster and stability-test binned distributions")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log at debug level unless RUST_LOG is set.
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Evaluate a distribution function on the sample points of a plan.
    Scan(ScanArgs),
    /// Cluster a scanned dataset and write the assignment back.
    Cluster(ClusterArgs),
    /// Re-scan and re-cluster with perturbed points and report figures of merit.
    Stability(StabilityArgs),
    /// Summarise a dataset on disk.
    Info(InfoArgs),
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Command::Scan(args) => scan::run(&args),
        Command::Cluster(args) => cluster::run(&args),
        Command::Stability(args) => stability::run(&args),
        Command::Info(args) => info::run(&args),
    }
}
