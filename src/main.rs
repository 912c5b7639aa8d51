//! crdgen - completes generated OpenAPI schemas into Kubernetes CRD manifests
//!
//! Reads a configuration describing each CRD, loads the schema fragments
//! an OpenAPI encoder produced, and writes structural CRD manifests.

use clap::Parser;
use crdgen::cli::{self, Command};

/// crdgen - completes generated OpenAPI schemas into Kubernetes CRD manifests
#[derive(Parser, Debug)]
#[command(name = "crdgen")]
#[command(about = "Completes generated OpenAPI schemas into structural Kubernetes CRD manifests", long_about = None)]
struct Args {
    /// Enable debug logging
    #[arg(long, short = 'd', global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let args = Args::parse();

    cli::init_logging(args.debug);

    if let Err(e) = cli::handle_command(args.command) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
