//! `peercrypt`: command-line entry point.
//!
//! Startup sequence:
//! 1. Parse arguments (usage errors exit with status 2).
//! 2. Load and validate [`Config`](config::Config) from environment variables.
//! 3. Initialise structured logging on stderr.
//! 4. Run the subcommand; print the result on stdout, or an error response on
//!    stderr and exit with status 1.

mod commands;
mod config;
mod telemetry;

use anyhow::Result;
use clap::Parser;
use common::ErrorResponse;
use tracing::{debug, error, warn};

fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Arguments
    // -----------------------------------------------------------------------
    let cli = commands::Cli::parse();

    // -----------------------------------------------------------------------
    // 2. Configuration
    // -----------------------------------------------------------------------
    let cfg = config::Config::from_env().map_err(|e| {
        eprintln!("ERROR: peercrypt configuration invalid: {e}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 3. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init(&cfg.log_level, cfg.log_format)?;

    // -----------------------------------------------------------------------
    // 4. Command
    // -----------------------------------------------------------------------
    let name = cli.command.name();
    match commands::run(&cli.command) {
        Ok(output) => {
            debug!(command = name, "completed");
            println!("{output}");
            Ok(())
        }
        Err(e) => {
            if e.is_auth_failure() {
                warn!(command = name, code = e.code(), "integrity check failed");
            } else {
                error!(command = name, code = e.code(), "command failed");
            }
            let response = ErrorResponse::from(&e);
            match serde_json::to_string(&response) {
                Ok(json) => eprintln!("{json}"),
                Err(_) => eprintln!("ERROR: {e}"),
            }
            std::process::exit(1);
        }
    }
}
