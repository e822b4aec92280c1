//! todos - Monthly todo list CLI
//!
//! Adds, toggles and deletes todos in a persisted list, shows derived views,
//! and tracks this month's completion goal.

use clap::Parser;
use todos::cli::Cli;
use todos::output::{emit_error, infer_command_name_from_args};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Longest `RUST_LOG` value we try to parse
const MAX_FILTER_LEN: usize = 4096;

fn main() {
    init_tracing();

    let command = infer_command_name_from_args();
    let cli = Cli::parse();
    let json = cli.json;
    if let Err(err) = cli.run() {
        tracing::debug!(command = %command, error = ?err, "command failed");
        let _ = emit_error(&command, &err, json);
        std::process::exit(err.exit_code());
    }
}

/// Diagnostics go to stderr and stay off unless `RUST_LOG` asks for them,
/// so stdout carries only command output.
fn init_tracing() {
    let filter = std::env::var("RUST_LOG")
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty() && raw.len() <= MAX_FILTER_LEN)
        .and_then(|raw| EnvFilter::try_new(raw).ok())
        .unwrap_or_else(|| EnvFilter::new("off"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}
