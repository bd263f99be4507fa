//! Parfmt: run clang-format over many files in parallel.
//!
//! This is the main entry point for the `parfmt` CLI. It parses arguments,
//! installs logging and the Ctrl-C handler, runs the formatter over the
//! discovered files, and maps the outcome to an exit code.

mod aggregate;
mod cli;
mod commands;
pub mod config;
pub mod diff;
pub mod discover;
pub mod error;
pub mod exit_codes;
pub mod invoke;
mod output;
mod pool;
mod settings;

#[cfg(test)]
mod test_support;

use cli::Cli;
use pool::CancelToken;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Environment variable holding a `tracing` filter directive.
const LOG_ENV: &str = "PARFMT_LOG";

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// First Ctrl-C stops dispatching; a second one exits immediately.
fn install_interrupt_handler(cancel: &CancelToken) {
    let token = cancel.clone();
    let installed = ctrlc::set_handler(move || {
        if token.is_cancelled() {
            std::process::exit(exit_codes::INTERRUPTED);
        }
        tracing::warn!("interrupt received, waiting for running jobs");
        token.cancel();
    });
    if let Err(e) = installed {
        tracing::warn!(error = %e, "failed to install Ctrl-C handler");
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse_args();
    init_logging(cli.verbose);

    let cancel = CancelToken::new();
    install_interrupt_handler(&cancel);

    match commands::cmd_format(&cli, &cancel) {
        Ok(summary) => ExitCode::from(summary.exit_code() as u8),
        Err(err) => {
            // Print user-actionable error message to stderr
            eprintln!("Error: {}", err);

            // Return appropriate exit code
            ExitCode::from(err.exit_code() as u8)
        }
    }
}
