//! CLI module for the aplog observer
//!
//! ## Commands
//!
//! - `observe [EVENTS]` - Replay a JSON-lines lifecycle event stream through the observer and write
//!   the XML report
//!
//! ## Modules
//!
//! - `commands` - Command implementations
//! - `events` - Event stream model
//!
//! ## Design
//!
//! Command functions return `CliResult<T>` instead of calling `process::exit`.
//! Only the top-level `run()` function handles errors and exits.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod commands;
pub mod events;

use std::fmt;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use crate::config::ObserverArgs;

// ============================================================================
// CLI Error handling
// ============================================================================

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const FAILURE: ExitCode = ExitCode(1);
}

/// Error type for CLI operations.
///
/// Contains a user-facing message and an exit code. The CLI entry point
/// catches these errors, prints the message, and exits with the code.
#[derive(Debug)]
pub struct CliError {
    /// User-facing error message (already formatted for display)
    pub message: String,
    /// Exit code to return to the shell
    pub exit_code: ExitCode,
}

impl CliError {
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    /// Create a failure error (exit code 1).
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::FAILURE)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// Clap CLI definition
// ============================================================================

/// Test-run observer for autopilot integration tests
#[derive(Parser, Debug)]
#[command(name = "aplog")]
#[command(version = VERSION)]
#[command(about = "Capture test output and telemetry pipes into an XML report", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay lifecycle events through the observer and write the report
    Observe {
        /// JSON-lines event file, or `-` for stdin
        #[arg(value_name = "EVENTS", default_value = "-")]
        events: PathBuf,

        #[command(flatten)]
        observer: ObserverArgs,
    },
}

// ============================================================================
// CLI entry point
// ============================================================================

/// Main CLI entry point.
///
/// This is the only place where `process::exit` is called. All command
/// implementations return `CliResult` and errors are handled here.
pub fn run() {
    let cli = Cli::parse();

    match execute(cli) {
        Ok(exit_code) => {
            if exit_code.0 != 0 {
                process::exit(exit_code.0);
            }
        }
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("{}", e.message);
            }
            process::exit(e.exit_code.0);
        }
    }
}

/// Execute the CLI command and return result.
fn execute(cli: Cli) -> CliResult<ExitCode> {
    match cli.command {
        Command::Observe { events, observer } => commands::observe(&events, observer),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_observe_defaults_to_stdin() {
        let cli = Cli::try_parse_from(["aplog", "observe"]).unwrap();
        let Command::Observe { events, observer } = cli.command;
        assert_eq!(events, PathBuf::from("-"));
        assert_eq!(observer.telemetry_pipe_a, PathBuf::from("jsb_pipe"));
        assert_eq!(observer.encoding, "UTF-8");
    }

    #[test]
    fn test_cli_parse_observe_with_options() {
        let cli = Cli::try_parse_from([
            "aplog",
            "observe",
            "events.jsonl",
            "--report-path",
            "run.xml",
            "--encoding",
            "latin1",
            "--project-name",
            "Hover",
            "-v",
        ])
        .unwrap();
        let Command::Observe { events, observer } = cli.command;
        assert_eq!(events, PathBuf::from("events.jsonl"));
        assert_eq!(observer.report_path, Some(PathBuf::from("run.xml")));
        assert_eq!(observer.project_name, "Hover");
        assert_eq!(observer.verbose, 1);
    }

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["aplog"]).is_err());
    }

    #[test]
    fn test_cli_rejects_non_numeric_poll_timeout() {
        assert!(Cli::try_parse_from(["aplog", "observe", "--poll-timeout-ms", "soon"]).is_err());
    }
}
