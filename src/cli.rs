//! CLI - Command Line Interface for tvshell
//!
//! Every account and catalog action the TV exposes is scriptable.
//! All output is JSON-parseable.
//!
//! # Examples
//!
//! ```bash
//! # Browse the catalog
//! tvshell media --json
//!
//! # Sign in with a registration code
//! tvshell signin
//! tvshell status
//!
//! # Wire form of a catalog entry, resuming at 5 minutes
//! tvshell convert tears --start-ms 300000
//! ```

use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::io::IsTerminal;
use std::path::PathBuf;

// =============================================================================
// Exit Codes
// =============================================================================

/// Exit codes for CLI operations (semantic for scripting)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success
    Success = 0,
    /// General error
    Error = 1,
    /// Invalid arguments
    InvalidArgs = 2,
    /// Network error
    NetworkError = 3,
    /// Unknown catalog entry
    NotFound = 4,
    /// Sign-in ended without credentials
    SignInFailed = 5,
    /// Sign-in cancelled by the user
    Cancelled = 6,
    /// Operation needs a signed-in user
    NotSignedIn = 7,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code as i32
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> std::process::ExitCode {
        std::process::ExitCode::from(code as u8)
    }
}

// =============================================================================
// Main CLI Structure
// =============================================================================

/// tvshell - TV demo shell with remote-style navigation and code sign-in
///
/// Run without arguments to launch the interactive terminal UI.
/// Use subcommands for automation and scripting.
#[derive(Parser, Debug)]
#[command(
    name = "tvshell",
    version,
    about = "TV demo shell with remote-style navigation and code sign-in",
    long_about = "A grid of videos, a player, a profile screen and a sidebar, \
                  driven by arrow keys like a TV remote.\n\n\
                  Run without arguments to launch the interactive UI.\n\
                  Use subcommands for automation and scripting.",
    after_help = "EXAMPLES:\n\
                  tvshell                         Launch interactive UI\n\
                  tvshell media                   List the catalog\n\
                  tvshell signin                  Sign in with a code\n\
                  tvshell status --json           Check sign-in state"
)]
pub struct Cli {
    /// Output format as JSON (default for non-TTY)
    #[arg(long, short = 'j', global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Path to config file
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Account service base URL (overrides config)
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Subcommand to run (omit for TUI mode)
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// Check if running in CLI mode (has subcommand)
    pub fn is_cli_mode(&self) -> bool {
        self.command.is_some()
    }

    /// Check if JSON output should be used
    pub fn should_json(&self) -> bool {
        self.json || !std::io::stdout().is_terminal()
    }
}

// =============================================================================
// Subcommands
// =============================================================================

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the built-in catalog
    #[command(visible_alias = "m")]
    Media,

    /// Show sign-in state
    #[command(visible_alias = "st")]
    Status,

    /// Sign in with a registration code (Ctrl-C cancels)
    #[command(visible_alias = "in")]
    Signin(SigninCmd),

    /// Sign out and forget stored credentials
    #[command(visible_alias = "out")]
    Signout,

    /// Print the continuity wire form of a catalog entry
    #[command(visible_alias = "cv")]
    Convert(ConvertCmd),
}

/// Run a headless sign-in
#[derive(Args, Debug)]
pub struct SigninCmd {
    /// Sign-in type echoed in statuses
    #[arg(long, short = 't', default_value = "MVPD")]
    pub sign_in_type: String,

    /// Companion device is already signed in (code is not printed)
    #[arg(long)]
    pub mobile_signed_in: bool,
}

/// Convert a catalog entry to its wire form
#[derive(Args, Debug)]
pub struct ConvertCmd {
    /// Stream id of the catalog entry (e.g. "tears")
    #[arg(required = true)]
    pub stream_id: String,

    /// Resume position in milliseconds
    #[arg(long, short = 's')]
    pub start_ms: Option<u64>,
}

// =============================================================================
// JSON Output Types
// =============================================================================

/// Generic JSON output wrapper with status
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonOutput<T: Serialize> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "is_zero")]
    pub exit_code: i32,
}

fn is_zero(n: &i32) -> bool {
    *n == 0
}

impl<T: Serialize> JsonOutput<T> {
    /// Create success output with data
    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
            exit_code: 0,
        }
    }

    /// Create error output (no data)
    pub fn error_msg(msg: impl Into<String>, code: ExitCode) -> JsonOutput<()> {
        JsonOutput::<()> {
            data: None,
            error: Some(msg.into()),
            exit_code: code.into(),
        }
    }
}

/// Status OK response
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusOk {
    pub status: &'static str,
}

impl Default for StatusOk {
    fn default() -> Self {
        Self { status: "ok" }
    }
}

/// Sign-in state response
#[derive(Debug, Serialize, Deserialize)]
pub struct AccountStatus {
    pub signed_in: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub device_id: String,
}

// =============================================================================
// Output Helpers
// =============================================================================

/// Output handler for consistent formatting
pub struct Output {
    pub json: bool,
    pub quiet: bool,
}

impl Output {
    pub fn new(cli: &Cli) -> Self {
        Self {
            json: cli.should_json(),
            quiet: cli.quiet,
        }
    }

    /// Print success data
    pub fn print<T: Serialize>(&self, data: T) -> anyhow::Result<()> {
        if self.json {
            let output = JsonOutput::success(data);
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("{}", serde_json::to_string_pretty(&data)?);
        }
        Ok(())
    }

    /// Print a human line (suppressed in JSON and quiet mode)
    pub fn line(&self, msg: impl std::fmt::Display) {
        if !self.quiet && !self.json {
            println!("{}", msg);
        }
    }

    /// Print error and return exit code
    pub fn error(&self, msg: impl Into<String>, code: ExitCode) -> ExitCode {
        let msg = msg.into();
        if self.json {
            let output = JsonOutput::<()>::error_msg(&msg, code);
            if let Ok(json) = serde_json::to_string_pretty(&output) {
                eprintln!("{}", json);
            }
        } else if !self.quiet {
            eprintln!("Error: {}", msg);
        }
        code
    }

    /// Print info message (suppressed in quiet mode)
    pub fn info(&self, msg: impl std::fmt::Display) {
        if !self.quiet && !self.json {
            eprintln!("{}", msg);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
