//! Constants used throughout the CLI.

/// Exit codes for the CLI.
///
/// These follow common Unix conventions:
/// - 0: Success
/// - 1: General error
/// - 2: Misuse of shell command (reserved by shells and clap)
/// - 3+: Application-specific errors
pub mod exit_codes {
    pub const GENERAL: i32 = 1;

    /// Integration, project or file not found.
    pub const NOT_FOUND: i32 = 3;

    /// Invalid user input, config JSON or project file.
    pub const INVALID_INPUT: i32 = 4;

    /// Wrong or missing passphrase.
    pub const AUTH_FAILED: i32 = 5;
}

/// Environment variable overriding the log filter.
pub const LOG_ENV: &str = "DEEPNOTE_LOG";

/// Default environment variable holding the store passphrase.
pub const DEFAULT_PASSPHRASE_ENV: &str = "DEEPNOTE_PASSPHRASE";

/// Shown in place of secret values.
pub const REDACTED: &str = "********";
