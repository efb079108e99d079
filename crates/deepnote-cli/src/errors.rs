//! CLI error types and their exit codes.

use std::fmt;

use deepnote_core::DeepnoteError;

use crate::constants::exit_codes;

/// CLI-specific errors with associated exit codes.
#[derive(Debug)]
pub enum CliError {
    /// Integration or file not found
    NotFound { message: String, hint: String },

    /// Wrong or missing passphrase
    AuthFailed {
        message: String,
        hint: Option<String>,
    },

    /// Invalid user input
    InvalidInput(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::NotFound { message, hint } => {
                write!(f, "{}\n{}", message, hint)
            }
            CliError::AuthFailed { message, hint } => {
                if let Some(h) = hint {
                    write!(f, "{}\n{}", message, h)
                } else {
                    write!(f, "{}", message)
                }
            }
            CliError::InvalidInput(message) => write!(f, "{}", message),
        }
    }
}

impl std::error::Error for CliError {}

impl CliError {
    pub fn not_found(message: impl Into<String>, hint: impl Into<String>) -> Self {
        CliError::NotFound {
            message: message.into(),
            hint: hint.into(),
        }
    }

    pub fn auth_failed_with_hint(message: impl Into<String>, hint: impl Into<String>) -> Self {
        CliError::AuthFailed {
            message: message.into(),
            hint: Some(hint.into()),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        CliError::InvalidInput(message.into())
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::NotFound { .. } => exit_codes::NOT_FOUND,
            CliError::AuthFailed { .. } => exit_codes::AUTH_FAILED,
            CliError::InvalidInput(_) => exit_codes::INVALID_INPUT,
        }
    }
}

fn core_exit_code(err: &DeepnoteError) -> i32 {
    match err {
        DeepnoteError::IncorrectPassphrase => exit_codes::AUTH_FAILED,
        DeepnoteError::NotFound(_) => exit_codes::NOT_FOUND,
        DeepnoteError::Validation(_)
        | DeepnoteError::Schema(_)
        | DeepnoteError::InvalidInput(_)
        | DeepnoteError::ReservedIntegration(_)
        | DeepnoteError::UnsupportedIntegration { .. }
        | DeepnoteError::Json { .. }
        | DeepnoteError::Yaml { .. } => exit_codes::INVALID_INPUT,
        DeepnoteError::Crypto(_)
        | DeepnoteError::Storage(_)
        | DeepnoteError::Io { .. }
        | DeepnoteError::Other(_) => exit_codes::GENERAL,
    }
}

/// Exit code for any error surfaced from a command.
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    if let Some(cli) = err.downcast_ref::<CliError>() {
        return cli.exit_code();
    }
    if let Some(core) = err.downcast_ref::<DeepnoteError>() {
        return core_exit_code(core);
    }
    exit_codes::GENERAL
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let not_found: anyhow::Error = CliError::not_found("missing", "hint").into();
        assert_eq!(exit_code_for(&not_found), exit_codes::NOT_FOUND);

        let wrong: anyhow::Error = DeepnoteError::IncorrectPassphrase.into();
        assert_eq!(exit_code_for(&wrong), exit_codes::AUTH_FAILED);

        let reserved: anyhow::Error =
            DeepnoteError::ReservedIntegration("deepnote-dataframe-sql".to_string()).into();
        assert_eq!(exit_code_for(&reserved), exit_codes::INVALID_INPUT);

        let other = anyhow::anyhow!("boom");
        assert_eq!(exit_code_for(&other), exit_codes::GENERAL);
    }
}
