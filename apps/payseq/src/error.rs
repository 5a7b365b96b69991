//! CLI error handling

use std::fmt;

use payseq_errors::UserFacingError;

/// CLI-specific error type
#[derive(Debug)]
pub enum CliError {
    /// Configuration error
    Config(payseq_errors::ConfigError),
    /// Sequencer error
    Run(payseq_errors::Error),
    /// The run finished but some payloads failed
    PayloadsFailed(usize),
    /// The run finished with payloads that never started
    PayloadsNotRun(usize),
    /// I/O error
    Io(std::io::Error),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(e) => {
                write!(f, "Configuration error: {}", e.user_message())?;
                if let Some(hint) = e.user_hint() {
                    write!(f, "\n  Hint: {hint}")?;
                }
                Ok(())
            }
            CliError::Run(e) => {
                let message = e.user_message();
                write!(f, "{message}")?;
                if let Some(code) = e.user_code() {
                    write!(f, "\n  Code: {code}")?;
                }
                if let Some(hint) = e.user_hint() {
                    write!(f, "\n  Hint: {hint}")?;
                }
                if e.is_retryable() {
                    write!(f, "\n  Retry: safe to retry this operation.")?;
                }
                Ok(())
            }
            CliError::PayloadsFailed(count) => write!(f, "{count} payload(s) failed"),
            CliError::PayloadsNotRun(count) => write!(
                f,
                "{count} payload(s) never ran\n  Hint: check that every payload lists all of its transitive requirements"
            ),
            CliError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) => Some(e),
            CliError::Run(e) => Some(e),
            CliError::Io(e) => Some(e),
            CliError::PayloadsFailed(_) | CliError::PayloadsNotRun(_) => None,
        }
    }
}

impl From<payseq_errors::ConfigError> for CliError {
    fn from(e: payseq_errors::ConfigError) -> Self {
        CliError::Config(e)
    }
}

impl From<payseq_errors::Error> for CliError {
    fn from(e: payseq_errors::Error) -> Self {
        match e {
            payseq_errors::Error::Config(config) => CliError::Config(config),
            other => CliError::Run(other),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Io(e)
    }
}
