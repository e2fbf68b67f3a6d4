//! CLI-level errors (wraps application errors)

use thiserror::Error;

use crate::application::ApplicationError;
use crate::domain::SyncError;

/// CLI errors are the top-level error type.
/// These are what get displayed to the user.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Application(#[from] ApplicationError),

    #[error("invalid arguments: {0}")]
    InvalidArgs(String),
}

impl From<SyncError> for CliError {
    fn from(e: SyncError) -> Self {
        CliError::Application(ApplicationError::Sync(e))
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::InvalidArgs(_) => crate::exitcode::USAGE,
            CliError::Application(e) => match e {
                ApplicationError::Config { .. } => crate::exitcode::CONFIG,
                ApplicationError::Document { .. } => crate::exitcode::DATAERR,
                ApplicationError::OperationFailed { .. } => crate::exitcode::IOERR,
                ApplicationError::Sync(SyncError::Configuration(_))
                | ApplicationError::Sync(SyncError::DuplicateRegistration { .. }) => {
                    crate::exitcode::CONFIG
                }
                ApplicationError::Sync(SyncError::UnknownType(_)) => crate::exitcode::DATAERR,
                ApplicationError::Sync(_) => crate::exitcode::SOFTWARE,
            },
        }
    }
}
