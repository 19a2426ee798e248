//! CLI-level errors (wraps infrastructure errors)

use std::io;

use thiserror::Error;

use crate::application::ApplicationError;
use crate::exitcode;
use crate::infrastructure::InfraError;

/// CLI errors are the top-level error type.
/// These are what get displayed to the user.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Infra(#[from] InfraError),

    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("{0}")]
    Usage(String),
}

impl From<ApplicationError> for CliError {
    fn from(e: ApplicationError) -> Self {
        CliError::Infra(InfraError::Application(e))
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::InvalidArgs(_) | CliError::Usage(_) => exitcode::USAGE,
            CliError::Infra(e) => match e {
                InfraError::Io { .. } => exitcode::CANTCREAT,
                InfraError::Application(app) => match app {
                    ApplicationError::Domain(_) | ApplicationError::Document { .. } => {
                        exitcode::DATAERR
                    }
                    ApplicationError::Config { .. } => exitcode::CONFIG,
                    ApplicationError::OperationFailed { source, .. } => {
                        match source.downcast_ref::<io::Error>().map(io::Error::kind) {
                            Some(io::ErrorKind::NotFound) => exitcode::NOINPUT,
                            Some(_) => exitcode::IOERR,
                            None => exitcode::SOFTWARE,
                        }
                    }
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DomainError;

    #[test]
    fn given_domain_error_when_mapping_exit_code_then_dataerr() {
        let err = CliError::from(ApplicationError::Domain(DomainError::MissingMeta));
        assert_eq!(err.exit_code(), exitcode::DATAERR);
    }

    #[test]
    fn given_missing_file_when_mapping_exit_code_then_noinput() {
        let err = CliError::from(ApplicationError::OperationFailed {
            context: "read document: x.xml".into(),
            source: Box::new(io::Error::from(io::ErrorKind::NotFound)),
        });
        assert_eq!(err.exit_code(), exitcode::NOINPUT);
    }
}
