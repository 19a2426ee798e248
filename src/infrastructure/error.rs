//! Infrastructure-level errors

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::application::ApplicationError;

/// Errors of the outer shell: everything the services report, plus file
/// work the CLI does itself (config templates, working directory).
#[derive(Error, Debug)]
pub enum InfraError {
    #[error("{0}")]
    Application(#[from] ApplicationError),

    #[error("cannot {action} {}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl InfraError {
    pub fn io(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }
}
