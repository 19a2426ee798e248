//! Codec errors

use thiserror::Error;

use crate::domain::DomainError;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("malformed XML at byte {position}: {message}")]
    Parse { position: u64, message: String },

    #[error("not an attack tree document: {0}")]
    SchemaMismatch(String),

    #[error("{context}: {source}")]
    Rejected {
        context: String,
        #[source]
        source: DomainError,
    },

    #[error("cannot write XML: {0}")]
    Write(String),
}

impl CodecError {
    pub(crate) fn schema(message: impl Into<String>) -> Self {
        Self::SchemaMismatch(message.into())
    }

    pub(crate) fn rejected(context: impl Into<String>, source: DomainError) -> Self {
        Self::Rejected {
            context: context.into(),
            source,
        }
    }
}

pub type CodecResult<T> = Result<T, CodecError>;
