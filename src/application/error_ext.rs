//! Context for lower-layer results
//!
//! Both helpers attach the document path, which is the one piece of context
//! the user needs to act on a failed load or save.

use std::io;
use std::path::Path;

use crate::application::{ApplicationError, ApplicationResult};
use crate::infrastructure::xml::CodecResult;

pub trait IoResultExt<T> {
    /// `OperationFailed` with `"<action>: <path>"` as context.
    fn with_path_context(self, action: &str, path: &Path) -> ApplicationResult<T>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn with_path_context(self, action: &str, path: &Path) -> ApplicationResult<T> {
        self.map_err(|e| ApplicationError::OperationFailed {
            context: format!("{}: {}", action, path.display()),
            source: Box::new(e),
        })
    }
}

pub trait CodecResultExt<T> {
    /// `Document` error naming `path`.
    fn for_document(self, path: &Path) -> ApplicationResult<T>;
}

impl<T> CodecResultExt<T> for CodecResult<T> {
    fn for_document(self, path: &Path) -> ApplicationResult<T> {
        self.map_err(|source| ApplicationError::Document {
            path: path.to_path_buf(),
            source,
        })
    }
}
