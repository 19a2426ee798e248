//! Application layer: document use cases over the domain model
//!
//! Services here see files and formats only through the infrastructure
//! traits.

pub mod error;
pub mod error_ext;
pub mod services;

pub use error::{ApplicationError, ApplicationResult};
pub use error_ext::{CodecResultExt, IoResultExt};
