//! Infrastructure layer: file access, the XML document codec and service
//! wiring.

pub mod di;
pub mod error;
pub mod traits;
pub mod xml;

pub use error::InfraError;
