//! Domain layer: the attack tree model and its structural rules
//!
//! This layer is independent of external concerns (no I/O, no documents, no config loading).

pub mod entities;
pub mod error;
pub mod rules;
pub mod tree;

pub use entities::*;
pub use error::DomainError;
pub use rules::EdgeRule;
pub use tree::{AttackTree, TreeResult};
