//! XML documents in the simple and extended attack tree schemas
//!
//! The simple schema nests nodes below their single parent. The extended
//! schema lists nodes by kind and the edges as connections, so it can hold
//! shared children and detached nodes.

mod dom;
pub mod error;
mod reader;
mod writer;

pub use error::{CodecError, CodecResult};

use crate::domain::AttackTree;
use crate::infrastructure::traits::TreeCodec;

/// `TreeCodec` backed by quick-xml.
#[derive(Debug, Default, Clone, Copy)]
pub struct XmlCodec;

impl TreeCodec for XmlCodec {
    fn decode(&self, text: &str) -> CodecResult<AttackTree> {
        reader::decode(text)
    }

    fn encode(&self, tree: &mut AttackTree) -> CodecResult<String> {
        writer::encode(tree)
    }
}
