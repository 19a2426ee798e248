//! Domain-level errors (no external dependencies)

use thiserror::Error;

use crate::domain::entities::NodeId;
use crate::domain::rules::EdgeRule;

/// Domain errors represent structural violations of the attack tree.
/// These are independent of documents and I/O.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("node ID already in tree: {0}")]
    DuplicateId(NodeId),

    #[error("not a canonical node ID (N followed by four digits): {0}")]
    InvalidId(NodeId),

    #[error("no free node IDs left")]
    NoFreeIds,

    #[error("unknown node: {0}")]
    UnknownNode(NodeId),

    #[error("edge {from}-{to} rejected: {rule}")]
    InvalidEdgeType {
        from: NodeId,
        to: NodeId,
        rule: EdgeRule,
    },

    #[error("self-loop on node: {0}")]
    SelfLoop(NodeId),

    #[error("edge already exists: {from}-{to}")]
    DuplicateEdge { from: NodeId, to: NodeId },

    #[error("cycle detected at node: {0}")]
    CycleDetected(NodeId),

    #[error("meta information incomplete: title, author and root are required")]
    MissingMeta,

    #[error("nodes without title: {}", join_ids(.0))]
    EmptyTitle(Vec<NodeId>),
}

fn join_ids(ids: &[NodeId]) -> String {
    ids.iter()
        .map(NodeId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
