//! Domain entities: nodes, edges and document metadata

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of distinct canonical node IDs (`N0000` ..= `N9999`).
pub const ID_SPACE: u16 = 10_000;

/// Identifier of a node inside a tree.
///
/// Canonical IDs look like `N0042`. The tree allocates and accepts only
/// canonical IDs.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Canonical ID for slot `index`. Callers keep `index < ID_SPACE`.
    pub fn from_index(index: u16) -> Self {
        Self(format!("N{:04}", index))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for IDs of the form `N` followed by exactly four digits.
    pub fn is_canonical(&self) -> bool {
        let bytes = self.0.as_bytes();
        bytes.len() == 5 && bytes[0] == b'N' && bytes[1..].iter().all(u8::is_ascii_digit)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Logical operator of a conjunction node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConjunctionType {
    Alternative,
    Composition,
    Sequence,
    Threshold,
}

impl ConjunctionType {
    pub const ALL: [ConjunctionType; 4] = [
        ConjunctionType::Alternative,
        ConjunctionType::Composition,
        ConjunctionType::Sequence,
        ConjunctionType::Threshold,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConjunctionType::Alternative => "alternative",
            ConjunctionType::Composition => "composition",
            ConjunctionType::Sequence => "sequence",
            ConjunctionType::Threshold => "threshold",
        }
    }
}

impl fmt::Display for ConjunctionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error parsing a conjunction type label.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown conjunction type: {0}")]
pub struct UnknownConjunctionType(pub String);

impl FromStr for ConjunctionType {
    type Err = UnknownConjunctionType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConjunctionType::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownConjunctionType(s.to_string()))
    }
}

/// Kind of a node. Every rule site matches on this exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Threat,
    Countermeasure,
    Conjunction(ConjunctionType),
}

impl NodeKind {
    pub fn is_conjunction(&self) -> bool {
        matches!(self, NodeKind::Conjunction(_))
    }

    /// Kind without the conjunction operator, used when comparing resolved types.
    pub fn class(&self) -> KindClass {
        match self {
            NodeKind::Threat => KindClass::Threat,
            NodeKind::Countermeasure => KindClass::Countermeasure,
            NodeKind::Conjunction(_) => KindClass::Conjunction,
        }
    }

    /// Element / display name.
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Threat => "threat",
            NodeKind::Countermeasure => "countermeasure",
            NodeKind::Conjunction(c) => c.as_str(),
        }
    }
}

/// Node kind with conjunction operators collapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KindClass {
    Threat,
    Countermeasure,
    Conjunction,
}

impl fmt::Display for KindClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            KindClass::Threat => "Threat",
            KindClass::Countermeasure => "Countermeasure",
            KindClass::Conjunction => "Conjunction",
        };
        f.write_str(s)
    }
}

/// Position assigned by the layout engine.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A vertex of the attack tree.
///
/// Adjacency is stored as ID keys into the owning tree; only the tree
/// mutates `parents` and `children`.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Unset until the node is added to a tree
    pub id: Option<NodeId>,
    pub kind: NodeKind,
    pub title: String,
    pub description: String,
    pub attributes: BTreeMap<String, String>,
    pub is_root: bool,
    pub(crate) parents: Vec<NodeId>,
    pub(crate) children: Vec<NodeId>,
    /// Transient, written by the layout engine
    pub position: Option<Point>,
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        let title = match kind {
            NodeKind::Conjunction(c) => c.as_str().to_string(),
            _ => String::new(),
        };
        Self {
            id: None,
            kind,
            title,
            description: String::new(),
            attributes: BTreeMap::new(),
            is_root: false,
            parents: Vec::new(),
            children: Vec::new(),
            position: None,
        }
    }

    pub fn threat(title: impl Into<String>) -> Self {
        Self::new(NodeKind::Threat).with_title(title)
    }

    pub fn countermeasure(title: impl Into<String>) -> Self {
        Self::new(NodeKind::Countermeasure).with_title(title)
    }

    pub fn conjunction(conjunction: ConjunctionType) -> Self {
        Self::new(NodeKind::Conjunction(conjunction))
    }

    pub fn with_id(mut self, id: impl Into<NodeId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn as_root(mut self) -> Self {
        self.is_root = true;
        self
    }

    pub fn parents(&self) -> &[NodeId] {
        &self.parents
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn is_conjunction(&self) -> bool {
        self.kind.is_conjunction()
    }

    /// Copy of this node without identity, adjacency or position.
    pub fn detached_copy(&self) -> Self {
        Self {
            id: None,
            kind: self.kind,
            title: self.title.clone(),
            description: self.description.clone(),
            attributes: self.attributes.clone(),
            is_root: false,
            parents: Vec::new(),
            children: Vec::new(),
            position: None,
        }
    }
}

/// Directed, untyped arc between two nodes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Edge {
    pub source: NodeId,
    pub destination: NodeId,
}

impl Edge {
    pub fn new(source: impl Into<NodeId>, destination: impl Into<NodeId>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
        }
    }
}

/// Edge key in the `SOURCE-DESTINATION` form.
impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.source, self.destination)
    }
}

/// Error parsing an edge key.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid edge key: {0}")]
pub struct InvalidEdgeKey(pub String);

impl FromStr for Edge {
    type Err = InvalidEdgeKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('-') {
            Some((source, destination)) if !source.is_empty() && !destination.is_empty() => {
                Ok(Edge::new(source, destination))
            }
            _ => Err(InvalidEdgeKey(s.to_string())),
        }
    }
}

/// Document metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    pub title: String,
    pub author: String,
    pub date: String,
    pub description: String,
}
