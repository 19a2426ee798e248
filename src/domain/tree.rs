//! The attack tree aggregate.
//!
//! Owns every node and edge. Adjacency is kept as ID lists on both endpoints
//! and mirrored by the ordered edge list; all mutations go through the methods
//! here so both views stay in sync.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use termtree::Tree;
use tracing::{debug, instrument, trace};

use crate::domain::entities::{Edge, Meta, Node, NodeId, NodeKind, ID_SPACE};
use crate::domain::error::DomainError;

/// Result type for tree operations.
pub type TreeResult<T> = Result<T, DomainError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DfsState {
    InProgress,
    Finished,
}

/// Typed graph of threats, countermeasures and conjunctions.
///
/// `Clone` is a deep copy; undo stacks snapshot whole trees.
#[derive(Debug, Clone, Default)]
pub struct AttackTree {
    nodes: BTreeMap<NodeId, Node>,
    edges: Vec<Edge>,
    root: Option<NodeId>,
    pub meta: Meta,
    extended: bool,
    reserved: BTreeSet<NodeId>,
    false_nodes: Vec<NodeId>,
}

impl AttackTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_meta(meta: Meta) -> Self {
        Self {
            meta,
            ..Self::default()
        }
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Mutable access for content edits (title, attributes, position).
    /// Adjacency stays crate-private, so structure cannot be changed here.
    pub fn node_mut(&mut self, id: &NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (&NodeId, &Node)> {
        self.nodes.iter()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes.keys()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn root(&self) -> Option<&NodeId> {
        self.root.as_ref()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn has_edge(&self, source: &NodeId, destination: &NodeId) -> bool {
        self.edges
            .iter()
            .any(|e| &e.source == source && &e.destination == destination)
    }

    /// Result of the last `check_extended`.
    pub fn is_extended(&self) -> bool {
        self.extended
    }

    pub fn set_extended(&mut self, extended: bool) {
        self.extended = extended;
    }

    /// Nodes found by the last `check_nodes`.
    pub fn false_nodes(&self) -> &[NodeId] {
        &self.false_nodes
    }

    pub fn reserved(&self) -> &BTreeSet<NodeId> {
        &self.reserved
    }

    /// Keeps `id` out of automatic allocation, e.g. while a paste is pending.
    pub fn reserve(&mut self, id: NodeId) {
        self.reserved.insert(id);
    }

    pub fn release_reserved(&mut self) {
        self.reserved.clear();
    }

    /// Lowest free canonical ID not in the tree, the reserved list or `exclude`.
    pub fn next_id(&self, exclude: &[NodeId]) -> Option<NodeId> {
        (0..ID_SPACE).map(NodeId::from_index).find(|id| {
            !self.nodes.contains_key(id) && !self.reserved.contains(id) && !exclude.contains(id)
        })
    }

    /// Adds a node, allocating an ID if it has none.
    ///
    /// Any adjacency on the incoming node is dropped; edges only come from
    /// `add_edge`.
    #[instrument(level = "trace", skip(self, node), fields(id = ?node.id))]
    pub fn add_node(&mut self, mut node: Node) -> TreeResult<NodeId> {
        let id = match node.id.take() {
            Some(id) => id,
            None => self.next_id(&[]).ok_or(DomainError::NoFreeIds)?,
        };
        if !id.is_canonical() {
            debug!("add_node: non-canonical id {}", id);
            return Err(DomainError::InvalidId(id));
        }
        if self.contains(&id) {
            debug!("add_node: duplicate id {}", id);
            return Err(DomainError::DuplicateId(id));
        }
        node.id = Some(id.clone());
        node.parents.clear();
        node.children.clear();
        let is_root = node.is_root;
        node.is_root = false;
        self.nodes.insert(id.clone(), node);
        if is_root {
            self.set_root(&id)?;
        }
        trace!("add_node: {}", id);
        Ok(id)
    }

    /// Makes `id` the single root node.
    pub fn set_root(&mut self, id: &NodeId) -> TreeResult<()> {
        if !self.contains(id) {
            return Err(DomainError::UnknownNode(id.clone()));
        }
        if let Some(previous) = self.root.take() {
            if let Some(node) = self.nodes.get_mut(&previous) {
                node.is_root = false;
            }
        }
        if let Some(node) = self.nodes.get_mut(id) {
            node.is_root = true;
        }
        self.root = Some(id.clone());
        Ok(())
    }

    /// Adds a validated edge.
    #[instrument(level = "trace", skip(self))]
    pub fn add_edge(&mut self, source: &NodeId, destination: &NodeId) -> TreeResult<()> {
        for id in [source, destination] {
            if !self.contains(id) {
                return Err(DomainError::UnknownNode(id.clone()));
            }
        }
        if source == destination {
            return Err(DomainError::SelfLoop(source.clone()));
        }
        if self.has_edge(source, destination) {
            return Err(DomainError::DuplicateEdge {
                from: source.clone(),
                to: destination.clone(),
            });
        }
        if let Err(rule) = self.check_edge_rules(source, destination) {
            debug!("add_edge: {}-{} rejected: {}", source, destination, rule);
            return Err(DomainError::InvalidEdgeType {
                from: source.clone(),
                to: destination.clone(),
                rule,
            });
        }
        self.link(source, destination);
        Ok(())
    }

    /// Inserts an edge without the type rules. Endpoints must exist.
    fn link(&mut self, source: &NodeId, destination: &NodeId) {
        self.edges.push(Edge::new(source.clone(), destination.clone()));
        if let Some(node) = self.nodes.get_mut(source) {
            node.children.push(destination.clone());
        }
        if let Some(node) = self.nodes.get_mut(destination) {
            node.parents.push(source.clone());
        }
    }

    /// Removes a node and every edge touching it.
    #[instrument(level = "trace", skip(self))]
    pub fn remove_node(&mut self, id: &NodeId) -> bool {
        let Some(node) = self.nodes.get(id) else {
            return false;
        };
        let parents = node.parents.clone();
        let children = node.children.clone();
        for parent in &parents {
            self.remove_edge(parent, id);
        }
        for child in &children {
            self.remove_edge(id, child);
        }
        if self.root.as_ref() == Some(id) {
            self.root = None;
        }
        self.nodes.remove(id);
        true
    }

    /// Removes the edge `source -> destination`; false if it does not exist.
    pub fn remove_edge(&mut self, source: &NodeId, destination: &NodeId) -> bool {
        let Some(pos) = self
            .edges
            .iter()
            .position(|e| &e.source == source && &e.destination == destination)
        else {
            return false;
        };
        self.edges.remove(pos);
        if let Some(node) = self.nodes.get_mut(source) {
            if let Some(i) = node.children.iter().position(|c| c == destination) {
                node.children.remove(i);
            }
        }
        if let Some(node) = self.nodes.get_mut(destination) {
            if let Some(i) = node.parents.iter().position(|p| p == source) {
                node.parents.remove(i);
            }
        }
        true
    }

    /// `remove_edge` addressed by an edge key.
    pub fn remove_edge_key(&mut self, edge: &Edge) -> bool {
        self.remove_edge(&edge.source, &edge.destination)
    }

    /// Depth-first search from every node; reports the first node met again
    /// while still in progress.
    #[instrument(level = "debug", skip(self))]
    pub fn check_cycle(&self) -> TreeResult<()> {
        let mut state: HashMap<&NodeId, DfsState> = HashMap::with_capacity(self.nodes.len());
        for start in self.nodes.keys() {
            if state.contains_key(start) {
                continue;
            }
            // explicit stack: (node, index of next child to visit)
            let mut stack: Vec<(&NodeId, usize)> = vec![(start, 0)];
            state.insert(start, DfsState::InProgress);
            while let Some((current, next_child)) = stack.pop() {
                let children = self
                    .nodes
                    .get(current)
                    .map(|n| n.children.as_slice())
                    .unwrap_or_default();
                let Some(child) = children.get(next_child) else {
                    state.insert(current, DfsState::Finished);
                    continue;
                };
                stack.push((current, next_child + 1));
                match state.get(child) {
                    Some(DfsState::Finished) => {}
                    Some(DfsState::InProgress) => {
                        debug!("check_cycle: cycle at {}", child);
                        return Err(DomainError::CycleDetected(child.clone()));
                    }
                    None => {
                        state.insert(child, DfsState::InProgress);
                        stack.push((child, 0));
                    }
                }
            }
        }
        Ok(())
    }

    /// Whether the tree needs the extended (multi-parent) representation.
    pub fn check_extended(&mut self) -> bool {
        self.extended = self.nodes.values().any(|node| {
            (node.is_conjunction() && node.children.is_empty())
                || (!node.is_root && node.parents.is_empty())
                || node.parents.len() > 1
        });
        self.extended
    }

    /// Title, author and root are present.
    pub fn check_meta(&self) -> bool {
        !self.meta.author.is_empty() && !self.meta.title.is_empty() && self.root.is_some()
    }

    /// Collects threats and countermeasures without title into `false_nodes`.
    pub fn check_nodes(&mut self) -> bool {
        self.false_nodes = self
            .nodes
            .iter()
            .filter(|(_, node)| !node.is_conjunction() && node.title.is_empty())
            .map(|(id, _)| id.clone())
            .collect();
        self.false_nodes.is_empty()
    }

    /// Converts an extended tree to simple form by duplicating shared nodes.
    ///
    /// Each node with several parents is cloned for its last parent; the
    /// clone receives copies of the original's child edges. Repeats until no
    /// node has more than one parent and returns the number of clones.
    #[instrument(level = "debug", skip(self))]
    pub fn make_simple(&mut self) -> TreeResult<usize> {
        self.check_cycle()?;
        let mut clones = 0;
        loop {
            let snapshot: Vec<NodeId> = self.nodes.keys().cloned().collect();
            let mut changed = false;
            for id in &snapshot {
                let Some(node) = self.nodes.get(id) else {
                    continue;
                };
                let Some(parent) = node.parents.last().cloned() else {
                    continue;
                };
                if node.parents.len() < 2 {
                    continue;
                }
                let copy = node.detached_copy();
                let children = node.children.clone();

                let clone_id = self.add_node(copy)?;
                self.remove_edge(&parent, id);
                self.link(&parent, &clone_id);
                for child in &children {
                    self.link(&clone_id, child);
                }
                trace!("make_simple: {} duplicated as {} for {}", id, clone_id, parent);
                clones += 1;
                changed = true;
            }
            if !changed {
                break;
            }
        }
        // encoders re-check the form from scratch
        self.extended = false;
        debug!("make_simple: {} clones", clones);
        Ok(clones)
    }

    pub fn clear_positions(&mut self) {
        for node in self.nodes.values_mut() {
            node.position = None;
        }
    }

    /// Nodes without parents, root first.
    pub fn top_level_nodes(&self) -> Vec<&NodeId> {
        let mut top: Vec<&NodeId> = self
            .nodes
            .iter()
            .filter(|(_, n)| n.parents.is_empty())
            .map(|(id, _)| id)
            .collect();
        if let Some(root) = &self.root {
            top.retain(|id| *id != root);
            top.insert(0, root);
        }
        top
    }

    /// Number of nodes per resolved kind.
    pub fn kind_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for node in self.nodes.values() {
            *counts.entry(node.kind.class().to_string()).or_insert(0) += 1;
        }
        counts
    }

    /// Renders the subtree under `id` for terminal display.
    ///
    /// Shared nodes are repeated under every parent; a node already on the
    /// current path is shown once and not expanded.
    pub fn to_termtree(&self, id: &NodeId) -> Option<Tree<String>> {
        let mut path = Vec::new();
        self.termtree_rec(id, &mut path)
    }

    fn termtree_rec<'a>(&'a self, id: &'a NodeId, path: &mut Vec<&'a NodeId>) -> Option<Tree<String>> {
        let node = self.nodes.get(id)?;
        let label = match node.kind {
            NodeKind::Conjunction(c) => format!("{} [{}]", id, c),
            _ => format!("{} {} ({})", id, node.title, node.kind.label()),
        };
        if path.contains(&id) {
            return Some(Tree::new(format!("{} ...", label)));
        }
        path.push(id);
        let leaves: Vec<Tree<String>> = node
            .children
            .iter()
            .filter_map(|child| self.termtree_rec(child, path))
            .collect();
        path.pop();
        Some(Tree::new(label).with_leaves(leaves))
    }
}
