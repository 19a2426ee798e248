//! Recursive top-down placement of a component

use std::collections::{HashMap, HashSet};

use tracing::trace;

use crate::config::LayoutSettings;
use crate::domain::{AttackTree, KindClass, NodeId, NodeKind, Point};
use crate::layout::geometry::{node_rect, node_size, Rect};

/// Side an outgoing edge leaves its source on.
///
/// Threats send threat branches to the left and countermeasure branches
/// to the right; every other edge starts at the center.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeOffset {
    Left,
    Centered,
    Right,
}

/// Classifies the edge `source -> destination` for grouping and drawing.
pub fn edge_offset(tree: &AttackTree, source: &NodeId, destination: &NodeId) -> EdgeOffset {
    match tree.node(source).map(|n| n.kind) {
        Some(NodeKind::Threat) => match tree.type_down(destination) {
            Some(KindClass::Threat) => EdgeOffset::Left,
            Some(KindClass::Countermeasure) => EdgeOffset::Right,
            _ => EdgeOffset::Centered,
        },
        _ => EdgeOffset::Centered,
    }
}

/// A placed node with its child groups split by side.
#[derive(Debug)]
pub(crate) struct Placed<'a> {
    pub node: &'a NodeId,
    pub left: Vec<Placed<'a>>,
    pub right: Vec<Placed<'a>>,
}

impl<'a> Placed<'a> {
    fn leaf(node: &'a NodeId) -> Self {
        Self {
            node,
            left: Vec::new(),
            right: Vec::new(),
        }
    }

    /// This node and every node placed below it.
    pub fn collect_members(&self, out: &mut Vec<&'a NodeId>) {
        out.push(self.node);
        for child in self.left.iter().chain(&self.right) {
            child.collect_members(out);
        }
    }
}

/// Scratch state of one layout run.
pub(crate) struct LayoutState<'a> {
    pub tree: &'a AttackTree,
    pub settings: &'a LayoutSettings,
    pub positions: HashMap<&'a NodeId, Point>,
    pub visited: HashSet<&'a NodeId>,
    pub shifts: u32,
    pub aborted: bool,
}

impl<'a> LayoutState<'a> {
    pub fn new(tree: &'a AttackTree, settings: &'a LayoutSettings) -> Self {
        let mut positions = HashMap::new();
        if settings.fixed_positions {
            for (id, node) in tree.nodes() {
                if let Some(p) = node.position {
                    positions.insert(id, p);
                }
            }
        }
        Self {
            tree,
            settings,
            positions,
            visited: HashSet::with_capacity(tree.len()),
            shifts: 0,
            aborted: false,
        }
    }

    pub fn rect(&self, id: &NodeId) -> Option<Rect> {
        let node = self.tree.node(id)?;
        let at = self.positions.get(id)?;
        Some(node_rect(node, *at, self.settings))
    }

    /// Lowest edge of everything placed so far.
    pub fn bottom(&self) -> Option<f64> {
        self.positions
            .keys()
            .filter_map(|id| self.rect(id))
            .map(|r| r.bottom())
            .reduce(f64::max)
    }

    /// Places `id` at `(x, y)` unless it already has a position, then its
    /// unvisited children in a centered row below it.
    pub fn place(&mut self, id: &'a NodeId, x: f64, y: f64) -> Placed<'a> {
        let tree = self.tree;
        let Some(node) = tree.node(id) else {
            return Placed::leaf(id);
        };
        let at = *self.positions.entry(id).or_insert(Point::new(x, y));
        trace!("place {} at ({}, {})", id, at.x, at.y);
        if !self.visited.insert(id) {
            return Placed::leaf(id);
        }

        let pending: Vec<&'a NodeId> = node
            .children()
            .iter()
            .filter(|c| !self.visited.contains(c))
            .collect();
        let mut placed = Placed::leaf(id);
        if pending.is_empty() {
            return placed;
        }

        let (width, height) = node_size(node, self.settings);
        let spacing = self.settings.horizontal_spacing;
        let row_width = (pending.len() - 1) as f64 * spacing + self.settings.node_width;
        let start_x = at.x + width / 2.0 - row_width / 2.0;
        let child_y = at.y + height + self.settings.vertical_spacing;

        let mut next_centered_left = true;
        for (i, child) in pending.into_iter().enumerate() {
            // a sibling subtree may have reached it first
            if self.visited.contains(child) {
                continue;
            }
            let group = self.place(child, start_x + i as f64 * spacing, child_y);
            match edge_offset(tree, id, child) {
                EdgeOffset::Left => placed.left.push(group),
                EdgeOffset::Right => placed.right.push(group),
                EdgeOffset::Centered => {
                    if next_centered_left {
                        placed.left.push(group);
                    } else {
                        placed.right.push(group);
                    }
                    next_centered_left = !next_centered_left;
                }
            }
        }
        placed
    }
}
