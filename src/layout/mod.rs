//! Automatic layout of attack trees
//!
//! Placement is recursive and top-down: each node's unvisited children are
//! put in a row centered below it. Collisions are then resolved bottom-up
//! by pushing the left and right child groups of every node apart. Both
//! loops are capped; an unresolved overlap is reported, not an error.
//!
//! Groups on the same side of a node are never separated from each other,
//! so a node with several threat branches (or several countermeasure
//! branches) can end with overlapping boxes. `LayoutReport::residual_overlap`
//! counts them; renderers must not assume it is zero.
//!
//! Components without a connection to the root are stacked below the
//! content placed so far.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, instrument};

use crate::config::LayoutSettings;
use crate::domain::{AttackTree, NodeId, Point, TreeResult};

pub mod geometry;
mod placement;
mod reorder;

pub use geometry::{node_rect, node_size, Rect};
pub use placement::{edge_offset, EdgeOffset};

use placement::LayoutState;

/// Cooperative cancellation, polled between shift iterations and passes.
pub trait AbortSignal {
    fn is_aborted(&self) -> bool;
}

impl AbortSignal for AtomicBool {
    fn is_aborted(&self) -> bool {
        self.load(Ordering::Relaxed)
    }
}

impl AbortSignal for Cell<bool> {
    fn is_aborted(&self) -> bool {
        self.get()
    }
}

/// Signal that never fires.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverAbort;

impl AbortSignal for NeverAbort {
    fn is_aborted(&self) -> bool {
        false
    }
}

/// Outcome of one layout run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayoutReport {
    /// Number of separately placed components
    pub components: usize,
    /// Collision passes over all components
    pub passes: u32,
    /// Group shifts over all passes
    pub shifts: u32,
    /// Run stopped on the abort signal
    pub aborted: bool,
    /// Pairs of node boxes still overlapping
    pub residual_overlap: usize,
}

pub struct LayoutEngine<'s> {
    settings: &'s LayoutSettings,
}

impl<'s> LayoutEngine<'s> {
    pub fn new(settings: &'s LayoutSettings) -> Self {
        Self { settings }
    }

    /// Assigns a position to every node of `tree`.
    ///
    /// Cyclic trees are refused with `CycleDetected`. Unless
    /// `fixed_positions` is set, existing positions are discarded first;
    /// with it, they are kept and collision resolution is skipped.
    #[instrument(level = "debug", skip_all, fields(nodes = tree.len()))]
    pub fn run(&self, tree: &mut AttackTree, abort: &dyn AbortSignal) -> TreeResult<LayoutReport> {
        tree.check_cycle()?;
        if !self.settings.fixed_positions {
            tree.clear_positions();
        }

        let (placed, report) = self.compute(tree, abort);
        for (id, point) in placed {
            if let Some(node) = tree.node_mut(&id) {
                node.position = Some(point);
            }
        }
        debug!(
            "layout: {} components, {} passes, {} shifts, {} overlaps{}",
            report.components,
            report.passes,
            report.shifts,
            report.residual_overlap,
            if report.aborted { " (aborted)" } else { "" }
        );
        Ok(report)
    }

    fn compute(
        &self,
        tree: &AttackTree,
        abort: &dyn AbortSignal,
    ) -> (Vec<(NodeId, Point)>, LayoutReport) {
        let settings = self.settings;
        let mut state = LayoutState::new(tree, settings);
        let mut report = LayoutReport::default();

        let starts = tree.top_level_nodes().into_iter().chain(tree.node_ids());
        for start in starts {
            if state.visited.contains(start) {
                continue;
            }
            let y = match (report.components, state.bottom()) {
                (0, _) | (_, None) => settings.origin.y,
                (_, Some(bottom)) => bottom + settings.component_gap,
            };
            let placed = state.place(start, settings.origin.x, y);
            report.components += 1;

            if settings.fixed_positions {
                continue;
            }
            for _ in 0..settings.max_passes {
                if state.aborted || abort.is_aborted() {
                    state.aborted = true;
                    break;
                }
                report.passes += 1;
                if !state.reorder(&placed, abort) {
                    break;
                }
            }
        }

        report.shifts = state.shifts;
        report.aborted = state.aborted;
        let rects: Vec<Rect> = state
            .positions
            .keys()
            .filter_map(|id| state.rect(id))
            .collect();
        report.residual_overlap = count_overlaps(&rects);

        let points = state
            .positions
            .into_iter()
            .map(|(id, p)| (id.clone(), p))
            .collect();
        (points, report)
    }
}

fn count_overlaps(rects: &[Rect]) -> usize {
    rects
        .iter()
        .enumerate()
        .map(|(i, a)| rects[i + 1..].iter().filter(|b| a.overlaps(b)).count())
        .sum()
}

/// Positions written by the last layout run, keyed by node.
pub fn positions(tree: &AttackTree) -> BTreeMap<NodeId, Point> {
    tree.nodes()
        .filter_map(|(id, node)| node.position.map(|p| (id.clone(), p)))
        .collect()
}
