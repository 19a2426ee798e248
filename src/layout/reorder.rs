//! Bottom-up collision resolution between sibling groups

use tracing::trace;

use crate::domain::NodeId;
use crate::layout::placement::{LayoutState, Placed};
use crate::layout::AbortSignal;

impl<'a> LayoutState<'a> {
    /// Resolves collisions inside every subgroup, then between the left
    /// and right groups of `placed`. Returns whether any collision was seen.
    pub(crate) fn reorder(&mut self, placed: &Placed<'a>, abort: &dyn AbortSignal) -> bool {
        let mut collided = false;
        for child in placed.left.iter().chain(&placed.right) {
            if self.aborted {
                return collided;
            }
            collided |= self.reorder(child, abort);
        }
        if self.aborted {
            return collided;
        }
        collided | self.fix_collision(&placed.left, &placed.right, abort)
    }

    /// Pushes the left groups left and the right groups right until no box
    /// of one side overlaps a box of the other, or the shift cap is hit.
    fn fix_collision(
        &mut self,
        left: &[Placed<'a>],
        right: &[Placed<'a>],
        abort: &dyn AbortSignal,
    ) -> bool {
        if left.is_empty() || right.is_empty() {
            return false;
        }
        let mut left_ids = Vec::new();
        left.iter().for_each(|p| p.collect_members(&mut left_ids));
        let mut right_ids = Vec::new();
        right.iter().for_each(|p| p.collect_members(&mut right_ids));

        let step = self.settings.shift_step;
        let mut collided = false;
        for _ in 0..self.settings.max_shift_iterations {
            if !self.sides_overlap(&left_ids, &right_ids) {
                break;
            }
            collided = true;
            if abort.is_aborted() {
                self.aborted = true;
                break;
            }
            self.shift(&left_ids, -step);
            self.shift(&right_ids, step);
            self.shifts += 1;
        }
        collided
    }

    fn sides_overlap(&self, left: &[&'a NodeId], right: &[&'a NodeId]) -> bool {
        let right_rects: Vec<_> = right.iter().filter_map(|id| self.rect(id)).collect();
        left.iter()
            .filter_map(|id| self.rect(id))
            .any(|l| right_rects.iter().any(|r| l.overlaps(r)))
    }

    fn shift(&mut self, ids: &[&'a NodeId], dx: f64) {
        for id in ids {
            if let Some(p) = self.positions.get_mut(id) {
                p.x += dx;
                trace!("shift {} by {} to {}", id, dx, p.x);
            }
        }
    }
}
