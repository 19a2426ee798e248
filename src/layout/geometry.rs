//! Node boxes and overlap tests

use crate::config::LayoutSettings;
use crate::domain::{Node, Point};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub fn right(&self) -> f64 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.h
    }

    /// Strict overlap: touching edges do not count.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }
}

/// Width and height of the box drawn for `node`.
pub fn node_size(node: &Node, settings: &LayoutSettings) -> (f64, f64) {
    let height = if node.is_conjunction() {
        settings.conjunction_height
    } else {
        settings.node_height + settings.attribute_row_height * node.attributes.len() as f64
    };
    (settings.node_width, height)
}

/// Collision rectangle of `node` placed at `at`.
///
/// Conjunctions are drawn wider than their nominal width by the margin on
/// both sides.
pub fn node_rect(node: &Node, at: Point, settings: &LayoutSettings) -> Rect {
    let (w, h) = node_size(node, settings);
    if node.is_conjunction() {
        Rect {
            x: at.x - settings.conjunction_margin,
            y: at.y,
            w: w + 2.0 * settings.conjunction_margin,
            h,
        }
    } else {
        Rect { x: at.x, y: at.y, w, h }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ConjunctionType;

    #[test]
    fn given_touching_rects_when_checking_overlap_then_false() {
        let a = Rect { x: 0.0, y: 0.0, w: 200.0, h: 60.0 };
        let b = Rect { x: 200.0, y: 0.0, w: 200.0, h: 60.0 };
        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));
    }

    #[test]
    fn given_intersecting_rects_when_checking_overlap_then_true() {
        let a = Rect { x: 0.0, y: 0.0, w: 200.0, h: 60.0 };
        let b = Rect { x: 150.0, y: 30.0, w: 200.0, h: 60.0 };
        assert!(a.overlaps(&b));
    }

    #[test]
    fn given_attributes_when_sizing_then_height_grows_per_row() {
        let settings = LayoutSettings::default();
        let node = Node::threat("t")
            .with_attribute("cost", "low")
            .with_attribute("skill", "high");

        assert_eq!(node_size(&node, &settings), (200.0, 100.0));
    }

    #[test]
    fn given_conjunction_when_building_rect_then_widened_by_margin() {
        let settings = LayoutSettings::default();
        let node = Node::conjunction(ConjunctionType::Alternative);

        let rect = node_rect(&node, Point::new(100.0, 50.0), &settings);

        assert_eq!(rect, Rect { x: 80.0, y: 50.0, w: 240.0, h: 40.0 });
    }
}
