//! Edge type-compatibility rules
//!
//! The rule table is a policy: it captures the most complete revision of the
//! attack tree editor's edge checks. Each rule has its own variant so callers
//! can tell the user which combination was refused.

use std::collections::HashSet;
use std::fmt;

use crate::domain::entities::{KindClass, Node, NodeId};
use crate::domain::tree::AttackTree;

/// A rule that refused an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeRule {
    /// A countermeasure (possibly through conjunctions) may not feed a threat.
    CountermeasureFeedsThreat,
    /// Two conjunctions resolving to different concrete kinds may not be joined.
    MixedConjunction,
    /// A threat with children may only gain further threat branches through a conjunction.
    ThreatBranchOutsideConjunction,
    /// A countermeasure with children may only branch through a conjunction.
    CountermeasureBranchOutsideConjunction,
    /// The parent already holds a branch of the same resolved kind.
    DuplicateBranch,
}

impl fmt::Display for EdgeRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EdgeRule::CountermeasureFeedsThreat => "a countermeasure may not lead to a threat",
            EdgeRule::MixedConjunction => {
                "conjunctions with threat and countermeasure children may not be joined"
            }
            EdgeRule::ThreatBranchOutsideConjunction => {
                "additional threat branches need a conjunction"
            }
            EdgeRule::CountermeasureBranchOutsideConjunction => {
                "additional countermeasure branches need a conjunction"
            }
            EdgeRule::DuplicateBranch => "parent already has a branch of this kind",
        };
        f.write_str(s)
    }
}

impl AttackTree {
    /// Resolved kind walking down through first children of conjunctions.
    ///
    /// Returns `Conjunction` for a conjunction chain without concrete
    /// descendant, `None` for an unknown ID.
    pub fn type_down(&self, id: &NodeId) -> Option<KindClass> {
        self.resolve_kind(id, |node| node.children.first())
    }

    /// Resolved kind walking up through first parents of conjunctions.
    pub fn type_up(&self, id: &NodeId) -> Option<KindClass> {
        self.resolve_kind(id, |node| node.parents.first())
    }

    fn resolve_kind<'a, F>(&'a self, id: &NodeId, next: F) -> Option<KindClass>
    where
        F: Fn(&'a Node) -> Option<&'a NodeId>,
    {
        let mut current = self.node(id)?;
        let mut seen = HashSet::new();
        while current.is_conjunction() {
            let Some(next_id) = next(current) else {
                return Some(KindClass::Conjunction);
            };
            if !seen.insert(next_id) {
                // conjunction-only cycle
                return Some(KindClass::Conjunction);
            }
            match self.node(next_id) {
                Some(node) => current = node,
                None => return Some(KindClass::Conjunction),
            }
        }
        Some(current.kind.class())
    }

    /// Nearest concrete node walking up from `id` through first parents.
    ///
    /// Returns the anchor and the anchor's child the walk came through
    /// (`None` when `id` itself is concrete).
    fn concrete_anchor(&self, id: &NodeId) -> Option<(&NodeId, Option<&NodeId>)> {
        let start = self.node(id)?;
        let start_id = start.id.as_ref()?;
        if !start.is_conjunction() {
            return Some((start_id, None));
        }
        let mut via = start_id;
        let mut seen = HashSet::new();
        loop {
            let parent_id = self.node(via)?.parents.first()?;
            if !seen.insert(parent_id) {
                return None;
            }
            let parent = self.node(parent_id)?;
            if !parent.is_conjunction() {
                return Some((parent_id, Some(via)));
            }
            via = parent_id;
        }
    }

    /// Applies the type rules to a prospective edge between two existing nodes.
    pub(crate) fn check_edge_rules(
        &self,
        source_id: &NodeId,
        destination_id: &NodeId,
    ) -> Result<(), EdgeRule> {
        let (Some(source), Some(destination)) = (self.node(source_id), self.node(destination_id))
        else {
            return Ok(());
        };
        let up_source = self.type_up(source_id).unwrap_or(KindClass::Conjunction);
        let down_source = self.type_down(source_id).unwrap_or(KindClass::Conjunction);
        let down_destination = self
            .type_down(destination_id)
            .unwrap_or(KindClass::Conjunction);

        if up_source == KindClass::Countermeasure && down_destination == KindClass::Threat {
            return Err(EdgeRule::CountermeasureFeedsThreat);
        }

        if source.is_conjunction()
            && destination.is_conjunction()
            && down_source != KindClass::Conjunction
            && down_destination != KindClass::Conjunction
            && down_source != down_destination
        {
            return Err(EdgeRule::MixedConjunction);
        }

        if !source.is_conjunction() && !source.children.is_empty() {
            match down_source {
                KindClass::Threat if down_destination == KindClass::Threat => {
                    return Err(EdgeRule::ThreatBranchOutsideConjunction);
                }
                KindClass::Countermeasure
                    if down_destination == KindClass::Countermeasure
                        || destination.is_conjunction() =>
                {
                    return Err(EdgeRule::CountermeasureBranchOutsideConjunction);
                }
                _ => {}
            }
        }

        if destination.is_conjunction() && down_destination != KindClass::Conjunction {
            if let Some((anchor_id, via)) = self.concrete_anchor(source_id) {
                let duplicate = self.node(anchor_id).is_some_and(|anchor| {
                    anchor
                        .children
                        .iter()
                        .filter(|child| Some(*child) != via)
                        .any(|child| self.type_down(child) == Some(down_destination))
                });
                if duplicate {
                    return Err(EdgeRule::DuplicateBranch);
                }
            }
        }

        Ok(())
    }
}
