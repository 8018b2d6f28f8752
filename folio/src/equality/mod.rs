//! Deep structural comparison of element subtrees, possibly across two
//! documents.
//!
//! Children are compared position by position. Fields, persons and groups
//! only need a value-equal counterpart, asset references a counterpart with
//! the same location and locator. Edges are compared by their far endpoint,
//! which may lead back into a pair already being compared. A pair under
//! comparison is assumed equal when met again, and the assumption is kept
//! for the rest of the run unless the pair turns out unequal. Every pair is
//! therefore compared a bounded number of times.

use crate::asset::AssetRef;
use crate::document::{Document, Edge, EdgeId, ElementNode, NodeId};
use crate::error::Result;
use std::collections::HashSet;

type Pair = (NodeId, NodeId);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Outbound,
    Inbound,
}

/// One comparison run between a node of `left` and a node of `right`.
pub struct NodeComparator<'a> {
    left: &'a Document,
    right: &'a Document,
    assumed: HashSet<Pair>,
    /// Pairs of `assumed` in insertion order, for rolling back.
    trail: Vec<Pair>,
    known_unequal: HashSet<Pair>,
}

impl<'a> NodeComparator<'a> {
    pub fn new(left: &'a Document, right: &'a Document) -> Self {
        NodeComparator {
            left,
            right,
            assumed: HashSet::new(),
            trail: Vec::new(),
            known_unequal: HashSet::new(),
        }
    }

    pub fn equal(&mut self, a: NodeId, b: NodeId) -> Result<bool> {
        if self.known_unequal.contains(&(a, b)) {
            return Ok(false);
        }
        if self.assumed.contains(&(a, b)) {
            log::debug!("Pair {a} / {b} already assumed equal");
            return Ok(true);
        }

        let mark = self.trail.len();
        self.assumed.insert((a, b));
        self.trail.push((a, b));

        let result = self.compare(a, b)?;
        if !result {
            // pairs assumed since `mark` may rest on this one
            for pair in self.trail.drain(mark..) {
                self.assumed.remove(&pair);
            }
            self.known_unequal.insert((a, b));
        }
        Ok(result)
    }

    fn compare(&mut self, a: NodeId, b: NodeId) -> Result<bool> {
        let (left_doc, right_doc) = (self.left, self.right);
        let left = left_doc.node(a)?;
        let right = right_doc.node(b)?;

        if let Some(reason) = shallow_mismatch(left, right) {
            log::debug!("Nodes {a} and {b} differ: {reason}");
            return Ok(false);
        }
        if !assets_match(left_doc, left.asset_refs(), right_doc, right.asset_refs()) {
            log::debug!("Nodes {a} and {b} differ in asset references");
            return Ok(false);
        }

        for (&ca, &cb) in left.children().iter().zip(right.children()) {
            if !self.equal(ca, cb)? {
                log::debug!("Nodes {a} and {b} differ in children");
                return Ok(false);
            }
        }

        if !self.edges_match(left.outbound(), right.outbound(), Direction::Outbound)? {
            log::debug!("Nodes {a} and {b} differ in outbound edges");
            return Ok(false);
        }
        if !self.edges_match(left.inbound(), right.inbound(), Direction::Inbound)? {
            log::debug!("Nodes {a} and {b} differ in inbound edges");
            return Ok(false);
        }
        Ok(true)
    }

    fn edges_match(
        &mut self,
        left: &[EdgeId],
        right: &[EdgeId],
        direction: Direction,
    ) -> Result<bool> {
        let (left_doc, right_doc) = (self.left, self.right);
        let right_edges: Vec<&Edge> = right.iter().filter_map(|&e| right_doc.edge(e)).collect();
        for edge in left.iter().filter_map(|&e| left_doc.edge(e)) {
            let mut found = false;
            for candidate in right_edges.iter().filter(|c| c.kind == edge.kind) {
                let (a, b) = match direction {
                    Direction::Outbound => (edge.target, candidate.target),
                    Direction::Inbound => (edge.source, candidate.source),
                };
                if self.equal(a, b)? {
                    found = true;
                    break;
                }
            }
            if !found {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Asset references match when counts agree and each left reference has a
/// right one with the same asset location and locator.
fn assets_match(
    left_doc: &Document,
    left: &[AssetRef],
    right_doc: &Document,
    right: &[AssetRef],
) -> bool {
    if left.len() != right.len() {
        return false;
    }
    fn location<'d>(doc: &'d Document, r: &AssetRef) -> Option<&'d str> {
        doc.assets().get(r.asset).map(|asset| asset.location.as_str())
    }
    left.iter().all(|l| {
        let wanted = location(left_doc, l);
        right
            .iter()
            .any(|r| r.locator == l.locator && location(right_doc, r) == wanted)
    })
}

/// First attribute-level difference between two nodes, if any.
fn shallow_mismatch(left: &ElementNode, right: &ElementNode) -> Option<&'static str> {
    if left.is_logical() != right.is_logical() || left.is_physical() != right.is_physical() {
        return Some("tree flags");
    }
    if left.anchor_pointer() != right.anchor_pointer() {
        return Some("anchor pointer");
    }
    if left.type_name() != right.type_name() {
        return Some("element type");
    }
    if left.fields().len() != right.fields().len() {
        return Some("number of fields");
    }
    if left.groups().len() != right.groups().len() {
        return Some("number of field groups");
    }
    if left.children().len() != right.children().len() {
        return Some("number of children");
    }
    if left.persons().len() != right.persons().len() {
        return Some("number of persons");
    }
    if left.outbound().len() != right.outbound().len() {
        return Some("number of outbound edges");
    }
    if left.inbound().len() != right.inbound().len() {
        return Some("number of inbound edges");
    }
    if !left.fields().iter().all(|f| right.fields().contains(f)) {
        return Some("field values");
    }
    if !left.persons().iter().all(|p| right.persons().contains(p)) {
        return Some("persons");
    }
    if !left.groups().iter().all(|g| right.groups().contains(g)) {
        return Some("field groups");
    }
    None
}

impl Document {
    /// Whether the subtree at `a` equals the subtree at `b` of `other`.
    pub fn structurally_equal(&self, a: NodeId, other: &Document, b: NodeId) -> Result<bool> {
        NodeComparator::new(self, other).equal(a, b)
    }

    /// Whether both documents have equal logical and physical trees.
    pub fn documents_equal(&self, other: &Document) -> Result<bool> {
        let mut comparator = NodeComparator::new(self, other);
        for (a, b) in [
            (self.logical_root(), other.logical_root()),
            (self.physical_root(), other.physical_root()),
        ] {
            match (a, b) {
                (None, None) => {}
                (Some(a), Some(b)) => {
                    if !comparator.equal(a, b)? {
                        return Ok(false);
                    }
                }
                _ => return Ok(false),
            }
        }
        Ok(true)
    }
}
