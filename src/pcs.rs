//! The Parent-Child-Successor relation and the merged change set.
//!
//! A PCS triple `(root, predecessor, successor)` states that under `root`,
//! `predecessor` is immediately followed by `successor`. A parent's child
//! list is recovered by following `predecessor -> successor` links from the
//! start-of-list sentinel to the end-of-list sentinel. Where the merged
//! revisions disagree, multiple triples share a predecessor or successor
//! and the disagreeing pairs are recorded in the structural-conflict
//! relation.

use std::collections::HashMap;

use crate::content::ContentStore;
use crate::node::{PcsNode, Revision};

/// A parent-child-successor triple, tagged with the revision it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pcs {
    pub root: PcsNode,
    pub predecessor: PcsNode,
    pub successor: PcsNode,
    pub revision: Revision,
}

impl Pcs {
    pub fn new(root: PcsNode, predecessor: PcsNode, successor: PcsNode, revision: Revision) -> Self {
        Self {
            root,
            predecessor,
            successor,
            revision,
        }
    }

    /// Same root and successor, different predecessors: the sides disagree
    /// on what comes before `successor`. A predecessor conflict closes a
    /// conflict region because both sides agree again from the shared
    /// successor onward.
    pub fn is_predecessor_conflict(&self, other: &Pcs) -> bool {
        self.root == other.root
            && self.successor == other.successor
            && self.predecessor != other.predecessor
    }

    /// Same root and predecessor, different successors: the sides disagree
    /// on what follows `predecessor`. A successor conflict opens a
    /// conflict region.
    pub fn is_successor_conflict(&self, other: &Pcs) -> bool {
        self.root == other.root
            && self.predecessor == other.predecessor
            && self.successor != other.successor
    }

    /// Different roots sharing a predecessor or successor: a node appears
    /// under two parents. Not recoverable.
    pub fn is_root_conflict(&self, other: &Pcs) -> bool {
        self.root != other.root
            && (self.predecessor == other.predecessor || self.successor == other.successor)
    }
}

/// The merged PCS structure consumed by the interpreter: the triple set,
/// the per-node content candidates, and the conflicting-triple relation.
#[derive(Debug, Default)]
pub struct ChangeSet {
    pub pcs_set: Vec<Pcs>,
    pub contents: ContentStore,
    pub structural_conflicts: HashMap<Pcs, Vec<Pcs>>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_pcs(&mut self, pcs: Pcs) {
        self.pcs_set.push(pcs);
    }

    /// Record that `a` and `b` conflict, in both directions.
    pub fn add_structural_conflict(&mut self, a: Pcs, b: Pcs) {
        self.structural_conflicts.entry(a).or_default().push(b);
        self.structural_conflicts.entry(b).or_default().push(a);
    }

    /// Group triples by root, keyed by predecessor, so each parent's child
    /// list can be walked from its start sentinel. Later triples win when
    /// two share a predecessor (the conflict relation records the loser).
    pub fn root_to_children(&self) -> HashMap<PcsNode, HashMap<PcsNode, Pcs>> {
        let mut map: HashMap<PcsNode, HashMap<PcsNode, Pcs>> = HashMap::new();
        for pcs in &self.pcs_set {
            map.entry(pcs.root)
                .or_default()
                .insert(pcs.predecessor, *pcs);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triple(root: usize, pred: usize, succ: usize, revision: Revision) -> Pcs {
        Pcs::new(
            PcsNode::Element(root),
            PcsNode::Element(pred),
            PcsNode::Element(succ),
            revision,
        )
    }

    #[test]
    fn successor_conflict_shares_root_and_predecessor() {
        let a = triple(0, 1, 2, Revision::Left);
        let b = triple(0, 1, 3, Revision::Right);
        assert!(a.is_successor_conflict(&b));
        assert!(!a.is_predecessor_conflict(&b));
        assert!(!a.is_root_conflict(&b));
    }

    #[test]
    fn predecessor_conflict_shares_root_and_successor() {
        let a = triple(0, 1, 3, Revision::Left);
        let b = triple(0, 2, 3, Revision::Right);
        assert!(a.is_predecessor_conflict(&b));
        assert!(!a.is_successor_conflict(&b));
    }

    #[test]
    fn root_conflict_crosses_parents() {
        let a = triple(0, 1, 2, Revision::Left);
        let b = triple(5, 1, 2, Revision::Right);
        assert!(a.is_root_conflict(&b));
        let c = triple(5, 7, 8, Revision::Right);
        assert!(!a.is_root_conflict(&c));
    }

    #[test]
    fn root_to_children_indexes_by_predecessor() {
        let mut change_set = ChangeSet::new();
        let root = PcsNode::Element(0);
        let start = root.start_of_child_list();
        let end = root.end_of_child_list();
        let child = PcsNode::Element(1);
        change_set.add_pcs(Pcs::new(root, start, child, Revision::Base));
        change_set.add_pcs(Pcs::new(root, child, end, Revision::Base));

        let map = change_set.root_to_children();
        let children = &map[&root];
        assert_eq!(children[&start].successor, child);
        assert_eq!(children[&child].successor, end);
    }
}
