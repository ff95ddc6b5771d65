//! Wrapped tree nodes for the PCS relation.
//!
//! Every element taking part in a merge is referred to through a [`PcsNode`]
//! wrapper. Wrappers have a stable identity independent of attribute
//! mutation: two wrappers are equal iff they name the same arena slot.
//! Besides real elements there are three virtual node shapes (the single
//! global root, and the start/end sentinels bracketing each parent's
//! ordered child list) so that every real node has both a predecessor and
//! a successor.

use serde::{Deserialize, Serialize};

use crate::tree::ElementId;

/// The revision a node or content candidate originates from.
///
/// Ordered `Base < Left < Right`; candidate iteration relies on this order
/// for deterministic conflict-id assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Revision {
    Base,
    Left,
    Right,
}

/// The parent a list-edge sentinel is anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListAnchor {
    /// The sentinel brackets the virtual root's child list.
    Root,
    /// The sentinel brackets the child list of a real element.
    Element(ElementId),
}

/// Which edge of a child list a sentinel marks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListEdge {
    Start,
    End,
}

/// A node as seen by the PCS relation.
///
/// `PcsNode` is `Copy`; it is an identity, not a container. Attribute data
/// lives in the element arena, content candidates in the content store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PcsNode {
    /// The single global sentinel above the tree root.
    VirtualRoot,
    /// A wrapper around a real parsed element.
    Element(ElementId),
    /// A virtual sentinel bracketing a parent's child list.
    ListEdge(ListAnchor, ListEdge),
}

impl PcsNode {
    /// The start-of-list sentinel for this node's child list.
    pub fn start_of_child_list(self) -> PcsNode {
        PcsNode::ListEdge(self.anchor(), ListEdge::Start)
    }

    /// The end-of-list sentinel for this node's child list.
    pub fn end_of_child_list(self) -> PcsNode {
        PcsNode::ListEdge(self.anchor(), ListEdge::End)
    }

    fn anchor(self) -> ListAnchor {
        match self {
            PcsNode::VirtualRoot => ListAnchor::Root,
            PcsNode::Element(id) => ListAnchor::Element(id),
            PcsNode::ListEdge(anchor, _) => anchor,
        }
    }

    /// The wrapped element, if this is a real node.
    pub fn element(self) -> Option<ElementId> {
        match self {
            PcsNode::Element(id) => Some(id),
            _ => None,
        }
    }

    pub fn is_virtual_root(self) -> bool {
        matches!(self, PcsNode::VirtualRoot)
    }

    pub fn is_start_of_list(self) -> bool {
        matches!(self, PcsNode::ListEdge(_, ListEdge::Start))
    }

    pub fn is_end_of_list(self) -> bool {
        matches!(self, PcsNode::ListEdge(_, ListEdge::End))
    }

    pub fn is_list_edge(self) -> bool {
        matches!(self, PcsNode::ListEdge(..))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinels_of_same_parent_are_equal() {
        let node = PcsNode::Element(3);
        assert_eq!(node.start_of_child_list(), node.start_of_child_list());
        assert_ne!(node.start_of_child_list(), node.end_of_child_list());
        assert_ne!(
            node.start_of_child_list(),
            PcsNode::Element(4).start_of_child_list()
        );
    }

    #[test]
    fn edge_of_edge_shares_the_anchor() {
        let start = PcsNode::VirtualRoot.start_of_child_list();
        assert_eq!(start.end_of_child_list(), PcsNode::VirtualRoot.end_of_child_list());
    }

    #[test]
    fn virtual_predicates() {
        assert!(PcsNode::VirtualRoot.is_virtual_root());
        assert!(!PcsNode::VirtualRoot.is_list_edge());

        let edge = PcsNode::Element(0).start_of_child_list();
        assert!(edge.is_start_of_list());
        assert!(edge.is_list_edge());
        assert!(!edge.is_end_of_list());
        assert!(!edge.is_virtual_root());

        assert!(!PcsNode::Element(0).is_list_edge());
        assert_eq!(PcsNode::Element(7).element(), Some(7));
        assert_eq!(PcsNode::VirtualRoot.element(), None);
    }

    #[test]
    fn revision_ordering_is_base_left_right() {
        assert!(Revision::Base < Revision::Left);
        assert!(Revision::Left < Revision::Right);
    }
}
