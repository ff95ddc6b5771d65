//! Tree matchings between revisions.
//!
//! A matching records the node correspondences an external matcher (e.g.
//! GumTree) computed between two revisions. The interpreter consumes two of
//! them, BASE<->LEFT and BASE<->RIGHT, to locate a node's base counterpart
//! during role resolution.

use std::collections::HashMap;

use crate::tree::ElementId;

/// A bidirectional node correspondence between a source revision and a
/// destination revision.
#[derive(Debug, Default)]
pub struct TreeMatching {
    src_to_dst: HashMap<ElementId, ElementId>,
    dst_to_src: HashMap<ElementId, ElementId>,
}

impl TreeMatching {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, src: ElementId, dst: ElementId) {
        self.src_to_dst.insert(src, dst);
        self.dst_to_src.insert(dst, src);
    }

    /// The source-side counterpart of a destination node.
    pub fn get_src(&self, dst: ElementId) -> Option<ElementId> {
        self.dst_to_src.get(&dst).copied()
    }

    /// The destination-side counterpart of a source node.
    pub fn get_dst(&self, src: ElementId) -> Option<ElementId> {
        self.src_to_dst.get(&src).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_is_bidirectional() {
        let mut matching = TreeMatching::new();
        matching.add(1, 4);
        assert_eq!(matching.get_dst(1), Some(4));
        assert_eq!(matching.get_src(4), Some(1));
        assert_eq!(matching.get_dst(4), None);
        assert_eq!(matching.get_src(1), None);
    }
}
