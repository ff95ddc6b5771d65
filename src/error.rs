//! Fatal failure modes of the merge interpreter.
//!
//! These all indicate bugs in the upstream change-set producer, not user
//! errors. There is no local recovery: the traversal unwinds immediately.
//! Unresolved attribute or ordering disagreements are *not* errors; they
//! are reported through metadata and the `has_conflicts` flag.

use crate::content::Role;
use crate::node::PcsNode;
use crate::pcs::Pcs;
use crate::tree::ElementId;

/// Errors aborting a merge.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MergeError {
    /// A node appears under two different parents in the merged PCS set.
    #[error("root conflict between {left:?} and {right:?}")]
    RootConflict { left: Pcs, right: Pcs },

    /// The same node became reachable from two parents while rebuilding
    /// the tree. Currently fatal; a later version should degrade this to
    /// a structural conflict.
    #[error("move conflict: {0:?} visited twice")]
    MoveConflict(PcsNode),

    /// A conflict region ran off the end of a child list without the
    /// closing predecessor conflict.
    #[error("conflict region under {root:?} reached end of list without a predecessor conflict")]
    UnterminatedConflictRegion { root: PcsNode },

    /// A role reached the content merger with a disagreement pattern that
    /// has no reconciliation policy.
    #[error("no content-conflict policy for role {role:?}")]
    UnhandledContentConflict { role: Role },

    /// The key an annotation value was bound under could not be located
    /// in its original parent.
    #[error("unable to locate annotation key for element {0}")]
    MissingAnnotationKey(ElementId),

    /// Role resolution did not reduce to exactly one role.
    #[error("role of element {element} did not resolve uniquely: {candidates:?}")]
    UnresolvedRole {
        element: ElementId,
        candidates: Vec<Role>,
    },

    /// A child list is not a chain: no triple continues from this
    /// predecessor.
    #[error("child list of {root:?} has no triple with predecessor {predecessor:?}")]
    BrokenChildList { root: PcsNode, predecessor: PcsNode },

    /// A virtual node showed up where only real elements may appear.
    #[error("virtual node {0:?} in an element position")]
    UnexpectedVirtualNode(PcsNode),

    /// The change set produced no tree root.
    #[error("change set produced no merged root")]
    MissingRoot,
}

/// Convenience alias for merge results.
pub type MergeResult<T> = std::result::Result<T, MergeError>;
