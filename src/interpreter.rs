//! Interpretation of a merged PCS structure back into a concrete tree.
//!
//! The interpreter walks the PCS relation depth-first from the virtual
//! root, following each parent's predecessor -> successor chain to
//! materialise its children in order. Every visited node is merged and
//! attached by the [`TreeBuilder`]; successor conflicts open a conflict
//! region that either auto-resolves (type-member insertions concatenate,
//! left before right) or becomes a placeholder sibling. Subtrees touched
//! by exactly one revision are marked `SINGLE_REVISION` so the printer
//! can render their original source text verbatim.

use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use crate::builder::TreeBuilder;
use crate::content::{ContentStore, Role};
use crate::error::{MergeError, MergeResult};
use crate::matching::TreeMatching;
use crate::node::{PcsNode, Revision};
use crate::pcs::{ChangeSet, Pcs};
use crate::tree::{ElementId, ElementStore};

/// Knobs for the interpreter.
#[derive(Debug, Clone)]
pub struct InterpreterOptions {
    /// Concatenate conflicting type-member insertions (left before right)
    /// instead of reporting a structural conflict. On by default; note
    /// that the concatenation makes the merge non-commutative for ordered
    /// members.
    pub resolve_type_member_insertions: bool,
}

impl Default for InterpreterOptions {
    fn default() -> Self {
        Self {
            resolve_type_member_insertions: true,
        }
    }
}

/// The result of interpreting a change set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Root element of the merged tree.
    pub root: ElementId,
    /// True iff any structural or content conflict was recorded.
    pub has_conflicts: bool,
}

/// Interpret a merged change set into a concrete tree.
///
/// `base_left` and `base_right` are the matchings between the base
/// revision and each edited revision; the builder needs them to resolve
/// the role a merged node occupies under its parent. Merged elements are
/// appended to `store`; the input trees are not mutated.
pub fn interpret(
    store: &mut ElementStore,
    change_set: &ChangeSet,
    base_left: &TreeMatching,
    base_right: &TreeMatching,
    options: &InterpreterOptions,
) -> MergeResult<MergeOutcome> {
    check_root_conflicts(&change_set.structural_conflicts)?;

    let mut interpreter = PcsInterpreter {
        root_to_children: change_set.root_to_children(),
        structural_conflicts: &change_set.structural_conflicts,
        contents: &change_set.contents,
        builder: TreeBuilder::new(store, &change_set.contents, base_left, base_right),
        has_structural_conflicts: false,
        options,
    };

    interpreter.traverse(PcsNode::VirtualRoot)?;

    let has_conflicts =
        interpreter.has_structural_conflicts || interpreter.builder.has_content_conflict();
    interpreter.builder.stamp_global_conflict_map();
    let root = interpreter
        .builder
        .actual_root()
        .ok_or(MergeError::MissingRoot)?;

    Ok(MergeOutcome {
        root,
        has_conflicts,
    })
}

/// Root conflicts (a node under two parents) are not recoverable.
fn check_root_conflicts(structural_conflicts: &HashMap<Pcs, Vec<Pcs>>) -> MergeResult<()> {
    for (pcs, others) in structural_conflicts {
        for other in others {
            if pcs.is_root_conflict(other) {
                return Err(MergeError::RootConflict {
                    left: *pcs,
                    right: *other,
                });
            }
        }
    }
    Ok(())
}

struct PcsInterpreter<'a> {
    root_to_children: HashMap<PcsNode, HashMap<PcsNode, Pcs>>,
    structural_conflicts: &'a HashMap<Pcs, Vec<Pcs>>,
    contents: &'a ContentStore,
    builder: TreeBuilder<'a>,
    has_structural_conflicts: bool,
    options: &'a InterpreterOptions,
}

impl<'a> PcsInterpreter<'a> {
    /// Visit `current`'s children in chain order, then recurse into them.
    /// Returns every revision that contributed to the subtree.
    fn traverse(&mut self, current: PcsNode) -> MergeResult<BTreeSet<Revision>> {
        let mut revisions = BTreeSet::new();
        if let Some(element) = current.element() {
            revisions.insert(self.builder.store().revision(element));
            for candidate in self.contents.candidates(current) {
                revisions.insert(candidate.revision);
            }
        }

        let Some(children) = self.root_to_children.get(&current).cloned() else {
            // Leaf node.
            return Ok(revisions);
        };

        let mut cursor = current.start_of_child_list();
        let mut sorted_children = Vec::new();
        loop {
            let pcs = *children.get(&cursor).ok_or(MergeError::BrokenChildList {
                root: current,
                predecessor: cursor,
            })?;
            revisions.insert(pcs.revision);

            let next = pcs.successor;
            if next.is_end_of_list() {
                break;
            }

            // A successor conflict marks the start of a conflict region;
            // any other conflict on this triple is ignored here.
            if let Some(partner) = self.successor_conflict(&pcs) {
                revisions.insert(Revision::Left);
                revisions.insert(Revision::Right);
                cursor = self.traverse_conflict(pcs, partner, current, &children)?;
            } else {
                self.builder.visit(current, next)?;
                sorted_children.push(next);
                cursor = next;
            }
        }

        for child in sorted_children {
            let subtree_revisions = self.traverse(child)?;
            if subtree_revisions.len() == 1 {
                if let (Some(element), Some(revision)) =
                    (child.element(), subtree_revisions.iter().next().copied())
                {
                    self.builder.annotate_single_revision(element, revision);
                }
            }
            revisions.extend(subtree_revisions);
        }

        Ok(revisions)
    }

    /// Handle a conflict region opened by `pcs` and its successor-conflict
    /// `partner`. Returns the node to continue the chain walk from: the
    /// last node of the left sequence, or the opening successor when the
    /// left sequence is empty.
    fn traverse_conflict(
        &mut self,
        pcs: Pcs,
        partner: Pcs,
        parent: PcsNode,
        children: &HashMap<PcsNode, Pcs>,
    ) -> MergeResult<PcsNode> {
        let next = pcs.successor;

        let (left_pcs, right_pcs) = if pcs.revision == Revision::Left {
            (pcs, partner)
        } else {
            (partner, pcs)
        };

        let left_nodes = self.extract_conflict_list(left_pcs, children)?;
        let right_nodes = self.extract_conflict_list(right_pcs, children)?;

        if let Some(resolved) = self.try_resolve(&left_nodes, &right_nodes) {
            debug!(
                left = left_nodes.len(),
                right = right_nodes.len(),
                "concatenating conflicting type-member insertions"
            );
            for node in resolved {
                self.builder.visit(parent, node)?;
                self.traverse(node)?;
            }
        } else {
            debug!(
                left = left_nodes.len(),
                right = right_nodes.len(),
                "structural conflict"
            );
            self.has_structural_conflicts = true;
            self.builder
                .visit_conflicting(parent, &left_nodes, &right_nodes)?;
        }

        Ok(left_nodes.last().copied().unwrap_or(next))
    }

    /// Scan ahead from `pcs` collecting the conflict sequence of its side.
    /// The region must close with a predecessor conflict (the point where
    /// both sides agree on a successor again); running off the end of the
    /// child list means the change set is inconsistent.
    fn extract_conflict_list(
        &self,
        pcs: Pcs,
        siblings: &HashMap<PcsNode, Pcs>,
    ) -> MergeResult<Vec<PcsNode>> {
        let mut nodes = Vec::new();
        let mut pcs = pcs;

        loop {
            if let Some(conflicts) = self.structural_conflicts.get(&pcs) {
                if conflicts.iter().any(|other| pcs.is_predecessor_conflict(other)) {
                    return Ok(nodes);
                }
            }

            let next = pcs.successor;
            if next.is_end_of_list() {
                return Err(MergeError::UnterminatedConflictRegion { root: pcs.root });
            }

            nodes.push(next);
            pcs = *siblings.get(&next).ok_or(MergeError::BrokenChildList {
                root: pcs.root,
                predecessor: next,
            })?;
        }
    }

    /// Auto-resolve a structural conflict when every node on both sides is
    /// a type member: insertions of members concatenate, left before
    /// right.
    fn try_resolve(&self, left: &[PcsNode], right: &[PcsNode]) -> Option<Vec<PcsNode>> {
        if !self.options.resolve_type_member_insertions {
            return None;
        }
        if left.is_empty() && right.is_empty() {
            return None;
        }

        let store = self.builder.store();
        for node in left.iter().chain(right) {
            let element = node.element()?;
            if store.get(element).role_in_parent() != Some(Role::TypeMember) {
                return None;
            }
        }

        Some(left.iter().chain(right).copied().collect())
    }

    fn successor_conflict(&self, pcs: &Pcs) -> Option<Pcs> {
        self.structural_conflicts
            .get(pcs)?
            .iter()
            .find(|other| pcs.is_successor_conflict(other))
            .copied()
    }
}
