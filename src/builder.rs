//! Rebuilds a concrete tree from the traversal order, one node at a time.
//!
//! For every node the interpreter visits, the builder merges its content
//! candidates, shallow-copies the original element, applies the merged
//! attributes, resolves the syntactic role the copy occupies under its
//! merged parent, and inserts it with the container semantics of that
//! slot. Structural conflicts are materialised as a placeholder sibling
//! carrying the two irreconcilable sequences as metadata.

use std::collections::HashMap;

use tracing::trace;

use crate::conflict::{ConflictRegistry, StructuralConflict};
use crate::content::{ContentStore, Role};
use crate::content_merger;
use crate::error::{MergeError, MergeResult};
use crate::matching::TreeMatching;
use crate::node::{PcsNode, Revision};
use crate::tree::{ChildSlot, ElementId, ElementKind, ElementStore, MetadataKey, MetadataValue};

/// Builds the merged tree while the interpreter walks the PCS relation.
pub struct TreeBuilder<'a> {
    store: &'a mut ElementStore,
    contents: &'a ContentStore,
    base_left: &'a TreeMatching,
    base_right: &'a TreeMatching,
    registry: ConflictRegistry,
    /// Original element -> its copy in the merged tree.
    nodes: HashMap<ElementId, ElementId>,
    /// Every merged element, in creation order.
    created: Vec<ElementId>,
    actual_root: Option<ElementId>,
    has_content_conflict: bool,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(
        store: &'a mut ElementStore,
        contents: &'a ContentStore,
        base_left: &'a TreeMatching,
        base_right: &'a TreeMatching,
    ) -> Self {
        Self {
            store,
            contents,
            base_left,
            base_right,
            registry: ConflictRegistry::new(),
            nodes: HashMap::new(),
            created: Vec::new(),
            actual_root: None,
            has_content_conflict: false,
        }
    }

    /// Merge `orig` and attach its copy under the merged counterpart of
    /// `parent`. Both arguments are nodes of the *input* trees.
    pub fn visit(&mut self, parent: PcsNode, orig: PcsNode) -> MergeResult<()> {
        let orig_el = orig
            .element()
            .ok_or(MergeError::UnexpectedVirtualNode(orig))?;
        if self.nodes.contains_key(&orig_el) {
            return Err(MergeError::MoveConflict(orig));
        }
        trace!(element = orig_el, "visit");

        let merge_parent = self.merged_parent(parent)?;

        let kind = self.store.kind(orig_el);
        let merged = content_merger::merged_content(
            &mut self.registry,
            kind,
            self.contents.candidates(orig),
        )?;

        let copy = self.store.shallow_copy(orig_el);
        self.created.push(copy);
        for roled in &merged.values {
            self.store.set_value_by_role(copy, roled.role, roled.value.clone());
        }

        if !merged.conflicts.is_empty() {
            self.store.put_metadata(
                copy,
                MetadataKey::ContentConflict,
                MetadataValue::ContentConflicts(merged.conflicts),
            );
            self.has_content_conflict = true;
        }
        if !merged.local_map.is_empty() {
            self.store.put_metadata(
                copy,
                MetadataKey::LocalConflictMap,
                MetadataValue::ConflictMap(merged.local_map),
            );
        }
        if let Some(text) = merged.comment_conflict {
            self.store
                .put_metadata(copy, MetadataKey::CommentConflict, MetadataValue::Text(text));
        }

        match merge_parent {
            Some(parent_copy) => {
                let role = self.resolve_role(orig_el)?;
                if self.is_var_parameter_type(copy, parent_copy, role) {
                    // The upstream parser leaves the type of a `var`
                    // parameter reference unset; keep it that way.
                } else {
                    self.insert_into(parent_copy, role, copy, orig_el)?;
                }
            }
            None => self.actual_root = Some(copy),
        }

        self.nodes.insert(orig_el, copy);
        Ok(())
    }

    /// Materialise an unresolved ordering conflict as a placeholder
    /// sibling under `parent`. The children of the conflicting nodes are
    /// not visited.
    pub fn visit_conflicting(
        &mut self,
        parent: PcsNode,
        left: &[PcsNode],
        right: &[PcsNode],
    ) -> MergeResult<()> {
        let Some(placeholder) = left.first().or_else(|| right.first()).copied() else {
            return Ok(());
        };
        let placeholder_el = placeholder
            .element()
            .ok_or(MergeError::UnexpectedVirtualNode(placeholder))?;
        let parent_copy = self
            .merged_parent(parent)?
            .ok_or(MergeError::UnexpectedVirtualNode(parent))?;

        let copy = self.store.shallow_copy(placeholder_el);
        self.created.push(copy);
        self.store.put_metadata(
            copy,
            MetadataKey::StructuralConflict,
            MetadataValue::Structural(StructuralConflict {
                left: left.iter().filter_map(|n| n.element()).collect(),
                right: right.iter().filter_map(|n| n.element()).collect(),
            }),
        );

        let role = self.resolve_role(placeholder_el)?;
        self.insert_into(parent_copy, role, copy, placeholder_el)
    }

    fn merged_parent(&self, parent: PcsNode) -> MergeResult<Option<ElementId>> {
        if parent.is_list_edge() {
            return Err(MergeError::UnexpectedVirtualNode(parent));
        }
        match parent.element() {
            Some(id) => {
                let copy = self
                    .nodes
                    .get(&id)
                    .copied()
                    .expect("parent is visited before its children");
                Ok(Some(copy))
            }
            // The virtual root has no merged counterpart.
            None => Ok(None),
        }
    }

    /// Resolve the role a merged node occupies under its merged parent.
    ///
    /// A node has at most two candidate roles: its own, plus the role of
    /// its counterpart on the one side that edited it (a three-way role
    /// disagreement would already have been a structural conflict).
    /// Discarding the base role from the candidates leaves the edited
    /// role when one exists, and the base role otherwise.
    fn resolve_role(&self, orig: ElementId) -> MergeResult<Role> {
        let mut candidates: Vec<Role> = Vec::new();
        if let Some(role) = self.store.get(orig).role_in_parent() {
            candidates.push(role);
        }

        let base = match self.store.revision(orig) {
            Revision::Base => {
                for matched in [self.base_left.get_dst(orig), self.base_right.get_dst(orig)]
                    .into_iter()
                    .flatten()
                {
                    if let Some(role) = self.store.get(matched).role_in_parent() {
                        candidates.push(role);
                    }
                }
                Some(orig)
            }
            Revision::Left => self.matched_base(self.base_left, orig, &mut candidates),
            Revision::Right => self.matched_base(self.base_right, orig, &mut candidates),
        };

        if let Some(base_el) = base {
            if let Some(base_role) = self.store.get(base_el).role_in_parent() {
                candidates.retain(|role| *role != base_role);
                if candidates.is_empty() {
                    return Ok(base_role);
                }
            }
        }

        match candidates.as_slice() {
            [role] => Ok(*role),
            [first, rest @ ..] if rest.iter().all(|r| r == first) => Ok(*first),
            _ => Err(MergeError::UnresolvedRole {
                element: orig,
                candidates,
            }),
        }
    }

    fn matched_base(
        &self,
        matching: &TreeMatching,
        orig: ElementId,
        candidates: &mut Vec<Role>,
    ) -> Option<ElementId> {
        let matched = matching.get_src(orig)?;
        if let Some(role) = self.store.get(matched).role_in_parent() {
            candidates.push(role);
        }
        Some(matched)
    }

    /// Insert `copy` under `parent` at `role`, honouring the slot's
    /// container kind. Keyed slots (annotation values) are re-keyed by
    /// looking up the binding of `orig` in its original parent.
    fn insert_into(
        &mut self,
        parent: ElementId,
        role: Role,
        copy: ElementId,
        orig: ElementId,
    ) -> MergeResult<()> {
        let mut slot = self
            .store
            .get(parent)
            .child_slot(role)
            .cloned()
            .unwrap_or_else(|| ChildSlot::default_for(role));

        match &mut slot {
            ChildSlot::Single(current) => *current = Some(copy),
            ChildSlot::Sequence(ids) => ids.push(copy),
            ChildSlot::Set(ids) => {
                ids.insert(copy);
            }
            ChildSlot::Keyed(map) => {
                let key = self.annotation_key(orig)?;
                map.insert(key, copy);
            }
        }

        self.store.replace_slot(parent, role, slot);
        Ok(())
    }

    /// The key `orig` was bound under in its original annotation parent.
    fn annotation_key(&self, orig: ElementId) -> MergeResult<String> {
        let element = self.store.get(orig);
        if let (Some(parent), Some(role)) = (element.parent(), element.role_in_parent()) {
            if let Some(ChildSlot::Keyed(map)) = self.store.get(parent).child_slot(role) {
                if let Some((key, _)) = map.iter().find(|(_, bound)| **bound == orig) {
                    return Ok(key.clone());
                }
            }
        }
        Err(MergeError::MissingAnnotationKey(orig))
    }

    /// Parameter references carry a `var` pseudo-type that must stay
    /// unset; attaching it breaks the upstream parser's representation.
    fn is_var_parameter_type(&self, copy: ElementId, parent: ElementId, role: Role) -> bool {
        role == Role::Type
            && self.store.kind(copy) == ElementKind::TypeReference
            && self.store.kind(parent) == ElementKind::ParameterReference
            && self
                .store
                .value_by_role(copy, Role::Name)
                .and_then(|value| value.as_text())
                == Some("var")
    }

    /// The merged counterpart of an original element, once visited.
    pub fn merged(&self, orig: ElementId) -> Option<ElementId> {
        self.nodes.get(&orig).copied()
    }

    pub fn store(&self) -> &ElementStore {
        &*self.store
    }

    pub fn actual_root(&self) -> Option<ElementId> {
        self.actual_root
    }

    pub fn has_content_conflict(&self) -> bool {
        self.has_content_conflict
    }

    /// Mark a merged subtree as coming wholly from one revision.
    pub fn annotate_single_revision(&mut self, orig: ElementId, revision: Revision) {
        if let Some(copy) = self.merged(orig) {
            self.store
                .put_metadata(copy, MetadataKey::SingleRevision, MetadataValue::Revision(revision));
        }
    }

    /// Stamp the finished sentinel dictionary onto every merged element.
    pub fn stamp_global_conflict_map(&mut self) {
        let snapshot = self.registry.snapshot();
        for copy in &self.created {
            self.store.put_metadata(
                *copy,
                MetadataKey::GlobalConflictMap,
                MetadataValue::GlobalConflictMap(snapshot.clone()),
            );
        }
    }
}
