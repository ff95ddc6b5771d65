//! The element arena backing all three input trees and the merged tree.
//!
//! Elements are stored in a flat arena indexed by [`ElementId`]; parent and
//! child links are ids rather than owned pointers, so the PCS relation can
//! reference nodes from all three revisions without cycles. Child links are
//! grouped into role-keyed slots whose container kind (scalar, ordered
//! sequence, unordered set, keyed map) carries the syntactic semantics of
//! the slot and decides how the builder inserts merged children.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::conflict::{ContentConflict, StructuralConflict};
use crate::content::{Role, RoleValue};
use crate::node::Revision;

/// Index of an element in the arena.
pub type ElementId = usize;

/// The syntactic kind of a parsed element.
///
/// The merge core is agnostic to most kinds; the closed set here covers the
/// kinds the merge policies dispatch on (compound assignments, wildcards,
/// annotations, comments, the `var` pseudo-type workaround) plus the common
/// kinds needed to build realistic trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    CompilationUnit,
    Class,
    Interface,
    Enum,
    Method,
    Constructor,
    Field,
    Parameter,
    Block,
    Statement,
    LocalVariable,
    Invocation,
    Literal,
    BinaryOperator,
    UnaryOperator,
    /// Compound assignment such as `x += y`; its operator renders with a
    /// trailing `=`.
    OperatorAssignment,
    Comment,
    Annotation,
    TypeReference,
    ParameterReference,
    /// Generic wildcard `? extends T` / `? super T`.
    Wildcard,
    Import,
}

/// A role-keyed child container on an element.
///
/// The slot kind is part of the syntax: a method body is a single child, a
/// block holds an ordered sequence of statements, an import region is an
/// unordered set, and an annotation's values form a keyed map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChildSlot {
    Single(Option<ElementId>),
    Sequence(Vec<ElementId>),
    Set(BTreeSet<ElementId>),
    Keyed(BTreeMap<String, ElementId>),
}

impl ChildSlot {
    /// An emptied slot of the same container kind.
    pub fn emptied(&self) -> ChildSlot {
        match self {
            ChildSlot::Single(_) => ChildSlot::Single(None),
            ChildSlot::Sequence(_) => ChildSlot::Sequence(Vec::new()),
            ChildSlot::Set(_) => ChildSlot::Set(BTreeSet::new()),
            ChildSlot::Keyed(_) => ChildSlot::Keyed(BTreeMap::new()),
        }
    }

    /// The default container kind for a role, used when a merged parent has
    /// never held children under that role.
    pub fn default_for(role: Role) -> ChildSlot {
        match role {
            Role::AnnotationValue => ChildSlot::Keyed(BTreeMap::new()),
            Role::Import => ChildSlot::Set(BTreeSet::new()),
            Role::TypeMember
            | Role::Statement
            | Role::Parameter
            | Role::Argument
            | Role::Annotation
            | Role::Comment => ChildSlot::Sequence(Vec::new()),
            _ => ChildSlot::Single(None),
        }
    }

    /// Child ids in deterministic order.
    pub fn ids(&self) -> Vec<ElementId> {
        match self {
            ChildSlot::Single(id) => id.iter().copied().collect(),
            ChildSlot::Sequence(ids) => ids.clone(),
            ChildSlot::Set(ids) => ids.iter().copied().collect(),
            ChildSlot::Keyed(map) => map.values().copied().collect(),
        }
    }
}

/// Keys for the metadata annotations the merge attaches to elements.
///
/// The string forms are the contract with the downstream pretty-printer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MetadataKey {
    OriginalNode,
    SingleRevision,
    ContentConflict,
    StructuralConflict,
    LocalConflictMap,
    GlobalConflictMap,
    CommentConflict,
}

impl MetadataKey {
    pub fn as_str(self) -> &'static str {
        match self {
            MetadataKey::OriginalNode => "ORIGINAL_NODE",
            MetadataKey::SingleRevision => "SINGLE_REVISION",
            MetadataKey::ContentConflict => "CONTENT_CONFLICT",
            MetadataKey::StructuralConflict => "STRUCTURAL_CONFLICT",
            MetadataKey::LocalConflictMap => "LOCAL_CONFLICT_MAP",
            MetadataKey::GlobalConflictMap => "GLOBAL_CONFLICT_MAP",
            MetadataKey::CommentConflict => "COMMENT_CONFLICT",
        }
    }
}

/// Values stored under [`MetadataKey`]s on merged elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataValue {
    /// Back-reference from a merged element to its origin.
    Element(ElementId),
    /// The unique revision of a whole subtree.
    Revision(Revision),
    /// Unresolved attribute disagreements on this element.
    ContentConflicts(Vec<ContentConflict>),
    /// Irreconcilable sibling orderings, carried by a placeholder element.
    Structural(StructuralConflict),
    /// Per-token textual alternatives, `token -> (left, right)`.
    ConflictMap(BTreeMap<String, (String, String)>),
    /// Read-only snapshot of the run's sentinel dictionary.
    GlobalConflictMap(Arc<BTreeMap<String, (String, String)>>),
    /// Conflict-marked raw text of a failed comment merge.
    Text(String),
}

/// A parsed tree element.
#[derive(Debug, Clone)]
pub struct Element {
    kind: ElementKind,
    revision: Revision,
    attributes: Vec<(Role, RoleValue)>,
    children: BTreeMap<Role, ChildSlot>,
    parent: Option<(ElementId, Role)>,
    metadata: BTreeMap<MetadataKey, MetadataValue>,
}

impl Element {
    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    pub fn revision(&self) -> Revision {
        self.revision
    }

    pub fn attributes(&self) -> &[(Role, RoleValue)] {
        &self.attributes
    }

    pub fn child_slot(&self, role: Role) -> Option<&ChildSlot> {
        self.children.get(&role)
    }

    pub fn child_slots(&self) -> impl Iterator<Item = (Role, &ChildSlot)> {
        self.children.iter().map(|(role, slot)| (*role, slot))
    }

    /// The role this element occupies in its parent, if attached.
    pub fn role_in_parent(&self) -> Option<Role> {
        self.parent.map(|(_, role)| role)
    }

    pub fn parent(&self) -> Option<ElementId> {
        self.parent.map(|(id, _)| id)
    }

    pub fn metadata(&self, key: MetadataKey) -> Option<&MetadataValue> {
        self.metadata.get(&key)
    }

    /// All children of this element in deterministic slot order.
    pub fn child_ids(&self) -> Vec<ElementId> {
        self.children.values().flat_map(|slot| slot.ids()).collect()
    }
}

/// Arena of elements from all three input trees plus the merged tree.
#[derive(Debug, Default)]
pub struct ElementStore {
    elements: Vec<Element>,
}

impl ElementStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, kind: ElementKind, revision: Revision) -> ElementId {
        let id = self.elements.len();
        self.elements.push(Element {
            kind,
            revision,
            attributes: Vec::new(),
            children: BTreeMap::new(),
            parent: None,
            metadata: BTreeMap::new(),
        });
        id
    }

    pub fn get(&self, id: ElementId) -> &Element {
        &self.elements[id]
    }

    fn get_mut(&mut self, id: ElementId) -> &mut Element {
        &mut self.elements[id]
    }

    pub fn kind(&self, id: ElementId) -> ElementKind {
        self.get(id).kind
    }

    pub fn revision(&self, id: ElementId) -> Revision {
        self.get(id).revision
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Set or replace the attribute value under `role`.
    pub fn set_value_by_role(&mut self, id: ElementId, role: Role, value: RoleValue) {
        let element = self.get_mut(id);
        if let Some(entry) = element.attributes.iter_mut().find(|(r, _)| *r == role) {
            entry.1 = value;
        } else {
            element.attributes.push((role, value));
        }
    }

    pub fn value_by_role(&self, id: ElementId, role: Role) -> Option<&RoleValue> {
        self.get(id)
            .attributes
            .iter()
            .find(|(r, _)| *r == role)
            .map(|(_, v)| v)
    }

    /// Attach `child` as the single child under `role`.
    pub fn set_child(&mut self, parent: ElementId, role: Role, child: ElementId) {
        self.get_mut(parent)
            .children
            .insert(role, ChildSlot::Single(Some(child)));
        self.get_mut(child).parent = Some((parent, role));
    }

    /// Append `child` to the ordered sequence under `role`.
    pub fn push_child(&mut self, parent: ElementId, role: Role, child: ElementId) {
        match self
            .get_mut(parent)
            .children
            .entry(role)
            .or_insert_with(|| ChildSlot::Sequence(Vec::new()))
        {
            ChildSlot::Sequence(ids) => ids.push(child),
            slot => panic!("push_child on non-sequence slot {slot:?}"),
        }
        self.get_mut(child).parent = Some((parent, role));
    }

    /// Add `child` to the unordered set under `role`.
    pub fn add_child(&mut self, parent: ElementId, role: Role, child: ElementId) {
        match self
            .get_mut(parent)
            .children
            .entry(role)
            .or_insert_with(|| ChildSlot::Set(BTreeSet::new()))
        {
            ChildSlot::Set(ids) => {
                ids.insert(child);
            }
            slot => panic!("add_child on non-set slot {slot:?}"),
        }
        self.get_mut(child).parent = Some((parent, role));
    }

    /// Bind `child` under `key` in the keyed map under `role`.
    pub fn put_child(&mut self, parent: ElementId, role: Role, key: &str, child: ElementId) {
        match self
            .get_mut(parent)
            .children
            .entry(role)
            .or_insert_with(|| ChildSlot::Keyed(BTreeMap::new()))
        {
            ChildSlot::Keyed(map) => {
                map.insert(key.to_string(), child);
            }
            slot => panic!("put_child on non-keyed slot {slot:?}"),
        }
        self.get_mut(child).parent = Some((parent, role));
    }

    /// Replace the slot under `role` on `parent` wholesale, fixing up the
    /// parent links of the inserted children.
    pub(crate) fn replace_slot(&mut self, parent: ElementId, role: Role, slot: ChildSlot) {
        for child in slot.ids() {
            self.get_mut(child).parent = Some((parent, role));
        }
        self.get_mut(parent).children.insert(role, slot);
    }

    pub fn put_metadata(&mut self, id: ElementId, key: MetadataKey, value: MetadataValue) {
        self.get_mut(id).metadata.insert(key, value);
    }

    /// Create a shallow copy of `id`: same kind, revision and attributes,
    /// every child slot preserved but emptied, metadata reduced to an
    /// `ORIGINAL_NODE` back-reference, no parent.
    pub fn shallow_copy(&mut self, id: ElementId) -> ElementId {
        let original = self.get(id);
        let copy = Element {
            kind: original.kind,
            revision: original.revision,
            attributes: original.attributes.clone(),
            children: original
                .children
                .iter()
                .map(|(role, slot)| (*role, slot.emptied()))
                .collect(),
            parent: None,
            metadata: BTreeMap::from([(MetadataKey::OriginalNode, MetadataValue::Element(id))]),
        };
        let copy_id = self.elements.len();
        self.elements.push(copy);
        copy_id
    }
}
