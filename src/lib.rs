//! # pcs-merge
//!
//! A structured three-way merge interpreter for syntax trees, built on
//! the Parent-Child-Successor (PCS) change-set model of the 3DM family of
//! tree mergers (Lindholm, "A three-way merge for XML documents", DocEng
//! 2004). Given a merged PCS change set over a BASE, LEFT and RIGHT tree,
//! plus the BASE<->LEFT and BASE<->RIGHT node matchings, the interpreter
//! reconstructs a concrete tree that incorporates both sides' edits and
//! annotates it with conflict metadata for a downstream pretty-printer.
//!
//! ## Pipeline position
//!
//! Parsing, tree matching (e.g. GumTree) and PCS extraction happen
//! upstream; pretty-printing happens downstream. This crate is the middle
//! step:
//!
//! 1. **Traversal**: the PCS relation is walked from a virtual root,
//!    following each parent's predecessor -> successor chain between
//!    list-edge sentinels to recover ordered child lists.
//! 2. **Content merging**: each node's candidate attribute values from
//!    the three revisions are reconciled per role, covering identifiers,
//!    modifier sets, operator kinds, wildcard bounds, and comment bodies
//!    (the last through a line-based three-way merge).
//! 3. **Tree building**: originals are shallow-copied and attached to
//!    their merged parent under the resolved syntactic role, honouring
//!    the slot's container kind (scalar, sequence, set, or keyed map for
//!    annotation values).
//!
//! Disagreements that cannot be auto-resolved are not errors: ordering
//! conflicts become placeholder siblings carrying a
//! [`StructuralConflict`], attribute conflicts are recorded per node and
//! substituted with `__SPORK_CONFLICT_<n>` sentinels whose expansions
//! live in a run-global dictionary, and the overall outcome reports a
//! `has_conflicts` flag.
//!
//! ## Example
//!
//! ```rust
//! use pcs_merge::{
//!     interpret, ChangeSet, Content, ElementKind, ElementStore, InterpreterOptions, Pcs,
//!     PcsNode, Revision, Role, RoleValue, TreeMatching,
//! };
//!
//! // A one-class tree, identical in all three revisions.
//! let mut store = ElementStore::new();
//! let class = store.add(ElementKind::Class, Revision::Base);
//! let node = PcsNode::Element(class);
//!
//! let mut change_set = ChangeSet::new();
//! let root = PcsNode::VirtualRoot;
//! change_set.add_pcs(Pcs::new(root, root.start_of_child_list(), node, Revision::Base));
//! change_set.add_pcs(Pcs::new(root, node, root.end_of_child_list(), Revision::Base));
//! for revision in [Revision::Base, Revision::Left, Revision::Right] {
//!     change_set.contents.insert(
//!         node,
//!         Content::new(Role::Name, RoleValue::Text("Example".into()), revision),
//!     );
//! }
//!
//! let outcome = interpret(
//!     &mut store,
//!     &change_set,
//!     &TreeMatching::new(),
//!     &TreeMatching::new(),
//!     &InterpreterOptions::default(),
//! )
//! .unwrap();
//! assert!(!outcome.has_conflicts);
//! assert_eq!(
//!     store.value_by_role(outcome.root, Role::Name),
//!     Some(&RoleValue::Text("Example".into()))
//! );
//! ```

pub mod builder;
pub mod conflict;
pub mod content;
pub mod content_merger;
pub mod error;
pub mod interpreter;
pub mod line_merge;
pub mod matching;
pub mod node;
pub mod pcs;
pub mod tree;

// Re-export the primary public API.
pub use conflict::{ConflictRegistry, ContentConflict, StructuralConflict, CONTENT_CONFLICT_PREFIX};
pub use content::{
    BinaryOperator, Content, ContentStore, Modifier, ModifierCategory, OperatorKind, Role,
    RoleValue, RoledValue, RoledValues, UnaryOperator,
};
pub use content_merger::{merged_content, MergedContent};
pub use error::{MergeError, MergeResult};
pub use interpreter::{interpret, InterpreterOptions, MergeOutcome};
pub use matching::TreeMatching;
pub use node::{ListAnchor, ListEdge, PcsNode, Revision};
pub use pcs::{ChangeSet, Pcs};
pub use tree::{ChildSlot, Element, ElementId, ElementKind, ElementStore, MetadataKey, MetadataValue};
