//! Three-way reconciliation of a single node's attribute candidates.
//!
//! Candidates are partitioned by role and each role is merged with the
//! standard three-way rule: a lone contributor wins, agreement wins, and
//! an edit against an unchanged base wins. When both sides edited the same
//! attribute differently, a role-specific policy decides the merged value
//! and what gets reported: a sentinel plus the global dictionary for
//! names and values, a line-based merge for comment bodies, categorised
//! set union for modifiers, and per-token textual alternatives for
//! operators and wildcard bounds.

use std::collections::BTreeMap;

use tracing::debug;

use crate::conflict::{ConflictRegistry, ContentConflict};
use crate::content::{Content, Modifier, Role, RoleValue, RoledValue, RoledValues};
use crate::error::{MergeError, MergeResult};
use crate::line_merge;
use crate::node::Revision;
use crate::tree::ElementKind;

/// The outcome of reconciling one node's candidates.
#[derive(Debug, Default)]
pub struct MergedContent {
    /// The reconciled attribute set, applied to the merged clone.
    pub values: RoledValues,
    /// Disagreements that survived reconciliation.
    pub conflicts: Vec<ContentConflict>,
    /// Per-token textual alternatives, `token -> (left, right)`.
    pub local_map: BTreeMap<String, (String, String)>,
    /// Conflict-marked raw text of a failed comment merge.
    pub comment_conflict: Option<String>,
}

/// Reconcile the candidate attribute values of a single node.
///
/// `kind` is the syntactic kind of the node the candidates belong to; the
/// operator policy consults it to render compound-assignment symbols.
pub fn merged_content(
    registry: &mut ConflictRegistry,
    kind: ElementKind,
    candidates: &[Content],
) -> MergeResult<MergedContent> {
    let mut merged = MergedContent::default();

    for (base, left, right) in group_by_role(candidates) {
        match (left, right) {
            (Some(l), Some(r)) if l.value == r.value => take(&mut merged, l),
            (Some(l), Some(r)) => {
                let base_value = base.map(|b| &b.value);
                if base_value == Some(&l.value) {
                    take(&mut merged, r);
                } else if base_value == Some(&r.value) {
                    take(&mut merged, l);
                } else {
                    reconcile_conflict(registry, kind, &mut merged, base, l, r)?;
                }
            }
            (Some(l), None) => take(&mut merged, l),
            (None, Some(r)) => take(&mut merged, r),
            (None, None) => {
                if let Some(b) = base {
                    take(&mut merged, b);
                }
            }
        }
    }

    Ok(merged)
}

fn take(merged: &mut MergedContent, content: &Content) {
    merged.values.push(RoledValue {
        role: content.role,
        value: content.value.clone(),
    });
}

/// Partition candidates by role, in first-appearance role order, selecting
/// at most one candidate per revision within each role. Revision order is
/// normalised to `(Base, Left, Right)` so conflict-id assignment does not
/// depend on producer insertion order.
fn group_by_role(candidates: &[Content]) -> Vec<(Option<&Content>, Option<&Content>, Option<&Content>)> {
    let mut roles: Vec<Role> = Vec::new();
    for content in candidates {
        if !roles.contains(&content.role) {
            roles.push(content.role);
        }
    }

    roles
        .into_iter()
        .map(|role| {
            let pick = |revision: Revision| {
                candidates
                    .iter()
                    .find(|c| c.role == role && c.revision == revision)
            };
            (pick(Revision::Base), pick(Revision::Left), pick(Revision::Right))
        })
        .collect()
}

/// Both sides differ from base and from each other: apply the role policy.
fn reconcile_conflict(
    registry: &mut ConflictRegistry,
    kind: ElementKind,
    merged: &mut MergedContent,
    base: Option<&Content>,
    left: &Content,
    right: &Content,
) -> MergeResult<()> {
    let role = left.role;
    debug!(?role, "content conflict");

    match role {
        Role::Name | Role::Value => {
            let (Some(l), Some(r)) = (left.value.as_text(), right.value.as_text()) else {
                return Err(MergeError::UnhandledContentConflict { role });
            };
            let sentinel = registry.register(l, r);
            merged.values.push(RoledValue {
                role,
                value: RoleValue::Text(sentinel),
            });
            record(merged, role, base, left, right);
        }
        Role::CommentContent => {
            let raw_base = base.map(raw_text).unwrap_or_default();
            let (text, conflicts) =
                line_merge::merge(&raw_base, &raw_text(left), &raw_text(right));
            if conflicts == 0 {
                merged.values.push(RoledValue {
                    role,
                    value: RoleValue::Text(text),
                });
            } else {
                merged.values.push(RoledValue {
                    role,
                    value: left.value.clone(),
                });
                merged.comment_conflict = Some(text);
                record(merged, role, base, left, right);
            }
        }
        Role::Modifier => {
            let (Some(l), Some(r)) = (left.value.as_modifiers(), right.value.as_modifiers())
            else {
                return Err(MergeError::UnhandledContentConflict { role });
            };

            // Non-visibility modifiers reconcile by union; visibility is
            // a scalar and follows the left side.
            let mut union: std::collections::BTreeSet<Modifier> = l
                .iter()
                .chain(r.iter())
                .filter(|m| !m.is_visibility())
                .copied()
                .collect();
            let left_vis = l.iter().copied().find(|m| m.is_visibility());
            let right_vis = r.iter().copied().find(|m| m.is_visibility());

            match (left_vis, right_vis) {
                (Some(lv), Some(rv)) if lv == rv => {
                    union.insert(lv);
                }
                (None, None) => {}
                (Some(lv), rv) => {
                    union.insert(lv);
                    let alternative = rv.map(Modifier::as_str).unwrap_or("");
                    merged.local_map.insert(
                        lv.as_str().to_string(),
                        (lv.as_str().to_string(), alternative.to_string()),
                    );
                    record(merged, role, base, left, right);
                }
                (None, Some(rv)) => {
                    // No left visibility to anchor the alternative on, so
                    // adopt the right one and mark it against the empty
                    // string.
                    union.insert(rv);
                    merged.local_map.insert(
                        rv.as_str().to_string(),
                        (String::new(), rv.as_str().to_string()),
                    );
                    record(merged, role, base, left, right);
                }
            }

            merged.values.push(RoledValue {
                role,
                value: RoleValue::Modifiers(union),
            });
        }
        Role::OperatorKind => {
            let (Some(l), Some(r)) = (left.value.as_operator(), right.value.as_operator())
            else {
                return Err(MergeError::UnhandledContentConflict { role });
            };
            debug_assert!(l.same_category(r), "operator category mismatch");

            let mut left_symbol = l.symbol().to_string();
            let mut right_symbol = r.symbol().to_string();
            if kind == ElementKind::OperatorAssignment {
                left_symbol.push('=');
                right_symbol.push('=');
            }
            merged
                .local_map
                .insert(left_symbol.clone(), (left_symbol, right_symbol));
            merged.values.push(RoledValue {
                role,
                value: left.value.clone(),
            });
            record(merged, role, base, left, right);
        }
        Role::IsUpper => {
            let Some(upper) = left.value.as_bool() else {
                return Err(MergeError::UnhandledContentConflict { role });
            };
            let (shown, alternative) = if upper {
                ("extends", "super")
            } else {
                ("super", "extends")
            };
            merged
                .local_map
                .insert(shown.to_string(), (shown.to_string(), alternative.to_string()));
            merged.values.push(RoledValue {
                role,
                value: left.value.clone(),
            });
            record(merged, role, base, left, right);
        }
        _ => return Err(MergeError::UnhandledContentConflict { role }),
    }

    Ok(())
}

fn raw_text(content: &Content) -> String {
    content
        .raw
        .clone()
        .or_else(|| content.value.as_text().map(str::to_string))
        .unwrap_or_default()
}

fn record(
    merged: &mut MergedContent,
    role: Role,
    base: Option<&Content>,
    left: &Content,
    right: &Content,
) {
    merged.conflicts.push(ContentConflict {
        role,
        base: base.cloned(),
        left: left.clone(),
        right: right.clone(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{BinaryOperator, OperatorKind};
    use std::collections::BTreeSet;

    fn text(role: Role, value: &str, revision: Revision) -> Content {
        Content::new(role, RoleValue::Text(value.into()), revision)
    }

    fn mods(values: &[Modifier], revision: Revision) -> Content {
        Content::new(
            Role::Modifier,
            RoleValue::Modifiers(values.iter().copied().collect()),
            revision,
        )
    }

    fn merge(candidates: &[Content]) -> (MergedContent, ConflictRegistry) {
        let mut registry = ConflictRegistry::new();
        let merged =
            merged_content(&mut registry, ElementKind::Field, candidates).expect("policy");
        (merged, registry)
    }

    #[test]
    fn lone_revision_wins() {
        let (merged, _) = merge(&[text(Role::Name, "x", Revision::Left)]);
        assert_eq!(merged.values[0].value, RoleValue::Text("x".into()));
        assert!(merged.conflicts.is_empty());
    }

    #[test]
    fn edit_against_unchanged_base_wins() {
        let (merged, _) = merge(&[
            text(Role::Name, "foo", Revision::Base),
            text(Role::Name, "foo", Revision::Left),
            text(Role::Name, "bar", Revision::Right),
        ]);
        assert_eq!(merged.values[0].value, RoleValue::Text("bar".into()));
        assert!(merged.conflicts.is_empty());
    }

    #[test]
    fn identical_edits_win() {
        let (merged, _) = merge(&[
            text(Role::Name, "foo", Revision::Base),
            text(Role::Name, "bar", Revision::Left),
            text(Role::Name, "bar", Revision::Right),
        ]);
        assert_eq!(merged.values[0].value, RoleValue::Text("bar".into()));
        assert!(merged.conflicts.is_empty());
    }

    #[test]
    fn rename_conflict_allocates_sentinel() {
        let (merged, registry) = merge(&[
            text(Role::Name, "foo", Revision::Base),
            text(Role::Name, "bar", Revision::Left),
            text(Role::Name, "baz", Revision::Right),
        ]);
        assert_eq!(
            merged.values[0].value,
            RoleValue::Text("__SPORK_CONFLICT_0".into())
        );
        assert_eq!(merged.conflicts.len(), 1);
        assert_eq!(
            registry.get("__SPORK_CONFLICT_0"),
            Some(&("bar".to_string(), "baz".to_string()))
        );
    }

    #[test]
    fn modifier_union_without_visibility_is_clean() {
        let (merged, _) = merge(&[
            mods(&[Modifier::Final], Revision::Base),
            mods(&[Modifier::Final, Modifier::Static], Revision::Left),
            mods(&[Modifier::Final, Modifier::Synchronized], Revision::Right),
        ]);
        let expected: BTreeSet<Modifier> =
            [Modifier::Final, Modifier::Static, Modifier::Synchronized]
                .into_iter()
                .collect();
        assert_eq!(merged.values[0].value, RoleValue::Modifiers(expected));
        assert!(merged.conflicts.is_empty());
        assert!(merged.local_map.is_empty());
    }

    #[test]
    fn visibility_conflict_prefers_left_and_maps_alternative() {
        let (merged, _) = merge(&[
            mods(&[Modifier::Public], Revision::Base),
            mods(&[Modifier::Private], Revision::Left),
            mods(&[Modifier::Protected], Revision::Right),
        ]);
        let set = merged.values[0].value.as_modifiers().unwrap();
        assert!(set.contains(&Modifier::Private));
        assert!(!set.contains(&Modifier::Protected));
        assert_eq!(
            merged.local_map.get("private"),
            Some(&("private".to_string(), "protected".to_string()))
        );
        assert_eq!(merged.conflicts.len(), 1);
    }

    #[test]
    fn missing_left_visibility_adopts_right_with_marker() {
        let (merged, _) = merge(&[
            mods(&[Modifier::Public], Revision::Base),
            mods(&[Modifier::Static], Revision::Left),
            mods(&[Modifier::Protected], Revision::Right),
        ]);
        let set = merged.values[0].value.as_modifiers().unwrap();
        assert!(set.contains(&Modifier::Protected));
        assert_eq!(
            merged.local_map.get("protected"),
            Some(&(String::new(), "protected".to_string()))
        );
    }

    #[test]
    fn clean_comment_merge_produces_no_conflict() {
        let (merged, _) = merge(&[
            Content::new(
                Role::CommentContent,
                RoleValue::Text("old".into()),
                Revision::Base,
            )
            .with_raw("// old\n// tail"),
            Content::new(
                Role::CommentContent,
                RoleValue::Text("left".into()),
                Revision::Left,
            )
            .with_raw("// new-left\n// tail"),
            Content::new(
                Role::CommentContent,
                RoleValue::Text("right".into()),
                Revision::Right,
            )
            .with_raw("// old\n// tail-right"),
        ]);
        assert!(merged.conflicts.is_empty());
        assert_eq!(
            merged.values[0].value,
            RoleValue::Text("// new-left\n// tail-right".into())
        );
        assert!(merged.comment_conflict.is_none());
    }

    #[test]
    fn failed_comment_merge_records_marked_text() {
        let (merged, _) = merge(&[
            Content::new(
                Role::CommentContent,
                RoleValue::Text("old".into()),
                Revision::Base,
            )
            .with_raw("old line\nold"),
            Content::new(
                Role::CommentContent,
                RoleValue::Text("left".into()),
                Revision::Left,
            )
            .with_raw("old line\nnew-left"),
            Content::new(
                Role::CommentContent,
                RoleValue::Text("right".into()),
                Revision::Right,
            )
            .with_raw("old line\nnew-right"),
        ]);
        assert_eq!(merged.conflicts.len(), 1);
        let marked = merged.comment_conflict.as_deref().unwrap();
        assert!(marked.contains("<<<<<<< LEFT"));
        assert!(marked.contains("new-left"));
        assert!(marked.contains("new-right"));
        // Left's parsed value stays in the tree; the marked text is
        // metadata for the printer.
        assert_eq!(merged.values[0].value, RoleValue::Text("left".into()));
    }

    #[test]
    fn operator_conflict_maps_symbols() {
        let mut registry = ConflictRegistry::new();
        let candidates = [
            Content::new(
                Role::OperatorKind,
                RoleValue::Operator(OperatorKind::Binary(BinaryOperator::Plus)),
                Revision::Base,
            ),
            Content::new(
                Role::OperatorKind,
                RoleValue::Operator(OperatorKind::Binary(BinaryOperator::Minus)),
                Revision::Left,
            ),
            Content::new(
                Role::OperatorKind,
                RoleValue::Operator(OperatorKind::Binary(BinaryOperator::Mul)),
                Revision::Right,
            ),
        ];

        let merged =
            merged_content(&mut registry, ElementKind::BinaryOperator, &candidates).unwrap();
        assert_eq!(
            merged.local_map.get("-"),
            Some(&("-".to_string(), "*".to_string()))
        );

        let compound =
            merged_content(&mut registry, ElementKind::OperatorAssignment, &candidates).unwrap();
        assert_eq!(
            compound.local_map.get("-="),
            Some(&("-=".to_string(), "*=".to_string()))
        );
    }

    #[test]
    fn wildcard_bound_conflict_keeps_left_keyword() {
        let (merged, _) = merge(&[
            Content::new(Role::IsUpper, RoleValue::Bool(false), Revision::Base),
            Content::new(Role::IsUpper, RoleValue::Bool(true), Revision::Left),
            Content::new(Role::IsUpper, RoleValue::Bool(false), Revision::Right),
        ]);
        // Right equals base, so this is not a conflict at all.
        assert!(merged.conflicts.is_empty());
        assert_eq!(merged.values[0].value, RoleValue::Bool(true));
    }

    #[test]
    fn wildcard_bound_three_way_disagreement() {
        let mut registry = ConflictRegistry::new();
        let merged = merged_content(
            &mut registry,
            ElementKind::Wildcard,
            &[
                Content::new(Role::IsUpper, RoleValue::Bool(true), Revision::Left),
                Content::new(Role::IsUpper, RoleValue::Bool(false), Revision::Right),
            ],
        )
        .unwrap();
        assert_eq!(merged.values[0].value, RoleValue::Bool(true));
        assert_eq!(
            merged.local_map.get("extends"),
            Some(&("extends".to_string(), "super".to_string()))
        );
        assert_eq!(merged.conflicts.len(), 1);
    }

    #[test]
    fn unhandled_role_is_fatal() {
        let mut registry = ConflictRegistry::new();
        let result = merged_content(
            &mut registry,
            ElementKind::Field,
            &[
                text(Role::Type, "int", Revision::Base),
                text(Role::Type, "long", Revision::Left),
                text(Role::Type, "short", Revision::Right),
            ],
        );
        assert_eq!(
            result.unwrap_err(),
            MergeError::UnhandledContentConflict { role: Role::Type }
        );
    }

    #[test]
    fn conflict_ids_are_assigned_in_candidate_order() {
        let mut registry = ConflictRegistry::new();
        let candidates = [
            text(Role::Name, "n0", Revision::Base),
            text(Role::Name, "n1", Revision::Left),
            text(Role::Name, "n2", Revision::Right),
            text(Role::Value, "v0", Revision::Base),
            text(Role::Value, "v1", Revision::Left),
            text(Role::Value, "v2", Revision::Right),
        ];
        let merged = merged_content(&mut registry, ElementKind::Field, &candidates).unwrap();
        assert_eq!(merged.values[0].value, RoleValue::Text("__SPORK_CONFLICT_0".into()));
        assert_eq!(merged.values[1].value, RoleValue::Text("__SPORK_CONFLICT_1".into()));
    }
}
