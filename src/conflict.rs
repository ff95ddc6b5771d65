//! Conflict records and the per-run sentinel registry.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::content::{Content, Role};
use crate::tree::ElementId;

/// Prefix of the sentinel strings substituted into identifier and value
/// positions when both sides edited the same attribute.
pub const CONTENT_CONFLICT_PREFIX: &str = "__SPORK_CONFLICT_";

/// An attribute disagreement the merger could not resolve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentConflict {
    pub role: Role,
    pub base: Option<Content>,
    pub left: Content,
    pub right: Content,
}

/// Two ordered sibling sequences that could not be reconciled into a
/// single order. Carried as metadata on a placeholder element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuralConflict {
    pub left: Vec<ElementId>,
    pub right: Vec<ElementId>,
}

/// Allocates content-conflict sentinels and records their expansions.
///
/// The registry is owned by a single interpreter instance; ids are
/// allocated monotonically from zero within one merge run, and the
/// finished dictionary is attached to every merged element as a read-only
/// snapshot.
#[derive(Debug, Default)]
pub struct ConflictRegistry {
    next_id: usize,
    global: BTreeMap<String, (String, String)>,
}

impl ConflictRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh sentinel for a left/right literal pair.
    pub fn register(&mut self, left: impl Into<String>, right: impl Into<String>) -> String {
        let key = format!("{}{}", CONTENT_CONFLICT_PREFIX, self.next_id);
        self.next_id += 1;
        self.global.insert(key.clone(), (left.into(), right.into()));
        key
    }

    pub fn len(&self) -> usize {
        self.global.len()
    }

    pub fn is_empty(&self) -> bool {
        self.global.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&(String, String)> {
        self.global.get(key)
    }

    /// Freeze the dictionary into the snapshot stamped onto merged
    /// elements.
    pub fn snapshot(&self) -> Arc<BTreeMap<String, (String, String)>> {
        Arc::new(self.global.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinels_are_dense_from_zero() {
        let mut registry = ConflictRegistry::new();
        let first = registry.register("bar", "baz");
        let second = registry.register("x", "y");
        assert_eq!(first, "__SPORK_CONFLICT_0");
        assert_eq!(second, "__SPORK_CONFLICT_1");
        assert_eq!(registry.len(), 2);
        assert_eq!(
            registry.get("__SPORK_CONFLICT_0"),
            Some(&("bar".to_string(), "baz".to_string()))
        );
    }

    #[test]
    fn snapshot_is_complete() {
        let mut registry = ConflictRegistry::new();
        registry.register("a", "b");
        let snapshot = registry.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.contains_key("__SPORK_CONFLICT_0"));
    }
}
