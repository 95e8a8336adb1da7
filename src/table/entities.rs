//! Entity Table
//!
//! Side table of entities known to the document: the five predefined XML
//! entities (value only, no node) plus general entities declared in the
//! internal subset, each backed by an `Entity` record in the node table.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;

use super::node::NodeId;

/// Predefined XML entities
pub const PREDEFINED: [(&str, &str); 5] = [
    ("lt", "<"),
    ("gt", ">"),
    ("amp", "&"),
    ("quot", "\""),
    ("apos", "'"),
];

/// One known entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityEntry {
    /// Replacement text
    pub value: String,
    /// Entity record, `None` for predefined entities
    pub node: Option<NodeId>,
}

#[derive(Debug)]
pub struct EntityTable {
    entries: RwLock<HashMap<String, EntityEntry>>,
    /// No further declarations will arrive
    sealed: AtomicBool,
}

impl EntityTable {
    pub fn new() -> Self {
        let entries = PREDEFINED
            .iter()
            .map(|&(name, value)| {
                (
                    name.to_string(),
                    EntityEntry {
                        value: value.to_string(),
                        node: None,
                    },
                )
            })
            .collect();
        EntityTable {
            entries: RwLock::new(entries),
            sealed: AtomicBool::new(false),
        }
    }

    /// Add a declared entity. The first declaration of a name wins.
    ///
    /// Returns false if the name was already known.
    pub fn declare(&self, name: &str, value: &str, node: NodeId) -> bool {
        let mut entries = self.entries.write();
        if self.is_sealed() || entries.contains_key(name) {
            return false;
        }
        entries.insert(
            name.to_string(),
            EntityEntry {
                value: value.to_string(),
                node: Some(node),
            },
        );
        true
    }

    /// Close the table to declarations; absence is final from here on
    pub fn seal(&self) {
        self.sealed.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::Acquire)
    }

    pub fn get(&self, name: &str) -> Option<EntityEntry> {
        self.entries.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.read().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for EntityTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predefined_present() {
        let table = EntityTable::new();
        assert_eq!(table.len(), 5);
        let amp = table.get("amp").unwrap();
        assert_eq!(amp.value, "&");
        assert_eq!(amp.node, None);
    }

    #[test]
    fn test_declare_first_wins() {
        let table = EntityTable::new();
        assert!(table.declare("copy", "(c)", 3));
        assert!(!table.declare("copy", "other", 9));
        assert!(!table.declare("lt", "nope", 11));
        assert_eq!(table.get("copy").unwrap().node, Some(3));
        assert_eq!(table.get("lt").unwrap().value, "<");
    }

    #[test]
    fn test_sealed_rejects_declarations() {
        let table = EntityTable::new();
        table.seal();
        assert!(table.is_sealed());
        assert!(!table.declare("late", "x", 4));
        assert!(!table.contains("late"));
    }
}
