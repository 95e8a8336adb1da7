//! Identifier Index
//!
//! Maps the interned value of an ID-typed attribute to the element that
//! carries it. Append-only during construction; a missing key only means
//! "absent" once the document is complete.

use std::collections::HashMap;

use parking_lot::RwLock;

use super::node::NodeId;
use super::strings::SymbolId;

#[derive(Debug, Default)]
pub struct IdentifierIndex {
    map: RwLock<HashMap<SymbolId, NodeId>>,
}

impl IdentifierIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `value -> element`. The first element with a given ID keeps it.
    ///
    /// Returns false if the value was already taken.
    pub fn insert(&self, value: SymbolId, element: NodeId) -> bool {
        let mut map = self.map.write();
        if map.contains_key(&value) {
            return false;
        }
        map.insert(value, element);
        true
    }

    pub fn get(&self, value: SymbolId) -> Option<NodeId> {
        self.map.read().get(&value).copied()
    }

    pub fn len(&self) -> usize {
        self.map.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
