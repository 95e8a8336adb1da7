//! Table Module - Shared Document Storage
//!
//! Everything a document consists of, owned behind one `Arc`:
//! - the chunked node table (fixed-width records, stable indices)
//! - symbol tables for names, text payloads and namespace URIs
//! - side tables for ID lookup and entities
//! - the monitor readers block on while the builder is still producing

pub mod chunked;
pub mod entities;
pub mod ids;
pub(crate) mod monitor;
pub mod namespace;
pub mod node;
pub mod strings;

pub use chunked::NodeTable;
pub use entities::{EntityEntry, EntityTable};
pub use ids::IdentifierIndex;
pub use namespace::{NamespaceFrame, NamespaceStack};
pub use node::{Link, LinkField, NamespaceId, NodeId, NodeKind, NodeRecord, TextFlags, DOCUMENT_NODE};
pub use strings::{StringPool, SymbolId, SymbolTable, TextBuffer, EMPTY_SYMBOL};

use parking_lot::RwLock;

use crate::config::{SymbolStrategy, TreeConfig};
use monitor::{Monitor, Probe};
use node::RawRecord;

/// Result of fetching a record that may not exist yet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Fetch {
    /// Record is published
    Ready(RawRecord),
    /// Construction is done and the index is past the end
    End,
    /// Not produced yet
    Pending,
}

/// All storage belonging to one document
pub(crate) struct Tables {
    pub nodes: NodeTable,
    /// Qualified names, prefixes, PI targets, ID values
    pub names: RwLock<StringPool>,
    /// Text payloads, stored with the configured strategy
    pub text: RwLock<Box<dyn SymbolTable>>,
    /// Namespace URIs; id 0 is "no namespace"
    pub namespaces: RwLock<StringPool>,
    pub ids: IdentifierIndex,
    pub entities: EntityTable,
    pub monitor: Monitor,
    pub config: TreeConfig,
}

impl Tables {
    pub fn new(config: TreeConfig) -> Self {
        let text: Box<dyn SymbolTable> = match config.symbols {
            SymbolStrategy::Interned => Box::new(StringPool::new()),
            SymbolStrategy::Appended => Box::new(TextBuffer::new()),
        };
        Tables {
            nodes: NodeTable::new(config.chunk_bits, config.max_chunks),
            names: RwLock::new(StringPool::new()),
            text: RwLock::new(text),
            namespaces: RwLock::new(StringPool::new()),
            ids: IdentifierIndex::new(),
            entities: EntityTable::new(),
            monitor: Monitor::new(config.wait_timeout),
            config,
        }
    }

    /// Fetch a record, reading the done flag before the table
    #[inline]
    pub fn fetch(&self, index: NodeId) -> Fetch {
        let done = self.monitor.is_done();
        match self.nodes.read(index) {
            Some(record) => Fetch::Ready(record),
            None if done => Fetch::End,
            None => Fetch::Pending,
        }
    }

    /// Read a record the caller already knows exists
    ///
    /// Panics on an index that has not been produced: holding such an
    /// index is a programming error.
    #[inline]
    pub fn record(&self, index: NodeId) -> RawRecord {
        self.nodes.read(index).unwrap_or_else(|| {
            panic!(
                "node index {} out of range ({} records produced)",
                index,
                self.nodes.len()
            )
        })
    }

    /// Current state of a structural node's sibling link
    #[inline]
    pub fn link(&self, index: NodeId) -> Probe<Option<NodeId>> {
        match self.nodes.link(index).map(Link::from_raw) {
            Some(Link::End) => Probe::Ready(None),
            Some(Link::Node(next)) => Probe::Ready(Some(next)),
            Some(Link::Pending) | None => Probe::Pending,
        }
    }

    pub fn name(&self, id: SymbolId) -> String {
        self.names.read().get(id).unwrap_or_default().to_string()
    }

    pub fn text(&self, id: SymbolId) -> String {
        self.text.read().resolve(id).unwrap_or_default().to_string()
    }

    pub fn namespace_uri(&self, id: NamespaceId) -> Option<String> {
        if id == 0 {
            return None;
        }
        self.namespaces.read().get(id).map(str::to_string)
    }
}

impl std::fmt::Debug for Tables {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tables")
            .field("nodes", &self.nodes)
            .field("names", &self.names.read().len())
            .field("text", &self.text.read().len())
            .field("ids", &self.ids.len())
            .field("monitor", &self.monitor)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::node::TextFlags;

    #[test]
    fn test_fetch_states() {
        let tables = Tables::new(TreeConfig::default());
        assert_eq!(tables.fetch(0), Fetch::Pending);
        let doc = RawRecord::pack(NodeKind::Document, TextFlags::NONE, 0, None, -1, 0);
        tables.nodes.append(doc).unwrap();
        assert!(matches!(tables.fetch(0), Fetch::Ready(_)));
        assert_eq!(tables.fetch(1), Fetch::Pending);
        tables.monitor.finish();
        assert_eq!(tables.fetch(1), Fetch::End);
    }

    #[test]
    fn test_strategy_selects_text_store() {
        let tables = Tables::new(TreeConfig::default().with_symbols(SymbolStrategy::Appended));
        let a = tables.text.write().intern("x");
        let b = tables.text.write().intern("x");
        assert_ne!(a, b);

        let tables = Tables::new(TreeConfig::default());
        let a = tables.text.write().intern("x");
        let b = tables.text.write().intern("x");
        assert_eq!(a, b);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_record_out_of_range_panics() {
        let tables = Tables::new(TreeConfig::default());
        tables.record(3);
    }
}
