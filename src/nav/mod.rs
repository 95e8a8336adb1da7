//! Navigation Module - Reader API
//!
//! A [`Document`] is a cheap, clonable handle onto a document's tables.
//! Every query is a function of the table contents plus the construction
//! state. Queries that depend on records not produced yet block until the
//! builder catches up, fails, the document is cancelled, or the configured
//! timeout elapses.
//!
//! Node indices handed to these functions must belong to the same
//! document. Navigation calls wait for their starting record if the
//! builder has not produced it yet; property queries such as `node_kind`
//! expect a produced record. An index that is still missing once
//! construction completed is a programming error and panics.

mod axes;
mod iter;

pub use iter::{Ancestors, Attributes, Children};

use std::sync::Arc;

use crate::build::builder::split_qname;
use crate::config::CancelToken;
use crate::error::{Result, TreeError};
use crate::table::entities::EntityEntry;
use crate::table::monitor::Probe;
use crate::table::node::RawRecord;
use crate::table::{Fetch, NodeId, NodeKind, NodeRecord, SymbolTable, Tables, DOCUMENT_NODE};

/// Read handle onto a (possibly still growing) document
#[derive(Clone)]
pub struct Document {
    tables: Arc<Tables>,
}

impl Document {
    pub(crate) fn from_tables(tables: Arc<Tables>) -> Self {
        Document { tables }
    }

    pub(crate) fn tables(&self) -> &Tables {
        &self.tables
    }

    #[inline]
    fn raw(&self, node: NodeId) -> RawRecord {
        self.tables.record(node)
    }

    /// Wait until record `index` exists, or construction ended without it
    fn wait_record(&self, index: NodeId) -> Result<Option<RawRecord>> {
        self.tables.monitor.wait_for(|| match self.tables.fetch(index) {
            Fetch::Ready(record) => Probe::Ready(Some(record)),
            Fetch::End => Probe::Ready(None),
            Fetch::Pending => Probe::Pending,
        })
    }

    /// Record of a node a navigation call starts from
    ///
    /// The caller may be ahead of the builder (the document node, or an
    /// index computed from the layout), so this waits for the record. Only
    /// an index still missing after construction completed is a caller
    /// error.
    fn nav_record(&self, node: NodeId) -> Result<RawRecord> {
        match self.wait_record(node)? {
            Some(record) => Ok(record),
            None => Ok(self.raw(node)),
        }
    }

    /// Text node holding the value of an attribute or entity
    fn is_value_node(&self, record: &RawRecord) -> bool {
        record.kind() == NodeKind::Text
            && record
                .parent()
                .is_some_and(|p| self.raw(p).kind().has_value_node())
    }

    // ========================================================================
    // Construction state
    // ========================================================================

    /// Records produced so far
    pub fn node_count(&self) -> usize {
        self.tables.nodes.len()
    }

    /// Construction completed successfully
    pub fn is_done(&self) -> bool {
        self.tables.monitor.is_done()
    }

    pub fn is_failed(&self) -> bool {
        self.tables.monitor.is_failed()
    }

    /// The error that ended construction, if it failed
    pub fn failure(&self) -> Option<TreeError> {
        self.tables.monitor.failure()
    }

    /// Block until construction has finished
    pub fn wait_until_done(&self) -> Result<()> {
        self.tables.monitor.wait_for(|| {
            if self.tables.monitor.is_done() {
                Probe::Ready(())
            } else {
                Probe::Pending
            }
        })
    }

    /// Abort every current and future wait on this document
    pub fn cancel(&self) {
        self.tables.monitor.cancel();
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.tables.monitor.cancel_token()
    }

    /// How many times a reader had to block for the builder
    pub fn blocked_waits(&self) -> usize {
        self.tables.monitor.blocked_waits()
    }

    // ========================================================================
    // Node properties
    // ========================================================================

    /// The tagged form of a node's record
    pub fn record(&self, node: NodeId) -> NodeRecord {
        self.raw(node).unpack()
    }

    pub fn node_kind(&self, node: NodeId) -> NodeKind {
        self.raw(node).kind()
    }

    /// DOM-style node name
    ///
    /// Qualified name for elements and attributes, target for processing
    /// instructions, entity name for entities and references, and
    /// `#document`, `#text`, `#cdata-section` or `#comment` otherwise.
    pub fn node_name(&self, node: NodeId) -> String {
        let record = self.raw(node);
        match record.kind() {
            NodeKind::Document => "#document".to_string(),
            NodeKind::Text if record.flags().cdata => "#cdata-section".to_string(),
            NodeKind::Text => "#text".to_string(),
            NodeKind::Comment => "#comment".to_string(),
            NodeKind::Element
            | NodeKind::Attribute
            | NodeKind::ProcessingInstruction
            | NodeKind::Entity
            | NodeKind::EntityReference => self.tables.name(record.name()),
        }
    }

    /// Name without its prefix; empty for unnamed kinds
    pub fn local_name(&self, node: NodeId) -> String {
        let record = self.raw(node);
        match record.kind() {
            NodeKind::Element | NodeKind::Attribute => {
                let name = self.tables.name(record.name());
                split_qname(&name).1.to_string()
            }
            NodeKind::ProcessingInstruction | NodeKind::Entity | NodeKind::EntityReference => {
                self.tables.name(record.name())
            }
            _ => String::new(),
        }
    }

    /// Prefix of an element or attribute name
    pub fn prefix(&self, node: NodeId) -> Option<String> {
        let record = self.raw(node);
        if !matches!(record.kind(), NodeKind::Element | NodeKind::Attribute) {
            return None;
        }
        let name = self.tables.name(record.name());
        let (prefix, _) = split_qname(&name);
        (!prefix.is_empty()).then(|| prefix.to_string())
    }

    /// DOM-style node value
    ///
    /// Payload for text, comments and processing instructions (the data
    /// part); the value for attributes and entities; `None` otherwise.
    pub fn node_value(&self, node: NodeId) -> Option<String> {
        let record = self.raw(node);
        match record.kind() {
            NodeKind::Text | NodeKind::Comment | NodeKind::ProcessingInstruction => {
                Some(self.tables.text(record.payload()))
            }
            NodeKind::Attribute | NodeKind::Entity => {
                let value = self.raw(node + 1);
                Some(self.tables.text(value.payload()))
            }
            _ => None,
        }
    }

    /// Namespace URI of an element or attribute, `None` if unqualified
    pub fn namespace_uri(&self, node: NodeId) -> Option<String> {
        let record = self.raw(node);
        match record.kind() {
            NodeKind::Element | NodeKind::Attribute => {
                self.tables.namespace_uri(record.namespace())
            }
            _ => None,
        }
    }

    /// Whitespace-only text inside element-only content
    pub fn is_ignorable_whitespace(&self, node: NodeId) -> bool {
        let record = self.raw(node);
        record.kind() == NodeKind::Text && record.flags().ignorable
    }

    pub fn is_cdata(&self, node: NodeId) -> bool {
        let record = self.raw(node);
        record.kind() == NodeKind::Text && record.flags().cdata
    }

    /// XPath string-value
    ///
    /// For the document and elements this is the concatenation of all
    /// descendant text, so it waits until the node is complete.
    pub fn string_value(&self, node: NodeId) -> Result<String> {
        let record = self.nav_record(node)?;
        match record.kind() {
            NodeKind::Document | NodeKind::Element => {
                let mut value = String::new();
                let mut current = node;
                while let Some(next) = self.next_descendant(node, current)? {
                    let descendant = self.raw(next);
                    if descendant.kind() == NodeKind::Text {
                        value.push_str(&self.tables.text(descendant.payload()));
                    }
                    current = next;
                }
                Ok(value)
            }
            NodeKind::EntityReference => {
                let name = self.tables.name(record.name());
                Ok(self.entity(&name)?.map(|e| e.value).unwrap_or_default())
            }
            _ => Ok(self.node_value(node).unwrap_or_default()),
        }
    }

    // ========================================================================
    // Side tables
    // ========================================================================

    /// Element carrying the ID-typed attribute value `id`
    ///
    /// Waits while the value is unknown and construction is in progress;
    /// `None` is only returned once the document is complete.
    pub fn element_by_id(&self, id: &str) -> Result<Option<NodeId>> {
        self.tables.monitor.wait_for(|| {
            let done = self.tables.monitor.is_done();
            let key = self.tables.names.read().lookup(id);
            match key.and_then(|key| self.tables.ids.get(key)) {
                Some(element) => Probe::Ready(Some(element)),
                None if done => Probe::Ready(None),
                None => Probe::Pending,
            }
        })
    }

    /// Look up a predefined or declared entity
    ///
    /// Waits until the prolog has been read, since declarations may still
    /// be arriving before then.
    pub fn entity(&self, name: &str) -> Result<Option<EntityEntry>> {
        self.tables.monitor.wait_for(|| {
            let sealed = self.tables.entities.is_sealed() || self.tables.monitor.is_done();
            match self.tables.entities.get(name) {
                Some(entry) => Probe::Ready(Some(entry)),
                None if sealed => Probe::Ready(None),
                None => Probe::Pending,
            }
        })
    }

    /// Replacement text of an entity
    pub fn entity_value(&self, name: &str) -> Result<Option<String>> {
        Ok(self.entity(name)?.map(|entry| entry.value))
    }

    /// First declared entity record
    pub fn first_entity(&self) -> Result<Option<NodeId>> {
        let mut index = DOCUMENT_NODE + 1;
        while let Some(record) = self.wait_record(index)? {
            match record.kind() {
                NodeKind::Entity => return Ok(Some(index)),
                // Declarations never follow the document element
                NodeKind::Element => return Ok(None),
                NodeKind::Attribute => index += 2,
                _ => index += 1,
            }
        }
        Ok(None)
    }

    // ========================================================================
    // Convenience lookups
    // ========================================================================

    /// The single element child of the document
    pub fn document_element(&self) -> Result<Option<NodeId>> {
        for child in self.children(DOCUMENT_NODE) {
            let child = child?;
            if self.node_kind(child) == NodeKind::Element {
                return Ok(Some(child));
            }
        }
        Ok(None)
    }

    /// Attribute of `element` with the given qualified name
    pub fn attribute_by_name(&self, element: NodeId, name: &str) -> Option<NodeId> {
        let key = self.tables.names.read().lookup(name)?;
        self.attributes(element)
            .find(|&attr| self.raw(attr).name() == key)
    }

    /// True if `ancestor` is a proper ancestor of `node`
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        if ancestor >= node {
            return false;
        }
        let mut current = self.raw(node).parent();
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            if parent < ancestor {
                return false;
            }
            current = self.raw(parent).parent();
        }
        false
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("nodes", &self.node_count())
            .field("done", &self.is_done())
            .field("failed", &self.is_failed())
            .finish()
    }
}
