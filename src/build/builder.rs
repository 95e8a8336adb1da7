//! Document Builder
//!
//! The only producer of a document's tables. Consumes construction events,
//! appends records, and backpatches sibling links as later siblings (or the
//! end of the parent) arrive.
//!
//! Cursor state lives in the table itself: the current parent is a node
//! index, and closing an element moves the cursor to the parent stored in
//! that element's record. No element stack is kept besides namespaces.

use std::sync::Arc;

use memchr::memchr;

use super::handler::{AttributeEvent, ContentHandler};
use crate::config::TreeConfig;
use crate::error::{ErrorHandler, LogErrorHandler, Recovery, Result, TreeError};
use crate::nav::Document;
use crate::table::namespace::ns;
use crate::table::node::{RawRecord, MAX_NAMESPACE_ID};
use crate::table::{
    Link, NamespaceFrame, NamespaceId, NamespaceStack, NodeId, NodeKind, SymbolId, SymbolTable,
    Tables, TextFlags, DOCUMENT_NODE, EMPTY_SYMBOL,
};

/// Construction state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    /// Waiting for `start_document`
    Idle,
    /// Accepting content events
    DocumentOpen,
    /// `end_document` processed; the tables are read-only
    DocumentClosed,
    /// A fatal error was recorded; readers see it instead of blocking
    Failed,
}

impl BuildState {
    pub fn label(self) -> &'static str {
        match self {
            BuildState::Idle => "Idle",
            BuildState::DocumentOpen => "DocumentOpen",
            BuildState::DocumentClosed => "DocumentClosed",
            BuildState::Failed => "Failed",
        }
    }
}

/// Builds a document table from construction events
pub struct Builder {
    tables: Arc<Tables>,
    state: BuildState,
    /// Parent of whatever is appended next
    cursor: NodeId,
    /// Last node appended under the cursor
    prev_sibling: Option<(NodeId, NodeKind)>,
    /// Last declared entity while the entity chain is open
    last_entity: Option<NodeId>,
    entity_chain_closed: bool,
    namespaces: NamespaceStack,
    xml_prefix: SymbolId,
    xmlns_prefix: SymbolId,
    xmlns_ns: NamespaceId,
    /// Character data not yet appended, merged across adjacent events
    pending_text: Option<(String, TextFlags)>,
    /// Records appended since readers were last woken
    since_wake: usize,
    error_handler: Arc<dyn ErrorHandler>,
}

impl Builder {
    /// Create a builder and the document handle readers will use
    pub fn new(config: TreeConfig) -> (Builder, Document) {
        let tables = Arc::new(Tables::new(config));

        let (xml_prefix, xmlns_prefix) = {
            let mut names = tables.names.write();
            (names.intern("xml"), names.intern("xmlns"))
        };
        let (xml_ns, xmlns_ns) = {
            let mut uris = tables.namespaces.write();
            (uris.intern(ns::XML), uris.intern(ns::XMLNS))
        };

        let builder = Builder {
            tables: Arc::clone(&tables),
            state: BuildState::Idle,
            cursor: DOCUMENT_NODE,
            prev_sibling: None,
            last_entity: None,
            entity_chain_closed: false,
            namespaces: NamespaceStack::new(xml_prefix, xml_ns, xmlns_prefix, xmlns_ns),
            xml_prefix,
            xmlns_prefix,
            xmlns_ns,
            pending_text: None,
            since_wake: 0,
            error_handler: Arc::new(LogErrorHandler),
        };
        (builder, Document::from_tables(tables))
    }

    /// Register the error-handling collaborator
    pub fn with_error_handler(mut self, handler: Arc<dyn ErrorHandler>) -> Self {
        self.error_handler = handler;
        self
    }

    pub fn state(&self) -> BuildState {
        self.state
    }

    /// Another handle to the document being built
    pub fn document(&self) -> Document {
        Document::from_tables(Arc::clone(&self.tables))
    }

    /// Record a fatal error; every waiting and future reader will see it
    pub fn fail(&mut self, err: TreeError) {
        if matches!(self.state, BuildState::Failed | BuildState::DocumentClosed) {
            return;
        }
        self.state = BuildState::Failed;
        self.error_handler.fatal(&err);
        self.tables.monitor.fail(err);
    }

    /// Any error from an event is fatal to the whole construction
    fn guard<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            self.fail(err.clone());
        }
        result
    }

    fn expect_open(&self, event: &'static str) -> Result<()> {
        if self.state == BuildState::DocumentOpen {
            Ok(())
        } else {
            Err(TreeError::Protocol {
                state: self.state.label(),
                event,
            })
        }
    }

    // ========================================================================
    // Appending and linking
    // ========================================================================

    fn append(&mut self, record: RawRecord) -> Result<NodeId> {
        let index = self.tables.nodes.append(record)?;
        self.count_appended(1);
        Ok(index)
    }

    fn append_batch(&mut self, records: &[RawRecord]) -> Result<NodeId> {
        let first = self.tables.nodes.append_batch(records)?;
        self.count_appended(records.len());
        Ok(first)
    }

    fn count_appended(&mut self, records: usize) {
        self.since_wake += records;
        if self.since_wake >= self.tables.config.wake_interval {
            self.since_wake = 0;
            log::trace!("waking readers at {} records", self.tables.nodes.len());
            self.tables.monitor.wake_all();
        }
    }

    /// Make `node` the next sibling of the previous node at this level
    fn link_previous(&mut self, node: NodeId, kind: NodeKind) {
        if let Some((prev, prev_kind)) = self.prev_sibling {
            // Leaves find their sibling by adjacency
            if prev_kind.is_linked() {
                self.tables.nodes.write_link(prev, Link::Node(node).to_raw());
            }
        }
        self.prev_sibling = Some((node, kind));
    }

    /// Resolve the trailing link at this level to "none"
    fn close_sibling_chain(&mut self) {
        if let Some((prev, kind)) = self.prev_sibling {
            if kind.is_linked() && self.tables.nodes.link(prev).map(Link::from_raw) == Some(Link::Pending) {
                self.tables.nodes.write_link(prev, Link::End.to_raw());
            }
        }
    }

    fn close_entity_chain(&mut self) {
        if self.entity_chain_closed {
            return;
        }
        if let Some(last) = self.last_entity {
            self.tables.nodes.write_link(last, Link::End.to_raw());
        }
        self.entity_chain_closed = true;
        self.tables.entities.seal();
        self.tables.monitor.wake_all();
    }

    fn intern_name(&self, name: &str) -> SymbolId {
        self.tables.names.write().intern(name)
    }

    fn intern_text(&self, text: &str) -> SymbolId {
        self.tables.text.write().intern(text)
    }

    fn intern_namespace(&self, uri: &str) -> Result<NamespaceId> {
        if uri.is_empty() {
            return Ok(0);
        }
        let id = self.tables.namespaces.write().intern(uri);
        if id > MAX_NAMESPACE_ID {
            return Err(TreeError::Capacity("namespace table is full"));
        }
        Ok(id)
    }

    /// Namespace of a prefixed name; unprefixed names use `default`
    fn resolve_prefix(&self, qname: &str, default: NamespaceId) -> Result<NamespaceId> {
        let (prefix, _) = split_qname(qname);
        if prefix.is_empty() {
            return Ok(default);
        }
        let prefix_id = self.tables.names.read().lookup(prefix);
        if let Some(ns) = prefix_id.and_then(|id| self.namespaces.resolve(id)) {
            return Ok(ns);
        }
        let err = TreeError::Construction(format!("undeclared namespace prefix '{}'", prefix));
        match self.error_handler.error(&err) {
            Recovery::Continue => Ok(0),
            Recovery::Abort => Err(err),
        }
    }

    fn flush_text(&mut self) -> Result<()> {
        let Some((text, flags)) = self.pending_text.take() else {
            return Ok(());
        };
        if flags.ignorable && self.tables.config.strip_ignorable_whitespace {
            return Ok(());
        }
        let payload = self.intern_text(&text);
        let node = self.append(RawRecord::leaf(
            NodeKind::Text,
            flags,
            self.cursor,
            payload,
            EMPTY_SYMBOL,
        ))?;
        self.link_previous(node, NodeKind::Text);
        Ok(())
    }

    // ========================================================================
    // Event bodies
    // ========================================================================

    fn do_start_document(&mut self) -> Result<()> {
        if self.state != BuildState::Idle {
            return Err(TreeError::Protocol {
                state: self.state.label(),
                event: "start_document",
            });
        }
        let record = RawRecord::pack(
            NodeKind::Document,
            TextFlags::NONE,
            0,
            None,
            Link::End.to_raw(),
            EMPTY_SYMBOL,
        );
        self.append(record)?;
        self.state = BuildState::DocumentOpen;
        self.cursor = DOCUMENT_NODE;
        log::debug!("document started");
        self.tables.monitor.wake_all();
        Ok(())
    }

    fn do_end_document(&mut self) -> Result<()> {
        self.expect_open("end_document")?;
        self.flush_text()?;
        if self.cursor != DOCUMENT_NODE {
            return Err(TreeError::Construction(format!(
                "document ended with element {} still open",
                self.cursor
            )));
        }
        self.close_sibling_chain();
        self.close_entity_chain();
        self.state = BuildState::DocumentClosed;
        log::debug!(
            "document complete: {} records, {} ids, {} names",
            self.tables.nodes.len(),
            self.tables.ids.len(),
            self.tables.names.read().len()
        );
        self.tables.monitor.finish();
        Ok(())
    }

    fn do_start_element(&mut self, name: &str, attributes: &[AttributeEvent<'_>]) -> Result<()> {
        self.expect_open("start_element")?;
        self.flush_text()?;
        self.close_entity_chain();

        let mut frame = NamespaceFrame::new();
        for attr in attributes.iter().filter(|a| a.is_namespace_decl()) {
            let prefix = match attr.name.strip_prefix("xmlns:") {
                Some(prefix) => self.intern_name(prefix),
                None => EMPTY_SYMBOL,
            };
            if prefix == self.xml_prefix || prefix == self.xmlns_prefix {
                continue;
            }
            let uri = self.intern_namespace(attr.value)?;
            frame.declare(prefix, uri);
        }
        self.namespaces.push(frame);

        let element = self.tables.nodes.next_index();
        let element_ns = self.resolve_prefix(name, self.namespaces.resolve_default())?;
        let mut records = Vec::with_capacity(1 + attributes.len() * 2);
        records.push(RawRecord::linked(
            NodeKind::Element,
            element_ns,
            self.cursor,
            self.intern_name(name),
        ));

        let mut id_values = Vec::new();
        for (i, attr) in attributes.iter().enumerate() {
            let index = element + 1 + 2 * i as NodeId;
            let link = if i + 1 == attributes.len() {
                Link::End
            } else {
                Link::Node(index + 2)
            }
            .to_raw();
            let attr_ns = if attr.is_namespace_decl() {
                self.xmlns_ns
            } else {
                self.resolve_prefix(attr.name, 0)?
            };
            records.push(RawRecord::pack(
                NodeKind::Attribute,
                TextFlags::NONE,
                attr_ns,
                Some(element),
                link,
                self.intern_name(attr.name),
            ));
            records.push(RawRecord::leaf(
                NodeKind::Text,
                TextFlags::NONE,
                index,
                self.intern_text(attr.value),
                EMPTY_SYMBOL,
            ));
            if attr.is_id {
                id_values.push(attr.value);
            }
        }

        let first = self.append_batch(&records)?;
        debug_assert_eq!(first, element);
        self.link_previous(element, NodeKind::Element);

        for value in id_values {
            let key = self.intern_name(value);
            if !self.tables.ids.insert(key, element) {
                self.error_handler
                    .warning(&format!("duplicate ID value '{}' ignored", value));
            }
        }

        self.cursor = element;
        self.prev_sibling = None;
        Ok(())
    }

    fn do_end_element(&mut self) -> Result<()> {
        self.expect_open("end_element")?;
        self.flush_text()?;
        if self.cursor == DOCUMENT_NODE {
            return Err(TreeError::Construction(
                "end_element without a matching start_element".to_string(),
            ));
        }
        self.close_sibling_chain();
        let closed = self.cursor;
        self.cursor = self
            .tables
            .record(closed)
            .parent()
            .unwrap_or(DOCUMENT_NODE);
        self.namespaces.pop();
        self.prev_sibling = Some((closed, NodeKind::Element));
        Ok(())
    }

    fn do_characters(&mut self, text: &str, flags: TextFlags) -> Result<()> {
        self.expect_open("characters")?;
        if text.is_empty() {
            return Ok(());
        }
        if self.cursor == DOCUMENT_NODE {
            if is_xml_whitespace(text) {
                return Ok(());
            }
            return Err(TreeError::Construction(
                "character data outside the document element".to_string(),
            ));
        }
        match &mut self.pending_text {
            Some((pending, pending_flags)) => {
                pending.push_str(text);
                *pending_flags = pending_flags.merge(flags);
            }
            None => self.pending_text = Some((text.to_string(), flags)),
        }
        Ok(())
    }

    fn do_comment(&mut self, text: &str) -> Result<()> {
        self.expect_open("comment")?;
        self.flush_text()?;
        let payload = self.intern_text(text);
        let node = self.append(RawRecord::leaf(
            NodeKind::Comment,
            TextFlags::NONE,
            self.cursor,
            payload,
            EMPTY_SYMBOL,
        ))?;
        self.link_previous(node, NodeKind::Comment);
        Ok(())
    }

    fn do_processing_instruction(&mut self, target: &str, data: &str) -> Result<()> {
        self.expect_open("processing_instruction")?;
        self.flush_text()?;
        let payload = self.intern_text(data);
        let target = self.intern_name(target);
        let node = self.append(RawRecord::leaf(
            NodeKind::ProcessingInstruction,
            TextFlags::NONE,
            self.cursor,
            payload,
            target,
        ))?;
        self.link_previous(node, NodeKind::ProcessingInstruction);
        Ok(())
    }

    fn do_entity_decl(&mut self, name: &str, value: &str) -> Result<()> {
        self.expect_open("entity_decl")?;
        self.flush_text()?;
        if self.entity_chain_closed || self.cursor != DOCUMENT_NODE {
            return Err(TreeError::Protocol {
                state: "ElementOpen",
                event: "entity_decl",
            });
        }
        if self.tables.entities.contains(name) {
            self.error_handler
                .warning(&format!("entity '{}' already declared; keeping the first", name));
            return Ok(());
        }

        let entity = self.tables.nodes.next_index();
        let records = [
            RawRecord::linked(NodeKind::Entity, 0, DOCUMENT_NODE, self.intern_name(name)),
            RawRecord::leaf(
                NodeKind::Text,
                TextFlags::NONE,
                entity,
                self.intern_text(value),
                EMPTY_SYMBOL,
            ),
        ];
        self.append_batch(&records)?;
        if let Some(prev) = self.last_entity {
            self.tables.nodes.write_link(prev, Link::Node(entity).to_raw());
        }
        self.last_entity = Some(entity);
        self.tables.entities.declare(name, value, entity);
        Ok(())
    }

    fn do_entity_reference(&mut self, name: &str) -> Result<()> {
        self.expect_open("entity_reference")?;
        self.flush_text()?;
        let name = self.intern_name(name);
        let node = self.append(RawRecord::linked(
            NodeKind::EntityReference,
            0,
            self.cursor,
            name,
        ))?;
        self.link_previous(node, NodeKind::EntityReference);
        Ok(())
    }
}

impl ContentHandler for Builder {
    fn start_document(&mut self) -> Result<()> {
        let result = self.do_start_document();
        self.guard(result)
    }

    fn end_document(&mut self) -> Result<()> {
        let result = self.do_end_document();
        self.guard(result)
    }

    fn start_element(&mut self, name: &str, attributes: &[AttributeEvent<'_>]) -> Result<()> {
        let result = self.do_start_element(name, attributes);
        self.guard(result)
    }

    fn end_element(&mut self) -> Result<()> {
        let result = self.do_end_element();
        self.guard(result)
    }

    fn characters(&mut self, text: &str, flags: TextFlags) -> Result<()> {
        let result = self.do_characters(text, flags);
        self.guard(result)
    }

    fn comment(&mut self, text: &str) -> Result<()> {
        let result = self.do_comment(text);
        self.guard(result)
    }

    fn processing_instruction(&mut self, target: &str, data: &str) -> Result<()> {
        let result = self.do_processing_instruction(target, data);
        self.guard(result)
    }

    fn entity_decl(&mut self, name: &str, value: &str) -> Result<()> {
        let result = self.do_entity_decl(name, value);
        self.guard(result)
    }

    fn entity_reference(&mut self, name: &str) -> Result<()> {
        let result = self.do_entity_reference(name);
        self.guard(result)
    }

    fn fatal_error(&mut self, err: TreeError) {
        self.fail(err);
    }
}

impl Drop for Builder {
    fn drop(&mut self) {
        if matches!(self.state, BuildState::Idle | BuildState::DocumentOpen) {
            self.fail(TreeError::Construction(
                "builder dropped before the end of the document".to_string(),
            ));
        }
    }
}

impl std::fmt::Debug for Builder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Builder")
            .field("state", &self.state)
            .field("cursor", &self.cursor)
            .field("prev_sibling", &self.prev_sibling)
            .field("depth", &self.namespaces.depth())
            .finish()
    }
}

/// Split `prefix:local`; the prefix is empty for unprefixed names
#[inline]
pub(crate) fn split_qname(name: &str) -> (&str, &str) {
    match memchr(b':', name.as_bytes()) {
        Some(pos) => (&name[..pos], &name[pos + 1..]),
        None => ("", name),
    }
}

#[inline]
pub(crate) fn is_xml_whitespace(text: &str) -> bool {
    text.bytes().all(|b| matches!(b, b' ' | b'\t' | b'\n' | b'\r'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StrictErrorHandler;
    use crate::table::{Link, LinkField};

    fn open() -> (Builder, Document) {
        let (mut builder, doc) = Builder::new(TreeConfig::default());
        builder.start_document().unwrap();
        (builder, doc)
    }

    fn link_of(doc: &Document, node: NodeId) -> Link {
        match doc.record(node).link {
            LinkField::Sibling(link) => link,
            LinkField::Payload(_) => panic!("node {} has no link", node),
        }
    }

    #[test]
    fn test_document_record_at_zero() {
        let (_builder, doc) = open();
        assert_eq!(doc.node_count(), 1);
        assert_eq!(doc.node_kind(0), NodeKind::Document);
        assert_eq!(doc.parent(0), None);
    }

    #[test]
    fn test_attribute_layout() {
        let (mut builder, doc) = open();
        builder
            .start_element("a", &[AttributeEvent::new("x", "1"), AttributeEvent::new("y", "2")])
            .unwrap();

        // a=1, x=2, "1"=3, y=4, "2"=5
        assert_eq!(doc.node_kind(2), NodeKind::Attribute);
        assert_eq!(doc.parent(2), Some(1));
        assert_eq!(doc.node_kind(3), NodeKind::Text);
        assert_eq!(doc.parent(3), Some(2));
        assert_eq!(link_of(&doc, 2), Link::Node(4));
        assert_eq!(link_of(&doc, 4), Link::End);
        assert_eq!(doc.parent(5), Some(4));
    }

    #[test]
    fn test_sibling_backpatching() {
        let (mut builder, doc) = open();
        builder.start_element("root", &[]).unwrap();
        builder.start_element("b", &[]).unwrap();
        builder.end_element().unwrap();
        assert_eq!(link_of(&doc, 2), Link::Pending);

        builder.characters("text", TextFlags::NONE).unwrap();
        builder.start_element("c", &[]).unwrap();
        // flushing the text resolved b's link
        assert_eq!(link_of(&doc, 2), Link::Node(3));
        builder.end_element().unwrap();
        builder.end_element().unwrap();
        // c was last under root
        assert_eq!(link_of(&doc, 4), Link::End);
        assert_eq!(link_of(&doc, 1), Link::Pending);
        builder.end_document().unwrap();
        assert_eq!(link_of(&doc, 1), Link::End);
        assert_eq!(builder.state(), BuildState::DocumentClosed);
    }

    #[test]
    fn test_adjacent_text_merged() {
        let (mut builder, doc) = open();
        builder.start_element("p", &[]).unwrap();
        builder.characters("one ", TextFlags::NONE).unwrap();
        builder.characters("two", TextFlags::CDATA).unwrap();
        builder.end_element().unwrap();
        builder.end_document().unwrap();
        assert_eq!(doc.node_count(), 3);
        assert_eq!(doc.node_value(2).as_deref(), Some("one two"));
        assert!(!doc.is_cdata(2));
    }

    #[test]
    fn test_strip_ignorable_whitespace() {
        let config = TreeConfig::default().with_strip_ignorable_whitespace(true);
        let (mut builder, doc) = Builder::new(config);
        builder.start_document().unwrap();
        builder.start_element("list", &[]).unwrap();
        builder.characters("\n  ", TextFlags::IGNORABLE).unwrap();
        builder.start_element("item", &[]).unwrap();
        builder.end_element().unwrap();
        builder.end_element().unwrap();
        builder.end_document().unwrap();
        assert_eq!(doc.node_count(), 3);
        assert_eq!(doc.node_kind(2), NodeKind::Element);
    }

    #[test]
    fn test_namespaces_resolved() {
        let (mut builder, doc) = open();
        builder
            .start_element(
                "svg:svg",
                &[
                    AttributeEvent::new("xmlns:svg", "http://www.w3.org/2000/svg"),
                    AttributeEvent::new("xmlns", "urn:default"),
                ],
            )
            .unwrap();
        builder.start_element("g", &[AttributeEvent::new("svg:fill", "red")]).unwrap();
        builder.end_element().unwrap();
        builder.end_element().unwrap();
        builder.end_document().unwrap();

        assert_eq!(doc.namespace_uri(1).as_deref(), Some("http://www.w3.org/2000/svg"));
        assert_eq!(doc.namespace_uri(2).as_deref(), Some(ns::XMLNS));
        // g at 6, its attribute at 7
        assert_eq!(doc.namespace_uri(6).as_deref(), Some("urn:default"));
        assert_eq!(doc.namespace_uri(7).as_deref(), Some("http://www.w3.org/2000/svg"));
    }

    #[test]
    fn test_undeclared_prefix_strict_fails() {
        let (builder, doc) = Builder::new(TreeConfig::default());
        let mut builder = builder.with_error_handler(Arc::new(StrictErrorHandler));
        builder.start_document().unwrap();
        let err = builder.start_element("x:a", &[]).unwrap_err();
        assert!(matches!(err, TreeError::Construction(_)));
        assert_eq!(builder.state(), BuildState::Failed);
        assert!(doc.is_failed());
    }

    #[test]
    fn test_protocol_errors() {
        let (mut builder, _doc) = Builder::new(TreeConfig::default());
        let err = builder.start_element("a", &[]).unwrap_err();
        assert_eq!(
            err,
            TreeError::Protocol {
                state: "Idle",
                event: "start_element"
            }
        );
        assert_eq!(builder.state(), BuildState::Failed);
    }

    #[test]
    fn test_unbalanced_end_element() {
        let (mut builder, doc) = open();
        assert!(builder.end_element().is_err());
        assert!(doc.is_failed());
    }

    #[test]
    fn test_entity_chain() {
        let (mut builder, doc) = open();
        builder.entity_decl("one", "1").unwrap();
        builder.entity_decl("two", "2").unwrap();
        builder.entity_decl("one", "ignored").unwrap();
        assert_eq!(link_of(&doc, 1), Link::Node(3));
        assert_eq!(link_of(&doc, 3), Link::Pending);
        builder.start_element("root", &[]).unwrap();
        assert_eq!(link_of(&doc, 3), Link::End);
        assert!(builder.entity_decl("late", "x").is_err());
        assert_eq!(doc.entity("two").unwrap().unwrap().node, Some(3));
    }

    #[test]
    fn test_id_recorded() {
        let (mut builder, doc) = open();
        builder.start_element("a", &[AttributeEvent::id("id", "x")]).unwrap();
        builder.start_element("b", &[AttributeEvent::id("id", "x")]).unwrap();
        builder.end_element().unwrap();
        builder.end_element().unwrap();
        builder.end_document().unwrap();
        assert_eq!(doc.element_by_id("x"), Ok(Some(1)));
    }

    #[test]
    fn test_drop_fails_open_document() {
        let (builder, doc) = open();
        drop(builder);
        assert!(doc.is_failed());
        assert!(matches!(doc.first_child(0), Err(TreeError::Construction(_))));
    }

    #[test]
    fn test_split_qname() {
        assert_eq!(split_qname("svg:rect"), ("svg", "rect"));
        assert_eq!(split_qname("rect"), ("", "rect"));
    }
}
