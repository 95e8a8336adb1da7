//! Document-order navigation
//!
//! Records are laid out in document order, except that an element's
//! attributes (each followed by its value node) sit directly after the
//! element, and declared entities (also with value nodes) sit in the
//! prolog. Scans step over those pairs.
//!
//! An element is published together with all of its attributes, so
//! attribute queries never wait.

use super::Document;
use crate::error::Result;
use crate::table::monitor::Probe;
use crate::table::{NodeId, NodeKind, DOCUMENT_NODE};

/// Records that are not part of the child/descendant structure
#[inline]
fn is_detached(kind: NodeKind) -> bool {
    kind.has_value_node()
}

impl Document {
    /// First child in document order
    ///
    /// Attributes and entities have a single child, their value node.
    pub fn first_child(&self, node: NodeId) -> Result<Option<NodeId>> {
        let record = self.nav_record(node)?;
        let kind = record.kind();
        if kind.has_value_node() {
            return Ok(Some(node + 1));
        }
        if !kind.can_have_children() {
            return Ok(None);
        }

        let mut index = node + 1;
        while let Some(next) = self.wait_record(index)? {
            if is_detached(next.kind()) {
                index += 2;
                continue;
            }
            // The first structural record after a node is either its first
            // child or belongs to some other parent
            return Ok((next.parent() == Some(node)).then_some(index));
        }
        Ok(None)
    }

    /// Next sibling under the same parent
    ///
    /// Linked kinds read their link field, waiting while it is unresolved.
    /// Leaves look at the next structural record.
    pub fn next_sibling(&self, node: NodeId) -> Result<Option<NodeId>> {
        let record = self.nav_record(node)?;
        let kind = record.kind();
        if kind == NodeKind::Document {
            return Ok(None);
        }
        if kind.is_linked() {
            return self.tables().monitor.wait_for(|| self.tables().link(node));
        }
        if self.is_value_node(&record) {
            return Ok(None);
        }

        let parent = record.parent();
        let mut index = node + 1;
        while let Some(next) = self.wait_record(index)? {
            if is_detached(next.kind()) {
                index += 2;
                continue;
            }
            return Ok((next.parent() == parent).then_some(index));
        }
        Ok(None)
    }

    /// First attribute of an element
    pub fn first_attribute(&self, node: NodeId) -> Option<NodeId> {
        if self.raw(node).kind() != NodeKind::Element {
            return None;
        }
        let next = self.tables().nodes.read(node + 1)?;
        (next.kind() == NodeKind::Attribute && next.parent() == Some(node)).then_some(node + 1)
    }

    /// Next attribute of the same element
    ///
    /// Panics if `node` is not an attribute.
    pub fn next_attribute(&self, node: NodeId) -> Option<NodeId> {
        let kind = self.raw(node).kind();
        assert!(
            kind == NodeKind::Attribute,
            "next_attribute called on {} node {}",
            kind.label(),
            node
        );
        match self.tables().link(node) {
            Probe::Ready(next) => next,
            Probe::Pending => unreachable!("attribute links are resolved at publication"),
        }
    }

    /// Structural parent; the owning element for attributes
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.raw(node).parent()
    }

    /// Previous sibling, found by rescanning the parent's children
    ///
    /// Reverse links are not stored; this walks forward from the first
    /// sibling, so it costs O(preceding siblings).
    pub fn previous_sibling(&self, node: NodeId) -> Result<Option<NodeId>> {
        let record = self.nav_record(node)?;
        let first = match record.kind() {
            NodeKind::Document => return Ok(None),
            NodeKind::Attribute => match record.parent() {
                Some(owner) => self.first_attribute(owner),
                None => None,
            },
            NodeKind::Entity => self.first_entity()?,
            _ if self.is_value_node(&record) => return Ok(None),
            _ => match record.parent() {
                Some(parent) => self.first_child(parent)?,
                None => None,
            },
        };

        let mut previous = None;
        let mut current = first;
        while let Some(sibling) = current {
            if sibling == node {
                return Ok(previous);
            }
            previous = Some(sibling);
            current = self.next_sibling(sibling)?;
        }
        Ok(None)
    }

    /// Last child, found by walking the sibling chain; waits for the node
    /// to be complete
    pub fn last_child(&self, node: NodeId) -> Result<Option<NodeId>> {
        let mut last = None;
        let mut current = self.first_child(node)?;
        while let Some(child) = current {
            last = Some(child);
            current = self.next_sibling(child)?;
        }
        Ok(last)
    }

    /// Next node after `node` in document order that lies inside the
    /// subtree of `root`
    ///
    /// Attributes and their values are not descendants. Iterate by feeding
    /// each result back in, starting from `root` itself.
    pub fn next_descendant(&self, root: NodeId, node: NodeId) -> Result<Option<NodeId>> {
        let mut index = self.scan_start(node)?;
        while let Some(next) = self.wait_record(index)? {
            if is_detached(next.kind()) {
                index += 2;
                continue;
            }
            // Preorder: once outside the subtree, nothing later is inside
            return Ok(self.is_ancestor(root, index).then_some(index));
        }
        Ok(None)
    }

    /// Next node after `node` on the following axis of `context`
    ///
    /// The following axis holds every node after `context` in document
    /// order that is not one of its descendants, attributes excluded.
    /// Start with `node == context`.
    pub fn next_following(&self, context: NodeId, node: NodeId) -> Result<Option<NodeId>> {
        let mut index = self.scan_start(node)?;
        while let Some(next) = self.wait_record(index)? {
            if is_detached(next.kind()) {
                index += 2;
                continue;
            }
            if !self.is_ancestor(context, index) {
                return Ok(Some(index));
            }
            index += 1;
        }
        Ok(None)
    }

    /// Next node before `node`, in reverse document order, on the
    /// preceding axis of `context`
    ///
    /// Ancestors, attributes and entity declarations are excluded. Start
    /// with `node == context`. Everything before an existing node is
    /// already produced, so this never waits.
    pub fn next_preceding(&self, context: NodeId, node: NodeId) -> Option<NodeId> {
        let mut index = node;
        while index > DOCUMENT_NODE + 1 {
            index -= 1;
            let record = self.raw(index);
            if is_detached(record.kind()) || self.is_value_node(&record) {
                continue;
            }
            if self.is_ancestor(index, context) {
                continue;
            }
            return Some(index);
        }
        None
    }

    /// The node immediately before `node` in document order, which is
    /// either its parent or a preceding node
    ///
    /// Walking this repeatedly visits the preceding and ancestor axes
    /// together in reverse document order. `None` at the document node.
    pub fn preceding_or_ancestor_or_self(&self, node: NodeId) -> Option<NodeId> {
        let mut index = node;
        while index > DOCUMENT_NODE {
            index -= 1;
            let record = self.raw(index);
            if is_detached(record.kind()) || self.is_value_node(&record) {
                continue;
            }
            return Some(index);
        }
        None
    }

    /// Where a forward scan after `node` begins
    #[inline]
    fn scan_start(&self, node: NodeId) -> Result<NodeId> {
        if is_detached(self.nav_record(node)?.kind()) {
            Ok(node + 2)
        } else {
            Ok(node + 1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::{AttributeEvent, Builder, ContentHandler};
    use crate::config::TreeConfig;
    use crate::table::TextFlags;

    /// <a id="x" k="v"><b/>text<c><d/></c><!--z--></a>
    ///
    /// 0 doc, 1 a, 2 @id, 3 "x", 4 @k, 5 "v", 6 b, 7 text, 8 c, 9 d, 10 comment
    fn sample() -> Document {
        let (mut b, doc) = Builder::new(TreeConfig::default());
        b.start_document().unwrap();
        b.start_element("a", &[AttributeEvent::id("id", "x"), AttributeEvent::new("k", "v")])
            .unwrap();
        b.start_element("b", &[]).unwrap();
        b.end_element().unwrap();
        b.characters("text", TextFlags::NONE).unwrap();
        b.start_element("c", &[]).unwrap();
        b.start_element("d", &[]).unwrap();
        b.end_element().unwrap();
        b.end_element().unwrap();
        b.comment("z").unwrap();
        b.end_element().unwrap();
        b.end_document().unwrap();
        doc
    }

    #[test]
    fn test_child_and_sibling() {
        let doc = sample();
        assert_eq!(doc.first_child(0).unwrap(), Some(1));
        assert_eq!(doc.first_child(1).unwrap(), Some(6));
        assert_eq!(doc.next_sibling(6).unwrap(), Some(7));
        assert_eq!(doc.next_sibling(7).unwrap(), Some(8));
        assert_eq!(doc.next_sibling(8).unwrap(), Some(10));
        assert_eq!(doc.next_sibling(10).unwrap(), None);
        assert_eq!(doc.next_sibling(1).unwrap(), None);
        assert_eq!(doc.first_child(6).unwrap(), None);
        assert_eq!(doc.first_child(7).unwrap(), None);
        assert_eq!(doc.next_sibling(0).unwrap(), None);
    }

    #[test]
    fn test_attributes() {
        let doc = sample();
        assert_eq!(doc.first_attribute(1), Some(2));
        assert_eq!(doc.next_attribute(2), Some(4));
        assert_eq!(doc.next_attribute(4), None);
        assert_eq!(doc.first_attribute(6), None);
        assert_eq!(doc.first_attribute(7), None);
        assert_eq!(doc.parent(2), Some(1));
        assert_eq!(doc.first_child(2).unwrap(), Some(3));
        assert_eq!(doc.parent(3), Some(2));
        assert_eq!(doc.next_sibling(3).unwrap(), None);
    }

    #[test]
    #[should_panic(expected = "next_attribute called on element")]
    fn test_next_attribute_wrong_kind() {
        let doc = sample();
        doc.next_attribute(1);
    }

    #[test]
    fn test_backward_siblings() {
        let doc = sample();
        assert_eq!(doc.previous_sibling(6).unwrap(), None);
        assert_eq!(doc.previous_sibling(7).unwrap(), Some(6));
        assert_eq!(doc.previous_sibling(10).unwrap(), Some(8));
        assert_eq!(doc.previous_sibling(4).unwrap(), Some(2));
        assert_eq!(doc.previous_sibling(3).unwrap(), None);
        assert_eq!(doc.last_child(1).unwrap(), Some(10));
        assert_eq!(doc.last_child(8).unwrap(), Some(9));
        assert_eq!(doc.last_child(9).unwrap(), None);
    }

    #[test]
    fn test_descendants() {
        let doc = sample();
        let mut seen = Vec::new();
        let mut current = 1;
        while let Some(next) = doc.next_descendant(1, current).unwrap() {
            seen.push(next);
            current = next;
        }
        assert_eq!(seen, vec![6, 7, 8, 9, 10]);
        assert_eq!(doc.next_descendant(8, 8).unwrap(), Some(9));
        assert_eq!(doc.next_descendant(8, 9).unwrap(), None);
    }

    #[test]
    fn test_following() {
        let doc = sample();
        assert_eq!(doc.next_following(6, 6).unwrap(), Some(7));
        // skips c's descendant d
        assert_eq!(doc.next_following(8, 8).unwrap(), Some(10));
        assert_eq!(doc.next_following(8, 10).unwrap(), None);
        // following of an attribute starts with the owner's children
        assert_eq!(doc.next_following(2, 2).unwrap(), Some(6));
    }

    #[test]
    fn test_preceding() {
        let doc = sample();
        // preceding of d: text, b (c and a are ancestors)
        assert_eq!(doc.next_preceding(9, 9), Some(7));
        assert_eq!(doc.next_preceding(9, 7), Some(6));
        assert_eq!(doc.next_preceding(9, 6), None);
        assert_eq!(doc.next_preceding(10, 10), Some(9));
    }

    #[test]
    fn test_preceding_or_ancestor() {
        let doc = sample();
        assert_eq!(doc.preceding_or_ancestor_or_self(9), Some(8));
        assert_eq!(doc.preceding_or_ancestor_or_self(6), Some(1));
        assert_eq!(doc.preceding_or_ancestor_or_self(4), Some(1));
        assert_eq!(doc.preceding_or_ancestor_or_self(1), Some(0));
        assert_eq!(doc.preceding_or_ancestor_or_self(0), None);
    }

    #[test]
    fn test_element_by_id() {
        let doc = sample();
        assert_eq!(doc.element_by_id("x").unwrap(), Some(1));
        assert_eq!(doc.element_by_id("y").unwrap(), None);
    }

    #[test]
    fn test_entities_outside_child_axis() {
        let (mut b, doc) = Builder::new(TreeConfig::default());
        b.start_document().unwrap();
        b.comment("lead").unwrap();
        b.entity_decl("e1", "one").unwrap();
        b.entity_decl("e2", "two").unwrap();
        b.start_element("r", &[]).unwrap();
        b.entity_reference("e3").unwrap();
        b.end_element().unwrap();
        b.end_document().unwrap();

        // 0 doc, 1 comment, 2 e1, 3 value, 4 e2, 5 value, 6 r, 7 &e3;
        assert_eq!(doc.first_child(0).unwrap(), Some(1));
        assert_eq!(doc.next_sibling(1).unwrap(), Some(6));
        assert_eq!(doc.first_entity().unwrap(), Some(2));
        assert_eq!(doc.next_sibling(2).unwrap(), Some(4));
        assert_eq!(doc.next_sibling(4).unwrap(), None);
        assert_eq!(doc.previous_sibling(4).unwrap(), Some(2));
        assert_eq!(doc.first_child(4).unwrap(), Some(5));
        assert_eq!(doc.node_value(4).as_deref(), Some("two"));
        assert_eq!(doc.first_child(6).unwrap(), Some(7));
        assert_eq!(doc.next_sibling(7).unwrap(), None);
        assert_eq!(doc.preceding_or_ancestor_or_self(6), Some(1));
    }
}
