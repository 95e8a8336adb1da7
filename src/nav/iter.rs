//! Iterators built on the navigation primitives

use super::Document;
use crate::error::Result;
use crate::table::NodeId;

impl Document {
    /// Iterate over the children of a node
    ///
    /// Each step may wait for the builder; a failed wait is yielded once
    /// and ends the iteration.
    pub fn children(&self, node: NodeId) -> Children<'_> {
        Children {
            doc: self,
            state: ChildState::Start(node),
        }
    }

    /// Iterate over the attributes of an element
    pub fn attributes(&self, element: NodeId) -> Attributes<'_> {
        Attributes {
            doc: self,
            next: self.first_attribute(element),
        }
    }

    /// Iterate from the parent of `node` up to the document node
    pub fn ancestors(&self, node: NodeId) -> Ancestors<'_> {
        Ancestors {
            doc: self,
            next: self.parent(node),
        }
    }
}

enum ChildState {
    Start(NodeId),
    After(NodeId),
    Finished,
}

/// Iterator over child nodes
pub struct Children<'d> {
    doc: &'d Document,
    state: ChildState,
}

impl Iterator for Children<'_> {
    type Item = Result<NodeId>;

    fn next(&mut self) -> Option<Self::Item> {
        let step = match self.state {
            ChildState::Start(parent) => self.doc.first_child(parent),
            ChildState::After(previous) => self.doc.next_sibling(previous),
            ChildState::Finished => return None,
        };
        match step {
            Ok(Some(child)) => {
                self.state = ChildState::After(child);
                Some(Ok(child))
            }
            Ok(None) => {
                self.state = ChildState::Finished;
                None
            }
            Err(err) => {
                self.state = ChildState::Finished;
                Some(Err(err))
            }
        }
    }
}

impl std::iter::FusedIterator for Children<'_> {}

/// Iterator over attribute nodes
pub struct Attributes<'d> {
    doc: &'d Document,
    next: Option<NodeId>,
}

impl Iterator for Attributes<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.doc.next_attribute(current);
        Some(current)
    }
}

/// Iterator over ancestors, nearest first
pub struct Ancestors<'d> {
    doc: &'d Document,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.doc.parent(current);
        Some(current)
    }
}
