//! Construction Event Contract
//!
//! Events a parser delivers while walking a document. Nesting must be
//! well formed:
//!
//! ```text
//! start_document
//!   ( start_element ... end_element | characters | comment
//!   | processing_instruction | entity_decl | entity_reference )*
//! end_document
//! ```
//!
//! Attributes arrive with their element, in source order, with ID-typeness
//! already decided by whoever read the DTD or schema.

use crate::error::{Result, TreeError};
use crate::table::TextFlags;

/// One attribute of a start-element event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeEvent<'a> {
    /// Qualified name as written (`xml:lang`, `xmlns:svg`, `id`)
    pub name: &'a str,
    /// Normalized value with references expanded
    pub value: &'a str,
    /// Declared ID-typed by the DTD or schema
    pub is_id: bool,
}

impl<'a> AttributeEvent<'a> {
    pub fn new(name: &'a str, value: &'a str) -> Self {
        AttributeEvent {
            name,
            value,
            is_id: false,
        }
    }

    pub fn id(name: &'a str, value: &'a str) -> Self {
        AttributeEvent {
            name,
            value,
            is_id: true,
        }
    }

    /// `xmlns` or `xmlns:*`
    #[inline]
    pub fn is_namespace_decl(&self) -> bool {
        self.name == "xmlns" || self.name.starts_with("xmlns:")
    }
}

/// Receiver of construction events
pub trait ContentHandler {
    fn start_document(&mut self) -> Result<()>;

    fn end_document(&mut self) -> Result<()>;

    fn start_element(&mut self, name: &str, attributes: &[AttributeEvent<'_>]) -> Result<()>;

    fn end_element(&mut self) -> Result<()>;

    /// Character data; adjacent runs may be merged by the receiver
    fn characters(&mut self, text: &str, flags: TextFlags) -> Result<()>;

    fn comment(&mut self, text: &str) -> Result<()>;

    fn processing_instruction(&mut self, target: &str, data: &str) -> Result<()>;

    /// General entity declared in the internal subset
    fn entity_decl(&mut self, name: &str, value: &str) -> Result<()>;

    /// Reference to an entity the parser did not expand
    fn entity_reference(&mut self, name: &str) -> Result<()>;

    /// The parser gave up; no further events follow
    fn fatal_error(&mut self, err: TreeError);
}
