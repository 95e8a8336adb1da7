//! Node Records
//!
//! Each table slot holds four 32-bit words:
//!
//! ```text
//! word 0  kind and flags   bits 0-3 kind, bit 4 ignorable, bit 5 CDATA, bits 8-31 namespace id
//! word 1  parent index     NO_PARENT for the document node
//! word 2  link field       next sibling for structural kinds, payload symbol for leaves
//! word 3  name or payload  qualified name symbol, PI target, or 0
//! ```
//!
//! The packed form never leaves the `table` module; callers see [`NodeRecord`].

use super::strings::SymbolId;

/// Compact node identifier (index into the node table)
pub type NodeId = u32;

/// Interned namespace URI identifier, 0 = no namespace
pub type NamespaceId = u32;

/// The document node always lives at index 0
pub const DOCUMENT_NODE: NodeId = 0;

/// Stored in the parent word of the document node
pub(crate) const NO_PARENT: u32 = u32::MAX;

/// Raw link value: sibling not yet known
pub(crate) const LINK_PENDING: i32 = 0;
/// Raw link value: definitely no sibling
pub(crate) const LINK_END: i32 = -1;

/// Largest namespace id that fits in the kind word
pub(crate) const MAX_NAMESPACE_ID: u32 = (1 << 24) - 1;

const KIND_MASK: u32 = 0x0f;
const FLAG_IGNORABLE: u32 = 0x10;
const FLAG_CDATA: u32 = 0x20;
const NAMESPACE_SHIFT: u32 = 8;

/// Type of a node in the table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum NodeKind {
    /// Document root, always index 0
    Document = 0,
    /// Element node
    Element = 1,
    /// Attribute node, followed by exactly one text-value node
    Attribute = 2,
    /// Character data (including CDATA sections)
    Text = 3,
    /// Comment
    Comment = 4,
    /// Processing instruction
    ProcessingInstruction = 5,
    /// Declared entity, followed by exactly one text-value node
    Entity = 6,
    /// Unexpanded entity reference
    EntityReference = 7,
}

impl NodeKind {
    #[inline]
    fn from_bits(bits: u32) -> Self {
        match bits & KIND_MASK {
            0 => NodeKind::Document,
            1 => NodeKind::Element,
            2 => NodeKind::Attribute,
            3 => NodeKind::Text,
            4 => NodeKind::Comment,
            5 => NodeKind::ProcessingInstruction,
            6 => NodeKind::Entity,
            7 => NodeKind::EntityReference,
            other => panic!("corrupt node record: kind bits {}", other),
        }
    }

    /// Kinds whose link word is a next-sibling link rather than a payload
    #[inline]
    pub fn is_linked(self) -> bool {
        matches!(
            self,
            NodeKind::Element | NodeKind::Attribute | NodeKind::Entity | NodeKind::EntityReference
        )
    }

    /// Kinds that own a text-value node in the following slot
    #[inline]
    pub fn has_value_node(self) -> bool {
        matches!(self, NodeKind::Attribute | NodeKind::Entity)
    }

    /// Kinds that may have child records
    #[inline]
    pub fn can_have_children(self) -> bool {
        matches!(
            self,
            NodeKind::Document | NodeKind::Element | NodeKind::Attribute | NodeKind::Entity
        )
    }

    /// Short label used in diagnostics
    pub fn label(self) -> &'static str {
        match self {
            NodeKind::Document => "document",
            NodeKind::Element => "element",
            NodeKind::Attribute => "attribute",
            NodeKind::Text => "text",
            NodeKind::Comment => "comment",
            NodeKind::ProcessingInstruction => "pi",
            NodeKind::Entity => "entity",
            NodeKind::EntityReference => "entity-ref",
        }
    }

    /// Inverse of [`NodeKind::label`]
    pub fn from_label(label: &str) -> Option<Self> {
        Some(match label {
            "document" => NodeKind::Document,
            "element" => NodeKind::Element,
            "attribute" => NodeKind::Attribute,
            "text" => NodeKind::Text,
            "comment" => NodeKind::Comment,
            "pi" => NodeKind::ProcessingInstruction,
            "entity" => NodeKind::Entity,
            "entity-ref" => NodeKind::EntityReference,
            _ => return None,
        })
    }
}

/// Flags carried by text nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextFlags {
    /// Whitespace in element-only content
    pub ignorable: bool,
    /// Came from a CDATA section
    pub cdata: bool,
}

impl TextFlags {
    pub const NONE: TextFlags = TextFlags {
        ignorable: false,
        cdata: false,
    };

    pub const CDATA: TextFlags = TextFlags {
        ignorable: false,
        cdata: true,
    };

    pub const IGNORABLE: TextFlags = TextFlags {
        ignorable: true,
        cdata: false,
    };

    /// Flags for text merged from two adjacent runs
    #[inline]
    pub fn merge(self, other: TextFlags) -> TextFlags {
        TextFlags {
            ignorable: self.ignorable && other.ignorable,
            cdata: self.cdata && other.cdata,
        }
    }
}

/// Decoded state of a sibling link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Link {
    /// Not yet known; readers must wait and retry
    Pending,
    /// Definitely no next sibling
    End,
    /// Next sibling index
    Node(NodeId),
}

impl Link {
    #[inline]
    pub(crate) fn from_raw(raw: i32) -> Self {
        match raw {
            LINK_PENDING => Link::Pending,
            LINK_END => Link::End,
            n if n > 0 => Link::Node(n as NodeId),
            n => panic!("corrupt link field: {}", n),
        }
    }

    #[inline]
    pub(crate) fn to_raw(self) -> i32 {
        match self {
            Link::Pending => LINK_PENDING,
            Link::End => LINK_END,
            Link::Node(n) => n as i32,
        }
    }
}

/// What the link word holds for a given record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkField {
    /// Structural kinds: next-sibling link
    Sibling(Link),
    /// Leaf kinds: reference into the text store
    Payload(SymbolId),
}

/// A node record as seen by callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeRecord {
    pub kind: NodeKind,
    pub flags: TextFlags,
    pub namespace: NamespaceId,
    /// Structural parent; the owning element for attributes
    pub parent: Option<NodeId>,
    pub link: LinkField,
    /// Name symbol (elements, attributes, entities, PI targets), 0 otherwise
    pub name: SymbolId,
}

/// Packed four-word form stored in the table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RawRecord {
    pub words: [u32; 4],
}

impl RawRecord {
    /// Pack a record for storage
    pub fn pack(
        kind: NodeKind,
        flags: TextFlags,
        namespace: NamespaceId,
        parent: Option<NodeId>,
        link: i32,
        name: SymbolId,
    ) -> Self {
        debug_assert!(namespace <= MAX_NAMESPACE_ID);
        let mut word0 = kind as u32 | (namespace << NAMESPACE_SHIFT);
        if flags.ignorable {
            word0 |= FLAG_IGNORABLE;
        }
        if flags.cdata {
            word0 |= FLAG_CDATA;
        }
        RawRecord {
            words: [word0, parent.unwrap_or(NO_PARENT), link as u32, name],
        }
    }

    /// Structural record with an unresolved link
    pub fn linked(
        kind: NodeKind,
        namespace: NamespaceId,
        parent: NodeId,
        name: SymbolId,
    ) -> Self {
        Self::pack(kind, TextFlags::NONE, namespace, Some(parent), LINK_PENDING, name)
    }

    /// Leaf record carrying a payload reference
    pub fn leaf(
        kind: NodeKind,
        flags: TextFlags,
        parent: NodeId,
        payload: SymbolId,
        name: SymbolId,
    ) -> Self {
        Self::pack(kind, flags, 0, Some(parent), payload as i32, name)
    }

    #[inline]
    pub fn kind(&self) -> NodeKind {
        NodeKind::from_bits(self.words[0])
    }

    #[inline]
    pub fn flags(&self) -> TextFlags {
        TextFlags {
            ignorable: self.words[0] & FLAG_IGNORABLE != 0,
            cdata: self.words[0] & FLAG_CDATA != 0,
        }
    }

    #[inline]
    pub fn namespace(&self) -> NamespaceId {
        self.words[0] >> NAMESPACE_SHIFT
    }

    #[inline]
    pub fn parent(&self) -> Option<NodeId> {
        match self.words[1] {
            NO_PARENT => None,
            p => Some(p),
        }
    }

    #[inline]
    pub fn link_raw(&self) -> i32 {
        self.words[2] as i32
    }

    #[inline]
    pub fn payload(&self) -> SymbolId {
        self.words[2]
    }

    #[inline]
    pub fn name(&self) -> SymbolId {
        self.words[3]
    }

    /// Unpack into the public record form
    pub fn unpack(&self) -> NodeRecord {
        let kind = self.kind();
        let link = if kind.is_linked() {
            LinkField::Sibling(Link::from_raw(self.link_raw()))
        } else {
            LinkField::Payload(self.payload())
        };
        NodeRecord {
            kind,
            flags: self.flags(),
            namespace: self.namespace(),
            parent: self.parent(),
            link,
            name: self.name(),
        }
    }
}
