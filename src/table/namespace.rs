//! Namespace Context Stack
//!
//! One frame per open element, pushed on element start and popped on
//! element end. Elements without `xmlns*` attributes share a single empty
//! frame instead of allocating their own.

use std::sync::Arc;

use super::node::NamespaceId;
use super::strings::SymbolId;

/// Well-known namespace URIs
pub mod ns {
    pub const XML: &str = "http://www.w3.org/XML/1998/namespace";
    pub const XMLNS: &str = "http://www.w3.org/2000/xmlns/";
}

/// Bindings declared on one element: prefix symbol -> namespace id
///
/// Prefix symbol 0 (the empty string) is the default namespace; binding it
/// to namespace 0 undeclares the default.
#[derive(Debug, Default)]
pub struct NamespaceFrame {
    bindings: Vec<(SymbolId, NamespaceId)>,
}

impl NamespaceFrame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a binding; a later declaration of the same prefix replaces it
    pub fn declare(&mut self, prefix: SymbolId, namespace: NamespaceId) {
        if let Some(binding) = self.bindings.iter_mut().find(|(p, _)| *p == prefix) {
            binding.1 = namespace;
        } else {
            self.bindings.push((prefix, namespace));
        }
    }

    #[inline]
    fn get(&self, prefix: SymbolId) -> Option<NamespaceId> {
        self.bindings
            .iter()
            .find(|(p, _)| *p == prefix)
            .map(|&(_, ns)| ns)
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Stack of namespace frames
#[derive(Debug)]
pub struct NamespaceStack {
    frames: Vec<Arc<NamespaceFrame>>,
    /// Shared by every element that declares nothing
    empty: Arc<NamespaceFrame>,
}

impl NamespaceStack {
    /// Create a stack whose root frame binds the `xml` and `xmlns` prefixes
    pub fn new(xml_prefix: SymbolId, xml_ns: NamespaceId, xmlns_prefix: SymbolId, xmlns_ns: NamespaceId) -> Self {
        let mut root = NamespaceFrame::new();
        root.declare(xml_prefix, xml_ns);
        root.declare(xmlns_prefix, xmlns_ns);
        NamespaceStack {
            frames: vec![Arc::new(root)],
            empty: Arc::new(NamespaceFrame::new()),
        }
    }

    /// Enter an element that declared `frame`
    pub fn push(&mut self, frame: NamespaceFrame) {
        if frame.is_empty() {
            self.push_empty();
        } else {
            self.frames.push(Arc::new(frame));
        }
    }

    /// Enter an element with no declarations
    pub fn push_empty(&mut self) {
        self.frames.push(Arc::clone(&self.empty));
    }

    /// Leave an element; the root frame is never popped
    pub fn pop(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    /// Resolve a prefix to a namespace id, innermost frame first
    pub fn resolve(&self, prefix: SymbolId) -> Option<NamespaceId> {
        self.frames.iter().rev().find_map(|frame| frame.get(prefix))
    }

    /// Resolve the default namespace (0 when none is in scope)
    pub fn resolve_default(&self) -> NamespaceId {
        self.resolve(0).unwrap_or(0)
    }

    /// Number of open element frames
    pub fn depth(&self) -> usize {
        self.frames.len() - 1
    }

    /// True if the top frame is the shared empty sentinel
    pub fn top_is_shared(&self) -> bool {
        self.frames
            .last()
            .is_some_and(|frame| Arc::ptr_eq(frame, &self.empty))
    }
}
