//! Symbol Tables
//!
//! Strings are stored once in a flat buffer and referred to by small
//! integer ids. Two strategies share the same storage:
//! - `StringPool`: hash-indexed, identical strings get the same id
//! - `TextBuffer`: append-only, every call gets a fresh id
//!
//! Id 0 is reserved for the empty string in both.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};

/// Identifier of an interned string
pub type SymbolId = u32;

/// The empty string
pub const EMPTY_SYMBOL: SymbolId = 0;

/// A string store mapping strings to ids and back
///
/// The builder is the only writer; readers resolve ids concurrently
/// through the lock that owns the table.
pub trait SymbolTable: Send + Sync {
    /// Store a string and return its id
    fn intern(&mut self, s: &str) -> SymbolId;

    /// Resolve an id back to its string
    fn resolve(&self, id: SymbolId) -> Option<&str>;

    /// Find the id of an already stored string without inserting
    fn lookup(&self, s: &str) -> Option<SymbolId>;

    /// Number of ids handed out, including the reserved empty id
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() <= 1
    }
}

/// Flat byte storage addressed by (offset, length) entries
#[derive(Debug)]
struct Arena {
    /// Entries indexed by symbol id
    entries: Vec<(usize, usize)>,
    /// Concatenated string data
    data: String,
}

impl Arena {
    fn new() -> Self {
        let mut arena = Arena {
            entries: Vec::with_capacity(256),
            data: String::with_capacity(4096),
        };
        // Entry 0 is reserved for the empty string
        arena.entries.push((0, 0));
        arena
    }

    fn push(&mut self, s: &str) -> SymbolId {
        let offset = self.data.len();
        self.data.push_str(s);
        let id = self.entries.len() as SymbolId;
        self.entries.push((offset, s.len()));
        id
    }

    #[inline]
    fn get(&self, id: SymbolId) -> Option<&str> {
        let &(offset, len) = self.entries.get(id as usize)?;
        self.data.get(offset..offset + len)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Deduplicating string pool
#[derive(Debug)]
pub struct StringPool {
    arena: Arena,
    /// Hash of string content -> ids with that hash
    hash_index: HashMap<u64, Vec<SymbolId>>,
}

impl StringPool {
    pub fn new() -> Self {
        StringPool {
            arena: Arena::new(),
            hash_index: HashMap::new(),
        }
    }

    #[inline]
    fn compute_hash(s: &str) -> u64 {
        use std::collections::hash_map::DefaultHasher;
        let mut hasher = DefaultHasher::new();
        s.hash(&mut hasher);
        hasher.finish()
    }

    /// Get a string by id (inherent shortcut for the trait method)
    #[inline]
    pub fn get(&self, id: SymbolId) -> Option<&str> {
        self.arena.get(id)
    }

    /// Total bytes of string data stored
    pub fn bytes_used(&self) -> usize {
        self.arena.data.len()
    }
}

impl Default for StringPool {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable for StringPool {
    fn intern(&mut self, s: &str) -> SymbolId {
        if s.is_empty() {
            return EMPTY_SYMBOL;
        }

        let hash = Self::compute_hash(s);
        if let Some(ids) = self.hash_index.get(&hash) {
            for &id in ids {
                if self.arena.get(id) == Some(s) {
                    return id;
                }
            }
        }

        let id = self.arena.push(s);
        self.hash_index.entry(hash).or_default().push(id);
        id
    }

    fn resolve(&self, id: SymbolId) -> Option<&str> {
        self.arena.get(id)
    }

    fn lookup(&self, s: &str) -> Option<SymbolId> {
        if s.is_empty() {
            return Some(EMPTY_SYMBOL);
        }
        let ids = self.hash_index.get(&Self::compute_hash(s))?;
        ids.iter().copied().find(|&id| self.arena.get(id) == Some(s))
    }

    fn len(&self) -> usize {
        self.arena.len()
    }
}

/// Append-only text store
///
/// Suited to character data, which rarely repeats: no hashing, no index.
#[derive(Debug)]
pub struct TextBuffer {
    arena: Arena,
}

impl TextBuffer {
    pub fn new() -> Self {
        TextBuffer {
            arena: Arena::new(),
        }
    }
}

impl Default for TextBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable for TextBuffer {
    fn intern(&mut self, s: &str) -> SymbolId {
        if s.is_empty() {
            return EMPTY_SYMBOL;
        }
        self.arena.push(s)
    }

    fn resolve(&self, id: SymbolId) -> Option<&str> {
        self.arena.get(id)
    }

    fn lookup(&self, s: &str) -> Option<SymbolId> {
        if s.is_empty() {
            return Some(EMPTY_SYMBOL);
        }
        (1..self.arena.len() as SymbolId).find(|&id| self.arena.get(id) == Some(s))
    }

    fn len(&self) -> usize {
        self.arena.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_and_resolve() {
        let mut pool = StringPool::new();
        let id = pool.intern("hello");
        assert!(id > 0);
        assert_eq!(pool.resolve(id), Some("hello"));
    }

    #[test]
    fn test_intern_duplicate() {
        let mut pool = StringPool::new();
        let id1 = pool.intern("hello");
        let id2 = pool.intern("hello");
        let id3 = pool.intern("world");
        assert_eq!(id1, id2);
        assert_ne!(id1, id3);
        assert_eq!(pool.len(), 3);
    }

    #[test]
    fn test_empty_string() {
        let mut pool = StringPool::new();
        assert_eq!(pool.intern(""), EMPTY_SYMBOL);
        assert_eq!(pool.resolve(EMPTY_SYMBOL), Some(""));
        assert!(pool.is_empty());
    }

    #[test]
    fn test_lookup_does_not_insert() {
        let mut pool = StringPool::new();
        assert_eq!(pool.lookup("x"), None);
        assert_eq!(pool.len(), 1);
        let id = pool.intern("x");
        assert_eq!(pool.lookup("x"), Some(id));
    }

    #[test]
    fn test_text_buffer_never_dedups() {
        let mut text = TextBuffer::new();
        let id1 = text.intern("same");
        let id2 = text.intern("same");
        assert_ne!(id1, id2);
        assert_eq!(text.resolve(id1), Some("same"));
        assert_eq!(text.resolve(id2), Some("same"));
        assert_eq!(text.lookup("same"), Some(id1));
    }

    #[test]
    fn test_strategies_behind_trait_object() {
        let mut tables: Vec<Box<dyn SymbolTable>> =
            vec![Box::new(StringPool::new()), Box::new(TextBuffer::new())];
        for table in tables.iter_mut() {
            let id = table.intern("données");
            assert_eq!(table.resolve(id), Some("données"));
            assert_eq!(table.resolve(999), None);
        }
    }
}
