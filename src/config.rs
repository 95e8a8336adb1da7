//! Configuration
//!
//! Tuning knobs for construction and the waiting protocol.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::table::chunked::MAX_CHUNK_BITS;

/// How payload strings are stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SymbolStrategy {
    /// Every payload goes through the deduplicating pool
    #[default]
    Interned,
    /// Names are interned; text payloads are appended without deduplication
    Appended,
}

/// Whether the builder runs on the caller's thread or its own
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuildMode {
    /// Drive the parser to the end before returning the document
    #[default]
    Synchronous,
    /// Run the parser on a dedicated thread; reads proceed concurrently
    Streaming,
}

/// Configuration for building and reading a document table
///
/// Fields are only set through the `with_*` setters, which keep them in
/// range.
#[derive(Debug, Clone)]
pub struct TreeConfig {
    /// Wake blocked readers every this many appended records (default: 10)
    pub(crate) wake_interval: usize,
    /// log2 of records per chunk (default: 10, i.e. 1024 records)
    pub(crate) chunk_bits: u32,
    /// Maximum number of chunks in the node table (default: 65536)
    pub(crate) max_chunks: usize,
    /// Upper bound on any single wait (default: none)
    pub(crate) wait_timeout: Option<Duration>,
    /// Payload storage strategy
    pub(crate) symbols: SymbolStrategy,
    /// Synchronous or streaming construction
    pub(crate) mode: BuildMode,
    /// Drop whitespace-only text in element-only content (default: false)
    pub(crate) strip_ignorable_whitespace: bool,
    /// Bytes of entity replacement text one document may expand (default: 1 MiB)
    pub(crate) max_entity_expansion: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            wake_interval: 10,
            chunk_bits: 10,
            max_chunks: 65536,
            wait_timeout: None,
            symbols: SymbolStrategy::Interned,
            mode: BuildMode::Synchronous,
            strip_ignorable_whitespace: false,
            max_entity_expansion: 1 << 20,
        }
    }
}

impl TreeConfig {
    /// Streaming configuration with defaults otherwise
    pub fn streaming() -> Self {
        Self {
            mode: BuildMode::Streaming,
            ..Self::default()
        }
    }

    pub fn with_wake_interval(mut self, records: usize) -> Self {
        self.wake_interval = records.max(1);
        self
    }

    pub fn with_chunk_bits(mut self, bits: u32) -> Self {
        self.chunk_bits = bits.clamp(1, MAX_CHUNK_BITS);
        self
    }

    pub fn with_max_chunks(mut self, chunks: usize) -> Self {
        self.max_chunks = chunks.max(1);
        self
    }

    pub fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = Some(timeout);
        self
    }

    pub fn with_symbols(mut self, symbols: SymbolStrategy) -> Self {
        self.symbols = symbols;
        self
    }

    pub fn with_mode(mut self, mode: BuildMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_strip_ignorable_whitespace(mut self, strip: bool) -> Self {
        self.strip_ignorable_whitespace = strip;
        self
    }

    /// Cap on expanded entity text; a document exceeding it fails to parse
    pub fn with_max_entity_expansion(mut self, bytes: usize) -> Self {
        self.max_entity_expansion = bytes;
        self
    }

    pub fn wake_interval(&self) -> usize {
        self.wake_interval
    }

    pub fn chunk_bits(&self) -> u32 {
        self.chunk_bits
    }

    pub fn max_chunks(&self) -> usize {
        self.max_chunks
    }

    pub fn wait_timeout(&self) -> Option<Duration> {
        self.wait_timeout
    }

    pub fn symbols(&self) -> SymbolStrategy {
        self.symbols
    }

    pub fn mode(&self) -> BuildMode {
        self.mode
    }

    pub fn strip_ignorable_whitespace(&self) -> bool {
        self.strip_ignorable_whitespace
    }

    pub fn max_entity_expansion(&self) -> usize {
        self.max_entity_expansion
    }

    /// Records per chunk
    #[inline]
    pub fn chunk_size(&self) -> usize {
        1 << self.chunk_bits
    }
}

/// Cancellation token shared between a caller and the table's wait points
///
/// Cancelling makes every current and future wait on the associated
/// document return [`TreeError::Cancelled`](crate::TreeError::Cancelled).
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Fire the token; waiters notice within one poll interval
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }
}
