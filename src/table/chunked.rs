//! Chunked Node Table
//!
//! Append-only storage of four-word records. Records live in fixed-size
//! chunks that are allocated on demand and never moved, so an index handed
//! to a reader stays valid while the producer keeps growing the table.
//!
//! Publication protocol:
//! - the producer writes a record's words, then advances `len` (Release)
//! - readers load `len` (Acquire) before touching any word below it
//! - the link word of a structural record is the only word written after
//!   publication; it goes from 0 to a terminal value exactly once

use std::sync::atomic::{AtomicI32, AtomicU32, AtomicUsize, Ordering};
use std::sync::OnceLock;

use super::node::{NodeId, RawRecord};
use crate::error::{Result, TreeError};

/// One table slot
#[derive(Default)]
struct Slot {
    kind: AtomicU32,
    parent: AtomicU32,
    link: AtomicI32,
    name: AtomicU32,
}

type Chunk = Box<[Slot]>;

/// Largest chunk is 2^20 records
pub const MAX_CHUNK_BITS: u32 = 20;

/// Append-only, chunk-allocated array of node records
pub struct NodeTable {
    /// Chunk directory, fixed length; each entry is set at most once
    chunks: Box<[OnceLock<Chunk>]>,
    chunk_bits: u32,
    /// Number of published records
    len: AtomicUsize,
}

impl NodeTable {
    /// Create an empty table with `1 << chunk_bits` records per chunk
    ///
    /// Out-of-range arguments are clamped: chunks hold 2 to 2^20 records,
    /// and the whole table never holds more indices than a link can name.
    pub fn new(chunk_bits: u32, max_chunks: usize) -> Self {
        let chunk_bits = chunk_bits.clamp(1, MAX_CHUNK_BITS);
        let max_chunks = max_chunks.clamp(1, i32::MAX as usize >> chunk_bits);
        NodeTable {
            chunks: (0..max_chunks).map(|_| OnceLock::new()).collect(),
            chunk_bits,
            len: AtomicUsize::new(0),
        }
    }

    #[inline]
    fn chunk_size(&self) -> usize {
        1 << self.chunk_bits
    }

    /// Maximum number of records this table can hold
    pub fn capacity(&self) -> usize {
        (self.chunks.len() * self.chunk_size()).min(i32::MAX as usize)
    }

    /// Number of published records
    #[inline]
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of chunks allocated so far
    pub fn allocated_chunks(&self) -> usize {
        self.chunks.iter().take_while(|c| c.get().is_some()).count()
    }

    #[inline]
    fn slot(&self, index: usize) -> Option<&Slot> {
        let chunk = self.chunks.get(index >> self.chunk_bits)?.get()?;
        chunk.get(index & (self.chunk_size() - 1))
    }

    fn slot_for_write(&self, index: usize) -> Result<&Slot> {
        let chunk_index = index >> self.chunk_bits;
        let cell = self
            .chunks
            .get(chunk_index)
            .ok_or(TreeError::Capacity("node table is full"))?;
        let chunk = cell.get_or_init(|| {
            log::trace!("allocating node chunk {} ({} records)", chunk_index, self.chunk_size());
            (0..self.chunk_size()).map(|_| Slot::default()).collect()
        });
        Ok(&chunk[index & (self.chunk_size() - 1)])
    }

    /// Append one record and publish it. Single producer only.
    pub(crate) fn append(&self, record: RawRecord) -> Result<NodeId> {
        self.append_batch(std::slice::from_ref(&record))
    }

    /// Append several records and publish them together. Single producer only.
    ///
    /// Returns the index of the first record.
    pub(crate) fn append_batch(&self, records: &[RawRecord]) -> Result<NodeId> {
        let first = self.len.load(Ordering::Relaxed);
        if first + records.len() > self.capacity() {
            return Err(TreeError::Capacity("node table is full"));
        }
        for (offset, record) in records.iter().enumerate() {
            let slot = self.slot_for_write(first + offset)?;
            slot.kind.store(record.words[0], Ordering::Relaxed);
            slot.parent.store(record.words[1], Ordering::Relaxed);
            slot.link.store(record.words[2] as i32, Ordering::Relaxed);
            slot.name.store(record.words[3], Ordering::Relaxed);
        }
        self.len.store(first + records.len(), Ordering::Release);
        Ok(first as NodeId)
    }

    /// Index the next appended record will get
    #[inline]
    pub(crate) fn next_index(&self) -> NodeId {
        self.len.load(Ordering::Relaxed) as NodeId
    }

    /// Read a published record, `None` if not yet produced
    #[inline]
    pub(crate) fn read(&self, index: NodeId) -> Option<RawRecord> {
        let index = index as usize;
        if index >= self.len() {
            return None;
        }
        let slot = self.slot(index)?;
        Some(RawRecord {
            words: [
                slot.kind.load(Ordering::Relaxed),
                slot.parent.load(Ordering::Relaxed),
                slot.link.load(Ordering::Acquire) as u32,
                slot.name.load(Ordering::Relaxed),
            ],
        })
    }

    /// Current raw value of a published record's link word
    #[inline]
    pub(crate) fn link(&self, index: NodeId) -> Option<i32> {
        if index as usize >= self.len() {
            return None;
        }
        Some(self.slot(index as usize)?.link.load(Ordering::Acquire))
    }

    /// Backpatch a link word. The only mutation after publication.
    pub(crate) fn write_link(&self, index: NodeId, value: i32) {
        assert!(
            (index as usize) < self.len(),
            "write_link on unpublished node {}",
            index
        );
        if let Some(slot) = self.slot(index as usize) {
            slot.link.store(value, Ordering::Release);
        }
    }
}

impl std::fmt::Debug for NodeTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeTable")
            .field("len", &self.len())
            .field("chunk_size", &self.chunk_size())
            .field("allocated_chunks", &self.allocated_chunks())
            .finish()
    }
}
