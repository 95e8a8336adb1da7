//! Build Module - Streaming Construction
//!
//! Parser events flow into the [`Builder`], the single producer of a
//! document's tables. Readers may navigate the same document while the
//! builder is still appending.

pub mod builder;
pub mod handler;

pub use builder::{BuildState, Builder};
pub use handler::{AttributeEvent, ContentHandler};
