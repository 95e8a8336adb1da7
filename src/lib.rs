//! streamxml - Streaming, table-based XML node store
//!
//! A parsed document is kept as a table of fixed-width node records that
//! can be navigated while the parse is still running:
//! - table: chunked node table, symbol tables, namespace/ID/entity side tables
//! - build: the construction event contract and the single-producer builder
//! - nav: document-order navigation that blocks until records exist
//! - parse: quick-xml adapter emitting construction events
//! - strategy: synchronous and streaming drivers
//! - dump: diagnostic listing of the table
//!
//! ```no_run
//! use streamxml::{Driver, TreeConfig};
//!
//! let (doc, handle) = Driver::new(TreeConfig::streaming())
//!     .build_str("<a id='x'><b/>text<c/></a>")
//!     .unwrap();
//! let a = doc.document_element().unwrap().unwrap();
//! let b = doc.first_child(a).unwrap();
//! handle.join().unwrap();
//! # let _ = b;
//! ```

pub mod build;
pub mod config;
pub mod dump;
pub mod error;
pub mod nav;
pub mod parse;
pub mod strategy;
pub mod table;

pub use build::{AttributeEvent, BuildState, Builder, ContentHandler};
pub use config::{BuildMode, CancelToken, SymbolStrategy, TreeConfig};
pub use dump::{dump, parse_dump, DumpLine};
pub use error::{ErrorHandler, LogErrorHandler, Recovery, Result, StrictErrorHandler, TreeError};
pub use nav::Document;
pub use parse::XmlParser;
pub use strategy::{BuildHandle, Driver};
pub use table::{
    EntityEntry, Link, LinkField, NamespaceId, NodeId, NodeKind, NodeRecord, SymbolId,
    SymbolTable, TextFlags, DOCUMENT_NODE,
};
