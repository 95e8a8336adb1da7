//! Error Types
//!
//! A single error enum covers parsing, construction, and the waiting protocol.
//! "No such node" is never an error: navigation returns `Ok(None)` for absence.

use std::time::Duration;
use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, TreeError>;

/// Errors surfaced by construction and navigation
///
/// Cloneable so one stored construction failure can be handed to every
/// reader that was waiting on the table.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// Grammar error reported by the parser adapter
    #[error("XML parse error at position {position}: {message}")]
    Parse { position: usize, message: String },

    /// Construction failed; readers that would block see this instead
    #[error("document construction failed: {0}")]
    Construction(String),

    /// An event arrived in a builder state that cannot accept it
    #[error("event '{event}' not allowed in builder state {state}")]
    Protocol {
        state: &'static str,
        event: &'static str,
    },

    /// Node table or namespace table is full
    #[error("capacity exceeded: {0}")]
    Capacity(&'static str),

    /// A wait point exceeded the configured timeout
    #[error("timed out after {0:?} waiting for the document builder")]
    Timeout(Duration),

    /// The cancellation token fired while waiting
    #[error("wait cancelled")]
    Cancelled,

    /// Reading the source failed
    #[error("I/O error: {0}")]
    Io(String),

    /// Payload was not valid UTF-8
    #[error("invalid UTF-8 in {0}")]
    Utf8(&'static str),
}

impl TreeError {
    /// Build a parse error from a quick-xml error and byte position
    pub fn parse(position: usize, err: impl std::fmt::Display) -> Self {
        TreeError::Parse {
            position,
            message: err.to_string(),
        }
    }

    /// True for errors produced by the waiting protocol rather than the document
    pub fn is_wait_error(&self) -> bool {
        matches!(self, TreeError::Timeout(_) | TreeError::Cancelled)
    }
}

impl From<std::io::Error> for TreeError {
    fn from(err: std::io::Error) -> Self {
        TreeError::Io(err.to_string())
    }
}

/// What the error handler wants done with a recoverable problem
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Skip the offending construct and keep building
    Continue,
    /// Treat the problem as fatal
    Abort,
}

/// Error-handling collaborator registered with the builder and parser adapter
pub trait ErrorHandler: Send + Sync {
    /// Non-fatal diagnostic
    fn warning(&self, message: &str) {
        log::warn!("{}", message);
    }

    /// Recoverable problem; the return value decides whether construction continues
    fn error(&self, err: &TreeError) -> Recovery;

    /// Construction is about to fail with this error
    fn fatal(&self, err: &TreeError);
}

/// Default handler: logs everything, skips recoverable problems
#[derive(Debug, Default, Clone, Copy)]
pub struct LogErrorHandler;

impl ErrorHandler for LogErrorHandler {
    fn error(&self, err: &TreeError) -> Recovery {
        log::warn!("recovering from: {}", err);
        Recovery::Continue
    }

    fn fatal(&self, err: &TreeError) {
        log::error!("{}", err);
    }
}

/// Handler that refuses to recover from anything
#[derive(Debug, Default, Clone, Copy)]
pub struct StrictErrorHandler;

impl ErrorHandler for StrictErrorHandler {
    fn error(&self, _err: &TreeError) -> Recovery {
        Recovery::Abort
    }

    fn fatal(&self, err: &TreeError) {
        log::error!("{}", err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display() {
        let err = TreeError::parse(42, "unexpected end of file");
        assert_eq!(
            err.to_string(),
            "XML parse error at position 42: unexpected end of file"
        );
    }

    #[test]
    fn test_wait_errors() {
        assert!(TreeError::Cancelled.is_wait_error());
        assert!(TreeError::Timeout(Duration::from_millis(5)).is_wait_error());
        assert!(!TreeError::Construction("boom".into()).is_wait_error());
    }

    #[test]
    fn test_handlers() {
        let err = TreeError::Construction("bad entity".into());
        assert_eq!(LogErrorHandler.error(&err), Recovery::Continue);
        assert_eq!(StrictErrorHandler.error(&err), Recovery::Abort);
    }
}
