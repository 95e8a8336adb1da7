//! Build Strategy Module
//!
//! Two ways of running the builder, selected by [`BuildMode`]:
//! - Synchronous: drive the event source to the end on the caller's
//!   thread, then hand out the document
//! - Streaming: run the event source on a dedicated thread and hand out
//!   the document immediately; reads block until the records they need
//!   have been produced
//!
//! Both modes return the same [`Document`] type with identical semantics.

pub mod streaming;

pub use streaming::BuildHandle;

use std::io::BufRead;
use std::sync::Arc;

use crate::build::{BuildState, Builder};
use crate::config::{BuildMode, TreeConfig};
use crate::error::{ErrorHandler, LogErrorHandler, Result, TreeError};
use crate::nav::Document;
use crate::parse::XmlParser;

/// Feeds an event source into a builder according to the configured mode
#[derive(Clone)]
pub struct Driver {
    config: TreeConfig,
    error_handler: Arc<dyn ErrorHandler>,
}

impl Driver {
    pub fn new(config: TreeConfig) -> Self {
        Driver {
            config,
            error_handler: Arc::new(LogErrorHandler),
        }
    }

    /// Error handler shared by the parser adapter and the builder
    pub fn with_error_handler(mut self, handler: Arc<dyn ErrorHandler>) -> Self {
        self.error_handler = handler;
        self
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// Parse XML from `source`
    ///
    /// In synchronous mode a construction error is returned directly. In
    /// streaming mode it surfaces through the readers and [`BuildHandle::join`].
    pub fn build<R>(&self, source: R) -> Result<(Document, BuildHandle)>
    where
        R: BufRead + Send + 'static,
    {
        let handler = Arc::clone(&self.error_handler);
        let expansion_limit = self.config.max_entity_expansion;
        self.build_with(move |builder| {
            XmlParser::new(source)
                .with_error_handler(handler)
                .with_expansion_limit(expansion_limit)
                .parse(builder)
        })
    }

    /// Parse XML from a string
    pub fn build_str(&self, xml: &str) -> Result<(Document, BuildHandle)> {
        self.build(std::io::Cursor::new(xml.as_bytes().to_vec()))
    }

    /// Run an arbitrary event source against a fresh builder
    ///
    /// The source must deliver a complete event sequence through
    /// `end_document`; stopping early fails the document.
    pub fn build_with<F>(&self, produce: F) -> Result<(Document, BuildHandle)>
    where
        F: FnOnce(&mut Builder) -> Result<()> + Send + 'static,
    {
        let (builder, document) = Builder::new(self.config.clone());
        let builder = builder.with_error_handler(Arc::clone(&self.error_handler));

        match self.config.mode {
            BuildMode::Synchronous => {
                run(builder, produce)?;
                Ok((document, BuildHandle::finished(Ok(()))))
            }
            BuildMode::Streaming => {
                let handle = streaming::spawn(move || run(builder, produce))?;
                Ok((document, handle))
            }
        }
    }
}

impl std::fmt::Debug for Driver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Driver").field("config", &self.config).finish()
    }
}

/// Drive `produce` to completion and make sure the document ends up
/// either closed or failed
fn run<F>(mut builder: Builder, produce: F) -> Result<()>
where
    F: FnOnce(&mut Builder) -> Result<()>,
{
    let result = produce(&mut builder);
    match result {
        Err(err) => {
            builder.fail(err.clone());
            Err(err)
        }
        Ok(()) if builder.state() != BuildState::DocumentClosed => {
            let err = TreeError::Construction(format!(
                "event source stopped in builder state {}",
                builder.state().label()
            ));
            builder.fail(err.clone());
            Err(err)
        }
        Ok(()) => Ok(()),
    }
}

impl Document {
    /// Parse a complete document synchronously with the default configuration
    pub fn parse_str(xml: &str) -> Result<Document> {
        Document::parse_str_with(xml, TreeConfig::default().with_mode(BuildMode::Synchronous))
    }

    /// Parse a complete document synchronously
    pub fn parse_str_with(xml: &str, config: TreeConfig) -> Result<Document> {
        let config = config.with_mode(BuildMode::Synchronous);
        let (document, _) = Driver::new(config).build_str(xml)?;
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::ContentHandler;
    use crate::error::StrictErrorHandler;
    use crate::table::TextFlags;

    #[test]
    fn test_synchronous_build() {
        let (doc, handle) = Driver::new(TreeConfig::default())
            .build_str("<a><b/>text</a>")
            .unwrap();
        assert!(handle.is_finished());
        assert_eq!(handle.join(), Ok(()));
        assert!(doc.is_done());
        assert_eq!(doc.node_count(), 4);
    }

    #[test]
    fn test_synchronous_error_returned() {
        let err = Driver::new(TreeConfig::default())
            .build_str("<a><b></a>")
            .unwrap_err();
        assert!(matches!(err, TreeError::Parse { .. }));
    }

    #[test]
    fn test_streaming_build() {
        let (doc, handle) = Driver::new(TreeConfig::streaming())
            .build_str("<a><b/><c/></a>")
            .unwrap();
        assert_eq!(doc.first_child(1).unwrap(), Some(2));
        assert_eq!(doc.next_sibling(2).unwrap(), Some(3));
        assert_eq!(handle.join(), Ok(()));
    }

    #[test]
    fn test_streaming_error_reaches_readers() {
        let (doc, handle) = Driver::new(TreeConfig::streaming())
            .with_error_handler(Arc::new(StrictErrorHandler))
            .build_str("<a><b>")
            .unwrap();
        assert!(matches!(doc.last_child(1), Err(TreeError::Parse { .. })));
        assert!(matches!(handle.join(), Err(TreeError::Parse { .. })));
    }

    #[test]
    fn test_expansion_limit_reaches_parser() {
        let xml = r#"<!DOCTYPE r [<!ENTITY big "0123456789abcdef">]><r>&big;&big;</r>"#;
        let config = TreeConfig::default().with_max_entity_expansion(20);
        let err = Driver::new(config).build_str(xml).unwrap_err();
        assert!(matches!(err, TreeError::Parse { .. }));

        let config = TreeConfig::default().with_max_entity_expansion(64);
        let (doc, _) = Driver::new(config).build_str(xml).unwrap();
        assert_eq!(doc.string_value(0).unwrap(), "0123456789abcdef".repeat(2));
    }

    #[test]
    fn test_incomplete_event_source_fails() {
        let (_, handle) = Driver::new(TreeConfig::streaming())
            .build_with(|builder| {
                builder.start_document()?;
                builder.start_element("a", &[])?;
                builder.characters("partial", TextFlags::NONE)
            })
            .unwrap();
        assert!(matches!(handle.join(), Err(TreeError::Construction(_))));
    }

    #[test]
    fn test_parse_str() {
        let doc = Document::parse_str("<r x='1'/>").unwrap();
        assert_eq!(doc.document_element().unwrap(), Some(1));
        assert_eq!(doc.node_value(2).as_deref(), Some("1"));
        assert!(Document::parse_str("<r>").is_err());
    }
}
