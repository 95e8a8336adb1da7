//! Parse Module - quick-xml Adapter
//!
//! A "dumb" driver: reads XML from a `BufRead` source with quick-xml and
//! notifies a [`ContentHandler`] of each construction event. It owns the
//! grammar-side concerns the node table does not: reference expansion,
//! the internal subset, ID-typeness and ignorable whitespace.

pub mod dtd;
pub mod entities;

pub use dtd::DtdDeclarations;

use std::io::BufRead;
use std::sync::Arc;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::build::builder::is_xml_whitespace;
use crate::build::{AttributeEvent, ContentHandler};
use crate::config::TreeConfig;
use crate::error::{ErrorHandler, LogErrorHandler, Recovery, Result, TreeError};
use crate::table::TextFlags;
use entities::{ExpansionBudget, Piece};

/// Streams construction events from XML text
pub struct XmlParser<R: BufRead> {
    reader: Reader<R>,
    dtd: DtdDeclarations,
    error_handler: Arc<dyn ErrorHandler>,
    /// Per open element: declared with element-only content
    element_only: Vec<bool>,
    seen_root: bool,
    /// Entity replacement text this document may still expand
    budget: ExpansionBudget,
}

/// An attribute after expansion, before it is lent to the handler
struct OwnedAttribute {
    name: String,
    value: String,
    is_id: bool,
}

impl<R: BufRead> XmlParser<R> {
    pub fn new(source: R) -> Self {
        let mut reader = Reader::from_reader(source);
        reader
            .trim_text(false)
            .expand_empty_elements(false)
            .check_end_names(true);
        XmlParser {
            reader,
            dtd: DtdDeclarations::new(),
            error_handler: Arc::new(LogErrorHandler),
            element_only: Vec::new(),
            seen_root: false,
            budget: ExpansionBudget::new(TreeConfig::default().max_entity_expansion()),
        }
    }

    pub fn with_error_handler(mut self, handler: Arc<dyn ErrorHandler>) -> Self {
        self.error_handler = handler;
        self
    }

    /// Cap on the bytes of entity replacement text expanded in this document
    pub fn with_expansion_limit(mut self, bytes: usize) -> Self {
        self.budget = ExpansionBudget::new(bytes);
        self
    }

    /// Declarations read from the internal subset so far
    pub fn declarations(&self) -> &DtdDeclarations {
        &self.dtd
    }

    /// Drive `handler` from `start_document` through `end_document`
    ///
    /// On failure the handler is told through `fatal_error` before the
    /// error is returned.
    pub fn parse<H: ContentHandler + ?Sized>(&mut self, handler: &mut H) -> Result<()> {
        match self.run(handler) {
            Ok(()) => Ok(()),
            Err(err) => {
                handler.fatal_error(err.clone());
                Err(err)
            }
        }
    }

    fn run<H: ContentHandler + ?Sized>(&mut self, handler: &mut H) -> Result<()> {
        handler.start_document()?;
        let mut buf = Vec::new();

        loop {
            let position = self.reader.buffer_position();
            let event = self
                .reader
                .read_event_into(&mut buf)
                .map_err(|err| convert_error(position, err))?;

            match event {
                Event::Start(e) => {
                    self.start_element(&e, position, handler)?;
                    self.element_only.push(self.dtd.is_element_only(&utf8_name(&e)?));
                }
                Event::Empty(e) => {
                    self.start_element(&e, position, handler)?;
                    handler.end_element()?;
                }
                Event::End(_) => {
                    self.element_only.pop();
                    handler.end_element()?;
                }
                Event::Text(e) => {
                    let raw = std::str::from_utf8(&e).map_err(|_| TreeError::Utf8("text"))?;
                    self.characters(raw, position, handler)?;
                }
                Event::CData(e) => {
                    let text = std::str::from_utf8(&e).map_err(|_| TreeError::Utf8("CDATA section"))?;
                    if self.element_only.is_empty() {
                        return Err(TreeError::parse(position, "CDATA section outside the document element"));
                    }
                    let text = entities::normalize_line_ends(text);
                    handler.characters(&text, TextFlags::CDATA)?;
                }
                Event::Comment(e) => {
                    let text = std::str::from_utf8(&e).map_err(|_| TreeError::Utf8("comment"))?;
                    handler.comment(&entities::normalize_line_ends(text))?;
                }
                Event::PI(e) => {
                    let content = std::str::from_utf8(&e)
                        .map_err(|_| TreeError::Utf8("processing instruction"))?;
                    let (target, data) = split_pi(content);
                    handler.processing_instruction(target, &entities::normalize_line_ends(data))?;
                }
                Event::DocType(e) => {
                    if self.seen_root {
                        return Err(TreeError::parse(position, "DOCTYPE after the document element"));
                    }
                    let content = std::str::from_utf8(&e).map_err(|_| TreeError::Utf8("DOCTYPE"))?;
                    self.doctype(content, position, handler)?;
                }
                Event::Decl(_) => {}
                Event::Eof => break,
            }
            buf.clear();
        }

        if !self.element_only.is_empty() {
            return Err(TreeError::parse(
                self.reader.buffer_position(),
                format!("unexpected end of input: {} unclosed elements", self.element_only.len()),
            ));
        }
        if !self.seen_root {
            return Err(TreeError::parse(self.reader.buffer_position(), "no document element"));
        }
        handler.end_document()
    }

    fn start_element<H: ContentHandler + ?Sized>(
        &mut self,
        e: &BytesStart<'_>,
        position: usize,
        handler: &mut H,
    ) -> Result<()> {
        if self.element_only.is_empty() {
            if self.seen_root {
                return Err(TreeError::parse(position, "more than one document element"));
            }
            self.seen_root = true;
        }
        let name = utf8_name(e)?;

        let mut owned = Vec::new();
        for attr in e.attributes() {
            let attr = attr.map_err(|err| TreeError::parse(position, err))?;
            let key = std::str::from_utf8(attr.key.as_ref())
                .map_err(|_| TreeError::Utf8("attribute name"))?
                .to_string();
            let raw = std::str::from_utf8(&attr.value).map_err(|_| TreeError::Utf8("attribute value"))?;
            let value = self.attribute_value(raw, position)?;
            let is_id = key == "xml:id" || self.dtd.is_id(&name, &key);
            owned.push(OwnedAttribute {
                name: key,
                value,
                is_id,
            });
        }

        // Defaults declared in the internal subset
        for (def, value) in self.dtd.defaults(&name) {
            if owned.iter().any(|a| a.name == def.name) {
                continue;
            }
            let value = entities::decode_to_string(value, &self.dtd.entities, &mut self.budget)
                .map_err(|err| at_position(position, err))?;
            owned.push(OwnedAttribute {
                name: def.name.clone(),
                is_id: def.att_type == dtd::AttType::Id,
                value,
            });
        }

        let events: Vec<AttributeEvent<'_>> = owned
            .iter()
            .map(|a| AttributeEvent {
                name: &a.name,
                value: &a.value,
                is_id: a.is_id,
            })
            .collect();
        handler.start_element(&name, &events)
    }

    fn attribute_value(&mut self, raw: &str, position: usize) -> Result<String> {
        let normalized = entities::normalize_attribute(raw);
        let mut value = String::with_capacity(normalized.len());
        let mut unknown = None;
        entities::decode(&normalized, &self.dtd.entities, &mut self.budget, |piece| {
            match piece {
                Piece::Text(text) => value.push_str(text),
                Piece::Reference(name) => {
                    unknown.get_or_insert_with(|| name.to_string());
                    value.push('&');
                    value.push_str(name);
                    value.push(';');
                }
            }
            Ok(())
        })
        .map_err(|err| at_position(position, err))?;

        if let Some(name) = unknown {
            let err = TreeError::parse(position, format!("undeclared entity '{}' in attribute value", name));
            if self.error_handler.error(&err) == Recovery::Abort {
                return Err(err);
            }
        }
        Ok(value)
    }

    fn characters<H: ContentHandler + ?Sized>(
        &mut self,
        raw: &str,
        position: usize,
        handler: &mut H,
    ) -> Result<()> {
        let Some(&element_only) = self.element_only.last() else {
            if is_xml_whitespace(raw) {
                return Ok(());
            }
            return Err(TreeError::parse(position, "text outside the document element"));
        };

        let text = entities::normalize_line_ends(raw);
        entities::decode(&text, &self.dtd.entities, &mut self.budget, |piece| match piece {
            Piece::Text(text) => {
                let flags = if element_only && is_xml_whitespace(text) {
                    TextFlags::IGNORABLE
                } else {
                    TextFlags::NONE
                };
                handler.characters(text, flags)
            }
            Piece::Reference(name) => handler.entity_reference(name),
        })
        .map_err(|err| at_position(position, err))
    }

    fn doctype<H: ContentHandler + ?Sized>(
        &mut self,
        content: &str,
        position: usize,
        handler: &mut H,
    ) -> Result<()> {
        let Some(open) = content.find('[') else {
            return Ok(());
        };
        let close = content.rfind(']').filter(|&c| c > open).unwrap_or(content.len());
        let subset = &content[open + 1..close];
        self.dtd = DtdDeclarations::parse(subset, position + open + 1, self.error_handler.as_ref())?;

        for (name, literal) in self.dtd.declared_entities() {
            let value = entities::decode_to_string(literal, &self.dtd.entities, &mut self.budget)
                .map_err(|err| at_position(position, err))?;
            handler.entity_decl(name, &value)?;
        }
        Ok(())
    }
}

fn utf8_name(e: &BytesStart<'_>) -> Result<String> {
    std::str::from_utf8(e.name().as_ref())
        .map(str::to_string)
        .map_err(|_| TreeError::Utf8("element name"))
}

/// Split `target data` of a processing instruction
fn split_pi(content: &str) -> (&str, &str) {
    match content.find(|c: char| c.is_ascii_whitespace()) {
        Some(pos) => (&content[..pos], content[pos..].trim_start()),
        None => (content, ""),
    }
}

fn convert_error(position: usize, err: quick_xml::Error) -> TreeError {
    match err {
        quick_xml::Error::Io(io) => TreeError::Io(io.to_string()),
        other => TreeError::parse(position, other),
    }
}

/// Attach a source position to an expansion error
fn at_position(position: usize, err: TreeError) -> TreeError {
    match err {
        TreeError::Construction(message) => TreeError::Parse { position, message },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records events as strings
    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl ContentHandler for Recorder {
        fn start_document(&mut self) -> Result<()> {
            self.events.push("start-doc".into());
            Ok(())
        }
        fn end_document(&mut self) -> Result<()> {
            self.events.push("end-doc".into());
            Ok(())
        }
        fn start_element(&mut self, name: &str, attributes: &[AttributeEvent<'_>]) -> Result<()> {
            let attrs: Vec<String> = attributes
                .iter()
                .map(|a| format!("{}={}{}", a.name, a.value, if a.is_id { "#id" } else { "" }))
                .collect();
            self.events.push(format!("<{} {}>", name, attrs.join(" ")));
            Ok(())
        }
        fn end_element(&mut self) -> Result<()> {
            self.events.push("</>".into());
            Ok(())
        }
        fn characters(&mut self, text: &str, flags: TextFlags) -> Result<()> {
            let tag = if flags.cdata {
                "cdata"
            } else if flags.ignorable {
                "ws"
            } else {
                "text"
            };
            self.events.push(format!("{}:{}", tag, text));
            Ok(())
        }
        fn comment(&mut self, text: &str) -> Result<()> {
            self.events.push(format!("comment:{}", text));
            Ok(())
        }
        fn processing_instruction(&mut self, target: &str, data: &str) -> Result<()> {
            self.events.push(format!("pi:{}:{}", target, data));
            Ok(())
        }
        fn entity_decl(&mut self, name: &str, value: &str) -> Result<()> {
            self.events.push(format!("entity:{}={}", name, value));
            Ok(())
        }
        fn entity_reference(&mut self, name: &str) -> Result<()> {
            self.events.push(format!("ref:{}", name));
            Ok(())
        }
        fn fatal_error(&mut self, err: TreeError) {
            self.events.push(format!("fatal:{}", err));
        }
    }

    fn events(xml: &str) -> Vec<String> {
        let mut recorder = Recorder::default();
        XmlParser::new(xml.as_bytes()).parse(&mut recorder).unwrap();
        recorder.events
    }

    #[test]
    fn test_basic_events() {
        let got = events(r#"<?xml version="1.0"?><a x="1 &amp; 2"><b/>t&lt;<!--c--><?go now?><![CDATA[<raw>]]></a>"#);
        assert_eq!(
            got,
            vec![
                "start-doc",
                "<a x=1 & 2>",
                "<b >",
                "</>",
                "text:t<",
                "comment:c",
                "pi:go:now",
                "cdata:<raw>",
                "</>",
                "end-doc",
            ]
        );
    }

    #[test]
    fn test_doctype_entities_ids_and_whitespace() {
        let xml = r#"<!DOCTYPE list [
            <!ELEMENT list (item)*>
            <!ATTLIST item key ID #REQUIRED lang CDATA "en">
            <!ENTITY who "world">
        ]>
        <list>
            <item key="k1">hello &who; &ext;</item>
        </list>"#;
        let got = events(xml);
        assert_eq!(
            got,
            vec![
                "start-doc",
                "entity:who=world",
                "<list >",
                "ws:\n            ",
                "<item key=k1#id lang=en>",
                "text:hello world ",
                "ref:ext",
                "</>",
                "ws:\n        ",
                "</>",
                "end-doc",
            ]
        );
    }

    #[test]
    fn test_xml_id_always_id_typed() {
        let got = events(r#"<r xml:id="top"/>"#);
        assert_eq!(got[1], "<r xml:id=top#id>");
    }

    #[test]
    fn test_unclosed_element_is_fatal() {
        let mut recorder = Recorder::default();
        let err = XmlParser::new("<a><b></b>".as_bytes())
            .parse(&mut recorder)
            .unwrap_err();
        assert!(matches!(err, TreeError::Parse { .. }));
        assert!(recorder.events.last().unwrap().starts_with("fatal:"));
    }

    #[test]
    fn test_mismatched_end_tag_is_fatal() {
        let mut recorder = Recorder::default();
        let err = XmlParser::new("<a></b>".as_bytes())
            .parse(&mut recorder)
            .unwrap_err();
        assert!(matches!(err, TreeError::Parse { .. }));
    }

    #[test]
    fn test_text_outside_root_rejected() {
        let mut recorder = Recorder::default();
        assert!(XmlParser::new("<a/>junk".as_bytes()).parse(&mut recorder).is_err());
        let mut recorder = Recorder::default();
        assert!(XmlParser::new("<a/><b/>".as_bytes()).parse(&mut recorder).is_err());
    }

    #[test]
    fn test_strict_handler_rejects_undeclared_attribute_entity() {
        let mut recorder = Recorder::default();
        let mut parser = XmlParser::new(r#"<a v="&nope;"/>"#.as_bytes())
            .with_error_handler(Arc::new(crate::error::StrictErrorHandler));
        assert!(parser.parse(&mut recorder).is_err());

        // The default handler keeps the reference text
        let got = events(r#"<a v="&nope;"/>"#);
        assert_eq!(got[1], "<a v=&nope;>");
    }

    fn laughs(levels: usize) -> String {
        let mut xml = String::from("<!DOCTYPE r [<!ENTITY l0 \"ha\">");
        for level in 1..levels {
            xml.push_str(&format!("<!ENTITY l{} \"{}\">", level, format!("&l{};", level - 1).repeat(10)));
        }
        xml.push_str(&format!("]><r>&l{};</r>", levels - 1));
        xml
    }

    #[test]
    fn test_nested_entity_blowup_is_fatal() {
        let mut recorder = Recorder::default();
        let err = XmlParser::new(laughs(7).as_bytes())
            .parse(&mut recorder)
            .unwrap_err();
        assert!(matches!(err, TreeError::Parse { ref message, .. } if message.contains("limit")));
        assert!(recorder.events.last().unwrap().starts_with("fatal:"));
        assert!(!recorder.events.iter().any(|e| e.starts_with("text:")));
    }

    #[test]
    fn test_expansion_limit_configurable() {
        let xml = laughs(3);
        let mut recorder = Recorder::default();
        XmlParser::new(xml.as_bytes()).parse(&mut recorder).unwrap();
        assert!(recorder.events.contains(&format!("text:{}", "ha".repeat(100))));

        let mut recorder = Recorder::default();
        let err = XmlParser::new(xml.as_bytes())
            .with_expansion_limit(100)
            .parse(&mut recorder)
            .unwrap_err();
        assert!(matches!(err, TreeError::Parse { .. }));
    }

    #[test]
    fn test_split_pi() {
        assert_eq!(split_pi("target  some data"), ("target", "some data"));
        assert_eq!(split_pi("bare"), ("bare", ""));
    }
}
