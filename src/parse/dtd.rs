//! Internal Subset Declarations
//!
//! Scans the DOCTYPE internal subset for the declarations that shape the
//! node table:
//! - `<!ENTITY name "value">` general entities
//! - `<!ATTLIST ...>` attribute types (ID-typed attributes) and defaults
//! - `<!ELEMENT ...>` content models (element-only content makes
//!   whitespace ignorable)
//!
//! Parameter entities, notations and external entities are recognized and
//! skipped. A malformed declaration is reported to the error handler,
//! which decides whether to skip it or abort.

use std::collections::HashMap;

use memchr::memmem;

use crate::error::{ErrorHandler, Recovery, Result, TreeError};

/// Declarations collected from one internal subset
#[derive(Debug, Default)]
pub struct DtdDeclarations {
    /// Element declarations: name -> content spec
    pub elements: HashMap<String, ContentSpec>,
    /// Attribute lists: element name -> attributes
    pub attlists: HashMap<String, Vec<AttDef>>,
    /// General entities: name -> literal value
    pub entities: HashMap<String, String>,
    /// Entity names in declaration order
    entity_order: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSpec {
    Empty,
    Any,
    Mixed(Vec<String>),
    /// Element-only content; the raw model is kept for diagnostics
    Children(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttDef {
    pub name: String,
    pub att_type: AttType,
    pub default: AttDefault,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttType {
    CData,
    Id,
    IdRef,
    IdRefs,
    Entity,
    Entities,
    NmToken,
    NmTokens,
    Notation(Vec<String>),
    Enumeration(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttDefault {
    Required,
    Implied,
    Fixed(String),
    Default(String),
}

impl AttDefault {
    /// Value to supply when the attribute is absent
    pub fn value(&self) -> Option<&str> {
        match self {
            AttDefault::Fixed(v) | AttDefault::Default(v) => Some(v),
            AttDefault::Required | AttDefault::Implied => None,
        }
    }
}

impl DtdDeclarations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan an internal subset; `base` is its byte offset in the source
    pub fn parse(subset: &str, base: usize, handler: &dyn ErrorHandler) -> Result<Self> {
        let mut dtd = DtdDeclarations::new();
        let mut cursor = Cursor::new(subset);

        loop {
            cursor.skip_ws();
            if cursor.is_eof() {
                break;
            }
            let start = cursor.pos;

            if cursor.starts_with("<!--") {
                if !cursor.skip_past("-->") {
                    report(handler, base + start, "unterminated comment in internal subset")?;
                    break;
                }
            } else if cursor.starts_with("<?") {
                if !cursor.skip_past("?>") {
                    report(handler, base + start, "unterminated processing instruction")?;
                    break;
                }
            } else if cursor.starts_with("<!") {
                cursor.advance(2);
                let keyword = cursor.read_name().unwrap_or_default();
                let Some(body) = cursor.read_decl_body() else {
                    report(handler, base + start, "unterminated declaration")?;
                    break;
                };
                let outcome = match keyword {
                    "ENTITY" => dtd.add_entity(body, handler),
                    "ATTLIST" => dtd.add_attlist(body),
                    "ELEMENT" => dtd.add_element(body),
                    "NOTATION" => Ok(()),
                    _ => Err(format!("unknown declaration '<!{}'", keyword)),
                };
                if let Err(msg) = outcome {
                    report(handler, base + start, &msg)?;
                }
            } else if cursor.starts_with("%") {
                // Parameter entity reference; not expanded
                if !cursor.skip_past(";") {
                    report(handler, base + start, "unterminated parameter entity reference")?;
                    break;
                }
            } else {
                report(handler, base + start, "unexpected content in internal subset")?;
                if !cursor.skip_to('<') {
                    break;
                }
            }
        }

        log::debug!(
            "internal subset: {} elements, {} attribute lists, {} entities",
            dtd.elements.len(),
            dtd.attlists.len(),
            dtd.entities.len()
        );
        Ok(dtd)
    }

    /// Declared ID-typed attribute
    pub fn is_id(&self, element: &str, attribute: &str) -> bool {
        self.attlists.get(element).is_some_and(|defs| {
            defs.iter()
                .any(|def| def.name == attribute && def.att_type == AttType::Id)
        })
    }

    /// Declared with an element-only content model
    pub fn is_element_only(&self, element: &str) -> bool {
        matches!(self.elements.get(element), Some(ContentSpec::Children(_)))
    }

    /// Attribute definitions of an element that supply a default value
    pub fn defaults<'a>(&'a self, element: &str) -> impl Iterator<Item = (&'a AttDef, &'a str)> + 'a {
        self.attlists
            .get(element)
            .into_iter()
            .flatten()
            .filter_map(|def| def.default.value().map(|value| (def, value)))
    }

    /// General entities in declaration order
    pub fn declared_entities(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.entity_order
            .iter()
            .filter_map(|name| self.entities.get(name).map(|v| (name.as_str(), v.as_str())))
    }

    fn add_entity(&mut self, body: &str, handler: &dyn ErrorHandler) -> std::result::Result<(), String> {
        let mut cursor = Cursor::new(body);
        cursor.skip_ws();
        if cursor.starts_with("%") {
            return Ok(());
        }
        let name = cursor
            .read_name()
            .ok_or("missing name in entity declaration")?
            .to_string();
        if !cursor.skip_ws() {
            return Err("whitespace required between entity name and value".to_string());
        }
        if cursor.starts_with("SYSTEM") || cursor.starts_with("PUBLIC") {
            handler.warning(&format!("external entity '{}' is not loaded", name));
            return Ok(());
        }
        let value = cursor
            .read_quoted()
            .ok_or_else(|| format!("missing value for entity '{}'", name))?;

        // First declaration wins
        if self.entities.contains_key(&name) {
            handler.warning(&format!("entity '{}' declared more than once", name));
            return Ok(());
        }
        self.entities.insert(name.clone(), value.to_string());
        self.entity_order.push(name);
        Ok(())
    }

    fn add_attlist(&mut self, body: &str) -> std::result::Result<(), String> {
        let mut cursor = Cursor::new(body);
        cursor.skip_ws();
        let element = cursor
            .read_name()
            .ok_or("missing element name in attribute-list declaration")?
            .to_string();

        let mut defs = Vec::new();
        loop {
            cursor.skip_ws();
            if cursor.is_eof() {
                break;
            }
            let name = cursor.read_name().ok_or("missing attribute name")?.to_string();
            cursor.skip_ws();
            let att_type = parse_att_type(&mut cursor)?;
            cursor.skip_ws();
            let default = parse_att_default(&mut cursor)?;
            defs.push(AttDef {
                name,
                att_type,
                default,
            });
        }

        let existing = self.attlists.entry(element).or_default();
        for def in defs {
            // First definition of an attribute wins
            if !existing.iter().any(|d| d.name == def.name) {
                existing.push(def);
            }
        }
        Ok(())
    }

    fn add_element(&mut self, body: &str) -> std::result::Result<(), String> {
        let mut cursor = Cursor::new(body);
        cursor.skip_ws();
        let name = cursor
            .read_name()
            .ok_or("missing name in element declaration")?
            .to_string();
        if !cursor.skip_ws() {
            return Err("whitespace required between element name and content specification".to_string());
        }
        let spec = parse_content_spec(cursor.rest()).map_err(str::to_string)?;
        if self.elements.contains_key(&name) {
            return Err(format!("element type '{}' declared more than once", name));
        }
        self.elements.insert(name, spec);
        Ok(())
    }
}

fn report(handler: &dyn ErrorHandler, position: usize, message: &str) -> Result<()> {
    let err = TreeError::parse(position, message);
    match handler.error(&err) {
        Recovery::Continue => Ok(()),
        Recovery::Abort => Err(err),
    }
}

fn parse_att_type(cursor: &mut Cursor<'_>) -> std::result::Result<AttType, String> {
    if cursor.starts_with("(") {
        return Ok(AttType::Enumeration(cursor.read_group()?));
    }
    let keyword = cursor.read_name().ok_or("missing attribute type")?;
    Ok(match keyword {
        "CDATA" => AttType::CData,
        "ID" => AttType::Id,
        "IDREF" => AttType::IdRef,
        "IDREFS" => AttType::IdRefs,
        "ENTITY" => AttType::Entity,
        "ENTITIES" => AttType::Entities,
        "NMTOKEN" => AttType::NmToken,
        "NMTOKENS" => AttType::NmTokens,
        "NOTATION" => {
            cursor.skip_ws();
            AttType::Notation(cursor.read_group()?)
        }
        other => return Err(format!("unknown attribute type '{}'", other)),
    })
}

fn parse_att_default(cursor: &mut Cursor<'_>) -> std::result::Result<AttDefault, String> {
    if cursor.starts_with("#REQUIRED") {
        cursor.advance("#REQUIRED".len());
        Ok(AttDefault::Required)
    } else if cursor.starts_with("#IMPLIED") {
        cursor.advance("#IMPLIED".len());
        Ok(AttDefault::Implied)
    } else if cursor.starts_with("#FIXED") {
        cursor.advance("#FIXED".len());
        cursor.skip_ws();
        let value = cursor.read_quoted().ok_or("missing #FIXED value")?;
        Ok(AttDefault::Fixed(value.to_string()))
    } else {
        let value = cursor.read_quoted().ok_or("missing attribute default")?;
        Ok(AttDefault::Default(value.to_string()))
    }
}

/// Parse content spec from DTD ELEMENT declaration
pub fn parse_content_spec(content: &str) -> std::result::Result<ContentSpec, &'static str> {
    let content = content.trim_start();

    if content.starts_with("EMPTY") {
        Ok(ContentSpec::Empty)
    } else if content.starts_with("ANY") {
        Ok(ContentSpec::Any)
    } else if let Some(inner) = content.strip_prefix('(') {
        if inner.trim_start().starts_with("#PCDATA") {
            Ok(ContentSpec::Mixed(parse_mixed_names(inner)))
        } else {
            Ok(ContentSpec::Children(content.trim_end().to_string()))
        }
    } else {
        Err("invalid content specification")
    }
}

/// Extract element names from mixed content: (#PCDATA|a|b)*
fn parse_mixed_names(content: &str) -> Vec<String> {
    let end = content.find(')').unwrap_or(content.len());
    content[..end]
        .split('|')
        .skip(1)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

#[inline]
fn is_xml_ws(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r')
}

#[inline]
fn is_name_char(b: u8) -> bool {
    matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'_' | b'-' | b'.' | b':') || b >= 0x80
}

/// Byte cursor over declaration text
struct Cursor<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str) -> Self {
        Cursor { input, pos: 0 }
    }

    #[inline]
    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    #[inline]
    fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    #[inline]
    fn starts_with(&self, prefix: &str) -> bool {
        self.rest().starts_with(prefix)
    }

    #[inline]
    fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.input.len());
    }

    /// Returns true if any whitespace was skipped
    fn skip_ws(&mut self) -> bool {
        let start = self.pos;
        while self.pos < self.input.len() && is_xml_ws(self.input.as_bytes()[self.pos]) {
            self.pos += 1;
        }
        self.pos > start
    }

    /// Move past the next occurrence of `pattern`
    fn skip_past(&mut self, pattern: &str) -> bool {
        match memmem::find(self.rest().as_bytes(), pattern.as_bytes()) {
            Some(offset) => {
                self.pos += offset + pattern.len();
                true
            }
            None => {
                self.pos = self.input.len();
                false
            }
        }
    }

    /// Move to the next occurrence of `ch`
    fn skip_to(&mut self, ch: char) -> bool {
        match self.rest().find(ch) {
            Some(offset) => {
                self.pos += offset;
                true
            }
            None => {
                self.pos = self.input.len();
                false
            }
        }
    }

    fn read_name(&mut self) -> Option<&'a str> {
        let start = self.pos;
        while self.pos < self.input.len() && is_name_char(self.input.as_bytes()[self.pos]) {
            self.pos += 1;
        }
        (self.pos > start).then(|| &self.input[start..self.pos])
    }

    fn read_quoted(&mut self) -> Option<&'a str> {
        let quote = *self.rest().as_bytes().first()?;
        if quote != b'"' && quote != b'\'' {
            return None;
        }
        let body = &self.rest()[1..];
        let end = body.find(quote as char)?;
        let value = &body[..end];
        self.pos += end + 2;
        Some(value)
    }

    /// Read `( a | b | c )` into its names
    fn read_group(&mut self) -> std::result::Result<Vec<String>, String> {
        if !self.starts_with("(") {
            return Err("expected '('".to_string());
        }
        let end = self.rest().find(')').ok_or("unterminated group")?;
        let names = self.rest()[1..end]
            .split('|')
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .collect();
        self.pos += end + 1;
        Ok(names)
    }

    /// Everything up to the closing `>` of a declaration, skipping quoted
    /// strings; the cursor moves past the `>`
    fn read_decl_body(&mut self) -> Option<&'a str> {
        let start = self.pos;
        let bytes = self.input.as_bytes();
        let mut quote: Option<u8> = None;
        while self.pos < bytes.len() {
            let b = bytes[self.pos];
            match quote {
                Some(q) if b == q => quote = None,
                Some(_) => {}
                None if b == b'"' || b == b'\'' => quote = Some(b),
                None if b == b'>' => {
                    let body = &self.input[start..self.pos];
                    self.pos += 1;
                    return Some(body);
                }
                None => {}
            }
            self.pos += 1;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{LogErrorHandler, StrictErrorHandler};

    const SUBSET: &str = r#"
        <!-- declarations -->
        <!ELEMENT list (item)*>
        <!ELEMENT item (#PCDATA|em)*>
        <!ELEMENT br EMPTY>
        <!ATTLIST item
            key   ID       #REQUIRED
            kind  (a|b)    "a"
            ver   CDATA    #FIXED "1.0">
        <!ENTITY company "Acme &amp; Co">
        <!ENTITY logo SYSTEM "logo.png">
        <!ENTITY % pe "ignored">
        <!NOTATION png SYSTEM "image/png">
        <?pi inside subset?>
        <!ENTITY company "second">
    "#;

    #[test]
    fn test_parse_declarations() {
        let dtd = DtdDeclarations::parse(SUBSET, 0, &LogErrorHandler).unwrap();
        assert!(dtd.is_element_only("list"));
        assert!(!dtd.is_element_only("item"));
        assert_eq!(dtd.elements.get("br"), Some(&ContentSpec::Empty));
        assert_eq!(
            dtd.elements.get("item"),
            Some(&ContentSpec::Mixed(vec!["em".to_string()]))
        );
        assert!(dtd.is_id("item", "key"));
        assert!(!dtd.is_id("item", "kind"));
        assert!(!dtd.is_id("list", "key"));
    }

    #[test]
    fn test_entities_first_wins_in_order() {
        let dtd = DtdDeclarations::parse(SUBSET, 0, &LogErrorHandler).unwrap();
        let entities: Vec<_> = dtd.declared_entities().collect();
        assert_eq!(entities, vec![("company", "Acme &amp; Co")]);
    }

    #[test]
    fn test_defaults() {
        let dtd = DtdDeclarations::parse(SUBSET, 0, &LogErrorHandler).unwrap();
        let defaults: Vec<_> = dtd
            .defaults("item")
            .map(|(def, value)| (def.name.as_str(), value))
            .collect();
        assert_eq!(defaults, vec![("kind", "a"), ("ver", "1.0")]);
        assert_eq!(dtd.defaults("list").count(), 0);
    }

    #[test]
    fn test_malformed_declaration_recovery() {
        let subset = r#"<!ATTLIST a x BOGUS #IMPLIED><!ENTITY ok "yes">"#;
        let dtd = DtdDeclarations::parse(subset, 0, &LogErrorHandler).unwrap();
        assert_eq!(dtd.entities.get("ok").map(String::as_str), Some("yes"));

        let err = DtdDeclarations::parse(subset, 40, &StrictErrorHandler).unwrap_err();
        assert!(matches!(err, TreeError::Parse { position: 40, .. }));
    }

    #[test]
    fn test_unterminated_declaration() {
        let err = DtdDeclarations::parse("<!ENTITY a \"b\"", 0, &StrictErrorHandler).unwrap_err();
        assert!(matches!(err, TreeError::Parse { .. }));
    }

    #[test]
    fn test_content_spec() {
        assert_eq!(parse_content_spec("ANY"), Ok(ContentSpec::Any));
        assert!(matches!(parse_content_spec(" (a, b?)"), Ok(ContentSpec::Children(_))));
        assert!(parse_content_spec("bogus").is_err());
    }
}
