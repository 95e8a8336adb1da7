//! Reference Expansion
//!
//! Expands references in character data and attribute values:
//! - predefined entities: &lt; &gt; &amp; &quot; &apos;
//! - numeric character references: &#123; &#x7B;
//! - general entities declared in the internal subset (recursively)
//!
//! References to undeclared entities are handed back to the caller as
//! separate pieces so they can become entity-reference nodes.

use std::borrow::Cow;
use std::collections::HashMap;

use memchr::{memchr, memchr2};

use crate::error::{Result, TreeError};
use crate::table::entities::PREDEFINED;

/// Deepest nesting of entity expansions before giving up
const MAX_EXPANSION_DEPTH: usize = 16;

/// Bytes of entity replacement text a document may still expand
///
/// Shared across every expansion in one document, so nested entities that
/// multiply their output run out of budget instead of memory.
#[derive(Debug, Clone, Copy)]
pub struct ExpansionBudget {
    limit: usize,
    remaining: usize,
}

impl ExpansionBudget {
    pub fn new(limit: usize) -> Self {
        ExpansionBudget {
            limit,
            remaining: limit,
        }
    }

    pub fn remaining(&self) -> usize {
        self.remaining
    }

    fn spend(&mut self, bytes: usize) -> Result<()> {
        match self.remaining.checked_sub(bytes) {
            Some(left) => {
                self.remaining = left;
                Ok(())
            }
            None => Err(TreeError::Construction(format!(
                "entity expansion exceeds the limit of {} bytes",
                self.limit
            ))),
        }
    }
}

/// A piece of decoded content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Piece<'a> {
    Text(&'a str),
    /// Reference to an entity with no known value
    Reference(&'a str),
}

/// Normalize line ends: `\r\n` and lone `\r` become `\n`
pub fn normalize_line_ends(input: &str) -> Cow<'_, str> {
    if memchr(b'\r', input.as_bytes()).is_none() {
        return Cow::Borrowed(input);
    }
    Cow::Owned(input.replace("\r\n", "\n").replace('\r', "\n"))
}

/// Attribute-value normalization for literal whitespace characters
pub fn normalize_attribute(input: &str) -> Cow<'_, str> {
    let bytes = input.as_bytes();
    if memchr2(b'\n', b'\t', bytes).is_none() && memchr(b'\r', bytes).is_none() {
        return Cow::Borrowed(input);
    }
    let unified = normalize_line_ends(input);
    Cow::Owned(unified.replace(['\n', '\t'], " "))
}

/// Expand references in `input`, passing decoded pieces to `emit`
///
/// Adjacent decoded text is coalesced, so `emit` sees at most one text
/// piece between two references.
pub fn decode<F>(
    input: &str,
    declared: &HashMap<String, String>,
    budget: &mut ExpansionBudget,
    mut emit: F,
) -> Result<()>
where
    F: FnMut(Piece<'_>) -> Result<()>,
{
    // Fast path: no references at all
    if memchr(b'&', input.as_bytes()).is_none() {
        if !input.is_empty() {
            emit(Piece::Text(input))?;
        }
        return Ok(());
    }

    let mut buffer = String::with_capacity(input.len());
    expand_into(input, declared, 0, budget, &mut buffer, &mut emit)?;
    if !buffer.is_empty() {
        emit(Piece::Text(&buffer))?;
    }
    Ok(())
}

/// Expand to a single string; undeclared references are kept as written
pub fn decode_to_string(
    input: &str,
    declared: &HashMap<String, String>,
    budget: &mut ExpansionBudget,
) -> Result<String> {
    let mut out = String::with_capacity(input.len());
    decode(input, declared, budget, |piece| {
        match piece {
            Piece::Text(text) => out.push_str(text),
            Piece::Reference(name) => {
                out.push('&');
                out.push_str(name);
                out.push(';');
            }
        }
        Ok(())
    })?;
    Ok(out)
}

fn expand_into<F>(
    input: &str,
    declared: &HashMap<String, String>,
    depth: usize,
    budget: &mut ExpansionBudget,
    buffer: &mut String,
    emit: &mut F,
) -> Result<()>
where
    F: FnMut(Piece<'_>) -> Result<()>,
{
    if depth > MAX_EXPANSION_DEPTH {
        return Err(TreeError::Construction(
            "entity expansion nested too deeply (recursive entity?)".to_string(),
        ));
    }

    let bytes = input.as_bytes();
    let mut pos = 0;
    while pos < bytes.len() {
        let Some(amp) = memchr(b'&', &bytes[pos..]) else {
            buffer.push_str(&input[pos..]);
            break;
        };
        buffer.push_str(&input[pos..pos + amp]);
        pos += amp;

        let Some(semi) = memchr(b';', &bytes[pos..]) else {
            // No terminator, keep the ampersand
            buffer.push('&');
            pos += 1;
            continue;
        };
        let name = &input[pos + 1..pos + semi];
        if !is_reference_name(name) {
            buffer.push('&');
            pos += 1;
            continue;
        }
        pos += semi + 1;

        if let Some(digits) = name.strip_prefix('#') {
            match decode_char_ref(digits) {
                Some(c) => buffer.push(c),
                None => {
                    return Err(TreeError::Construction(format!(
                        "invalid character reference '&{};'",
                        name
                    )))
                }
            }
        } else if let Some(&(_, value)) = PREDEFINED.iter().find(|(n, _)| *n == name) {
            buffer.push_str(value);
        } else if let Some(value) = declared.get(name) {
            budget.spend(value.len())?;
            expand_into(value, declared, depth + 1, budget, buffer, emit)?;
        } else {
            if !buffer.is_empty() {
                emit(Piece::Text(buffer.as_str()))?;
                buffer.clear();
            }
            emit(Piece::Reference(name))?;
        }
    }
    Ok(())
}

#[inline]
fn is_reference_name(name: &str) -> bool {
    !name.is_empty()
        && !name
            .bytes()
            .any(|b| matches!(b, b' ' | b'\t' | b'\r' | b'\n' | b'&' | b'<'))
}

/// Decode the part of a character reference after `&#`
fn decode_char_ref(digits: &str) -> Option<char> {
    let codepoint = match digits.strip_prefix('x').or_else(|| digits.strip_prefix('X')) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => digits.parse::<u32>().ok()?,
    };
    if !is_valid_xml_char(codepoint) {
        return None;
    }
    char::from_u32(codepoint)
}

/// Check if a code point is a valid XML 1.0 Char
/// Char ::= #x9 | #xA | #xD | [#x20-#xD7FF] | [#xE000-#xFFFD] | [#x10000-#x10FFFF]
#[inline]
pub fn is_valid_xml_char(codepoint: u32) -> bool {
    matches!(codepoint,
        0x9 | 0xA | 0xD |
        0x20..=0xD7FF |
        0xE000..=0xFFFD |
        0x10000..=0x10FFFF
    )
}
