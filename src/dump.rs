//! Diagnostic Dump
//!
//! One line per produced record:
//!
//! ```text
//! index kind parent next value
//! ```
//!
//! `parent` and `next` are node indices, `-` for none, and `next` is `?`
//! while still unresolved. The value is the name for named nodes and the
//! payload for text and comments, escaped so it never spans lines. The
//! listing is a debugging aid, not an exchange format.
//!
//! Dumping never waits for the builder; it lists whatever exists now.

use std::fmt::Write;

use crate::error::{Result, TreeError};
use crate::nav::Document;
use crate::table::{Fetch, Link, NodeId, NodeKind};

/// One parsed dump line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpLine {
    pub index: NodeId,
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub next: Link,
    pub value: String,
}

/// Render every record produced so far
pub fn dump(doc: &Document) -> String {
    let count = doc.node_count() as NodeId;
    let mut out = String::with_capacity(count as usize * 24);
    for index in 0..count {
        let kind = doc.node_kind(index);
        let parent = doc
            .parent(index)
            .map_or_else(|| "-".to_string(), |p| p.to_string());
        let next = match next_snapshot(doc, index) {
            Link::Pending => "?".to_string(),
            Link::End => "-".to_string(),
            Link::Node(n) => n.to_string(),
        };
        let _ = writeln!(
            out,
            "{} {} {} {} {}",
            index,
            kind.label(),
            parent,
            next,
            escape(&display_value(doc, index, kind))
        );
    }
    out
}

/// Read a listing produced by [`dump`]
pub fn parse_dump(text: &str) -> Result<Vec<DumpLine>> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.is_empty())
        .map(|(number, line)| parse_line(line).ok_or_else(|| TreeError::parse(number + 1, "malformed dump line")))
        .collect()
}

fn parse_line(line: &str) -> Option<DumpLine> {
    let mut fields = line.splitn(5, ' ');
    let index = fields.next()?.parse().ok()?;
    let kind = NodeKind::from_label(fields.next()?)?;
    let parent = match fields.next()? {
        "-" => None,
        p => Some(p.parse().ok()?),
    };
    let next = match fields.next()? {
        "?" => Link::Pending,
        "-" => Link::End,
        n => Link::Node(n.parse().ok()?),
    };
    let value = unescape(fields.next().unwrap_or(""));
    Some(DumpLine {
        index,
        kind,
        parent,
        next,
        value,
    })
}

fn display_value(doc: &Document, index: NodeId, kind: NodeKind) -> String {
    match kind {
        NodeKind::Document => String::new(),
        NodeKind::Text | NodeKind::Comment => doc.node_value(index).unwrap_or_default(),
        NodeKind::ProcessingInstruction => {
            let data = doc.node_value(index).unwrap_or_default();
            if data.is_empty() {
                doc.node_name(index)
            } else {
                format!("{} {}", doc.node_name(index), data)
            }
        }
        NodeKind::Element | NodeKind::Attribute | NodeKind::Entity | NodeKind::EntityReference => {
            doc.node_name(index)
        }
    }
}

/// Next sibling as currently known, without waiting
fn next_snapshot(doc: &Document, index: NodeId) -> Link {
    let tables = doc.tables();
    let record = tables.record(index);
    let kind = record.kind();
    if kind == NodeKind::Document {
        return Link::End;
    }
    if kind.is_linked() {
        return tables.nodes.link(index).map_or(Link::Pending, Link::from_raw);
    }
    let parent = record.parent();
    if parent.is_some_and(|p| tables.record(p).kind().has_value_node()) {
        return Link::End;
    }

    let mut next = index + 1;
    loop {
        match tables.fetch(next) {
            Fetch::Ready(candidate) if candidate.kind().has_value_node() => next += 2,
            Fetch::Ready(candidate) if candidate.parent() == parent => return Link::Node(next),
            Fetch::Ready(_) | Fetch::End => return Link::End,
            Fetch::Pending => return Link::Pending,
        }
    }
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out
}

fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
