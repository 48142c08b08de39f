//! Markup parsing and serialization.
//!
//! Parses the HTML-like output of component templates into detached DOM
//! nodes, and serializes subtrees back to markup. The grammar is small on
//! purpose: elements, attributes (quoted, unquoted, or bare), text, comments
//! (dropped), void elements, `/>` self-closing tags, and the five basic
//! character references.

use super::node::{NodeData, NodeId};
use super::tree::Dom;

/// Elements that never have children or a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// Errors from markup parsing.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MarkupError {
    #[error("unexpected end of markup at byte {position}: {message}")]
    UnexpectedEof { position: usize, message: String },
    #[error("mismatched closing tag at byte {position}: expected </{expected}>, found </{found}>")]
    MismatchedClose {
        position: usize,
        expected: String,
        found: String,
    },
    #[error("stray closing tag </{tag}> at byte {position}")]
    StrayClose { position: usize, tag: String },
    #[error("invalid tag at byte {position}")]
    InvalidTag { position: usize },
}

/// Parse `markup` into detached top-level nodes owned by `dom`.
///
/// On error, any nodes created so far are discarded.
pub fn parse_fragment(dom: &mut Dom, markup: &str) -> Result<Vec<NodeId>, MarkupError> {
    let mut parser = MarkupParser {
        src: markup,
        pos: 0,
        created: Vec::new(),
    };
    match parser.parse_nodes(dom, None) {
        Ok(roots) => Ok(roots),
        Err(err) => {
            for node in parser.created {
                dom.remove(node);
            }
            Err(err)
        }
    }
}

/// Serialize `node` including its own tag.
pub fn outer_html(dom: &Dom, node: NodeId) -> String {
    let mut out = String::new();
    write_node(dom, node, &mut out);
    out
}

/// Serialize the children of `node`.
pub fn inner_html(dom: &Dom, node: NodeId) -> String {
    let mut out = String::new();
    for &child in dom.children(node) {
        write_node(dom, child, &mut out);
    }
    out
}

fn write_node(dom: &Dom, node: NodeId, out: &mut String) {
    let Some(data) = dom.get(node) else {
        return;
    };
    if let Some(text) = &data.text {
        out.push_str(&escape(text, false));
        return;
    }
    out.push('<');
    out.push_str(&data.tag);
    for (name, value) in &data.attributes {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        out.push_str(&escape(value, true));
        out.push('"');
    }
    out.push('>');
    if VOID_ELEMENTS.contains(&data.tag.as_str()) {
        return;
    }
    for &child in dom.children(node) {
        write_node(dom, child, out);
    }
    out.push_str("</");
    out.push_str(&data.tag);
    out.push('>');
}

fn escape(input: &str, attribute: bool) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            other => out.push(other),
        }
    }
    out
}

fn unescape(input: &str) -> String {
    if !input.contains('&') {
        return input.to_owned();
    }
    input
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

struct MarkupParser<'a> {
    src: &'a str,
    pos: usize,
    /// Every node created, so a failed parse can be rolled back.
    created: Vec<NodeId>,
}

impl<'a> MarkupParser<'a> {
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn eof(&self, message: &str) -> MarkupError {
        MarkupError::UnexpectedEof {
            position: self.pos,
            message: message.to_owned(),
        }
    }

    fn skip_whitespace(&mut self) {
        let trimmed = self.rest().trim_start();
        self.pos = self.src.len() - trimmed.len();
    }

    /// Parse sibling nodes until end of input or the closing tag of `open`.
    fn parse_nodes(
        &mut self,
        dom: &mut Dom,
        open: Option<(NodeId, &str)>,
    ) -> Result<Vec<NodeId>, MarkupError> {
        let mut nodes = Vec::new();
        loop {
            if self.pos >= self.src.len() {
                return match open {
                    Some((_, tag)) => Err(self.eof(&format!("expected </{tag}>"))),
                    None => Ok(nodes),
                };
            }
            let rest = self.rest();
            if rest.starts_with("<!--") {
                let end = rest.find("-->").ok_or_else(|| self.eof("unterminated comment"))?;
                self.pos += end + 3;
            } else if rest.starts_with("</") {
                let start = self.pos;
                self.pos += 2;
                let found = self.read_name();
                self.skip_whitespace();
                if !self.rest().starts_with('>') {
                    return Err(MarkupError::InvalidTag { position: start });
                }
                self.pos += 1;
                return match open {
                    Some((_, tag)) if tag == found => Ok(nodes),
                    Some((_, tag)) => Err(MarkupError::MismatchedClose {
                        position: start,
                        expected: tag.to_owned(),
                        found,
                    }),
                    None => Err(MarkupError::StrayClose {
                        position: start,
                        tag: found,
                    }),
                };
            } else if rest.starts_with('<') {
                nodes.push(self.parse_element(dom)?);
            } else {
                let end = rest.find('<').unwrap_or(rest.len());
                let text = unescape(&rest[..end]);
                self.pos += end;
                let node = dom.create(NodeData::text(text));
                self.created.push(node);
                nodes.push(node);
            }
        }
    }

    fn read_name(&mut self) -> String {
        let rest = self.rest();
        let len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == ':'))
            .unwrap_or(rest.len());
        let name = rest[..len].to_ascii_lowercase();
        self.pos += len;
        name
    }

    fn parse_element(&mut self, dom: &mut Dom) -> Result<NodeId, MarkupError> {
        let start = self.pos;
        self.pos += 1;
        let tag = self.read_name();
        if tag.is_empty() {
            return Err(MarkupError::InvalidTag { position: start });
        }
        let mut data = NodeData::element(tag.clone());

        let self_closing = loop {
            self.skip_whitespace();
            let rest = self.rest();
            if rest.is_empty() {
                return Err(self.eof("unterminated start tag"));
            }
            if rest.starts_with("/>") {
                self.pos += 2;
                break true;
            }
            if rest.starts_with('>') {
                self.pos += 1;
                break false;
            }
            let name = self.read_name();
            if name.is_empty() {
                return Err(MarkupError::InvalidTag { position: self.pos });
            }
            self.skip_whitespace();
            let value = if self.rest().starts_with('=') {
                self.pos += 1;
                self.skip_whitespace();
                self.read_attr_value()?
            } else {
                String::new()
            };
            data.set_attr(&name, value);
        };

        let node = dom.create(data);
        self.created.push(node);
        if self_closing || VOID_ELEMENTS.contains(&tag.as_str()) {
            return Ok(node);
        }
        let children = self.parse_nodes(dom, Some((node, &tag)))?;
        for child in children {
            // Freshly created detached nodes cannot violate hierarchy rules.
            let _ = dom.append_child(node, child);
        }
        Ok(node)
    }

    fn read_attr_value(&mut self) -> Result<String, MarkupError> {
        let rest = self.rest();
        let quote = rest.chars().next().filter(|c| *c == '"' || *c == '\'');
        match quote {
            Some(q) => {
                let end = rest[1..]
                    .find(q)
                    .ok_or_else(|| self.eof("unterminated attribute value"))?;
                let value = unescape(&rest[1..1 + end]);
                self.pos += end + 2;
                Ok(value)
            }
            None => {
                let end = rest
                    .find(|c: char| c.is_whitespace() || c == '>')
                    .unwrap_or(rest.len());
                let value = unescape(&rest[..end]);
                self.pos += end;
                Ok(value)
            }
        }
    }
}
