//! `SimpleXml`: a minimal, allocate-everything XML tree used as the
//! reference `HostElement`/`HostDocument` implementation for this
//! crate's own tests and doctests. XML parsing is explicitly out of
//! scope for this engine (§1 "Non-goal: being an XML parser"); this is
//! deliberately small rather than a competing general-purpose parser —
//! production callers implement `HostElement` over `roxmltree`,
//! `sxd_document`, or similar instead.

use crate::host::{HostAttr, HostChild, HostDocument, HostElement, HostMisc};
use indexmap::IndexMap;

#[derive(Debug, Clone)]
struct RawAttr {
    prefix: Option<String>,
    local: String,
    ns_uri: Option<String>,
    value: String,
}

#[derive(Debug, Clone)]
enum RawChild {
    Element(usize),
    Comment(String),
    ProcessingInstruction(String, String),
}

#[derive(Debug, Clone)]
struct RawElement {
    prefix: Option<String>,
    local: String,
    ns_uri: Option<String>,
    attrs: Vec<RawAttr>,
    text: Option<String>,
    tail: Option<String>,
    children: Vec<RawChild>,
}

/// An in-memory XML document: a flat arena of `RawElement`s plus
/// document-level leading/trailing misc nodes.
pub struct SimpleXml {
    elements: Vec<RawElement>,
    root: usize,
    leading: Vec<RawMisc>,
    trailing: Vec<RawMisc>,
}

#[derive(Debug, Clone)]
enum RawMisc {
    Comment(String),
    ProcessingInstruction(String, String),
}

impl SimpleXml {
    /// Parse a small, deliberately permissive XML subset: elements,
    /// attributes, text, comments, and processing instructions. Not a
    /// conformant XML parser (no DTDs, no CDATA sections beyond a
    /// literal pass-through, minimal entity handling).
    pub fn parse(input: &str) -> Self {
        let mut p = RawParser { chars: input.chars().collect(), pos: 0, elements: Vec::new() };
        p.skip_whitespace();
        let mut leading = Vec::new();
        loop {
            p.skip_whitespace();
            if p.peek_str("<!--") {
                leading.push(RawMisc::Comment(p.parse_comment()));
            } else if p.peek_str("<?") {
                let (t, d) = p.parse_pi();
                leading.push(RawMisc::ProcessingInstruction(t, d));
            } else {
                break;
            }
        }
        p.skip_whitespace();
        let root = p.parse_element(IndexMap::new());
        let mut trailing = Vec::new();
        loop {
            p.skip_whitespace();
            if p.peek_str("<!--") {
                trailing.push(RawMisc::Comment(p.parse_comment()));
            } else if p.peek_str("<?") {
                let (t, d) = p.parse_pi();
                trailing.push(RawMisc::ProcessingInstruction(t, d));
            } else {
                break;
            }
        }
        SimpleXml { elements: p.elements, root, leading, trailing }
    }

    pub fn root(&self) -> SimpleElement<'_> {
        SimpleElement { doc: self, idx: self.root }
    }
}

/// Wraps a `&'d SimpleXml` so it can implement `HostDocument<'d>` — a
/// plain `impl HostDocument for SimpleXml` would need to borrow `self`
/// for the trait's `'d`, which a `&self` method can't express; borrowing
/// up front in the wrapper sidesteps that.
pub struct SimpleDoc<'d>(pub &'d SimpleXml);

impl<'d> HostDocument<'d> for SimpleDoc<'d> {
    type Element = SimpleElement<'d>;

    fn root_element(&self) -> Self::Element {
        SimpleElement { doc: self.0, idx: self.0.root }
    }

    fn leading_misc(&self) -> Vec<HostMisc<'d>> {
        self.0
            .leading
            .iter()
            .map(|m| match m {
                RawMisc::Comment(s) => HostMisc::Comment(s.as_str()),
                RawMisc::ProcessingInstruction(t, d) => HostMisc::ProcessingInstruction(t.as_str(), d.as_str()),
            })
            .collect()
    }

    fn trailing_misc(&self) -> Vec<HostMisc<'d>> {
        self.0
            .trailing
            .iter()
            .map(|m| match m {
                RawMisc::Comment(s) => HostMisc::Comment(s.as_str()),
                RawMisc::ProcessingInstruction(t, d) => HostMisc::ProcessingInstruction(t.as_str(), d.as_str()),
            })
            .collect()
    }
}

#[derive(Clone, Copy)]
pub struct SimpleElement<'d> {
    doc: &'d SimpleXml,
    idx: usize,
}

impl<'d> SimpleElement<'d> {
    fn raw(&self) -> &'d RawElement {
        &self.doc.elements[self.idx]
    }
}

impl<'d> HostElement<'d> for SimpleElement<'d> {
    fn tag_prefix(&self) -> Option<&'d str> {
        self.raw().prefix.as_deref()
    }

    fn tag_ns_uri(&self) -> Option<&'d str> {
        self.raw().ns_uri.as_deref()
    }

    fn tag_local(&self) -> &'d str {
        &self.raw().local
    }

    fn text(&self) -> Option<&'d str> {
        self.raw().text.as_deref()
    }

    fn tail(&self) -> Option<&'d str> {
        self.raw().tail.as_deref()
    }

    fn attributes(&self) -> Vec<HostAttr<'d>> {
        self.raw()
            .attrs
            .iter()
            .map(|a| HostAttr {
                prefix: a.prefix.as_deref(),
                ns_uri: a.ns_uri.as_deref(),
                local: a.local.as_str(),
                value: a.value.as_str(),
            })
            .collect()
    }

    fn children(&self) -> Vec<HostChild<'d, Self>> {
        self.raw()
            .children
            .iter()
            .map(|c| match c {
                RawChild::Element(i) => HostChild::Element(SimpleElement { doc: self.doc, idx: *i }),
                RawChild::Comment(s) => HostChild::Comment(s.as_str()),
                RawChild::ProcessingInstruction(t, d) => HostChild::ProcessingInstruction(t.as_str(), d.as_str()),
            })
            .collect()
    }

    fn host_identity(&self) -> usize {
        self.idx
    }
}

struct RawParser {
    chars: Vec<char>,
    pos: usize,
    elements: Vec<RawElement>,
}

impl RawParser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_str(&self, s: &str) -> bool {
        let needed = s.chars().count();
        if self.pos + needed > self.chars.len() {
            return false;
        }
        self.chars[self.pos..self.pos + needed].iter().collect::<String>() == s
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, s: &str) {
        for ch in s.chars() {
            let got = self.bump();
            assert_eq!(got, Some(ch), "expected {:?}", s);
        }
    }

    fn parse_comment(&mut self) -> String {
        self.expect("<!--");
        let start = self.pos;
        while !self.peek_str("-->") {
            self.bump();
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        self.expect("-->");
        text
    }

    fn parse_pi(&mut self) -> (String, String) {
        self.expect("<?");
        let target = self.parse_name();
        self.skip_whitespace();
        let start = self.pos;
        while !self.peek_str("?>") {
            self.bump();
        }
        let data: String = self.chars[start..self.pos].iter().collect();
        self.expect("?>");
        (target, data.trim().to_string())
    }

    fn parse_name(&mut self) -> String {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_' || c == '-' || c == '.' || c == ':') {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn split_qname(name: &str) -> (Option<String>, String) {
        match name.split_once(':') {
            Some((p, l)) => (Some(p.to_string()), l.to_string()),
            None => (None, name.to_string()),
        }
    }

    fn parse_element(&mut self, ns_scope: IndexMap<String, String>) -> usize {
        self.expect("<");
        let name = self.parse_name();
        let (prefix, local) = Self::split_qname(&name);

        let mut scope = ns_scope;
        let mut raw_attrs = Vec::new();
        loop {
            self.skip_whitespace();
            if self.peek() == Some('/') || self.peek() == Some('>') {
                break;
            }
            let attr_name = self.parse_name();
            self.skip_whitespace();
            self.expect("=");
            self.skip_whitespace();
            let value = self.parse_quoted();
            if attr_name == "xmlns" {
                scope.insert(String::new(), value);
            } else if let Some(p) = attr_name.strip_prefix("xmlns:") {
                scope.insert(p.to_string(), value);
            } else {
                raw_attrs.push((attr_name, value));
            }
        }

        let self_closing = self.peek() == Some('/');
        if self_closing {
            self.bump();
        }
        self.expect(">");

        let ns_uri = match &prefix {
            Some(p) => scope.get(p).cloned(),
            None => scope.get("").cloned(),
        };
        let attrs: Vec<RawAttr> = raw_attrs
            .into_iter()
            .map(|(n, v)| {
                let (ap, al) = Self::split_qname(&n);
                let auri = ap.as_ref().and_then(|p| scope.get(p).cloned());
                RawAttr { prefix: ap, local: al, ns_uri: auri, value: unescape(&v) }
            })
            .collect();

        let idx = self.elements.len();
        self.elements.push(RawElement {
            prefix,
            local,
            ns_uri,
            attrs,
            text: None,
            tail: None,
            children: Vec::new(),
        });

        if self_closing {
            return idx;
        }

        let mut leading_text = String::new();
        let mut children = Vec::new();
        let mut first_text_captured = false;
        let mut last_child: Option<usize> = None;

        loop {
            if self.peek_str("</") {
                break;
            } else if self.peek_str("<!--") {
                let c = self.parse_comment();
                if !first_text_captured {
                    self.elements[idx].text = non_empty(&leading_text);
                    first_text_captured = true;
                }
                children.push(RawChild::Comment(c));
                last_child = None;
            } else if self.peek_str("<?") {
                let (t, d) = self.parse_pi();
                if !first_text_captured {
                    self.elements[idx].text = non_empty(&leading_text);
                    first_text_captured = true;
                }
                children.push(RawChild::ProcessingInstruction(t, d));
                last_child = None;
            } else if self.peek() == Some('<') {
                let child_idx = self.parse_element(scope.clone());
                if !first_text_captured {
                    self.elements[idx].text = non_empty(&leading_text);
                    first_text_captured = true;
                }
                children.push(RawChild::Element(child_idx));
                last_child = Some(child_idx);
            } else if self.peek().is_some() {
                let start = self.pos;
                while matches!(self.peek(), Some(c) if c != '<') {
                    self.pos += 1;
                }
                let text: String = self.chars[start..self.pos].iter().collect();
                let text = unescape(&text);
                if first_text_captured {
                    if let Some(lc) = last_child {
                        self.elements[lc].tail = non_empty(&text);
                    }
                } else {
                    leading_text.push_str(&text);
                }
            } else {
                break;
            }
        }

        if !first_text_captured {
            self.elements[idx].text = non_empty(&leading_text);
        }

        self.expect("</");
        let _close_name = self.parse_name();
        self.skip_whitespace();
        self.expect(">");

        self.elements[idx].children = children;
        idx
    }

    fn parse_quoted(&mut self) -> String {
        let quote = self.bump().expect("quote");
        let start = self.pos;
        while self.peek() != Some(quote) {
            self.pos += 1;
        }
        let s: String = self.chars[start..self.pos].iter().collect();
        self.bump();
        s
    }
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

fn unescape(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_elements_and_attributes() {
        let doc = SimpleXml::parse(r#"<r><x a="10"/><x a="20"/></r>"#);
        let root = doc.root();
        let children = root.children();
        assert_eq!(children.len(), 2);
    }

    #[test]
    fn parses_text_content() {
        let doc = SimpleXml::parse("<root>hello</root>");
        assert_eq!(doc.root().text(), Some("hello"));
    }
}
