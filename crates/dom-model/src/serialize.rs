use crate::model::{Document, Element, NodeData, NodeKey};

/// Stands in for children cut off by a depth limit.
pub const PLACEHOLDER: &str = "...";

const VOID_ELEMENTS: [&str; 14] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

enum Frame {
    Enter(NodeKey, usize),
    Close(String),
}

/// Serialize `node` keeping every attribute; the child list of an element at
/// depth `max_depth - 1` is replaced by [`PLACEHOLDER`].
pub fn trim_depth(doc: &Document, node: NodeKey, max_depth: usize) -> String {
    let mut out = String::new();
    if max_depth == 0 {
        out.push_str(PLACEHOLDER);
        return out;
    }
    let mut stack = vec![Frame::Enter(node, 0)];
    while let Some(frame) = stack.pop() {
        let (key, depth) = match frame {
            Frame::Close(tag) => {
                close_tag(&mut out, &tag);
                continue;
            }
            Frame::Enter(key, depth) => (key, depth),
        };
        let Some(current) = doc.node(key) else {
            continue;
        };
        match &current.data {
            NodeData::Element(element) => {
                open_tag(&mut out, element);
                if is_void(&element.tag) {
                    continue;
                }
                if current.children.is_empty() {
                    close_tag(&mut out, &element.tag);
                } else if depth + 1 >= max_depth {
                    out.push_str(PLACEHOLDER);
                    close_tag(&mut out, &element.tag);
                } else {
                    stack.push(Frame::Close(element.tag.clone()));
                    for child in current.children.iter().rev() {
                        stack.push(Frame::Enter(*child, depth + 1));
                    }
                }
            }
            NodeData::Text(text) => escape_text(&mut out, text),
            NodeData::Comment(text) => push_comment(&mut out, text),
            NodeData::Document | NodeData::ShadowRoot => {}
        }
    }
    out
}

/// Snapshot of a node referenced by a typed event.
pub fn node_html(doc: &Document, node: NodeKey, max_depth: usize) -> String {
    match doc.node(node).map(|n| &n.data) {
        Some(NodeData::Element(_)) => trim_depth(doc, node, max_depth),
        Some(NodeData::Text(text)) => text.clone(),
        Some(NodeData::Comment(text)) => {
            let mut out = String::new();
            push_comment(&mut out, text);
            out
        }
        _ => String::new(),
    }
}

/// Full serialization without any depth limit.
pub fn outer_html(doc: &Document, node: NodeKey) -> String {
    trim_depth(doc, node, usize::MAX)
}

/// The document element with off-viewport subtrees, whitespace-only text
/// and comments left out.
pub fn visible_html(doc: &Document) -> String {
    let mut out = String::new();
    let Some(html) = doc.document_element() else {
        return out;
    };
    let mut stack = vec![Frame::Enter(html, 0)];
    while let Some(frame) = stack.pop() {
        let key = match frame {
            Frame::Close(tag) => {
                close_tag(&mut out, &tag);
                continue;
            }
            Frame::Enter(key, _) => key,
        };
        let Some(current) = doc.node(key) else {
            continue;
        };
        match &current.data {
            NodeData::Element(element) => {
                if !element.in_viewport {
                    continue;
                }
                open_tag(&mut out, element);
                if is_void(&element.tag) {
                    continue;
                }
                stack.push(Frame::Close(element.tag.clone()));
                for child in current.children.iter().rev() {
                    stack.push(Frame::Enter(*child, 0));
                }
            }
            NodeData::Text(text) if !text.trim().is_empty() => escape_text(&mut out, text),
            _ => {}
        }
    }
    out
}

fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

fn open_tag(out: &mut String, element: &Element) {
    out.push('<');
    out.push_str(&element.tag);
    for (name, value) in &element.attrs {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        escape_attr(out, value);
        out.push('"');
    }
    out.push('>');
}

fn close_tag(out: &mut String, tag: &str) {
    out.push_str("</");
    out.push_str(tag);
    out.push('>');
}

fn push_comment(out: &mut String, text: &str) {
    out.push_str("<!-- ");
    out.push_str(text);
    out.push_str(" -->");
}

fn escape_text(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
}

fn escape_attr(out: &mut String, value: &str) {
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
}
