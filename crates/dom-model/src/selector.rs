use crate::model::{Document, NodeData, NodeKey};

/// Tags whose subtrees never produce events.
pub const DENIED_TAGS: [&str; 2] = ["SCRIPT", "NOSCRIPT"];

/// CSS-like path for `node`, relative to `context` when given.
///
/// An id short-circuits to `#id`, a class list to `TAG.a.b`; otherwise the
/// element parents are walked until `context` (exclusive) or the top.
pub fn node_selector(doc: &Document, node: NodeKey, context: Option<NodeKey>) -> String {
    let mut segments: Vec<String> = Vec::new();
    let mut current = node;
    loop {
        let Some(data) = doc.node(current) else {
            segments.push("(unknown)".to_string());
            break;
        };
        if let Some(element) = data.as_element() {
            if !element.id().is_empty() {
                segments.push(format!("#{}", element.id()));
                break;
            }
            let classes: Vec<&str> = element.classes().collect();
            if !classes.is_empty() {
                segments.push(format!("{}.{}", data.node_name(), classes.join(".")));
                break;
            }
        }
        segments.push(segment_name(&data.data, data.node_name()));
        match doc.parent_element(current) {
            Some(parent) if Some(parent) != context => current = parent,
            _ => break,
        }
    }
    segments.reverse();
    segments.join(" > ")
}

fn segment_name(data: &NodeData, node_name: String) -> String {
    match data {
        NodeData::Text(_) => "(text)".to_string(),
        NodeData::Comment(_) => "(comment)".to_string(),
        _ if node_name.is_empty() => "(unknown)".to_string(),
        _ => node_name,
    }
}

/// False for empty selectors and for paths through a denied tag.
pub fn is_valid_selector(selector: &str) -> bool {
    if selector.is_empty() {
        return false;
    }
    let upper = selector.to_ascii_uppercase();
    !upper
        .split('>')
        .map(str::trim)
        .any(|part| DENIED_TAGS.contains(&part))
}
