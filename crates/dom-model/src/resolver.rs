use crate::model::{Document, NodeKey};

/// Tags a user can meaningfully act on.
pub const INTERACTIVE_TAGS: [&str; 12] = [
    "a", "button", "input", "select", "textarea", "details", "summary", "label", "option",
    "optgroup", "fieldset", "legend",
];

pub fn is_interactive(doc: &Document, node: NodeKey) -> bool {
    doc.element(node)
        .map(|element| INTERACTIVE_TAGS.contains(&element.tag.as_str()))
        .unwrap_or(false)
}

/// Best interactive element around `origin`.
///
/// For each depth `d` in `1..=max_depth` the ancestor exactly `d` element
/// levels up is tried first, then the elements exactly `d` levels below in
/// breadth-first order. Falls back to `origin`.
pub fn resolve_interactive(doc: &Document, origin: NodeKey, max_depth: usize) -> NodeKey {
    if is_interactive(doc, origin) {
        return origin;
    }

    let mut ancestor = Some(origin);
    let mut level: Vec<NodeKey> = vec![origin];
    for _ in 1..=max_depth {
        ancestor = ancestor.and_then(|node| doc.parent_element(node));
        if let Some(candidate) = ancestor {
            if is_interactive(doc, candidate) {
                return candidate;
            }
        }

        level = level
            .iter()
            .flat_map(|node| doc.element_children(*node))
            .collect();
        if let Some(found) = level.iter().copied().find(|node| is_interactive(doc, *node)) {
            return found;
        }
        if ancestor.is_none() && level.is_empty() {
            break;
        }
    }
    origin
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::NodeSpec;

    fn build(spec: NodeSpec) -> Document {
        Document::from_spec(
            "https://a.test/",
            &NodeSpec::element("html").child(NodeSpec::element("body").child(spec)),
        )
        .unwrap()
    }

    #[test]
    fn interactive_origin_resolves_to_itself() {
        let doc = build(NodeSpec::element("button").id("go"));
        let go = doc.find_by_id("go").unwrap();
        for depth in 0..5 {
            assert_eq!(resolve_interactive(&doc, go, depth), go);
        }
    }

    #[test]
    fn ancestor_beats_deeper_descendant() {
        let doc = build(
            NodeSpec::element("label").id("lbl").child(
                NodeSpec::element("div").id("origin").child(
                    NodeSpec::element("div").child(NodeSpec::element("input").id("deep")),
                ),
            ),
        );
        let origin = doc.find_by_id("origin").unwrap();
        assert_eq!(
            resolve_interactive(&doc, origin, 3),
            doc.find_by_id("lbl").unwrap()
        );
    }

    #[test]
    fn descendant_found_at_its_exact_depth() {
        let doc = build(
            NodeSpec::element("div").id("wrap").child(
                NodeSpec::element("span")
                    .child(NodeSpec::text("Buy"))
                    .child(NodeSpec::element("button").id("buy")),
            ),
        );
        let wrap = doc.find_by_id("wrap").unwrap();
        assert_eq!(
            resolve_interactive(&doc, wrap, 3),
            doc.find_by_id("buy").unwrap()
        );
        assert_eq!(resolve_interactive(&doc, wrap, 1), wrap);
    }

    #[test]
    fn breadth_first_order_among_same_level() {
        let doc = build(
            NodeSpec::element("div")
                .id("wrap")
                .child(NodeSpec::element("div").child(NodeSpec::element("a").id("first")))
                .child(NodeSpec::element("button").id("direct")),
        );
        let wrap = doc.find_by_id("wrap").unwrap();
        assert_eq!(
            resolve_interactive(&doc, wrap, 3),
            doc.find_by_id("direct").unwrap()
        );
    }

    #[test]
    fn no_match_returns_origin() {
        let doc = build(NodeSpec::element("div").id("plain"));
        let plain = doc.find_by_id("plain").unwrap();
        assert_eq!(resolve_interactive(&doc, plain, 3), plain);
    }
}
