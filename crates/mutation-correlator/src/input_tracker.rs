use std::collections::HashMap;

use dom_model::{Document, NodeKey, NodeRegistry};
use tracing::{debug, info};

/// Input types whose value is compared on blur.
const TEXT_INPUT_TYPES: [&str; 7] = ["text", "search", "email", "url", "tel", "password", "number"];

/// Clicks on these never reach the mutation pipeline.
pub fn is_input_like(doc: &Document, node: NodeKey) -> bool {
    doc.element(node)
        .map(|el| {
            el.is("input") || el.is("textarea") || el.is("label") || el.is_content_editable()
        })
        .unwrap_or(false)
}

/// Elements whose value is tracked click-to-blur.
pub fn is_blur_tracked(doc: &Document, node: NodeKey) -> bool {
    doc.element(node)
        .map(|el| {
            el.is("textarea")
                || el.is_content_editable()
                || (el.is("input") && TEXT_INPUT_TYPES.contains(&el.input_type().as_str()))
        })
        .unwrap_or(false)
}

/// Control a label refers to: `for` first, then a nested editable control.
pub fn associated_control(doc: &Document, label: NodeKey) -> Option<NodeKey> {
    let element = doc.element(label)?;
    if let Some(target) = element.attr("for").and_then(|id| doc.find_by_id(id)) {
        return Some(target);
    }
    doc.descendants(label).into_iter().find(|node| {
        doc.element(*node)
            .map(|el| el.is("input") || el.is("textarea") || el.is_content_editable())
            .unwrap_or(false)
    })
}

/// Identifier stable across the session: id, else name, else registry id.
pub fn field_uid(doc: &Document, registry: &mut NodeRegistry, node: NodeKey) -> String {
    if let Some(element) = doc.element(node) {
        if !element.id().is_empty() {
            return format!("id:{}", element.id());
        }
        if let Some(name) = element.attr("name").filter(|name| !name.is_empty()) {
            return format!("name:{name}");
        }
    }
    format!("node:{}", registry.register(node))
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValueChange {
    pub control: NodeKey,
    pub old_value: String,
    pub new_value: String,
}

/// Click-time baselines for editable controls.
#[derive(Debug, Default)]
pub struct InputTracker {
    baselines: HashMap<String, String>,
}

impl InputTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the baseline of the clicked control. Labels forward to their
    /// control; returns the control that was recorded.
    pub fn record_click(
        &mut self,
        doc: &Document,
        registry: &mut NodeRegistry,
        origin: NodeKey,
    ) -> Option<NodeKey> {
        let is_label = doc.element(origin).map(|el| el.is("label")).unwrap_or(false);
        let control = if is_label {
            match associated_control(doc, origin) {
                Some(control) => control,
                None => {
                    info!(target: "correlator", label = origin.0, "clicked label has no associated control");
                    return None;
                }
            }
        } else {
            origin
        };
        let uid = field_uid(doc, registry, control);
        let value = doc.control_value(control);
        debug!(target: "correlator", %uid, "input baseline recorded");
        self.baselines.insert(uid, value);
        Some(control)
    }

    /// Compare against the baseline; a missing baseline counts as empty.
    pub fn blur(
        &mut self,
        doc: &Document,
        registry: &mut NodeRegistry,
        node: NodeKey,
    ) -> Option<ValueChange> {
        if !is_blur_tracked(doc, node) {
            return None;
        }
        let uid = field_uid(doc, registry, node);
        let old_value = self.baselines.get(&uid).cloned().unwrap_or_default();
        let new_value = doc.control_value(node);
        if old_value == new_value {
            return None;
        }
        self.baselines.insert(uid, new_value.clone());
        Some(ValueChange {
            control: node,
            old_value,
            new_value,
        })
    }

    pub fn clear(&mut self) {
        self.baselines.clear();
    }

    pub fn len(&self) -> usize {
        self.baselines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.baselines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dom_model::NodeSpec;

    fn form() -> Document {
        Document::from_spec(
            "https://a.test/",
            &NodeSpec::element("html").child(
                NodeSpec::element("body")
                    .child(NodeSpec::element("label").id("for-q").attr("for", "q"))
                    .child(NodeSpec::element("input").id("q").attr("value", "foo"))
                    .child(
                        NodeSpec::element("label")
                            .id("wrap")
                            .child(NodeSpec::element("textarea").attr("name", "bio")),
                    )
                    .child(NodeSpec::element("label").id("lonely"))
                    .child(NodeSpec::element("input").id("box").attr("type", "checkbox"))
                    .child(NodeSpec::element("div").id("ed").attr("contenteditable", "true")),
            ),
        )
        .unwrap()
    }

    #[test]
    fn baseline_then_blur_reports_change_once() {
        let mut doc = form();
        let mut registry = NodeRegistry::new();
        let mut tracker = InputTracker::new();
        let q = doc.find_by_id("q").unwrap();

        assert_eq!(tracker.record_click(&doc, &mut registry, q), Some(q));
        doc.set_value(q, "bar").unwrap();
        let change = tracker.blur(&doc, &mut registry, q).unwrap();
        assert_eq!(change.old_value, "foo");
        assert_eq!(change.new_value, "bar");
        assert!(tracker.blur(&doc, &mut registry, q).is_none());
    }

    #[test]
    fn labels_forward_to_their_control() {
        let doc = form();
        let mut registry = NodeRegistry::new();
        let mut tracker = InputTracker::new();
        let by_for = doc.find_by_id("for-q").unwrap();
        let nested = doc.find_by_id("wrap").unwrap();
        let lonely = doc.find_by_id("lonely").unwrap();

        assert_eq!(
            tracker.record_click(&doc, &mut registry, by_for),
            doc.find_by_id("q")
        );
        let textarea = tracker.record_click(&doc, &mut registry, nested).unwrap();
        assert_eq!(field_uid(&doc, &mut registry, textarea), "name:bio");
        assert_eq!(tracker.record_click(&doc, &mut registry, lonely), None);
        assert_eq!(tracker.len(), 2);
    }

    #[test]
    fn missing_baseline_counts_as_empty() {
        let mut doc = form();
        let mut registry = NodeRegistry::new();
        let mut tracker = InputTracker::new();
        let editable = doc.find_by_id("ed").unwrap();
        doc.set_text_content(editable, "typed").unwrap();
        let change = tracker.blur(&doc, &mut registry, editable).unwrap();
        assert_eq!(change.old_value, "");
        assert_eq!(change.new_value, "typed");
    }

    #[test]
    fn checkboxes_are_not_blur_tracked() {
        let doc = form();
        let checkbox = doc.find_by_id("box").unwrap();
        assert!(is_input_like(&doc, checkbox));
        assert!(!is_blur_tracked(&doc, checkbox));
    }
}
