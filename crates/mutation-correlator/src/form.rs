use std::collections::BTreeMap;

use actiontrail_core_types::FieldValue;
use dom_model::{Document, NodeKey};

const SKIPPED_INPUT_TYPES: [&str; 5] = ["button", "submit", "reset", "image", "file"];

/// Values of every enabled, named control of `form`, keyed by name.
///
/// Checkboxes report their checked state; radio groups report the value of
/// the checked member and nothing when none is checked.
pub fn capture_form(doc: &Document, form: NodeKey) -> BTreeMap<String, FieldValue> {
    let mut fields = BTreeMap::new();
    for node in doc.descendants(form) {
        let Some(element) = doc.element(node) else {
            continue;
        };
        if !(element.is("input") || element.is("select") || element.is("textarea")) {
            continue;
        }
        if element.has_attr("disabled") {
            continue;
        }
        let Some(name) = element.attr("name").filter(|name| !name.is_empty()) else {
            continue;
        };
        if element.is("input") {
            let kind = element.input_type();
            if SKIPPED_INPUT_TYPES.contains(&kind.as_str()) {
                continue;
            }
            match kind.as_str() {
                "checkbox" => {
                    fields.insert(name.to_string(), FieldValue::Flag(element.checked));
                    continue;
                }
                "radio" => {
                    if element.checked {
                        let value = element.attr("value").unwrap_or("on").to_string();
                        fields.insert(name.to_string(), FieldValue::Text(value));
                    }
                    continue;
                }
                _ => {}
            }
        }
        fields.insert(name.to_string(), FieldValue::Text(doc.control_value(node)));
    }
    fields
}
