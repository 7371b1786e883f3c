use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::DomResult;
use crate::model::{Document, NodeKey};

/// Declarative node description used to build documents from scenario files
/// and in tests.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeSpec {
    Element {
        tag: String,
        #[serde(default)]
        attrs: BTreeMap<String, String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<String>,
        #[serde(default)]
        checked: bool,
        /// Outside the viewport.
        #[serde(default)]
        hidden: bool,
        #[serde(default)]
        children: Vec<NodeSpec>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        shadow: Option<Vec<NodeSpec>>,
    },
    Text {
        text: String,
    },
    Comment {
        text: String,
    },
}

impl NodeSpec {
    pub fn element(tag: &str) -> Self {
        NodeSpec::Element {
            tag: tag.to_string(),
            attrs: BTreeMap::new(),
            value: None,
            checked: false,
            hidden: false,
            children: Vec::new(),
            shadow: None,
        }
    }

    pub fn text(text: &str) -> Self {
        NodeSpec::Text {
            text: text.to_string(),
        }
    }

    pub fn comment(text: &str) -> Self {
        NodeSpec::Comment {
            text: text.to_string(),
        }
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        if let NodeSpec::Element { attrs, .. } = &mut self {
            attrs.insert(name.to_string(), value.to_string());
        }
        self
    }

    pub fn id(self, id: &str) -> Self {
        self.attr("id", id)
    }

    pub fn class(self, class: &str) -> Self {
        self.attr("class", class)
    }

    pub fn child(mut self, child: NodeSpec) -> Self {
        if let NodeSpec::Element { children, .. } = &mut self {
            children.push(child);
        }
        self
    }

    pub fn children(mut self, more: impl IntoIterator<Item = NodeSpec>) -> Self {
        if let NodeSpec::Element { children, .. } = &mut self {
            children.extend(more);
        }
        self
    }

    pub fn hidden(mut self) -> Self {
        if let NodeSpec::Element { hidden, .. } = &mut self {
            *hidden = true;
        }
        self
    }

    pub fn shadow(mut self, content: Vec<NodeSpec>) -> Self {
        if let NodeSpec::Element { shadow, .. } = &mut self {
            *shadow = Some(content);
        }
        self
    }
}

impl Document {
    /// Document whose root holds the node built from `spec`.
    pub fn from_spec(url: impl Into<String>, spec: &NodeSpec) -> DomResult<Self> {
        let mut doc = Document::new(url);
        let root = doc.root();
        doc.build(root, spec)?;
        Ok(doc)
    }

    /// Build `spec` and append it under `parent`. Returns the new subtree root.
    pub fn build(&mut self, parent: NodeKey, spec: &NodeSpec) -> DomResult<NodeKey> {
        let top = self.instantiate(spec)?;
        let mut stack: Vec<(NodeKey, &NodeSpec)> = vec![(top, spec)];
        while let Some((key, spec)) = stack.pop() {
            if let NodeSpec::Element {
                children, shadow, ..
            } = spec
            {
                for child in children {
                    let child_key = self.instantiate(child)?;
                    self.append_child(key, child_key)?;
                    stack.push((child_key, child));
                }
                if let Some(shadow_children) = shadow {
                    let shadow_root = self.attach_shadow(key)?;
                    for child in shadow_children {
                        let child_key = self.instantiate(child)?;
                        self.append_child(shadow_root, child_key)?;
                        stack.push((child_key, child));
                    }
                }
            }
        }
        self.append_child(parent, top)?;
        Ok(top)
    }

    fn instantiate(&mut self, spec: &NodeSpec) -> DomResult<NodeKey> {
        let key = match spec {
            NodeSpec::Element {
                tag,
                attrs,
                value,
                checked,
                hidden,
                ..
            } => {
                let key = self.create_element(tag);
                for (name, value) in attrs {
                    self.set_attribute(key, name, value)?;
                }
                if let Some(value) = value {
                    self.set_value(key, value.clone())?;
                }
                self.set_checked(key, *checked)?;
                self.set_in_viewport(key, !*hidden)?;
                key
            }
            NodeSpec::Text { text } => self.create_text(text.clone()),
            NodeSpec::Comment { text } => self.create_comment(text.clone()),
        };
        Ok(key)
    }
}
