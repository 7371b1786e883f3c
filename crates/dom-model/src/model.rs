use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::errors::{DomError, DomResult};

/// Index of a node inside its [`Document`] arena. Keys stay valid for the
/// lifetime of the document; detached nodes are never freed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeKey(pub usize);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Element {
    /// Lowercase tag name.
    pub tag: String,
    /// Attributes in insertion order.
    pub attrs: Vec<(String, String)>,
    /// Live value of a form control; `None` until the user edits it.
    pub value: Option<String>,
    pub checked: bool,
    /// Host-provided layout visibility.
    pub in_viewport: bool,
}

impl Element {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attrs: Vec::new(),
            value: None,
            checked: false,
            in_viewport: true,
        }
    }

    pub fn is(&self, tag: &str) -> bool {
        self.tag == tag
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }

    pub fn id(&self) -> &str {
        self.attr("id").unwrap_or("")
    }

    pub fn class_name(&self) -> &str {
        self.attr("class").unwrap_or("")
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.class_name().split_whitespace()
    }

    pub fn is_content_editable(&self) -> bool {
        self.attr("contenteditable")
            .map(|value| value.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    /// `type` attribute of an input, lowercased; `text` when missing.
    pub fn input_type(&self) -> String {
        self.attr("type")
            .map(|value| value.trim().to_ascii_lowercase())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| "text".to_string())
    }

    fn set_attr(&mut self, name: &str, value: &str) -> Option<String> {
        match self.attrs.iter_mut().find(|(key, _)| key == name) {
            Some((_, existing)) => Some(std::mem::replace(existing, value.to_string())),
            None => {
                self.attrs.push((name.to_string(), value.to_string()));
                None
            }
        }
    }

    fn remove_attr(&mut self, name: &str) -> Option<String> {
        let index = self.attrs.iter().position(|(key, _)| key == name)?;
        Some(self.attrs.remove(index).1)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeData {
    Document,
    Element(Element),
    Text(String),
    Comment(String),
    ShadowRoot,
}

#[derive(Clone, Debug)]
pub struct Node {
    pub parent: Option<NodeKey>,
    pub children: Vec<NodeKey>,
    /// Set on shadow roots only.
    pub host: Option<NodeKey>,
    pub shadow_root: Option<NodeKey>,
    pub data: NodeData,
}

impl Node {
    fn new(data: NodeData) -> Self {
        Self {
            parent: None,
            children: Vec::new(),
            host: None,
            shadow_root: None,
            data,
        }
    }

    pub fn as_element(&self) -> Option<&Element> {
        match &self.data {
            NodeData::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn is_element(&self) -> bool {
        matches!(self.data, NodeData::Element(_))
    }

    /// DOM `nodeName`: uppercase tag for elements, `#text` and friends otherwise.
    pub fn node_name(&self) -> String {
        match &self.data {
            NodeData::Document => "#document".to_string(),
            NodeData::Element(element) => element.tag.to_ascii_uppercase(),
            NodeData::Text(_) => "#text".to_string(),
            NodeData::Comment(_) => "#comment".to_string(),
            NodeData::ShadowRoot => "#document-fragment".to_string(),
        }
    }

    fn can_have_children(&self) -> bool {
        matches!(
            self.data,
            NodeData::Document | NodeData::Element(_) | NodeData::ShadowRoot
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MutationKind {
    ChildList {
        added: Vec<NodeKey>,
        removed: Vec<NodeKey>,
    },
    Attributes {
        name: String,
        old_value: Option<String>,
    },
    CharacterData {
        old_value: String,
    },
}

/// Raw change notification, delivered in the order the changes happened.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MutationRecord {
    pub target: NodeKey,
    pub kind: MutationKind,
}

impl MutationRecord {
    pub fn removes_nodes(&self) -> bool {
        matches!(&self.kind, MutationKind::ChildList { removed, .. } if !removed.is_empty())
    }
}

/// Arena-backed document that queues [`MutationRecord`]s for every change made
/// to its connected tree while observation is on.
#[derive(Clone, Debug)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeKey,
    url: String,
    observing: bool,
    pending: Vec<MutationRecord>,
}

impl Document {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            nodes: vec![Node::new(NodeData::Document)],
            root: NodeKey(0),
            url: url.into(),
            observing: false,
            pending: Vec::new(),
        }
    }

    pub fn root(&self) -> NodeKey {
        self.root
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn set_url(&mut self, url: impl Into<String>) {
        self.url = url.into();
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, key: NodeKey) -> Option<&Node> {
        self.nodes.get(key.0)
    }

    pub fn element(&self, key: NodeKey) -> Option<&Element> {
        self.node(key).and_then(Node::as_element)
    }

    fn node_mut(&mut self, key: NodeKey) -> DomResult<&mut Node> {
        self.nodes.get_mut(key.0).ok_or(DomError::UnknownNode(key))
    }

    fn element_mut(&mut self, key: NodeKey) -> DomResult<&mut Element> {
        match &mut self.node_mut(key)?.data {
            NodeData::Element(element) => Ok(element),
            _ => Err(DomError::NotAnElement(key)),
        }
    }

    fn alloc(&mut self, data: NodeData) -> NodeKey {
        let key = NodeKey(self.nodes.len());
        self.nodes.push(Node::new(data));
        key
    }

    pub fn create_element(&mut self, tag: &str) -> NodeKey {
        self.alloc(NodeData::Element(Element::new(tag)))
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeKey {
        self.alloc(NodeData::Text(text.into()))
    }

    pub fn create_comment(&mut self, text: impl Into<String>) -> NodeKey {
        self.alloc(NodeData::Comment(text.into()))
    }

    pub fn attach_shadow(&mut self, host: NodeKey) -> DomResult<NodeKey> {
        let node = self.node(host).ok_or(DomError::UnknownNode(host))?;
        if !node.is_element() {
            return Err(DomError::NotAnElement(host));
        }
        if node.shadow_root.is_some() {
            return Err(DomError::ShadowRootExists(host));
        }
        let shadow = self.alloc(NodeData::ShadowRoot);
        self.node_mut(shadow)?.host = Some(host);
        self.node_mut(host)?.shadow_root = Some(shadow);
        Ok(shadow)
    }

    pub fn shadow_root(&self, host: NodeKey) -> Option<NodeKey> {
        self.node(host).and_then(|node| node.shadow_root)
    }

    // ---- observation ----

    pub fn set_observing(&mut self, observing: bool) {
        self.observing = observing;
        if !observing {
            self.pending.clear();
        }
    }

    pub fn is_observing(&self) -> bool {
        self.observing
    }

    /// Hand over every queued record, oldest first.
    pub fn take_records(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.pending)
    }

    fn queue(&mut self, record: MutationRecord) {
        if self.observing && self.is_connected(record.target) {
            trace!(target: "dom.mutation", target_node = record.target.0, "queued record");
            self.pending.push(record);
        }
    }

    // ---- tree mutation ----

    pub fn append_child(&mut self, parent: NodeKey, child: NodeKey) -> DomResult<()> {
        self.insert_before(parent, child, None)
    }

    pub fn insert_before(
        &mut self,
        parent: NodeKey,
        child: NodeKey,
        reference: Option<NodeKey>,
    ) -> DomResult<()> {
        let parent_node = self.node(parent).ok_or(DomError::UnknownNode(parent))?;
        if !parent_node.can_have_children() {
            return Err(DomError::HierarchyRequest(format!(
                "{} cannot have children",
                parent_node.node_name()
            )));
        }
        let child_node = self.node(child).ok_or(DomError::UnknownNode(child))?;
        if matches!(child_node.data, NodeData::Document | NodeData::ShadowRoot) {
            return Err(DomError::HierarchyRequest(format!(
                "{} cannot be inserted",
                child_node.node_name()
            )));
        }
        if self.is_inclusive_ancestor(child, parent) {
            return Err(DomError::HierarchyRequest(
                "node would become its own descendant".into(),
            ));
        }
        if let Some(reference) = reference {
            if reference == child || self.parent(reference) != Some(parent) {
                return Err(DomError::HierarchyRequest(
                    "reference node is not a child of the parent".into(),
                ));
            }
        }

        if let Some(old_parent) = self.parent(child) {
            self.detach(old_parent, child)?;
        }

        let index = match reference {
            Some(reference) => self
                .children(parent)
                .iter()
                .position(|key| *key == reference)
                .unwrap_or(self.children(parent).len()),
            None => self.children(parent).len(),
        };
        self.node_mut(parent)?.children.insert(index, child);
        self.node_mut(child)?.parent = Some(parent);
        self.queue(MutationRecord {
            target: parent,
            kind: MutationKind::ChildList {
                added: vec![child],
                removed: Vec::new(),
            },
        });
        Ok(())
    }

    pub fn remove_child(&mut self, parent: NodeKey, child: NodeKey) -> DomResult<()> {
        if self.parent(child) != Some(parent) {
            return Err(DomError::HierarchyRequest(
                "node is not a child of the parent".into(),
            ));
        }
        self.detach(parent, child)
    }

    /// Detach `node` from its parent, if it has one.
    pub fn remove(&mut self, node: NodeKey) -> DomResult<()> {
        match self.node(node).ok_or(DomError::UnknownNode(node))?.parent {
            Some(parent) => self.detach(parent, node),
            None => Ok(()),
        }
    }

    fn detach(&mut self, parent: NodeKey, child: NodeKey) -> DomResult<()> {
        self.node_mut(parent)?.children.retain(|key| *key != child);
        self.node_mut(child)?.parent = None;
        self.queue(MutationRecord {
            target: parent,
            kind: MutationKind::ChildList {
                added: Vec::new(),
                removed: vec![child],
            },
        });
        Ok(())
    }

    /// Replace all children of `node` with one text node, as `textContent = ..` does.
    pub fn set_text_content(&mut self, node: NodeKey, text: &str) -> DomResult<()> {
        self.element_mut(node)?;
        let removed = std::mem::take(&mut self.node_mut(node)?.children);
        for child in &removed {
            self.node_mut(*child)?.parent = None;
        }
        let mut added = Vec::new();
        if !text.is_empty() {
            let text_node = self.create_text(text);
            self.node_mut(text_node)?.parent = Some(node);
            self.node_mut(node)?.children.push(text_node);
            added.push(text_node);
        }
        if !added.is_empty() || !removed.is_empty() {
            self.queue(MutationRecord {
                target: node,
                kind: MutationKind::ChildList { added, removed },
            });
        }
        Ok(())
    }

    pub fn set_attribute(&mut self, node: NodeKey, name: &str, value: &str) -> DomResult<()> {
        let name = name.to_ascii_lowercase();
        let old_value = self.element_mut(node)?.set_attr(&name, value);
        self.queue(MutationRecord {
            target: node,
            kind: MutationKind::Attributes { name, old_value },
        });
        Ok(())
    }

    pub fn remove_attribute(&mut self, node: NodeKey, name: &str) -> DomResult<()> {
        let name = name.to_ascii_lowercase();
        if let Some(old_value) = self.element_mut(node)?.remove_attr(&name) {
            self.queue(MutationRecord {
                target: node,
                kind: MutationKind::Attributes {
                    name,
                    old_value: Some(old_value),
                },
            });
        }
        Ok(())
    }

    /// Replace the data of a text or comment node.
    pub fn set_data(&mut self, node: NodeKey, data: impl Into<String>) -> DomResult<()> {
        let data = data.into();
        let old_value = match &mut self.node_mut(node)?.data {
            NodeData::Text(existing) | NodeData::Comment(existing) => {
                std::mem::replace(existing, data)
            }
            _ => return Err(DomError::NotCharacterData(node)),
        };
        self.queue(MutationRecord {
            target: node,
            kind: MutationKind::CharacterData { old_value },
        });
        Ok(())
    }

    /// Live form value. Produces no mutation record.
    pub fn set_value(&mut self, node: NodeKey, value: impl Into<String>) -> DomResult<()> {
        self.element_mut(node)?.value = Some(value.into());
        Ok(())
    }

    /// Live checked state. Produces no mutation record.
    pub fn set_checked(&mut self, node: NodeKey, checked: bool) -> DomResult<()> {
        self.element_mut(node)?.checked = checked;
        Ok(())
    }

    pub fn set_in_viewport(&mut self, node: NodeKey, in_viewport: bool) -> DomResult<()> {
        self.element_mut(node)?.in_viewport = in_viewport;
        Ok(())
    }

    // ---- queries ----

    pub fn parent(&self, key: NodeKey) -> Option<NodeKey> {
        self.node(key).and_then(|node| node.parent)
    }

    pub fn parent_element(&self, key: NodeKey) -> Option<NodeKey> {
        self.parent(key)
            .filter(|parent| self.element(*parent).is_some())
    }

    pub fn children(&self, key: NodeKey) -> &[NodeKey] {
        self.node(key)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn element_children(&self, key: NodeKey) -> impl Iterator<Item = NodeKey> + '_ {
        self.children(key)
            .iter()
            .copied()
            .filter(move |child| self.element(*child).is_some())
    }

    /// The `<html>` element, if one is attached.
    pub fn document_element(&self) -> Option<NodeKey> {
        self.element_children(self.root).next()
    }

    /// Whether `key` reaches the document root through parent or shadow-host links.
    pub fn is_connected(&self, key: NodeKey) -> bool {
        let mut current = key;
        for _ in 0..=self.nodes.len() {
            if current == self.root {
                return true;
            }
            let Some(node) = self.node(current) else {
                return false;
            };
            match node.parent.or(node.host) {
                Some(next) => current = next,
                None => return false,
            }
        }
        false
    }

    fn is_inclusive_ancestor(&self, ancestor: NodeKey, node: NodeKey) -> bool {
        let mut current = Some(node);
        while let Some(key) = current {
            if key == ancestor {
                return true;
            }
            current = self.node(key).and_then(|node| node.parent.or(node.host));
        }
        false
    }

    /// Descendants of `key` in document order, excluding `key` itself.
    pub fn descendants(&self, key: NodeKey) -> Vec<NodeKey> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeKey> = self.children(key).iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        out
    }

    pub fn text_content(&self, key: NodeKey) -> String {
        match self.node(key).map(|node| &node.data) {
            Some(NodeData::Text(text)) | Some(NodeData::Comment(text)) => text.clone(),
            Some(_) => self
                .descendants(key)
                .into_iter()
                .filter_map(|child| match self.node(child).map(|node| &node.data) {
                    Some(NodeData::Text(text)) => Some(text.as_str()),
                    _ => None,
                })
                .collect(),
            None => String::new(),
        }
    }

    /// First connected element in the light tree with the given id.
    pub fn find_by_id(&self, id: &str) -> Option<NodeKey> {
        self.descendants(self.root)
            .into_iter()
            .find(|key| self.element(*key).map(|el| el.id() == id).unwrap_or(false))
    }

    /// Nearest inclusive ancestor element with the given tag.
    pub fn closest(&self, key: NodeKey, tag: &str) -> Option<NodeKey> {
        let mut current = Some(key);
        while let Some(node) = current {
            if self.element(node).map(|el| el.is(tag)).unwrap_or(false) {
                return Some(node);
            }
            current = self.parent_element(node);
        }
        None
    }

    /// Current value of a form control, falling back to its markup default.
    pub fn control_value(&self, key: NodeKey) -> String {
        let Some(element) = self.element(key) else {
            return String::new();
        };
        if element.is_content_editable() {
            return self.text_content(key);
        }
        if let Some(value) = &element.value {
            return value.clone();
        }
        match element.tag.as_str() {
            "textarea" => self.text_content(key),
            "select" => self.selected_option_value(key),
            _ => element.attr("value").unwrap_or("").to_string(),
        }
    }

    fn selected_option_value(&self, select: NodeKey) -> String {
        let options: Vec<NodeKey> = self
            .descendants(select)
            .into_iter()
            .filter(|key| self.element(*key).map(|el| el.is("option")).unwrap_or(false))
            .collect();
        let chosen = options
            .iter()
            .copied()
            .find(|key| {
                self.element(*key)
                    .map(|el| el.checked || el.has_attr("selected"))
                    .unwrap_or(false)
            })
            .or_else(|| options.first().copied());
        match chosen {
            Some(option) => match self.element(option).and_then(|el| el.attr("value")) {
                Some(value) => value.to_string(),
                None => self.text_content(option),
            },
            None => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> (Document, NodeKey, NodeKey) {
        let mut doc = Document::new("https://shop.test/");
        let html = doc.create_element("html");
        let body = doc.create_element("body");
        doc.append_child(doc.root(), html).unwrap();
        doc.append_child(html, body).unwrap();
        (doc, html, body)
    }

    #[test]
    fn records_only_while_observing() {
        let (mut doc, _, body) = page();
        let div = doc.create_element("div");
        doc.append_child(body, div).unwrap();
        assert!(doc.take_records().is_empty());

        doc.set_observing(true);
        doc.set_attribute(div, "class", "open").unwrap();
        let records = doc.take_records();
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].kind,
            MutationKind::Attributes {
                name: "class".into(),
                old_value: None
            }
        );
    }

    #[test]
    fn detached_subtrees_do_not_record() {
        let (mut doc, _, _) = page();
        doc.set_observing(true);
        let card = doc.create_element("div");
        let title = doc.create_element("h2");
        doc.append_child(card, title).unwrap();
        doc.set_attribute(title, "id", "t").unwrap();
        assert!(doc.take_records().is_empty());
    }

    #[test]
    fn moving_a_node_records_removal_then_insertion() {
        let (mut doc, _, body) = page();
        let a = doc.create_element("ul");
        let b = doc.create_element("ol");
        let li = doc.create_element("li");
        doc.append_child(body, a).unwrap();
        doc.append_child(body, b).unwrap();
        doc.append_child(a, li).unwrap();
        doc.set_observing(true);

        doc.append_child(b, li).unwrap();
        let records = doc.take_records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].target, a);
        assert!(records[0].removes_nodes());
        assert_eq!(records[1].target, b);
    }

    #[test]
    fn shadow_content_counts_as_connected() {
        let (mut doc, _, body) = page();
        let host = doc.create_element("x-widget");
        doc.append_child(body, host).unwrap();
        let shadow = doc.attach_shadow(host).unwrap();
        let inner = doc.create_element("span");
        doc.append_child(shadow, inner).unwrap();
        assert!(doc.is_connected(inner));

        doc.remove(host).unwrap();
        assert!(!doc.is_connected(inner));
    }

    #[test]
    fn rejects_cycles() {
        let (mut doc, html, body) = page();
        let err = doc.append_child(body, html).unwrap_err();
        assert!(matches!(err, DomError::HierarchyRequest(_)));
    }

    #[test]
    fn live_values_do_not_record() {
        let (mut doc, _, body) = page();
        let input = doc.create_element("input");
        doc.append_child(body, input).unwrap();
        doc.set_observing(true);
        doc.set_value(input, "typed").unwrap();
        doc.set_checked(input, true).unwrap();
        assert!(doc.take_records().is_empty());
        assert_eq!(doc.control_value(input), "typed");
    }

    #[test]
    fn select_value_falls_back_to_selected_option() {
        let (mut doc, _, body) = page();
        let select = doc.create_element("select");
        doc.append_child(body, select).unwrap();
        for (value, selected) in [("a", false), ("b", true)] {
            let option = doc.create_element("option");
            doc.set_attribute(option, "value", value).unwrap();
            if selected {
                doc.set_attribute(option, "selected", "").unwrap();
            }
            doc.append_child(select, option).unwrap();
        }
        assert_eq!(doc.control_value(select), "b");
    }
}
