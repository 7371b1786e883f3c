use actiontrail_core_types::{NodeInfo, TypedEvent};
use dom_model::{
    is_valid_selector, node_selector, Document, MutationKind, MutationRecord, NodeData, NodeKey,
    NodeRegistry,
};
use snapshot_sanitizer::SnapshotAdapter;
use tracing::trace;

/// Turns raw records into typed events against the current tree state.
pub struct RecordTransformer<'a> {
    doc: &'a Document,
    registry: &'a mut NodeRegistry,
    snapshots: &'a SnapshotAdapter,
    depth: usize,
}

impl<'a> RecordTransformer<'a> {
    pub fn new(
        doc: &'a Document,
        registry: &'a mut NodeRegistry,
        snapshots: &'a SnapshotAdapter,
        depth: usize,
    ) -> Self {
        Self {
            doc,
            registry,
            snapshots,
            depth,
        }
    }

    pub fn transform_all<'r>(&mut self, records: impl IntoIterator<Item = &'r MutationRecord>) -> Vec<TypedEvent> {
        records
            .into_iter()
            .flat_map(|record| self.transform(record))
            .collect()
    }

    /// A child-list record yields up to two events; the others at most one.
    pub fn transform(&mut self, record: &MutationRecord) -> Vec<TypedEvent> {
        let mut events = Vec::new();
        match &record.kind {
            MutationKind::ChildList { added, removed } => {
                if !added.is_empty() {
                    let target = self.node_info(record.target, None);
                    let nodes = self.nodes_info(added, record.target);
                    if is_valid_selector(&nodes[0].selector) {
                        events.push(TypedEvent::NodesAdded { target, nodes });
                    }
                }
                if !removed.is_empty() {
                    let target = self.node_info(record.target, None);
                    let nodes = self.nodes_info(removed, record.target);
                    if is_valid_selector(&nodes[0].selector) {
                        events.push(TypedEvent::NodesRemoved { target, nodes });
                    }
                }
            }
            MutationKind::Attributes { name, old_value } => {
                let target = self.node_info(record.target, None);
                if is_valid_selector(&target.selector) {
                    let new_value = self
                        .doc
                        .element(record.target)
                        .and_then(|element| element.attr(name))
                        .map(str::to_string);
                    events.push(TypedEvent::AttributeChanged {
                        target,
                        attribute: name.clone(),
                        old_value: old_value.clone(),
                        new_value,
                    });
                }
            }
            MutationKind::CharacterData { old_value } => {
                let target = self.node_info(record.target, None);
                if is_valid_selector(&target.selector) {
                    let new_value = match self.doc.node(record.target).map(|node| &node.data) {
                        Some(NodeData::Text(data)) | Some(NodeData::Comment(data)) => {
                            Some(data.clone())
                        }
                        _ => None,
                    };
                    events.push(TypedEvent::TextChanged {
                        target,
                        old_value: Some(old_value.clone()),
                        new_value,
                    });
                }
            }
        }
        if events.is_empty() {
            trace!(target: "correlator", target_node = record.target.0, "record filtered");
        }
        events
    }

    fn nodes_info(&mut self, nodes: &[NodeKey], context: NodeKey) -> Vec<NodeInfo> {
        nodes
            .iter()
            .map(|node| self.node_info(*node, Some(context)))
            .collect()
    }

    fn node_info(&mut self, node: NodeKey, context: Option<NodeKey>) -> NodeInfo {
        NodeInfo {
            selector: node_selector(self.doc, node, context),
            html: self
                .snapshots
                .changed_node_snapshot(self.doc, node, self.depth),
            node_id: self.registry.register(node),
        }
    }
}
