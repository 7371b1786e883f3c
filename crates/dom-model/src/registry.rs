use std::collections::HashMap;

use tracing::debug;

use crate::model::{Document, NodeKey};

/// Stable integer id handed out for nodes referenced by events.
pub type NodeId = usize;

/// Append-only table of observed nodes.
///
/// Ids are slot indices and are never reused. A swept slot becomes a
/// tombstone; the node gets a fresh id if it is referenced again later.
#[derive(Debug, Default)]
pub struct NodeRegistry {
    slots: Vec<Option<NodeKey>>,
    live: HashMap<NodeKey, NodeId>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, node: NodeKey) -> NodeId {
        if let Some(id) = self.live.get(&node) {
            return *id;
        }
        let id = self.slots.len();
        self.slots.push(Some(node));
        self.live.insert(node, id);
        id
    }

    pub fn resolve(&self, id: NodeId) -> Option<NodeKey> {
        self.slots.get(id).copied().flatten()
    }

    pub fn id_of(&self, node: NodeKey) -> Option<NodeId> {
        self.live.get(&node).copied()
    }

    /// Tombstone every entry that no longer reaches the document root.
    /// Returns how many entries were swept.
    pub fn sweep(&mut self, doc: &Document) -> usize {
        let mut swept = 0;
        for slot in self.slots.iter_mut() {
            if let Some(node) = *slot {
                if !doc.is_connected(node) {
                    *slot = None;
                    self.live.remove(&node);
                    swept += 1;
                }
            }
        }
        if swept > 0 {
            debug!(target: "dom.registry", swept, live = self.live.len(), "swept detached nodes");
        }
        swept
    }

    /// Total ids handed out, tombstones included.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.live.clear();
    }
}
