//! Wire model shared by the correlator, the coordinator and the collector.
//!
//! Field names follow the collector contract (`taskId`, `eventTarget`,
//! `pageHTMLContent`, ...), so everything here is camelCase on the wire.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{ContextKey, TaskId, TimestampMs};

/// User action (or lifecycle marker) a summary event describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionType {
    Click,
    Dblclick,
    Submit,
    Popstate,
    InputChange,
    TaskStart,
    TaskFinish,
    GoBackOrForward,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Click => "click",
            ActionType::Dblclick => "dblclick",
            ActionType::Submit => "submit",
            ActionType::Popstate => "popstate",
            ActionType::InputChange => "input-change",
            ActionType::TaskStart => "task-start",
            ActionType::TaskFinish => "task-finish",
            ActionType::GoBackOrForward => "go-back-or-forward",
        }
    }
}

/// A node referenced by a typed event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeInfo {
    pub selector: String,
    /// Bounded-depth HTML of the node.
    #[serde(rename = "nodeInfo")]
    pub html: String,
    pub node_id: usize,
}

/// Mutation records after correlation, one per semantic change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TypedEvent {
    NodesAdded {
        target: NodeInfo,
        nodes: Vec<NodeInfo>,
    },
    NodesRemoved {
        target: NodeInfo,
        nodes: Vec<NodeInfo>,
    },
    #[serde(rename_all = "camelCase")]
    AttributeChanged {
        target: NodeInfo,
        attribute: String,
        old_value: Option<String>,
        new_value: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    TextChanged {
        target: NodeInfo,
        old_value: Option<String>,
        new_value: Option<String>,
    },
}

impl TypedEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            TypedEvent::NodesAdded { .. } => "nodes-added",
            TypedEvent::NodesRemoved { .. } => "nodes-removed",
            TypedEvent::AttributeChanged { .. } => "attribute-changed",
            TypedEvent::TextChanged { .. } => "text-changed",
        }
    }

    pub fn is_attribute_change(&self) -> bool {
        matches!(self, TypedEvent::AttributeChanged { .. })
    }

    /// Attribute events whose value did not actually change.
    pub fn is_unchanged_attribute(&self) -> bool {
        match self {
            TypedEvent::AttributeChanged {
                old_value,
                new_value,
                ..
            } => old_value == new_value,
            _ => false,
        }
    }
}

/// The element an action was attributed to.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionTarget {
    #[serde(rename = "type")]
    pub kind: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub target_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub target_class: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl ActionTarget {
    pub fn navigation(url: impl Into<String>) -> Self {
        Self {
            kind: "navigation".into(),
            target: url.into(),
            ..Self::default()
        }
    }
}

/// Captured form control value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Flag(bool),
    Text(String),
}

/// The `allEvents` member of a summary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventPayload {
    Events(Vec<TypedEvent>),
    #[serde(rename_all = "camelCase")]
    InputValue {
        old_value: String,
        new_value: String,
    },
    FormFields(BTreeMap<String, FieldValue>),
}

impl EventPayload {
    pub fn empty() -> Self {
        EventPayload::Events(Vec::new())
    }

    pub fn events(&self) -> &[TypedEvent] {
        match self {
            EventPayload::Events(events) => events,
            _ => &[],
        }
    }
}

/// One correlated user action, as shipped to the collector.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryEvent {
    pub task_id: Option<TaskId>,
    #[serde(rename = "type")]
    pub action: ActionType,
    pub action_timestamp: TimestampMs,
    pub event_target: ActionTarget,
    pub all_events: EventPayload,
    #[serde(rename = "pageHTMLContent")]
    pub page_html_content: String,
}

impl SummaryEvent {
    pub fn new(
        action: ActionType,
        action_timestamp: TimestampMs,
        event_target: ActionTarget,
        all_events: EventPayload,
        page_html_content: String,
    ) -> Self {
        Self {
            task_id: None,
            action,
            action_timestamp,
            event_target,
            all_events,
            page_html_content,
        }
    }
}

/// Pushed to attached observer UIs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ObserverEvent {
    Typed {
        context: ContextKey,
        at: TimestampMs,
        event: TypedEvent,
    },
    Summary {
        context: ContextKey,
        summary: SummaryEvent,
    },
}
