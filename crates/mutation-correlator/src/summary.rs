use actiontrail_core_types::{
    ActionTarget, ActionType, EventPayload, SummaryEvent, TimestampMs, TypedEvent,
};
use dom_model::{Document, NodeKey};
use snapshot_sanitizer::SnapshotAdapter;

use crate::form::capture_form;
use crate::input_tracker::ValueChange;

/// Assembles summary events from the current tree state.
pub struct SummaryBuilder<'a> {
    doc: &'a Document,
    snapshots: &'a SnapshotAdapter,
    target_depth: usize,
}

impl<'a> SummaryBuilder<'a> {
    pub fn new(doc: &'a Document, snapshots: &'a SnapshotAdapter, target_depth: usize) -> Self {
        Self {
            doc,
            snapshots,
            target_depth,
        }
    }

    pub fn action_target(&self, kind: &str, node: NodeKey) -> ActionTarget {
        let element = self.doc.element(node);
        ActionTarget {
            kind: kind.to_string(),
            target: self.snapshots.target_snapshot(self.doc, node, self.target_depth),
            target_id: element.map(|el| el.id().to_string()).unwrap_or_default(),
            target_class: element
                .map(|el| el.class_name().to_string())
                .unwrap_or_default(),
            value: None,
        }
    }

    fn summary(
        &self,
        action: ActionType,
        at: TimestampMs,
        target: ActionTarget,
        payload: EventPayload,
    ) -> SummaryEvent {
        SummaryEvent::new(action, at, target, payload, self.snapshots.page_snapshot(self.doc))
    }

    pub fn correlated(
        &self,
        action: ActionType,
        at: TimestampMs,
        target: NodeKey,
        events: Vec<TypedEvent>,
    ) -> SummaryEvent {
        let target = self.action_target(action.as_str(), target);
        self.summary(action, at, target, EventPayload::Events(events))
    }

    /// Immediate summary for a click inside an anchor, if there is one.
    pub fn link_click(&self, origin: NodeKey, at: TimestampMs) -> Option<SummaryEvent> {
        let anchor = self.doc.closest(origin, "a")?;
        let target = self.action_target(ActionType::Click.as_str(), anchor);
        Some(self.summary(ActionType::Click, at, target, EventPayload::empty()))
    }

    pub fn submit(&self, form: NodeKey, at: TimestampMs) -> SummaryEvent {
        let target = self.action_target(ActionType::Submit.as_str(), form);
        let fields = capture_form(self.doc, form);
        self.summary(ActionType::Submit, at, target, EventPayload::FormFields(fields))
    }

    pub fn input_change(&self, change: &ValueChange, at: TimestampMs) -> SummaryEvent {
        let mut target = self.action_target("blur", change.control);
        target.value = Some(change.new_value.clone());
        self.summary(
            ActionType::InputChange,
            at,
            target,
            EventPayload::InputValue {
                old_value: change.old_value.clone(),
                new_value: change.new_value.clone(),
            },
        )
    }

    /// Task start/finish marker carrying the page URL and the description.
    pub fn lifecycle(
        &self,
        action: ActionType,
        at: TimestampMs,
        description: Option<&str>,
    ) -> SummaryEvent {
        let target = ActionTarget {
            kind: action.as_str().to_string(),
            target: self.doc.url().to_string(),
            value: description.map(str::to_string),
            ..ActionTarget::default()
        };
        self.summary(action, at, target, EventPayload::empty())
    }
}
