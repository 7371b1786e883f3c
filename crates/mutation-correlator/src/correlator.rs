use std::collections::HashMap;

use actiontrail_core_types::{ActionType, SummaryEvent, TimestampMs};
use dom_model::{resolve_interactive, Document, NodeKey, NodeRegistry};
use snapshot_sanitizer::SnapshotAdapter;
use tracing::debug;

use crate::buffer::{window, MutationBuffer, TimedRecord};
use crate::config::CorrelatorConfig;
use crate::summary::SummaryBuilder;
use crate::transform::RecordTransformer;

pub type CorrelationId = u64;

/// An action waiting for its after-window to close.
#[derive(Debug, Clone)]
struct PendingCorrelation {
    action: ActionType,
    at: TimestampMs,
    origin: NodeKey,
    target: NodeKey,
    before: Vec<TimedRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeginOutcome {
    /// Call [`ActionCorrelator::complete`] at `fire_at`.
    Scheduled {
        id: CorrelationId,
        fire_at: TimestampMs,
    },
    /// The target resolved to an anchor; the link path reports it.
    AnchorAborted { anchor: NodeKey },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Emitted(SummaryEvent),
    /// Nothing left after filtering, or a lone attribute change.
    Noise,
    Unknown,
}

/// Shared state the correlator reads when an after-window closes.
pub struct CorrelationInputs<'a> {
    pub doc: &'a Document,
    pub registry: &'a mut NodeRegistry,
    pub buffer: &'a mut MutationBuffer,
    pub snapshots: &'a SnapshotAdapter,
}

/// Associates buffered mutations with the action that caused them.
///
/// Sans-IO: the owner feeds timestamps in and schedules the after-window
/// completion itself. The resolved target of each pending correlation is
/// kept here, so nothing is written to the observed tree.
#[derive(Debug)]
pub struct ActionCorrelator {
    config: CorrelatorConfig,
    pending: HashMap<CorrelationId, PendingCorrelation>,
    next_id: CorrelationId,
}

impl ActionCorrelator {
    pub fn new(config: CorrelatorConfig) -> Self {
        Self {
            config,
            pending: HashMap::new(),
            next_id: 0,
        }
    }

    pub fn config(&self) -> &CorrelatorConfig {
        &self.config
    }

    /// Resolve the target, capture the before-window and open a correlation.
    /// Popstate has no element origin and keeps the document element.
    pub fn begin(
        &mut self,
        doc: &Document,
        buffer: &mut MutationBuffer,
        action: ActionType,
        origin: NodeKey,
        at: TimestampMs,
    ) -> BeginOutcome {
        let target = if action == ActionType::Popstate {
            origin
        } else {
            resolve_interactive(doc, origin, self.config.resolve_depth)
        };
        if doc.element(target).map(|el| el.is("a")).unwrap_or(false) {
            debug!(target: "correlator", action = action.as_str(), "anchor target, left to link path");
            return BeginOutcome::AnchorAborted { anchor: target };
        }

        let before = window(
            buffer.drain(),
            at.saturating_sub(self.config.window_ms),
            at,
        );
        let id = self.next_id;
        self.next_id += 1;
        debug!(
            target: "correlator",
            id,
            action = action.as_str(),
            before = before.len(),
            "correlation opened"
        );
        self.pending.insert(
            id,
            PendingCorrelation {
                action,
                at,
                origin,
                target,
                before,
            },
        );
        BeginOutcome::Scheduled {
            id,
            fire_at: at + self.config.window_ms,
        }
    }

    /// Close the after-window of `id` and build its summary.
    pub fn complete(&mut self, id: CorrelationId, inputs: CorrelationInputs<'_>) -> Completion {
        let Some(pending) = self.pending.remove(&id) else {
            return Completion::Unknown;
        };
        let CorrelationInputs {
            doc,
            registry,
            buffer,
            snapshots,
        } = inputs;

        let after = window(
            buffer.drain(),
            pending.at,
            pending.at + self.config.window_ms,
        );
        let mut transformer =
            RecordTransformer::new(doc, registry, snapshots, self.config.changed_node_depth);
        let mut events = transformer.transform_all(pending.before.iter().map(|entry| &entry.record));
        events.extend(transformer.transform_all(after.iter().map(|entry| &entry.record)));
        events.retain(|event| !event.is_unchanged_attribute());

        if events.is_empty() || (events.len() == 1 && events[0].is_attribute_change()) {
            debug!(target: "correlator", id, events = events.len(), "dropped as noise");
            return Completion::Noise;
        }

        let target = if doc.element(pending.target).is_some() {
            pending.target
        } else {
            pending.origin
        };
        let summary = SummaryBuilder::new(doc, snapshots, self.config.target_depth).correlated(
            pending.action,
            pending.at,
            target,
            events,
        );
        debug!(
            target: "correlator",
            id,
            action = pending.action.as_str(),
            events = summary.all_events.events().len(),
            "correlation emitted"
        );
        Completion::Emitted(summary)
    }

    /// Forget a pending correlation without building anything.
    pub fn discard(&mut self, id: CorrelationId) -> bool {
        self.pending.remove(&id).is_some()
    }

    /// Targets of correlations still waiting for their after-window.
    pub fn active_targets(&self) -> impl Iterator<Item = NodeKey> + '_ {
        self.pending.values().map(|pending| pending.target)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}
