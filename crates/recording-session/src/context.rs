use actiontrail_core_types::{
    ActionType, ContextKey, ContextMessage, ObserverEvent, SummaryEvent, TaskId, TimestampMs,
};
use dom_model::{node_selector, outer_html, Document, DomResult, NodeId, NodeKey, NodeRegistry};
use mutation_correlator::{
    is_input_like, ActionCorrelator, BeginOutcome, ClickDebouncer, Completion, CorrelationId,
    CorrelationInputs, InputTracker, MutationBuffer, SummaryBuilder,
};
use snapshot_sanitizer::SnapshotAdapter;
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::errors::{RuntimeError, RuntimeResult};
use crate::state::{RecordingSession, SessionCommand, TransitionOutcome};

/// What the host environment offers the context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostCapabilities {
    /// Structural change notifications for the observed tree.
    pub mutation_observer: bool,
}

impl Default for HostCapabilities {
    fn default() -> Self {
        Self {
            mutation_observer: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Single-click debounce.
    Click { generation: u64 },
    AfterWindow { id: CorrelationId },
    SnapshotTick,
}

/// Side effects requested by the context, executed in order by its runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Send(ContextMessage),
    Publish(ObserverEvent),
    Schedule { timer: TimerKind, at: TimestampMs },
    Cancel(TimerKind),
    Highlight { node: NodeKey, selector: String },
    Inspect { node: NodeKey, selector: String, html: String },
}

/// One observed tree with everything that watches it.
///
/// No I/O and no clock: every entry point takes `now` and returns effects.
pub struct ObservationContext {
    key: ContextKey,
    config: SessionConfig,
    doc: Document,
    registry: NodeRegistry,
    buffer: MutationBuffer,
    correlator: ActionCorrelator,
    debouncer: ClickDebouncer,
    inputs: InputTracker,
    snapshots: SnapshotAdapter,
    session: RecordingSession,
}

impl ObservationContext {
    pub fn new(
        key: ContextKey,
        doc: Document,
        capabilities: HostCapabilities,
        config: SessionConfig,
        snapshots: SnapshotAdapter,
    ) -> RuntimeResult<Self> {
        if !capabilities.mutation_observer {
            return Err(RuntimeError::CapabilityMissing("mutation observer"));
        }
        Ok(Self {
            key,
            correlator: ActionCorrelator::new(config.correlator.clone()),
            debouncer: ClickDebouncer::new(config.correlator.click_delay_ms),
            config,
            doc,
            registry: NodeRegistry::new(),
            buffer: MutationBuffer::new(),
            inputs: InputTracker::new(),
            snapshots,
            session: RecordingSession::new(),
        })
    }

    pub fn key(&self) -> &ContextKey {
        &self.key
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn session(&self) -> &RecordingSession {
        &self.session
    }

    pub fn current_task_id(&self) -> Option<&TaskId> {
        self.session.task_id()
    }

    /// Drive the recording lifecycle.
    pub fn control(
        &mut self,
        command: SessionCommand,
        now: TimestampMs,
    ) -> (TransitionOutcome, Vec<Effect>) {
        let outcome = self.session.apply(command);
        let mut effects = Vec::new();
        match &outcome {
            TransitionOutcome::Started => {
                self.activate(now, &mut effects);
                effects.push(Effect::Send(ContextMessage::TaskStart(
                    self.lifecycle(ActionType::TaskStart, now),
                )));
            }
            TransitionOutcome::Paused => self.deactivate(&mut effects),
            TransitionOutcome::Resumed { needs_task_id } => {
                self.activate(now, &mut effects);
                // pause dropped the coordinator's copy; the first tick is an interval away
                effects.push(Effect::Send(ContextMessage::UpdatePageContent {
                    html: self.page_content(),
                }));
                if *needs_task_id {
                    effects.push(Effect::Send(ContextMessage::TaskStart(
                        self.lifecycle(ActionType::TaskStart, now),
                    )));
                }
            }
            TransitionOutcome::Finished => {
                effects.push(Effect::Send(ContextMessage::TaskFinish(
                    self.lifecycle(ActionType::TaskFinish, now),
                )));
                self.deactivate(&mut effects);
                self.inputs.clear();
            }
            TransitionOutcome::Ignored { .. } => {}
        }
        if !matches!(outcome, TransitionOutcome::Ignored { .. }) {
            info!(
                target: "recording.session",
                context = %self.key,
                state = ?self.session.state(),
                "recording state changed"
            );
        }
        (outcome, effects)
    }

    fn activate(&mut self, now: TimestampMs, effects: &mut Vec<Effect>) {
        self.doc.set_observing(true);
        effects.push(Effect::Schedule {
            timer: TimerKind::SnapshotTick,
            at: now + self.config.snapshot_interval_ms,
        });
    }

    fn deactivate(&mut self, effects: &mut Vec<Effect>) {
        self.doc.set_observing(false);
        self.buffer.clear();
        if let Some(generation) = self.debouncer.reset() {
            effects.push(Effect::Cancel(TimerKind::Click { generation }));
        }
        effects.push(Effect::Cancel(TimerKind::SnapshotTick));
        effects.push(Effect::Send(ContextMessage::DeletePageContent));
    }

    fn lifecycle(&self, action: ActionType, now: TimestampMs) -> SummaryEvent {
        self.builder()
            .lifecycle(action, now, self.session.description())
    }

    fn builder(&self) -> SummaryBuilder<'_> {
        SummaryBuilder::new(&self.doc, &self.snapshots, self.config.correlator.target_depth)
    }

    /// Apply a host-side change to the tree and collect its records.
    pub fn mutate<F>(&mut self, now: TimestampMs, change: F) -> DomResult<()>
    where
        F: FnOnce(&mut Document) -> DomResult<()>,
    {
        let result = change(&mut self.doc);
        self.flush_mutations(now);
        result
    }

    /// Move queued mutation records into the buffer.
    pub fn flush_mutations(&mut self, now: TimestampMs) {
        let records = self.doc.take_records();
        if records.is_empty() {
            return;
        }
        if records.iter().any(|record| record.removes_nodes()) {
            self.registry.sweep(&self.doc);
        }
        self.buffer.observe_batch(records, now);
    }

    pub fn set_url(&mut self, url: impl Into<String>) {
        self.doc.set_url(url);
    }

    pub fn click(&mut self, origin: NodeKey, now: TimestampMs) -> Vec<Effect> {
        if !self.session.is_recording() {
            return Vec::new();
        }
        let mut effects = Vec::new();
        if let Some(summary) = self.builder().link_click(origin, now) {
            effects.push(Effect::Send(ContextMessage::LinkClick(summary)));
        }
        if is_input_like(&self.doc, origin) {
            self.inputs.record_click(&self.doc, &mut self.registry, origin);
            return effects;
        }
        let arm = self.debouncer.click(origin, now);
        if let Some(generation) = arm.cancelled {
            effects.push(Effect::Cancel(TimerKind::Click { generation }));
        }
        effects.push(Effect::Schedule {
            timer: TimerKind::Click {
                generation: arm.generation,
            },
            at: arm.fire_at,
        });
        effects
    }

    pub fn dblclick(&mut self, origin: NodeKey, now: TimestampMs) -> Vec<Effect> {
        if !self.session.is_recording() {
            return Vec::new();
        }
        let mut effects = Vec::new();
        if let Some(generation) = self.debouncer.double_click() {
            effects.push(Effect::Cancel(TimerKind::Click { generation }));
        }
        if !is_input_like(&self.doc, origin) {
            self.begin(ActionType::Dblclick, origin, now, &mut effects);
        }
        effects
    }

    /// Submission of the form containing `node`.
    pub fn submit(&mut self, node: NodeKey, now: TimestampMs) -> Vec<Effect> {
        if !self.session.is_recording() {
            return Vec::new();
        }
        let Some(form) = self.doc.closest(node, "form") else {
            debug!(target: "recording.session", node = node.0, "submit outside a form");
            return Vec::new();
        };
        let summary = self.builder().submit(form, now);
        vec![Effect::Send(ContextMessage::Submit(summary))]
    }

    pub fn blur(&mut self, node: NodeKey, now: TimestampMs) -> Vec<Effect> {
        if !self.session.is_recording() {
            return Vec::new();
        }
        match self.inputs.blur(&self.doc, &mut self.registry, node) {
            Some(change) => {
                let summary = self.builder().input_change(&change, now);
                vec![Effect::Send(ContextMessage::InputChanged(summary))]
            }
            None => Vec::new(),
        }
    }

    pub fn popstate(&mut self, now: TimestampMs) -> Vec<Effect> {
        if !self.session.is_recording() {
            return Vec::new();
        }
        let mut effects = Vec::new();
        match self.doc.document_element() {
            Some(root) => self.begin(ActionType::Popstate, root, now, &mut effects),
            None => warn!(target: "recording.session", "popstate without a document element"),
        }
        effects
    }

    fn begin(
        &mut self,
        action: ActionType,
        origin: NodeKey,
        now: TimestampMs,
        effects: &mut Vec<Effect>,
    ) {
        self.flush_mutations(now);
        match self
            .correlator
            .begin(&self.doc, &mut self.buffer, action, origin, now)
        {
            BeginOutcome::Scheduled { id, fire_at } => effects.push(Effect::Schedule {
                timer: TimerKind::AfterWindow { id },
                at: fire_at,
            }),
            BeginOutcome::AnchorAborted { .. } => {}
        }
    }

    pub fn timer_fired(&mut self, timer: TimerKind, now: TimestampMs) -> Vec<Effect> {
        let mut effects = Vec::new();
        match timer {
            TimerKind::Click { generation } => {
                if let Some(pending) = self.debouncer.fire(generation) {
                    if self.session.is_recording() {
                        self.begin(ActionType::Click, pending.origin, now, &mut effects);
                    }
                }
            }
            TimerKind::AfterWindow { id } => self.complete(id, now, &mut effects),
            TimerKind::SnapshotTick => {
                if self.session.is_recording() {
                    effects.push(Effect::Send(ContextMessage::UpdatePageContent {
                        html: self.page_content(),
                    }));
                    effects.push(Effect::Schedule {
                        timer: TimerKind::SnapshotTick,
                        at: now + self.config.snapshot_interval_ms,
                    });
                }
            }
        }
        effects
    }

    fn complete(&mut self, id: CorrelationId, now: TimestampMs, effects: &mut Vec<Effect>) {
        if !self.session.is_recording() {
            if self.correlator.discard(id) {
                debug!(target: "recording.session", id, "after-window closed while not recording");
            }
            return;
        }
        self.flush_mutations(now);
        let completion = self.correlator.complete(
            id,
            CorrelationInputs {
                doc: &self.doc,
                registry: &mut self.registry,
                buffer: &mut self.buffer,
                snapshots: &self.snapshots,
            },
        );
        if let Completion::Emitted(summary) = completion {
            for event in summary.all_events.events() {
                effects.push(Effect::Publish(ObserverEvent::Typed {
                    context: self.key.clone(),
                    at: summary.action_timestamp,
                    event: event.clone(),
                }));
            }
            effects.push(Effect::Send(ContextMessage::Summary(summary)));
        }
    }

    pub fn task_assigned(&mut self, task_id: Option<TaskId>) {
        if let Some(task_id) = &task_id {
            debug!(target: "recording.session", context = %self.key, %task_id, "task id assigned");
        }
        self.session.set_task_id(task_id);
    }

    /// Registry id of `node`, registering it if needed.
    pub fn node_id(&mut self, node: NodeKey) -> NodeId {
        self.registry.register(node)
    }

    fn highlight_target(&self, id: NodeId) -> Option<NodeKey> {
        let node = self.registry.resolve(id)?;
        if self.doc.element(node).is_some() {
            return Some(node);
        }
        self.doc.parent_element(node)
    }

    /// Stale ids and detached nodes yield nothing.
    pub fn highlight(&self, id: NodeId) -> Option<Effect> {
        let node = self.highlight_target(id)?;
        if !self.doc.is_connected(node) {
            return None;
        }
        Some(Effect::Highlight {
            node,
            selector: node_selector(&self.doc, node, None),
        })
    }

    pub fn inspect(&self, id: NodeId) -> Option<Effect> {
        let node = self.highlight_target(id)?;
        if !self.doc.is_connected(node) {
            return None;
        }
        Some(Effect::Inspect {
            node,
            selector: node_selector(&self.doc, node, None),
            html: outer_html(&self.doc, node),
        })
    }

    /// Fresh sanitized snapshot of the visible page.
    pub fn page_content(&self) -> String {
        self.snapshots.page_snapshot(&self.doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dom_model::NodeSpec;
    use pretty_assertions::assert_eq;

    fn context() -> ObservationContext {
        let doc = Document::from_spec(
            "https://app.test/",
            &NodeSpec::element("html").child(
                NodeSpec::element("body")
                    .child(NodeSpec::element("button").id("go").child(NodeSpec::text("Go")))
                    .child(NodeSpec::element("input").id("q"))
                    .child(NodeSpec::element("div").id("out")),
            ),
        )
        .unwrap();
        ObservationContext::new(
            ContextKey::from("ctx"),
            doc,
            HostCapabilities::default(),
            SessionConfig::default(),
            SnapshotAdapter::default(),
        )
        .unwrap()
    }

    fn key(ctx: &ObservationContext, id: &str) -> NodeKey {
        ctx.document().find_by_id(id).unwrap()
    }

    fn sent(effects: &[Effect]) -> Vec<&'static str> {
        effects
            .iter()
            .filter_map(|effect| match effect {
                Effect::Send(message) => Some(message.name()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn missing_observer_is_fatal() {
        let doc = Document::new("https://app.test/");
        let result = ObservationContext::new(
            ContextKey::from("ctx"),
            doc,
            HostCapabilities {
                mutation_observer: false,
            },
            SessionConfig::default(),
            SnapshotAdapter::default(),
        );
        assert!(matches!(result, Err(RuntimeError::CapabilityMissing(_))));
    }

    #[test]
    fn start_and_finish_emit_lifecycle_messages() {
        let mut ctx = context();
        let (outcome, effects) = ctx.control(
            SessionCommand::Start {
                description: Some("search".into()),
            },
            1_000,
        );
        assert_eq!(outcome, TransitionOutcome::Started);
        assert_eq!(sent(&effects), vec!["task-start"]);
        assert!(effects.contains(&Effect::Schedule {
            timer: TimerKind::SnapshotTick,
            at: 1_500
        }));

        let (_, effects) = ctx.control(SessionCommand::Finish, 2_000);
        assert_eq!(sent(&effects), vec!["task-finish", "delete-page-content"]);
        assert!(effects.contains(&Effect::Cancel(TimerKind::SnapshotTick)));
    }

    #[test]
    fn snapshot_tick_pushes_page_and_rearms() {
        let mut ctx = context();
        ctx.control(SessionCommand::Start { description: None }, 0);

        let effects = ctx.timer_fired(TimerKind::SnapshotTick, 500);
        assert_eq!(
            effects,
            vec![
                Effect::Send(ContextMessage::UpdatePageContent {
                    html: ctx.page_content(),
                }),
                Effect::Schedule {
                    timer: TimerKind::SnapshotTick,
                    at: 1_000
                },
            ]
        );

        ctx.control(SessionCommand::Pause, 700);
        assert!(ctx.timer_fired(TimerKind::SnapshotTick, 1_000).is_empty());
    }

    #[test]
    fn resume_pushes_page_at_once_and_restarts_ticks() {
        let mut ctx = context();
        ctx.control(SessionCommand::Start { description: None }, 0);
        ctx.task_assigned(Some(TaskId::generate()));
        ctx.control(SessionCommand::Pause, 600);

        let (outcome, effects) = ctx.control(SessionCommand::Resume { description: None }, 900);
        assert_eq!(
            outcome,
            TransitionOutcome::Resumed {
                needs_task_id: false
            }
        );
        assert_eq!(sent(&effects), vec!["update-page-content"]);
        assert!(effects.contains(&Effect::Schedule {
            timer: TimerKind::SnapshotTick,
            at: 1_400
        }));

        let effects = ctx.timer_fired(TimerKind::SnapshotTick, 1_400);
        assert_eq!(sent(&effects), vec!["update-page-content"]);
        assert!(effects.contains(&Effect::Schedule {
            timer: TimerKind::SnapshotTick,
            at: 1_900
        }));
    }

    #[test]
    fn actions_are_ignored_while_idle() {
        let mut ctx = context();
        let go = key(&ctx, "go");
        assert!(ctx.click(go, 10).is_empty());
        assert!(ctx.popstate(10).is_empty());
    }

    #[test]
    fn click_to_summary_through_timers() {
        let mut ctx = context();
        ctx.control(SessionCommand::Start { description: None }, 0);
        let go = key(&ctx, "go");
        let effects = ctx.click(go, 1_000);
        assert_eq!(
            effects,
            vec![Effect::Schedule {
                timer: TimerKind::Click { generation: 1 },
                at: 1_500
            }]
        );

        let effects = ctx.timer_fired(TimerKind::Click { generation: 1 }, 1_500);
        let Some(Effect::Schedule { timer, at }) = effects.first().cloned() else {
            panic!("expected after-window schedule");
        };
        assert_eq!(at, 2_500);

        let out = key(&ctx, "out");
        ctx.mutate(1_800, |doc| {
            let note = doc.create_element("p");
            doc.append_child(out, note)
        })
        .unwrap();

        let effects = ctx.timer_fired(timer, 2_500);
        assert_eq!(sent(&effects), vec!["send-summary-event"]);
        assert!(matches!(effects[0], Effect::Publish(ObserverEvent::Typed { .. })));
    }

    #[test]
    fn input_clicks_skip_the_debouncer() {
        let mut ctx = context();
        ctx.control(SessionCommand::Start { description: None }, 0);
        let q = key(&ctx, "q");
        assert!(ctx.click(q, 100).is_empty());
        ctx.mutate(200, |doc| doc.set_value(q, "rust")).unwrap();
        let effects = ctx.blur(q, 300);
        let Some(Effect::Send(ContextMessage::InputChanged(summary))) = effects.first() else {
            panic!("expected input change");
        };
        assert_eq!(summary.event_target.value.as_deref(), Some("rust"));
    }

    #[test]
    fn after_window_is_discarded_once_paused() {
        let mut ctx = context();
        ctx.control(SessionCommand::Start { description: None }, 0);
        let go = key(&ctx, "go");
        let effects = ctx.dblclick(go, 1_000);
        let Some(Effect::Schedule { timer, .. }) = effects.last().cloned() else {
            panic!("expected after-window schedule");
        };
        ctx.control(SessionCommand::Pause, 1_200);
        assert!(ctx.timer_fired(timer, 2_000).is_empty());
    }

    #[test]
    fn highlight_uses_parent_of_text_and_ignores_stale_ids() {
        let mut ctx = context();
        let go = key(&ctx, "go");
        let text = ctx.document().children(go)[0];
        let text_id = ctx.node_id(text);
        let Some(Effect::Highlight { node, selector }) = ctx.highlight(text_id) else {
            panic!("expected highlight");
        };
        assert_eq!(node, go);
        assert_eq!(selector, "#go");
        assert!(ctx.highlight(999).is_none());

        ctx.mutate(5, |doc| doc.remove(go)).unwrap();
        assert!(ctx.inspect(text_id).is_none());
    }
}
