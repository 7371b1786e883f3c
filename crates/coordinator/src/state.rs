use std::collections::HashMap;

use actiontrail_core_types::{
    ActionTarget, ActionType, ContextKey, ContextMessage, CoordinatorReply, EventPayload,
    SummaryEvent, TaskId, TimestampMs,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Transition qualifier marking a history traversal.
pub const FORWARD_BACK_QUALIFIER: &str = "forward_back";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Minimum distance between two accepted actions of one dedup class.
    pub dedup_window_ms: u64,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            dedup_window_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DedupClass {
    Navigation,
    InputBlur,
}

/// Everything the coordinator remembers about one context.
#[derive(Debug, Default, Clone)]
pub struct TabState {
    pub task_id: Option<TaskId>,
    pub page_content: Option<String>,
    last_accepted: HashMap<DedupClass, TimestampMs>,
}

impl TabState {
    fn is_duplicate(&self, classes: &[DedupClass], at: TimestampMs, window_ms: u64) -> bool {
        classes.iter().any(|class| {
            self.last_accepted
                .get(class)
                .map(|last| last.abs_diff(at) < window_ms)
                .unwrap_or(false)
        })
    }

    fn stamp(&self, summary: &mut SummaryEvent) {
        summary.task_id = self.task_id.clone();
    }
}

/// Result of one handled message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handled {
    pub reply: CoordinatorReply,
    /// Summary to hand to the transport and the observer bus.
    pub forward: Option<SummaryEvent>,
}

impl Handled {
    fn reply(reply: CoordinatorReply) -> Self {
        Self {
            reply,
            forward: None,
        }
    }

    fn forward(summary: SummaryEvent) -> Self {
        Self {
            reply: CoordinatorReply::success(summary.task_id.clone()),
            forward: Some(summary),
        }
    }
}

/// Per-context coordinator bookkeeping with no I/O.
#[derive(Debug, Default)]
pub struct CoordinatorState {
    config: CoordinatorConfig,
    tabs: HashMap<ContextKey, TabState>,
}

impl CoordinatorState {
    pub fn new(config: CoordinatorConfig) -> Self {
        Self {
            config,
            tabs: HashMap::new(),
        }
    }

    pub fn handle(
        &mut self,
        context: &ContextKey,
        message: ContextMessage,
        now: TimestampMs,
    ) -> Handled {
        if let ContextMessage::Closed = message {
            if self.tabs.remove(context).is_some() {
                info!(target: "coordinator", %context, "context closed, state discarded");
            }
            return Handled::reply(CoordinatorReply::success(None));
        }

        let window_ms = self.config.dedup_window_ms;
        let tab = self.tabs.entry(context.clone()).or_default();
        match message {
            ContextMessage::UpdatePageContent { html } => {
                tab.page_content = Some(html);
                Handled::reply(CoordinatorReply::success(None))
            }
            ContextMessage::DeletePageContent => {
                tab.page_content = None;
                Handled::reply(CoordinatorReply::success(None))
            }
            ContextMessage::GetTaskId => {
                Handled::reply(CoordinatorReply::success(tab.task_id.clone()))
            }
            ContextMessage::TaskStart(mut summary) => {
                let task_id = TaskId::generate();
                info!(target: "coordinator", %context, %task_id, "task started");
                tab.task_id = Some(task_id);
                tab.page_content = Some(summary.page_html_content.clone());
                tab.stamp(&mut summary);
                Handled::forward(summary)
            }
            ContextMessage::TaskFinish(mut summary) => {
                tab.stamp(&mut summary);
                if let Some(task_id) = tab.task_id.take() {
                    info!(target: "coordinator", %context, %task_id, "task finished");
                }
                Handled::forward(summary)
            }
            ContextMessage::Summary(mut summary) | ContextMessage::Submit(mut summary) => {
                tab.stamp(&mut summary);
                Handled::forward(summary)
            }
            ContextMessage::LinkClick(mut summary) => {
                let at = summary.action_timestamp;
                if tab.is_duplicate(&[DedupClass::Navigation], at, window_ms) {
                    debug!(target: "coordinator", %context, at, "duplicate navigation dropped");
                    return Handled::reply(CoordinatorReply::ignored("duplicate navigation"));
                }
                tab.last_accepted.insert(DedupClass::Navigation, at);
                tab.stamp(&mut summary);
                Handled::forward(summary)
            }
            ContextMessage::InputChanged(mut summary) => {
                let at = summary.action_timestamp;
                let classes = [DedupClass::Navigation, DedupClass::InputBlur];
                if tab.is_duplicate(&classes, at, window_ms) {
                    debug!(target: "coordinator", %context, at, "duplicate input change dropped");
                    return Handled::reply(CoordinatorReply::ignored("duplicate input change"));
                }
                tab.last_accepted.insert(DedupClass::InputBlur, at);
                tab.stamp(&mut summary);
                Handled::forward(summary)
            }
            ContextMessage::NavigationCommitted { url, qualifiers } => {
                if !qualifiers.iter().any(|q| q == FORWARD_BACK_QUALIFIER) {
                    return Handled::reply(CoordinatorReply::ignored("not a history traversal"));
                }
                let Some(page) = tab.page_content.clone() else {
                    return Handled::reply(CoordinatorReply::ignored("not recording"));
                };
                let mut summary = SummaryEvent::new(
                    ActionType::GoBackOrForward,
                    now,
                    ActionTarget::navigation(url),
                    EventPayload::empty(),
                    page,
                );
                tab.stamp(&mut summary);
                Handled::forward(summary)
            }
            ContextMessage::Closed => Handled::reply(CoordinatorReply::success(None)),
        }
    }

    pub fn task_id(&self, context: &ContextKey) -> Option<&TaskId> {
        self.tabs.get(context).and_then(|tab| tab.task_id.as_ref())
    }

    pub fn retained_page(&self, context: &ContextKey) -> Option<&str> {
        self.tabs
            .get(context)
            .and_then(|tab| tab.page_content.as_deref())
    }

    pub fn tab_count(&self) -> usize {
        self.tabs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actiontrail_core_types::ReplyStatus;
    use pretty_assertions::assert_eq;

    fn summary(action: ActionType, at: TimestampMs) -> SummaryEvent {
        SummaryEvent::new(
            action,
            at,
            ActionTarget::default(),
            EventPayload::empty(),
            "<body></body>".into(),
        )
    }

    #[test]
    fn task_start_mints_and_stamps() {
        let mut state = CoordinatorState::default();
        let tab = ContextKey::from("t1");
        let started = state.handle(&tab, ContextMessage::TaskStart(summary(ActionType::TaskStart, 1)), 1);
        let task_id = started.reply.task_id.clone().unwrap();
        assert_eq!(started.forward.unwrap().task_id, Some(task_id.clone()));
        assert_eq!(state.retained_page(&tab), Some("<body></body>"));

        let click = state.handle(&tab, ContextMessage::Summary(summary(ActionType::Click, 5)), 5);
        assert_eq!(click.forward.unwrap().task_id, Some(task_id.clone()));

        let finished = state.handle(
            &tab,
            ContextMessage::TaskFinish(summary(ActionType::TaskFinish, 9)),
            9,
        );
        assert_eq!(finished.forward.unwrap().task_id, Some(task_id));
        assert_eq!(state.task_id(&tab), None);
    }

    #[test]
    fn navigation_dedup_is_per_class_and_key() {
        let mut state = CoordinatorState::default();
        let a = ContextKey::from("a");
        let b = ContextKey::from("b");
        let first = state.handle(&a, ContextMessage::LinkClick(summary(ActionType::Click, 1_000)), 1_000);
        let second = state.handle(&a, ContextMessage::LinkClick(summary(ActionType::Click, 1_499)), 1_499);
        let other_tab = state.handle(&b, ContextMessage::LinkClick(summary(ActionType::Click, 1_200)), 1_200);
        let later = state.handle(&a, ContextMessage::LinkClick(summary(ActionType::Click, 1_500)), 1_500);

        assert!(first.forward.is_some());
        assert_eq!(second.reply.status, ReplyStatus::Ignored);
        assert!(second.forward.is_none());
        assert!(other_tab.forward.is_some());
        assert!(later.forward.is_some());
    }

    #[test]
    fn blur_right_after_link_click_is_suppressed() {
        let mut state = CoordinatorState::default();
        let tab = ContextKey::from("t");
        state.handle(&tab, ContextMessage::LinkClick(summary(ActionType::Click, 2_000)), 2_000);
        let blur = state.handle(
            &tab,
            ContextMessage::InputChanged(summary(ActionType::InputChange, 2_100)),
            2_100,
        );
        assert_eq!(blur.reply.status, ReplyStatus::Ignored);

        let late_blur = state.handle(
            &tab,
            ContextMessage::InputChanged(summary(ActionType::InputChange, 4_000)),
            4_000,
        );
        assert!(late_blur.forward.is_some());
    }

    #[test]
    fn history_traversal_needs_retained_snapshot() {
        let mut state = CoordinatorState::default();
        let tab = ContextKey::from("t");
        let nav = |state: &mut CoordinatorState| {
            state.handle(
                &tab,
                ContextMessage::NavigationCommitted {
                    url: "https://a.test/prev".into(),
                    qualifiers: vec![FORWARD_BACK_QUALIFIER.into()],
                },
                7_000,
            )
        };
        assert_eq!(nav(&mut state).reply.status, ReplyStatus::Ignored);

        state.handle(
            &tab,
            ContextMessage::UpdatePageContent {
                html: "<p>kept</p>".into(),
            },
            6_000,
        );
        let synthesized = nav(&mut state).forward.unwrap();
        assert_eq!(synthesized.action, ActionType::GoBackOrForward);
        assert_eq!(synthesized.action_timestamp, 7_000);
        assert_eq!(synthesized.event_target.target, "https://a.test/prev");
        assert_eq!(synthesized.page_html_content, "<p>kept</p>");

        let plain = state.handle(
            &tab,
            ContextMessage::NavigationCommitted {
                url: "https://a.test/next".into(),
                qualifiers: vec!["from_address_bar".into()],
            },
            8_000,
        );
        assert!(plain.forward.is_none());
    }

    #[test]
    fn page_pushes_replace_and_delete_the_retained_snapshot() {
        let mut state = CoordinatorState::default();
        let tab = ContextKey::from("t");
        state.handle(&tab, ContextMessage::TaskStart(summary(ActionType::TaskStart, 1)), 1);
        let pushed = state.handle(
            &tab,
            ContextMessage::UpdatePageContent {
                html: "<p>tick</p>".into(),
            },
            500,
        );
        assert_eq!(pushed.reply.status, ReplyStatus::Success);
        assert!(pushed.forward.is_none());
        assert_eq!(state.retained_page(&tab), Some("<p>tick</p>"));

        state.handle(&tab, ContextMessage::DeletePageContent, 600);
        assert_eq!(state.retained_page(&tab), None);
        state.handle(
            &tab,
            ContextMessage::UpdatePageContent {
                html: "<p>resumed</p>".into(),
            },
            900,
        );
        assert_eq!(state.retained_page(&tab), Some("<p>resumed</p>"));
    }

    #[test]
    fn close_discards_state() {
        let mut state = CoordinatorState::default();
        let tab = ContextKey::from("t");
        state.handle(&tab, ContextMessage::TaskStart(summary(ActionType::TaskStart, 1)), 1);
        assert_eq!(state.tab_count(), 1);
        state.handle(&tab, ContextMessage::Closed, 2);
        assert_eq!(state.tab_count(), 0);
        let reply = state.handle(&tab, ContextMessage::GetTaskId, 3).reply;
        assert_eq!(reply.task_id, None);
    }
}
