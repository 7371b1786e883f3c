//! Messages exchanged between observation contexts and the coordinator.

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::{ContextKey, SummaryEvent, TaskId};

/// Everything a context (or the host on its behalf) can tell the coordinator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContextMessage {
    /// Replace the retained page snapshot.
    UpdatePageContent { html: String },
    /// Recording stopped; forget the retained snapshot.
    DeletePageContent,
    TaskStart(SummaryEvent),
    TaskFinish(SummaryEvent),
    /// A correlated action summary.
    Summary(SummaryEvent),
    /// Immediate anchor click, subject to navigation dedup.
    LinkClick(SummaryEvent),
    /// Input value change on blur, subject to blur-after-navigation dedup.
    InputChanged(SummaryEvent),
    Submit(SummaryEvent),
    GetTaskId,
    /// A navigation committed in the context.
    NavigationCommitted {
        url: String,
        qualifiers: Vec<String>,
    },
    /// The context went away.
    Closed,
}

impl ContextMessage {
    pub fn name(&self) -> &'static str {
        match self {
            ContextMessage::UpdatePageContent { .. } => "update-page-content",
            ContextMessage::DeletePageContent => "delete-page-content",
            ContextMessage::TaskStart(_) => "task-start",
            ContextMessage::TaskFinish(_) => "task-finish",
            ContextMessage::Summary(_) => "send-summary-event",
            ContextMessage::LinkClick(_) => "page-go-to",
            ContextMessage::InputChanged(_) => "input-value-changed",
            ContextMessage::Submit(_) => "submit",
            ContextMessage::GetTaskId => "get-task-id",
            ContextMessage::NavigationCommitted { .. } => "navigation-committed",
            ContextMessage::Closed => "closed",
        }
    }

    /// Whether the sender cares about the task id in the reply.
    pub fn wants_task_id(&self) -> bool {
        matches!(
            self,
            ContextMessage::TaskStart(_) | ContextMessage::GetTaskId
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyStatus {
    Success,
    Ignored,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoordinatorReply {
    pub status: ReplyStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<TaskId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CoordinatorReply {
    pub fn success(task_id: Option<TaskId>) -> Self {
        Self {
            status: ReplyStatus::Success,
            task_id,
            message: None,
        }
    }

    pub fn ignored(reason: impl Into<String>) -> Self {
        Self {
            status: ReplyStatus::Ignored,
            task_id: None,
            message: Some(reason.into()),
        }
    }

    pub fn error(reason: impl Into<String>) -> Self {
        Self {
            status: ReplyStatus::Error,
            task_id: None,
            message: Some(reason.into()),
        }
    }
}

pub type ReplyReceiver = oneshot::Receiver<CoordinatorReply>;

/// Seam between observation contexts and the coordinator.
///
/// `dispatch` enqueues synchronously so messages from one context keep their
/// order; the reply resolves once the coordinator handled the message.
pub trait CoordinatorPort: Send + Sync {
    fn dispatch(&self, context: &ContextKey, message: ContextMessage) -> ReplyReceiver;
}
