#![allow(dead_code)]

use std::fmt;

use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub mod clock;
pub mod events;
pub mod messages;

pub use clock::Clock;
pub use events::{
    ActionTarget, ActionType, EventPayload, FieldValue, NodeInfo, ObserverEvent, SummaryEvent,
    TypedEvent,
};
pub use messages::{CoordinatorPort, CoordinatorReply, ContextMessage, ReplyReceiver, ReplyStatus};

/// Milliseconds since the Unix epoch.
pub type TimestampMs = u64;

/// Length of a task id minted by the coordinator.
pub const TASK_ID_LEN: usize = 16;

/// Shared error type for crates that only need to surface a message.
#[derive(Debug, Error, Clone)]
pub enum TrailError {
    #[error("{message}")]
    Message { message: String },
    #[error("channel closed: {0}")]
    ChannelClosed(&'static str),
}

impl TrailError {
    pub fn new(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }
}

/// Identifies one observation context (a tab, a frame host, a replay run).
#[derive(Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextKey(pub String);

impl ContextKey {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ContextKey {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for ContextKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for ContextKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of a recording session, minted once per task-start.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    /// Random alphanumeric id of [`TASK_ID_LEN`] characters.
    pub fn generate() -> Self {
        let id: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(TASK_ID_LEN)
            .map(char::from)
            .collect();
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_ids_are_sixteen_alphanumerics() {
        let id = TaskId::generate();
        assert_eq!(id.as_str().len(), TASK_ID_LEN);
        assert!(id.as_str().chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(id, TaskId::generate());
    }

    #[test]
    fn context_key_serializes_as_plain_string() {
        let key = ContextKey::from("tab-7");
        assert_eq!(serde_json::to_string(&key).unwrap(), "\"tab-7\"");
    }
}
