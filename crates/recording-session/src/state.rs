use actiontrail_core_types::TaskId;
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingState {
    Idle,
    Recording,
    Paused,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Start { description: Option<String> },
    Pause,
    Resume { description: Option<String> },
    Finish,
}

impl SessionCommand {
    pub fn name(&self) -> &'static str {
        match self {
            SessionCommand::Start { .. } => "start",
            SessionCommand::Pause => "pause",
            SessionCommand::Resume { .. } => "resume",
            SessionCommand::Finish => "finish",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionOutcome {
    Started,
    Paused,
    /// `needs_task_id` is set when no task id survived the pause.
    Resumed { needs_task_id: bool },
    Finished,
    Ignored { reason: &'static str },
}

/// Recording lifecycle of one context.
#[derive(Debug)]
pub struct RecordingSession {
    state: RecordingState,
    task_id: Option<TaskId>,
    description: Option<String>,
}

impl Default for RecordingSession {
    fn default() -> Self {
        Self {
            state: RecordingState::Idle,
            task_id: None,
            description: None,
        }
    }
}

impl RecordingSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, command: SessionCommand) -> TransitionOutcome {
        let name = command.name();
        let outcome = match (self.state, command) {
            (RecordingState::Idle, SessionCommand::Start { description }) => {
                self.state = RecordingState::Recording;
                self.description = description;
                TransitionOutcome::Started
            }
            (RecordingState::Recording, SessionCommand::Pause) => {
                self.state = RecordingState::Paused;
                TransitionOutcome::Paused
            }
            (RecordingState::Paused, SessionCommand::Resume { description }) => {
                self.state = RecordingState::Recording;
                if description.is_some() {
                    self.description = description;
                }
                TransitionOutcome::Resumed {
                    needs_task_id: self.task_id.is_none(),
                }
            }
            (RecordingState::Recording | RecordingState::Paused, SessionCommand::Finish) => {
                self.state = RecordingState::Idle;
                self.task_id = None;
                TransitionOutcome::Finished
            }
            (RecordingState::Recording, SessionCommand::Start { .. }) => TransitionOutcome::Ignored {
                reason: "already recording",
            },
            (RecordingState::Paused, SessionCommand::Start { .. }) => TransitionOutcome::Ignored {
                reason: "paused, resume instead",
            },
            (_, SessionCommand::Pause) => TransitionOutcome::Ignored {
                reason: "not recording",
            },
            (_, SessionCommand::Resume { .. }) => TransitionOutcome::Ignored {
                reason: "not paused",
            },
            (RecordingState::Idle, SessionCommand::Finish) => TransitionOutcome::Ignored {
                reason: "nothing to finish",
            },
        };
        if let TransitionOutcome::Ignored { reason } = &outcome {
            debug!(target: "recording.session", command = name, state = ?self.state, reason, "transition ignored");
        }
        outcome
    }

    pub fn state(&self) -> RecordingState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == RecordingState::Recording
    }

    pub fn task_id(&self) -> Option<&TaskId> {
        self.task_id.as_ref()
    }

    /// Adopt the id minted by the coordinator. Ignored once finished.
    pub fn set_task_id(&mut self, task_id: Option<TaskId>) {
        if self.state != RecordingState::Idle {
            self.task_id = task_id;
        }
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}
