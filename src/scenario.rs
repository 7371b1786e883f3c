//! Scripted page sessions replayed through the recording pipeline.

use std::path::Path;

use anyhow::{Context, Result};
use dom_model::NodeSpec;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_context")]
    pub context: String,
    pub url: String,
    pub document: NodeSpec,
    #[serde(default)]
    pub steps: Vec<Step>,
}

fn default_context() -> String {
    "replay".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    /// Offset from the start of the replay.
    #[serde(default)]
    pub at_ms: u64,
    #[serde(flatten)]
    pub action: StepAction,
}

/// Element references are `id` attribute values.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum StepAction {
    Start {
        #[serde(default)]
        description: Option<String>,
    },
    Pause,
    Resume {
        #[serde(default)]
        description: Option<String>,
    },
    Finish,
    Click {
        target: String,
    },
    Dblclick {
        target: String,
    },
    Submit {
        target: String,
    },
    Blur {
        target: String,
    },
    Popstate,
    Append {
        parent: String,
        node: NodeSpec,
    },
    Remove {
        target: String,
    },
    SetAttribute {
        target: String,
        name: String,
        value: String,
    },
    RemoveAttribute {
        target: String,
        name: String,
    },
    SetText {
        target: String,
        text: String,
    },
    SetValue {
        target: String,
        value: String,
    },
    SetChecked {
        target: String,
        checked: bool,
    },
    Navigate {
        url: String,
        #[serde(default)]
        forward_back: bool,
    },
    Wait,
}

impl StepAction {
    pub fn name(&self) -> &'static str {
        match self {
            StepAction::Start { .. } => "start",
            StepAction::Pause => "pause",
            StepAction::Resume { .. } => "resume",
            StepAction::Finish => "finish",
            StepAction::Click { .. } => "click",
            StepAction::Dblclick { .. } => "dblclick",
            StepAction::Submit { .. } => "submit",
            StepAction::Blur { .. } => "blur",
            StepAction::Popstate => "popstate",
            StepAction::Append { .. } => "append",
            StepAction::Remove { .. } => "remove",
            StepAction::SetAttribute { .. } => "set_attribute",
            StepAction::RemoveAttribute { .. } => "remove_attribute",
            StepAction::SetText { .. } => "set_text",
            StepAction::SetValue { .. } => "set_value",
            StepAction::SetChecked { .. } => "set_checked",
            StepAction::Navigate { .. } => "navigate",
            StepAction::Wait => "wait",
        }
    }
}

impl Scenario {
    /// JSON for `.json` files, YAML otherwise.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario {}", path.display()))?;
        let is_json = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        if is_json {
            serde_json::from_str(&content).context("Failed to parse JSON scenario")
        } else {
            Self::from_yaml(&content)
        }
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).context("Failed to parse YAML scenario")
    }
}
