use serde::{Deserialize, Serialize};

/// Timing and depth knobs of the correlation pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CorrelatorConfig {
    /// Width of the before and after windows around an action.
    pub window_ms: u64,
    /// How long a click waits for a possible double click.
    pub click_delay_ms: u64,
    /// Levels searched up and down for an interactive element.
    pub resolve_depth: usize,
    /// Depth kept in action target snapshots.
    pub target_depth: usize,
    /// Depth kept in changed-node snapshots.
    pub changed_node_depth: usize,
}

impl Default for CorrelatorConfig {
    fn default() -> Self {
        Self {
            window_ms: 1000,
            click_delay_ms: 500,
            resolve_depth: 3,
            target_depth: 3,
            changed_node_depth: 5,
        }
    }
}
