use mutation_correlator::CorrelatorConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SessionConfig {
    /// Period of the full-page snapshot push while recording.
    pub snapshot_interval_ms: u64,
    pub correlator: CorrelatorConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            snapshot_interval_ms: 500,
            correlator: CorrelatorConfig::default(),
        }
    }
}
