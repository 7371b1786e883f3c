//! Application configuration loaded from YAML.

use serde::{Deserialize, Serialize};
use snapshot_sanitizer::SanitizerPolicyView;
use trail_coordinator::{CollectorSettings, CoordinatorConfig};

use recording_session::SessionConfig;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub collector: CollectorSettings,
    pub session: SessionConfig,
    pub coordinator: CoordinatorConfig,
    pub sanitizer: SanitizerPolicyView,
    /// Events kept per observer before slow subscribers start losing them.
    pub observer_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            collector: CollectorSettings::default(),
            session: SessionConfig::default(),
            coordinator: CoordinatorConfig::default(),
            sanitizer: SanitizerPolicyView::default(),
            observer_capacity: 1024,
        }
    }
}
