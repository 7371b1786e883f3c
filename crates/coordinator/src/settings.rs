use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::{SettingsError, SettingsResult};

pub const DEFAULT_COLLECTOR_HOST: &str = "127.0.0.1";
pub const DEFAULT_COLLECTOR_PORT: u16 = 4934;
const COLLECTOR_PATH: &str = "action-data";

/// Where summaries go and whether values are masked on the way.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct CollectorSettings {
    pub host: String,
    pub port: u16,
    #[serde(alias = "mask_sensitive_data")]
    pub mask_sensitive_data: bool,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_COLLECTOR_HOST.to_string(),
            port: DEFAULT_COLLECTOR_PORT,
            mask_sensitive_data: false,
        }
    }
}

impl CollectorSettings {
    pub fn endpoint(&self) -> SettingsResult<Url> {
        let base = Url::parse(&format!("http://{}:{}/", self.host, self.port))?;
        Ok(base.join(COLLECTOR_PATH)?)
    }
}

/// Read side of the persisted collector settings.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn load(&self) -> SettingsResult<CollectorSettings>;
}

/// Settings held in memory; the CLI fills it from the config file.
#[derive(Debug, Default)]
pub struct StaticSettings {
    inner: RwLock<Option<CollectorSettings>>,
}

impl StaticSettings {
    pub fn new(settings: CollectorSettings) -> Self {
        Self {
            inner: RwLock::new(Some(settings)),
        }
    }

    /// A store that has nothing to offer, so callers fall back to defaults.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn replace(&self, settings: CollectorSettings) {
        *self.inner.write() = Some(settings);
    }
}

#[async_trait]
impl SettingsStore for StaticSettings {
    async fn load(&self) -> SettingsResult<CollectorSettings> {
        self.inner
            .read()
            .clone()
            .ok_or_else(|| SettingsError::Unavailable("no collector settings stored".into()))
    }
}
