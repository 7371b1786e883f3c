//! The coordinator shared by every observation context.
//!
//! [`CoordinatorState`] holds dedup, task and snapshot bookkeeping per
//! context; [`CoordinatorRuntime`] drives it from a tokio task and owns the
//! collector transport, the settings cache and the observer bus.

pub mod errors;
pub mod runtime;
pub mod settings;
pub mod state;
pub mod transport;

pub use errors::{SettingsError, SettingsResult, TransportError, TransportResult};
pub use runtime::{CoordinatorHandle, CoordinatorRuntime, ObserverBus};
pub use settings::{CollectorSettings, SettingsStore, StaticSettings};
pub use state::{CoordinatorConfig, CoordinatorState, DedupClass, Handled, TabState, FORWARD_BACK_QUALIFIER};
pub use transport::{CollectorTransport, HttpTransport, MemoryTransport};
