//! Recording lifecycle and the per-context observation runtime.
//!
//! [`ObservationContext`] is the synchronous core: a document, its registry,
//! the mutation buffer, the correlator and the recording session. Every
//! entry point returns [`Effect`]s. [`ContextRuntime`] executes them on a
//! tokio task, arming timers and talking to the coordinator.

pub mod config;
pub mod context;
pub mod errors;
pub mod runtime;
pub mod state;

pub use config::SessionConfig;
pub use context::{Effect, HostCapabilities, ObservationContext, TimerKind};
pub use errors::{RuntimeError, RuntimeResult};
pub use runtime::{ContextHandle, ContextRuntime};
pub use state::{RecordingSession, RecordingState, SessionCommand, TransitionOutcome};
