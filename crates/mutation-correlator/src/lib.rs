//! Correlation of DOM mutations with the user actions that caused them.
//!
//! Everything here is synchronous and clock-free: callers pass the
//! timestamp of each observation and schedule the returned deadlines.

pub mod buffer;
pub mod config;
pub mod correlator;
pub mod debounce;
pub mod form;
pub mod input_tracker;
pub mod summary;
pub mod transform;

pub use buffer::{MutationBuffer, TimedRecord};
pub use config::CorrelatorConfig;
pub use correlator::{ActionCorrelator, BeginOutcome, Completion, CorrelationId, CorrelationInputs};
pub use debounce::{ClickArm, ClickDebouncer, PendingClick};
pub use form::capture_form;
pub use input_tracker::{associated_control, is_blur_tracked, is_input_like, InputTracker, ValueChange};
pub use summary::SummaryBuilder;
pub use transform::RecordTransformer;
