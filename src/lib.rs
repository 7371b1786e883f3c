//! ActionTrail: records user actions on a page together with the DOM
//! changes they cause and forwards the summaries to a collector.
//!
//! The library side exposes scenario replay for integration testing.

pub mod cli;
pub mod config;
pub mod output;
pub mod replay;
pub mod scenario;

pub use config::Config;
pub use output::JsonLinesTransport;
pub use replay::{ReplayReport, Replayer};
pub use scenario::{Scenario, Step, StepAction};
