pub mod app;
pub mod commands;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod env;
pub mod replay;
pub mod runtime;

pub use config::{cmd_config, ConfigArgs};
pub use replay::{cmd_replay, ReplayArgs};
