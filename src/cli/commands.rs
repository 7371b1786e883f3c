use clap::Subcommand;

use super::config::ConfigArgs;
use super::replay::ReplayArgs;

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Replay a scripted page session through the recorder
    Replay(ReplayArgs),

    /// Inspect the effective configuration
    Config(ConfigArgs),
}
