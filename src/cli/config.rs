use std::path::Path;

use crate::cli::context::CliContext;
use crate::config::Config;
use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use tokio::fs;
use tracing::info;

#[derive(Args, Clone, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

#[derive(Subcommand, Clone, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration (default)
    Show,

    /// Print the configuration file path
    Path,

    /// Write the defaults to the configuration file
    Reset,

    /// Check that the configuration file parses
    Validate,
}

pub async fn cmd_config(args: ConfigArgs, ctx: &CliContext) -> Result<()> {
    let path = ctx.config_path();
    match args.action.unwrap_or(ConfigAction::Show) {
        ConfigAction::Show => {
            println!("# effective configuration ({})", path.display());
            println!("{}", serde_yaml::to_string(ctx.config())?);
        }
        ConfigAction::Path => println!("{}", path.display()),
        ConfigAction::Reset => {
            save_config_file(path, &Config::default()).await?;
            println!(
                "Configuration reset to defaults and written to {}",
                path.display()
            );
        }
        ConfigAction::Validate => {
            let content = fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let config: Config =
                serde_yaml::from_str(&content).context("Failed to parse config file")?;
            config.collector.endpoint()?;
            println!("Configuration is valid");
        }
    }
    Ok(())
}

async fn save_config_file(path: &Path, config: &Config) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create config directory")?;
        }
    }
    let content = serde_yaml::to_string(config)?;
    fs::write(path, content)
        .await
        .context("Failed to write config file")?;
    info!("Wrote configuration to {}", path.display());
    Ok(())
}
