use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use trail_coordinator::{CollectorTransport, HttpTransport};

use crate::cli::context::CliContext;
use crate::output::JsonLinesTransport;
use crate::replay::Replayer;
use crate::scenario::Scenario;

#[derive(Args, Clone, Debug)]
pub struct ReplayArgs {
    /// Scenario file (YAML, or JSON with a .json extension)
    pub scenario: PathBuf,

    /// Print summaries as JSON lines instead of posting them
    #[arg(long)]
    pub dry_run: bool,

    /// Override the collector host
    #[arg(long)]
    pub host: Option<String>,

    /// Override the collector port
    #[arg(long)]
    pub port: Option<u16>,

    /// Mask sensitive values before delivery
    #[arg(long)]
    pub mask: bool,
}

pub async fn cmd_replay(args: ReplayArgs, ctx: &CliContext) -> Result<()> {
    let scenario = Scenario::from_path(&args.scenario)?;

    let mut config = ctx.config().clone();
    if let Some(host) = args.host {
        config.collector.host = host;
    }
    if let Some(port) = args.port {
        config.collector.port = port;
    }
    if args.mask {
        config.collector.mask_sensitive_data = true;
    }

    let transport: Arc<dyn CollectorTransport> = if args.dry_run {
        Arc::new(JsonLinesTransport::stdout())
    } else {
        Arc::new(HttpTransport::new()?)
    };

    let report = Replayer::new(config, transport).run(&scenario).await?;
    eprintln!(
        "{} steps applied, {} skipped, {} summaries, {} typed events, {} navigations not accepted",
        report.steps_applied,
        report.steps_skipped,
        report.summaries.len(),
        report.typed_events,
        report.unaccepted_navigations
    );
    Ok(())
}
