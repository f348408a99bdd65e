//! rilld - the rill daemon
//!
//! # Usage
//!
//! ```bash
//! rilld --config /etc/rill/rill.toml
//! rilld --config rill.toml --log-level debug
//! ```
//!
//! Exit status is 0 on clean shutdown and non-zero when the configuration
//! fails to load; every per-section problem is reported before exiting so
//! one run surfaces them all.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use rill_config::{GlobalConfig, DAEMON_SECTION};
use rill_pipeline::PipelineConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// rill - pluggable log/event processing daemon
#[derive(Parser, Debug)]
#[command(name = "rilld")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "configs/rill.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;
    serve(cli).await
}

async fn serve(cli: Cli) -> Result<()> {
    let globals = load_globals(&cli.config)
        .with_context(|| format!("reading globals from {}", cli.config.display()))?;

    rill_pipeline::register_builtins();
    let config = Arc::new(PipelineConfig::new(Some(globals)));

    config
        .preload_from_config_file(&cli.config)
        .with_context(|| format!("pre-loading {}", cli.config.display()))?;
    config
        .load_config()
        .context("loading plugin configuration")?;

    config.start_runners().context("starting runners")?;
    info!(config = %cli.config.display(), "rilld running");

    tokio::signal::ctrl_c()
        .await
        .context("listening for shutdown signal")?;
    info!("shutdown signal received");

    shutdown(&config).await;
    info!("clean shutdown");
    Ok(())
}

/// Decode the `[rilld]` section ahead of plugin loading
fn load_globals(path: &Path) -> Result<GlobalConfig> {
    let text = rill_config::expand_file(path)?;
    let sections = rill_config::decode_sections(&text)?;
    for (name, table) in sections {
        if name == DAEMON_SECTION {
            let globals = toml::Value::Table(table)
                .try_into()
                .context("decoding [rilld] globals")?;
            return Ok(globals);
        }
    }
    Ok(GlobalConfig::default())
}

/// Wind the pipeline down: inputs first, then filters, then decoders
///
/// Filters stop on their own once the aborting router drops their
/// matchers; the wait-groups here just hold the exit until every runner
/// task has wound down.
async fn shutdown(config: &Arc<PipelineConfig>) {
    config.globals().shut_down();

    config.stop_inputs();
    config.inputs_tracker().close();
    config.inputs_tracker().wait().await;

    config.filters_tracker().close();
    config.filters_tracker().wait().await;

    config.stop_decoders();
    config.decoders_tracker().close();
    config.decoders_tracker().wait().await;
}

/// Install the log subscriber
///
/// A daemon with a mistyped `--log-level` should refuse to start rather
/// than run half-silent, so a bad directive is an error here.
fn init_logging(level: &str) -> Result<()> {
    let filter =
        EnvFilter::try_new(level).with_context(|| format!("invalid log level '{level}'"))?;

    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}
