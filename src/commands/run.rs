use anyhow::{bail, Result};
use colored::Colorize;
use hwp_tagger::config::{self, Config};
use hwp_tagger::interactive::run_interactive;
use hwp_tagger::prompt::{Prompter, StdinPrompter};
use hwp_tagger::signals::{setup_signal_handlers, Shutdown};
use hwp_tagger::sink::{ConsoleSink, FanoutSink, LogSink, RollingFileSink};
use hwp_tagger::source::{run_ingestion, LogSource, ReplaySource, TcpLineSource};
use hwp_tagger::tagger::LogsTagger;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::cli::RunArgs;

/// Execute the run command
///
/// This will:
/// 1. Apply CLI overrides to the configuration
/// 2. Open the persistent log (fatal if it cannot be created)
/// 3. Connect the log source
/// 4. Run ingestion and the operator session until either ends
pub async fn execute(cfg: Config, args: RunArgs) -> Result<()> {
    let cfg = apply_overrides(cfg, &args)?;

    let file_sink = RollingFileSink::create(&cfg.output.log_prefix, cfg.output.retention_days)?;
    println!(
        "{}",
        format!(
            "Log file: {}/{}.<date>.log",
            file_sink.directory().display(),
            file_sink.file_prefix()
        )
        .bright_green()
    );

    let sink: Arc<dyn LogSink> = Arc::new(FanoutSink::new(vec![
        Arc::new(file_sink),
        Arc::new(ConsoleSink),
    ]));
    let tagger = LogsTagger::initialize(sink, cfg.tagger.buffer_capacity)?;

    let source = open_source(&cfg, &args).await?;
    let prompter: Arc<dyn Prompter> = Arc::new(StdinPrompter::spawn()?);

    let shutdown = Shutdown::new();
    let signal_handle = setup_signal_handlers(shutdown.clone());

    let ingestion = tokio::spawn(run_ingestion(
        source,
        tagger.clone(),
        shutdown.clone(),
        cfg.tagger.idle_drain(),
    ));
    let interactive = tokio::spawn(run_interactive(prompter, tagger.clone(), shutdown.clone()));

    // Either task ending triggers shutdown, which stops the other one
    let ingestion_result = ingestion.await?;
    let queued = interactive.await??;
    signal_handle.await?;

    info!(
        "Session ended: {} tag(s) queued, {} line(s) left in buffer",
        queued,
        tagger.buffer_len().await
    );
    ingestion_result?;
    Ok(())
}

/// Merge command line flags over the loaded configuration
fn apply_overrides(mut cfg: Config, args: &RunArgs) -> Result<Config> {
    if let Some(device) = &args.device {
        cfg.device.address = Some(device.clone());
    }
    if let Some(prefix) = &args.log_prefix {
        cfg.output.log_prefix = prefix.clone();
    }
    if let Some(capacity) = args.buffer_capacity {
        cfg.tagger.buffer_capacity = capacity;
    }
    config::validate_config(&cfg)?;
    Ok(cfg)
}

async fn open_source(cfg: &Config, args: &RunArgs) -> Result<Box<dyn LogSource>> {
    if let Some(path) = &args.replay {
        let interval = Duration::from_millis(args.replay_interval_ms);
        return Ok(Box::new(ReplaySource::open(path, Some(interval)).await?));
    }

    match &cfg.device.address {
        Some(address) => Ok(Box::new(
            TcpLineSource::connect(address, cfg.device.connect_timeout()).await?,
        )),
        None => bail!("No log source: pass --device HOST:PORT, --replay FILE, or set device.address"),
    }
}
