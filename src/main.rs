mod cli;
mod progress;

use clap::Parser;
use cli::{Cli, Command, SyncArgs};
use media_syncer::{
    AirtableSource, Config, GraphQlIntrospector, MediaDownloader, PublishClient, SyncOptions,
    SyncOrchestrator, api,
};
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

const DEFAULT_LOG_FILTER: &str = "media_syncer=info,tower_http=info";

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is fine
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "media-syncer failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> media_syncer::Result<ExitCode> {
    let config = Arc::new(Config::from_env()?);

    match cli.command {
        Command::Serve => {
            let introspector = Arc::new(GraphQlIntrospector::new(&config.media)?);
            let downloader = Arc::new(MediaDownloader::new(config.clone(), introspector)?);
            api::start_api_server(downloader, config).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Sync(args) => sync(config, args).await,
    }
}

async fn sync(config: Arc<Config>, args: SyncArgs) -> media_syncer::Result<ExitCode> {
    config.validate_for_sync()?;
    let persist_mode = args.persist_mode(&config.storage.raw_records_path())?;

    let source = Arc::new(AirtableSource::new(&config.source)?);
    let introspector = Arc::new(GraphQlIntrospector::new(&config.media)?);
    let downloader = MediaDownloader::new(config.clone(), introspector)?;
    let publisher = PublishClient::new(&config.publish)?;

    let mut orchestrator =
        SyncOrchestrator::new(source, downloader, publisher, SyncOptions { persist_mode });
    let renderer = (!args.no_progress).then(|| progress::spawn(orchestrator.subscribe()));

    let result = orchestrator.run().await;
    let final_state = orchestrator.state();

    // Dropping the orchestrator closes the event channel and stops the renderer
    drop(orchestrator);
    if let Some(renderer) = renderer {
        renderer.await.ok();
    }

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            tracing::error!(state = %final_state, error = %e, "sync halted before completion");
            return Ok(ExitCode::FAILURE);
        }
    };

    for failure in report.publish.failures() {
        tracing::warn!(
            external_id = %failure.external_id,
            status = ?failure.status_code,
            "asset was not published"
        );
    }

    if report.success() || args.allow_partial {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(2))
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Console logging plus an optional plain-text copy in `LOG_FILE`
fn init_tracing() {
    let console = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(env_filter());

    let mut open_error = None;
    let file_layer = std::env::var("LOG_FILE")
        .ok()
        .filter(|path| !path.trim().is_empty())
        .and_then(|path| {
            match std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
            {
                Ok(file) => Some(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(Mutex::new(file))
                        .with_filter(env_filter()),
                ),
                Err(e) => {
                    open_error = Some((path, e));
                    None
                }
            }
        });

    tracing_subscriber::registry()
        .with(console)
        .with(file_layer)
        .init();

    if let Some((path, e)) = open_error {
        tracing::warn!(path = %path, error = %e, "could not open log file, logging to console only");
    }
}
