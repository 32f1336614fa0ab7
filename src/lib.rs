//! # media-syncer
//!
//! Pulls post image links out of a tabular data source, downloads the
//! referenced media into a local store, and publishes a descriptor for every
//! downloaded asset to a downstream platform.
//!
//! ## Entry points
//!
//! - **Automated run** - [`SyncOrchestrator`] drives fetch → filter → download → publish
//!   through an explicit, forward-only state machine.
//! - **HTTP** - [`api::create_router`] serves `POST /bulk/image` and `POST /bulk/post`
//!   on top of the same [`MediaDownloader`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use media_syncer::{
//!     AirtableSource, Config, GraphQlIntrospector, MediaDownloader, PublishClient,
//!     SyncOptions, SyncOrchestrator,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Arc::new(Config::from_env()?);
//!     config.validate_for_sync()?;
//!
//!     let source = Arc::new(AirtableSource::new(&config.source)?);
//!     let introspector = Arc::new(GraphQlIntrospector::new(&config.media)?);
//!     let downloader = MediaDownloader::new(config.clone(), introspector)?;
//!     let publisher = PublishClient::new(&config.publish)?;
//!
//!     let mut orchestrator =
//!         SyncOrchestrator::new(source, downloader, publisher, SyncOptions::default());
//!
//!     // Subscribe to progress events
//!     let mut events = orchestrator.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let report = orchestrator.run().await?;
//!     println!("published all: {}", report.success());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// HTTP API module
pub mod api;
/// URL classification
pub mod classifier;
/// Configuration types
pub mod config;
/// Download executor (decomposed into focused submodules)
pub mod downloader;
/// Error types
pub mod error;
/// Media resolution and introspection
pub mod media;
/// Publish client for the downstream platform
pub mod publish;
/// Retry logic with exponential backoff
pub mod retry;
/// Record repository gateway
pub mod source;
/// Automated run orchestration
pub mod sync;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use config::{Config, EligibilityPolicy};
pub use downloader::{FailurePolicy, MediaDownloader, PostBatchReport};
pub use error::{ApiError, Error, ErrorDetail, Result, ToHttpStatus};
pub use media::{GraphQlIntrospector, MediaIntrospector};
pub use publish::PublishClient;
pub use source::{AirtableSource, PersistMode, RecordSource};
pub use sync::{SyncOptions, SyncOrchestrator, SyncReport, SyncState};
pub use types::{AssetDescriptor, Event, PublishReport, PushResult, Record, Stage};

/// Resolve once a termination signal arrives.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// Used as the graceful-shutdown future of the API server.
pub async fn shutdown_signal() {
    wait_for_signal().await;
    tracing::info!("Shutting down");
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), Ok(mut sigint)) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            sigint.recv().await;
            tracing::info!("Received SIGINT signal (Ctrl+C)");
        }
        (Ok(mut sigterm), Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            sigterm.recv().await;
            tracing::info!("Received SIGTERM signal");
        }
        (Err(e), Err(_)) => {
            tracing::error!(error = %e, "Could not register any signal handlers, using ctrl_c fallback");
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
