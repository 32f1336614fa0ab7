//! Download executor split into focused submodules.
//!
//! The `MediaDownloader` struct and its methods are organized by concern:
//! - [`image`] - single image downloads with the on-disk cache check
//! - [`post`] - full post bundles and the post batch
//! - [`archive`] - zip packaging of a directory tree
//! - [`locks`] - per-shortcode critical sections

pub mod archive;
mod image;
pub mod locks;
mod post;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

pub use archive::package_archive;
pub use image::image_file_name;
pub use locks::ShortcodeLocks;
pub use post::PostBatchReport;

use std::sync::Arc;
use tokio::sync::broadcast;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::media::{MediaIntrospector, ShortcodeMap};
use crate::retry::with_retry;
use crate::types::{AssetDescriptor, Event, Record, Stage};

/// How a batch reacts to an error that belongs to a single item
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Stop the batch and return the error (request-driven batches)
    #[default]
    Abort,
    /// Log the item, report it as skipped, and carry on (automated runs)
    SkipItem,
}

/// Downloads images and post bundles into the data directory (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct MediaDownloader {
    /// Configuration shared with the rest of the process
    pub(crate) config: Arc<Config>,
    /// Metadata lookups for shortcodes
    pub(crate) introspector: Arc<dyn MediaIntrospector>,
    /// Client for media byte fetches
    pub(crate) client: reqwest::Client,
    /// Serializes work on the same shortcode
    pub(crate) locks: ShortcodeLocks,
    /// Progress events, when someone is listening
    pub(crate) event_tx: Option<broadcast::Sender<Event>>,
}

impl MediaDownloader {
    /// Create a downloader writing under `config.storage.data_dir`
    pub fn new(config: Arc<Config>, introspector: Arc<dyn MediaIntrospector>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.download.timeout)
            .build()
            .map_err(Error::Network)?;

        Ok(Self {
            config,
            introspector,
            client,
            locks: ShortcodeLocks::new(),
            event_tx: None,
        })
    }

    /// Broadcast progress events on `event_tx`
    pub fn with_events(mut self, event_tx: broadcast::Sender<Event>) -> Self {
        self.event_tx = Some(event_tx);
        self
    }

    /// Configuration this downloader was built with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Fail with [`Error::LimitExceeded`] when `count` is above the per-batch ceiling.
    ///
    /// Callers run this before touching the filesystem or the network.
    pub fn enforce_limit(&self, count: usize) -> Result<()> {
        let limit = self.config.download.max_items_per_batch;
        if count > limit {
            tracing::warn!(requested = count, limit, "batch rejected, over the item limit");
            return Err(Error::LimitExceeded {
                requested: count,
                limit,
            });
        }
        Ok(())
    }

    /// Resolve and download one image per record, in order of first appearance.
    ///
    /// Records sharing an id collapse to the last one seen. The limit applies
    /// to the resolved batch and is checked before any download starts.
    pub async fn download_images(
        &self,
        records: &[Record],
        policy: FailurePolicy,
    ) -> Result<Vec<AssetDescriptor>> {
        let map = match policy {
            FailurePolicy::Abort => ShortcodeMap::build(records)?,
            FailurePolicy::SkipItem => {
                let (map, failures) = ShortcodeMap::build_lenient(records);
                for (id, error) in failures {
                    self.skip_item(Stage::DownloadingImages, &id, &error);
                }
                map
            }
        };
        self.enforce_limit(map.len())?;

        self.emit(Event::StageStarted {
            stage: Stage::DownloadingImages,
            total: Some(map.len() as u64),
        });

        let mut descriptors = Vec::with_capacity(map.len());
        for (completed, (id, target)) in map.iter().enumerate() {
            match self
                .download_image(&target.shortcode, id, target.image_index)
                .await
            {
                Ok(descriptor) => descriptors.push(descriptor),
                Err(e) if policy == FailurePolicy::SkipItem && e.is_item_error() => {
                    self.skip_item(Stage::DownloadingImages, id, &e);
                }
                Err(e) => {
                    tracing::error!(id, shortcode = %target.shortcode, error = %e, "image batch aborted");
                    return Err(e);
                }
            }
            self.emit(Event::Progress {
                stage: Stage::DownloadingImages,
                completed: completed as u64 + 1,
            });
        }

        self.emit(Event::StageCompleted {
            stage: Stage::DownloadingImages,
        });
        tracing::info!(
            requested = map.len(),
            downloaded = descriptors.len(),
            "image batch finished"
        );
        Ok(descriptors)
    }

    /// Fetch a media file, retrying transient failures
    pub(crate) async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        with_retry(&self.config.download.retry, || async move {
            let response = self.client.get(url).send().await?.error_for_status()?;
            Ok::<_, Error>(response.bytes().await?.to_vec())
        })
        .await
    }

    pub(crate) fn emit(&self, event: Event) {
        if let Some(tx) = &self.event_tx {
            // No subscribers is fine
            tx.send(event).ok();
        }
    }

    fn skip_item(&self, stage: Stage, id: &str, error: &Error) {
        tracing::warn!(id, error = %error, "skipping item");
        self.emit(Event::ItemSkipped {
            stage,
            external_id: id.to_string(),
            reason: error.to_string(),
        });
    }
}
