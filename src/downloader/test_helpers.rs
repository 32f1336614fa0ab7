//! Shared test helpers for creating MediaDownloader instances in tests.

use crate::config::{Config, RetryConfig};
use crate::downloader::MediaDownloader;
use crate::error::{Error, Result};
use crate::media::{MediaIntrospector, MediaNode, MediaPost, SIDECAR_TYPENAME};
use crate::types::Record;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Timestamp every stub post is "taken" at
pub(crate) fn taken_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 5, 17, 12, 0, 0).unwrap()
}

/// In-memory introspector that counts lookups
#[derive(Default)]
pub(crate) struct StubIntrospector {
    posts: Mutex<HashMap<String, MediaPost>>,
    lookups: AtomicUsize,
}

impl StubIntrospector {
    pub(crate) fn add(&self, post: MediaPost) {
        self.posts
            .lock()
            .unwrap()
            .insert(post.shortcode.clone(), post);
    }

    pub(crate) fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaIntrospector for StubIntrospector {
    async fn lookup(&self, shortcode: &str) -> Result<MediaPost> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.posts
            .lock()
            .unwrap()
            .get(shortcode)
            .cloned()
            .ok_or_else(|| Error::ResolutionFailed {
                shortcode: shortcode.to_string(),
                reason: "post not found".to_string(),
            })
    }
}

fn node(url: String) -> MediaNode {
    MediaNode {
        display_url: url,
        is_video: false,
        video_url: None,
    }
}

/// Single-image post whose media lives on `cdn`
pub(crate) fn single_post(shortcode: &str, cdn: &MockServer) -> MediaPost {
    MediaPost {
        shortcode: shortcode.to_string(),
        typename: "GraphImage".to_string(),
        taken_at: taken_at(),
        caption: Some(format!("caption for {shortcode}")),
        primary: node(format!("{}/{shortcode}/primary.jpg", cdn.uri())),
        children: vec![],
        metadata: serde_json::json!({ "shortcode": shortcode }),
    }
}

/// Sidecar post with `children` images on `cdn`
pub(crate) fn sidecar_post(shortcode: &str, children: usize, cdn: &MockServer) -> MediaPost {
    MediaPost {
        typename: SIDECAR_TYPENAME.to_string(),
        children: (1..=children)
            .map(|i| node(format!("{}/{shortcode}/{i}.jpg", cdn.uri())))
            .collect(),
        ..single_post(shortcode, cdn)
    }
}

/// CDN that answers every GET with a small jpeg body
pub(crate) async fn cdn_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"\xFF\xD8jpeg".to_vec()))
        .mount(&server)
        .await;
    server
}

pub(crate) fn record(id: &str, link: &str) -> Record {
    Record::new(id, link).unwrap()
}

/// Downloader over a temp data directory and a stub introspector
pub(crate) struct Harness {
    pub(crate) downloader: MediaDownloader,
    pub(crate) introspector: Arc<StubIntrospector>,
    _temp_dir: TempDir,
}

impl Harness {
    pub(crate) fn new(limit: usize) -> Self {
        let temp_dir = tempfile::tempdir().unwrap();

        let mut config = Config::default();
        config.storage.data_dir = temp_dir.path().join("downloads");
        config.download.max_items_per_batch = limit;
        config.download.timeout = Duration::from_secs(5);
        config.download.retry = RetryConfig {
            max_attempts: 2,
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(50),
            backoff_multiplier: 2.0,
            jitter: false,
        };
        config.api.public_url = "http://media.test".to_string();

        let introspector = Arc::new(StubIntrospector::default());
        let downloader = MediaDownloader::new(Arc::new(config), introspector.clone()).unwrap();

        Self {
            downloader,
            introspector,
            _temp_dir: temp_dir,
        }
    }

    pub(crate) fn data_dir(&self) -> &Path {
        &self.downloader.config.storage.data_dir
    }
}
