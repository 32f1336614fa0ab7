//! Mock services and the configuration pointing at them

use std::collections::HashMap;
use tempfile::TempDir;
use media_syncer::Config;
use serde_json::Value;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::fixtures::JPEG_BYTES;

pub const BASE_ID: &str = "appTest";
pub const TABLE_NAME: &str = "Products";
pub const PUBLIC_URL: &str = "http://media.test";

/// Every external service the pipeline talks to, plus a scratch data directory
pub struct TestEnv {
    pub source: MockServer,
    pub media: MockServer,
    pub cdn: MockServer,
    pub platform: MockServer,
    pub temp_dir: TempDir,
}

impl TestEnv {
    /// Start all mock servers; the CDN answers every GET with [`JPEG_BYTES`]
    pub async fn start() -> Self {
        let cdn = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(JPEG_BYTES.to_vec()))
            .mount(&cdn)
            .await;

        Self {
            source: MockServer::start().await,
            media: MockServer::start().await,
            cdn,
            platform: MockServer::start().await,
            temp_dir: tempfile::tempdir().expect("Failed to create temp dir"),
        }
    }

    /// Serve a single source page holding `rows`
    pub async fn mount_source_rows(&self, rows: Vec<Value>) {
        Mock::given(method("GET"))
            .and(path(format!("/v0/{BASE_ID}/{TABLE_NAME}")))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(super::source_page(rows, None)),
            )
            .mount(&self.source)
            .await;
    }

    /// Serve post metadata for `shortcode`
    pub async fn mount_post(&self, shortcode: &str, payload: Value) {
        Mock::given(method("GET"))
            .and(path(format!("/p/{shortcode}/")))
            .respond_with(ResponseTemplate::new(200).set_body_json(payload))
            .mount(&self.media)
            .await;
    }

    /// Data directory the pipeline writes under
    pub fn data_dir(&self) -> std::path::PathBuf {
        self.temp_dir.path().join("downloads")
    }

    /// Configuration for this environment, with `extra` overriding any key
    pub fn config(&self, extra: &[(&str, &str)]) -> Config {
        let mut vars: HashMap<String, String> = HashMap::from([
            ("AIRTABLE_API_URL".into(), format!("{}/v0", self.source.uri())),
            ("AIRTABLE_API_KEY".into(), "keyTest".into()),
            ("AIRTABLE_BASE_ID".into(), BASE_ID.into()),
            ("AIRTABLE_TABLE_NAME".into(), TABLE_NAME.into()),
            ("MEDIA_API_URL".into(), self.media.uri()),
            ("PUBLISH_ENDPOINT".into(), format!("{}/api/assets/", self.platform.uri())),
            ("AUTHORIZATION_TOKEN".into(), "platform-token".into()),
            ("DATA_DIR".into(), self.data_dir().display().to_string()),
            ("PUBLIC_URL".into(), PUBLIC_URL.into()),
            ("HTTP_TIMEOUT_SECS".into(), "5".into()),
        ]);
        for (key, value) in extra {
            vars.insert(key.to_string(), value.to_string());
        }

        Config::from_lookup(|key| vars.get(key).cloned()).expect("test config should parse")
    }
}
