//! Configuration types for media-syncer
//!
//! A [`Config`] is built once at process start (usually through
//! [`Config::from_env`]) and shared as `Arc<Config>` with every component.

use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};
use utoipa::ToSchema;

use crate::error::{Error, Result};

/// URL prefix under which the data directory is served read-only
pub const STATIC_PREFIX: &str = "/downloads";

/// Tabular data source settings
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct SourceConfig {
    /// REST base of the tabular API (default: "https://api.airtable.com/v0")
    #[serde(default = "default_source_api_url")]
    pub api_url: String,

    /// API key sent as a bearer token
    #[serde(default)]
    pub api_key: Option<String>,

    /// Base identifier
    #[serde(default)]
    pub base_id: Option<String>,

    /// Table name or identifier
    #[serde(default)]
    pub table_name: Option<String>,

    /// Column holding the image link (default: "Image Link")
    #[serde(default = "default_filter_column")]
    pub filter_column: String,

    /// Rows requested per page (default: 100)
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Stop after this many rows (default: 20000, None = unbounded)
    #[serde(default = "default_max_items")]
    pub max_items: Option<usize>,

    /// Per-request timeout (default: 30 seconds)
    #[serde(default = "default_http_timeout", with = "duration_serde")]
    pub timeout: Duration,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            api_url: default_source_api_url(),
            api_key: None,
            base_id: None,
            table_name: None,
            filter_column: default_filter_column(),
            page_size: default_page_size(),
            max_items: default_max_items(),
            timeout: default_http_timeout(),
        }
    }
}

/// On-disk layout settings
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct StorageConfig {
    /// Root of everything the syncer writes (default: "./downloads")
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl StorageConfig {
    /// Directory holding the persisted record sets
    pub fn json_dir(&self) -> PathBuf {
        self.data_dir.join("json")
    }

    /// Raw fetched records
    pub fn raw_records_path(&self) -> PathBuf {
        self.json_dir().join("data.json")
    }

    /// Records that passed the eligibility filter
    pub fn filtered_records_path(&self) -> PathBuf {
        self.json_dir().join("instagram.json")
    }

    /// Per-shortcode single image downloads
    pub fn images_dir(&self) -> PathBuf {
        self.data_dir.join("images")
    }

    /// Per-record post bundles
    pub fn posts_dir(&self) -> PathBuf {
        self.data_dir.join("posts")
    }
}

/// Which post URLs count as eligible for download
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EligibilityPolicy {
    /// Any post URL that is not a story/highlight (default)
    #[default]
    AnyPost,
    /// Additionally require `img_index` > 1
    MultiImageOnly,
}

impl FromStr for EligibilityPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "any_post" | "any" => Ok(Self::AnyPost),
            "multi_image_only" | "multi_image" | "strict" => Ok(Self::MultiImageOnly),
            other => Err(Error::Config {
                message: format!("unknown eligibility policy '{other}'"),
                key: Some("ELIGIBILITY_POLICY".to_string()),
            }),
        }
    }
}

/// Download executor settings
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DownloadConfig {
    /// Maximum number of items in one download batch (default: 50)
    #[serde(default = "default_max_items_per_batch")]
    pub max_items_per_batch: usize,

    /// Eligibility filter policy
    #[serde(default)]
    pub eligibility: EligibilityPolicy,

    /// Timeout for a single media file fetch (default: 30 seconds)
    #[serde(default = "default_http_timeout", with = "duration_serde")]
    pub timeout: Duration,

    /// Retry behavior for media file fetches
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            max_items_per_batch: default_max_items_per_batch(),
            eligibility: EligibilityPolicy::default(),
            timeout: default_http_timeout(),
            retry: RetryConfig::default(),
        }
    }
}

/// Media introspection service settings
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct MediaConfig {
    /// Base URL of the introspection service (default: "https://www.instagram.com")
    #[serde(default = "default_media_api_url")]
    pub api_url: String,

    /// Timeout for a metadata lookup (default: 30 seconds)
    #[serde(default = "default_http_timeout", with = "duration_serde")]
    pub timeout: Duration,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            api_url: default_media_api_url(),
            timeout: default_http_timeout(),
        }
    }
}

/// Downstream platform settings
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PublishConfig {
    /// Endpoint receiving one POST per descriptor
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Token placed in the Authorization header
    #[serde(default)]
    pub auth_token: Option<String>,

    /// Authorization scheme (default: "Token")
    #[serde(default = "default_auth_scheme")]
    pub auth_scheme: String,

    /// Per-request timeout (default: 30 seconds)
    #[serde(default = "default_http_timeout", with = "duration_serde")]
    pub timeout: Duration,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            auth_token: None,
            auth_scheme: default_auth_scheme(),
            timeout: default_http_timeout(),
        }
    }
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:8000)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    /// Public base URL used to build asset URLs (default: "http://localhost:8000")
    #[serde(default = "default_public_url")]
    pub public_url: String,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Enable Swagger UI at /swagger-ui (default: false)
    #[serde(default)]
    pub swagger_ui: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            public_url: default_public_url(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: false,
        }
    }
}

impl ApiConfig {
    /// Public URL for a path relative to the data directory
    pub fn asset_url(&self, relative: &str) -> String {
        format!(
            "{}{}/{}",
            self.public_url.trim_end_matches('/'),
            STATIC_PREFIX,
            relative.trim_start_matches('/')
        )
    }
}

/// Retry configuration for transient failures
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 30 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

/// Main configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// Tabular data source
    #[serde(default)]
    pub source: SourceConfig,

    /// On-disk layout
    #[serde(default)]
    pub storage: StorageConfig,

    /// Download executor
    #[serde(default)]
    pub download: DownloadConfig,

    /// Media introspection service
    #[serde(default)]
    pub media: MediaConfig,

    /// Downstream platform
    #[serde(default)]
    pub publish: PublishConfig,

    /// HTTP surface
    #[serde(default)]
    pub api: ApiConfig,
}

impl Config {
    /// Build a configuration from process environment variables.
    ///
    /// Call `dotenvy::dotenv()` first if a `.env` file should be honored.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    ///
    /// Unset and blank values fall back to defaults; values that are set but
    /// do not parse are a [`Error::Config`] naming the key.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut config = Config::default();

        if let Some(v) = get("AIRTABLE_API_URL") {
            config.source.api_url = v;
        }
        config.source.api_key = get("AIRTABLE_API_KEY");
        config.source.base_id = get("AIRTABLE_BASE_ID");
        config.source.table_name = get("AIRTABLE_TABLE_NAME");
        if let Some(v) = get("AIRTABLE_FILTER_COLUMN") {
            config.source.filter_column = v;
        }
        if let Some(v) = get("PAGE_SIZE") {
            config.source.page_size = parse_value("PAGE_SIZE", &v)?;
        }
        if let Some(v) = get("MAX_ITEMS") {
            let max: i64 = parse_value("MAX_ITEMS", &v)?;
            config.source.max_items = match max {
                -1 => None,
                n if n >= 0 => Some(n as usize),
                _ => {
                    return Err(Error::Config {
                        message: format!("MAX_ITEMS must be -1 or non-negative, got {max}"),
                        key: Some("MAX_ITEMS".to_string()),
                    });
                }
            };
        }

        if let Some(v) = get("DATA_DIR") {
            config.storage.data_dir = PathBuf::from(v);
        }

        if let Some(v) = get("DOWNLOAD_IMAGE_LIMIT") {
            config.download.max_items_per_batch = parse_value("DOWNLOAD_IMAGE_LIMIT", &v)?;
        }
        if let Some(v) = get("ELIGIBILITY_POLICY") {
            config.download.eligibility = v.parse()?;
        }

        if let Some(v) = get("MEDIA_API_URL") {
            config.media.api_url = v;
        }

        config.publish.endpoint = get("PUBLISH_ENDPOINT");
        config.publish.auth_token = get("AUTHORIZATION_TOKEN");
        if let Some(v) = get("PUBLISH_AUTH_SCHEME") {
            config.publish.auth_scheme = v;
        }

        if let Some(v) = get("BIND_ADDRESS") {
            config.api.bind_address = parse_value("BIND_ADDRESS", &v)?;
        }
        if let Some(v) = get("SERVER_HOST") {
            config.api.public_url = format!("http://{v}");
        }
        // An explicit public URL wins over the bare host form
        if let Some(v) = get("PUBLIC_URL") {
            config.api.public_url = v;
        }

        if let Some(v) = get("HTTP_TIMEOUT_SECS") {
            let timeout = Duration::from_secs(parse_value("HTTP_TIMEOUT_SECS", &v)?);
            config.source.timeout = timeout;
            config.download.timeout = timeout;
            config.media.timeout = timeout;
            config.publish.timeout = timeout;
        }

        if config.source.page_size == 0 {
            return Err(Error::Config {
                message: "PAGE_SIZE must be greater than zero".to_string(),
                key: Some("PAGE_SIZE".to_string()),
            });
        }

        Ok(config)
    }

    /// Check everything an automated run needs before it starts
    pub fn validate_for_sync(&self) -> Result<()> {
        let required = [
            ("AIRTABLE_API_KEY", self.source.api_key.as_deref()),
            ("AIRTABLE_BASE_ID", self.source.base_id.as_deref()),
            ("AIRTABLE_TABLE_NAME", self.source.table_name.as_deref()),
            ("PUBLISH_ENDPOINT", self.publish.endpoint.as_deref()),
        ];

        for (key, value) in required {
            if value.is_none() {
                return Err(Error::Config {
                    message: format!("{key} is required for an automated sync"),
                    key: Some(key.to_string()),
                });
            }
        }
        Ok(())
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| Error::Config {
        message: format!("invalid value '{value}' for {key}"),
        key: Some(key.to_string()),
    })
}

fn default_source_api_url() -> String {
    "https://api.airtable.com/v0".to_string()
}

fn default_filter_column() -> String {
    "Image Link".to_string()
}

fn default_page_size() -> usize {
    100
}

fn default_max_items() -> Option<usize> {
    Some(20_000)
}

fn default_http_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./downloads")
}

fn default_max_items_per_batch() -> usize {
    50
}

fn default_media_api_url() -> String {
    "https://www.instagram.com".to_string()
}

fn default_auth_scheme() -> String {
    "Token".to_string()
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8000))
}

fn default_public_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_true() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(30)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
