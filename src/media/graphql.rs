//! Media introspection over the public post metadata endpoint
//!
//! `GET {api_url}/p/{shortcode}/?__a=1&__d=dis` returns a
//! `graphql.shortcode_media` document describing the post.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::time::Duration;

use super::{MediaIntrospector, MediaNode, MediaPost};
use crate::config::MediaConfig;
use crate::error::{Error, Result};

#[derive(Debug, Deserialize)]
struct Envelope {
    graphql: GraphQl,
}

#[derive(Debug, Deserialize)]
struct GraphQl {
    shortcode_media: ShortcodeMedia,
}

#[derive(Debug, Deserialize)]
struct ShortcodeMedia {
    #[serde(rename = "__typename")]
    typename: String,
    display_url: String,
    #[serde(default)]
    is_video: bool,
    #[serde(default)]
    video_url: Option<String>,
    taken_at_timestamp: i64,
    #[serde(default)]
    edge_sidecar_to_children: Option<Edges<NodeFields>>,
    #[serde(default)]
    edge_media_to_caption: Option<Edges<CaptionFields>>,
}

#[derive(Debug, Deserialize)]
struct Edges<T> {
    #[serde(default = "Vec::new")]
    edges: Vec<Edge<T>>,
}

#[derive(Debug, Deserialize)]
struct Edge<T> {
    node: T,
}

#[derive(Debug, Deserialize)]
struct NodeFields {
    display_url: String,
    #[serde(default)]
    is_video: bool,
    #[serde(default)]
    video_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CaptionFields {
    text: String,
}

impl From<NodeFields> for MediaNode {
    fn from(node: NodeFields) -> Self {
        MediaNode {
            display_url: node.display_url,
            is_video: node.is_video,
            video_url: node.video_url,
        }
    }
}

/// [`MediaIntrospector`] backed by the post metadata endpoint
#[derive(Clone, Debug)]
pub struct GraphQlIntrospector {
    client: reqwest::Client,
    api_url: String,
    timeout: Duration,
}

impl GraphQlIntrospector {
    /// Build an introspector from configuration
    pub fn new(config: &MediaConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("media-syncer/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(Error::Network)?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            timeout: config.timeout,
        })
    }

    fn parse(shortcode: &str, metadata: serde_json::Value) -> Result<MediaPost> {
        let failed = |reason: String| Error::ResolutionFailed {
            shortcode: shortcode.to_string(),
            reason,
        };

        let envelope: Envelope = serde_json::from_value(metadata.clone())
            .map_err(|e| failed(format!("unexpected metadata shape: {e}")))?;
        let media = envelope.graphql.shortcode_media;

        let taken_at = DateTime::<Utc>::from_timestamp(media.taken_at_timestamp, 0)
            .ok_or_else(|| failed(format!("bad timestamp {}", media.taken_at_timestamp)))?;

        let children = media
            .edge_sidecar_to_children
            .map(|e| e.edges.into_iter().map(|edge| edge.node.into()).collect())
            .unwrap_or_default();

        let caption = media
            .edge_media_to_caption
            .and_then(|e| e.edges.into_iter().next())
            .map(|edge| edge.node.text)
            .filter(|text| !text.is_empty());

        Ok(MediaPost {
            shortcode: shortcode.to_string(),
            typename: media.typename,
            taken_at,
            caption,
            primary: MediaNode {
                display_url: media.display_url,
                is_video: media.is_video,
                video_url: media.video_url,
            },
            children,
            metadata,
        })
    }
}

#[async_trait]
impl MediaIntrospector for GraphQlIntrospector {
    async fn lookup(&self, shortcode: &str) -> Result<MediaPost> {
        let failed = |reason: String| Error::ResolutionFailed {
            shortcode: shortcode.to_string(),
            reason,
        };

        let url = format!("{}/p/{}/", self.api_url, shortcode);
        tracing::debug!(shortcode, url = %url, "looking up post metadata");

        let response = self
            .client
            .get(&url)
            .query(&[("__a", "1"), ("__d", "dis")])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    failed(format!("metadata lookup timed out after {:?}", self.timeout))
                } else {
                    failed(e.to_string())
                }
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(failed("post not found".to_string()));
        }
        if !status.is_success() {
            return Err(failed(format!("metadata lookup returned status {status}")));
        }

        let metadata: serde_json::Value = response
            .json()
            .await
            .map_err(|e| failed(format!("unreadable metadata: {e}")))?;

        Self::parse(shortcode, metadata)
    }
}
