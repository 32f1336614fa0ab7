//! Media resolution
//!
//! Turns a [`Record`] into a shortcode plus optional sub-image index, and a
//! shortcode into concrete fetchable media through a [`MediaIntrospector`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::classifier;
use crate::error::{Error, Result};
use crate::types::{Record, ShortcodeTarget};

pub mod graphql;

pub use graphql::GraphQlIntrospector;

/// Post type name for multi-image posts
pub const SIDECAR_TYPENAME: &str = "GraphSidecar";

/// A single image or video inside a post
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaNode {
    /// Full-resolution image URL (the poster frame for videos)
    pub display_url: String,
    /// Whether this node is a video
    pub is_video: bool,
    /// Video file URL, present for video nodes
    pub video_url: Option<String>,
}

impl MediaNode {
    /// URL of the file a post bundle should store for this node
    pub fn bundle_url(&self) -> &str {
        match (&self.video_url, self.is_video) {
            (Some(url), true) => url,
            _ => &self.display_url,
        }
    }

    /// File extension matching [`MediaNode::bundle_url`]
    pub fn bundle_extension(&self) -> &'static str {
        if self.is_video && self.video_url.is_some() {
            "mp4"
        } else {
            "jpg"
        }
    }
}

/// Everything the introspection service reports about one post
#[derive(Clone, Debug)]
pub struct MediaPost {
    /// Shortcode the post was looked up by
    pub shortcode: String,
    /// Service type name (`GraphImage`, `GraphVideo`, `GraphSidecar`)
    pub typename: String,
    /// When the post was published
    pub taken_at: DateTime<Utc>,
    /// Caption text, if any
    pub caption: Option<String>,
    /// Primary media of the post
    pub primary: MediaNode,
    /// Sub-items of a sidecar post, in display order
    pub children: Vec<MediaNode>,
    /// Raw metadata document as returned by the service
    pub metadata: serde_json::Value,
}

impl MediaPost {
    /// Whether the post carries multiple sub-images
    pub fn is_sidecar(&self) -> bool {
        self.typename == SIDECAR_TYPENAME && !self.children.is_empty()
    }

    /// Every media node of the post: the sub-items for a sidecar, else the primary
    pub fn nodes(&self) -> Vec<&MediaNode> {
        if self.is_sidecar() {
            self.children.iter().collect()
        } else {
            vec![&self.primary]
        }
    }
}

/// External service that reports a post's media for a shortcode
#[async_trait]
pub trait MediaIntrospector: Send + Sync {
    /// Look up a post. Timeouts and unknown shortcodes are [`Error::ResolutionFailed`].
    async fn lookup(&self, shortcode: &str) -> Result<MediaPost>;
}

/// The node selected for a shortcode/index pair
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocatedMedia {
    /// Image URL to fetch
    pub url: String,
    /// Sub-image index actually applied (`None` when the primary media was chosen)
    pub image_index: Option<u32>,
}

/// Extract the shortcode (second-to-last path segment) and `img_index` of a record
pub fn resolve(record: &Record) -> Result<ShortcodeTarget> {
    let link = record.image_link();
    let failed = |reason: &str| Error::ResolutionFailed {
        shortcode: String::new(),
        reason: format!("{reason}: {link}"),
    };

    let url = classifier::parse_lenient(link).ok_or_else(|| failed("unparseable URL"))?;
    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.collect())
        .unwrap_or_default();

    let shortcode = segments
        .len()
        .checked_sub(2)
        .and_then(|i| segments.get(i))
        .copied()
        .filter(|s| is_valid_shortcode(s))
        .ok_or_else(|| failed("no shortcode in URL path"))?;

    Ok(ShortcodeTarget {
        shortcode: shortcode.to_string(),
        image_index: classifier::image_index(link),
    })
}

/// Choose the media node for `image_index` within `post`.
///
/// For a sidecar with an index, selects node `index - 1` and fails with
/// [`Error::InvalidIndex`] when the index is 0 or beyond the node count.
/// Otherwise the primary media is used and the index is dropped.
pub fn select(post: &MediaPost, image_index: Option<u32>) -> Result<LocatedMedia> {
    match image_index {
        Some(index) if post.is_sidecar() => {
            let node = (index as usize)
                .checked_sub(1)
                .and_then(|i| post.children.get(i))
                .ok_or_else(|| Error::InvalidIndex {
                    shortcode: post.shortcode.clone(),
                    index,
                    available: post.children.len(),
                })?;
            Ok(LocatedMedia {
                url: node.display_url.clone(),
                image_index: Some(index),
            })
        }
        _ => Ok(LocatedMedia {
            url: post.primary.display_url.clone(),
            image_index: None,
        }),
    }
}

fn is_valid_shortcode(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Record id → shortcode target, in order of first appearance.
///
/// Inserting an id that is already present replaces its target but keeps its
/// original position (last write wins).
#[derive(Clone, Debug, Default)]
pub struct ShortcodeMap {
    order: Vec<String>,
    entries: HashMap<String, ShortcodeTarget>,
}

impl ShortcodeMap {
    /// Resolve every record, failing on the first one that cannot be resolved
    pub fn build(records: &[Record]) -> Result<Self> {
        let mut map = Self::default();
        for record in records {
            map.insert(record.id(), resolve(record)?);
        }
        Ok(map)
    }

    /// Resolve every record, collecting the ones that fail instead of stopping
    pub fn build_lenient(records: &[Record]) -> (Self, Vec<(String, Error)>) {
        let mut map = Self::default();
        let mut failures = Vec::new();
        for record in records {
            match resolve(record) {
                Ok(target) => map.insert(record.id(), target),
                Err(e) => failures.push((record.id().to_string(), e)),
            }
        }
        (map, failures)
    }

    /// Insert or replace the target for `id`
    pub fn insert(&mut self, id: &str, target: ShortcodeTarget) {
        if self.entries.insert(id.to_string(), target).is_some() {
            tracing::debug!(id, "record id repeated, replacing its shortcode");
        } else {
            self.order.push(id.to_string());
        }
    }

    /// Number of distinct record ids
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the map is empty
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Entries in order of first appearance
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ShortcodeTarget)> {
        self.order
            .iter()
            .filter_map(|id| self.entries.get(id).map(|t| (id.as_str(), t)))
    }
}
