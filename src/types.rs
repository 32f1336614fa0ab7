//! Core types for media-syncer

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{Error, Result};

/// A source row: opaque identifier plus the image link it points at.
///
/// Records are validated on construction (both fields non-empty) and
/// immutable afterwards. Deserialization goes through the same validation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RecordInput")]
pub struct Record {
    id: String,
    image_link: String,
}

impl Record {
    /// Create a record, rejecting blank fields
    pub fn new(id: impl Into<String>, image_link: impl Into<String>) -> Result<Self> {
        let id = id.into();
        let image_link = image_link.into();

        if id.trim().is_empty() {
            return Err(Error::Validation("record id must not be empty".to_string()));
        }
        if image_link.trim().is_empty() {
            return Err(Error::Validation(format!(
                "record {id} has an empty image_link"
            )));
        }

        Ok(Self { id, image_link })
    }

    /// Record identifier, unique within a run
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Image link as supplied by the source
    pub fn image_link(&self) -> &str {
        &self.image_link
    }
}

/// Wire shape of a [`Record`] before validation
#[derive(Clone, Debug, Deserialize, ToSchema)]
pub struct RecordInput {
    /// Record identifier
    #[schema(example = "recA1b2C3")]
    pub id: String,
    /// Post URL, optionally with an `img_index` query parameter
    #[schema(example = "https://instagram.com/p/ABC/?img_index=2")]
    pub image_link: String,
}

impl TryFrom<RecordInput> for Record {
    type Error = Error;

    fn try_from(input: RecordInput) -> Result<Self> {
        Record::new(input.id, input.image_link)
    }
}

/// Shortcode and optional sub-image index resolved from a record
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShortcodeTarget {
    /// Post shortcode
    pub shortcode: String,
    /// 1-based position within a multi-image post
    pub image_index: Option<u32>,
}

/// Fully-qualified URL of a downloaded asset and the record it belongs to
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AssetDescriptor {
    /// Public URL under the static downloads mount
    pub asset_file_url: String,
    /// Record identifier from the source
    pub external_id: String,
}

/// Outcome of publishing one descriptor
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushResult {
    /// Record identifier of the descriptor
    pub external_id: String,
    /// Whether the platform accepted the descriptor
    pub success: bool,
    /// HTTP status, if a response was received
    pub status_code: Option<u16>,
    /// Response body or transport error, only on failure
    pub body: Option<String>,
}

/// Aggregate outcome of a publish batch
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PublishReport {
    /// Per-item results in submission order
    pub results: Vec<PushResult>,
}

impl PublishReport {
    /// True iff every item was accepted (vacuously true for an empty batch)
    pub fn success(&self) -> bool {
        self.results.iter().all(|r| r.success)
    }

    /// Items the platform rejected
    pub fn failures(&self) -> impl Iterator<Item = &PushResult> {
        self.results.iter().filter(|r| !r.success)
    }
}

/// Pipeline stage reported in progress events
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Paging rows out of the tabular source
    FetchingData,
    /// Running the eligibility filter
    ParsingData,
    /// Downloading single images
    DownloadingImages,
    /// Downloading post bundles
    DownloadingPosts,
    /// Publishing descriptors downstream
    PushingImages,
}

impl Stage {
    /// Label used by progress bars
    pub fn label(&self) -> &'static str {
        match self {
            Stage::FetchingData => "Fetching Data",
            Stage::ParsingData => "Filtering Instagram URLs",
            Stage::DownloadingImages => "Downloading Images",
            Stage::DownloadingPosts => "Downloading Posts",
            Stage::PushingImages => "Pushing Images",
        }
    }
}

/// Progress event broadcast while a run or batch is executing
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A stage started; `total` is known up front for every stage except fetching
    StageStarted {
        /// Stage that started
        stage: Stage,
        /// Expected number of items
        total: Option<u64>,
    },
    /// Items completed so far within a stage
    Progress {
        /// Stage reporting progress
        stage: Stage,
        /// Items completed
        completed: u64,
    },
    /// An item was skipped without aborting the stage
    ItemSkipped {
        /// Stage that skipped the item
        stage: Stage,
        /// Record identifier
        external_id: String,
        /// Why it was skipped
        reason: String,
    },
    /// One descriptor was pushed downstream
    ItemPushed {
        /// Record identifier
        external_id: String,
        /// Whether the platform accepted it
        success: bool,
    },
    /// A stage finished
    StageCompleted {
        /// Stage that finished
        stage: Stage,
    },
    /// The orchestrator reached its terminal state
    RunFinished {
        /// Whether every publish succeeded
        success: bool,
    },
}
