//! Record repository gateway
//!
//! Pulls rows out of the tabular source into validated [`Record`]s, persists
//! the raw and filtered sets as JSON, and loads them back for the next stage.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;

use crate::classifier;
use crate::config::EligibilityPolicy;
use crate::error::{Error, Result};
use crate::types::Record;
use crate::utils::write_json_pretty;

pub mod airtable;

pub use airtable::AirtableSource;

/// A source row that could not be turned into a [`Record`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SkippedRow {
    /// Row identifier, if the row had one
    pub id: Option<String>,
    /// Why the row was skipped
    pub reason: String,
}

/// Result of one fetch: the accepted records plus the rows that were dropped
#[derive(Clone, Debug, Default)]
pub struct FetchOutcome {
    /// Validated, de-duplicated records in source order
    pub records: Vec<Record>,
    /// Malformed or duplicate rows, in the order they were seen
    pub skipped: Vec<SkippedRow>,
}

/// A paginated tabular store that can be read as [`Record`]s
///
/// Implementations must not mutate the source, so a fetch can always be repeated.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Page through the source, keeping only rows with a non-empty `filter_column`.
    ///
    /// Stops after `max_items` records (`None` = until exhausted). `on_progress`
    /// is called with the running record count after every page.
    async fn fetch(
        &self,
        page_size: usize,
        max_items: Option<usize>,
        filter_column: &str,
        on_progress: &(dyn Fn(usize) + Send + Sync),
    ) -> Result<FetchOutcome>;
}

/// What to do when a persist target already exists
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PersistMode {
    /// Refuse with [`Error::DestinationExists`]
    #[default]
    FailIfExists,
    /// Replace the existing file
    Overwrite,
    /// Leave the existing file untouched and use its contents
    KeepExisting,
}

/// What [`persist_records`] actually did
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PersistOutcome {
    /// The records were written
    Written,
    /// The destination existed and was kept
    KeptExisting,
}

/// Serialize `records` to `destination` as a JSON array
pub async fn persist_records(
    records: &[Record],
    destination: &Path,
    mode: PersistMode,
) -> Result<PersistOutcome> {
    if tokio::fs::try_exists(destination).await? {
        match mode {
            PersistMode::FailIfExists => {
                return Err(Error::DestinationExists(destination.to_path_buf()));
            }
            PersistMode::KeepExisting => {
                tracing::info!(path = %destination.display(), "keeping existing record set");
                return Ok(PersistOutcome::KeptExisting);
            }
            PersistMode::Overwrite => {
                tracing::debug!(path = %destination.display(), "overwriting record set");
            }
        }
    }

    write_json_pretty(destination, records).await?;
    tracing::info!(
        path = %destination.display(),
        count = records.len(),
        "persisted records"
    );
    Ok(PersistOutcome::Written)
}

/// Loose row shape used when reading a persisted record set back
#[derive(Deserialize)]
struct StoredRow {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    image_link: Option<String>,
}

/// Load a persisted record set, skipping rows without an id or image link.
///
/// A missing or unparseable file is an error; individual bad rows are not.
pub async fn load_records(path: &Path) -> Result<Vec<Record>> {
    let bytes = tokio::fs::read(path).await?;
    let rows: Vec<StoredRow> = serde_json::from_slice(&bytes)?;

    let mut records = Vec::with_capacity(rows.len());
    for (position, row) in rows.into_iter().enumerate() {
        match Record::new(
            row.id.unwrap_or_default(),
            row.image_link.unwrap_or_default(),
        ) {
            Ok(record) => records.push(record),
            Err(e) => {
                tracing::warn!(position, error = %e, "skipping stored row");
            }
        }
    }
    Ok(records)
}

/// Records whose image link is an eligible post URL under `policy`, in input order
pub fn filter_eligible(records: &[Record], policy: EligibilityPolicy) -> Vec<Record> {
    records
        .iter()
        .filter(|r| classifier::is_eligible_post_url(r.image_link(), policy))
        .cloned()
        .collect()
}
