//! Airtable-style REST client for [`RecordSource`]
//!
//! `GET {api_url}/{base}/{table}?pageSize=..&filterByFormula=..&fields[]=..&offset=..`
//! with a bearer key; pages are followed through the `offset` cursor.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashSet;
use url::Url;

use super::{FetchOutcome, RecordSource, SkippedRow};
use crate::config::SourceConfig;
use crate::error::{Error, Result};
use crate::types::Record;

/// Column always requested alongside the filter column
const ID_FIELD: &str = "Id";

#[derive(Debug, Deserialize)]
struct Page {
    #[serde(default)]
    records: Vec<Row>,
    #[serde(default)]
    offset: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Row {
    id: String,
    #[serde(default)]
    fields: serde_json::Map<String, serde_json::Value>,
}

/// Tabular source backed by the Airtable REST API
#[derive(Clone, Debug)]
pub struct AirtableSource {
    client: reqwest::Client,
    table_url: Url,
    api_key: String,
}

impl AirtableSource {
    /// Build a client from configuration; key, base and table must be set
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let api_key = required(config.api_key.as_deref(), "AIRTABLE_API_KEY")?;
        let base_id = required(config.base_id.as_deref(), "AIRTABLE_BASE_ID")?;
        let table_name = required(config.table_name.as_deref(), "AIRTABLE_TABLE_NAME")?;

        let invalid_url = |reason: String| Error::Config {
            message: format!("invalid source API URL '{}': {reason}", config.api_url),
            key: Some("AIRTABLE_API_URL".to_string()),
        };

        let mut table_url = Url::parse(&config.api_url).map_err(|e| invalid_url(e.to_string()))?;
        table_url
            .path_segments_mut()
            .map_err(|_| invalid_url("URL cannot be a base".to_string()))?
            .pop_if_empty()
            .push(base_id)
            .push(table_name);

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(Error::Network)?;

        Ok(Self {
            client,
            table_url,
            api_key: api_key.to_string(),
        })
    }

    async fn fetch_page(
        &self,
        page_size: usize,
        filter_column: &str,
        offset: Option<&str>,
    ) -> Result<Page> {
        let mut query: Vec<(&str, String)> = vec![
            ("pageSize", page_size.to_string()),
            ("filterByFormula", format!("NOT({{{filter_column}}} = '')")),
            ("fields[]", ID_FIELD.to_string()),
        ];
        if filter_column != ID_FIELD {
            query.push(("fields[]", filter_column.to_string()));
        }
        if let Some(offset) = offset {
            query.push(("offset", offset.to_string()));
        }

        let response = self
            .client
            .get(self.table_url.clone())
            .bearer_auth(&self.api_key)
            .query(&query)
            .send()
            .await
            .map_err(|e| Error::SourceUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::SourceUnavailable(format!(
                "source returned status {status}: {body}"
            )));
        }

        response
            .json::<Page>()
            .await
            .map_err(|e| Error::SourceUnavailable(format!("malformed page: {e}")))
    }
}

#[async_trait]
impl RecordSource for AirtableSource {
    async fn fetch(
        &self,
        page_size: usize,
        max_items: Option<usize>,
        filter_column: &str,
        on_progress: &(dyn Fn(usize) + Send + Sync),
    ) -> Result<FetchOutcome> {
        if max_items == Some(0) {
            tracing::info!("Record cap is zero, skipping source fetch");
            return Ok(FetchOutcome::default());
        }

        let mut outcome = FetchOutcome::default();
        let mut seen = HashSet::new();
        let mut offset: Option<String> = None;

        'pages: loop {
            let page = self
                .fetch_page(page_size, filter_column, offset.as_deref())
                .await?;

            for row in page.records {
                if max_items.is_some_and(|max| outcome.records.len() >= max) {
                    break 'pages;
                }

                if !seen.insert(row.id.clone()) {
                    tracing::warn!(id = %row.id, "skipping duplicate row");
                    outcome.skipped.push(SkippedRow {
                        id: Some(row.id),
                        reason: "duplicate id".to_string(),
                    });
                    continue;
                }

                let link = match row.fields.get(filter_column) {
                    Some(serde_json::Value::String(link)) => link.clone(),
                    Some(_) => {
                        skip(&mut outcome, row.id, format!("{filter_column} is not text"));
                        continue;
                    }
                    None => {
                        skip(&mut outcome, row.id, format!("{filter_column} is missing"));
                        continue;
                    }
                };

                match Record::new(row.id.clone(), link) {
                    Ok(record) => outcome.records.push(record),
                    Err(e) => skip(&mut outcome, row.id, e.to_string()),
                }
            }

            on_progress(outcome.records.len());

            if max_items.is_some_and(|max| outcome.records.len() >= max) {
                break;
            }
            match page.offset {
                Some(next) => offset = Some(next),
                None => break,
            }
        }

        tracing::info!(
            fetched = outcome.records.len(),
            skipped = outcome.skipped.len(),
            "fetched records from source"
        );
        Ok(outcome)
    }
}

fn skip(outcome: &mut FetchOutcome, id: String, reason: String) {
    tracing::warn!(id = %id, reason = %reason, "skipping malformed row");
    outcome.skipped.push(SkippedRow {
        id: Some(id),
        reason,
    });
}

fn required<'a>(value: Option<&'a str>, key: &str) -> Result<&'a str> {
    value.ok_or_else(|| Error::Config {
        message: format!("{key} is not set"),
        key: Some(key.to_string()),
    })
}
