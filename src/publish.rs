//! Publish client
//!
//! POSTs each [`AssetDescriptor`] as JSON to the downstream platform. One
//! failed item never stops the rest of the batch.

use tokio::sync::broadcast;

use crate::config::PublishConfig;
use crate::error::{Error, Result};
use crate::types::{AssetDescriptor, Event, PublishReport, PushResult, Stage};

/// Client for the downstream asset endpoint
#[derive(Clone, Debug)]
pub struct PublishClient {
    client: reqwest::Client,
    endpoint: String,
    auth_header: Option<String>,
    event_tx: Option<broadcast::Sender<Event>>,
}

impl PublishClient {
    /// Build a client; `endpoint` must be configured
    pub fn new(config: &PublishConfig) -> Result<Self> {
        let endpoint = config.endpoint.clone().ok_or_else(|| Error::Config {
            message: "PUBLISH_ENDPOINT is not set".to_string(),
            key: Some("PUBLISH_ENDPOINT".to_string()),
        })?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(Error::Network)?;

        Ok(Self {
            client,
            endpoint,
            auth_header: config
                .auth_token
                .as_ref()
                .map(|token| format!("{} {}", config.auth_scheme, token)),
            event_tx: None,
        })
    }

    /// Broadcast an [`Event::ItemPushed`] per descriptor on `event_tx`
    pub fn with_events(mut self, event_tx: broadcast::Sender<Event>) -> Self {
        self.event_tx = Some(event_tx);
        self
    }

    /// Push one descriptor. Any 2xx response counts as accepted.
    pub async fn publish(&self, descriptor: &AssetDescriptor) -> PushResult {
        let mut request = self.client.post(&self.endpoint).json(descriptor);
        if let Some(auth) = &self.auth_header {
            request = request.header(reqwest::header::AUTHORIZATION, auth);
        }

        match request.send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    tracing::debug!(external_id = %descriptor.external_id, status = %status, "asset published");
                    return PushResult {
                        external_id: descriptor.external_id.clone(),
                        success: true,
                        status_code: Some(status.as_u16()),
                        body: None,
                    };
                }

                let body = response.text().await.unwrap_or_default();
                tracing::warn!(
                    external_id = %descriptor.external_id,
                    status = %status,
                    body = %body,
                    "publish rejected"
                );
                PushResult {
                    external_id: descriptor.external_id.clone(),
                    success: false,
                    status_code: Some(status.as_u16()),
                    body: Some(body),
                }
            }
            Err(e) => {
                tracing::warn!(external_id = %descriptor.external_id, error = %e, "publish request failed");
                PushResult {
                    external_id: descriptor.external_id.clone(),
                    success: false,
                    status_code: None,
                    body: Some(e.to_string()),
                }
            }
        }
    }

    /// Push every descriptor in order and aggregate the results
    pub async fn publish_all(&self, descriptors: &[AssetDescriptor]) -> PublishReport {
        self.emit(Event::StageStarted {
            stage: Stage::PushingImages,
            total: Some(descriptors.len() as u64),
        });

        let mut results = Vec::with_capacity(descriptors.len());
        for (completed, descriptor) in descriptors.iter().enumerate() {
            let result = self.publish(descriptor).await;
            self.emit(Event::ItemPushed {
                external_id: result.external_id.clone(),
                success: result.success,
            });
            self.emit(Event::Progress {
                stage: Stage::PushingImages,
                completed: completed as u64 + 1,
            });
            results.push(result);
        }

        let report = PublishReport { results };
        self.emit(Event::StageCompleted {
            stage: Stage::PushingImages,
        });
        tracing::info!(
            total = report.results.len(),
            failed = report.failures().count(),
            success = report.success(),
            "publish batch finished"
        );
        report
    }

    fn emit(&self, event: Event) {
        if let Some(tx) = &self.event_tx {
            tx.send(event).ok();
        }
    }
}

impl PushResult {
    /// The failure as an [`Error::PublishFailure`], or `None` if the push succeeded
    pub fn failure(&self) -> Option<Error> {
        (!self.success).then(|| Error::PublishFailure {
            external_id: self.external_id.clone(),
            status: self.status_code.unwrap_or_default(),
            body: self.body.clone().unwrap_or_default(),
        })
    }
}
