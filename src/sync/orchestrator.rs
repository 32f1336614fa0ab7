//! Automated run driver.

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::config::Config;
use crate::downloader::{FailurePolicy, MediaDownloader};
use crate::error::{Error, Result};
use crate::publish::PublishClient;
use crate::source::{self, PersistMode, RecordSource};
use crate::types::{AssetDescriptor, Event, PublishReport, Record, Stage};

use super::state::{StateMachine, SyncState, Trigger};

/// Knobs for one automated run
#[derive(Clone, Copy, Debug, Default)]
pub struct SyncOptions {
    /// What to do when the raw record file already exists
    pub persist_mode: PersistMode,
}

/// What a completed run did
#[derive(Clone, Debug, Default, Serialize)]
pub struct SyncReport {
    /// Records accepted from the source
    pub fetched: usize,
    /// Source rows dropped as malformed or duplicate
    pub skipped: usize,
    /// Records that passed the eligibility filter
    pub eligible: usize,
    /// Descriptors produced by the image stage
    pub descriptors: Vec<AssetDescriptor>,
    /// Per-item publish results
    pub publish: PublishReport,
}

impl SyncReport {
    /// True iff every descriptor was accepted downstream
    pub fn success(&self) -> bool {
        self.publish.success()
    }
}

/// Drives one pass through the run states.
///
/// Single-use: once a run has started, every later call to [`run`](Self::run)
/// fails with [`Error::InvalidTransition`].
/// A stage failure leaves the machine in that stage.
pub struct SyncOrchestrator {
    config: Arc<Config>,
    source: Arc<dyn RecordSource>,
    downloader: MediaDownloader,
    publisher: PublishClient,
    options: SyncOptions,
    machine: StateMachine,
    event_tx: broadcast::Sender<Event>,
}

impl SyncOrchestrator {
    /// Wire the stages together; the downloader and publisher report on this orchestrator's channel
    pub fn new(
        source: Arc<dyn RecordSource>,
        downloader: MediaDownloader,
        publisher: PublishClient,
        options: SyncOptions,
    ) -> Self {
        let (event_tx, _rx) = broadcast::channel(1024);
        let config = Arc::clone(&downloader.config);

        Self {
            config,
            source,
            downloader: downloader.with_events(event_tx.clone()),
            publisher: publisher.with_events(event_tx.clone()),
            options,
            machine: StateMachine::new(),
            event_tx,
        }
    }

    /// Receive progress events for this run
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Current state
    pub fn state(&self) -> SyncState {
        self.machine.state()
    }

    /// States entered so far
    pub fn history(&self) -> &[SyncState] {
        self.machine.history()
    }

    /// Run every stage in order and end in [`SyncState::End`]
    pub async fn run(&mut self) -> Result<SyncReport> {
        self.machine.fire(Trigger::StartSync)?;
        tracing::info!("sync run started");

        let mut report = SyncReport::default();
        let mut eligible: Vec<Record> = Vec::new();

        while self.machine.state() != SyncState::End {
            let state = self.machine.state();
            let next = match self.run_stage(state, &mut report, &mut eligible).await {
                Ok(trigger) => trigger,
                Err(e) => {
                    tracing::error!(state = %state, error = %e, "sync run halted");
                    return Err(e);
                }
            };
            self.machine.fire(next)?;
        }

        let success = report.success();
        self.event_tx.send(Event::RunFinished { success }).ok();
        tracing::info!(
            fetched = report.fetched,
            eligible = report.eligible,
            downloaded = report.descriptors.len(),
            success,
            "sync run finished"
        );
        Ok(report)
    }

    /// Do the work of `state` and name the transition that leaves it
    async fn run_stage(
        &self,
        state: SyncState,
        report: &mut SyncReport,
        eligible: &mut Vec<Record>,
    ) -> Result<Trigger> {
        match state {
            SyncState::Start => Ok(Trigger::StartSync),
            SyncState::DownloadingData => {
                self.fetch_stage(report).await?;
                Ok(Trigger::ParseData)
            }
            SyncState::ParsingData => {
                *eligible = self.parse_stage().await?;
                report.eligible = eligible.len();
                Ok(Trigger::DownloadImages)
            }
            SyncState::DownloadingImages => {
                report.descriptors = self
                    .downloader
                    .download_images(eligible, FailurePolicy::SkipItem)
                    .await?;
                Ok(Trigger::PushImages)
            }
            SyncState::PushingImages => {
                report.publish = self.publisher.publish_all(&report.descriptors).await;
                Ok(Trigger::Finish)
            }
            SyncState::End => Err(Error::InvalidTransition {
                from: state.to_string(),
                trigger: "run".to_string(),
            }),
        }
    }

    async fn fetch_stage(&self, report: &mut SyncReport) -> Result<()> {
        let source_config = &self.config.source;
        self.event_tx
            .send(Event::StageStarted {
                stage: Stage::FetchingData,
                total: None,
            })
            .ok();

        let tx = self.event_tx.clone();
        let on_progress = move |completed: usize| {
            tx.send(Event::Progress {
                stage: Stage::FetchingData,
                completed: completed as u64,
            })
            .ok();
        };

        let outcome = self
            .source
            .fetch(
                source_config.page_size,
                source_config.max_items,
                &source_config.filter_column,
                &on_progress,
            )
            .await?;

        for row in &outcome.skipped {
            self.event_tx
                .send(Event::ItemSkipped {
                    stage: Stage::FetchingData,
                    external_id: row.id.clone().unwrap_or_default(),
                    reason: row.reason.clone(),
                })
                .ok();
        }

        source::persist_records(
            &outcome.records,
            &self.config.storage.raw_records_path(),
            self.options.persist_mode,
        )
        .await?;

        report.fetched = outcome.records.len();
        report.skipped = outcome.skipped.len();
        self.event_tx
            .send(Event::StageCompleted {
                stage: Stage::FetchingData,
            })
            .ok();
        tracing::info!(
            fetched = report.fetched,
            skipped = report.skipped,
            "fetched records"
        );
        Ok(())
    }

    async fn parse_stage(&self) -> Result<Vec<Record>> {
        let records = source::load_records(&self.config.storage.raw_records_path()).await?;
        self.event_tx
            .send(Event::StageStarted {
                stage: Stage::ParsingData,
                total: Some(records.len() as u64),
            })
            .ok();

        let eligible = source::filter_eligible(&records, self.config.download.eligibility);
        source::persist_records(
            &eligible,
            &self.config.storage.filtered_records_path(),
            PersistMode::Overwrite,
        )
        .await?;

        self.event_tx
            .send(Event::Progress {
                stage: Stage::ParsingData,
                completed: records.len() as u64,
            })
            .ok();
        self.event_tx
            .send(Event::StageCompleted {
                stage: Stage::ParsingData,
            })
            .ok();
        tracing::info!(
            loaded = records.len(),
            eligible = eligible.len(),
            policy = ?self.config.download.eligibility,
            "filtered records"
        );
        Ok(eligible)
    }
}
