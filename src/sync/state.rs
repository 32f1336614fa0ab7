//! Run states and the forward-only transition table.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// State of an automated run
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    /// Constructed, nothing done yet
    Start,
    /// Paging records out of the source
    DownloadingData,
    /// Filtering the raw record set
    ParsingData,
    /// Downloading images for the filtered set
    DownloadingImages,
    /// Publishing descriptors downstream
    PushingImages,
    /// Terminal
    End,
}

impl SyncState {
    /// snake_case name used in logs and errors
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncState::Start => "start",
            SyncState::DownloadingData => "downloading_data",
            SyncState::ParsingData => "parsing_data",
            SyncState::DownloadingImages => "downloading_images",
            SyncState::PushingImages => "pushing_images",
            SyncState::End => "end",
        }
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named transition between two states
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    /// start → downloading_data
    StartSync,
    /// downloading_data → parsing_data
    ParseData,
    /// parsing_data → downloading_images
    DownloadImages,
    /// downloading_images → pushing_images
    PushImages,
    /// pushing_images → end
    Finish,
}

impl Trigger {
    /// snake_case name used in logs and errors
    pub fn as_str(&self) -> &'static str {
        match self {
            Trigger::StartSync => "start_sync",
            Trigger::ParseData => "parse_data",
            Trigger::DownloadImages => "download_images",
            Trigger::PushImages => "push_images",
            Trigger::Finish => "finish",
        }
    }

    /// The only state this trigger fires from, and where it leads
    fn edge(&self) -> (SyncState, SyncState) {
        match self {
            Trigger::StartSync => (SyncState::Start, SyncState::DownloadingData),
            Trigger::ParseData => (SyncState::DownloadingData, SyncState::ParsingData),
            Trigger::DownloadImages => (SyncState::ParsingData, SyncState::DownloadingImages),
            Trigger::PushImages => (SyncState::DownloadingImages, SyncState::PushingImages),
            Trigger::Finish => (SyncState::PushingImages, SyncState::End),
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracks the current state and every state entered so far
#[derive(Clone, Debug)]
pub struct StateMachine {
    current: SyncState,
    history: Vec<SyncState>,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StateMachine {
    /// A machine sitting in [`SyncState::Start`]
    pub fn new() -> Self {
        Self {
            current: SyncState::Start,
            history: vec![SyncState::Start],
        }
    }

    /// Current state
    pub fn state(&self) -> SyncState {
        self.current
    }

    /// States entered so far, starting with `Start`
    pub fn history(&self) -> &[SyncState] {
        &self.history
    }

    /// Apply `trigger`; fails with [`Error::InvalidTransition`] unless it fires from the current state
    pub fn fire(&mut self, trigger: Trigger) -> Result<SyncState> {
        let (from, to) = trigger.edge();
        if from != self.current {
            return Err(Error::InvalidTransition {
                from: self.current.to_string(),
                trigger: trigger.to_string(),
            });
        }

        tracing::debug!(from = %from, to = %to, trigger = %trigger, "state transition");
        self.current = to;
        self.history.push(to);
        Ok(to)
    }
}
