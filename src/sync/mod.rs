//! Automated run: fetch, filter, download, publish.
//!
//! [`state`] holds the forward-only state machine and [`orchestrator`] the
//! driver loop that performs each stage's work before firing the next
//! transition.

pub mod orchestrator;
pub mod state;

pub use orchestrator::{SyncOptions, SyncOrchestrator, SyncReport};
pub use state::{StateMachine, SyncState, Trigger};
