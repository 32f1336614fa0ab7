//! Command line parsing.

use clap::{Args, Parser, Subcommand};
use media_syncer::PersistMode;
use std::io::{BufRead, IsTerminal, Write};
use std::path::Path;

/// media-syncer command line
#[derive(Parser, Debug)]
#[command(
    name = "media-syncer",
    version,
    about = "Sync post images from a tabular source to a local store and a downstream platform"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the bulk download API and the downloads directory
    Serve,
    /// Run one automated sync pass and exit
    Sync(SyncArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct SyncArgs {
    /// Replace an existing raw record file
    #[arg(long, conflicts_with = "keep_existing")]
    pub overwrite: bool,
    /// Keep an existing raw record file and continue with its contents
    #[arg(long)]
    pub keep_existing: bool,
    /// Exit 0 even when some descriptors were rejected downstream
    #[arg(long)]
    pub allow_partial: bool,
    /// Do not draw progress bars
    #[arg(long)]
    pub no_progress: bool,
}

impl SyncArgs {
    /// Persist mode for the raw record file at `raw_path`.
    ///
    /// Without a flag, an interactive terminal is asked before overwriting;
    /// anything else refuses to touch an existing file.
    pub fn persist_mode(&self, raw_path: &Path) -> std::io::Result<PersistMode> {
        if self.overwrite {
            return Ok(PersistMode::Overwrite);
        }
        if self.keep_existing {
            return Ok(PersistMode::KeepExisting);
        }
        if !raw_path.exists() || !std::io::stdin().is_terminal() {
            return Ok(PersistMode::FailIfExists);
        }

        let stdin = std::io::stdin();
        let mut stderr = std::io::stderr();
        loop {
            write!(
                stderr,
                "{} already exists, overwrite? (y/n) ",
                raw_path.display()
            )?;
            stderr.flush()?;

            let mut answer = String::new();
            if stdin.lock().read_line(&mut answer)? == 0 {
                return Ok(PersistMode::FailIfExists);
            }
            if let Some(mode) = parse_answer(&answer) {
                return Ok(mode);
            }
        }
    }
}

fn parse_answer(answer: &str) -> Option<PersistMode> {
    match answer.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => Some(PersistMode::Overwrite),
        "n" | "no" => Some(PersistMode::KeepExisting),
        _ => None,
    }
}
