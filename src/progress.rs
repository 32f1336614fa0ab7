//! Terminal progress bars driven by run events.

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use media_syncer::{Event, Stage};
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

/// Render events until every sender is gone
pub fn spawn(mut events: broadcast::Receiver<Event>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut bars = StageBars::new(MultiProgress::with_draw_target(
            ProgressDrawTarget::stderr_with_hz(10),
        ));
        loop {
            match events.recv().await {
                Ok(event) => bars.handle(event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "progress renderer fell behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
        bars.abandon();
    })
}

/// One bar per stage; stages run one after another
struct StageBars {
    multi: MultiProgress,
    current: Option<(Stage, ProgressBar)>,
    push_failures: u64,
}

impl StageBars {
    fn new(multi: MultiProgress) -> Self {
        Self {
            multi,
            current: None,
            push_failures: 0,
        }
    }

    fn handle(&mut self, event: Event) {
        match event {
            Event::StageStarted { stage, total } => {
                self.abandon();
                let bar = match total {
                    Some(total) => self.multi.add(ProgressBar::new(total)),
                    None => {
                        let bar = self.multi.add(ProgressBar::new_spinner());
                        bar.enable_steady_tick(Duration::from_millis(100));
                        bar
                    }
                };
                bar.set_style(style_for(total.is_some()));
                bar.set_prefix(stage.label());
                self.current = Some((stage, bar));
            }
            Event::Progress { stage, completed } => {
                if let Some(bar) = self.bar_for(stage) {
                    bar.set_position(completed);
                }
            }
            Event::ItemSkipped {
                stage, external_id, ..
            } => {
                if let Some(bar) = self.bar_for(stage) {
                    bar.set_message(format!("skipped {external_id}"));
                }
            }
            Event::ItemPushed {
                external_id,
                success,
            } => {
                if !success {
                    self.push_failures += 1;
                }
                let failures = self.push_failures;
                if let Some(bar) = self.bar_for(Stage::PushingImages) {
                    let marker = if success { "✓" } else { "✗" };
                    bar.set_message(format!("{marker} {external_id} ({failures} failed)"));
                }
            }
            Event::StageCompleted { stage } => {
                if let Some(bar) = self.bar_for(stage) {
                    bar.finish_with_message("done");
                }
                self.current = None;
            }
            Event::RunFinished { success } => {
                let line = if success {
                    "Sync finished: every asset published".to_string()
                } else {
                    format!("Sync finished: {} asset(s) rejected", self.push_failures)
                };
                self.multi.println(line).ok();
            }
        }
    }

    fn bar_for(&self, stage: Stage) -> Option<&ProgressBar> {
        self.current
            .as_ref()
            .filter(|(current, _)| *current == stage)
            .map(|(_, bar)| bar)
    }

    fn abandon(&mut self) {
        if let Some((_, bar)) = self.current.take() {
            bar.abandon();
        }
    }
}

fn style_for(bounded: bool) -> ProgressStyle {
    let template = if bounded {
        "{prefix:>26} {bar:40.cyan/blue} {pos}/{len} | {elapsed_precise} | {msg}"
    } else {
        "{prefix:>26} {spinner:.yellow} {pos} | {elapsed_precise} | {msg}"
    };
    ProgressStyle::with_template(template)
        .map(|style| style.progress_chars("█▉░"))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
}
