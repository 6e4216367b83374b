use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use libpscraper::{Message, Progress, Update};
use owo_colors::OwoColorize;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc::Receiver;
use url::Url;

const KNOWN_SIZE_TEMPLATE: &str =
    "{msg:30!} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({percent}%) {bytes_per_sec}";
const UNKNOWN_SIZE_TEMPLATE: &str = "{spinner} {msg:30!} {bytes} {bytes_per_sec}";

/// Draws one bar per file until every sender is gone.
pub(crate) async fn render(mut rx: Receiver<Update>) {
    let mut bars = Bars::new(MultiProgress::new());
    while let Some(update) = rx.recv().await {
        bars.apply(update);
    }
    bars.abandon_unfinished();
}

/// One bar per link. Two links can save under the same file name, so the
/// name only labels the bar.
struct Bars {
    multi: MultiProgress,
    bars: HashMap<Url, ProgressBar>,
}

impl Bars {
    fn new(multi: MultiProgress) -> Self {
        Self {
            multi,
            bars: HashMap::new(),
        }
    }

    fn apply(&mut self, update: Update) {
        match update {
            Update::MessageUpdate(msg) => self.print(msg),
            Update::ProgressUpdate(progress) => {
                let multi = &self.multi;
                let bar = self
                    .bars
                    .entry(progress.link.clone())
                    .or_insert_with(|| multi.add(new_bar(&progress)));
                bar.set_position(progress.bytes_written);
                if progress.finished {
                    bar.finish();
                }
            }
        }
    }

    fn print(&self, msg: Message) {
        let line = format!("{} | {}", msg.content, msg.resource_name);
        let line = if msg.is_error {
            line.red().to_string()
        } else {
            line
        };
        if self.multi.println(line).is_err() {
            tracing::debug!("Progress output unavailable");
        }
    }

    fn abandon_unfinished(&self) {
        for bar in self.bars.values().filter(|bar| !bar.is_finished()) {
            bar.abandon();
        }
    }
}

fn new_bar(progress: &Progress) -> ProgressBar {
    let bar = match progress.file_size {
        Some(size) => ProgressBar::new(size).with_style(
            ProgressStyle::with_template(KNOWN_SIZE_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        ),
        None => {
            let bar = ProgressBar::new_spinner().with_style(
                ProgressStyle::with_template(UNKNOWN_SIZE_TEMPLATE)
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            bar.enable_steady_tick(Duration::from_millis(120));
            bar
        }
    };
    bar.with_message(progress.resource_name.clone())
}
