use std::sync::Mutex;

use indicatif::{ProgressBar, ProgressStyle};
use once_cell::sync::Lazy;
use pkgfetch::{EventSink, FetchStatus};

const PB_STYLE: &str =
    "{spinner:.blue} [{elapsed_precise}] {wide_bar:.cyan/blue} {bytes}/{total_bytes} ({bytes_per_sec}, {eta}) {msg}";

const TICK: &str = "⠁⠂⠄⡀⢀⠠⠐⠈ ";

const PB_CHARS: &str = "█▓▒░  ";

static PB_TEMPLATE: Lazy<Option<ProgressStyle>> = Lazy::new(|| {
    let pb_style = match ProgressStyle::with_template(PB_STYLE) {
        Ok(pb_style) => pb_style.tick_chars(TICK).progress_chars(PB_CHARS),
        Err(_) => return None,
    };

    Some(pb_style)
});

/// Draws one progress bar per fetch call on stderr.
pub struct IndicatifSink {
    enabled: bool,
    pb:      Mutex<Option<ProgressBar>>,
}

impl IndicatifSink {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            pb: Mutex::new(None),
        }
    }

    pub fn finish(&self, status: &FetchStatus) {
        if let Some(pb) = self.bar().take() {
            match status {
                FetchStatus::Ok => pb.finish_with_message("done"),
                _ => pb.abandon_with_message(status.to_string()),
            }
        }
    }

    fn bar(&self) -> std::sync::MutexGuard<'_, Option<ProgressBar>> {
        self.pb.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl EventSink for IndicatifSink {
    fn fetch_begin(&self, url: &str) {
        if !self.enabled {
            return;
        }
        let pb = ProgressBar::no_length();
        if let Some(style) = PB_TEMPLATE.as_ref() {
            pb.set_style(style.clone());
        }
        pb.set_message(url.to_string());
        *self.bar() = Some(pb);
    }

    fn progress_start(&self) {
        if let Some(pb) = self.bar().as_ref() {
            pb.reset();
        }
    }

    fn progress_tick(&self, current: u64, total: u64) {
        if let Some(pb) = self.bar().as_ref() {
            if total > 0 {
                pb.set_length(total);
            }
            pb.set_position(current);
        }
    }

    fn error(&self, message: &str) {
        match self.bar().as_ref() {
            Some(pb) => pb.println(message),
            None => eprintln!("{message}"),
        }
    }
}
