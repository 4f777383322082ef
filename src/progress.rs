//! Progress display for import resolution.
//!
//! Draws an indicatif bar fed by [`ResolveEvent`]s, or in log-only mode
//! emits periodic `log` lines for tail-friendly output.

use crossbeam_channel::Receiver;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::matcher::ResolveEvent;
use crate::models::EntryStatus;

/// Global flag for log-only mode (set from args in main)
pub static LOG_ONLY: AtomicBool = AtomicBool::new(false);

const BAR_TEMPLATE: &str =
    "{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec}, ETA: {eta})";

pub fn set_log_only(value: bool) {
    LOG_ONLY.store(value, Ordering::Relaxed);
}

pub fn is_log_only() -> bool {
    LOG_ONLY.load(Ordering::Relaxed)
}

/// Format duration in human-readable format
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        format!("{:.1}m", secs / 60.0)
    }
}

/// Running totals per resolution outcome.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ResolveTally {
    pub matched: u64,
    pub needs_selection: u64,
    pub missing: u64,
}

impl ResolveTally {
    pub fn record(&mut self, status: EntryStatus) {
        match status {
            EntryStatus::AutoMatched => self.matched += 1,
            EntryStatus::NeedsSelection => self.needs_selection += 1,
            EntryStatus::Missing => self.missing += 1,
            EntryStatus::Pending => {}
        }
    }

    pub fn done(&self) -> u64 {
        self.matched + self.needs_selection + self.missing
    }
}

impl std::fmt::Display for ResolveTally {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} matched, {} to review, {} missing",
            self.matched, self.needs_selection, self.missing
        )
    }
}

/// Progress bar with consistent styling; hidden in log-only mode.
pub fn create_progress_bar(len: u64, msg: &str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    if is_log_only() {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    } else {
        let style = ProgressStyle::default_bar()
            .template(BAR_TEMPLATE)
            .map(|s| s.progress_chars("=> "))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb
}

/// Spinner for indeterminate waits such as server requests.
pub fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if is_log_only() {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    } else {
        let style = ProgressStyle::default_spinner()
            .template("{msg} {spinner} [{elapsed_precise}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        pb.set_style(style);
        pb.enable_steady_tick(Duration::from_millis(100));
    }
    pb.set_message(msg.to_string());
    pb
}

/// Log progress at fixed intervals when in log-only mode.
pub fn log_progress(phase: &str, tally: &ResolveTally, total: u64, interval: u64) {
    let current = tally.done();
    if is_log_only() && total > 0 && (current % interval.max(1) == 0 || current == total) {
        let pct = 100.0 * current as f64 / total as f64;
        log::info!("[{}] {}/{} ({:.1}%) {}", phase, current, total, pct, tally);
    }
}

/// Drain resolution events until every sender is dropped, advancing `pb`.
pub fn track_resolution(
    events: &Receiver<ResolveEvent>,
    pb: &ProgressBar,
    total: u64,
) -> ResolveTally {
    let interval = (total / 10).max(1);
    let mut tally = ResolveTally::default();
    for event in events.iter() {
        tally.record(event.status);
        pb.inc(1);
        pb.set_message(tally.to_string());
        log_progress("resolve", &tally, total, interval);
    }
    tally
}
