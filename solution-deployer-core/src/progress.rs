//! Progress notification for long-running Solution operations.
//!
//! [`report_progress`] fans one progress value out to whichever channels the
//! caller configured in [`DeleteOptions`]: a callback, a console-style trace
//! line, or both. Time and output are injected through [`Clock`] and
//! [`ProgressSink`] so the function has no ambient side effects of its own.

use std::io::Write;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::info;

use crate::model::ItemProgressStatus;

/// Source of the timestamp written on console lines.
pub trait Clock: Send + Sync {
    /// Milliseconds since the Unix epoch.
    fn now_millis(&self) -> i64;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or_default()
    }
}

/// A fixed instant, for reproducible output.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now_millis(&self) -> i64 {
        self.0
    }
}

/// One console progress line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressLine {
    pub timestamp_ms: i64,
    pub item_id: String,
    pub job_id: String,
    pub status: String,
    /// Rounded percent followed by `%`.
    pub percent: String,
}

/// Destination of console progress lines.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, line: &ProgressLine);
}

/// Writes each line to stderr and mirrors it as a tracing event.
///
/// Stdout is left to the caller's own output. Write errors (a closed stream)
/// are ignored.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

impl ProgressSink for ConsoleSink {
    fn emit(&self, line: &ProgressLine) {
        let _ = writeln!(
            std::io::stderr().lock(),
            "{} {} {} {} {}",
            line.timestamp_ms, line.item_id, line.job_id, line.status, line.percent
        );
        info!(
            item_id = %line.item_id,
            job_id = %line.job_id,
            status = %line.status,
            percent = %line.percent,
            "[PROGRESS]"
        );
    }
}

/// Payload handed to progress callbacks.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProgressEventData {
    pub event: String,
    /// Id of the item the notification is about, or "".
    pub data: String,
}

/// Caller-supplied progress callback: rounded percent, job id, event data.
pub type ProgressCallback = Arc<dyn Fn(i64, Option<&str>, &ProgressEventData) + Send + Sync>;

/// How a delete operation reports its progress.
#[derive(Clone)]
pub struct DeleteOptions {
    pub progress_callback: Option<ProgressCallback>,
    pub job_id: Option<String>,
    pub console_progress: bool,
    pub clock: Arc<dyn Clock>,
    pub sink: Arc<dyn ProgressSink>,
}

impl Default for DeleteOptions {
    fn default() -> Self {
        DeleteOptions {
            progress_callback: None,
            job_id: None,
            console_progress: false,
            clock: Arc::new(SystemClock),
            sink: Arc::new(ConsoleSink),
        }
    }
}

impl std::fmt::Debug for DeleteOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeleteOptions")
            .field("progress_callback", &self.progress_callback.is_some())
            .field("job_id", &self.job_id)
            .field("console_progress", &self.console_progress)
            .finish()
    }
}

/// Rounds half up, like the platform's own progress reporting.
pub fn round_percent(percent: f64) -> i64 {
    (percent + 0.5).floor() as i64
}

/// Notifies every configured channel of the current progress.
pub fn report_progress(
    percent_done: f64,
    options: &DeleteOptions,
    item_id: Option<&str>,
    status: Option<ItemProgressStatus>,
) {
    let rounded = round_percent(percent_done);
    let item_id = item_id.unwrap_or_default();
    let status = status.unwrap_or_default();

    if let Some(callback) = &options.progress_callback {
        callback(
            rounded,
            options.job_id.as_deref(),
            &ProgressEventData {
                event: String::new(),
                data: item_id.to_string(),
            },
        );
    }

    if options.console_progress {
        options.sink.emit(&ProgressLine {
            timestamp_ms: options.clock.now_millis(),
            item_id: item_id.to_string(),
            job_id: options.job_id.clone().unwrap_or_default(),
            status: status.label().to_string(),
            percent: format!("{rounded}%"),
        });
    }
}
