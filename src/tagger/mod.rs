//! Buffer and queue orchestration
//!
//! [`LogsTagger`] ties the ingestion path to tag flushes:
//! - every device line is stamped, persisted and appended to the buffer
//! - each appended line drains at most one pending tag
//! - a flush scans the tag's window and emits annotated matches

mod buffer;
mod queue;

pub use buffer::{LogBuffer, TimedLogLine};
pub use queue::PendingTagQueue;

use chrono::{DateTime, Local};
use regex::Regex;
use std::collections::HashSet;
use std::sync::{Arc, OnceLock};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{Result, TaggerError};
use crate::sink::{LineKind, LogSink};
use crate::tags::{TagEntry, TagType, TIME_FORMAT};

static GLOBAL: OnceLock<Arc<LogsTagger>> = OnceLock::new();

fn bracket_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // ANSI escapes are matched as a whole so their '[' is skipped
    PATTERN.get_or_init(|| {
        Regex::new(r"\x1b\[[0-9;?]*[A-Za-z]|\[").expect("bracket pattern is valid")
    })
}

/// Insert `[time]` before the first '[' that is not part of an ANSI escape
///
/// Lines without such a bracket are returned unchanged.
pub fn stamp_time(text: &str, time: DateTime<Local>) -> String {
    let position = bracket_pattern()
        .find_iter(text)
        .find(|m| m.as_str() == "[")
        .map(|m| m.start());

    match position {
        Some(position) => format!(
            "{}[{}]{}",
            &text[..position],
            time.format(TIME_FORMAT),
            &text[position..]
        ),
        None => text.to_string(),
    }
}

/// Outcome of one flush
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub label: String,
    /// Buffered lines inside the window
    pub in_window: usize,
    pub matched: usize,
    /// Matched lines removed from the buffer
    pub removed: usize,
    /// Lines dropped by a buffer flush
    pub cleared: usize,
}

/// Shared tagging context: buffer, pending tags and output sink
pub struct LogsTagger {
    sink: Arc<dyn LogSink>,
    buffer: Mutex<LogBuffer>,
    pending: PendingTagQueue,
    device_time: Mutex<Option<DateTime<Local>>>,
}

impl LogsTagger {
    pub fn new(sink: Arc<dyn LogSink>, buffer_capacity: usize) -> Self {
        Self {
            sink,
            buffer: Mutex::new(LogBuffer::with_capacity(buffer_capacity)),
            pending: PendingTagQueue::new(),
            device_time: Mutex::new(None),
        }
    }

    /// Create the process-wide tagger
    ///
    /// Can only succeed once per process; a second call fails with
    /// [`TaggerError::AlreadyInitialized`] and leaves the first instance in place.
    pub fn initialize(sink: Arc<dyn LogSink>, buffer_capacity: usize) -> Result<Arc<Self>> {
        let tagger = Arc::new(Self::new(sink, buffer_capacity));
        GLOBAL
            .set(tagger.clone())
            .map_err(|_| TaggerError::AlreadyInitialized)?;
        info!("Logs tagger initialized (buffer capacity {})", buffer_capacity);
        Ok(tagger)
    }

    /// The process-wide tagger created by [`LogsTagger::initialize`]
    pub fn global() -> Result<Arc<Self>> {
        GLOBAL.get().cloned().ok_or(TaggerError::NotInitialized)
    }

    fn emit(&self, kind: LineKind, line: &str) {
        if let Err(e) = self.sink.write_line(kind, line) {
            warn!("Failed to write {:?} line: {}", kind, e);
        }
    }

    /// Accept one device line
    ///
    /// The line is stamped and persisted, appended to the buffer, and then at
    /// most one pending tag is flushed with the line's arrival as `now`.
    pub async fn add_log(&self, line: TimedLogLine) -> Option<FlushReport> {
        let now = line.arrival_time;
        self.emit(LineKind::Log, &stamp_time(&line.text, now));

        if let Some(evicted) = self.buffer.lock().await.push(line) {
            debug!("Buffer full, evicted line from {}", evicted.arrival_time.format(TIME_FORMAT));
        }
        *self.device_time.lock().await = Some(now);

        let tag = self.pending.pop().await?;
        Some(self.flush_at(tag, now).await)
    }

    /// Queue a tag for the next drain
    ///
    /// Invalid tags are rejected and `false` is returned.
    pub async fn enqueue(&self, tag: TagEntry) -> bool {
        if !tag.is_valid() {
            warn!("Ignoring invalid tag: {}", tag);
            return false;
        }
        debug!("Queued tag: {}", tag);
        self.pending.push(tag).await;
        true
    }

    /// Flush every pending tag in FIFO order
    pub async fn drain_pending(&self, now: DateTime<Local>) -> Vec<FlushReport> {
        let mut reports = Vec::new();
        for tag in self.pending.take_all().await {
            reports.push(self.flush_at(tag, now).await);
        }
        reports
    }

    /// Flush a tag against the buffer up to the current time
    pub async fn flush(&self, tag: TagEntry) -> FlushReport {
        self.flush_at(tag, Local::now()).await
    }

    /// Flush a tag against the buffer with its window ending at `now`
    ///
    /// The buffer stays locked for the whole flush.
    pub async fn flush_at(&self, tag: TagEntry, now: DateTime<Local>) -> FlushReport {
        let label = tag.display_label().to_string();
        let mut report = FlushReport {
            label: label.clone(),
            ..FlushReport::default()
        };

        self.emit(LineKind::Marker, &format!("{} -- BEGIN", label));
        let mut buffer = self.buffer.lock().await;

        if tag.tag_type == TagType::FlushBuffer {
            report.cleared = buffer.clear();
            self.emit(
                LineKind::Notice,
                &format!("Flushed {} lines from buffer", report.cleared),
            );
            info!("Buffer flushed, {} lines dropped", report.cleared);
            return report;
        }

        let window = tag.window(now);

        let mut matched_positions = HashSet::new();
        for (position, line) in buffer.in_window(window) {
            report.in_window += 1;
            let (matched, annotated) = tag.filter(&line.text);
            if matched {
                matched_positions.insert(position);
                self.emit(LineKind::Annotation, &format!("{}: {}", label, annotated));
            }
        }
        report.matched = matched_positions.len();

        if report.matched == 0 {
            self.emit(LineKind::NoData, &format!("{} NO DATA", label));
        }

        if tag.consumes_matches() {
            report.removed = buffer.remove_positions(&matched_positions);
        }

        self.emit(LineKind::Marker, &format!("{} -- END", label));

        if report.matched == 0 {
            self.emit(
                LineKind::Diagnostic,
                &format!(
                    "No logs found between {} and {}",
                    window.start.format(TIME_FORMAT),
                    window.end.format(TIME_FORMAT)
                ),
            );
            for line in buffer.in_window(window).map(|(_, line)| line) {
                self.emit(
                    LineKind::Diagnostic,
                    &format!(
                        "Excluded: [{}]{}",
                        line.arrival_time.format(TIME_FORMAT),
                        line.text
                    ),
                );
            }
        }

        debug!(
            "Flushed tag '{}': {} in window, {} matched, {} removed",
            report.label, report.in_window, report.matched, report.removed
        );
        report
    }

    pub async fn pending_len(&self) -> usize {
        self.pending.len().await
    }

    pub async fn buffer_len(&self) -> usize {
        self.buffer.lock().await.len()
    }

    /// Arrival time of the latest device line
    pub async fn device_time(&self) -> Option<DateTime<Local>> {
        *self.device_time.lock().await
    }
}
