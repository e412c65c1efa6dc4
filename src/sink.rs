//! Output sinks for device lines and tag annotations
//!
//! Every accepted device line and every marker emitted by a flush goes
//! through a [`LogSink`]. The rolling file sink persists them, the console
//! sink echoes them to the operator.

use chrono::Local;
use colored::Colorize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::info;
use tracing_appender::rolling::{RollingFileAppender, Rotation};

use crate::error::{Result, TaggerError};

/// Category of an emitted line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Device line as received
    Log,
    /// BEGIN / END markers
    Marker,
    /// Device line matched by a tag
    Annotation,
    /// Flush found nothing
    NoData,
    /// Operator-facing status, not persisted
    Notice,
    /// Low-visibility diagnostics, not persisted
    Diagnostic,
}

impl LineKind {
    /// Whether lines of this kind belong in the persistent log
    pub fn is_persistent(self) -> bool {
        !matches!(self, Self::Notice | Self::Diagnostic)
    }
}

/// Destination for emitted lines
pub trait LogSink: Send + Sync {
    fn write_line(&self, kind: LineKind, line: &str) -> Result<()>;
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Daily-rotated log file with bounded retention
pub struct RollingFileSink {
    writer: Mutex<RollingFileAppender>,
    directory: PathBuf,
    file_prefix: String,
}

impl RollingFileSink {
    /// Open the sink for `log_prefix` (e.g. `logs/POOL`)
    ///
    /// Files are named `<dir>/<stem>_device_logs.<date>.log`. The directory
    /// is created when missing; failing to create it is fatal.
    pub fn create(log_prefix: &Path, retention_days: usize) -> Result<Self> {
        let directory = match log_prefix.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let stem = log_prefix
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| "device".to_string());
        let file_prefix = format!("{}_device_logs", stem);

        let unavailable = |reason: String| TaggerError::SinkUnavailable {
            path: directory.clone(),
            reason,
        };

        if !directory.exists() {
            std::fs::create_dir_all(&directory).map_err(|e| unavailable(e.to_string()))?;
            info!("Created log directory: {}", directory.display());
        }

        let appender = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix(file_prefix.clone())
            .filename_suffix("log")
            .max_log_files(retention_days.max(1))
            .build(&directory)
            .map_err(|e| unavailable(e.to_string()))?;

        info!(
            "Log file: {}/{}.<date>.log",
            directory.display(),
            file_prefix
        );

        Ok(Self {
            writer: Mutex::new(appender),
            directory,
            file_prefix,
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn file_prefix(&self) -> &str {
        &self.file_prefix
    }
}

impl LogSink for RollingFileSink {
    fn write_line(&self, kind: LineKind, line: &str) -> Result<()> {
        if !kind.is_persistent() {
            return Ok(());
        }

        let record = format!(
            "{} - {}\n",
            Local::now().format("%Y-%m-%d %H:%M:%S,%3f"),
            line
        );
        let mut writer = lock(&self.writer);
        writer
            .write_all(record.as_bytes())
            .map_err(|e| TaggerError::Sink(e.to_string()))
    }
}

/// Colored echo to stdout
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

impl LogSink for ConsoleSink {
    fn write_line(&self, kind: LineKind, line: &str) -> Result<()> {
        let rendered = match kind {
            LineKind::Log | LineKind::Annotation => line.normal(),
            LineKind::Marker => line.bright_green().bold(),
            LineKind::NoData => line.bright_yellow().bold(),
            LineKind::Notice => line.bright_green(),
            LineKind::Diagnostic => line.white().dimmed(),
        };
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{}", rendered)?;
        Ok(())
    }
}

/// Writes every line to all inner sinks
pub struct FanoutSink {
    sinks: Vec<Arc<dyn LogSink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Arc<dyn LogSink>>) -> Self {
        Self { sinks }
    }
}

impl LogSink for FanoutSink {
    /// All sinks are attempted; the first error is returned
    fn write_line(&self, kind: LineKind, line: &str) -> Result<()> {
        let mut first_error = None;
        for sink in &self.sinks {
            if let Err(e) = sink.write_line(kind, line) {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

/// Keeps emitted lines in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<(LineKind, String)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<(LineKind, String)> {
        lock(&self.lines).clone()
    }

    /// Texts of every line of the given kind
    pub fn lines_of(&self, kind: LineKind) -> Vec<String> {
        lock(&self.lines)
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, text)| text.clone())
            .collect()
    }

    pub fn clear(&self) {
        lock(&self.lines).clear();
    }
}

impl LogSink for MemorySink {
    fn write_line(&self, kind: LineKind, line: &str) -> Result<()> {
        lock(&self.lines).push((kind, line.to_string()));
        Ok(())
    }
}
