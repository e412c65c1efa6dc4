//! Device log sources and the ingestion task
//!
//! The device connection itself lives outside this crate. A [`LogSource`]
//! yields raw text lines; [`run_ingestion`] feeds them to the tagger and
//! drains pending tags while the stream is idle.

use async_trait::async_trait;
use chrono::Local;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::error::{Result, TaggerError};
use crate::signals::{Shutdown, ShutdownSignal};
use crate::tagger::{LogsTagger, TimedLogLine};

/// Stream of raw device log lines
#[async_trait]
pub trait LogSource: Send {
    /// Next line without its terminator, `None` at end of stream
    async fn next_line(&mut self) -> Result<Option<String>>;

    /// Release the connection
    async fn disconnect(&mut self) -> Result<()>;

    /// Human readable origin, for logs
    fn describe(&self) -> String;
}

/// Newline-delimited reader that survives cancellation
///
/// Bytes of an unfinished line stay in `partial` when `next_line` is dropped
/// mid-read (e.g. by the idle tick in `run_ingestion`), and the next call
/// picks up where it left off. Invalid UTF-8 is decoded lossily.
struct LineReader<R> {
    inner: BufReader<R>,
    partial: Vec<u8>,
}

impl<R> LineReader<R>
where
    R: AsyncRead + Unpin,
{
    fn new(inner: R) -> Self {
        Self {
            inner: BufReader::new(inner),
            partial: Vec::new(),
        }
    }

    async fn next_line(&mut self) -> std::io::Result<Option<String>> {
        let read = self.inner.read_until(b'\n', &mut self.partial).await?;
        if read == 0 && self.partial.is_empty() {
            return Ok(None);
        }

        let mut bytes = std::mem::take(&mut self.partial);
        while matches!(bytes.last(), Some(b'\n' | b'\r')) {
            bytes.pop();
        }
        Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
    }

    fn into_inner(self) -> R {
        self.inner.into_inner()
    }
}

/// Line stream over TCP (e.g. a log bridge forwarding the device console)
pub struct TcpLineSource {
    address: String,
    reader: Option<LineReader<TcpStream>>,
}

impl TcpLineSource {
    pub async fn connect(address: &str, timeout: Duration) -> Result<Self> {
        info!("Connecting to device at {}...", address);
        let stream = tokio::time::timeout(timeout, TcpStream::connect(address))
            .await
            .map_err(|_| TaggerError::Source(format!("Timed out connecting to {}", address)))?
            .map_err(|e| TaggerError::Source(format!("Error connecting to {}: {}", address, e)))?;
        info!("Connected to {}", address);

        Ok(Self {
            address: address.to_string(),
            reader: Some(LineReader::new(stream)),
        })
    }
}

#[async_trait]
impl LogSource for TcpLineSource {
    async fn next_line(&mut self) -> Result<Option<String>> {
        let Some(reader) = self.reader.as_mut() else {
            return Ok(None);
        };
        reader
            .next_line()
            .await
            .map_err(|e| TaggerError::Source(format!("Read from {} failed: {}", self.address, e)))
    }

    async fn disconnect(&mut self) -> Result<()> {
        if let Some(reader) = self.reader.take() {
            let mut stream = reader.into_inner();
            // The peer may already be gone
            if let Err(e) = stream.shutdown().await {
                debug!("Socket shutdown for {}: {}", self.address, e);
            }
            info!("Disconnected from {}", self.address);
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("tcp://{}", self.address)
    }
}

/// Replays a captured log file, one line per `interval`
pub struct ReplaySource {
    path: PathBuf,
    reader: Option<LineReader<tokio::fs::File>>,
    interval: Option<Duration>,
    /// Deadline of the next line, kept across cancelled reads
    next_due: Option<Instant>,
}

impl ReplaySource {
    pub async fn open(path: &Path, interval: Option<Duration>) -> Result<Self> {
        let file = tokio::fs::File::open(path).await.map_err(|e| {
            TaggerError::Source(format!("Cannot open replay file {}: {}", path.display(), e))
        })?;
        info!("Replaying {}", path.display());

        Ok(Self {
            path: path.to_path_buf(),
            reader: Some(LineReader::new(file)),
            interval: interval.filter(|d| !d.is_zero()),
            next_due: None,
        })
    }
}

#[async_trait]
impl LogSource for ReplaySource {
    async fn next_line(&mut self) -> Result<Option<String>> {
        let Some(reader) = self.reader.as_mut() else {
            return Ok(None);
        };
        if let Some(interval) = self.interval {
            let due = *self.next_due.get_or_insert_with(|| Instant::now() + interval);
            tokio::time::sleep_until(due).await;
        }
        let line = reader.next_line().await?;
        self.next_due = None;
        Ok(line)
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.reader = None;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("file://{}", self.path.display())
    }
}

/// Feed device lines into the tagger until the stream ends or shutdown
///
/// Pending tags are drained by each new line; `idle_drain` additionally
/// flushes them when the stream goes quiet. The source is always
/// disconnected before returning, and shutdown is triggered if the stream
/// ended on its own.
pub async fn run_ingestion(
    mut source: Box<dyn LogSource>,
    tagger: Arc<LogsTagger>,
    shutdown: Shutdown,
    idle_drain: Duration,
) -> Result<()> {
    info!("Ingesting logs from {}", source.describe());
    let mut idle_timer = tokio::time::interval_at(Instant::now() + idle_drain, idle_drain);
    idle_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut lines = 0u64;

    let outcome = loop {
        tokio::select! {
            biased;

            _ = shutdown.wait() => {
                debug!("Ingestion stopping on shutdown");
                break Ok(());
            }

            line = source.next_line() => match line {
                Ok(Some(text)) => {
                    lines += 1;
                    tagger.add_log(TimedLogLine::now(text)).await;
                }
                Ok(None) => {
                    info!("Log stream from {} ended after {} lines", source.describe(), lines);
                    shutdown.trigger(ShutdownSignal::SourceClosed);
                    break Ok(());
                }
                Err(e) => {
                    error!("Log stream failed: {}", e);
                    shutdown.trigger(ShutdownSignal::SourceClosed);
                    break Err(e);
                }
            },

            _ = idle_timer.tick() => {
                if tagger.pending_len().await > 0 {
                    let reports = tagger.drain_pending(Local::now()).await;
                    debug!("Idle drain flushed {} tag(s)", reports.len());
                }
            }
        }
    };

    // Tags queued right before the stream stopped still get flushed
    if tagger.pending_len().await > 0 {
        tagger.drain_pending(Local::now()).await;
    }

    if let Err(e) = source.disconnect().await {
        warn!("Error while disconnecting from {}: {}", source.describe(), e);
    }
    outcome
}
