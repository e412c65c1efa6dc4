//! Operator input
//!
//! Reading from the terminal blocks, so [`StdinPrompter`] reads stdin on its
//! own OS thread and hands complete lines to async callers over a channel.
//! The ingestion task never waits on the operator.

use async_trait::async_trait;
use colored::Colorize;
use std::collections::VecDeque;
use std::io::{self, BufRead, Write};
use std::sync::Mutex as StdMutex;
use tokio::sync::{mpsc, Mutex};
use tracing::debug;

use crate::error::Result;

/// Source of operator answers
#[async_trait]
pub trait Prompter: Send + Sync {
    /// Show `text` and wait for one line of input
    ///
    /// Returns `None` once input is closed.
    async fn prompt(&self, text: &str) -> Result<Option<String>>;
}

/// Prompter backed by the process stdin
pub struct StdinPrompter {
    lines: Mutex<mpsc::Receiver<io::Result<String>>>,
}

impl StdinPrompter {
    /// Spawn the stdin reader thread
    ///
    /// The thread is detached: it exits when stdin closes or when the
    /// receiving side is dropped, and never keeps the process alive.
    pub fn spawn() -> Result<Self> {
        let (tx, rx) = mpsc::channel(1);

        std::thread::Builder::new()
            .name("stdin-reader".to_string())
            .spawn(move || {
                let stdin = io::stdin();
                let mut handle = stdin.lock();
                loop {
                    let mut line = String::new();
                    let read = handle.read_line(&mut line);
                    let done = matches!(read, Ok(0) | Err(_));
                    let message = read.map(|_| line);
                    if done {
                        // EOF is reported as a closed channel
                        if let Err(e) = message {
                            let _ = tx.blocking_send(Err(e));
                        }
                        break;
                    }
                    if tx.blocking_send(message).is_err() {
                        break;
                    }
                }
                debug!("stdin reader stopped");
            })?;

        Ok(Self {
            lines: Mutex::new(rx),
        })
    }
}

#[async_trait]
impl Prompter for StdinPrompter {
    async fn prompt(&self, text: &str) -> Result<Option<String>> {
        {
            let mut stdout = io::stdout().lock();
            write!(stdout, "{}", text.bright_green().bold())?;
            stdout.flush()?;
        }

        let mut lines = self.lines.lock().await;
        match lines.recv().await {
            Some(Ok(line)) => Ok(Some(line)),
            Some(Err(e)) => Err(e.into()),
            None => Ok(None),
        }
    }
}

/// Prompter answering from a fixed list, used for scripted sessions
///
/// Records every prompt it was shown.
#[derive(Default)]
pub struct ScriptedPrompter {
    answers: StdMutex<VecDeque<String>>,
    shown: StdMutex<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: StdMutex::new(answers.into_iter().map(Into::into).collect()),
            shown: StdMutex::new(Vec::new()),
        }
    }

    /// Prompts shown so far
    pub fn shown(&self) -> Vec<String> {
        self.shown
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl Prompter for ScriptedPrompter {
    async fn prompt(&self, text: &str) -> Result<Option<String>> {
        self.shown
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(text.to_string());
        Ok(self
            .answers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_prompter_answers_in_order() {
        let prompter = ScriptedPrompter::new(["e30s", "pump started"]);

        assert_eq!(prompter.prompt("first").await.unwrap().as_deref(), Some("e30s"));
        assert_eq!(
            prompter.prompt("second").await.unwrap().as_deref(),
            Some("pump started")
        );
        assert_eq!(prompter.prompt("third").await.unwrap(), None);
        assert_eq!(prompter.shown(), vec!["first", "second", "third"]);
    }
}
