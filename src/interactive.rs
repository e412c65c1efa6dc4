//! Interactive tagging loop
//!
//! Reads tag commands from the operator, asks for the follow-up value and
//! hands finished tags to the tagger's pending queue.

use colored::Colorize;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::error::{Result, TaggerError};
use crate::prompt::Prompter;
use crate::signals::{Shutdown, ShutdownSignal};
use crate::tagger::LogsTagger;
use crate::tags::{TagEntry, TagType};

/// Command that ends the session
pub const QUIT_COMMAND: &str = "q";

/// Main menu shown before every command
pub fn command_prompt() -> String {
    format!("\nPress {}  \n\t{}: quit: ", TagType::menu(), QUIT_COMMAND)
}

/// Race a prompt against shutdown, `None` when shutdown won or input closed
async fn ask(prompter: &dyn Prompter, shutdown: &Shutdown, text: &str) -> Result<Option<String>> {
    tokio::select! {
        biased;
        _ = shutdown.wait() => Ok(None),
        answer = prompter.prompt(text) => answer,
    }
}

/// Ask for the tag's follow-up value until a usable answer arrives
///
/// Returns `false` if input closed or shutdown started first.
async fn complete_tag(tag: &mut TagEntry, prompter: &dyn Prompter, shutdown: &Shutdown) -> Result<bool> {
    loop {
        let answered = tokio::select! {
            biased;
            _ = shutdown.wait() => return Ok(false),
            answered = tag.prompt_user(prompter) => answered,
        };
        match answered {
            Ok(answered) => return Ok(answered),
            Err(TaggerError::InvalidSearchValue(value)) => {
                println!("{}", format!("'{}' is not a number, try again", value).bright_red());
            }
            Err(e) => return Err(e),
        }
    }
}

/// Run the operator session until quit, closed input or shutdown
///
/// Returns how many tags were queued. However the session ends, including
/// on an input error, shutdown is triggered for the rest of the process.
pub async fn run_interactive(
    prompter: Arc<dyn Prompter>,
    tagger: Arc<LogsTagger>,
    shutdown: Shutdown,
) -> Result<usize> {
    info!("Starting input listener...");
    let outcome = session(prompter.as_ref(), &tagger, &shutdown).await;

    if let Err(e) = &outcome {
        error!("Operator input failed: {}", e);
    }
    shutdown.trigger(ShutdownSignal::Quit);
    outcome
}

async fn session(prompter: &dyn Prompter, tagger: &LogsTagger, shutdown: &Shutdown) -> Result<usize> {
    let mut queued = 0;

    while !shutdown.is_triggered() {
        let Some(input) = ask(prompter, shutdown, &command_prompt()).await? else {
            break;
        };
        let input = input.trim().to_lowercase();

        if input == QUIT_COMMAND {
            println!("{}", "Exiting program...".bright_green().bold());
            break;
        }

        let mut tag = TagEntry::parse(&input);
        if !tag.is_valid() {
            if !input.is_empty() {
                warn!("Unrecognized tag command: {:?}", input);
            }
            continue;
        }

        if !complete_tag(&mut tag, prompter, shutdown).await? {
            break;
        }

        if tagger.enqueue(tag).await {
            queued += 1;
        }
    }

    Ok(queued)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::ScriptedPrompter;
    use crate::sink::MemorySink;

    fn tagger() -> Arc<LogsTagger> {
        Arc::new(LogsTagger::new(Arc::new(MemorySink::new()), 100))
    }

    #[tokio::test]
    async fn test_session_queues_tags_and_quits() {
        let prompter = Arc::new(ScriptedPrompter::new(["e30s", "defrost", "f", "q", "c"]));
        let tagger = tagger();
        let shutdown = Shutdown::new();

        let queued = run_interactive(prompter.clone(), tagger.clone(), shutdown.clone())
            .await
            .unwrap();

        assert_eq!(queued, 2);
        assert_eq!(tagger.pending_len().await, 2);
        assert!(shutdown.is_triggered());
        // Three menu prompts and one follow-up, nothing after quit
        assert_eq!(prompter.shown().len(), 4);
    }

    #[tokio::test]
    async fn test_invalid_commands_are_skipped() {
        let prompter = Arc::new(ScriptedPrompter::new(["", "zz", "42", "q"]));
        let tagger = tagger();

        let queued = run_interactive(prompter, tagger.clone(), Shutdown::new())
            .await
            .unwrap();
        assert_eq!(queued, 0);
        assert_eq!(tagger.pending_len().await, 0);
    }

    #[tokio::test]
    async fn test_non_numeric_search_value_reprompts() {
        let prompter = Arc::new(ScriptedPrompter::new(["t", "warm", "21.5", "q"]));
        let tagger = tagger();

        let queued = run_interactive(prompter.clone(), tagger.clone(), Shutdown::new())
            .await
            .unwrap();

        assert_eq!(queued, 1);
        let shown = prompter.shown();
        assert_eq!(
            shown.iter().filter(|p| p.starts_with("Enter the temperature")).count(),
            2
        );
    }

    #[tokio::test]
    async fn test_closed_input_triggers_shutdown() {
        let prompter = Arc::new(ScriptedPrompter::new(["n"]));
        let shutdown = Shutdown::new();

        let queued = run_interactive(prompter, tagger(), shutdown.clone())
            .await
            .unwrap();
        assert_eq!(queued, 0);
        assert!(shutdown.is_triggered());
    }

    #[tokio::test]
    async fn test_no_prompt_after_shutdown() {
        let prompter = Arc::new(ScriptedPrompter::new(["e", "x"]));
        let shutdown = Shutdown::new();
        shutdown.trigger(ShutdownSignal::Interrupted);

        run_interactive(prompter.clone(), tagger(), shutdown).await.unwrap();
        assert!(prompter.shown().is_empty());
    }

    struct BrokenPrompter;

    #[async_trait::async_trait]
    impl Prompter for BrokenPrompter {
        async fn prompt(&self, _text: &str) -> Result<Option<String>> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "stdin gone").into())
        }
    }

    #[tokio::test]
    async fn test_input_error_still_triggers_shutdown() {
        let shutdown = Shutdown::new();
        let mut events = shutdown.subscribe();

        let result = run_interactive(Arc::new(BrokenPrompter), tagger(), shutdown.clone()).await;

        assert!(matches!(result, Err(TaggerError::Io(_))));
        assert!(shutdown.is_triggered());
        assert_eq!(events.recv().await.unwrap(), ShutdownSignal::Quit);
    }

    #[test]
    fn test_command_prompt_mentions_quit() {
        let prompt = command_prompt();
        assert!(prompt.contains("e: log an observed state change"));
        assert!(prompt.ends_with("q: quit: "));
    }
}
