//! CLI channel: a terminal REPL over one chat session.
//!
//! Assistant entries are printed one at a time, holding each for its
//! `reveal_after_ms` when pacing is on. Buttons are numbered; typing a number
//! or a button's label presses it, anything else is sent as free text.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::chat::manager::{ChatSession, TurnOutcome};
use crate::chat::model::{Role, TranscriptEntry};
use crate::error::ChannelError;

/// What a line of terminal input means.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliInput {
    Choice(String),
    Text(String),
    Reset,
    Quit,
}

/// Interpret a trimmed, non-empty line against the buttons on offer.
pub fn parse_input(line: &str, choices: &[String]) -> CliInput {
    match line {
        "/quit" | "/exit" => return CliInput::Quit,
        "/reset" => return CliInput::Reset,
        _ => {}
    }
    let numbered = line
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| choices.get(i));
    if let Some(label) = numbered {
        return CliInput::Choice(label.clone());
    }
    if let Some(label) = choices.iter().find(|c| c.eq_ignore_ascii_case(line)) {
        return CliInput::Choice(label.clone());
    }
    CliInput::Text(line.to_string())
}

/// Format one assistant entry for the terminal.
pub fn format_entry(entry: &TranscriptEntry) -> String {
    let mut out = format!("Ellen: {}", entry.content);
    for (i, choice) in entry.choices.iter().enumerate() {
        out.push_str(&format!("\n  [{}] {choice}", i + 1));
    }
    if let Some(ref hint) = entry.input_prompt {
        out.push_str(&format!("\n  ({hint})"));
    }
    out
}

pub struct CliChannel {
    pacing: bool,
}

impl CliChannel {
    pub fn new(pacing: bool) -> Self {
        Self { pacing }
    }

    fn name(&self) -> &str {
        "cli"
    }

    /// Drive `session` from stdin until EOF or `/quit`, then close it.
    pub async fn run(&self, session: &ChatSession) -> Result<(), ChannelError> {
        let conv = session.conversation().await;
        // Restored history is shown at once; only new entries are paced.
        for entry in conv.transcript.iter() {
            match entry.role {
                Role::Assistant => println!("{}\n", format_entry(entry)),
                Role::User => println!("You: {}\n", entry.content),
            }
        }

        let reader = BufReader::new(tokio::io::stdin());
        let mut lines = reader.lines();
        eprint!("> ");

        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    session.close().await;
                    return Err(ChannelError::ReadFailed {
                        name: self.name().to_string(),
                        reason: e.to_string(),
                    });
                }
            };
            let line = line.trim();
            if line.is_empty() {
                eprint!("> ");
                continue;
            }

            let conv = session.conversation().await;
            let before = conv.transcript.len();
            let outcome = match parse_input(line, conv.open_choices()) {
                CliInput::Quit => break,
                CliInput::Reset => match session.reset().await {
                    Ok(outcome) => {
                        println!("(starting over)\n");
                        self.present(&outcome.appended).await;
                        eprint!("> ");
                        continue;
                    }
                    Err(e) => {
                        eprintln!("Could not reset: {e}");
                        eprint!("> ");
                        continue;
                    }
                },
                CliInput::Choice(label) => session.choose(&label).await,
                CliInput::Text(text) => session.send(&text).await,
            };

            self.report(session, outcome, before).await;
            eprint!("> ");
        }

        session.close().await;
        Ok(())
    }

    async fn report(&self, session: &ChatSession, outcome: TurnOutcome, before: usize) {
        if let Some(rejection) = outcome.rejection {
            eprintln!("({rejection})");
            return;
        }

        let appended = if outcome.awaiting_completion {
            self.present(&outcome.appended).await;
            eprintln!("Ellen is typing...");
            session.wait_idle().await;
            let seen = before + outcome.appended.len();
            session
                .conversation()
                .await
                .transcript
                .get(seen..)
                .unwrap_or_default()
                .to_vec()
        } else {
            outcome.appended
        };
        self.present(&appended).await;

        if let Some(action) = outcome.auth {
            println!("-> Opening the {action} screen. Come back here when you're done.\n");
        }
        if let Some(destination) = outcome.host_action {
            println!("-> {destination}\n");
        }
    }

    async fn present(&self, entries: &[TranscriptEntry]) {
        for entry in entries.iter().filter(|e| e.is_assistant()) {
            if self.pacing && entry.reveal_after_ms > 0 {
                tokio::time::sleep(Duration::from_millis(entry.reveal_after_ms)).await;
            }
            println!("{}\n", format_entry(entry));
        }
    }
}
