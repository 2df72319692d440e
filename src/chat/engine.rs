//! The dialogue engine: a pure reducer over [`Conversation`] values.
//!
//! `reduce` never performs I/O. Everything the outside world must do
//! (persist, call the AI, open a login screen) comes back as an [`Effect`]
//! for the host shell to execute. Rejected actions leave the conversation
//! exactly as it was.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::model::{AuthAction, Handoff, MessageSpec, TranscriptEntry};
use super::name::{NAME_REPROMPT, parse_name};
use super::state::{Conversation, PendingCompletion, SessionSnapshot, fields};
use super::table::{AI_FALLBACK_REPLY, CaptureValue, Row, TransitionTable, signup_offer};
use super::template::Renderer;
use crate::error::LlmError;
use crate::llm::{Completion, CompletionContext, CompletionRequest};

/// Something that happened to the conversation.
#[derive(Debug)]
pub enum Action {
    /// Append the opening messages to an empty conversation.
    Start,
    /// The visitor pressed a button.
    Choice(String),
    /// The visitor submitted free text.
    Text(String),
    /// The completion service answered the request issued under `ticket`.
    CompletionReady {
        ticket: u64,
        result: Result<Completion, LlmError>,
    },
    /// The host reports the visitor came back from the auth screen.
    AuthCompleted,
}

/// Why an action was refused. The conversation is unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Rejection {
    #[error("'{label}' is not one of the offered choices")]
    ChoiceNotOffered { label: String },

    #[error("message is empty")]
    EmptyText,

    #[error("still waiting on the previous answer")]
    HandoffInProgress,

    #[error("step '{step}' expects a button, not free text")]
    FreeTextNotExpected { step: String },

    #[error("waiting for the visitor to {action}")]
    HandedOff { action: AuthAction },
}

/// Instructions for the host shell.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Save a snapshot of the conversation.
    Persist,
    /// Run the completion and feed the result back as `CompletionReady`.
    RequestCompletion {
        ticket: u64,
        request: CompletionRequest,
    },
    /// Send the visitor to log in or sign up.
    RequireAuth(AuthAction),
    /// A destination owned by the embedding page.
    HostAction(String),
    Rejected(Rejection),
    /// A script problem worth surfacing during development.
    Diagnostic(String),
}

/// Interprets one [`TransitionTable`].
pub struct Engine {
    table: Arc<TransitionTable>,
    renderer: Renderer,
}

impl Engine {
    pub fn new(table: Arc<TransitionTable>) -> Self {
        Self {
            table,
            renderer: Renderer::new(),
        }
    }

    pub fn table(&self) -> &TransitionTable {
        &self.table
    }

    /// A conversation at the table's initial step, seeded with known answers.
    pub fn fresh<I, K, V>(&self, session_id: impl Into<String>, seed: I) -> Conversation
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Conversation::new(self.table.flow, session_id, self.table.initial_step.clone())
            .with_answers(seed)
    }

    /// Rebuild a persisted conversation. No completion survives a restore,
    /// so the input mode is recomputed from the current step.
    pub fn resume(&self, snapshot: SessionSnapshot) -> Conversation {
        let mut conv = Conversation::restore(snapshot);
        self.refresh_input_mode(&mut conv);
        conv
    }

    pub fn reduce(
        &self,
        mut conv: Conversation,
        action: Action,
        now: DateTime<Utc>,
    ) -> (Conversation, Vec<Effect>) {
        let mut effects = Vec::new();
        match action {
            Action::Start => self.start(&mut conv, now, &mut effects),
            Action::Choice(label) => self.choose(&mut conv, &label, now, &mut effects),
            Action::Text(text) => self.text(&mut conv, &text, now, &mut effects),
            Action::CompletionReady { ticket, result } => {
                self.completion(&mut conv, ticket, result, now, &mut effects)
            }
            Action::AuthCompleted => {
                if let Some(action) = conv.handed_off.take() {
                    tracing::info!(flow = %conv.flow, action = %action, "Auth hand-off completed");
                    self.refresh_input_mode(&mut conv);
                    effects.push(Effect::Persist);
                } else {
                    effects.push(Effect::Diagnostic(
                        "auth completion without an auth hand-off".to_string(),
                    ));
                }
            }
        }
        (conv, effects)
    }

    fn start(&self, conv: &mut Conversation, now: DateTime<Utc>, effects: &mut Vec<Effect>) {
        if !conv.transcript.is_empty() {
            return;
        }
        for spec in &self.table.opening {
            let entry = self.entry(spec, &conv.state.answers, None, now);
            conv.transcript.push(entry);
        }
        self.refresh_input_mode(conv);
        effects.push(Effect::Persist);
    }

    fn choose(
        &self,
        conv: &mut Conversation,
        label: &str,
        now: DateTime<Utc>,
        effects: &mut Vec<Effect>,
    ) {
        if let Some(rejection) = self.busy(conv) {
            effects.push(Effect::Rejected(rejection));
            return;
        }
        if !conv.open_choices().iter().any(|c| c == label) {
            effects.push(Effect::Rejected(Rejection::ChoiceNotOffered {
                label: label.to_string(),
            }));
            return;
        }
        let step = &conv.state.current_step;
        let Some(row) = self.table.choice_row(step, label) else {
            tracing::warn!(flow = %conv.flow, step = %step, label, "No transition row for choice");
            effects.push(Effect::Diagnostic(format!(
                "no row for choice '{label}' at step '{step}' in {}",
                conv.flow
            )));
            return;
        };
        self.advance(conv, row, label, now, effects);
    }

    fn text(
        &self,
        conv: &mut Conversation,
        text: &str,
        now: DateTime<Utc>,
        effects: &mut Vec<Effect>,
    ) {
        if let Some(rejection) = self.busy(conv) {
            effects.push(Effect::Rejected(rejection));
            return;
        }
        let text = text.trim();
        if text.is_empty() {
            effects.push(Effect::Rejected(Rejection::EmptyText));
            return;
        }
        let Some(row) = self.table.text_row(&conv.state.current_step) else {
            effects.push(Effect::Rejected(Rejection::FreeTextNotExpected {
                step: conv.state.current_step.to_string(),
            }));
            return;
        };
        self.advance(conv, row, text, now, effects);
    }

    /// Apply a matched row: record the reply, capture, move, speak, hand off.
    fn advance(
        &self,
        conv: &mut Conversation,
        row: &Row,
        response: &str,
        now: DateTime<Utc>,
        effects: &mut Vec<Effect>,
    ) {
        conv.transcript.push(TranscriptEntry::user(response, now));

        if let Some(ref capture) = row.capture {
            match &capture.value {
                CaptureValue::Response => conv.state.record(&capture.field, response),
                CaptureValue::Fixed(value) => conv.state.record(&capture.field, value),
                CaptureValue::FullName => match parse_name(response) {
                    Ok(name) => {
                        conv.state.record(fields::FIRST_NAME, name.first_name);
                        conv.state.record(fields::LAST_NAME, name.last_name);
                    }
                    Err(e) => {
                        tracing::debug!(flow = %conv.flow, error = %e, "Name not accepted");
                        conv.transcript
                            .push(TranscriptEntry::assistant(NAME_REPROMPT, now));
                        self.refresh_input_mode(conv);
                        effects.push(Effect::Persist);
                        return;
                    }
                },
            }
        }

        if row.defer_to == Some(Handoff::Ai) {
            let ticket = conv.next_ticket;
            conv.next_ticket += 1;
            conv.pending = Some(PendingCompletion { ticket });
            let request = CompletionRequest {
                message: response.to_string(),
                session_id: conv.session_id.clone(),
                context: CompletionContext {
                    category: conv.flow.category(),
                    user_name: conv.state.answer(fields::FIRST_NAME).map(str::to_string),
                    step: conv.state.current_step.to_string(),
                },
                answers: conv.state.answers.clone(),
            };
            tracing::debug!(flow = %conv.flow, ticket, "Deferring free text to completion service");
            self.refresh_input_mode(conv);
            effects.push(Effect::RequestCompletion { ticket, request });
            effects.push(Effect::Persist);
            return;
        }

        let goto = row.next.resolve(&conv.state.answers);
        let from = std::mem::replace(&mut conv.state.current_step, goto.step.clone());
        tracing::debug!(flow = %conv.flow, from = %from, to = %goto.step, "Transition");

        for spec in row.messages_for(goto) {
            let entry = self.entry(spec, &conv.state.answers, Some(response), now);
            conv.transcript.push(entry);
        }

        match row.defer_to {
            Some(Handoff::Auth(action)) => {
                tracing::info!(flow = %conv.flow, action = %action, "Handing off to auth");
                conv.handed_off = Some(action);
                effects.push(Effect::RequireAuth(action));
            }
            Some(Handoff::Host(ref destination)) => {
                effects.push(Effect::HostAction(destination.clone()));
            }
            Some(Handoff::Ai) | None => {}
        }

        self.refresh_input_mode(conv);
        effects.push(Effect::Persist);
    }

    fn completion(
        &self,
        conv: &mut Conversation,
        ticket: u64,
        result: Result<Completion, LlmError>,
        now: DateTime<Utc>,
        effects: &mut Vec<Effect>,
    ) {
        if conv.pending.map(|p| p.ticket) != Some(ticket) {
            tracing::debug!(flow = %conv.flow, ticket, "Discarding stale completion");
            effects.push(Effect::Diagnostic(format!(
                "discarded completion for stale ticket {ticket}"
            )));
            return;
        }
        conv.pending = None;

        match result {
            Ok(completion) => {
                conv.transcript
                    .push(TranscriptEntry::assistant(completion.message, now));
                if completion.intent.is_some_and(|i| i.offers_signup()) {
                    let offer = self.entry(&signup_offer(), &conv.state.answers, None, now);
                    conv.transcript.push(offer);
                }
            }
            Err(e) => {
                tracing::warn!(flow = %conv.flow, error = %e, "Completion failed, using fallback reply");
                conv.transcript
                    .push(TranscriptEntry::assistant(AI_FALLBACK_REPLY, now));
            }
        }

        self.refresh_input_mode(conv);
        effects.push(Effect::Persist);
    }

    fn busy(&self, conv: &Conversation) -> Option<Rejection> {
        if let Some(action) = conv.handed_off {
            return Some(Rejection::HandedOff { action });
        }
        conv.pending.map(|_| Rejection::HandoffInProgress)
    }

    fn refresh_input_mode(&self, conv: &mut Conversation) {
        conv.state.awaiting_free_text = conv.pending.is_none()
            && conv.handed_off.is_none()
            && self.table.accepts_text(&conv.state.current_step);
    }

    fn entry(
        &self,
        spec: &MessageSpec,
        answers: &BTreeMap<String, String>,
        response: Option<&str>,
        now: DateTime<Utc>,
    ) -> TranscriptEntry {
        let mut entry =
            TranscriptEntry::assistant(self.renderer.render(&spec.text, answers, response), now);
        entry.choices = spec.choices.clone();
        entry.input_prompt = spec.input_prompt.clone();
        entry.signup_offer = spec.signup_offer;
        entry.reveal_after_ms = spec.reveal_after_ms;
        entry
    }
}
