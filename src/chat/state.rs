//! Conversation state, the value the engine reduces over.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::model::{AuthAction, FlowKind, Role, TranscriptEntry};

/// Answer keys written by the scripts.
pub mod fields {
    pub const FIRST_NAME: &str = "firstName";
    pub const LAST_NAME: &str = "lastName";
    pub const HAS_PROPERTY: &str = "hasProperty";
    pub const PROPERTY_TYPE: &str = "propertyType";
    pub const BUDGET: &str = "budget";
    pub const MONTHLY_INCOME: &str = "monthlyIncome";
    pub const INCOME: &str = "income";
    pub const DOWN_PAYMENT_PERCENT: &str = "downPaymentPercent";
    pub const DOWN_PAYMENT: &str = "downPayment";
    pub const TIMELINE: &str = "timeline";
    pub const PURPOSE: &str = "purpose";
    pub const PROGRAM: &str = "program";
    pub const LOCATION: &str = "location";
    pub const RATE_TYPE: &str = "rateType";
    pub const EMAIL: &str = "email";
}

/// A named point in a script.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepId(String);

impl StepId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for StepId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<&str> for StepId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Where the conversation is and what the visitor has told us so far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowState {
    pub current_step: StepId,
    /// Captured answers by field name; last write per field wins.
    pub answers: BTreeMap<String, String>,
    pub awaiting_free_text: bool,
}

impl FlowState {
    pub fn new(initial_step: StepId) -> Self {
        Self {
            current_step: initial_step,
            answers: BTreeMap::new(),
            awaiting_free_text: false,
        }
    }

    pub fn answer(&self, field: &str) -> Option<&str> {
        self.answers.get(field).map(String::as_str)
    }

    pub fn record(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.answers.insert(field.into(), value.into());
    }
}

/// An AI completion that has been requested and not yet applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingCompletion {
    pub ticket: u64,
}

/// The full conversation: transcript plus flow state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    pub flow: FlowKind,
    /// Identifier passed to the completion service.
    pub session_id: String,
    pub transcript: Vec<TranscriptEntry>,
    pub state: FlowState,
    /// Set once an auth hand-off fired; local scripting stops until cleared.
    pub handed_off: Option<AuthAction>,
    pub pending: Option<PendingCompletion>,
    pub next_ticket: u64,
}

impl Conversation {
    pub fn new(flow: FlowKind, session_id: impl Into<String>, initial_step: StepId) -> Self {
        Self {
            flow,
            session_id: session_id.into(),
            transcript: Vec::new(),
            state: FlowState::new(initial_step),
            handed_off: None,
            pending: None,
            next_ticket: 1,
        }
    }

    /// Pre-populate answers the host already knows (e.g. first name).
    pub fn with_answers<I, K, V>(mut self, answers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in answers {
            self.state.record(k, v);
        }
        self
    }

    /// Rebuild a conversation from a persisted snapshot.
    pub fn restore(snapshot: SessionSnapshot) -> Self {
        Self {
            flow: snapshot.flow,
            session_id: snapshot.session_id,
            transcript: snapshot.transcript,
            state: snapshot.state,
            handed_off: snapshot.handed_off,
            pending: None,
            next_ticket: 1,
        }
    }

    pub fn snapshot(&self, saved_at: DateTime<Utc>) -> SessionSnapshot {
        SessionSnapshot {
            flow: self.flow,
            session_id: self.session_id.clone(),
            transcript: self.transcript.clone(),
            state: self.state.clone(),
            handed_off: self.handed_off,
            saved_at,
        }
    }

    /// Choices the visitor may press right now: those on the latest
    /// assistant entry, provided no user reply has followed it.
    pub fn open_choices(&self) -> &[String] {
        match self.transcript.last() {
            Some(entry) if entry.role == Role::Assistant => &entry.choices,
            _ => &[],
        }
    }
}

/// The persisted form of a conversation, keyed by `FlowKind::storage_key`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub flow: FlowKind,
    pub session_id: String,
    pub transcript: Vec<TranscriptEntry>,
    pub state: FlowState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handed_off: Option<AuthAction>,
    pub saved_at: DateTime<Utc>,
}
