//! Transcript and script vocabulary shared by the engine, scripts and hosts.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FlowError;

/// Who authored a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// One message in the conversation transcript. Never mutated once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Buttons offered with this entry, in display order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<String>,
    /// Placeholder hint for the free-text box.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_prompt: Option<String>,
    /// Render the "create an account" call to action with this entry.
    #[serde(default)]
    pub signup_offer: bool,
    /// Presentation pacing: how long to hold this entry after the previous one.
    #[serde(default)]
    pub reveal_after_ms: u64,
}

impl TranscriptEntry {
    pub fn user(content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp,
            choices: Vec::new(),
            input_prompt: None,
            signup_offer: false,
            reveal_after_ms: 0,
        }
    }

    pub fn assistant(content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            role: Role::Assistant,
            ..Self::user(content, timestamp)
        }
    }

    pub fn is_assistant(&self) -> bool {
        self.role == Role::Assistant
    }
}

/// An assistant message as authored in a script, before interpolation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageSpec {
    /// Message text; may reference captured answers as `{{ firstName }}`.
    pub text: String,
    pub choices: Vec<String>,
    pub input_prompt: Option<String>,
    pub reveal_after_ms: u64,
    pub signup_offer: bool,
}

/// Pacing used by the scripts for follow-up messages.
pub const FOLLOW_UP_DELAY_MS: u64 = 1000;

impl MessageSpec {
    pub fn say(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            choices: Vec::new(),
            input_prompt: None,
            reveal_after_ms: 0,
            signup_offer: false,
        }
    }

    /// A message revealed after the standard follow-up delay.
    pub fn then(text: impl Into<String>) -> Self {
        Self::say(text).after_ms(FOLLOW_UP_DELAY_MS)
    }

    pub fn with_choices<I, S>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.choices = choices.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_input_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.input_prompt = Some(prompt.into());
        self
    }

    pub fn after_ms(mut self, delay_ms: u64) -> Self {
        self.reveal_after_ms = delay_ms;
        self
    }

    pub fn as_signup_offer(mut self) -> Self {
        self.signup_offer = true;
        self
    }
}

/// Which authentication screen the host should open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthAction {
    Login,
    CreateAccount,
}

impl fmt::Display for AuthAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Login => write!(f, "login"),
            Self::CreateAccount => write!(f, "create-account"),
        }
    }
}

/// Delegation out of the local script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Handoff {
    /// Free text is answered by the AI completion service.
    Ai,
    /// The visitor must log in or sign up; the host navigates away.
    Auth(AuthAction),
    /// A destination owned by the embedding page (matches, summary, advisor).
    Host(String),
}

/// Intent labels produced by the completion service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Intent {
    GetQuote,
    PreQual,
    StartApplication,
    UploadDoc,
    ExplainTerm,
    RequestHuman,
}

impl Intent {
    /// Parse a wire label. Unknown labels are treated as "no intent".
    pub fn from_wire(label: &str) -> Option<Self> {
        match label {
            "getQuote" => Some(Self::GetQuote),
            "preQual" => Some(Self::PreQual),
            "startApplication" => Some(Self::StartApplication),
            "uploadDoc" => Some(Self::UploadDoc),
            "explainTerm" => Some(Self::ExplainTerm),
            "requestHuman" => Some(Self::RequestHuman),
            _ => None,
        }
    }

    /// Intents that are followed by the signup offer.
    pub fn offers_signup(&self) -> bool {
        matches!(self, Self::GetQuote | Self::PreQual | Self::StartApplication)
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::GetQuote => "getQuote",
            Self::PreQual => "preQual",
            Self::StartApplication => "startApplication",
            Self::UploadDoc => "uploadDoc",
            Self::ExplainTerm => "explainTerm",
            Self::RequestHuman => "requestHuman",
        };
        write!(f, "{s}")
    }
}

/// The marketing page the visitor arrived from; selects greeting and first question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceType {
    Homeowners,
    FirstTime,
    Refinance,
    Investment,
    Compare,
    Purchase,
    HomeEquity,
    Calculator,
    Default,
}

impl ServiceType {
    pub fn slug(&self) -> &'static str {
        match self {
            Self::Homeowners => "homeowners",
            Self::FirstTime => "first-time",
            Self::Refinance => "refinance",
            Self::Investment => "investment",
            Self::Compare => "compare",
            Self::Purchase => "purchase",
            Self::HomeEquity => "home-equity",
            Self::Calculator => "calculator",
            Self::Default => "default",
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for ServiceType {
    type Err = FlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "homeowners" => Self::Homeowners,
            "first-time" => Self::FirstTime,
            "refinance" => Self::Refinance,
            "investment" => Self::Investment,
            "compare" => Self::Compare,
            "purchase" => Self::Purchase,
            "home-equity" => Self::HomeEquity,
            "calculator" => Self::Calculator,
            "default" => Self::Default,
            other => return Err(FlowError::UnknownFlow(other.to_string())),
        })
    }
}

/// The loan category a conversation belongs to. Doubles as the session key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "service", rename_all = "snake_case")]
pub enum FlowKind {
    /// Guest overlay: greeting, name collection, then AI conversation.
    Ellen(ServiceType),
    /// Full-page chat for a visitor whose name was collected beforehand.
    EllenNamed(ServiceType),
    FirstTimeBuyer,
    GovernmentBacked,
    Jumbo,
}

impl FlowKind {
    /// Key under which the conversation snapshot is persisted.
    pub fn storage_key(&self) -> String {
        match self {
            Self::Ellen(_) => "ellen_guest_session".to_string(),
            Self::EllenNamed(service) => format!("ellen_session_{service}"),
            Self::FirstTimeBuyer => "first_time_buyer_session".to_string(),
            Self::GovernmentBacked => "government_backed_session".to_string(),
            Self::Jumbo => "jumbo_session".to_string(),
        }
    }

    /// Storage key scoped to one visitor of a multi-visitor host.
    pub fn visitor_key(&self, visitor: &str) -> String {
        format!("{visitor}:{}", self.storage_key())
    }

    /// The opening messages address the visitor as `{{ firstName }}`, so the
    /// name must be known before the conversation starts.
    pub fn requires_first_name(&self) -> bool {
        matches!(
            self,
            Self::EllenNamed(_) | Self::GovernmentBacked | Self::Jumbo
        )
    }

    /// URL slug used by the HTTP routes and the CLI.
    pub fn slug(&self) -> String {
        match self {
            Self::Ellen(ServiceType::Default) => "ellen".to_string(),
            Self::Ellen(service) => format!("ellen-{service}"),
            Self::EllenNamed(service) => format!("ellen-named-{service}"),
            Self::FirstTimeBuyer => "first-time-buyer".to_string(),
            Self::GovernmentBacked => "government-backed".to_string(),
            Self::Jumbo => "jumbo".to_string(),
        }
    }

    /// Category label sent to the completion service.
    pub fn category(&self) -> String {
        match self {
            Self::Ellen(service) | Self::EllenNamed(service) => service.slug().to_string(),
            Self::FirstTimeBuyer => "first-time-buyer".to_string(),
            Self::GovernmentBacked => "government-backed".to_string(),
            Self::Jumbo => "jumbo".to_string(),
        }
    }
}

impl fmt::Display for FlowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.slug())
    }
}

impl FromStr for FlowKind {
    type Err = FlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ellen" => return Ok(Self::Ellen(ServiceType::Default)),
            "first-time-buyer" => return Ok(Self::FirstTimeBuyer),
            "government-backed" => return Ok(Self::GovernmentBacked),
            "jumbo" => return Ok(Self::Jumbo),
            _ => {}
        }
        if let Some(service) = s.strip_prefix("ellen-named-") {
            return service
                .parse()
                .map(Self::EllenNamed)
                .map_err(|_| FlowError::UnknownFlow(s.to_string()));
        }
        if let Some(service) = s.strip_prefix("ellen-") {
            return service
                .parse()
                .map(Self::Ellen)
                .map_err(|_| FlowError::UnknownFlow(s.to_string()));
        }
        Err(FlowError::UnknownFlow(s.to_string()))
    }
}
