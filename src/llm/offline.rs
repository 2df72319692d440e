//! Offline completion: canned replies and keyword intent detection.

use async_trait::async_trait;

use super::{Completion, CompletionRequest, CompletionService};
use crate::chat::model::Intent;
use crate::error::LlmError;

/// Keyword groups checked in order; the first group with a hit wins.
const INTENT_KEYWORDS: &[(Intent, &[&str])] = &[
    (Intent::GetQuote, &["quote", "rate", "payment", "calculate"]),
    (
        Intent::PreQual,
        &["qualify", "eligible", "pre-qual", "prequalify"],
    ),
    (Intent::StartApplication, &["apply", "application", "start"]),
    (Intent::UploadDoc, &["upload", "document", "doc"]),
    (
        Intent::ExplainTerm,
        &["explain", "what is", "what are", "help me understand"],
    ),
    (Intent::RequestHuman, &["talk", "human", "person", "agent"]),
];

/// Classify a visitor message by substring match on lowercase keywords.
pub fn detect_intent(message: &str) -> Option<Intent> {
    let lower = message.to_lowercase();
    INTENT_KEYWORDS
        .iter()
        .find(|(_, words)| words.iter().any(|w| lower.contains(w)))
        .map(|(intent, _)| *intent)
}

fn canned_reply(intent: Option<Intent>, name: Option<&str>) -> String {
    let who = name.map(|n| format!(", {n}")).unwrap_or_default();
    match intent {
        Some(Intent::GetQuote) => format!(
            "Happy to help with rates{who}! Rates depend on your credit, down payment and loan type, so I'll tailor an estimate once I know a little more."
        ),
        Some(Intent::PreQual) => format!(
            "Pre-qualifying is quick{who}. It looks at your income, debts and credit to estimate how much you could borrow."
        ),
        Some(Intent::StartApplication) => format!(
            "Let's get your application going{who}! I'll guide you through each section."
        ),
        Some(Intent::UploadDoc) => {
            "You can upload pay stubs, W-2s and bank statements from your dashboard once you have an account.".to_string()
        }
        Some(Intent::ExplainTerm) => {
            "Good question! I'll keep it simple. Which term would you like me to break down?".to_string()
        }
        Some(Intent::RequestHuman) => {
            "Of course. I can connect you with one of our mortgage advisors.".to_string()
        }
        None => format!("Thanks for sharing{who}! Tell me a bit more about what you're looking for."),
    }
}

/// Answers without any network access.
#[derive(Debug, Default)]
pub struct OfflineCompletionService;

impl OfflineCompletionService {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CompletionService for OfflineCompletionService {
    fn name(&self) -> &str {
        "offline"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<Completion, LlmError> {
        let intent = detect_intent(&request.message);
        tracing::debug!(intent = ?intent, category = %request.context.category, "Offline completion");
        Ok(Completion::new(
            canned_reply(intent, request.context.user_name.as_deref()),
            intent,
        ))
    }
}
