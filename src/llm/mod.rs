//! AI completion for free-text turns.
//!
//! Supports:
//! - **HTTP**: the backend's guest chat endpoint (`POST /api/chat/guest`)
//! - **Offline**: a canned reply with keyword intent detection, used when no
//!   backend is configured
//!
//! The engine never calls a service directly; it emits a
//! [`CompletionRequest`] and the host shell runs it through a
//! [`CompletionService`].

mod http;
mod offline;

pub use http::HttpCompletionService;
pub use offline::{OfflineCompletionService, detect_intent};

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::chat::model::Intent;
use crate::config::ChatConfig;
use crate::error::{Error, LlmError};

/// Conversation context sent alongside the visitor's message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionContext {
    /// Loan category, e.g. `refinance` or `jumbo`.
    pub category: String,
    pub user_name: Option<String>,
    pub step: String,
}

/// One free-text turn to be answered by the completion service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub message: String,
    pub session_id: String,
    pub context: CompletionContext,
    /// Answers captured so far in the conversation.
    pub answers: BTreeMap<String, String>,
}

/// The service's reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    pub message: String,
    pub intent: Option<Intent>,
}

impl Completion {
    pub fn new(message: impl Into<String>, intent: Option<Intent>) -> Self {
        Self {
            message: message.into(),
            intent,
        }
    }
}

/// Answers free-text messages. Failures are recovered by the engine with a
/// fixed fallback reply.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    async fn complete(&self, request: CompletionRequest) -> Result<Completion, LlmError>;
}

/// Create the completion service selected by configuration.
pub fn create_service(config: &ChatConfig) -> Result<Arc<dyn CompletionService>, Error> {
    let endpoint = config.chat_endpoint()?;

    match endpoint {
        Some(url) => {
            tracing::info!("Using backend completion service ({})", url);
            Ok(Arc::new(HttpCompletionService::new(
                url,
                config.backend_token.clone(),
                config.use_primary_model,
                config.request_timeout,
            )?))
        }
        None => {
            tracing::info!("No backend configured, using offline completion service");
            Ok(Arc::new(OfflineCompletionService::new()))
        }
    }
}
