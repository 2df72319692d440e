//! Completion service backed by the mortgage backend's guest chat endpoint.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::{Completion, CompletionRequest, CompletionService};
use crate::chat::model::Intent;
use crate::error::LlmError;

const SERVICE: &str = "http";

/// Request body expected by `POST /api/chat/guest`.
#[derive(Debug, Serialize)]
struct GuestChatBody<'a> {
    message: &'a str,
    session_id: &'a str,
    use_primary: bool,
    context: GuestChatContext<'a>,
}

#[derive(Debug, Serialize)]
struct GuestChatContext<'a> {
    service_type: &'a str,
    user_name: &'a str,
    stage: &'a str,
}

/// Response body; other fields (confidence, suggestions) are ignored.
#[derive(Debug, Deserialize)]
struct GuestChatReply {
    message: String,
    #[serde(default)]
    intent: Option<String>,
}

/// Posts free-text turns to the backend and reads back `{message, intent}`.
pub struct HttpCompletionService {
    client: reqwest::Client,
    endpoint: reqwest::Url,
    token: Option<SecretString>,
    use_primary: bool,
    timeout: Duration,
}

impl HttpCompletionService {
    pub fn new(
        endpoint: reqwest::Url,
        token: Option<SecretString>,
        use_primary: bool,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::RequestFailed {
                service: SERVICE.to_string(),
                reason: format!("Failed to build HTTP client: {}", e),
            })?;
        Ok(Self {
            client,
            endpoint,
            token,
            use_primary,
            timeout,
        })
    }
}

#[async_trait]
impl CompletionService for HttpCompletionService {
    fn name(&self) -> &str {
        SERVICE
    }

    async fn complete(&self, request: CompletionRequest) -> Result<Completion, LlmError> {
        let body = GuestChatBody {
            message: &request.message,
            session_id: &request.session_id,
            use_primary: self.use_primary,
            context: GuestChatContext {
                service_type: &request.context.category,
                user_name: request.context.user_name.as_deref().unwrap_or_default(),
                stage: &request.context.step,
            },
        };

        let mut builder = self.client.post(self.endpoint.clone()).json(&body);
        if let Some(ref token) = self.token {
            builder = builder.bearer_auth(token.expose_secret());
        }

        let resp = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout {
                    service: SERVICE.to_string(),
                    timeout: self.timeout,
                }
            } else {
                LlmError::RequestFailed {
                    service: SERVICE.to_string(),
                    reason: e.to_string(),
                }
            }
        })?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            tracing::warn!(status = %status, detail = %detail, "Guest chat request rejected");
            return Err(LlmError::BadStatus {
                service: SERVICE.to_string(),
                status: status.as_u16(),
            });
        }

        let text = resp.text().await.map_err(|e| LlmError::InvalidResponse {
            service: SERVICE.to_string(),
            reason: e.to_string(),
        })?;
        parse_reply(&text)
    }
}

fn parse_reply(body: &str) -> Result<Completion, LlmError> {
    let reply: GuestChatReply = serde_json::from_str(body)?;
    if reply.message.trim().is_empty() {
        return Err(LlmError::InvalidResponse {
            service: SERVICE.to_string(),
            reason: "empty message".to_string(),
        });
    }
    let intent = reply.intent.as_deref().and_then(Intent::from_wire);
    Ok(Completion::new(reply.message, intent))
}
