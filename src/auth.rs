//! Auth hand-off: the one-way jump to the login or signup screen.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::chat::model::{AuthAction, FlowKind};

/// Sends the visitor to authenticate. Nothing comes back to the engine; the
/// host calls `ChatSession::auth_completed` if the visitor returns.
#[async_trait]
pub trait AuthHandoff: Send + Sync {
    async fn require_auth(&self, flow: FlowKind, action: AuthAction);
}

/// Logs the hand-off. Used by hosts that surface it another way (the HTTP
/// response carries the action for the web front end).
#[derive(Debug, Default)]
pub struct LoggingAuthHandoff;

#[async_trait]
impl AuthHandoff for LoggingAuthHandoff {
    async fn require_auth(&self, flow: FlowKind, action: AuthAction) {
        tracing::info!(flow = %flow, action = %action, "Visitor must authenticate");
    }
}

/// Remembers every hand-off, in order.
#[derive(Debug, Default)]
pub struct RecordingAuthHandoff {
    calls: Mutex<Vec<(FlowKind, AuthAction)>>,
}

impl RecordingAuthHandoff {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<(FlowKind, AuthAction)> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl AuthHandoff for RecordingAuthHandoff {
    async fn require_auth(&self, flow: FlowKind, action: AuthAction) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((flow, action));
        }
    }
}
