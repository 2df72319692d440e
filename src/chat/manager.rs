//! ChatSession: the host shell around the engine.
//!
//! Runs `Engine::reduce` under a lock and executes the effects it returns:
//! snapshots go to the store, completions run on a tokio task, auth
//! hand-offs go to the host. At most one completion is in flight per session.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::engine::{Action, Effect, Engine, Rejection};
use super::model::{AuthAction, FlowKind, TranscriptEntry};
use super::state::{Conversation, SessionSnapshot, fields};
use crate::auth::AuthHandoff;
use crate::error::{Error, FlowError, LlmError, StoreError};
use crate::llm::{Completion, CompletionRequest, CompletionService};
use crate::scripts;
use crate::store::SessionStore;

/// The collaborators a session executes effects against.
#[derive(Clone)]
pub struct ChatDeps {
    pub store: Arc<dyn SessionStore>,
    pub completions: Arc<dyn CompletionService>,
    pub auth: Arc<dyn AuthHandoff>,
}

/// What one visitor action produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TurnOutcome {
    /// Entries appended to the transcript by this turn, in order.
    pub appended: Vec<TranscriptEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection: Option<Rejection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_action: Option<String>,
    /// An AI reply is still on its way.
    pub awaiting_completion: bool,
}

/// One conversation bound to its storage key.
pub struct ChatSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    key: String,
    engine: Engine,
    seed: BTreeMap<String, String>,
    conversation: RwLock<Conversation>,
    deps: ChatDeps,
    in_flight: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

struct Step {
    flow: FlowKind,
    appended: Vec<TranscriptEntry>,
    effects: Vec<Effect>,
    awaiting_completion: bool,
}

fn new_session_id() -> String {
    format!("guest_{}", Uuid::new_v4())
}

impl ChatSession {
    /// Restore the snapshot stored under the flow's key, or start fresh.
    ///
    /// A restored snapshot keeps its own flow; the guest overlay shares one
    /// key across service pages. Unreadable snapshots are logged and replaced.
    /// Flows that greet by name refuse a fresh start without `firstName`.
    pub async fn open(
        flow: FlowKind,
        seed: BTreeMap<String, String>,
        deps: ChatDeps,
    ) -> Result<Self, Error> {
        Self::open_keyed(flow.storage_key(), flow, seed, deps).await
    }

    /// Like [`open`](Self::open), but under an explicit storage key.
    pub async fn open_keyed(
        key: String,
        flow: FlowKind,
        seed: BTreeMap<String, String>,
        deps: ChatDeps,
    ) -> Result<Self, Error> {
        let restored = match deps.store.load(&key).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(key = %key, error = %e, "Ignoring unreadable session snapshot");
                None
            }
        };

        let table_flow = restored.as_ref().map_or(flow, |s| s.flow);
        let table = scripts::table_for(&table_flow);
        table.ensure_valid()?;
        let engine = Engine::new(Arc::new(table));

        let (conversation, fresh) = match restored {
            Some(snapshot) => {
                info!(
                    key = %key,
                    flow = %snapshot.flow,
                    entries = snapshot.transcript.len(),
                    step = %snapshot.state.current_step,
                    "Session restored"
                );
                (engine.resume(snapshot), false)
            }
            None => {
                let named = seed
                    .get(fields::FIRST_NAME)
                    .is_some_and(|name| !name.trim().is_empty());
                if table_flow.requires_first_name() && !named {
                    return Err(FlowError::MissingFirstName {
                        flow: table_flow.to_string(),
                    }
                    .into());
                }
                (engine.fresh(new_session_id(), seed.clone()), true)
            }
        };

        let session = Self {
            inner: Arc::new(SessionInner {
                key,
                engine,
                seed,
                conversation: RwLock::new(conversation),
                deps,
                in_flight: Mutex::new(None),
                closed: AtomicBool::new(false),
            }),
        };

        if fresh {
            session.inner.dispatch(Action::Start).await;
            info!(key = %session.inner.key, flow = %table_flow, "Session started");
        }
        Ok(session)
    }

    pub fn key(&self) -> &str {
        &self.inner.key
    }

    pub fn flow(&self) -> FlowKind {
        self.inner.engine.table().flow
    }

    /// The visitor pressed a button.
    pub async fn choose(&self, label: &str) -> TurnOutcome {
        self.inner.dispatch(Action::Choice(label.to_string())).await
    }

    /// The visitor submitted free text. An AI reply, if any, arrives later;
    /// see [`wait_idle`](Self::wait_idle).
    pub async fn send(&self, text: &str) -> TurnOutcome {
        self.inner.dispatch(Action::Text(text.to_string())).await
    }

    /// Like [`send`](Self::send), but waits for the AI reply and includes it.
    pub async fn send_and_wait(&self, text: &str) -> TurnOutcome {
        let before = self.inner.conversation.read().await.transcript.len();
        let mut outcome = self.send(text).await;
        if outcome.awaiting_completion {
            self.wait_idle().await;
            let conv = self.inner.conversation.read().await;
            outcome.appended = conv.transcript.get(before..).unwrap_or_default().to_vec();
            outcome.awaiting_completion = conv.pending.is_some();
        }
        outcome
    }

    /// The visitor came back from the auth screen.
    pub async fn auth_completed(&self) -> TurnOutcome {
        self.inner.dispatch(Action::AuthCompleted).await
    }

    /// Wait for the outstanding completion, if any, to be applied.
    pub async fn wait_idle(&self) {
        let handle = self.inner.in_flight.lock().await.take();
        let Some(handle) = handle else {
            return;
        };
        if let Err(e) = handle.await {
            if !e.is_cancelled() {
                warn!(key = %self.inner.key, error = %e, "Completion task failed");
            }
        }
    }

    /// Stop the session. An in-flight completion is aborted and any result
    /// that still arrives is dropped; later actions are ignored.
    pub async fn close(&self) {
        self.inner.closed.store(true, Ordering::Release);
        if let Some(handle) = self.inner.in_flight.lock().await.take() {
            handle.abort();
        }
        debug!(key = %self.inner.key, "Session closed");
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Delete the stored snapshot. The in-memory conversation is untouched.
    pub async fn clear(&self) -> Result<bool, StoreError> {
        self.inner.deps.store.clear(&self.inner.key).await
    }

    /// Start over: drop the snapshot and replay the opening messages.
    pub async fn reset(&self) -> Result<TurnOutcome, StoreError> {
        if let Some(handle) = self.inner.in_flight.lock().await.take() {
            handle.abort();
        }
        self.clear().await?;
        let mut conv = self.inner.conversation.write().await;
        let mut seed = self.inner.seed.clone();
        // A restored session may have been opened without a seed.
        if self.flow().requires_first_name() {
            if let Some(name) = conv.state.answer(fields::FIRST_NAME) {
                seed.entry(fields::FIRST_NAME.to_string())
                    .or_insert_with(|| name.to_string());
            }
        }
        *conv = self.inner.engine.fresh(new_session_id(), seed);
        drop(conv);
        info!(key = %self.inner.key, "Session reset");
        Ok(self.inner.dispatch(Action::Start).await)
    }

    pub async fn conversation(&self) -> Conversation {
        self.inner.conversation.read().await.clone()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.inner.conversation.read().await.snapshot(Utc::now())
    }
}

impl SessionInner {
    /// Reduce one action and persist if asked. Returns `None` once closed.
    ///
    /// The snapshot is saved while the write lock is held so saves land in
    /// the order the transitions happened.
    async fn step(&self, action: Action) -> Option<Step> {
        let mut conv = self.conversation.write().await;
        if self.closed.load(Ordering::Acquire) {
            return None;
        }

        let before = conv.transcript.len();
        let (next, effects) = self.engine.reduce(conv.clone(), action, Utc::now());
        *conv = next;

        if effects.iter().any(|e| matches!(e, Effect::Persist)) {
            let snapshot = conv.snapshot(Utc::now());
            if let Err(e) = self.deps.store.save(&self.key, &snapshot).await {
                warn!(key = %self.key, error = %e, "Failed to persist session");
            }
        }

        Some(Step {
            flow: conv.flow,
            appended: conv.transcript.get(before..).unwrap_or_default().to_vec(),
            effects,
            awaiting_completion: conv.pending.is_some(),
        })
    }

    async fn dispatch(self: &Arc<Self>, action: Action) -> TurnOutcome {
        let Some(step) = self.step(action).await else {
            debug!(key = %self.key, "Ignoring action on closed session");
            return TurnOutcome::default();
        };

        let mut outcome = TurnOutcome {
            appended: step.appended,
            awaiting_completion: step.awaiting_completion,
            ..Default::default()
        };

        for effect in step.effects {
            match effect {
                Effect::Persist => {}
                Effect::RequestCompletion { ticket, request } => {
                    self.spawn_completion(ticket, request).await;
                }
                Effect::RequireAuth(action) => {
                    self.deps.auth.require_auth(step.flow, action).await;
                    outcome.auth = Some(action);
                }
                Effect::HostAction(destination) => {
                    info!(key = %self.key, destination = %destination, "Host action");
                    outcome.host_action = Some(destination);
                }
                Effect::Rejected(rejection) => {
                    debug!(key = %self.key, reason = %rejection, "Action rejected");
                    outcome.rejection = Some(rejection);
                }
                Effect::Diagnostic(message) => {
                    warn!(key = %self.key, "{message}");
                }
            }
        }
        outcome
    }

    async fn spawn_completion(self: &Arc<Self>, ticket: u64, request: CompletionRequest) {
        let inner = Arc::clone(self);
        let handle = tokio::spawn(async move {
            debug!(key = %inner.key, ticket, service = inner.deps.completions.name(), "Requesting completion");
            let result = inner.deps.completions.complete(request).await;
            inner.finish_completion(ticket, result).await;
        });
        if let Some(previous) = self.in_flight.lock().await.replace(handle) {
            previous.abort();
        }
    }

    async fn finish_completion(&self, ticket: u64, result: Result<Completion, LlmError>) {
        let Some(step) = self.step(Action::CompletionReady { ticket, result }).await else {
            debug!(key = %self.key, ticket, "Session closed, dropping completion");
            return;
        };
        for effect in &step.effects {
            if let Effect::Diagnostic(message) = effect {
                debug!(key = %self.key, "{message}");
            }
        }
    }
}

/// Live sessions for a multi-visitor host, one per visitor and storage key.
pub struct SessionHub {
    deps: ChatDeps,
    sessions: RwLock<HashMap<String, Arc<ChatSession>>>,
}

impl SessionHub {
    pub fn new(deps: ChatDeps) -> Self {
        Self {
            deps,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// The live session for `visitor` on `flow`, opening it on first use.
    pub async fn session(
        &self,
        visitor: &str,
        flow: FlowKind,
        seed: BTreeMap<String, String>,
    ) -> Result<Arc<ChatSession>, Error> {
        let key = flow.visitor_key(visitor);
        if let Some(session) = self.sessions.read().await.get(&key) {
            return Ok(Arc::clone(session));
        }

        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get(&key) {
            return Ok(Arc::clone(session));
        }
        let session =
            Arc::new(ChatSession::open_keyed(key.clone(), flow, seed, self.deps.clone()).await?);
        sessions.insert(key, Arc::clone(&session));
        Ok(session)
    }

    /// Close the visitor's live session and delete its snapshot.
    pub async fn discard(&self, visitor: &str, flow: FlowKind) -> Result<bool, StoreError> {
        let key = flow.visitor_key(visitor);
        if let Some(session) = self.sessions.write().await.remove(&key) {
            session.close().await;
        }
        self.deps.store.clear(&key).await
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
