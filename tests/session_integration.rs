//! Integration tests for `ChatSession`: effects executed against real
//! collaborators (libSQL on disk, a stub completion service, a recording
//! auth hand-off).

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio::time::timeout;

use ellen_chat::auth::RecordingAuthHandoff;
use ellen_chat::chat::state::{SessionSnapshot, fields};
use ellen_chat::chat::table::AI_FALLBACK_REPLY;
use ellen_chat::chat::{AuthAction, ChatDeps, ChatSession, FlowKind, Intent, Role, ServiceType};
use ellen_chat::error::{Error, FlowError, LlmError, StoreError};
use ellen_chat::llm::{Completion, CompletionRequest, CompletionService};
use ellen_chat::store::{InMemorySessionStore, LibSqlSessionStore, SessionStore};

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Stub completion service (no network). Replies with `reply`, or fails when
/// it is `None`. With a gate set, each call waits for the gate to open.
struct StubCompletions {
    reply: Option<Completion>,
    gate: Option<Arc<Notify>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl StubCompletions {
    fn replying(reply: Completion) -> Self {
        Self {
            reply: Some(reply),
            gate: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    fn failing() -> Self {
        Self {
            reply: None,
            gate: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    fn gated(reply: Completion, gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::replying(reply)
        }
    }

    fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionService for StubCompletions {
    fn name(&self) -> &str {
        "stub"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<Completion, LlmError> {
        self.requests.lock().unwrap().push(request);
        if let Some(ref gate) = self.gate {
            gate.notified().await;
        }
        self.reply.clone().ok_or_else(|| LlmError::BadStatus {
            service: "stub".to_string(),
            status: 503,
        })
    }
}

/// A store whose writes always fail.
struct BrokenStore;

#[async_trait]
impl SessionStore for BrokenStore {
    async fn save(&self, _key: &str, _snapshot: &SessionSnapshot) -> Result<(), StoreError> {
        Err(StoreError::Query("disk full".to_string()))
    }

    async fn load(&self, _key: &str) -> Result<Option<SessionSnapshot>, StoreError> {
        Err(StoreError::Connection("unreachable".to_string()))
    }

    async fn clear(&self, _key: &str) -> Result<bool, StoreError> {
        Ok(false)
    }
}

fn deps_with(
    store: Arc<dyn SessionStore>,
    completions: Arc<dyn CompletionService>,
) -> (ChatDeps, Arc<RecordingAuthHandoff>) {
    let auth = Arc::new(RecordingAuthHandoff::new());
    let deps = ChatDeps {
        store,
        completions,
        auth: auth.clone(),
    };
    (deps, auth)
}

fn jane() -> BTreeMap<String, String> {
    BTreeMap::from([(fields::FIRST_NAME.to_string(), "Jane".to_string())])
}

#[tokio::test]
async fn ai_reply_and_signup_offer_arrive_through_session() {
    timeout(TEST_TIMEOUT, async {
        let stub = Arc::new(StubCompletions::replying(Completion::new(
            "Rates start around 6.1% today.",
            Some(Intent::GetQuote),
        )));
        let (deps, _) = deps_with(Arc::new(InMemorySessionStore::new()), stub.clone());
        let session = ChatSession::open(FlowKind::EllenNamed(ServiceType::Purchase), jane(), deps)
            .await
            .unwrap();

        let outcome = session.send_and_wait("What rate can I get?").await;
        assert!(outcome.rejection.is_none());
        assert!(!outcome.awaiting_completion);
        assert_eq!(outcome.appended.len(), 3);
        assert_eq!(outcome.appended[0].role, Role::User);
        assert_eq!(outcome.appended[1].content, "Rates start around 6.1% today.");
        assert!(outcome.appended[2].signup_offer);

        let requests = stub.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].message, "What rate can I get?");
        assert_eq!(requests[0].context.category, "purchase");
        assert_eq!(requests[0].context.user_name.as_deref(), Some("Jane"));
        assert_eq!(requests[0].context.step, "conversation");
        assert!(requests[0].session_id.starts_with("guest_"));
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn ai_failure_falls_back_and_allows_retry() {
    timeout(TEST_TIMEOUT, async {
        let (deps, _) = deps_with(
            Arc::new(InMemorySessionStore::new()),
            Arc::new(StubCompletions::failing()),
        );
        let session = ChatSession::open(FlowKind::EllenNamed(ServiceType::Refinance), jane(), deps)
            .await
            .unwrap();

        let outcome = session.send_and_wait("Can I refinance?").await;
        assert_eq!(outcome.appended.len(), 2);
        assert_eq!(outcome.appended[1].content, AI_FALLBACK_REPLY);

        let conv = session.conversation().await;
        assert_eq!(conv.state.current_step, "conversation");
        assert!(conv.state.awaiting_free_text);

        let retry = session.send_and_wait("Can I refinance now?").await;
        assert!(retry.rejection.is_none());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn close_discards_late_completion() {
    timeout(TEST_TIMEOUT, async {
        let gate = Arc::new(Notify::new());
        let stub = Arc::new(StubCompletions::gated(
            Completion::new("too late", None),
            gate.clone(),
        ));
        let store = Arc::new(InMemorySessionStore::new());
        let (deps, _) = deps_with(store.clone(), stub);
        let session = ChatSession::open(FlowKind::EllenNamed(ServiceType::Default), jane(), deps)
            .await
            .unwrap();

        let outcome = session.send("Hello?").await;
        assert!(outcome.awaiting_completion);
        let len = session.conversation().await.transcript.len();
        let key = session.key().to_string();

        session.close().await;
        gate.notify_waiters();
        gate.notify_one();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let conv = session.conversation().await;
        assert_eq!(conv.transcript.len(), len);
        assert!(conv.transcript.iter().all(|e| e.content != "too late"));
        let saved = store.load(&key).await.unwrap().unwrap();
        assert_eq!(saved.transcript.len(), len);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn reload_during_ai_call_accepts_text_again() {
    timeout(TEST_TIMEOUT, async {
        let gate = Arc::new(Notify::new());
        let stub = Arc::new(StubCompletions::gated(
            Completion::new("never seen", None),
            gate,
        ));
        let store = Arc::new(InMemorySessionStore::new());
        let (deps, _) = deps_with(store.clone(), stub);
        let session = ChatSession::open(FlowKind::EllenNamed(ServiceType::Purchase), jane(), deps)
            .await
            .unwrap();

        assert!(session.send("What rate can I get?").await.awaiting_completion);
        session.close().await;
        let saved = store.load(session.key()).await.unwrap().unwrap();
        assert!(!saved.state.awaiting_free_text);

        let (deps, _) = deps_with(
            store.clone(),
            Arc::new(StubCompletions::replying(Completion::new("About 6%.", None))),
        );
        let reopened =
            ChatSession::open(FlowKind::EllenNamed(ServiceType::Purchase), BTreeMap::new(), deps)
                .await
                .unwrap();
        let conv = reopened.conversation().await;
        assert_eq!(conv.state.current_step, "conversation");
        assert!(conv.pending.is_none());
        assert!(conv.state.awaiting_free_text);
        assert!(reopened.snapshot().await.state.awaiting_free_text);

        let outcome = reopened.send_and_wait("What rate can I get?").await;
        assert!(outcome.rejection.is_none());
        assert_eq!(outcome.appended[1].content, "About 6%.");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn named_flow_needs_a_first_name_to_start() {
    let store = Arc::new(InMemorySessionStore::new());
    let (deps, _) = deps_with(store.clone(), Arc::new(StubCompletions::failing()));
    let result = ChatSession::open(
        FlowKind::EllenNamed(ServiceType::Purchase),
        BTreeMap::new(),
        deps.clone(),
    )
    .await;
    assert!(matches!(
        result,
        Err(Error::Flow(FlowError::MissingFirstName { .. }))
    ));
    assert!(store.is_empty().await);

    let session = ChatSession::open(FlowKind::EllenNamed(ServiceType::Purchase), jane(), deps)
        .await
        .unwrap();
    let greeting = &session.conversation().await.transcript[0].content;
    assert!(greeting.starts_with("Hi Jane! 😊"));
}

#[tokio::test]
async fn second_message_waits_for_the_first_reply() {
    timeout(TEST_TIMEOUT, async {
        let gate = Arc::new(Notify::new());
        let stub = Arc::new(StubCompletions::gated(
            Completion::new("Sure thing.", None),
            gate.clone(),
        ));
        let (deps, _) = deps_with(Arc::new(InMemorySessionStore::new()), stub.clone());
        let session = ChatSession::open(FlowKind::EllenNamed(ServiceType::Default), jane(), deps)
            .await
            .unwrap();

        assert!(session.send("one").await.awaiting_completion);
        let second = session.send("two").await;
        assert!(second.rejection.is_some());
        assert!(second.appended.is_empty());

        gate.notify_one();
        session.wait_idle().await;
        let conv = session.conversation().await;
        assert_eq!(conv.transcript.last().unwrap().content, "Sure thing.");
        assert_eq!(stub.requests().len(), 1);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn auth_hand_off_is_signalled_and_blocks_until_completed() {
    let (deps, auth) = deps_with(
        Arc::new(InMemorySessionStore::new()),
        Arc::new(StubCompletions::failing()),
    );
    let session = ChatSession::open(FlowKind::FirstTimeBuyer, BTreeMap::new(), deps)
        .await
        .unwrap();

    for label in ["Yes", "Still exploring", "No", "No", "No", "No", "Yes", "0-3 months", "Yes", "Yes"] {
        let outcome = session.choose(label).await;
        assert!(outcome.rejection.is_none(), "rejected at {label}");
    }
    let outcome = session.choose("Create Account").await;
    assert_eq!(outcome.auth, Some(AuthAction::CreateAccount));
    assert_eq!(
        auth.calls(),
        vec![(FlowKind::FirstTimeBuyer, AuthAction::CreateAccount)]
    );

    let blocked = session.send("hello").await;
    assert!(blocked.rejection.is_some());

    let back = session.auth_completed().await;
    assert!(back.rejection.is_none());
    assert!(session.conversation().await.handed_off.is_none());
}

#[tokio::test]
async fn store_failures_never_stop_the_conversation() {
    let (deps, _) = deps_with(Arc::new(BrokenStore), Arc::new(StubCompletions::failing()));
    let session = ChatSession::open(FlowKind::Jumbo, jane(), deps)
        .await
        .unwrap();

    let conv = session.conversation().await;
    assert!(!conv.transcript.is_empty());
    let choice = conv.open_choices()[0].clone();
    let outcome = session.choose(&choice).await;
    assert!(outcome.rejection.is_none());
    assert!(!outcome.appended.is_empty());
}

#[tokio::test]
async fn libsql_session_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("ellen.db");

    let before = {
        let store = Arc::new(LibSqlSessionStore::new_local(&path).await.unwrap());
        let (deps, _) = deps_with(store, Arc::new(StubCompletions::failing()));
        let session = ChatSession::open(FlowKind::FirstTimeBuyer, BTreeMap::new(), deps)
            .await
            .unwrap();
        session.choose("Yes").await;
        session.choose("Have a property").await;
        let conv = session.conversation().await;
        session.close().await;
        conv
    };
    assert!(path.exists());

    let store = Arc::new(LibSqlSessionStore::new_local(&path).await.unwrap());
    let (deps, _) = deps_with(store.clone(), Arc::new(StubCompletions::failing()));
    let session = ChatSession::open(FlowKind::FirstTimeBuyer, BTreeMap::new(), deps)
        .await
        .unwrap();
    let after = session.conversation().await;
    assert_eq!(after.transcript, before.transcript);
    assert_eq!(after.state.current_step, "property_type");
    assert_eq!(after.state.answer(fields::HAS_PROPERTY), Some("true"));

    // Picks up where it left off.
    let outcome = session.choose("Townhouse").await;
    assert!(outcome.rejection.is_none());

    assert!(session.clear().await.unwrap());
    assert!(store.load(session.key()).await.unwrap().is_none());
}
