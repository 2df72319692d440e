//! Scenario tests that drive the real scripts through the pure engine.
//!
//! No I/O: every test reduces actions at a fixed instant and inspects the
//! resulting conversation and effects.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use ellen_chat::chat::name::NAME_REPROMPT;
use ellen_chat::chat::state::fields;
use ellen_chat::chat::table::{AI_FALLBACK_REPLY, GUEST_CHOICE, SIGNUP_CHOICE};
use ellen_chat::chat::{
    Action, AuthAction, Conversation, Effect, Engine, FlowKind, Intent, Rejection, Role,
    ServiceType,
};
use ellen_chat::error::LlmError;
use ellen_chat::llm::Completion;
use ellen_chat::scripts;

fn at() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(1_750_000_000, 0).unwrap()
}

fn engine(flow: FlowKind) -> Engine {
    Engine::new(Arc::new(scripts::table_for(&flow)))
}

fn started(engine: &Engine, seed: BTreeMap<String, String>) -> Conversation {
    let conv = engine.fresh("guest_test", seed);
    engine.reduce(conv, Action::Start, at()).0
}

fn step(engine: &Engine, conv: Conversation, action: Action) -> (Conversation, Vec<Effect>) {
    engine.reduce(conv, action, at())
}

fn choice(label: &str) -> Action {
    Action::Choice(label.to_string())
}

fn text(value: &str) -> Action {
    Action::Text(value.to_string())
}

fn ticket_of(effects: &[Effect]) -> u64 {
    effects
        .iter()
        .find_map(|e| match e {
            Effect::RequestCompletion { ticket, .. } => Some(*ticket),
            _ => None,
        })
        .expect("completion requested")
}

// ── Name collection ─────────────────────────────────────────────────────

#[test]
fn guest_flow_collects_name_then_asks_service_question() {
    let engine = engine(FlowKind::Ellen(ServiceType::Refinance));
    let conv = started(&engine, BTreeMap::new());
    assert_eq!(conv.state.current_step, "greeting");
    assert!(conv.state.awaiting_free_text);

    let (conv, effects) = step(&engine, conv, text("Hi"));
    assert!(effects.contains(&Effect::Persist));
    assert_eq!(conv.transcript.last().unwrap().content, NAME_REPROMPT);
    assert_eq!(conv.state.current_step, "greeting");
    assert!(conv.state.answers.is_empty());

    let (conv, _) = step(&engine, conv, text("Jane Doe"));
    assert_eq!(conv.state.answer(fields::FIRST_NAME), Some("Jane"));
    assert_eq!(conv.state.answer(fields::LAST_NAME), Some("Doe"));
    assert_eq!(conv.state.current_step, "conversation");
    assert_eq!(
        conv.transcript.last().unwrap().content,
        "Nice to meet you, Jane! Are you hoping to lower your monthly payments or shorten your loan term?"
    );
    assert!(conv.state.awaiting_free_text);
}

#[test]
fn single_word_name_leaves_state_untouched() {
    let engine = engine(FlowKind::Ellen(ServiceType::Default));
    let conv = started(&engine, BTreeMap::new());
    let state_before = conv.state.clone();

    let (conv, _) = step(&engine, conv, text("John"));
    assert_eq!(conv.state, state_before);
}

#[test]
fn blank_text_is_rejected_without_change() {
    let engine = engine(FlowKind::Ellen(ServiceType::Default));
    let conv = started(&engine, BTreeMap::new());

    let (after, effects) = step(&engine, conv.clone(), text("   "));
    assert_eq!(after, conv);
    assert_eq!(effects, vec![Effect::Rejected(Rejection::EmptyText)]);
}

// ── First-time buyer ────────────────────────────────────────────────────

#[test]
fn first_time_buyer_yes_moves_to_property_interest() {
    let engine = engine(FlowKind::FirstTimeBuyer);
    let conv = started(&engine, BTreeMap::new());
    assert_eq!(conv.state.current_step, "welcome");
    let before = conv.transcript.len();

    let (conv, _) = step(&engine, conv, choice("Yes"));
    assert_eq!(conv.state.current_step, "property_interest");

    let appended = &conv.transcript[before..];
    assert_eq!(appended.len(), 3);
    assert_eq!(appended[0].role, Role::User);
    assert_eq!(appended[0].content, "Yes");
    assert_eq!(
        appended[1].content,
        "That's exciting! Buying your first home is a huge milestone. I'll walk you through each step — nice and easy."
    );
    assert!(appended[1].choices.is_empty());
    assert_eq!(appended[2].choices, ["Have a property", "Still exploring"]);
    assert!(appended[2].reveal_after_ms > 0);
    assert!(!conv.state.awaiting_free_text);
}

#[test]
fn choice_not_on_offer_is_a_no_op() {
    let engine = engine(FlowKind::FirstTimeBuyer);
    let conv = started(&engine, BTreeMap::new());

    let (after, effects) = step(&engine, conv.clone(), choice("Maybe"));
    assert_eq!(after, conv);
    assert_eq!(
        effects,
        vec![Effect::Rejected(Rejection::ChoiceNotOffered {
            label: "Maybe".to_string()
        })]
    );

    // A label offered earlier is no longer on offer once answered.
    let (conv, _) = step(&engine, conv, choice("Yes"));
    let (again, effects) = step(&engine, conv.clone(), choice("Yes"));
    assert_eq!(again, conv);
    assert!(matches!(
        effects.as_slice(),
        [Effect::Rejected(Rejection::ChoiceNotOffered { .. })]
    ));
}

fn first_time_buyer_script() -> Vec<Action> {
    vec![
        choice("Yes"),
        choice("Have a property"),
        choice("Condo"),
        choice("Yes"),
        text("350000"),
        choice("Yes"),
        text("10"),
        choice("No"),
        choice("3-6 months"),
        choice("Yes"),
        choice("Yes"),
        choice("Login"),
    ]
}

#[test]
fn first_time_buyer_walkthrough_captures_answers_and_hands_off() {
    let engine = engine(FlowKind::FirstTimeBuyer);
    let mut conv = started(&engine, BTreeMap::new());
    let mut last_effects = Vec::new();
    for action in first_time_buyer_script() {
        let (next, effects) = step(&engine, conv, action);
        assert!(
            !effects.iter().any(|e| matches!(e, Effect::Rejected(_))),
            "unexpected rejection: {effects:?}"
        );
        conv = next;
        last_effects = effects;
    }

    assert_eq!(conv.state.answer(fields::HAS_PROPERTY), Some("true"));
    assert_eq!(conv.state.answer(fields::PROPERTY_TYPE), Some("Condo"));
    assert_eq!(conv.state.answer(fields::BUDGET), Some("350000"));
    assert_eq!(conv.state.answer(fields::DOWN_PAYMENT_PERCENT), Some("10"));
    assert_eq!(conv.state.answer(fields::TIMELINE), Some("3-6 months"));
    assert_eq!(conv.state.current_step, "login_required");
    assert_eq!(conv.handed_off, Some(AuthAction::Login));
    assert!(last_effects.contains(&Effect::RequireAuth(AuthAction::Login)));

    // Scripting halts until the host reports the visitor is back.
    let (after, effects) = step(&engine, conv.clone(), choice("Create Account"));
    assert_eq!(after, conv);
    assert_eq!(
        effects,
        vec![Effect::Rejected(Rejection::HandedOff {
            action: AuthAction::Login
        })]
    );

    let (back, effects) = step(&engine, conv, Action::AuthCompleted);
    assert!(back.handed_off.is_none());
    assert_eq!(effects, vec![Effect::Persist]);
}

#[test]
fn replaying_the_same_actions_reproduces_the_transcript() {
    let engine = engine(FlowKind::FirstTimeBuyer);
    let play = || {
        let mut conv = started(&engine, BTreeMap::new());
        for action in first_time_buyer_script() {
            conv = step(&engine, conv, action).0;
        }
        conv
    };

    let first = play();
    let second = play();
    assert_eq!(first.transcript, second.transcript);
    assert_eq!(first.state, second.state);
}

#[test]
fn wrap_up_buttons_reach_host_destinations() {
    let engine = engine(FlowKind::FirstTimeBuyer);
    let mut conv = started(&engine, BTreeMap::new());
    for action in [
        choice("Yes"),
        choice("Still exploring"),
        choice("No"),
        choice("No"),
        choice("No"),
        choice("No"),
        choice("Yes"),
        choice("6+ months"),
        choice("No"),
        choice("No"),
    ] {
        conv = step(&engine, conv, action).0;
    }
    assert_eq!(conv.state.current_step, "wrap_up");

    let (conv, effects) = step(&engine, conv, choice("View My Matches"));
    assert_eq!(conv.state.current_step, "end");
    assert!(effects.contains(&Effect::HostAction("view-matches".to_string())));
}

// ── AI hand-off ─────────────────────────────────────────────────────────

fn named_conversation() -> (Engine, Conversation) {
    let engine = engine(FlowKind::EllenNamed(ServiceType::Purchase));
    let seed = BTreeMap::from([(fields::FIRST_NAME.to_string(), "Jane".to_string())]);
    let conv = started(&engine, seed);
    (engine, conv)
}

#[test]
fn named_greeting_uses_known_first_name() {
    let (_, conv) = named_conversation();
    assert!(conv.transcript[0].content.starts_with("Hi Jane! 😊 I'm Ellen"));
}

#[test]
fn ai_failure_appends_one_fallback_and_keeps_step() {
    let (engine, conv) = named_conversation();
    let (conv, effects) = step(&engine, conv, text("What rate could I get?"));
    let ticket = ticket_of(&effects);
    assert!(!conv.state.awaiting_free_text);

    let len = conv.transcript.len();
    let step_before = conv.state.current_step.clone();
    let failure = LlmError::Timeout {
        service: "http".to_string(),
        timeout: Duration::from_secs(30),
    };
    let (conv, _) = step(
        &engine,
        conv,
        Action::CompletionReady {
            ticket,
            result: Err(failure),
        },
    );

    assert_eq!(conv.transcript.len(), len + 1);
    assert_eq!(conv.transcript[len].content, AI_FALLBACK_REPLY);
    assert_eq!(conv.state.current_step, step_before);
    assert!(conv.state.awaiting_free_text);
}

#[test]
fn quote_intent_is_followed_by_signup_offer() {
    let (engine, conv) = named_conversation();
    let (conv, effects) = step(&engine, conv, text("What would my payment be?"));
    let ticket = ticket_of(&effects);

    let len = conv.transcript.len();
    let reply = Completion::new("Roughly $2,100 a month.", Some(Intent::GetQuote));
    let (conv, _) = step(
        &engine,
        conv,
        Action::CompletionReady {
            ticket,
            result: Ok(reply),
        },
    );

    assert_eq!(conv.transcript.len(), len + 2);
    assert_eq!(conv.transcript[len].content, "Roughly $2,100 a month.");
    let offer = &conv.transcript[len + 1];
    assert!(offer.signup_offer);
    assert_eq!(offer.choices, [SIGNUP_CHOICE, GUEST_CHOICE]);

    let (conv, effects) = step(&engine, conv, choice(SIGNUP_CHOICE));
    assert!(effects.contains(&Effect::RequireAuth(AuthAction::CreateAccount)));
    assert_eq!(conv.handed_off, Some(AuthAction::CreateAccount));
}

#[test]
fn text_while_waiting_on_ai_is_rejected() {
    let (engine, conv) = named_conversation();
    let (conv, _) = step(&engine, conv, text("first"));

    let (after, effects) = step(&engine, conv.clone(), text("second"));
    assert_eq!(after, conv);
    assert_eq!(effects, vec![Effect::Rejected(Rejection::HandoffInProgress)]);
}

#[test]
fn stale_ticket_does_not_touch_transcript() {
    let (engine, conv) = named_conversation();
    let (conv, effects) = step(&engine, conv, text("hello"));
    let ticket = ticket_of(&effects);

    let (after, _) = step(
        &engine,
        conv.clone(),
        Action::CompletionReady {
            ticket: ticket + 7,
            result: Ok(Completion::new("late", None)),
        },
    );
    assert_eq!(after, conv);
}
