//! Scripted chat: the dialogue engine and the shell that hosts it.
//!
//! A conversation moves through a [`TransitionTable`] one visitor action at a
//! time. [`Engine::reduce`] computes each move without side effects;
//! [`ChatSession`] carries out the resulting effects.

pub mod engine;
pub mod manager;
pub mod model;
pub mod name;
pub mod routes;
pub mod state;
pub mod table;
pub mod template;

pub use engine::{Action, Effect, Engine, Rejection};
pub use manager::{ChatDeps, ChatSession, SessionHub, TurnOutcome};
pub use model::{
    AuthAction, FlowKind, Handoff, Intent, MessageSpec, Role, ServiceType, TranscriptEntry,
};
pub use routes::{ChatRouteState, chat_routes};
pub use state::{Conversation, FlowState, SessionSnapshot, StepId};
pub use table::TransitionTable;
