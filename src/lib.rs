//! Ellen, a guided mortgage chat engine.
//!
//! Scripted conversations per loan category, with free text handed to an AI
//! completion service and signup handed to the host's auth screens.

pub mod auth;
pub mod channels;
pub mod chat;
pub mod config;
pub mod error;
pub mod llm;
pub mod scripts;
pub mod store;
