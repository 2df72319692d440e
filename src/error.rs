//! Error types for the Ellen chat engine.

use std::time::Duration;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Flow error: {0}")]
    Flow(#[from] FlowError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Session persistence errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// AI completion service errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Completion service {service} request failed: {reason}")]
    RequestFailed { service: String, reason: String },

    #[error("Completion service {service} returned status {status}")]
    BadStatus { service: String, status: u16 },

    #[error("Completion service {service} timed out after {timeout:?}")]
    Timeout { service: String, timeout: Duration },

    #[error("Invalid response from {service}: {reason}")]
    InvalidResponse { service: String, reason: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Script and flow lookup errors.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error("Unknown flow: {0}")]
    UnknownFlow(String),

    #[error("Flow {flow} greets by name; a first name is required")]
    MissingFirstName { flow: String },

    #[error("Transition table for {flow} has {count} dead end(s): {first}")]
    DeadEnds {
        flow: String,
        count: usize,
        first: String,
    },
}

/// Terminal and other presentation channel errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel {name} failed to read input: {reason}")]
    ReadFailed { name: String, reason: String },
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;
