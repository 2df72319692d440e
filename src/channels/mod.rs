//! Presentation channels that host a chat session.

pub mod cli;

pub use cli::{CliChannel, CliInput};
