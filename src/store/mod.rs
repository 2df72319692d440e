//! Session persistence.
//!
//! Conversations are saved as JSON snapshots under their flow's storage key.
//! `LibSqlSessionStore` backs the CLI and server; `InMemorySessionStore`
//! serves tests.

pub mod libsql_backend;
pub mod memory;
pub mod migrations;
pub mod traits;

pub use libsql_backend::LibSqlSessionStore;
pub use memory::InMemorySessionStore;
pub use traits::SessionStore;
