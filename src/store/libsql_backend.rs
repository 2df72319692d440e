//! libSQL session store. Supports local file and in-memory databases.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};

use super::migrations;
use super::traits::SessionStore;
use crate::chat::state::SessionSnapshot;
use crate::error::StoreError;

/// Snapshots are stored as JSON, one row per storage key.
///
/// A single connection is reused for all operations; `libsql::Connection`
/// is safe for concurrent async use.
pub struct LibSqlSessionStore {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlSessionStore {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Connection(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| StoreError::Connection(format!("Failed to open libSQL database: {e}")))?;

        let store = Self::from_database(db).await?;
        info!(path = %path.display(), "Session database opened");
        Ok(store)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, StoreError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                StoreError::Connection(format!("Failed to create in-memory database: {e}"))
            })?;
        Self::from_database(db).await
    }

    async fn from_database(db: LibSqlDatabase) -> Result<Self, StoreError> {
        let conn = db
            .connect()
            .map_err(|e| StoreError::Connection(format!("Failed to create connection: {e}")))?;
        migrations::run_migrations(&conn).await?;
        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }
}

#[async_trait]
impl SessionStore for LibSqlSessionStore {
    async fn save(&self, key: &str, snapshot: &SessionSnapshot) -> Result<(), StoreError> {
        let json = serde_json::to_string(snapshot)
            .map_err(|e| StoreError::Serialization(format!("Failed to encode snapshot: {e}")))?;
        let now = Utc::now().to_rfc3339();

        self.conn
            .execute(
                "INSERT INTO chat_sessions (key, snapshot, updated_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET
                    snapshot = excluded.snapshot,
                    updated_at = excluded.updated_at",
                params![key, json, now],
            )
            .await
            .map_err(|e| StoreError::Query(format!("Failed to save session {key}: {e}")))?;

        debug!(key, entries = snapshot.transcript.len(), "Session saved");
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Option<SessionSnapshot>, StoreError> {
        let mut rows = self
            .conn
            .query(
                "SELECT snapshot FROM chat_sessions WHERE key = ?1",
                params![key],
            )
            .await
            .map_err(|e| StoreError::Query(format!("Failed to load session {key}: {e}")))?;

        let Some(row) = rows
            .next()
            .await
            .map_err(|e| StoreError::Query(format!("Failed to read session {key}: {e}")))?
        else {
            return Ok(None);
        };

        let json: String = row
            .get(0)
            .map_err(|e| StoreError::Query(format!("Failed to read snapshot column: {e}")))?;
        let snapshot = serde_json::from_str(&json)
            .map_err(|e| StoreError::Serialization(format!("Corrupt snapshot for {key}: {e}")))?;
        Ok(Some(snapshot))
    }

    async fn clear(&self, key: &str) -> Result<bool, StoreError> {
        let affected = self
            .conn
            .execute("DELETE FROM chat_sessions WHERE key = ?1", params![key])
            .await
            .map_err(|e| StoreError::Query(format!("Failed to clear session {key}: {e}")))?;
        Ok(affected > 0)
    }
}
