//! In-memory session store for tests and single-process hosts.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::traits::SessionStore;
use crate::chat::state::SessionSnapshot;
use crate::error::StoreError;

#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, SessionSnapshot>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn save(&self, key: &str, snapshot: &SessionSnapshot) -> Result<(), StoreError> {
        self.sessions
            .write()
            .await
            .insert(key.to_string(), snapshot.clone());
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Option<SessionSnapshot>, StoreError> {
        Ok(self.sessions.read().await.get(key).cloned())
    }

    async fn clear(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.sessions.write().await.remove(key).is_some())
    }
}
