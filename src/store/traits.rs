//! `SessionStore`: where conversation snapshots live between visits.

use async_trait::async_trait;

use crate::chat::state::SessionSnapshot;
use crate::error::StoreError;

/// Key-value persistence for session snapshots, keyed by
/// `FlowKind::storage_key`.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert or overwrite the snapshot under `key`.
    async fn save(&self, key: &str, snapshot: &SessionSnapshot) -> Result<(), StoreError>;

    async fn load(&self, key: &str) -> Result<Option<SessionSnapshot>, StoreError>;

    /// Delete the snapshot. Returns whether one existed.
    async fn clear(&self, key: &str) -> Result<bool, StoreError>;
}
