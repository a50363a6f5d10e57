//! API key store port, consumed by the authentication layer.

use crate::domain::{ApiKey, Role, UserId};
use crate::error::RepoError;

#[async_trait::async_trait]
pub trait ApiKeyRepository: Send + Sync + 'static {
    /// Finds an active key by the SHA-256 hash of its raw value.
    async fn find_active_key(&self, key_hash: &str) -> Result<Option<ApiKey>, RepoError>;

    /// Issues a key; returns the stored record and the raw key, which is
    /// not persisted anywhere.
    async fn create_api_key(
        &self,
        name: &str,
        user_id: UserId,
        role: Role,
    ) -> Result<(ApiKey, String), RepoError>;

    async fn count_api_keys(&self) -> Result<i64, RepoError>;
}
