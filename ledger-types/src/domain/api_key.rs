//! API key domain type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::account::UserId;
use super::caller::{Caller, Role};

uuid_id!(
    /// Unique identifier for an API key.
    ApiKeyId
);

/// A hashed API key bound to one user and role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKey {
    pub id: ApiKeyId,
    pub name: String,
    pub key_hash: String,
    pub user_id: UserId,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl ApiKey {
    pub fn new(name: String, key_hash: String, user_id: UserId, role: Role) -> Self {
        Self {
            id: ApiKeyId::new(),
            name,
            key_hash,
            user_id,
            role,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    /// The caller identity a request carrying this key acts as.
    pub fn caller(&self) -> Caller {
        Caller::new(self.user_id, self.role)
    }
}
