//! First-run provisioning of a back office API key.

use ledger_types::{ApiKeyRepository, Role, UserId};

/// Issues a privileged key named `name` when the key store is empty and
/// returns the raw key, which is never stored.
///
/// Best effort: any failure is logged at `warn` and start-up carries on.
pub async fn ensure_privileged_key<R: ApiKeyRepository>(repo: &R, name: &str) -> Option<String> {
    let existing = match repo.count_api_keys().await {
        Ok(count) => count,
        Err(e) => {
            tracing::warn!(error = %e, "could not check for existing API keys");
            return None;
        }
    };

    if existing > 0 {
        tracing::debug!(existing, "API keys present, skipping bootstrap");
        return None;
    }

    match repo.create_api_key(name, UserId::new(), Role::Privileged).await {
        Ok((key, raw_key)) => {
            tracing::info!(key_id = %key.id, user_id = %key.user_id, "bootstrap key issued");
            Some(raw_key)
        }
        Err(e) => {
            tracing::warn!(error = %e, "could not issue bootstrap key");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use ledger_types::{ApiKey, RepoError};

    use super::*;

    /// Key store that records issued keys and can be told to fail.
    struct KeyStore {
        keys: Mutex<Vec<ApiKey>>,
        broken: bool,
    }

    impl KeyStore {
        fn new(broken: bool) -> Self {
            Self {
                keys: Mutex::new(Vec::new()),
                broken,
            }
        }
    }

    #[async_trait]
    impl ApiKeyRepository for KeyStore {
        async fn find_active_key(&self, _key_hash: &str) -> Result<Option<ApiKey>, RepoError> {
            Ok(None)
        }

        async fn create_api_key(
            &self,
            name: &str,
            user_id: UserId,
            role: Role,
        ) -> Result<(ApiKey, String), RepoError> {
            let key = ApiKey::new(name.to_string(), "hash".into(), user_id, role);
            self.keys.lock().unwrap().push(key.clone());
            Ok((key, "sk_raw".into()))
        }

        async fn count_api_keys(&self) -> Result<i64, RepoError> {
            if self.broken {
                return Err(RepoError::Database("connection refused".into()));
            }
            Ok(self.keys.lock().unwrap().len() as i64)
        }
    }

    #[tokio::test]
    async fn test_issues_privileged_key_on_empty_store() {
        let store = KeyStore::new(false);

        let raw = ensure_privileged_key(&store, "back-office").await;

        assert_eq!(raw.as_deref(), Some("sk_raw"));
        let keys = store.keys.lock().unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].role, Role::Privileged);
        assert_eq!(keys[0].name, "back-office");
    }

    #[tokio::test]
    async fn test_skips_when_keys_exist() {
        let store = KeyStore::new(false);
        ensure_privileged_key(&store, "first").await;

        assert!(ensure_privileged_key(&store, "second").await.is_none());
        assert_eq!(store.keys.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failure_is_not_fatal() {
        let store = KeyStore::new(true);
        assert!(ensure_privileged_key(&store, "back-office").await.is_none());
        assert!(store.keys.lock().unwrap().is_empty());
    }
}
