use crate::auth::AuthContext;
use crate::constants::tables;
use crate::error::{ErrorKind, MentorError};
use crate::store::{Query, Row, RowStore};
use serde_json::Value;
use std::sync::Arc;

/// Key/value settings shared by all users (`dto_config`), managed by admins.
#[derive(Clone)]
pub struct RemoteConfig {
    store: Arc<dyn RowStore>,
}

impl RemoteConfig {
    pub fn new(store: Arc<dyn RowStore>) -> Self {
        Self { store }
    }

    async fn read(&self, key: &str) -> Result<Option<String>, MentorError> {
        let rows = self
            .store
            .select(tables::CONFIG, &Query::new().eq("key", key).limit(1))
            .await?;
        Ok(rows
            .first()
            .and_then(|row| row.get("value"))
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .filter(|v| !v.trim().is_empty()))
    }

    pub async fn get(&self, auth: &AuthContext, key: &str) -> Result<Option<String>, MentorError> {
        auth.require_admin()?;
        self.read(key).await
    }

    pub async fn set(&self, auth: &AuthContext, key: &str, value: &str) -> Result<(), MentorError> {
        auth.require_admin()?;
        let patch = {
            let mut row = Row::new();
            row.insert("value".into(), Value::String(value.trim().to_string()));
            row
        };
        let updated = self
            .store
            .update(tables::CONFIG, &Query::new().eq("key", key), patch.clone())
            .await?;

        if updated.is_empty() {
            let mut row = patch;
            row.insert("key".into(), Value::String(key.to_string()));
            self.store.insert(tables::CONFIG, row).await?;
        }
        tracing::info!("Config key {} updated", key);
        Ok(())
    }

    /// Service-level read of the shared generation credential.
    ///
    /// Store failures are reported as "no key" so the generator can produce a
    /// single missing-credential diagnostic.
    pub(crate) async fn shared_api_key(&self) -> Option<String> {
        match self.read(tables::SHARED_API_KEY).await {
            Ok(key) => key,
            Err(e) => {
                if e.kind() != ErrorKind::NotFound {
                    tracing::warn!("Could not read shared API key: {}", e);
                }
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::users::{UserProfile, UserRole};

    fn admin() -> AuthContext {
        AuthContext::signed_in(UserProfile {
            id: "a".into(),
            role: UserRole::Admin,
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let config = RemoteConfig::new(Arc::new(MemoryStore::new()));
        config.set(&admin(), "gemini_api_key", " k1 ").await.unwrap();
        config.set(&admin(), "gemini_api_key", "k2").await.unwrap();

        assert_eq!(config.get(&admin(), "gemini_api_key").await.unwrap().as_deref(), Some("k2"));
        assert_eq!(config.shared_api_key().await.as_deref(), Some("k2"));
    }

    #[tokio::test]
    async fn test_non_admin_rejected() {
        let config = RemoteConfig::new(Arc::new(MemoryStore::new()));
        let user = AuthContext::signed_in(UserProfile::default());
        assert!(config.get(&user, "x").await.is_err());
        assert!(config.set(&user, "x", "y").await.is_err());
    }

    #[tokio::test]
    async fn test_blank_value_reads_as_none() {
        let config = RemoteConfig::new(Arc::new(MemoryStore::new()));
        config.set(&admin(), "gemini_api_key", "   ").await.unwrap();
        assert!(config.shared_api_key().await.is_none());
    }
}
