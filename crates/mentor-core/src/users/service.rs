use crate::auth::AuthContext;
use crate::constants::tables;
use crate::error::{ErrorKind, MentorError};
use crate::session::SessionRepository;
use crate::store::{Query, Row, RowStore};
use crate::users::{UserProfile, UserSummary};
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;

/// Account operations against the `dto_users` table.
#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn RowStore>,
    sessions: SessionRepository,
}

impl UserService {
    pub fn new(store: Arc<dyn RowStore>) -> Self {
        Self {
            sessions: SessionRepository::new(store.clone()),
            store,
        }
    }

    /// Looks the user up by username and password. The username is normalised first.
    pub async fn login(&self, username: &str, password: &str) -> Result<UserProfile, MentorError> {
        let username = normalize_username(username);
        tracing::info!("Login attempt for: {}", username);
        let query = Query::new()
            .eq("username", username.as_str())
            .eq("password", password);

        let row = match self.store.select_single(tables::USERS, &query).await {
            Ok(row) => row,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(MentorError::NotFound("invalid username or password".to_string()))
            }
            Err(e) => {
                tracing::error!("Login lookup failed: {}", e);
                return Err(e);
            }
        };

        UserProfile::from_row(&Value::Object(row))
            .ok_or_else(|| MentorError::Store("user row without id".to_string()))
    }

    /// Re-reads the signed-in user's row; falls back to the snapshot when the store is unreachable.
    pub async fn refresh_profile(&self, auth: &AuthContext) -> Result<UserProfile, MentorError> {
        let current = auth.require_user()?;
        let query = Query::new().eq("id", current.id.as_str());

        match self.store.select_single(tables::USERS, &query).await {
            Ok(row) => Ok(UserProfile::from_row(&Value::Object(row)).unwrap_or_else(|| current.clone())),
            Err(e) => {
                tracing::warn!("Profile refresh failed, using local snapshot: {}", e);
                Ok(current.clone())
            }
        }
    }

    /// Writes the editable profile fields. Role is never sent.
    pub async fn save_profile(
        &self,
        auth: &AuthContext,
        profile: &UserProfile,
    ) -> Result<UserProfile, MentorError> {
        let current = auth.require_user()?;
        let mut patch = profile.profile_columns();
        patch.insert("updated_at".into(), Value::String(Utc::now().to_rfc3339()));

        let updated = self
            .store
            .update(tables::USERS, &Query::new().eq("id", current.id.as_str()), patch)
            .await?;
        if updated.is_empty() {
            return Err(MentorError::NotFound(format!("user {}", current.id)));
        }

        let mut merged = profile.clone();
        merged.id = current.id.clone();
        merged.username = current.username.clone();
        merged.role = current.role;
        merged.password = None;
        Ok(merged)
    }

    /// Every account, newest first, passwords included.
    pub async fn list_users(&self, auth: &AuthContext) -> Result<Vec<UserSummary>, MentorError> {
        auth.require_admin()?;
        let rows = self
            .store
            .select(tables::USERS, &Query::new().order_desc("created_at"))
            .await?;
        Ok(rows
            .into_iter()
            .filter_map(|row| UserSummary::from_row(&Value::Object(row)))
            .collect())
    }

    /// Creates a plain user; the username is normalised to lowercase without whitespace.
    pub async fn create_user(
        &self,
        auth: &AuthContext,
        username: &str,
        password: &str,
    ) -> Result<UserSummary, MentorError> {
        auth.require_admin()?;
        let username = normalize_username(username);
        if username.is_empty() || password.is_empty() {
            return Err(MentorError::Other(
                "username and password are required".to_string(),
            ));
        }

        let mut row = Row::new();
        row.insert("username".into(), Value::String(username.clone()));
        row.insert("password".into(), Value::String(password.to_string()));
        row.insert("role".into(), Value::String("user".into()));
        row.insert("full_name".into(), Value::String(username.clone()));

        let saved = self.store.insert(tables::USERS, row).await?;
        tracing::info!("Created user {}", username);
        UserSummary::from_row(&Value::Object(saved))
            .ok_or_else(|| MentorError::Store("insert returned no id".to_string()))
    }

    /// Deletes the user's sessions, then the user.
    pub async fn delete_user(&self, auth: &AuthContext, user_id: &str) -> Result<(), MentorError> {
        auth.require_admin()?;
        let sessions = self.sessions.delete_for_user(user_id).await?;
        let users = self
            .store
            .delete(tables::USERS, &Query::new().eq("id", user_id))
            .await?;
        tracing::info!(
            "Deleted user {} ({} user row, {} sessions)",
            user_id,
            users,
            sessions
        );
        if users == 0 {
            return Err(MentorError::NotFound(format!("user {user_id}")));
        }
        Ok(())
    }
}

pub fn normalize_username(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
}
