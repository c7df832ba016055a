use crate::auth::AuthContext;
use crate::constants::tables;
use crate::error::MentorError;
use crate::session::{ChatMessage, ChatSession, SessionKey};
use crate::store::{Query, Row, RowStore};
use crate::users::model::id_string;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

/// Shape of a `dto_chat_sessions` row on the way back in.
#[derive(Debug, Deserialize)]
struct StoredSession {
    id: Value,
    #[serde(default)]
    user_id: Option<Value>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    messages: Option<Vec<ChatMessage>>,
    last_updated: DateTime<Utc>,
}

impl StoredSession {
    fn into_session(self) -> Option<ChatSession> {
        let id = id_string(&self.id)?;
        Some(ChatSession::restored(
            id,
            self.user_id.as_ref().and_then(id_string),
            self.title.unwrap_or_default(),
            self.messages.unwrap_or_default(),
            self.last_updated,
        ))
    }
}

/// Keeps chat sessions in the remote store in step with the local copies.
#[derive(Clone)]
pub struct SessionRepository {
    store: Arc<dyn RowStore>,
}

impl SessionRepository {
    pub fn new(store: Arc<dyn RowStore>) -> Self {
        Self { store }
    }

    fn payload(session: &ChatSession, user_id: &str, now: DateTime<Utc>) -> Result<Row, MentorError> {
        let mut row = Row::new();
        if let SessionKey::Persisted { ref remote_id } = session.key {
            row.insert("id".into(), Value::String(remote_id.clone()));
        }
        row.insert("user_id".into(), Value::String(user_id.to_string()));
        row.insert("title".into(), Value::String(session.title().to_string()));
        row.insert("messages".into(), serde_json::to_value(session.messages())?);
        row.insert("last_updated".into(), serde_json::to_value(now)?);
        Ok(row)
    }

    /// Upserts the session and returns its durable id.
    ///
    /// Drafts go out without an id so the store assigns one; the session's
    /// key is switched to that id before returning, so the next save updates
    /// the same row. On failure the session is marked dirty and left as is.
    pub async fn save(
        &self,
        auth: &AuthContext,
        session: &mut ChatSession,
    ) -> Result<String, MentorError> {
        let user = auth.require_user()?;
        let now = Utc::now();
        let row = Self::payload(session, &user.id, now)?;

        let saved = match self.store.upsert(tables::SESSIONS, row).await {
            Ok(saved) => saved,
            Err(e) => {
                tracing::warn!("Saving session {} failed: {}", session.key, e);
                session.mark_dirty(&e.to_string());
                return Err(e);
            }
        };

        let remote_id = saved
            .get("id")
            .and_then(id_string)
            .ok_or_else(|| MentorError::Store("upsert returned no id".to_string()))?;

        session.last_updated = now;
        session.mark_persisted(remote_id.clone(), user.id.clone());
        Ok(remote_id)
    }

    /// The signed-in user's sessions, most recently updated first.
    pub async fn list(&self, auth: &AuthContext) -> Result<Vec<ChatSession>, MentorError> {
        let user = auth.require_user()?;
        let query = Query::new()
            .eq("user_id", user.id.as_str())
            .order_desc("last_updated");
        let rows = self.store.select(tables::SESSIONS, &query).await?;

        let mut sessions = Vec::with_capacity(rows.len());
        for row in rows {
            match Self::from_row(row) {
                Ok(session) => sessions.push(session),
                Err(e) => tracing::warn!("Skipping unreadable session row: {}", e),
            }
        }
        Ok(sessions)
    }

    /// Fetches one session. Draft ids never exist remotely, so they resolve to `None`.
    pub async fn get(&self, id: &str) -> Result<Option<ChatSession>, MentorError> {
        if SessionKey::from_raw(id).is_draft() {
            return Ok(None);
        }
        let rows = self
            .store
            .select(tables::SESSIONS, &Query::new().eq("id", id))
            .await?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(Self::from_row(row)?)),
            None => Ok(None),
        }
    }

    /// Removes a single session row.
    pub async fn delete(&self, id: &str) -> Result<usize, MentorError> {
        if SessionKey::from_raw(id).is_draft() {
            return Ok(0);
        }
        let removed = self
            .store
            .delete(tables::SESSIONS, &Query::new().eq("id", id))
            .await?;
        tracing::info!("Deleted session {} ({} row)", id, removed);
        Ok(removed)
    }

    /// Removes every session owned by `user_id`.
    pub async fn delete_for_user(&self, user_id: &str) -> Result<usize, MentorError> {
        self.store
            .delete(tables::SESSIONS, &Query::new().eq("user_id", user_id))
            .await
    }

    fn from_row(row: Row) -> Result<ChatSession, MentorError> {
        let stored: StoredSession = serde_json::from_value(Value::Object(row))?;
        stored
            .into_session()
            .ok_or_else(|| MentorError::Store("session row without id".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::users::UserProfile;

    fn auth() -> AuthContext {
        AuthContext::signed_in(UserProfile {
            id: "user-1".into(),
            username: "ahmet".into(),
            ..Default::default()
        })
    }

    #[test]
    fn test_draft_payload_has_no_id() {
        let session = ChatSession::new();
        let row = SessionRepository::payload(&session, "u", Utc::now()).unwrap();
        assert!(!row.contains_key("id"));
        assert_eq!(row["user_id"], "u");
    }

    #[test]
    fn test_persisted_payload_keeps_id() {
        let session = ChatSession::restored("0f8fad5b-d9cb-469f-a165-70867728950e", None, "t", vec![], Utc::now());
        let row = SessionRepository::payload(&session, "u", Utc::now()).unwrap();
        assert_eq!(row["id"], "0f8fad5b-d9cb-469f-a165-70867728950e");
    }

    #[tokio::test]
    async fn test_save_requires_login() {
        let repo = SessionRepository::new(Arc::new(MemoryStore::new()));
        let mut session = ChatSession::new();
        let err = repo
            .save(&AuthContext::anonymous(), &mut session)
            .await
            .unwrap_err();
        assert!(matches!(err, MentorError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_get_draft_id_is_none() {
        let repo = SessionRepository::new(Arc::new(MemoryStore::new()));
        assert!(repo.get("1718000000000").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_stamps_owner() {
        let repo = SessionRepository::new(Arc::new(MemoryStore::new()));
        let mut session = ChatSession::new();
        session.push(ChatMessage::user("merhaba"));

        repo.save(&auth(), &mut session).await.unwrap();
        assert_eq!(session.user_id(), Some("user-1"));
    }
}
