use crate::constants::session::{
    DEFAULT_TITLE, DRAFT_ID_THRESHOLD, TITLE_ELLIPSIS, TITLE_MAX_CHARS,
};
use crate::llm::{HistoryEntry, Role};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One message of a transcript. Never edited after creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub id: String,
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self::new(Role::Model, text)
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }
}

/// Identity of a session: either a client-side draft or a row the store knows about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SessionKey {
    Draft { local_id: String },
    Persisted { remote_id: String },
}

impl SessionKey {
    /// New draft key from the current time in milliseconds.
    pub fn draft() -> Self {
        SessionKey::Draft {
            local_id: Utc::now().timestamp_millis().to_string(),
        }
    }

    /// Interprets an id that arrived as a bare string.
    ///
    /// Client ids are millisecond timestamps and server ids are UUIDs, so
    /// anything shorter than the threshold is a draft.
    pub fn from_raw(id: impl Into<String>) -> Self {
        let id = id.into();
        if id.chars().count() < DRAFT_ID_THRESHOLD {
            SessionKey::Draft { local_id: id }
        } else {
            SessionKey::Persisted { remote_id: id }
        }
    }

    pub fn is_draft(&self) -> bool {
        matches!(self, SessionKey::Draft { .. })
    }

    pub fn remote_id(&self) -> Option<&str> {
        match self {
            SessionKey::Persisted { remote_id } => Some(remote_id),
            SessionKey::Draft { .. } => None,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            SessionKey::Draft { local_id } => local_id,
            SessionKey::Persisted { remote_id } => remote_id,
        }
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionKey::Draft { local_id } => write!(f, "draft:{local_id}"),
            SessionKey::Persisted { remote_id } => write!(f, "{remote_id}"),
        }
    }
}

/// Whether the local copy matches what was last written remotely.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SyncState {
    #[default]
    Clean,
    Dirty { attempts: u32, last_error: String },
}

impl SyncState {
    pub fn is_dirty(&self) -> bool {
        matches!(self, SyncState::Dirty { .. })
    }
}

/// One chat transcript owned by a single user.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatSession {
    pub(crate) key: SessionKey,
    handle: String,
    pub(crate) user_id: Option<String>,
    title: String,
    messages: Vec<ChatMessage>,
    pub(crate) last_updated: DateTime<Utc>,
    pub(crate) sync: SyncState,
}

impl ChatSession {
    /// Fresh draft with the default title.
    pub fn new() -> Self {
        Self {
            key: SessionKey::draft(),
            handle: uuid::Uuid::new_v4().to_string(),
            user_id: None,
            title: DEFAULT_TITLE.to_string(),
            messages: Vec::new(),
            last_updated: Utc::now(),
            sync: SyncState::Clean,
        }
    }

    /// Rebuilds a session that came back from the store.
    pub fn restored(
        remote_id: impl Into<String>,
        user_id: Option<String>,
        title: impl Into<String>,
        messages: Vec<ChatMessage>,
        last_updated: DateTime<Utc>,
    ) -> Self {
        let remote_id = remote_id.into();
        Self {
            handle: remote_id.clone(),
            key: SessionKey::Persisted { remote_id },
            user_id,
            title: title.into(),
            messages,
            last_updated,
            sync: SyncState::Clean,
        }
    }

    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    /// Stable client-side handle; survives the draft → persisted swap.
    pub fn handle(&self) -> &str {
        &self.handle
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    pub fn sync_state(&self) -> &SyncState {
        &self.sync
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn has_default_title(&self) -> bool {
        self.title == DEFAULT_TITLE
    }

    /// Appends a message; the only way the transcript grows.
    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
        self.last_updated = Utc::now();
    }

    /// Names the session after the first user message while it still has the default title.
    ///
    /// Must be called before the user message is appended; a welcome message
    /// may already be present, hence "at most one" message.
    pub fn derive_title(&mut self, first_user_text: &str) {
        if self.has_default_title() && self.messages.len() <= 1 {
            self.title = title_from_text(first_user_text);
        }
    }

    /// History in the shape the generator expects.
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.messages
            .iter()
            .map(|m| HistoryEntry::new(m.role, &m.text))
            .collect()
    }

    pub(crate) fn mark_persisted(&mut self, remote_id: String, user_id: String) {
        if let SessionKey::Draft { ref local_id } = self.key {
            tracing::info!("Session draft {} persisted as {}", local_id, remote_id);
        }
        self.key = SessionKey::Persisted { remote_id };
        self.user_id = Some(user_id);
        self.sync = SyncState::Clean;
    }

    pub(crate) fn mark_dirty(&mut self, error: &str) {
        let attempts = match self.sync {
            SyncState::Dirty { attempts, .. } => attempts + 1,
            SyncState::Clean => 1,
        };
        self.sync = SyncState::Dirty {
            attempts,
            last_error: error.to_string(),
        };
    }
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

/// First `TITLE_MAX_CHARS` characters, with an ellipsis when cut.
pub fn title_from_text(text: &str) -> String {
    if text.chars().count() > TITLE_MAX_CHARS {
        let head: String = text.chars().take(TITLE_MAX_CHARS).collect();
        format!("{head}{TITLE_ELLIPSIS}")
    } else {
        text.to_string()
    }
}
