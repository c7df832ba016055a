use crate::auth::AuthContext;
use crate::constants::{profile::UNSPECIFIED, session::WELCOME_MESSAGE_ID};
use crate::context::Mode;
use crate::error::MentorError;
use crate::generator::ResponseGenerator;
use crate::session::{ChatMessage, ChatSession, Outbox, SessionKey, SessionRepository};
use crate::users::UserProfile;
use serde_json::json;
use std::path::{Path, PathBuf};

/// Where the active session is inside a single turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurnState {
    #[default]
    Idle,
    UserMessageAppended,
    Persisting,
    AwaitingModelResponse,
    ModelMessageAppended,
}

/// What one call to [`Conversation::send`] produced.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    /// Model text, or a diagnostic when every model failed.
    pub reply: String,
    /// Persistence problems hit during the turn; the transcript is kept regardless.
    pub warnings: Vec<String>,
}

/// The active chat: one session, its pending writes, and the turn state.
#[derive(Debug, Default)]
pub struct Conversation {
    session: ChatSession,
    outbox: Outbox,
    state: TurnState,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Continues a session loaded from the store.
    pub fn resume(session: ChatSession) -> Self {
        Self {
            session,
            ..Self::default()
        }
    }

    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn outbox(&self) -> &Outbox {
        &self.outbox
    }

    /// Switches to another session. Pending writes of the old one stay queued.
    pub fn switch_to(&mut self, session: ChatSession) {
        self.session = session;
        self.state = TurnState::Idle;
    }

    /// Starts a fresh draft.
    pub fn start_new(&mut self) {
        self.switch_to(ChatSession::new());
    }

    fn transition(&mut self, next: TurnState) {
        tracing::debug!("Turn {:?} -> {:?} ({})", self.state, next, self.session.key());
        self.state = next;
    }

    /// Appends the greeting to an empty session and saves it.
    ///
    /// Returns `None` when nothing was added.
    pub async fn greet(
        &mut self,
        auth: &AuthContext,
        repo: &SessionRepository,
    ) -> Option<Vec<String>> {
        let profile = auth.current()?;
        if !self.session.is_empty() {
            return None;
        }
        let text = welcome_text(profile);
        self.session
            .push(ChatMessage::model(text).with_id(WELCOME_MESSAGE_ID));

        let mut warnings = Vec::new();
        self.persist(auth, repo, &mut warnings).await;
        self.transition(TurnState::Idle);
        Some(warnings)
    }

    /// Runs one full turn: user message, save, generate, model message, save.
    pub async fn send(
        &mut self,
        auth: &AuthContext,
        repo: &SessionRepository,
        generator: &ResponseGenerator,
        text: &str,
    ) -> Result<TurnOutcome, MentorError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(MentorError::Other("message is empty".to_string()));
        }
        let mut warnings = Vec::new();
        self.flush(auth, repo, &mut warnings).await;

        let history = self.session.history();
        self.session.derive_title(text);
        self.session.push(ChatMessage::user(text));
        self.transition(TurnState::UserMessageAppended);
        self.persist(auth, repo, &mut warnings).await;

        self.transition(TurnState::AwaitingModelResponse);
        let reply = generator
            .respond(text, &history, auth.current(), Mode::Conversational)
            .await;

        self.session.push(ChatMessage::model(reply.clone()));
        self.transition(TurnState::ModelMessageAppended);
        self.persist(auth, repo, &mut warnings).await;
        self.transition(TurnState::Idle);

        Ok(TurnOutcome { reply, warnings })
    }

    /// Retries queued writes and re-saves the active session if it is dirty.
    pub async fn sync(&mut self, auth: &AuthContext, repo: &SessionRepository) -> Vec<String> {
        let mut warnings = Vec::new();
        self.flush(auth, repo, &mut warnings).await;
        if self.session.sync_state().is_dirty() && !self.outbox.contains(self.session.handle()) {
            self.persist(auth, repo, &mut warnings).await;
            self.transition(TurnState::Idle);
        }
        warnings
    }

    async fn flush(&mut self, auth: &AuthContext, repo: &SessionRepository, warnings: &mut Vec<String>) {
        if self.outbox.is_empty() {
            return;
        }
        let results = self.outbox.flush(repo, auth).await;
        if let Some(SessionKey::Persisted { remote_id }) =
            Outbox::take_key(&results, self.session.handle())
        {
            if let Some(user) = auth.current() {
                self.session.mark_persisted(remote_id, user.id.clone());
            }
        }
        if !self.outbox.is_empty() {
            warnings.push(format!("{} session(s) still waiting to be saved", self.outbox.len()));
        }
    }

    /// Anonymous chats are never saved.
    async fn persist(&mut self, auth: &AuthContext, repo: &SessionRepository, warnings: &mut Vec<String>) {
        if !auth.is_signed_in() {
            return;
        }
        self.transition(TurnState::Persisting);
        match repo.save(auth, &mut self.session).await {
            Ok(_) => self.outbox.acknowledge(self.session.handle()),
            Err(e) => {
                let message = e.to_string();
                self.outbox.record(&self.session, message.clone());
                warnings.push(format!("Sohbet kaydedilemedi: {message}"));
            }
        }
    }

    /// Transcript as pretty JSON: title, user, date and messages.
    pub fn export_json(&self, profile: Option<&UserProfile>) -> Result<String, MentorError> {
        let user = profile.map(|p| {
            let mut p = p.clone();
            p.password = None;
            p
        });
        let doc = json!({
            "title": self.session.title(),
            "user": user,
            "date": chrono::Local::now().format("%d.%m.%Y").to_string(),
            "messages": self.session.messages(),
        });
        Ok(serde_json::to_string_pretty(&doc)?)
    }

    /// Writes [`Self::export_json`] to `path`, or to [`Self::export_file_name`] in the working directory.
    pub fn export_to(
        &self,
        path: Option<&Path>,
        profile: Option<&UserProfile>,
    ) -> Result<PathBuf, MentorError> {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(self.export_file_name()));
        let json = self.export_json(profile)?;
        std::fs::write(&path, json)?;
        tracing::debug!("Exported {} to {}", self.session.key(), path.display());
        Ok(path)
    }

    pub fn export_file_name(&self) -> String {
        let title: String = self
            .session
            .title()
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        if title.is_empty() {
            "dto-sohbet-yedek.json".to_string()
        } else {
            format!("dto-sohbet-{title}.json")
        }
    }
}

/// Greeting shown at the top of a new session.
pub fn welcome_text(profile: &UserProfile) -> String {
    let marital = if profile.marital_status == UNSPECIFIED {
        String::new()
    } else {
        profile.marital_status.to_lowercase()
    };
    format!(
        "Merhaba {}. Ben DTÖ Danışmanın. Seninle {} hayatın, {} kariyerin veya genel \
tasarımların hakkında konuşabiliriz. Bugün zihnini meşgul eden konu nedir?",
        profile.name, marital, profile.job
    )
}
