use mentor_core::constants::tables;
use mentor_core::llm::GenerateRequest;
use mentor_core::store::{Query, Row};
use mentor_core::{
    AuthContext, ChatMessage, ChatSession, Conversation, ErrorKind, FallbackChain, MemoryStore,
    MentorError, ResponseGenerator, Role, RowStore, SessionRepository, TextGenerator, TurnState,
    UserProfile, UserRole, UserService,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Memory store whose writes can be switched off to simulate an outage.
struct FlakyStore {
    inner: MemoryStore,
    offline: AtomicBool,
}

impl FlakyStore {
    fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            offline: AtomicBool::new(false),
        }
    }

    fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), MentorError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(MentorError::api(503, "Service Unavailable"))
        } else {
            Ok(())
        }
    }
}

#[async_trait::async_trait]
impl RowStore for FlakyStore {
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Row>, MentorError> {
        self.inner.select(table, query).await
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Row, MentorError> {
        self.check()?;
        self.inner.insert(table, row).await
    }

    async fn upsert(&self, table: &str, row: Row) -> Result<Row, MentorError> {
        self.check()?;
        self.inner.upsert(table, row).await
    }

    async fn update(&self, table: &str, query: &Query, patch: Row) -> Result<Vec<Row>, MentorError> {
        self.check()?;
        self.inner.update(table, query, patch).await
    }

    async fn delete(&self, table: &str, query: &Query) -> Result<usize, MentorError> {
        self.check()?;
        self.inner.delete(table, query).await
    }
}

/// Answers by echoing the prompt back.
struct EchoGenerator;

#[async_trait::async_trait]
impl TextGenerator for EchoGenerator {
    async fn generate(
        &self,
        _api_key: &str,
        _model: &str,
        request: &GenerateRequest,
    ) -> Result<String, MentorError> {
        let last = request.contents.last().map(|c| c.text()).unwrap_or_default();
        Ok(format!("Cevap: {last}"))
    }
}

fn echo_generator() -> ResponseGenerator {
    ResponseGenerator::new(Arc::new(EchoGenerator), FallbackChain::default())
        .with_env_override(Some("test-key".into()))
}

fn user(id: &str) -> AuthContext {
    AuthContext::signed_in(UserProfile {
        id: id.into(),
        username: id.into(),
        name: "Ayşe".into(),
        marital_status: "Evli".into(),
        job: "Doktor".into(),
        ..Default::default()
    })
}

fn admin() -> AuthContext {
    AuthContext::signed_in(UserProfile {
        id: "admin-1".into(),
        username: "admin".into(),
        role: UserRole::Admin,
        ..Default::default()
    })
}

// ========================================================================
// Reconciler
// ========================================================================

#[tokio::test]
async fn test_first_save_assigns_durable_id_and_second_save_updates() {
    let store = Arc::new(MemoryStore::new());
    let repo = SessionRepository::new(store.clone());
    let auth = user("u-1");

    let mut session = ChatSession::new();
    assert!(session.key().is_draft());
    session.push(ChatMessage::user("Merhaba"));

    let id = repo.save(&auth, &mut session).await.unwrap();
    assert!(!session.key().is_draft());
    assert_eq!(session.key().remote_id(), Some(id.as_str()));

    session.push(ChatMessage::model("Merhaba, nasılsın?"));
    let second = repo.save(&auth, &mut session).await.unwrap();

    assert_eq!(second, id);
    assert_eq!(store.count(tables::SESSIONS).await, 1);
    let stored = repo.get(&id).await.unwrap().unwrap();
    assert_eq!(stored.messages().len(), 2);
}

#[tokio::test]
async fn test_round_trip_keeps_messages_and_timestamps() {
    let store = Arc::new(MemoryStore::new());
    let repo = SessionRepository::new(store);
    let auth = user("u-1");

    let mut session = ChatSession::new();
    for i in 0..7 {
        let message = if i % 2 == 0 {
            ChatMessage::user(format!("soru {i}"))
        } else {
            ChatMessage::model(format!("cevap {i}"))
        };
        session.push(message);
    }
    let id = repo.save(&auth, &mut session).await.unwrap();

    let loaded = repo.get(&id).await.unwrap().unwrap();
    assert_eq!(loaded.messages().len(), 7);
    for (original, restored) in session.messages().iter().zip(loaded.messages()) {
        assert_eq!(original.role, restored.role);
        assert_eq!(original.text, restored.text);
        assert_eq!(
            original.timestamp.timestamp_millis(),
            restored.timestamp.timestamp_millis()
        );
    }
}

#[tokio::test]
async fn test_list_is_per_user_and_newest_first() {
    let store = Arc::new(MemoryStore::new());
    let repo = SessionRepository::new(store);
    let alice = user("alice");
    let bob = user("bob");

    let mut older = ChatSession::new();
    older.derive_title("eski");
    repo.save(&alice, &mut older).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let mut newer = ChatSession::new();
    newer.derive_title("yeni");
    repo.save(&alice, &mut newer).await.unwrap();
    let mut other = ChatSession::new();
    repo.save(&bob, &mut other).await.unwrap();

    let sessions = repo.list(&alice).await.unwrap();
    let titles: Vec<&str> = sessions.iter().map(|s| s.title()).collect();
    assert_eq!(titles, vec!["yeni", "eski"]);
}

#[tokio::test]
async fn test_list_requires_login() {
    let repo = SessionRepository::new(Arc::new(MemoryStore::new()));
    let err = repo.list(&AuthContext::anonymous()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Auth);
}

#[tokio::test]
async fn test_draft_ids_are_never_looked_up() {
    let repo = SessionRepository::new(Arc::new(MemoryStore::new()));
    assert!(repo.get("1718000000000").await.unwrap().is_none());
    assert_eq!(repo.delete("1718000000000").await.unwrap(), 0);
}

#[tokio::test]
async fn test_delete_removes_only_that_session() {
    let store = Arc::new(MemoryStore::new());
    let repo = SessionRepository::new(store.clone());
    let auth = user("u-1");

    let mut keep = ChatSession::new();
    let mut gone = ChatSession::new();
    repo.save(&auth, &mut keep).await.unwrap();
    let id = repo.save(&auth, &mut gone).await.unwrap();

    assert_eq!(repo.delete(&id).await.unwrap(), 1);
    assert_eq!(store.count(tables::SESSIONS).await, 1);
    assert!(repo.get(&id).await.unwrap().is_none());
}

// ========================================================================
// Users
// ========================================================================

#[tokio::test]
async fn test_cascade_delete_leaves_nothing_behind() {
    let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());
    let users = UserService::new(store.clone());
    let repo = SessionRepository::new(store.clone());

    let created = users
        .create_user(&admin(), " Ali Veli ", "sifre")
        .await
        .unwrap();
    assert_eq!(created.username, "aliveli");
    assert_eq!(created.role, UserRole::User);

    let owner = users.login("aliveli", "sifre").await.unwrap();
    let auth = AuthContext::signed_in(owner.clone());
    for _ in 0..3 {
        let mut session = ChatSession::new();
        session.push(ChatMessage::user("selam"));
        repo.save(&auth, &mut session).await.unwrap();
    }
    assert_eq!(repo.list(&auth).await.unwrap().len(), 3);

    users.delete_user(&admin(), &owner.id).await.unwrap();

    assert!(repo.list(&auth).await.unwrap().is_empty());
    let remaining = store
        .select(tables::USERS, &Query::new().eq("id", owner.id.as_str()))
        .await
        .unwrap();
    assert!(remaining.is_empty());
    assert_eq!(store.count(tables::SESSIONS).await, 0);
}

#[tokio::test]
async fn test_login_rejects_wrong_password() {
    let store = Arc::new(MemoryStore::new());
    let users = UserService::new(store);
    users.create_user(&admin(), "zeynep", "dogru").await.unwrap();

    let err = users.login("zeynep", "yanlis").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(users.login("zeynep", "dogru").await.is_ok());
}

#[tokio::test]
async fn test_login_normalises_username_like_create() {
    let store = Arc::new(MemoryStore::new());
    let users = UserService::new(store);
    let created = users.create_user(&admin(), "Ahmet", "pw").await.unwrap();
    assert_eq!(created.username, "ahmet");

    for typed in ["Ahmet", "  AHMET ", "ah met"] {
        let profile = users.login(typed, "pw").await.unwrap();
        assert_eq!(profile.username, "ahmet", "{typed}");
    }
    assert!(users.login("Ahmet", "PW").await.is_err());
}

#[tokio::test]
async fn test_admin_operations_need_admin_role() {
    let users = UserService::new(Arc::new(MemoryStore::new()));
    let plain = user("u-1");
    assert!(users.list_users(&plain).await.is_err());
    assert!(users.create_user(&plain, "x", "y").await.is_err());
    assert!(users.delete_user(&plain, "u-2").await.is_err());
}

#[tokio::test]
async fn test_profile_save_keeps_role() {
    let store = Arc::new(MemoryStore::new());
    let users = UserService::new(store);
    users.create_user(&admin(), "mehmet", "pw").await.unwrap();
    let profile = users.login("mehmet", "pw").await.unwrap();
    let mut auth = AuthContext::signed_in(profile.clone());

    let mut edited = profile.clone();
    edited.job = "Mimar".into();
    edited.role = UserRole::Admin;
    let saved = users.save_profile(&auth, &edited).await.unwrap();
    assert_eq!(saved.role, UserRole::User);
    auth.refresh(saved);

    let reread = users.refresh_profile(&auth).await.unwrap();
    assert_eq!(reread.job, "Mimar");
    assert_eq!(reread.role, UserRole::User);
}

// ========================================================================
// Conversation turns
// ========================================================================

#[tokio::test]
async fn test_turn_appends_both_messages_and_titles_session() {
    let store = Arc::new(MemoryStore::new());
    let repo = SessionRepository::new(store.clone());
    let auth = user("u-1");
    let generator = echo_generator();

    let mut conversation = Conversation::new();
    let text = "Sürekli aynı ilişkiyi yaşıyorum ve bundan yoruldum";
    let outcome = conversation
        .send(&auth, &repo, &generator, text)
        .await
        .unwrap();

    assert!(outcome.warnings.is_empty());
    assert!(outcome.reply.contains("Model:"));
    assert_eq!(conversation.state(), TurnState::Idle);

    let session = conversation.session();
    assert_eq!(session.messages().len(), 2);
    assert_eq!(session.messages()[0].role, Role::User);
    assert_eq!(session.messages()[1].role, Role::Model);
    assert_eq!(session.title(), "Sürekli aynı ilişkiyi yaşıyoru...");
    assert!(!session.key().is_draft());
    assert_eq!(store.count(tables::SESSIONS).await, 1);
}

#[tokio::test]
async fn test_welcome_then_first_message_still_sets_title() {
    let store = Arc::new(MemoryStore::new());
    let repo = SessionRepository::new(store.clone());
    let auth = user("u-1");

    let mut conversation = Conversation::new();
    let warnings = conversation.greet(&auth, &repo).await.unwrap();
    assert!(warnings.is_empty());
    assert_eq!(conversation.session().messages()[0].id, "welcome");
    assert!(conversation.session().messages()[0].text.contains("Merhaba Ayşe."));

    conversation
        .send(&auth, &repo, &echo_generator(), "İşimde ilerleyemiyorum")
        .await
        .unwrap();
    assert_eq!(conversation.session().title(), "İşimde ilerleyemiyorum");
    assert_eq!(conversation.session().messages().len(), 3);
    assert_eq!(store.count(tables::SESSIONS).await, 1);

    // A non-empty session is not greeted again.
    assert!(conversation.greet(&auth, &repo).await.is_none());
}

#[tokio::test]
async fn test_failed_save_keeps_transcript_and_recovers_on_sync() {
    let store = Arc::new(FlakyStore::new());
    let repo = SessionRepository::new(store.clone());
    let auth = user("u-1");
    let generator = echo_generator();

    store.set_offline(true);
    let mut conversation = Conversation::new();
    let outcome = conversation
        .send(&auth, &repo, &generator, "Merhaba")
        .await
        .unwrap();

    assert!(!outcome.warnings.is_empty());
    assert_eq!(conversation.session().messages().len(), 2);
    assert!(conversation.session().sync_state().is_dirty());
    assert!(conversation.session().key().is_draft());
    assert_eq!(conversation.outbox().len(), 1);

    store.set_offline(false);
    let warnings = conversation.sync(&auth, &repo).await;

    assert!(warnings.is_empty());
    assert!(conversation.outbox().is_empty());
    assert!(!conversation.session().sync_state().is_dirty());
    let id = conversation.session().key().remote_id().unwrap().to_string();

    let stored = repo.get(&id).await.unwrap().unwrap();
    assert_eq!(stored.messages().len(), 2);
    assert_eq!(store.inner.count(tables::SESSIONS).await, 1);

    // Later turns update the same row.
    conversation
        .send(&auth, &repo, &generator, "Devam edelim")
        .await
        .unwrap();
    assert_eq!(store.inner.count(tables::SESSIONS).await, 1);
}

#[tokio::test]
async fn test_anonymous_turn_still_answers() {
    let repo = SessionRepository::new(Arc::new(MemoryStore::new()));
    let mut conversation = Conversation::new();
    let outcome = conversation
        .send(&AuthContext::anonymous(), &repo, &echo_generator(), "Merhaba")
        .await
        .unwrap();

    assert!(outcome.reply.starts_with("Cevap: Merhaba"));
    assert!(outcome.warnings.is_empty());
    assert_eq!(conversation.session().messages().len(), 2);
}

#[tokio::test]
async fn test_anonymous_turns_are_not_queued_for_saving() {
    let store = Arc::new(MemoryStore::new());
    let repo = SessionRepository::new(store.clone());
    let anonymous = AuthContext::anonymous();
    let generator = echo_generator();

    let mut conversation = Conversation::new();
    for text in ["Merhaba", "Devam edelim", "Teşekkürler"] {
        let outcome = conversation
            .send(&anonymous, &repo, &generator, text)
            .await
            .unwrap();
        assert!(outcome.warnings.is_empty(), "{:?}", outcome.warnings);
    }

    assert!(conversation.outbox().is_empty());
    assert!(conversation.session().key().is_draft());
    assert!(!conversation.session().sync_state().is_dirty());
    assert_eq!(conversation.session().messages().len(), 6);
    assert!(conversation.sync(&anonymous, &repo).await.is_empty());
    assert_eq!(store.count(tables::SESSIONS).await, 0);
}

#[tokio::test]
async fn test_failed_export_leaves_pending_writes_queued() {
    let store = Arc::new(FlakyStore::new());
    let repo = SessionRepository::new(store.clone());
    let auth = user("u-1");

    store.set_offline(true);
    let mut conversation = Conversation::new();
    conversation
        .send(&auth, &repo, &echo_generator(), "Merhaba")
        .await
        .unwrap();
    assert_eq!(conversation.outbox().len(), 1);

    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("yok").join("sohbet.json");
    let err = conversation
        .export_to(Some(&missing), auth.current())
        .unwrap_err();
    assert!(matches!(err, MentorError::Io(_)), "{err:?}");
    assert_eq!(conversation.outbox().len(), 1);

    let written = conversation
        .export_to(Some(&dir.path().join("sohbet.json")), auth.current())
        .unwrap();
    let doc: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(written).unwrap()).unwrap();
    assert_eq!(doc["messages"].as_array().unwrap().len(), 2);

    store.set_offline(false);
    assert!(conversation.sync(&auth, &repo).await.is_empty());
    assert!(conversation.outbox().is_empty());
    assert_eq!(store.inner.count(tables::SESSIONS).await, 1);
}

#[tokio::test]
async fn test_blank_message_is_rejected() {
    let repo = SessionRepository::new(Arc::new(MemoryStore::new()));
    let mut conversation = Conversation::new();
    assert!(conversation
        .send(&user("u-1"), &repo, &echo_generator(), "   ")
        .await
        .is_err());
    assert!(conversation.session().is_empty());
}
