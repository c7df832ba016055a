use anyhow::{anyhow, bail, Context, Result};
use mentor_core::context::{find_course, find_law, law_prompt, COURSES, LAWS};
use mentor_core::{
    AuthContext, ChatSession, Conversation, LocalState, MentorError, Mode, RemoteConfig,
    ResponseGenerator, RowStore, SessionRepository, Settings, SyncState, UserProfile, UserService,
};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::commands::{handle_command, CommandResult};

/// Services backed by the row store.
struct Services {
    repo: SessionRepository,
    users: UserService,
    remote_config: RemoteConfig,
}

impl Services {
    fn new(store: Arc<dyn RowStore>) -> Self {
        Self {
            repo: SessionRepository::new(store.clone()),
            users: UserService::new(store.clone()),
            remote_config: RemoteConfig::new(store),
        }
    }
}

/// Everything a command needs: settings, device state, identity and services.
///
/// A misconfigured store only fails the commands that use it.
pub struct App {
    settings: Settings,
    state_path: PathBuf,
    local: LocalState,
    auth: AuthContext,
    services: std::result::Result<Services, MentorError>,
}

impl App {
    pub fn open(settings: Settings) -> Result<Self> {
        let services = settings.build_store().map(Services::new);
        if let Err(e) = &services {
            tracing::debug!("Store unavailable: {}", e);
        }
        let state_path = settings.state_path();
        let local = LocalState::load_from(&state_path);
        let auth = AuthContext::restore(&local);
        tracing::debug!(
            "Opened app (state {}, signed in: {})",
            state_path.display(),
            auth.is_signed_in()
        );

        Ok(Self {
            services,
            settings,
            state_path,
            local,
            auth,
        })
    }

    fn services(&self) -> Result<&Services> {
        self.services
            .as_ref()
            .map_err(|e| anyhow!("Could not set up the session store: {e}"))
    }

    /// Without a store the shared key is skipped; local and env keys still apply.
    fn generator(&self) -> ResponseGenerator {
        let generator = ResponseGenerator::new(
            Arc::new(self.settings.build_generator_backend()),
            self.settings.fallback_chain(),
        )
        .with_local_override(self.local.api_key().map(str::to_string))
        .with_env_override(self.settings.env_api_key());
        match &self.services {
            Ok(services) => generator.with_remote_config(services.remote_config.clone()),
            Err(_) => generator,
        }
    }

    pub fn auth(&self) -> &AuthContext {
        &self.auth
    }

    pub fn local(&self) -> &LocalState {
        &self.local
    }

    fn save_local(&mut self) -> Result<()> {
        self.auth.store_into(&mut self.local);
        self.local
            .save_to(&self.state_path)
            .with_context(|| format!("Could not write {}", self.state_path.display()))
    }

    // ── Account ─────────────────────────────────────────────────────────

    pub async fn login(&mut self, username: &str, password: Option<String>) -> Result<()> {
        let password = match password {
            Some(p) => p,
            None => prompt_line("Şifre: ")?,
        };
        let mut profile = self
            .services()?
            .users
            .login(username, &password)
            .await
            .map_err(|e| match e.kind() {
                mentor_core::ErrorKind::NotFound => {
                    anyhow::anyhow!("Kullanıcı adı veya şifre hatalı.")
                }
                _ => anyhow::anyhow!("Bağlantı hatası: {e}"),
            })?;
        profile.password = None;

        println!("Hoş geldin, {} ({})", display_name(&profile), profile.role.display_name());
        self.auth.login(profile);
        self.save_local()
    }

    pub fn logout(&mut self) -> Result<()> {
        self.auth.logout();
        self.local.clear();
        self.local
            .save_to(&self.state_path)
            .with_context(|| format!("Could not write {}", self.state_path.display()))?;
        println!("Çıkış yapıldı.");
        Ok(())
    }

    pub fn whoami(&self) {
        match self.auth.current() {
            Some(user) => println!(
                "{} ({}) - {}",
                user.username,
                user.role.display_name(),
                display_name(user)
            ),
            None => println!("Giriş yapılmadı."),
        }
    }

    pub async fn show_profile(&mut self) -> Result<()> {
        let profile = self.services()?.users.refresh_profile(&self.auth).await?;
        self.auth.refresh(profile.clone());
        self.save_local()?;

        println!("Kullanıcı adı : {}", profile.username);
        println!("Ad Soyad      : {}", profile.name);
        println!("Yaş           : {}", profile.age);
        println!("Cinsiyet      : {}", profile.gender);
        println!("Medeni durum  : {}", profile.marital_status);
        println!("Meslek        : {}", profile.job);
        println!("Notlar        : {}", profile.notes);
        Ok(())
    }

    pub async fn update_profile(&mut self, edit: ProfileEdit) -> Result<()> {
        let mut profile = self.auth.require_user()?.clone();
        edit.apply(&mut profile);

        let saved = self
            .services()?
            .users
            .save_profile(&self.auth, &profile)
            .await?;
        self.auth.refresh(saved);
        self.save_local()?;
        println!("Profil kaydedildi.");
        Ok(())
    }

    pub fn set_api_key(&mut self, key: Option<&str>) -> Result<()> {
        match key {
            Some(key) => self.local.set_api_key(key),
            None => self.local.api_key_override = None,
        }
        self.save_local()?;
        match self.local.api_key() {
            Some(key) => println!("API anahtarı kaydedildi (...{}).", mentor_core::llm::mask_key(key)),
            None => println!("Yerel API anahtarı kaldırıldı."),
        }
        Ok(())
    }

    pub async fn test_connection(&self) -> Result<()> {
        let report = self.generator().test_connection().await;
        println!("{}", report.message);
        if !report.success {
            bail!("connection test failed");
        }
        Ok(())
    }

    // ── Content ─────────────────────────────────────────────────────────

    pub async fn ask(&self, prompt: &str) -> Result<()> {
        let reply = self
            .generator()
            .respond(prompt, &[], self.auth.current(), Mode::Informational)
            .await;
        println!("{reply}");
        Ok(())
    }

    pub async fn law(&self, name: Option<&str>) -> Result<()> {
        let Some(name) = name else {
            println!("Evrensel yasalar:");
            for law in LAWS {
                println!("  - {law}");
            }
            return Ok(());
        };
        let Some(law) = find_law(name) else {
            bail!("Unknown law: {name}");
        };
        println!("── {law} ──\n");
        self.ask(&law_prompt(law)).await
    }

    pub async fn course(&self, id: Option<&str>) -> Result<()> {
        let Some(id) = id else {
            println!("Eğitimler:");
            for course in COURSES {
                println!("  {:<12} {} - {}", course.id, course.title, course.description);
            }
            return Ok(());
        };
        let Some(course) = find_course(id) else {
            bail!("Unknown course: {id}");
        };
        println!("── {} ──\n", course.title);
        self.ask(course.prompt_context).await
    }

    // ── Sessions ────────────────────────────────────────────────────────

    pub async fn list_sessions(&self) -> Result<()> {
        let sessions = self.services()?.repo.list(&self.auth).await?;
        if sessions.is_empty() {
            println!("Kayıtlı sohbet yok.");
        }
        for session in sessions {
            println!(
                "{}  {}  {} ({} mesaj)",
                session.key().as_str(),
                session.last_updated().format("%d.%m.%Y %H:%M"),
                session.title(),
                session.messages().len()
            );
        }
        Ok(())
    }

    pub async fn delete_session(&self, id: &str) -> Result<()> {
        self.auth.require_user()?;
        let removed = self.services()?.repo.delete(id).await?;
        if removed == 0 {
            println!("Sohbet bulunamadı: {id}");
        } else {
            println!("Sohbet silindi.");
        }
        Ok(())
    }

    async fn load_session(&self, id: &str) -> Result<ChatSession> {
        self.services()?
            .repo
            .get(id)
            .await?
            .with_context(|| format!("Session not found: {id}"))
    }

    pub async fn chat(&self, session_id: Option<&str>) -> Result<()> {
        let repo = &self.services()?.repo;
        let generator = self.generator();
        let mut conversation = match session_id {
            Some(id) => Conversation::resume(self.load_session(id).await?),
            None => Conversation::new(),
        };
        if !self.auth.is_signed_in() {
            eprintln!("Giriş yapılmadı; sohbet kaydedilmeyecek. (dto-mentor login <kullanıcı>)");
        }

        for message in conversation.session().messages() {
            print_message(message.role.as_str(), &message.text);
        }
        if let Some(warnings) = conversation.greet(&self.auth, repo).await {
            if let Some(welcome) = conversation.session().messages().last() {
                print_message("model", &welcome.text);
            }
            print_warnings(&warnings);
        }

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            print!("\n> ");
            std::io::stdout().flush()?;
            let Some(line) = lines.next_line().await? else {
                break;
            };
            if line.trim().is_empty() {
                continue;
            }

            match handle_command(&line) {
                CommandResult::NotACommand => {
                    let outcome = conversation
                        .send(&self.auth, repo, &generator, &line)
                        .await?;
                    print_message("model", &outcome.reply);
                    print_warnings(&outcome.warnings);
                }
                CommandResult::Message(msg) => println!("{msg}"),
                CommandResult::Quit => break,
                CommandResult::NewSession => {
                    conversation.start_new();
                    println!("Yeni sohbet başlatıldı.");
                    if let Some(warnings) = conversation.greet(&self.auth, repo).await {
                        if let Some(welcome) = conversation.session().messages().last() {
                            print_message("model", &welcome.text);
                        }
                        print_warnings(&warnings);
                    }
                }
                CommandResult::ListSessions => {
                    if let Err(e) = self.list_sessions().await {
                        eprintln!("Error: {e}");
                    }
                }
                CommandResult::LoadSession(id) => match self.load_session(&id).await {
                    Ok(session) => {
                        conversation.switch_to(session);
                        println!("── {} ──", conversation.session().title());
                        for message in conversation.session().messages() {
                            print_message(message.role.as_str(), &message.text);
                        }
                    }
                    Err(e) => eprintln!("Error: {e}"),
                },
                CommandResult::DeleteSession(id) => {
                    if let Err(e) = self.delete_session(&id).await {
                        eprintln!("Error: {e}");
                    } else if conversation.session().key().remote_id() == Some(id.as_str()) {
                        conversation.start_new();
                    }
                }
                CommandResult::Export(path) => {
                    match conversation.export_to(path.as_deref().map(Path::new), self.auth.current())
                    {
                        Ok(path) => println!("Sohbet kaydedildi: {}", path.display()),
                        Err(e) => eprintln!("Error: {e}"),
                    }
                }
                CommandResult::Sync => {
                    let warnings = conversation.sync(&self.auth, repo).await;
                    if warnings.is_empty() {
                        println!("Tüm sohbetler kaydedildi.");
                    }
                    print_warnings(&warnings);
                }
                CommandResult::ShowStatus => {
                    let session = conversation.session();
                    let user = self
                        .auth
                        .current()
                        .map(|u| u.username.as_str())
                        .unwrap_or("-");
                    let sync = match session.sync_state() {
                        SyncState::Clean => "kayıtlı".to_string(),
                        SyncState::Dirty { attempts, last_error } => {
                            format!("kaydedilmedi ({attempts} deneme): {last_error}")
                        }
                    };
                    println!("Kullanıcı : {user}");
                    println!("Sohbet    : {} [{}]", session.title(), session.key());
                    println!("Mesajlar  : {}", session.messages().len());
                    println!("Durum     : {sync}");
                    println!("Bekleyen  : {}", conversation.outbox().len());
                    println!(
                        "Modeller  : {}",
                        generator
                            .chain()
                            .candidates()
                            .iter()
                            .map(|c| c.model.as_str())
                            .collect::<Vec<_>>()
                            .join(" → ")
                    );
                }
            }
        }

        if !conversation.outbox().is_empty() {
            let warnings = conversation.sync(&self.auth, repo).await;
            if !conversation.outbox().is_empty() {
                tracing::warn!("Leaving chat with {} unsaved session(s)", conversation.outbox().len());
            }
            print_warnings(&warnings);
        }
        Ok(())
    }

    // ── Admin ───────────────────────────────────────────────────────────

    pub async fn admin_users(&self) -> Result<()> {
        let users = self.services()?.users.list_users(&self.auth).await?;
        for user in users {
            println!(
                "{:<38} {:<16} {:<10} {:<12} {}",
                user.id,
                user.username,
                user.role.display_name(),
                user.password.as_deref().unwrap_or(""),
                user.name
            );
        }
        Ok(())
    }

    pub async fn admin_create_user(&self, username: &str, password: &str) -> Result<()> {
        let created = self
            .services()?
            .users
            .create_user(&self.auth, username, password)
            .await?;
        println!("Kullanıcı oluşturuldu: {} ({})", created.username, created.id);
        Ok(())
    }

    pub async fn admin_delete_user(&self, id: &str) -> Result<()> {
        self.services()?.users.delete_user(&self.auth, id).await?;
        println!("Kullanıcı ve sohbetleri silindi.");
        Ok(())
    }

    pub async fn admin_config_get(&self, key: &str) -> Result<()> {
        match self.services()?.remote_config.get(&self.auth, key).await? {
            Some(value) => println!("{value}"),
            None => println!("(tanımsız)"),
        }
        Ok(())
    }

    pub async fn admin_config_set(&self, key: &str, value: &str) -> Result<()> {
        self.services()?.remote_config.set(&self.auth, key, value).await?;
        println!("{key} güncellendi.");
        Ok(())
    }
}

/// Optional replacements for the editable profile fields.
#[derive(Debug, Default)]
pub struct ProfileEdit {
    pub name: Option<String>,
    pub age: Option<String>,
    pub gender: Option<String>,
    pub marital_status: Option<String>,
    pub job: Option<String>,
    pub notes: Option<String>,
}

impl ProfileEdit {
    fn apply(self, profile: &mut UserProfile) {
        let fields = [
            (self.name, &mut profile.name),
            (self.age, &mut profile.age),
            (self.gender, &mut profile.gender),
            (self.marital_status, &mut profile.marital_status),
            (self.job, &mut profile.job),
            (self.notes, &mut profile.notes),
        ];
        for (value, field) in fields {
            if let Some(value) = value {
                *field = value;
            }
        }
    }
}

fn display_name(profile: &UserProfile) -> &str {
    if profile.name.is_empty() {
        &profile.username
    } else {
        &profile.name
    }
}

fn print_message(role: &str, text: &str) {
    let label = if role == "user" { "Sen" } else { "DTÖ" };
    println!("\n[{label}] {text}");
}

fn print_warnings(warnings: &[String]) {
    for warning in warnings {
        eprintln!("⚠ {warning}");
    }
}

fn prompt_line(label: &str) -> Result<String> {
    print!("{label}");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
