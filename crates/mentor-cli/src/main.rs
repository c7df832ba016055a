use anyhow::Result;
use clap::{Parser, Subcommand};

use mentor_cli::{App, ProfileEdit};

#[derive(Parser)]
#[command(name = "dto-mentor")]
#[command(about = "DTÖ Mentor - life-coaching chat assistant")]
#[command(version)]
struct Cli {
    /// Override the fallback model order (comma separated)
    #[arg(long, value_delimiter = ',')]
    models: Option<Vec<String>>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in and remember the user on this device
    Login {
        username: String,
        /// Read from the terminal when omitted
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Forget the signed-in user and the local API key
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Interactive counselling chat
    Chat {
        /// Continue a saved session
        #[arg(short, long)]
        session: Option<String>,
    },
    /// One informational question, nothing is saved
    Ask { prompt: String },
    /// Explain one of the universal laws (lists them without a name)
    Law { name: Option<String> },
    /// Run a course lesson (lists courses without an id)
    Course { id: Option<String> },
    /// List saved sessions
    Sessions,
    /// Delete a saved session
    DeleteSession { id: String },
    /// Show or edit the profile
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
    /// Manage the API key stored on this device
    Key {
        #[command(subcommand)]
        action: KeyAction,
    },
    /// Probe the primary model with the resolved key
    TestConnection,
    /// Administrator commands
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum ProfileAction {
    Show,
    Set {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        age: Option<String>,
        #[arg(long)]
        gender: Option<String>,
        #[arg(long)]
        marital_status: Option<String>,
        #[arg(long)]
        job: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
}

#[derive(Subcommand)]
enum KeyAction {
    Set { key: String },
    Clear,
}

#[derive(Subcommand)]
enum AdminAction {
    /// List every user, passwords included
    Users,
    CreateUser { username: String, password: String },
    /// Delete a user and all of their sessions
    DeleteUser { id: String },
    ConfigGet { key: String },
    ConfigSet { key: String, value: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let mut settings = mentor_core::Settings::load();
    if let Some(models) = cli.models {
        settings.generation.models = models;
    }

    let mut app = App::open(settings)?;

    match cli.command.unwrap_or(Command::Chat { session: None }) {
        Command::Login { username, password } => app.login(&username, password).await?,
        Command::Logout => app.logout()?,
        Command::Whoami => app.whoami(),
        Command::Chat { session } => app.chat(session.as_deref()).await?,
        Command::Ask { prompt } => app.ask(&prompt).await?,
        Command::Law { name } => app.law(name.as_deref()).await?,
        Command::Course { id } => app.course(id.as_deref()).await?,
        Command::Sessions => app.list_sessions().await?,
        Command::DeleteSession { id } => app.delete_session(&id).await?,
        Command::Profile { action } => match action {
            ProfileAction::Show => app.show_profile().await?,
            ProfileAction::Set {
                name,
                age,
                gender,
                marital_status,
                job,
                notes,
            } => {
                app.update_profile(ProfileEdit {
                    name,
                    age,
                    gender,
                    marital_status,
                    job,
                    notes,
                })
                .await?
            }
        },
        Command::Key { action } => match action {
            KeyAction::Set { key } => app.set_api_key(Some(&key))?,
            KeyAction::Clear => app.set_api_key(None)?,
        },
        Command::TestConnection => app.test_connection().await?,
        Command::Admin { action } => match action {
            AdminAction::Users => app.admin_users().await?,
            AdminAction::CreateUser { username, password } => {
                app.admin_create_user(&username, &password).await?
            }
            AdminAction::DeleteUser { id } => app.admin_delete_user(&id).await?,
            AdminAction::ConfigGet { key } => app.admin_config_get(&key).await?,
            AdminAction::ConfigSet { key, value } => app.admin_config_set(&key, &value).await?,
        },
    }

    Ok(())
}
