/// Result of processing a slash command in the chat prompt.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandResult {
    /// Display a message to the user.
    Message(String),
    /// Quit the chat.
    Quit,
    /// Start a fresh session.
    NewSession,
    /// List the signed-in user's sessions.
    ListSessions,
    /// Load a session by id.
    LoadSession(String),
    /// Delete a session by id.
    DeleteSession(String),
    /// Write the transcript as JSON, optionally to the given path.
    Export(Option<String>),
    /// Retry writes that failed earlier.
    Sync,
    /// Show user, session and sync status.
    ShowStatus,
    /// Not a command - send as a chat message.
    NotACommand,
}

pub fn handle_command(input: &str) -> CommandResult {
    let input = input.trim();
    let parts: Vec<&str> = input.splitn(2, ' ').collect();
    let cmd = parts[0];
    let arg = parts.get(1).map(|s| s.trim()).unwrap_or("");

    match cmd {
        "/help" | "/h" => show_help(),
        "/exit" | "/quit" | "/q" => CommandResult::Quit,
        "/new" => CommandResult::NewSession,

        "/sessions" | "/history" => CommandResult::ListSessions,
        "/load" => {
            if arg.is_empty() {
                CommandResult::Message("Usage: /load <session-id>".into())
            } else {
                CommandResult::LoadSession(arg.to_string())
            }
        }
        "/delete" => {
            if arg.is_empty() {
                CommandResult::Message("Usage: /delete <session-id>".into())
            } else {
                CommandResult::DeleteSession(arg.to_string())
            }
        }
        "/export" => {
            if arg.is_empty() {
                CommandResult::Export(None)
            } else {
                CommandResult::Export(Some(arg.to_string()))
            }
        }
        "/sync" => CommandResult::Sync,
        "/status" => CommandResult::ShowStatus,
        "/version" => CommandResult::Message(format!("DTÖ Mentor v{}", env!("CARGO_PKG_VERSION"))),

        _ => {
            if input.starts_with('/') {
                CommandResult::Message(format!("Unknown command: {cmd}. Type /help for commands."))
            } else {
                CommandResult::NotACommand
            }
        }
    }
}

fn show_help() -> CommandResult {
    let help_text = "\
╭─ DTÖ Mentor Commands ──────────────────────────────────────────╮

  SESSIONS
    /new                      Start a fresh session
    /sessions, /history       List your saved sessions
    /load <id>                Continue a saved session
    /delete <id>              Delete a saved session
    /export [path]            Write the transcript as JSON

  SYNC
    /sync                     Retry saves that failed earlier
    /status                   Show user, session and sync status

  OTHER
    /help, /h                 Show this help message
    /version                  Show version information
    /exit, /quit, /q          Leave the chat

╰────────────────────────────────────────────────────────────────╯";

    CommandResult::Message(help_text.into())
}
