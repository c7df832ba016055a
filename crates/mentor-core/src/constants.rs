//! Centralized constants for DTÖ Mentor.
//! Model names, table names, limits and default strings live here.

// ─── Models ───────────────────────────────────────────────────────────────────

pub mod models {
    pub const PRIMARY_MODEL: &str = "gemini-3-flash-preview";
    pub const FALLBACK_MODEL: &str = "gemini-2.0-flash-exp";
    pub const SAFETY_MODEL: &str = "gemini-1.5-flash";

    /// Default fallback order, highest priority first.
    pub const DEFAULT_CHAIN: &[&str] = &[PRIMARY_MODEL, FALLBACK_MODEL, SAFETY_MODEL];

    pub const CONVERSATIONAL_TEMPERATURE: f32 = 0.7;
    pub const INFORMATIONAL_TEMPERATURE: f32 = 0.3;
}

// ─── API Endpoints ────────────────────────────────────────────────────────────

pub mod endpoints {
    pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
    pub const STORE_REST_PATH: &str = "/rest/v1";
    pub const PLACEHOLDER_STORE_URL: &str = "https://YOUR_PROJECT_ID.supabase.co";
}

// ─── Environment ──────────────────────────────────────────────────────────────

pub mod env {
    pub const STORE_URL: &str = "SUPABASE_URL";
    pub const STORE_KEY: &str = "SUPABASE_KEY";
    pub const API_KEY: &str = "GEMINI_API_KEY";
}

// ─── Remote tables ────────────────────────────────────────────────────────────

pub mod tables {
    pub const USERS: &str = "dto_users";
    pub const SESSIONS: &str = "dto_chat_sessions";
    pub const CONFIG: &str = "dto_config";

    /// Config key holding the shared generative API credential.
    pub const SHARED_API_KEY: &str = "gemini_api_key";
}

// ─── Sessions ─────────────────────────────────────────────────────────────────

pub mod session {
    pub const DEFAULT_TITLE: &str = "Yeni Sohbet";
    pub const TITLE_MAX_CHARS: usize = 30;
    pub const TITLE_ELLIPSIS: &str = "...";

    /// Raw ids shorter than this are client-side drafts (millisecond timestamps);
    /// server-issued ids are UUIDs.
    pub const DRAFT_ID_THRESHOLD: usize = 20;

    pub const WELCOME_MESSAGE_ID: &str = "welcome";
}

// ─── Profiles ─────────────────────────────────────────────────────────────────

pub mod profile {
    pub const UNSPECIFIED: &str = "Belirtilmemiş";
}

// ─── Local state ──────────────────────────────────────────────────────────────

pub mod local {
    pub const APP_DIR: &str = "dto-mentor";
    pub const CONFIG_FILE: &str = "config.toml";
    pub const STATE_FILE: &str = "state.toml";
}
