use crate::constants::local::{APP_DIR, STATE_FILE};
use crate::error::MentorError;
use crate::users::UserProfile;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Device-local state (persisted to ~/.config/dto-mentor/state.toml).
///
/// Holds the signed-in user snapshot and an optional API key override.
/// Both are wiped on logout.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct LocalState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_override: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_user: Option<UserProfile>,
}

impl LocalState {
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join(STATE_FILE)
    }

    /// Missing or unreadable files yield an empty state.
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring corrupt local state {}: {}", path.display(), e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<(), MentorError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| MentorError::Config(e.to_string()))?;
        let tmp_path = path.with_extension("toml.tmp");
        std::fs::write(&tmp_path, content)?;
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }

    /// The override, if set and non-blank.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key_override
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    pub fn set_api_key(&mut self, key: &str) {
        let key = key.trim();
        self.api_key_override = if key.is_empty() {
            None
        } else {
            Some(key.to_string())
        };
    }

    pub fn clear(&mut self) {
        self.current_user = None;
        self.api_key_override = None;
    }
}
