mod remote;

pub use remote::RemoteConfig;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

use crate::auth::LocalState;
use crate::constants::{endpoints, env, local, models};
use crate::llm::{FallbackChain, GeminiClient};
use crate::store::{MemoryStore, RestStore, RowStore};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    pub store: StoreSettings,
    pub generation: GenerationSettings,
    #[serde(default)]
    pub local: LocalSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreSettings {
    pub backend: StoreBackend,
    pub url: String,
    pub api_key_env: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Hosted PostgREST tables.
    Rest,
    /// Process-local tables, lost on exit.
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationSettings {
    pub base_url: String,
    /// Fallback order, highest priority first.
    pub models: Vec<String>,
    pub api_key_env: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct LocalSettings {
    pub state_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            store: StoreSettings {
                backend: StoreBackend::Rest,
                url: endpoints::PLACEHOLDER_STORE_URL.to_string(),
                api_key_env: env::STORE_KEY.to_string(),
            },
            generation: GenerationSettings {
                base_url: endpoints::GEMINI_BASE_URL.to_string(),
                models: models::DEFAULT_CHAIN.iter().map(|m| m.to_string()).collect(),
                api_key_env: env::API_KEY.to_string(),
            },
            local: LocalSettings::default(),
        }
    }
}

impl Settings {
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(local::APP_DIR)
            .join(local::CONFIG_FILE)
    }

    /// Reads the config file (defaults when absent or invalid), then applies env overrides.
    pub fn load() -> Self {
        let config_path = Self::config_path();
        let mut settings = Self::default();
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(config) => settings = config,
                    Err(e) => tracing::warn!("Invalid config {}: {}", config_path.display(), e),
                },
                Err(e) => tracing::warn!("Cannot read config {}: {}", config_path.display(), e),
            }
        }
        settings.apply_env();
        settings
    }

    /// `SUPABASE_URL` replaces the configured store URL.
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(env::STORE_URL) {
            if !url.trim().is_empty() {
                self.store.url = url.trim().to_string();
            }
        }
    }

    pub fn store_api_key(&self) -> Option<String> {
        std::env::var(&self.store.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
    }

    /// Process-level credential override.
    pub fn env_api_key(&self) -> Option<String> {
        if self.generation.api_key_env.is_empty() {
            return None;
        }
        std::env::var(&self.generation.api_key_env)
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
    }

    pub fn state_path(&self) -> PathBuf {
        self.local
            .state_path
            .clone()
            .unwrap_or_else(LocalState::default_path)
    }

    pub fn fallback_chain(&self) -> FallbackChain {
        if self.generation.models.is_empty() {
            FallbackChain::default()
        } else {
            FallbackChain::new(self.generation.models.as_slice())
        }
    }

    pub fn build_generator_backend(&self) -> GeminiClient {
        GeminiClient::new().with_base_url(&self.generation.base_url)
    }

    /// Builds the row store named in settings.
    pub fn build_store(&self) -> Result<Arc<dyn RowStore>, crate::error::MentorError> {
        match self.store.backend {
            StoreBackend::Memory => Ok(Arc::new(MemoryStore::new())),
            StoreBackend::Rest => {
                if self.store.url == endpoints::PLACEHOLDER_STORE_URL {
                    return Err(crate::error::MentorError::Config(format!(
                        "store URL not configured; set {} or edit {}",
                        env::STORE_URL,
                        Self::config_path().display()
                    )));
                }
                let key = self.store_api_key().ok_or_else(|| {
                    crate::error::MentorError::Config(format!(
                        "store key missing; set {}",
                        self.store.api_key_env
                    ))
                })?;
                Ok(Arc::new(RestStore::new(&self.store.url, key)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.store.backend, StoreBackend::Rest);
        assert_eq!(settings.generation.models.len(), 3);
        assert_eq!(settings.generation.models[0], models::PRIMARY_MODEL);
        assert_eq!(settings.generation.api_key_env, "GEMINI_API_KEY");
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut settings = Settings::default();
        settings.store.backend = StoreBackend::Memory;
        settings.generation.models = vec!["a".into(), "b".into()];

        let text = toml::to_string_pretty(&settings).unwrap();
        let back: Settings = toml::from_str(&text).unwrap();
        assert_eq!(back, settings);
    }

    #[test]
    fn test_placeholder_url_is_rejected() {
        let settings = Settings::default();
        assert!(settings.build_store().is_err());

        let mut memory = Settings::default();
        memory.store.backend = StoreBackend::Memory;
        assert!(memory.build_store().is_ok());
    }

    #[test]
    fn test_empty_model_list_uses_default_chain() {
        let mut settings = Settings::default();
        settings.generation.models.clear();
        assert_eq!(settings.fallback_chain().len(), 3);
    }
}
