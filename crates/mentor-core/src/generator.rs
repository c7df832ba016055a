use crate::config::RemoteConfig;
use crate::context::{InstructionBuilder, Mode};
use crate::error::{ErrorKind, MentorError};
use crate::llm::{
    mask_key, ChainFailure, FallbackChain, GenerateRequest, HistoryEntry, TextGenerator, Tier,
};
use crate::users::UserProfile;
use std::sync::Arc;

const PROBE_PROMPT: &str = "Merhaba, sadece versiyon testi yapıyorum. Kısa cevap ver.";

/// A successful answer and where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedReply {
    pub text: String,
    pub model: String,
    pub tier: Tier,
    /// `(model, error)` for each model that failed before this one answered.
    pub failures: Vec<(String, String)>,
}

impl GeneratedReply {
    /// Answer text followed by a footer naming the serving model.
    pub fn render(&self) -> String {
        let label = match self.tier {
            Tier::Primary => format!("*⚡ Model: {}*", self.model),
            Tier::Fallback => format!("*⚠️ Model: {} (Fallback)*", self.model),
            Tier::Safety => format!("*🛡️ Model: {} (Safety)*", self.model),
        };
        let mut out = format!("{}\n\n---\n{}", self.text, label);
        for (model, error) in &self.failures {
            out.push_str(&format!("\n*🔴 {model} Hatası: {error}*"));
        }
        out
    }
}

#[derive(Debug)]
pub enum GenerationFailure {
    MissingCredential,
    Chain(ChainFailure),
}

impl GenerationFailure {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GenerationFailure::MissingCredential => ErrorKind::Auth,
            GenerationFailure::Chain(failure) => failure.kind(),
        }
    }

    /// User-facing explanation, categorised by the root cause.
    pub fn diagnostic(&self) -> String {
        let failure = match self {
            GenerationFailure::MissingCredential => {
                return "⚠️ HATA: Sistemde kayıtlı API Anahtarı bulunamadı. Lütfen geçerli bir \
Google Gemini API anahtarı tanımlayınız."
                    .to_string()
            }
            GenerationFailure::Chain(failure) => failure,
        };

        let details = failure
            .attempts
            .iter()
            .map(|a| format!("- {}: {}", a.model, a.error))
            .collect::<Vec<_>>()
            .join("\n");

        match failure.kind() {
            ErrorKind::Auth => format!(
                "⚠️ API ANAHTARI HATASI:\n{details}\n\nLütfen yeni bir anahtar giriniz."
            ),
            ErrorKind::RateLimit => format!(
                "⚠️ KOTA AŞIMI: Hesabınızın kotası dolmuş veya faturalandırma ayarlanmamış.\n{details}"
            ),
            ErrorKind::Unavailable => format!(
                "⚠️ SERVİS KULLANILAMIYOR: Model sunucuları şu anda yanıt vermiyor. \
Lütfen biraz sonra tekrar deneyin.\n{details}"
            ),
            ErrorKind::NotFound | ErrorKind::Unknown => {
                format!("⚠️ BAĞLANTI HATASI: Hiçbir model yanıt vermedi.\n{details}")
            }
        }
    }
}

impl std::fmt::Display for GenerationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerationFailure::MissingCredential => write!(f, "no API key configured"),
            GenerationFailure::Chain(failure) => write!(f, "{failure}"),
        }
    }
}

/// Outcome of a connection check.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionReport {
    pub success: bool,
    pub message: String,
}

/// Turns a prompt plus conversation context into model text.
pub struct ResponseGenerator {
    backend: Arc<dyn TextGenerator>,
    chain: FallbackChain,
    remote_config: Option<RemoteConfig>,
    local_override: Option<String>,
    env_override: Option<String>,
}

impl ResponseGenerator {
    pub fn new(backend: Arc<dyn TextGenerator>, chain: FallbackChain) -> Self {
        Self {
            backend,
            chain,
            remote_config: None,
            local_override: None,
            env_override: None,
        }
    }

    pub fn with_remote_config(mut self, config: RemoteConfig) -> Self {
        self.remote_config = Some(config);
        self
    }

    /// Key saved on this device; wins over everything else.
    pub fn with_local_override(mut self, key: Option<String>) -> Self {
        self.local_override = key.filter(|k| !k.trim().is_empty());
        self
    }

    /// Key from the process environment.
    pub fn with_env_override(mut self, key: Option<String>) -> Self {
        self.env_override = key.filter(|k| !k.trim().is_empty());
        self
    }

    pub fn chain(&self) -> &FallbackChain {
        &self.chain
    }

    /// Local override, then environment, then the shared config row.
    pub async fn resolve_api_key(&self) -> Option<String> {
        if let Some(ref key) = self.local_override {
            return Some(key.clone());
        }
        if let Some(ref key) = self.env_override {
            return Some(key.clone());
        }
        match self.remote_config {
            Some(ref config) => config.shared_api_key().await,
            None => None,
        }
    }

    /// Runs the fallback chain and returns the structured result.
    pub async fn generate(
        &self,
        prompt: &str,
        history: &[HistoryEntry],
        profile: Option<&UserProfile>,
        mode: Mode,
    ) -> Result<GeneratedReply, GenerationFailure> {
        let Some(api_key) = self.resolve_api_key().await else {
            tracing::warn!("No API key available for generation");
            return Err(GenerationFailure::MissingCredential);
        };

        let instruction = InstructionBuilder::new(mode).with_profile(profile).build();
        let request = GenerateRequest::new(prompt, history, instruction, mode.temperature());
        tracing::info!(
            "Generating ({} mode, {} history entries, key ...{})",
            mode.name(),
            history.len(),
            mask_key(&api_key)
        );

        let backend = &self.backend;
        let request = &request;
        let api_key = api_key.as_str();

        let served = self
            .chain
            .run(|model| async move {
                let text = backend.generate(api_key, &model, request).await?;
                if text.trim().is_empty() {
                    return Err(MentorError::Other("model returned an empty response".into()));
                }
                Ok(text)
            })
            .await
            .map_err(GenerationFailure::Chain)?;

        Ok(GeneratedReply {
            text: served.value,
            model: served.model,
            tier: served.tier,
            failures: served
                .failures
                .into_iter()
                .map(|f| (f.model, f.error.to_string()))
                .collect(),
        })
    }

    /// Like [`generate`](Self::generate), but always yields displayable text.
    pub async fn respond(
        &self,
        prompt: &str,
        history: &[HistoryEntry],
        profile: Option<&UserProfile>,
        mode: Mode,
    ) -> String {
        match self.generate(prompt, history, profile, mode).await {
            Ok(reply) => reply.render(),
            Err(failure) => {
                tracing::error!("Generation failed: {}", failure);
                failure.diagnostic()
            }
        }
    }

    /// Sends a short test request to the primary model only.
    pub async fn test_connection(&self) -> ConnectionReport {
        let Some(api_key) = self.resolve_api_key().await else {
            return ConnectionReport {
                success: false,
                message: GenerationFailure::MissingCredential.diagnostic(),
            };
        };
        let Some(primary) = self.chain.primary() else {
            return ConnectionReport {
                success: false,
                message: "Yapılandırılmış model yok.".to_string(),
            };
        };

        tracing::info!("Testing connection with key ending in ...{}", mask_key(&api_key));
        let request = GenerateRequest::new(PROBE_PROMPT, &[], "", Mode::Informational.temperature());

        match self.backend.generate(&api_key, &primary.model, &request).await {
            Ok(text) => ConnectionReport {
                success: true,
                message: format!("BAŞARILI!\n\nKullanılan Model: {}\nCevap: {}", primary.model, text),
            },
            Err(e) => {
                let detail = match e.kind() {
                    ErrorKind::Auth => "API Anahtarı GEÇERSİZ. Lütfen Google AI Studio'dan yeni bir anahtar alıp girin.".to_string(),
                    ErrorKind::RateLimit => "KOTA AŞIMI. Hesabınızın kotası dolmuş veya faturalandırma ayarlanmamış.".to_string(),
                    _ => e.to_string(),
                };
                ConnectionReport {
                    success: false,
                    message: format!("Ana Model ({}) Hatası: {}", primary.model, detail),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_primary() {
        let reply = GeneratedReply {
            text: "Cevap".into(),
            model: "m1".into(),
            tier: Tier::Primary,
            failures: vec![],
        };
        assert_eq!(reply.render(), "Cevap\n\n---\n*⚡ Model: m1*");
    }

    #[test]
    fn test_render_fallback_lists_failures() {
        let reply = GeneratedReply {
            text: "Cevap".into(),
            model: "m2".into(),
            tier: Tier::Fallback,
            failures: vec![("m1".into(), "boom".into())],
        };
        let out = reply.render();
        assert!(out.contains("*⚠️ Model: m2 (Fallback)*"));
        assert!(out.contains("*🔴 m1 Hatası: boom*"));
    }

    #[test]
    fn test_missing_credential_diagnostic() {
        let failure = GenerationFailure::MissingCredential;
        assert_eq!(failure.kind(), ErrorKind::Auth);
        assert!(failure.diagnostic().contains("API Anahtarı bulunamadı"));
    }
}
