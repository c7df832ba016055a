use crate::constants::endpoints;
use crate::error::MentorError;
use crate::llm::traits::*;
use serde::Deserialize;
use serde_json::Value;

/// Client for the `generateContent` REST endpoint.
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
}

impl GeminiClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: endpoints::GEMINI_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, model)
    }

    fn build_request_body(request: &GenerateRequest) -> Value {
        let mut body = serde_json::json!({
            "contents": request.contents,
            "generationConfig": {
                "temperature": request.temperature,
            },
        });

        if !request.system_instruction.trim().is_empty() {
            body["systemInstruction"] = serde_json::json!({
                "parts": [{ "text": request.system_instruction }]
            });
        }

        body
    }

    fn extract_text(response: GeminiApiResponse) -> Result<String, MentorError> {
        let candidate = response.candidates.into_iter().next();

        let Some(candidate) = candidate else {
            let reason = response
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .unwrap_or_else(|| "no candidates returned".to_string());
            return Err(MentorError::api(200, format!("Empty response: {reason}")));
        };

        let text = candidate
            .content
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        Ok(text)
    }

    /// Pulls the human readable message out of `{"error": {...}}`, falling back to the raw body.
    fn error_message(body: &str) -> String {
        serde_json::from_str::<GeminiErrorBody>(body)
            .map(|e| match e.error.status {
                Some(status) => format!("{}: {}", status, e.error.message),
                None => e.error.message,
            })
            .unwrap_or_else(|_| body.to_string())
    }
}

impl Default for GeminiClient {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiApiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<GeminiPromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    error: GeminiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

#[async_trait::async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(
        &self,
        api_key: &str,
        model: &str,
        request: &GenerateRequest,
    ) -> Result<String, MentorError> {
        let url = self.endpoint(model);
        let body = Self::build_request_body(request);

        tracing::debug!(
            "generateContent model={} contents={} key=...{}",
            model,
            request.contents.len(),
            mask_key(api_key)
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let response_text = response.text().await?;

        if !status.is_success() {
            return Err(MentorError::api(
                status.as_u16(),
                Self::error_message(&response_text),
            ));
        }

        let api_response: GeminiApiResponse = serde_json::from_str(&response_text)
            .map_err(|e| MentorError::Other(format!("Failed to parse response: {e}")))?;

        Self::extract_text(api_response)
    }
}

/// Last four characters of a key, for logs.
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    let start = chars.len().saturating_sub(4);
    chars[start..].iter().collect()
}
