use crate::error::MentorError;
use serde::{Deserialize, Serialize};

/// Speaker of a conversation turn, as the generative API names them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Role {
    /// Anything that is not explicitly `model` is treated as the user.
    pub fn from_label(label: &str) -> Self {
        if label.eq_ignore_ascii_case("model") {
            Role::Model
        } else {
            Role::User
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Part {
    pub text: String,
}

/// One entry of the `contents` list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Content {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![Part { text: text.into() }],
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            parts: vec![Part { text: text.into() }],
        }
    }

    pub fn text(&self) -> String {
        self.parts
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("")
    }
}

/// A prior turn handed to the generator.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub role: Role,
    pub text: String,
}

impl HistoryEntry {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
        }
    }
}

/// Model-independent part of a generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub contents: Vec<Content>,
    pub system_instruction: String,
    pub temperature: f32,
}

impl GenerateRequest {
    /// Maps history to alternating roles and appends the prompt as the final user entry.
    pub fn new(
        prompt: &str,
        history: &[HistoryEntry],
        system_instruction: impl Into<String>,
        temperature: f32,
    ) -> Self {
        let mut contents: Vec<Content> = history
            .iter()
            .map(|h| match h.role {
                Role::Model => Content::model(&h.text),
                Role::User => Content::user(&h.text),
            })
            .collect();
        contents.push(Content::user(prompt));

        Self {
            contents,
            system_instruction: system_instruction.into(),
            temperature,
        }
    }
}

/// Backend for the hosted generative-text endpoint.
///
/// The credential is passed per call because it is resolved per request
/// (local override, environment, then the shared config row).
#[async_trait::async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(
        &self,
        api_key: &str,
        model: &str,
        request: &GenerateRequest,
    ) -> Result<String, MentorError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_appends_prompt_last() {
        let history = vec![
            HistoryEntry::new(Role::User, "Merhaba"),
            HistoryEntry::new(Role::Model, "Merhaba, nasılsın?"),
        ];
        let req = GenerateRequest::new("İyiyim", &history, "sys", 0.7);

        assert_eq!(req.contents.len(), 3);
        assert_eq!(req.contents[0].role, Role::User);
        assert_eq!(req.contents[1].role, Role::Model);
        assert_eq!(req.contents[2].role, Role::User);
        assert_eq!(req.contents[2].text(), "İyiyim");
    }

    #[test]
    fn test_role_from_label() {
        assert_eq!(Role::from_label("model"), Role::Model);
        assert_eq!(Role::from_label("assistant"), Role::User);
        assert_eq!(Role::from_label("user"), Role::User);
    }
}
