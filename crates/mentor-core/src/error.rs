use thiserror::Error;

/// Broad failure categories used for retry decisions and user-facing text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad credential or missing permission.
    Auth,
    /// Quota or rate limit exceeded.
    RateLimit,
    /// Remote service down or overloaded.
    Unavailable,
    /// No matching record.
    NotFound,
    Unknown,
}

impl ErrorKind {
    /// Credential problems fail identically on every model, so they are never retried.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ErrorKind::Auth)
    }
}

#[derive(Error, Debug)]
pub enum MentorError {
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Store error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No API key configured")]
    MissingCredential,

    #[error("Not authorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl MentorError {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingCredential | Self::Unauthorized(_) => ErrorKind::Auth,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Api { status, message } => match status {
                401 | 403 => ErrorKind::Auth,
                429 => ErrorKind::RateLimit,
                404 => ErrorKind::NotFound,
                500..=599 => ErrorKind::Unavailable,
                _ => classify_message(message),
            },
            Self::Http(e) => {
                if let Some(status) = e.status() {
                    Self::api(status.as_u16(), e.to_string()).kind()
                } else if e.is_timeout() || e.is_connect() {
                    ErrorKind::Unavailable
                } else {
                    ErrorKind::Unknown
                }
            }
            other => classify_message(&other.to_string()),
        }
    }
}

/// Heuristic classification for errors that only carry a message.
pub fn classify_message(message: &str) -> ErrorKind {
    let lower = message.to_lowercase();

    if lower.contains("api key")
        || lower.contains("api_key_invalid")
        || lower.contains("permission_denied")
        || lower.contains("unauthenticated")
        || lower.contains("403")
        || lower.contains("401")
    {
        return ErrorKind::Auth;
    }

    if lower.contains("quota")
        || lower.contains("resource_exhausted")
        || lower.contains("rate limit")
        || lower.contains("429")
    {
        return ErrorKind::RateLimit;
    }

    if lower.contains("unavailable")
        || lower.contains("overloaded")
        || lower.contains("503")
        || lower.contains("502")
        || lower.contains("timed out")
    {
        return ErrorKind::Unavailable;
    }

    if lower.contains("not found") || lower.contains("pgrst116") {
        return ErrorKind::NotFound;
    }

    ErrorKind::Unknown
}

pub type Result<T> = std::result::Result<T, MentorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert_eq!(MentorError::api(403, "denied").kind(), ErrorKind::Auth);
        assert_eq!(MentorError::api(401, "nope").kind(), ErrorKind::Auth);
        assert_eq!(MentorError::api(429, "slow down").kind(), ErrorKind::RateLimit);
        assert_eq!(MentorError::api(503, "busy").kind(), ErrorKind::Unavailable);
        assert_eq!(MentorError::api(404, "gone").kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_message_classification_for_bad_request() {
        // The generative API reports an invalid key as 400 with a telling message.
        let err = MentorError::api(400, "API key not valid. Please pass a valid API key.");
        assert_eq!(err.kind(), ErrorKind::Auth);

        let err = MentorError::api(400, "something odd");
        assert_eq!(err.kind(), ErrorKind::Unknown);
    }

    #[test]
    fn test_message_heuristics() {
        assert_eq!(classify_message("You exceeded your current quota"), ErrorKind::RateLimit);
        assert_eq!(classify_message("The model is overloaded"), ErrorKind::Unavailable);
        assert_eq!(classify_message("PGRST116: no rows"), ErrorKind::NotFound);
        assert_eq!(classify_message("weird"), ErrorKind::Unknown);
    }

    #[test]
    fn test_only_auth_is_non_retryable() {
        assert!(!ErrorKind::Auth.is_retryable());
        assert!(ErrorKind::RateLimit.is_retryable());
        assert!(ErrorKind::Unavailable.is_retryable());
        assert!(ErrorKind::NotFound.is_retryable());
        assert!(ErrorKind::Unknown.is_retryable());
        assert_eq!(MentorError::MissingCredential.kind(), ErrorKind::Auth);
    }
}
