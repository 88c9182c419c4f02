/// Failure calling the model provider.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LlmError {
    #[error("LLM provider rate limit exceeded")]
    RateLimited,

    #[error("LLM provider rejected credentials")]
    AuthFailed,

    #[error("LLM request timed out")]
    Timeout,

    #[error("LLM request failed: {0}")]
    Unknown(String),
}

impl LlmError {
    /// Short machine-readable kind for logs and error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RateLimited => "rate_limited",
            Self::AuthFailed => "auth",
            Self::Timeout => "timeout",
            Self::Unknown(_) => "unknown",
        }
    }

    /// Apologetic message safe to show the end user.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::RateLimited => {
                "I'm experiencing high demand right now. Please try again in a moment."
            }
            Self::AuthFailed => "I'm having authentication issues. Please contact support.",
            Self::Timeout => {
                "I'm taking longer than usual to respond. Please try a shorter question."
            }
            Self::Unknown(_) => "I'm having trouble answering just now. Please try again later.",
        }
    }

    /// Classify an HTTP status returned by the provider.
    pub fn from_status(status: u16, body: &str) -> Self {
        match status {
            429 => Self::RateLimited,
            401 | 403 => Self::AuthFailed,
            408 | 504 => Self::Timeout,
            _ => Self::Unknown(format!("HTTP {status}: {}", truncate(body, 200))),
        }
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if let Some(status) = e.status() {
            Self::from_status(status.as_u16(), "")
        } else {
            Self::Unknown(e.to_string())
        }
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
