//! Model API failure categories and their user-facing messages.

use serde::Deserialize;
use thiserror::Error;

/// Marker the API puts in the message body when the account has no credit left.
const CREDIT_EXHAUSTED_MARKER: &str = "credit balance is too low";

/// Failure of a single model call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LlmError {
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("Credit balance exhausted: {0}")]
    CreditExhausted(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl LlmError {
    /// Message shown to the user when the initial model call fails.
    pub fn user_message(&self) -> String {
        match self {
            LlmError::CreditExhausted(_) => "I'm sorry, but the chatbot is currently unavailable due to API credit exhaustion. Please contact the administrator to resolve this issue.".to_string(),
            LlmError::BadRequest(message) => format!(
                "I encountered an API configuration error. Please contact support with this message: {}",
                message
            ),
            LlmError::RateLimited(_) => {
                "I'm receiving too many requests right now. Please wait a moment and try again."
                    .to_string()
            }
            LlmError::Api { .. } => format!(
                "I'm experiencing technical difficulties with the AI service. Please try again later. Error: {}",
                self
            ),
            LlmError::Transport(_) | LlmError::InvalidResponse(_) => format!(
                "An unexpected error occurred while processing your request: {}",
                self
            ),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    message: String,
}

/// Classify a non-success API response into an [`LlmError`].
pub fn classify_api_error(status: u16, body: &str) -> LlmError {
    let (kind, message) = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => (envelope.error.kind, envelope.error.message),
        Err(_) => (String::new(), body.trim().to_string()),
    };

    if message.contains(CREDIT_EXHAUSTED_MARKER) {
        return LlmError::CreditExhausted(message);
    }

    match (status, kind.as_str()) {
        (429, _) | (_, "rate_limit_error") => LlmError::RateLimited(message),
        (400, _) | (_, "invalid_request_error") => LlmError::BadRequest(message),
        _ => LlmError::Api { status, message },
    }
}
