use alloy::transports::TransportError;
use thiserror::Error;

/// JSON-RPC code most providers use for "limit exceeded" responses.
const LIMIT_EXCEEDED_CODE: i64 = -32005;

const LIMIT_EXCEEDED_MESSAGES: &[&str] = &[
    "query returned more than",
    "too many logs",
    "limit exceeded",
    "response size",
    "response is too big",
    "block range",
];

#[derive(Debug, Error)]
pub enum ChainError {
    /// The provider refused to serve a response of this size. Retrying
    /// with a narrower block range is expected to succeed.
    #[error("provider limit exceeded: {0}")]
    LimitExceeded(String),
    #[error("transport error: {0}")]
    Transport(String),
}

impl ChainError {
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        if is_limit_message(&message) {
            Self::LimitExceeded(message)
        } else {
            Self::Transport(message)
        }
    }

    pub fn is_limit_exceeded(&self) -> bool {
        matches!(self, Self::LimitExceeded(_))
    }
}

impl From<TransportError> for ChainError {
    fn from(err: TransportError) -> Self {
        if let Some(payload) = err.as_error_resp()
            && payload.code == LIMIT_EXCEEDED_CODE
        {
            return Self::LimitExceeded(payload.message.to_string());
        }
        Self::from_message(err.to_string())
    }
}

fn is_limit_message(message: &str) -> bool {
    let message = message.to_lowercase();
    LIMIT_EXCEEDED_MESSAGES
        .iter()
        .any(|pattern| message.contains(pattern))
}
