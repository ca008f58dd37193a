//! Error types for OpenAI client.

use thiserror::Error;

/// Result type for OpenAI client operations.
pub type Result<T> = std::result::Result<T, OpenAIError>;

/// OpenAI client errors.
#[derive(Debug, Error)]
pub enum OpenAIError {
    /// Configuration error (missing API key, invalid settings)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network error (connection failed, timeout)
    #[error("Network error: {0}")]
    Network(String),

    /// API error (non-2xx response, rate limit, invalid request)
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The API answered 2xx but carried no usable choice
    #[error("Empty response from model")]
    EmptyResponse,

    /// Parse error (invalid JSON, unexpected response format)
    #[error("Parse error: {0}")]
    Parse(String),
}

impl OpenAIError {
    /// Whether repeating the same request may succeed.
    ///
    /// Network failures, rate limits, server errors and empty replies are
    /// transient. Configuration problems and other 4xx answers are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            OpenAIError::Network(_) | OpenAIError::EmptyResponse => true,
            OpenAIError::Api { status, .. } => *status == 429 || *status >= 500,
            OpenAIError::Config(_) | OpenAIError::Parse(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(OpenAIError::Network("reset".into()).is_retryable());
        assert!(OpenAIError::EmptyResponse.is_retryable());
        assert!(OpenAIError::Api { status: 429, message: "slow down".into() }.is_retryable());
        assert!(OpenAIError::Api { status: 503, message: "overloaded".into() }.is_retryable());

        assert!(!OpenAIError::Api { status: 401, message: "bad key".into() }.is_retryable());
        assert!(!OpenAIError::Api { status: 400, message: "bad request".into() }.is_retryable());
        assert!(!OpenAIError::Config("OPENAI_API_KEY not set".into()).is_retryable());
    }

    #[test]
    fn test_api_error_display_includes_status() {
        let err = OpenAIError::Api { status: 500, message: "boom".into() };
        assert_eq!(err.to_string(), "API error (500): boom");
    }
}
