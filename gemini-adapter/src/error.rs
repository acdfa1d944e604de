use thiserror::Error;

/// Errors returned by the Gemini client.
#[derive(Debug, Error)]
pub enum GeminiError {
    #[error("No API keys configured: {0}")]
    NoCredentials(String),

    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Quota exceeded (HTTP {status}): {message}")]
    QuotaExceeded { status: u16, message: String },

    #[error("API returned HTTP {status}: {message}")]
    Api {
        status: u16,
        api_status: Option<String>,
        message: String,
    },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Failed to parse JSON: {0}")]
    JsonParseError(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl GeminiError {
    /// Builds the error for a non-success HTTP response.
    ///
    /// Rate and usage limits (429, `RESOURCE_EXHAUSTED`, or any message
    /// mentioning "quota") become [`GeminiError::QuotaExceeded`].
    #[must_use]
    pub fn from_status(status: u16, api_status: Option<String>, message: String) -> Self {
        let exhausted = api_status.as_deref() == Some("RESOURCE_EXHAUSTED");
        if status == 429 || exhausted || message.to_lowercase().contains("quota") {
            return Self::QuotaExceeded { status, message };
        }
        Self::Api {
            status,
            api_status,
            message,
        }
    }

    /// Whether this is a rate/usage-limit error.
    #[must_use]
    pub fn is_quota(&self) -> bool {
        match self {
            Self::QuotaExceeded { .. } => true,
            Self::Api { message, .. } | Self::InvalidResponse(message) => {
                message.to_lowercase().contains("quota")
            }
            _ => false,
        }
    }

    /// Whether a retry of the same request may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::Api { status, .. } => matches!(status, 500 | 502 | 503 | 504),
            _ => false,
        }
    }
}
