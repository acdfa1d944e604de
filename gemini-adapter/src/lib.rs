//! Rust client for the Gemini `generateContent` API.
//!
//! This crate provides the wire types, request construction, HTTP transport
//! and error classification needed to send multimodal (image + text)
//! prompts, plus the rotating [`CredentialPool`] used to spread load
//! across several API keys.

/// HTTP transport for `generateContent` calls.
pub mod client;
/// API-key discovery and credential rotation.
pub mod credentials;
/// Error types returned by client operations.
pub mod error;
/// Wire-format construction and response decoding.
pub mod request;
/// Shared data types for configuration, requests and results.
pub mod types;

pub use client::generate_content;
pub use credentials::{
    discover_api_keys, parse_key_list, Credential, CredentialPool, API_KEYS_ENV_VAR,
    API_KEY_ENV_VAR,
};
pub use error::GeminiError;
pub use request::build_body;
pub use types::*;

/// High-level client for the Gemini API.
///
/// The client holds no credentials; callers pass the active key per call so
/// that rotation stays with whoever owns the [`CredentialPool`].
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    /// Model, endpoint and sampling configuration.
    pub config: ClientConfig,
}

impl GeminiClient {
    /// Creates a client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns `GeminiError::InvalidConfig` if the model name is empty, or
    /// `GeminiError::Http` if the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self, GeminiError> {
        if config.model.trim().is_empty() {
            return Err(GeminiError::InvalidConfig("model name is empty".to_string()));
        }
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    /// Sends a request with the given API key and returns the reply text.
    ///
    /// # Errors
    ///
    /// Returns `GeminiError` on transport failure, a non-success status, or a
    /// reply without text.
    pub async fn generate(
        &self,
        api_key: &str,
        request: &InferenceRequest,
    ) -> Result<GenerateResult, GeminiError> {
        generate_content(&self.http, &self.config, api_key, request).await
    }
}
