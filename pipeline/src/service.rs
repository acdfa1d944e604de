//! The seam between the pipeline and the inference transport.

use async_trait::async_trait;
use partscan_gemini::{Credential, GeminiClient, InferenceRequest};
use std::sync::Arc;

use crate::error::ServiceError;

/// A multimodal inference backend.
///
/// Implementations send one request with the given credential and return the
/// free-text reply, classifying failures as quota, transient or fatal.
#[async_trait]
pub trait InferenceService: Send + Sync {
    /// Sends `request` authenticated with `credential`.
    async fn generate(
        &self,
        credential: &Credential,
        request: &InferenceRequest,
    ) -> Result<String, ServiceError>;
}

#[async_trait]
impl InferenceService for GeminiClient {
    async fn generate(
        &self,
        credential: &Credential,
        request: &InferenceRequest,
    ) -> Result<String, ServiceError> {
        Self::generate(self, credential.key(), request)
            .await
            .map(|result| result.text)
            .map_err(ServiceError::from)
    }
}

#[async_trait]
impl<T> InferenceService for Arc<T>
where
    T: InferenceService + ?Sized,
{
    async fn generate(
        &self,
        credential: &Credential,
        request: &InferenceRequest,
    ) -> Result<String, ServiceError> {
        (**self).generate(credential, request).await
    }
}
