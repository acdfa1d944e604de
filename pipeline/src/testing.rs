//! Scripted service fake for unit tests.

use async_trait::async_trait;
use partscan_gemini::{Credential, CredentialPool, ImagePayload, InferenceRequest};
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::config::RetryPolicy;
use crate::dispatch::Dispatcher;
use crate::error::ServiceError;
use crate::service::InferenceService;

/// Replays canned results in order and records what it was sent.
pub struct ScriptedService {
    replies: Mutex<VecDeque<Result<String, ServiceError>>>,
    pub keys_seen: Mutex<Vec<usize>>,
    pub requests: Mutex<Vec<InferenceRequest>>,
}

impl ScriptedService {
    pub fn new(replies: Vec<Result<String, ServiceError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            keys_seen: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| Ok((*t).to_string())).collect())
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> InferenceRequest {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl InferenceService for ScriptedService {
    async fn generate(
        &self,
        credential: &Credential,
        request: &InferenceRequest,
    ) -> Result<String, ServiceError> {
        self.keys_seen.lock().unwrap().push(credential.index());
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ServiceError::Fatal("script exhausted".to_string())))
    }
}

pub fn pool(n: usize) -> CredentialPool {
    CredentialPool::new((0..n).map(|i| format!("key-{i}"))).unwrap()
}

pub fn dispatcher(service: ScriptedService) -> Dispatcher<ScriptedService> {
    Dispatcher::new(service, pool(1), RetryPolicy::immediate())
}

pub fn image() -> ImagePayload {
    ImagePayload::from_bytes(vec![0xFF, 0xD8, 0xFF, 0xE0])
}
