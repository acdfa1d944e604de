//! Bounded, paced service calls with quota backoff and credential rotation.

use partscan_gemini::{CredentialPool, InferenceRequest};
use rand::Rng;
use std::time::Duration;

use crate::config::RetryPolicy;
use crate::error::{PipelineError, ServiceError};
use crate::service::InferenceService;

/// Counters accumulated across all calls made through a [`Dispatcher`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Service calls issued, including failed ones.
    pub calls: usize,
    /// Credential rotations performed.
    pub rotations: usize,
    /// Prompt characters sent on successful calls.
    pub input_chars: usize,
    /// Reply characters received.
    pub output_chars: usize,
}

/// Owns the service, the credential pool and the retry policy.
///
/// Every stage calls the service through [`Dispatcher::call`], so pacing,
/// backoff and rotation apply uniformly.
pub struct Dispatcher<S> {
    service: S,
    credentials: CredentialPool,
    policy: RetryPolicy,
    stats: DispatchStats,
}

impl<S: InferenceService> Dispatcher<S> {
    /// Creates a dispatcher.
    #[must_use]
    pub fn new(service: S, credentials: CredentialPool, policy: RetryPolicy) -> Self {
        Self {
            service,
            credentials,
            policy,
            stats: DispatchStats::default(),
        }
    }

    /// The credential pool, for inspection.
    #[must_use]
    pub const fn credentials(&self) -> &CredentialPool {
        &self.credentials
    }

    /// Counters so far.
    #[must_use]
    pub const fn stats(&self) -> DispatchStats {
        self.stats
    }

    /// The wrapped service.
    #[must_use]
    pub const fn service(&self) -> &S {
        &self.service
    }

    /// Sends a request, retrying quota and transient failures.
    ///
    /// Quota errors back off by `base_delay * 2^step` plus jitter. When that
    /// delay would exceed the rotation ceiling the pool rotates to the next
    /// credential and the backoff restarts from `base_delay`. Transient
    /// errors back off the same way without rotating.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Service` immediately on a fatal error, or
    /// `PipelineError::RetriesExhausted` once `max_retries` calls have failed.
    pub async fn call(&mut self, request: &InferenceRequest) -> Result<String, PipelineError> {
        let max = self.policy.max_retries;
        let mut step: u32 = 0;
        let mut last_error: Option<ServiceError> = None;

        for attempt in 1..=max {
            pause(random_between(
                self.policy.request_jitter_min,
                self.policy.request_jitter_max,
            ))
            .await;

            self.stats.calls += 1;
            let result = self
                .service
                .generate(self.credentials.current(), request)
                .await;

            let err = match result {
                Ok(text) => {
                    self.stats.input_chars += request.prompt_chars();
                    self.stats.output_chars += text.chars().count();
                    return Ok(text);
                }
                Err(err) => err,
            };

            let delay = match &err {
                ServiceError::QuotaExceeded(message) => {
                    let mut delay = self.policy.backoff_for(step)
                        + random_between(Duration::ZERO, self.policy.backoff_jitter);
                    if delay > self.policy.rotation_ceiling {
                        self.credentials.rotate();
                        self.stats.rotations += 1;
                        step = 0;
                        delay = self.policy.base_delay;
                    } else {
                        step = step.saturating_add(1);
                    }
                    tracing::warn!(
                        attempt,
                        max_retries = max,
                        delay_secs = delay.as_secs_f64(),
                        key_index = self.credentials.index(),
                        reason = %message,
                        "Rate limit reached, backing off"
                    );
                    delay
                }
                ServiceError::Transient(message) => {
                    let delay = (self.policy.backoff_for(step)
                        + random_between(Duration::ZERO, self.policy.backoff_jitter))
                    .min(self.policy.rotation_ceiling);
                    step = step.saturating_add(1);
                    tracing::warn!(
                        attempt,
                        max_retries = max,
                        delay_secs = delay.as_secs_f64(),
                        reason = %message,
                        "Transient service error, retrying"
                    );
                    delay
                }
                ServiceError::Fatal(message) => {
                    tracing::error!(reason = %message, "Service call failed");
                    return Err(PipelineError::Service(err));
                }
            };

            last_error = Some(err);
            if attempt < max {
                pause(delay).await;
            }
        }

        tracing::error!(max_retries = max, "Max retries reached. Unable to get a response.");
        Err(PipelineError::RetriesExhausted {
            attempts: max,
            last_error: last_error
                .unwrap_or_else(|| ServiceError::Transient("no calls permitted".to_string())),
        })
    }
}

fn random_between(min: Duration, max: Duration) -> Duration {
    if max <= min {
        return min;
    }
    let secs = rand::thread_rng().gen_range(min.as_secs_f64()..max.as_secs_f64());
    Duration::from_secs_f64(secs)
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
