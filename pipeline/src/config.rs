//! Configuration for identification attempts and service-call retries.

use std::time::Duration;

/// Per-call retry, backoff and pacing behaviour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum calls per request before giving up (default: 10).
    pub max_retries: usize,
    /// Delay unit for exponential backoff (default: 5s).
    pub base_delay: Duration,
    /// A computed backoff above this rotates credentials instead of waiting (default: 300s).
    pub rotation_ceiling: Duration,
    /// Upper bound of random jitter added to each backoff (default: 1s).
    pub backoff_jitter: Duration,
    /// Lower bound of the random pause before every call (default: 2s).
    pub request_jitter_min: Duration,
    /// Upper bound of the random pause before every call (default: 6s).
    pub request_jitter_max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 10,
            base_delay: Duration::from_secs(5),
            rotation_ceiling: Duration::from_secs(300),
            backoff_jitter: Duration::from_secs(1),
            request_jitter_min: Duration::from_secs(2),
            request_jitter_max: Duration::from_secs(6),
        }
    }
}

impl RetryPolicy {
    /// A policy that never sleeps. Intended for tests and local fakes.
    #[must_use]
    pub const fn immediate() -> Self {
        Self {
            max_retries: 10,
            base_delay: Duration::ZERO,
            rotation_ceiling: Duration::from_secs(300),
            backoff_jitter: Duration::ZERO,
            request_jitter_min: Duration::ZERO,
            request_jitter_max: Duration::ZERO,
        }
    }

    /// Set the maximum number of calls per request.
    #[must_use]
    pub const fn with_max_retries(mut self, max: usize) -> Self {
        self.max_retries = max;
        self
    }

    /// Set the backoff base delay.
    #[must_use]
    pub const fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Set the backoff ceiling that triggers credential rotation.
    #[must_use]
    pub const fn with_rotation_ceiling(mut self, ceiling: Duration) -> Self {
        self.rotation_ceiling = ceiling;
        self
    }

    /// Set the backoff jitter bound.
    #[must_use]
    pub const fn with_backoff_jitter(mut self, jitter: Duration) -> Self {
        self.backoff_jitter = jitter;
        self
    }

    /// Set the pre-call pause range. `max` below `min` is treated as `min`.
    #[must_use]
    pub const fn with_request_jitter(mut self, min: Duration, max: Duration) -> Self {
        self.request_jitter_min = min;
        self.request_jitter_max = max;
        self
    }

    /// `base_delay * 2^step`, saturating.
    #[must_use]
    pub fn backoff_for(&self, step: u32) -> Duration {
        let factor = 2u32.checked_pow(step).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

/// Configuration for the identification state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Extraction attempts per request before returning NONE (default: 2).
    pub max_attempts: usize,
    /// Service-call retry behaviour shared by every stage.
    pub retry: RetryPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            retry: RetryPolicy::default(),
        }
    }
}

impl PipelineConfig {
    /// Set the number of extraction attempts. Zero is treated as one.
    #[must_use]
    pub const fn with_max_attempts(mut self, max: usize) -> Self {
        self.max_attempts = max;
        self
    }

    /// Set the service-call retry policy.
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}
