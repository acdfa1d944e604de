//! Error types for identification runs with attempt history tracking.

use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

use crate::candidate::CandidateState;

/// Record of a single identification attempt and how it ended.
#[derive(Debug, Clone, Serialize)]
pub struct AttemptRecord {
    /// The attempt number (1-indexed).
    pub attempt_number: usize,
    /// Raw extractor reply text.
    pub raw_reply: String,
    /// Parsed candidate, `None` when the reply carried no usable value.
    pub candidate: Option<String>,
    /// Furthest state the candidate reached.
    pub final_state: Option<CandidateState>,
    /// Why the attempt did not end in acceptance, if it didn't.
    pub rejection: Option<String>,
    /// Elapsed time since the run started.
    #[serde(with = "duration_millis")]
    pub elapsed: Duration,
}

mod duration_millis {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }
}

/// Classified failure of a single inference-service call.
#[derive(Debug, Clone, Error)]
pub enum ServiceError {
    /// Rate or usage limit hit; retry with backoff and credential rotation.
    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Temporary failure; retry within the per-call budget.
    #[error("Transient service error: {0}")]
    Transient(String),

    /// Anything else; never retried.
    #[error("Service error: {0}")]
    Fatal(String),
}

impl From<partscan_gemini::GeminiError> for ServiceError {
    fn from(e: partscan_gemini::GeminiError) -> Self {
        if e.is_quota() {
            Self::QuotaExceeded(e.to_string())
        } else if e.is_transient() {
            Self::Transient(e.to_string())
        } else {
            Self::Fatal(e.to_string())
        }
    }
}

/// Errors that abort an identification request and surface to the caller.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The per-call retry budget ran out on quota or transient failures.
    #[error("Service call failed after {attempts} retries: {last_error}")]
    RetriesExhausted {
        /// Number of calls made.
        attempts: usize,
        /// The last classified failure.
        last_error: ServiceError,
    },

    /// A non-retryable service failure.
    #[error("Fatal service error: {0}")]
    Service(ServiceError),

    /// A candidate was asked to move backwards or skip a state.
    #[error("Invalid candidate transition from {from:?} to {to:?}")]
    InvalidTransition {
        /// State before the attempted move.
        from: CandidateState,
        /// Requested state.
        to: CandidateState,
    },

    /// Brand configuration could not be read or parsed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Reading a configuration file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
