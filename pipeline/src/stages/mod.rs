//! The three verification stages and the tagged outcome they return.
//!
//! Stages never decide what happens next. Each returns a [`StageOutcome`]
//! and the orchestrator interprets it.

pub mod extractor;
pub mod finalizer;
pub mod validator;

pub use extractor::Extractor;
pub use finalizer::{Confirmation, Finalizer, Verdict};
pub use validator::Validator;

use std::fmt;

use crate::error::PipelineError;

/// Result of running one stage.
#[derive(Debug)]
pub enum StageOutcome<T> {
    /// The stage produced its value.
    Success(T),
    /// The attempt failed in a way another extraction attempt may fix.
    Retryable(RetryReason),
    /// The request must be aborted.
    Fatal(PipelineError),
}

impl<T> StageOutcome<T> {
    /// Whether this is [`StageOutcome::Success`].
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// Why an attempt ended without acceptance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryReason {
    /// The extractor answered NONE or the reply was malformed.
    NoCandidate,
    /// The extractor repeated a reading rejected earlier in this request.
    AlreadyRejected(String),
    /// The validator did not accept the candidate.
    Invalid(String),
    /// The candidate matched none of the brand's segment patterns.
    WrongFormat(String),
    /// The re-scan could not locate the candidate in the image.
    NotConfirmed(String),
}

impl RetryReason {
    /// The candidate involved, if any.
    #[must_use]
    pub fn candidate(&self) -> Option<&str> {
        match self {
            Self::NoCandidate => None,
            Self::AlreadyRejected(c)
            | Self::Invalid(c)
            | Self::WrongFormat(c)
            | Self::NotConfirmed(c) => Some(c),
        }
    }

    /// Whether a validation or finalization pass rejected the candidate.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(self, Self::Invalid(_) | Self::WrongFormat(_) | Self::NotConfirmed(_))
    }
}

impl fmt::Display for RetryReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCandidate => write!(f, "no part number found"),
            Self::AlreadyRejected(c) => write!(f, "{c} was already rejected"),
            Self::Invalid(c) => write!(f, "{c} failed validation"),
            Self::WrongFormat(c) => write!(f, "{c} matches no known format"),
            Self::NotConfirmed(c) => write!(f, "{c} not found on re-scan"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejections_carry_candidate() {
        let reason = RetryReason::WrongFormat("AB 12".to_string());
        assert!(reason.is_rejection());
        assert_eq!(reason.candidate(), Some("AB 12"));
        assert_eq!(reason.to_string(), "AB 12 matches no known format");
    }

    #[test]
    fn test_no_candidate_and_repeats_are_not_rejections() {
        assert!(!RetryReason::NoCandidate.is_rejection());
        assert!(!RetryReason::AlreadyRejected("X".to_string()).is_rejection());
        assert_eq!(RetryReason::NoCandidate.candidate(), None);
    }
}
