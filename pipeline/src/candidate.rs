//! Candidate part numbers and the per-request set of rejected candidates.

use serde::Serialize;

use crate::error::PipelineError;

/// Verification state of a candidate.
///
/// Moves strictly forward: `Unverified → Validated → Confirmed`, with
/// `Rejected` reachable from `Unverified` or `Validated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateState {
    /// Parsed from the extractor, not yet checked.
    Unverified,
    /// Accepted by the validator.
    Validated,
    /// Rejected by the validator or the finalizer.
    Rejected,
    /// Located in the image by the finalizer.
    Confirmed,
}

impl CandidateState {
    const fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Unverified, Self::Validated | Self::Rejected)
                | (Self::Validated, Self::Confirmed | Self::Rejected)
        )
    }

    /// Whether no further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Rejected | Self::Confirmed)
    }
}

/// A raw candidate part number for one brand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    value: String,
    brand: String,
    state: CandidateState,
}

impl Candidate {
    /// A fresh, unverified candidate.
    #[must_use]
    pub fn new(value: impl Into<String>, brand: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            brand: brand.into(),
            state: CandidateState::Unverified,
        }
    }

    /// The raw candidate string.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Lower-cased brand tag.
    #[must_use]
    pub fn brand(&self) -> &str {
        &self.brand
    }

    /// Current verification state.
    #[must_use]
    pub const fn state(&self) -> CandidateState {
        self.state
    }

    /// Moves the candidate to `next`.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::InvalidTransition` when `next` would skip a
    /// state or move backwards.
    pub fn advance(&mut self, next: CandidateState) -> Result<(), PipelineError> {
        if !self.state.can_advance_to(next) {
            return Err(PipelineError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }
}

/// Rejected candidate strings for one identification request.
///
/// Keeps insertion order and ignores duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RejectedSet {
    values: Vec<String>,
}

impl RejectedSet {
    /// An empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a rejection. Returns `false` if it was already present.
    pub fn insert(&mut self, value: impl Into<String>) -> bool {
        let value = value.into();
        if self.values.contains(&value) {
            return false;
        }
        self.values.push(value);
        true
    }

    /// Whether `value` was already rejected in this request.
    #[must_use]
    pub fn contains(&self, value: &str) -> bool {
        self.values.iter().any(|v| v == value)
    }

    /// Number of distinct rejections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether nothing has been rejected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Rejections in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(String::as_str)
    }

    /// Comma-separated rendering for prompt templates.
    #[must_use]
    pub fn joined(&self) -> String {
        self.values.join(", ")
    }

    /// Forgets all rejections.
    pub fn clear(&mut self) {
        self.values.clear();
    }
}
