//! The identification state machine.
//!
//! ```text
//! EXTRACT ──► VALIDATE ──► FINALIZE ──► ACCEPT
//!    ▲  │          │           │
//!    │  └──────────┴───────────┴──► RETRY ──► FAIL
//!    └─────────────────────────────────┘
//! ```
//!
//! One [`Orchestrator`] owns its credential pool, conversation session and
//! rejected set. Independent instances can run in parallel without sharing
//! state.

use partscan_gemini::{CredentialPool, ImagePayload};
use serde::Serialize;
use std::fmt;
use std::time::Instant;

use crate::brand::{BrandCatalog, BrandProfile};
use crate::candidate::{Candidate, CandidateState, RejectedSet};
use crate::canonicalizer::Canonicalizer;
use crate::config::PipelineConfig;
use crate::dispatch::Dispatcher;
use crate::error::{AttemptRecord, PipelineError};
use crate::metrics::PipelineMetrics;
use crate::protocol::{NONE, TORN_MARKER};
use crate::service::InferenceService;
use crate::session::ConversationSession;
use crate::stages::{Confirmation, Extractor, Finalizer, RetryReason, StageOutcome, Validator};

/// A confirmed, canonicalized part number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identification {
    /// Canonical form.
    pub part_number: String,
    /// The confirmed value before canonicalization.
    pub raw: String,
    /// The re-scan flagged the sticker as torn.
    pub torn_sticker: bool,
    /// Lower-cased brand.
    pub brand: String,
}

/// What an identification request produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// A confirmed part number.
    Accepted(Identification),
    /// Every attempt was exhausted without confirmation.
    NotFound,
}

impl Outcome {
    /// The identification, if accepted.
    #[must_use]
    pub const fn identification(&self) -> Option<&Identification> {
        match self {
            Self::Accepted(id) => Some(id),
            Self::NotFound => None,
        }
    }

    /// Whether this is [`Outcome::NotFound`].
    #[must_use]
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

/// Prints the canonical part number (with a leading `!` when torn) or `NONE`.
impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Accepted(id) if id.torn_sticker => write!(f, "{TORN_MARKER}{}", id.part_number),
            Self::Accepted(id) => f.write_str(&id.part_number),
            Self::NotFound => f.write_str(NONE),
        }
    }
}

/// Terminal state reached by a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TerminalState {
    /// A candidate was confirmed.
    Accept,
    /// Attempts ran out.
    Fail,
}

/// Full result of [`Orchestrator::identify`].
#[derive(Debug, Clone, Serialize)]
pub struct IdentificationReport {
    /// The answer.
    pub outcome: Outcome,
    /// How the state machine ended.
    pub terminal: TerminalState,
    /// One record per extraction attempt, in order.
    pub attempts: Vec<AttemptRecord>,
    /// Counters for this request.
    pub metrics: PipelineMetrics,
}

enum State {
    Extract,
    Validate(Candidate),
    Finalize(Candidate),
    Retry(RetryReason),
    Accept(Identification),
    Fail,
}

/// Drives extraction, validation and finalization for one brand.
pub struct Orchestrator<S> {
    profile: BrandProfile,
    canonicalizer: Canonicalizer,
    extractor: Extractor,
    validator: Validator,
    finalizer: Finalizer,
    session: ConversationSession,
    rejected: RejectedSet,
    dispatcher: Dispatcher<S>,
    config: PipelineConfig,
}

impl<S: InferenceService> Orchestrator<S> {
    /// Creates an orchestrator for a resolved brand profile.
    #[must_use]
    pub fn new(
        service: S,
        credentials: CredentialPool,
        profile: BrandProfile,
        config: PipelineConfig,
    ) -> Self {
        Self {
            canonicalizer: Canonicalizer::for_profile(&profile),
            extractor: Extractor::new(&profile),
            validator: Validator::new(&profile),
            finalizer: Finalizer::new(&profile),
            session: ConversationSession::new(),
            rejected: RejectedSet::new(),
            dispatcher: Dispatcher::new(service, credentials, config.retry.clone()),
            profile,
            config,
        }
    }

    /// Resolves `brand` in the catalog, then calls [`Self::new`].
    #[must_use]
    pub fn for_brand(
        service: S,
        credentials: CredentialPool,
        catalog: &BrandCatalog,
        brand: &str,
        config: PipelineConfig,
    ) -> Self {
        Self::new(service, credentials, catalog.resolve(brand), config)
    }

    /// The brand profile in use.
    #[must_use]
    pub const fn profile(&self) -> &BrandProfile {
        &self.profile
    }

    /// The state machine configuration.
    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Candidates rejected so far in the current request.
    #[must_use]
    pub const fn rejected(&self) -> &RejectedSet {
        &self.rejected
    }

    /// The current conversation.
    #[must_use]
    pub const fn session(&self) -> &ConversationSession {
        &self.session
    }

    /// The credential pool and its current position.
    #[must_use]
    pub const fn credentials(&self) -> &CredentialPool {
        self.dispatcher.credentials()
    }

    /// The wrapped service.
    #[must_use]
    pub const fn service(&self) -> &S {
        self.dispatcher.service()
    }

    /// Identifies the part number in `image`.
    ///
    /// Returns [`Outcome::NotFound`] when attempts run out; that is not an
    /// error.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError` when a service call fails fatally or its
    /// retries are exhausted.
    pub async fn identify(
        &mut self,
        image: &ImagePayload,
    ) -> Result<IdentificationReport, PipelineError> {
        self.session.reset();
        self.rejected.clear();

        let started = Instant::now();
        let before = self.dispatcher.stats();
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0usize;
        let mut attempts: Vec<AttemptRecord> = Vec::with_capacity(max_attempts);
        let mut record = new_record(0);
        let mut state = State::Extract;

        tracing::info!(brand = %self.profile.brand, max_attempts, "Starting identification");

        let (outcome, terminal) = loop {
            state = match state {
                State::Extract => {
                    attempt += 1;
                    record = new_record(attempt);
                    let outcome = self
                        .extractor
                        .run(
                            &mut self.dispatcher,
                            &mut self.session,
                            image,
                            attempt > 1,
                            &self.rejected,
                        )
                        .await;
                    record.raw_reply = self.session.last_reply().unwrap_or_default().to_string();

                    match outcome {
                        StageOutcome::Success(candidate) => {
                            tracing::info!(
                                attempt,
                                candidate = candidate.value(),
                                "Candidate extracted"
                            );
                            record.candidate = Some(candidate.value().to_string());
                            record.final_state = Some(candidate.state());
                            if self.rejected.contains(candidate.value()) {
                                State::Retry(RetryReason::AlreadyRejected(
                                    candidate.value().to_string(),
                                ))
                            } else {
                                State::Validate(candidate)
                            }
                        }
                        StageOutcome::Retryable(reason) => State::Retry(reason),
                        StageOutcome::Fatal(e) => return Err(self.abort(e)),
                    }
                }

                State::Validate(mut candidate) => {
                    let outcome = self
                        .validator
                        .run(&mut self.dispatcher, &candidate, &self.rejected, image)
                        .await;

                    match outcome {
                        StageOutcome::Success(()) => {
                            candidate
                                .advance(CandidateState::Validated)
                                .map_err(|e| self.abort(e))?;
                            record.final_state = Some(candidate.state());
                            State::Finalize(candidate)
                        }
                        StageOutcome::Retryable(reason) => {
                            candidate
                                .advance(CandidateState::Rejected)
                                .map_err(|e| self.abort(e))?;
                            record.final_state = Some(candidate.state());
                            State::Retry(reason)
                        }
                        StageOutcome::Fatal(e) => return Err(self.abort(e)),
                    }
                }

                State::Finalize(mut candidate) => {
                    let outcome = self
                        .finalizer
                        .run(&mut self.dispatcher, candidate.value(), image)
                        .await;

                    match outcome {
                        StageOutcome::Success(confirmation) => {
                            candidate
                                .advance(CandidateState::Confirmed)
                                .map_err(|e| self.abort(e))?;
                            record.final_state = Some(candidate.state());
                            State::Accept(self.identification(confirmation))
                        }
                        StageOutcome::Retryable(reason) => {
                            candidate
                                .advance(CandidateState::Rejected)
                                .map_err(|e| self.abort(e))?;
                            record.final_state = Some(candidate.state());
                            State::Retry(reason)
                        }
                        StageOutcome::Fatal(e) => return Err(self.abort(e)),
                    }
                }

                State::Retry(reason) => {
                    if reason.is_rejection() {
                        if let Some(candidate) = reason.candidate() {
                            self.rejected.insert(candidate);
                        }
                    }
                    tracing::warn!(
                        attempt,
                        max_attempts,
                        reason = %reason,
                        rejected = self.rejected.len(),
                        "Attempt failed"
                    );
                    record.rejection = Some(reason.to_string());
                    record.elapsed = started.elapsed();
                    attempts.push(std::mem::replace(&mut record, new_record(0)));

                    if attempt < max_attempts {
                        State::Extract
                    } else {
                        State::Fail
                    }
                }

                State::Accept(identification) => {
                    record.elapsed = started.elapsed();
                    attempts.push(std::mem::replace(&mut record, new_record(0)));
                    tracing::info!(
                        attempt,
                        part_number = %identification.part_number,
                        torn_sticker = identification.torn_sticker,
                        "Part number accepted"
                    );
                    break (Outcome::Accepted(identification), TerminalState::Accept);
                }

                State::Fail => {
                    tracing::info!(attempts = attempt, "No part number confirmed");
                    break (Outcome::NotFound, TerminalState::Fail);
                }
            };
        };

        self.session.reset();
        self.rejected.clear();

        Ok(IdentificationReport {
            outcome,
            terminal,
            attempts,
            metrics: PipelineMetrics::from_stats(
                attempt,
                before,
                self.dispatcher.stats(),
                started.elapsed(),
            ),
        })
    }

    /// Runs only the finalizer against a number obtained elsewhere.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError` when the re-scan call fails.
    pub async fn verify(
        &mut self,
        number: &str,
        image: &ImagePayload,
    ) -> Result<Outcome, PipelineError> {
        match self.finalizer.run(&mut self.dispatcher, number, image).await {
            StageOutcome::Success(confirmation) => {
                Ok(Outcome::Accepted(self.identification(confirmation)))
            }
            StageOutcome::Retryable(reason) => {
                tracing::info!(reason = %reason, "Verification did not confirm the number");
                Ok(Outcome::NotFound)
            }
            StageOutcome::Fatal(e) => Err(e),
        }
    }

    /// Drops per-request state before a fatal error leaves `identify`.
    fn abort(&mut self, error: PipelineError) -> PipelineError {
        tracing::error!(error = %error, rejected = self.rejected.len(), "Identification aborted");
        self.session.reset();
        self.rejected.clear();
        error
    }

    fn identification(&self, confirmation: Confirmation) -> Identification {
        Identification {
            part_number: self.canonicalizer.canonicalize(&confirmation.value),
            raw: confirmation.value,
            torn_sticker: confirmation.torn,
            brand: self.profile.brand.clone(),
        }
    }
}

fn new_record(attempt_number: usize) -> AttemptRecord {
    AttemptRecord {
        attempt_number,
        raw_reply: String::new(),
        candidate: None,
        final_state: None,
        rejection: None,
        elapsed: std::time::Duration::ZERO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accepted(part_number: &str, torn: bool) -> Outcome {
        Outcome::Accepted(Identification {
            part_number: part_number.to_string(),
            raw: part_number.to_string(),
            torn_sticker: torn,
            brand: "audi".to_string(),
        })
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(accepted("5K0 937 087", false).to_string(), "5K0 937 087");
        assert_eq!(accepted("5K0 937 087", true).to_string(), "!5K0 937 087");
        assert_eq!(Outcome::NotFound.to_string(), "NONE");
    }

    #[test]
    fn test_outcome_serializes_with_status_tag() {
        let json = serde_json::to_value(accepted("1J0 959 655", false)).unwrap();
        assert_eq!(json["status"], "accepted");
        assert_eq!(json["part_number"], "1J0 959 655");

        let json = serde_json::to_value(Outcome::NotFound).unwrap();
        assert_eq!(json["status"], "not_found");
    }

    #[test]
    fn test_terminal_state_serializes_uppercase() {
        assert_eq!(serde_json::to_value(TerminalState::Accept).unwrap(), "ACCEPT");
        assert_eq!(serde_json::to_value(TerminalState::Fail).unwrap(), "FAIL");
    }
}
