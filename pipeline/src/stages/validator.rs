//! Independent second opinion on an extracted candidate.

use partscan_gemini::{ImagePayload, InferenceRequest, Part};

use super::{RetryReason, StageOutcome};
use crate::brand::BrandProfile;
use crate::candidate::{Candidate, RejectedSet};
use crate::dispatch::Dispatcher;
use crate::error::PipelineError;
use crate::prompts::build_validation_prompt;
use crate::protocol::is_valid_verdict;
use crate::service::InferenceService;

/// Second stage: asks the service to judge the candidate.
#[derive(Debug, Clone)]
pub struct Validator {
    template: String,
}

impl Validator {
    /// Uses the profile's validation template.
    #[must_use]
    pub fn new(profile: &BrandProfile) -> Self {
        Self {
            template: profile.prompts.validation_prompt.clone(),
        }
    }

    /// Asks the service whether `candidate` is correct. Accepts only on an explicit `<VALID>`.
    ///
    /// The request is single-turn and leaves the extraction conversation untouched.
    ///
    /// # Errors
    ///
    /// Propagates dispatcher failures.
    pub async fn validate<S: InferenceService>(
        &self,
        dispatcher: &mut Dispatcher<S>,
        candidate: &Candidate,
        rejected: &RejectedSet,
        image: &ImagePayload,
    ) -> Result<bool, PipelineError> {
        let prompt = build_validation_prompt(&self.template, candidate.value(), rejected);
        let request = InferenceRequest {
            system_instruction: None,
            history: Vec::new(),
            parts: vec![Part::InlineImage(image.clone()), Part::text(prompt)],
        };

        let reply = dispatcher.call(&request).await?;
        let valid = is_valid_verdict(&reply);
        tracing::debug!(candidate = candidate.value(), valid, "Validator reply");
        Ok(valid)
    }

    /// Runs [`Self::validate`] and tags the verdict.
    pub async fn run<S: InferenceService>(
        &self,
        dispatcher: &mut Dispatcher<S>,
        candidate: &Candidate,
        rejected: &RejectedSet,
        image: &ImagePayload,
    ) -> StageOutcome<()> {
        match self
            .validate(dispatcher, candidate, rejected, image)
            .await
        {
            Ok(true) => StageOutcome::Success(()),
            Ok(false) => {
                StageOutcome::Retryable(RetryReason::Invalid(candidate.value().to_string()))
            }
            Err(e) => StageOutcome::Fatal(e),
        }
    }
}
