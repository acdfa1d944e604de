//! Final confirmation: a structural pre-check, then a targeted re-scan.

use partscan_gemini::{ImagePayload, InferenceRequest};

use super::{RetryReason, StageOutcome};
use crate::brand::{BrandFormatSpec, BrandProfile};
use crate::canonicalizer::Canonicalizer;
use crate::dispatch::Dispatcher;
use crate::error::PipelineError;
use crate::prompts::build_final_scan_prompt;
use crate::protocol::{parse_answer, Answer, TORN_MARKER};
use crate::service::InferenceService;

/// A candidate the re-scan located in the image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    /// The value as returned by the re-scan, torn marker removed.
    pub value: String,
    /// The service reported the sticker as torn.
    pub torn: bool,
}

/// Outcome of [`Finalizer::finalize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Located in the image.
    Confirmed(Confirmation),
    /// Rejected by the pre-check; the service was not called.
    WrongFormat,
    /// The re-scan answered NONE or no answer could be parsed.
    NotFound,
}

/// Third stage.
#[derive(Debug, Clone)]
pub struct Finalizer {
    format: Option<BrandFormatSpec>,
    canonicalizer: Canonicalizer,
}

impl Finalizer {
    /// Uses the profile's format spec for the pre-check, if it has one.
    #[must_use]
    pub fn new(profile: &BrandProfile) -> Self {
        Self {
            format: profile.format.clone(),
            canonicalizer: Canonicalizer::for_profile(profile),
        }
    }

    /// Whether `candidate`, as read or re-segmented, fits one of the brand's
    /// segment patterns.
    ///
    /// Always true for brands without a format spec.
    #[must_use]
    pub fn precheck(&self, candidate: &str) -> bool {
        self.checked_form(candidate).is_some()
    }

    /// The form of `candidate` that passes the pre-check: the reading itself
    /// when its segments fit, otherwise its canonical re-segmentation.
    fn checked_form(&self, candidate: &str) -> Option<String> {
        let Some(spec) = &self.format else {
            return Some(candidate.to_string());
        };
        if spec.accepts(candidate) {
            return Some(candidate.to_string());
        }
        let canonical = self.canonicalizer.canonicalize(candidate);
        spec.accepts(&canonical).then_some(canonical)
    }

    /// Checks the structure, then asks the service to find the exact candidate.
    ///
    /// The re-scan is a fresh, single-turn request for the form that passed
    /// the pre-check.
    ///
    /// # Errors
    ///
    /// Propagates dispatcher failures.
    pub async fn finalize<S: InferenceService>(
        &self,
        dispatcher: &mut Dispatcher<S>,
        candidate: &str,
        image: &ImagePayload,
    ) -> Result<Verdict, PipelineError> {
        let Some(checked) = self.checked_form(candidate) else {
            tracing::warn!(candidate, "Candidate matches no accepted format");
            return Ok(Verdict::WrongFormat);
        };
        if checked != candidate {
            tracing::debug!(
                candidate,
                resegmented = %checked,
                "Pre-check passed after re-segmenting"
            );
        }

        let request =
            InferenceRequest::with_image(image.clone(), build_final_scan_prompt(&checked));
        let reply = dispatcher.call(&request).await?;
        tracing::debug!(candidate = %checked, reply = %reply, "Finalizer reply");

        Ok(match parse_answer(&reply) {
            Answer::Value(value) => {
                confirmation(&value).map_or(Verdict::NotFound, Verdict::Confirmed)
            }
            Answer::None => Verdict::NotFound,
        })
    }

    /// Runs [`Self::finalize`] and tags the verdict.
    pub async fn run<S: InferenceService>(
        &self,
        dispatcher: &mut Dispatcher<S>,
        candidate: &str,
        image: &ImagePayload,
    ) -> StageOutcome<Confirmation> {
        match self.finalize(dispatcher, candidate, image).await {
            Ok(Verdict::Confirmed(c)) => StageOutcome::Success(c),
            Ok(Verdict::WrongFormat) => {
                StageOutcome::Retryable(RetryReason::WrongFormat(candidate.to_string()))
            }
            Ok(Verdict::NotFound) => {
                StageOutcome::Retryable(RetryReason::NotConfirmed(candidate.to_string()))
            }
            Err(e) => StageOutcome::Fatal(e),
        }
    }
}

fn confirmation(value: &str) -> Option<Confirmation> {
    let (torn, rest) = match value.strip_prefix(TORN_MARKER) {
        Some(rest) => (true, rest.trim()),
        None => (false, value),
    };
    // A bare "!" carries no number.
    (!rest.is_empty()).then(|| Confirmation {
        value: rest.to_string(),
        torn,
    })
}
