//! Asks the service to read a part number off the image.

use partscan_gemini::{ImagePayload, InferenceRequest, Part};

use super::{RetryReason, StageOutcome};
use crate::brand::BrandProfile;
use crate::candidate::{Candidate, RejectedSet};
use crate::dispatch::Dispatcher;
use crate::error::PipelineError;
use crate::prompts::build_extraction_prompt;
use crate::protocol::{parse_answer, Answer};
use crate::service::InferenceService;
use crate::session::ConversationSession;

/// First stage: image in, raw candidate out.
#[derive(Debug, Clone)]
pub struct Extractor {
    brand: String,
    main_prompt: String,
}

impl Extractor {
    /// Uses the profile's main prompt as the system instruction.
    #[must_use]
    pub fn new(profile: &BrandProfile) -> Self {
        Self {
            brand: profile.brand.clone(),
            main_prompt: profile.prompts.main_prompt.clone(),
        }
    }

    /// Sends the image with the extraction prompt and returns the raw reply.
    ///
    /// The exchange is appended to `session` so later calls see it.
    ///
    /// # Errors
    ///
    /// Propagates dispatcher failures.
    pub async fn extract<S: InferenceService>(
        &self,
        dispatcher: &mut Dispatcher<S>,
        session: &mut ConversationSession,
        image: &ImagePayload,
        is_retry: bool,
        rejected: &RejectedSet,
    ) -> Result<String, PipelineError> {
        let prompt = build_extraction_prompt(is_retry, rejected);
        let request = InferenceRequest {
            system_instruction: Some(self.main_prompt.clone()),
            history: session.history().to_vec(),
            parts: vec![Part::InlineImage(image.clone()), Part::text(prompt.clone())],
        };

        let reply = dispatcher.call(&request).await?;
        tracing::debug!(brand = %self.brand, is_retry, reply = %reply, "Extractor reply");
        session.record_exchange(vec![Part::text(prompt)], reply.clone());
        Ok(reply)
    }

    /// Turns a raw reply into a candidate, or `None` for NONE and malformed replies.
    #[must_use]
    pub fn parse(&self, raw: &str) -> Option<Candidate> {
        match parse_answer(raw) {
            Answer::Value(value) => Some(Candidate::new(value, self.brand.clone())),
            Answer::None => None,
        }
    }

    /// Runs [`Self::extract`] then [`Self::parse`].
    pub async fn run<S: InferenceService>(
        &self,
        dispatcher: &mut Dispatcher<S>,
        session: &mut ConversationSession,
        image: &ImagePayload,
        is_retry: bool,
        rejected: &RejectedSet,
    ) -> StageOutcome<Candidate> {
        match self
            .extract(dispatcher, session, image, is_retry, rejected)
            .await
        {
            Ok(raw) => self
                .parse(&raw)
                .map_or(StageOutcome::Retryable(RetryReason::NoCandidate), StageOutcome::Success),
            Err(e) => StageOutcome::Fatal(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{dispatcher, image, ScriptedService};

    fn extractor() -> Extractor {
        Extractor::new(&BrandProfile::fallback("audi"))
    }

    #[test]
    fn test_parse_delimited_value() {
        let c = extractor()
            .parse("I can see it. <START> 5K0 937 087 AC <END> Done.")
            .unwrap();
        assert_eq!(c.value(), "5K0 937 087 AC");
        assert_eq!(c.brand(), "audi");
    }

    #[test]
    fn test_parse_none_and_malformed() {
        let e = extractor();
        assert!(e.parse("<START> NONE <END>").is_none());
        assert!(e.parse("<START>none<END>").is_none());
        assert!(e.parse("the number is 5K0 937 087").is_none());
        assert!(e.parse("<START> 5K0 937 087").is_none());
    }

    #[tokio::test]
    async fn test_extract_records_exchange() {
        let mut d = dispatcher(ScriptedService::replying(&["<START> NONE <END>"]));
        let mut session = ConversationSession::new();

        let outcome = extractor()
            .run(&mut d, &mut session, &image(), false, &RejectedSet::new())
            .await;
        assert!(matches!(outcome, StageOutcome::Retryable(RetryReason::NoCandidate)));
        assert_eq!(session.len(), 2);
        assert_eq!(session.last_reply(), Some("<START> NONE <END>"));

        let request = d.service().last_request();
        assert!(request.system_instruction.is_some());
        assert!(request.history.is_empty());
        assert!(matches!(request.parts[0], Part::InlineImage(_)));
    }

    #[tokio::test]
    async fn test_retry_sends_history_and_nudge() {
        let mut d = dispatcher(ScriptedService::replying(&[
            "<START> NONE <END>",
            "<START> 1J0 959 655 <END>",
        ]));
        let mut session = ConversationSession::new();
        let mut rejected = RejectedSet::new();
        rejected.insert("1J0 959 656");
        let e = extractor();

        e.run(&mut d, &mut session, &image(), false, &rejected).await;
        let outcome = e.run(&mut d, &mut session, &image(), true, &rejected).await;

        let StageOutcome::Success(candidate) = outcome else {
            panic!("expected a candidate");
        };
        assert_eq!(candidate.value(), "1J0 959 655");

        let request = d.service().last_request();
        assert_eq!(request.history.len(), 2);
        let nudge = request.parts[1].as_text().unwrap();
        assert!(nudge.contains("not correct"));
        assert!(nudge.contains("1J0 959 656"));
    }

    #[tokio::test]
    async fn test_service_failure_is_fatal() {
        let mut d = dispatcher(ScriptedService::new(vec![]));
        let outcome = extractor()
            .run(
                &mut d,
                &mut ConversationSession::new(),
                &image(),
                false,
                &RejectedSet::new(),
            )
            .await;
        assert!(matches!(outcome, StageOutcome::Fatal(PipelineError::Service(_))));
    }
}
