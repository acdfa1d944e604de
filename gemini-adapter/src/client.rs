use crate::error::GeminiError;
use crate::request::{body_for, ErrorEnvelope, GenerateContentResponse};
use crate::types::{ClientConfig, GenerateResult, InferenceRequest};
use std::time::Instant;

/// Sends one `generateContent` request with the given API key.
pub async fn generate_content(
    http: &reqwest::Client,
    config: &ClientConfig,
    api_key: &str,
    request: &InferenceRequest,
) -> Result<GenerateResult, GeminiError> {
    let url = format!(
        "{}/models/{}:generateContent",
        config.base_url, config.model
    );
    let body = body_for(request, config);
    let start_time = Instant::now();

    tracing::debug!(
        model = %config.model,
        history_turns = request.history.len(),
        "Sending generateContent request"
    );

    let response = http
        .post(&url)
        .header("x-goog-api-key", api_key)
        .json(&body)
        .send()
        .await?;

    let status = response.status();
    let raw = response.text().await?;
    let duration_ms = u64::try_from(start_time.elapsed().as_millis()).unwrap_or(u64::MAX);

    if !status.is_success() {
        let (api_status, message) = match serde_json::from_str::<ErrorEnvelope>(&raw) {
            Ok(envelope) => (envelope.error.status, envelope.error.message),
            Err(_) => (None, raw),
        };
        tracing::debug!(status = status.as_u16(), ?api_status, "generateContent failed");
        return Err(GeminiError::from_status(status.as_u16(), api_status, message));
    }

    let parsed: GenerateContentResponse = serde_json::from_str(&raw)?;

    let Some(text) = parsed.first_text() else {
        let reason = parsed
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .or_else(|| parsed.candidates.first().and_then(|c| c.finish_reason.clone()))
            .unwrap_or_else(|| "no candidates".to_string());
        return Err(GeminiError::InvalidResponse(format!(
            "reply carried no text ({reason})"
        )));
    };

    if let Some(usage) = &parsed.usage_metadata {
        tracing::debug!(
            prompt_tokens = ?usage.prompt_token_count,
            reply_tokens = ?usage.candidates_token_count,
            total_tokens = ?usage.total_token_count,
            duration_ms,
            "generateContent usage"
        );
    }

    Ok(GenerateResult {
        text,
        duration_ms,
        usage: parsed.usage_metadata,
    })
}
