//! End-to-end tests against the live Gemini API.
//!
//! These tests require network access and real API keys. They are marked
//! `#[ignore]` to prevent CI failures in environments without credentials.
//!
//! ## Requirements
//!
//! - `GEMINI_API_KEYS` (comma-separated) or `GEMINI_API_KEY` set
//! - `PARTSCAN_E2E_IMAGE` pointing at a photo of a labelled part
//!
//! ## Running E2E Tests
//!
//! ```bash
//! cargo test -p partscan-gemini -- --ignored
//! ```
//!
//! Note: replies are non-deterministic. These tests check the transport and
//! the delimiter contract, not a specific part number.

use partscan_gemini::{
    discover_api_keys, ClientConfig, CredentialPool, GeminiClient, GeminiError, ImagePayload,
    InferenceRequest,
};

fn live_pool() -> Option<CredentialPool> {
    discover_api_keys(Vec::new())
        .ok()
        .and_then(|keys| CredentialPool::new(keys).ok())
}

#[tokio::test]
#[ignore = "Requires GEMINI_API_KEYS and network access"]
async fn e2e_text_only_round_trip() {
    let Some(pool) = live_pool() else {
        eprintln!("Skipping: no API keys configured");
        return;
    };

    let client = GeminiClient::new(ClientConfig::default()).expect("client");
    let request = InferenceRequest {
        parts: vec![partscan_gemini::Part::text(
            "Reply with exactly: <START> NONE <END>",
        )],
        ..InferenceRequest::default()
    };

    let result = client.generate(pool.current().key(), &request).await;
    match result {
        Ok(result) => {
            assert!(result.text.contains("<START>"), "got: {}", result.text);
            assert!(result.text.contains("<END>"), "got: {}", result.text);
        }
        Err(e) if e.is_quota() => eprintln!("Skipping assertion: quota exhausted ({e})"),
        Err(e) => panic!("unexpected error: {e}"),
    }
}

#[tokio::test]
#[ignore = "Requires GEMINI_API_KEYS, PARTSCAN_E2E_IMAGE and network access"]
async fn e2e_image_prompt_round_trip() {
    let Some(pool) = live_pool() else {
        eprintln!("Skipping: no API keys configured");
        return;
    };
    let Ok(path) = std::env::var("PARTSCAN_E2E_IMAGE") else {
        eprintln!("Skipping: PARTSCAN_E2E_IMAGE not set");
        return;
    };

    let bytes = tokio::fs::read(&path).await.expect("read image");
    let request = InferenceRequest::with_image(
        ImagePayload::from_bytes(bytes),
        "Read the largest part number on the label. Respond strictly as <START>number<END> or <START>NONE<END>.",
    );

    let client = GeminiClient::new(ClientConfig::default()).expect("client");
    let result = client.generate(pool.current().key(), &request).await;

    match result {
        Ok(result) => assert!(!result.text.is_empty()),
        Err(e) if e.is_quota() => eprintln!("Skipping assertion: quota exhausted ({e})"),
        Err(e) => panic!("unexpected error: {e}"),
    }
}

#[tokio::test]
#[ignore = "Requires network access"]
async fn e2e_invalid_key_is_not_retryable() {
    let client = GeminiClient::new(ClientConfig::default()).expect("client");
    let request = InferenceRequest {
        parts: vec![partscan_gemini::Part::text("ping")],
        ..InferenceRequest::default()
    };

    let err = client
        .generate("definitely-not-a-valid-key", &request)
        .await
        .expect_err("invalid key must fail");

    assert!(matches!(err, GeminiError::Api { .. }), "got: {err:?}");
    assert!(!err.is_quota());
    assert!(!err.is_transient());
}
