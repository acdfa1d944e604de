//! Wire-format construction for `generateContent` calls.

use crate::types::{
    ClientConfig, GenerationConfig, InferenceRequest, Part, Role, SafetySetting, Turn,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateContentBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<WireContent>,
    pub contents: Vec<WireContent>,
    pub generation_config: GenerationConfig,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub safety_settings: Vec<SafetySetting>,
}

#[derive(Debug, Serialize)]
pub(crate) struct WireContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    pub parts: Vec<WirePart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub(crate) enum WirePart {
    Text {
        text: String,
    },
    #[serde(rename_all = "camelCase")]
    Inline {
        inline_data: InlineData,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InlineData {
    pub mime_type: String,
    pub data: String,
}

fn wire_part(part: &Part) -> WirePart {
    match part {
        Part::Text(text) => WirePart::Text { text: text.clone() },
        Part::InlineImage(image) => WirePart::Inline {
            inline_data: InlineData {
                mime_type: image.mime_type.clone(),
                data: STANDARD.encode(&image.bytes),
            },
        },
    }
}

fn wire_turn(turn: &Turn) -> WireContent {
    WireContent {
        role: Some(turn.role),
        parts: turn.parts.iter().map(wire_part).collect(),
    }
}

/// Builds the JSON body for a `generateContent` call.
///
/// History turns come first, followed by a requester turn holding
/// `request.parts`.
#[must_use]
pub fn build_body(request: &InferenceRequest, config: &ClientConfig) -> serde_json::Value {
    let body = body_for(request, config);
    serde_json::to_value(&body).unwrap_or_else(|_| serde_json::json!({}))
}

pub(crate) fn body_for(request: &InferenceRequest, config: &ClientConfig) -> GenerateContentBody {
    let mut contents: Vec<WireContent> = request.history.iter().map(wire_turn).collect();
    contents.push(WireContent {
        role: Some(Role::Requester),
        parts: request.parts.iter().map(wire_part).collect(),
    });

    GenerateContentBody {
        system_instruction: request
            .system_instruction
            .as_ref()
            .filter(|s| !s.trim().is_empty())
            .map(|s| WireContent {
                role: None,
                parts: vec![WirePart::Text { text: s.clone() }],
            }),
        contents,
        generation_config: config.generation,
        safety_settings: config.safety.clone(),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<WireCandidate>,
    #[serde(default)]
    pub usage_metadata: Option<crate::types::UsageMetadata>,
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireCandidate {
    #[serde(default)]
    pub content: Option<WireReplyContent>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireReplyContent {
    #[serde(default)]
    pub parts: Vec<WireReplyPart>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireReplyPart {
    #[serde(default)]
    pub text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate, if it carries any.
    pub(crate) fn first_text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        Some(text)
    }
}

/// Error envelope returned by the API on non-2xx responses.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ImagePayload;

    fn sample_request() -> InferenceRequest {
        InferenceRequest {
            system_instruction: Some("Find the part number".to_string()),
            history: vec![
                Turn::requester(vec![Part::text("first look")]),
                Turn::service("<START> NONE <END>"),
            ],
            parts: vec![
                Part::InlineImage(ImagePayload::with_mime_type(b"abc".to_vec(), "image/png")),
                Part::text("try again"),
            ],
        }
    }

    #[test]
    fn test_body_orders_history_before_new_turn() {
        let body = build_body(&sample_request(), &ClientConfig::default());
        let contents = body["contents"].as_array().unwrap();

        assert_eq!(contents.len(), 3);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[0]["parts"][0]["text"], "first look");
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[2]["role"], "user");
        assert_eq!(contents[2]["parts"][1]["text"], "try again");
    }

    #[test]
    fn test_inline_image_is_base64_encoded() {
        let body = build_body(&sample_request(), &ClientConfig::default());
        let inline = &body["contents"][2]["parts"][0]["inlineData"];

        assert_eq!(inline["mimeType"], "image/png");
        assert_eq!(inline["data"], "YWJj");
    }

    #[test]
    fn test_system_instruction_and_generation_config() {
        let body = build_body(&sample_request(), &ClientConfig::default());

        assert_eq!(
            body["systemInstruction"]["parts"][0]["text"],
            "Find the part number"
        );
        assert!(body["systemInstruction"].get("role").is_none());
        assert_eq!(body["generationConfig"]["topK"], 32);
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 8192);
        assert_eq!(body["safetySettings"].as_array().unwrap().len(), 4);
    }

    #[test]
    fn test_blank_system_instruction_is_omitted() {
        let mut request = sample_request();
        request.system_instruction = Some("   ".to_string());
        let body = build_body(&request, &ClientConfig::default());
        assert!(body.get("systemInstruction").is_none());
    }

    #[test]
    fn test_first_text_concatenates_parts() {
        let raw = r#"{
            "candidates": [{
                "content": {"parts": [{"text": "<START> 5K0"}, {"text": " 937 087 <END>"}]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 10, "candidatesTokenCount": 4, "totalTokenCount": 14}
        }"#;
        let response: GenerateContentResponse = serde_json::from_str(raw).unwrap();

        assert_eq!(response.first_text().as_deref(), Some("<START> 5K0 937 087 <END>"));
        assert_eq!(response.usage_metadata.unwrap().total_token_count, Some(14));
    }

    #[test]
    fn test_first_text_missing_candidates() {
        let response: GenerateContentResponse =
            serde_json::from_str(r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#).unwrap();
        assert!(response.first_text().is_none());
        assert_eq!(
            response.prompt_feedback.unwrap().block_reason.as_deref(),
            Some("SAFETY")
        );
    }
}
