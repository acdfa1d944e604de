//! Shared data types for Gemini client configuration, requests and results.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default public endpoint of the Generative Language API.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default model used for identification.
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Author of a conversation turn.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Role {
    /// The caller of the service (`"user"` on the wire).
    #[serde(rename = "user")]
    Requester,
    /// The inference service itself (`"model"` on the wire).
    #[serde(rename = "model")]
    Service,
}

/// Raw image bytes plus their MIME type.
#[derive(Clone, PartialEq, Eq)]
pub struct ImagePayload {
    /// MIME type sent alongside the data, e.g. `image/jpeg`.
    pub mime_type: String,
    /// Undecoded file contents.
    pub bytes: Vec<u8>,
}

impl ImagePayload {
    /// Wraps raw bytes, sniffing the MIME type from the file signature.
    ///
    /// Unknown signatures fall back to `image/jpeg`.
    #[must_use]
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        let mime_type = sniff_mime_type(&bytes).to_string();
        Self { mime_type, bytes }
    }

    /// Wraps raw bytes with an explicit MIME type.
    #[must_use]
    pub fn with_mime_type(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            bytes,
        }
    }
}

impl std::fmt::Debug for ImagePayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImagePayload")
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

fn sniff_mime_type(bytes: &[u8]) -> &'static str {
    match bytes {
        [0x89, b'P', b'N', b'G', ..] => "image/png",
        [b'G', b'I', b'F', b'8', ..] => "image/gif",
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => "image/webp",
        _ => "image/jpeg",
    }
}

/// One piece of content inside a turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    /// Plain prompt or reply text.
    Text(String),
    /// An image sent inline with the request.
    InlineImage(ImagePayload),
}

impl Part {
    /// Convenience constructor for a text part.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Returns the text of this part, if it is a text part.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(t) => Some(t),
            Self::InlineImage(_) => None,
        }
    }
}

/// A single entry of conversation history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    /// Who produced this turn.
    pub role: Role,
    /// Ordered content of the turn.
    pub parts: Vec<Part>,
}

impl Turn {
    /// A requester turn with the given parts.
    #[must_use]
    pub const fn requester(parts: Vec<Part>) -> Self {
        Self {
            role: Role::Requester,
            parts,
        }
    }

    /// A service turn carrying a text reply.
    #[must_use]
    pub fn service(text: impl Into<String>) -> Self {
        Self {
            role: Role::Service,
            parts: vec![Part::Text(text.into())],
        }
    }
}

/// Everything needed for one `generateContent` call, independent of credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InferenceRequest {
    /// Optional system instruction applied to the whole conversation.
    pub system_instruction: Option<String>,
    /// Prior turns, oldest first.
    pub history: Vec<Turn>,
    /// Content of the new requester turn.
    pub parts: Vec<Part>,
}

impl InferenceRequest {
    /// A single-turn request with an image followed by a prompt.
    #[must_use]
    pub fn with_image(image: ImagePayload, prompt: impl Into<String>) -> Self {
        Self {
            system_instruction: None,
            history: Vec::new(),
            parts: vec![Part::InlineImage(image), Part::Text(prompt.into())],
        }
    }

    /// Total number of prompt characters (text parts only) across history and the new turn.
    #[must_use]
    pub fn prompt_chars(&self) -> usize {
        let system = self
            .system_instruction
            .as_deref()
            .map_or(0, |s| s.chars().count());
        let turns = self
            .history
            .iter()
            .flat_map(|t| t.parts.iter())
            .chain(self.parts.iter())
            .filter_map(Part::as_text)
            .map(|t| t.chars().count())
            .sum::<usize>();
        system + turns
    }
}

/// Sampling parameters forwarded as `generationConfig`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    /// Sampling temperature.
    pub temperature: f32,
    /// Nucleus sampling threshold.
    pub top_p: f32,
    /// Top-k sampling cutoff.
    pub top_k: u32,
    /// Upper bound on reply length.
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 1.0,
            top_p: 1.0,
            top_k: 32,
            max_output_tokens: 8192,
        }
    }
}

/// A content-filter threshold for one harm category.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SafetySetting {
    /// Harm category name, e.g. `HARM_CATEGORY_HARASSMENT`.
    pub category: String,
    /// Blocking threshold, e.g. `BLOCK_ONLY_HIGH`.
    pub threshold: String,
}

impl SafetySetting {
    /// Only block content rated highly harmful in every standard category.
    #[must_use]
    pub fn block_only_high() -> Vec<Self> {
        [
            "HARM_CATEGORY_HARASSMENT",
            "HARM_CATEGORY_HATE_SPEECH",
            "HARM_CATEGORY_SEXUALLY_EXPLICIT",
            "HARM_CATEGORY_DANGEROUS_CONTENT",
        ]
        .into_iter()
        .map(|category| Self {
            category: category.to_string(),
            threshold: "BLOCK_ONLY_HIGH".to_string(),
        })
        .collect()
    }
}

/// Configuration for a [`crate::GeminiClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Model name, e.g. `gemini-1.5-flash`.
    pub model: String,
    /// API root without trailing slash.
    pub base_url: String,
    /// Per-request HTTP timeout.
    ///
    /// Default: 300 seconds (5 minutes)
    pub timeout: Duration,
    /// Sampling parameters.
    pub generation: GenerationConfig,
    /// Safety thresholds.
    pub safety: Vec<SafetySetting>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(300),
            generation: GenerationConfig::default(),
            safety: SafetySetting::block_only_high(),
        }
    }
}

impl ClientConfig {
    /// Sets the model name.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the API root (useful for proxies and local test servers).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Token accounting reported by the service.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    /// Tokens consumed by the prompt.
    #[serde(default)]
    pub prompt_token_count: Option<u32>,
    /// Tokens produced in the reply.
    #[serde(default)]
    pub candidates_token_count: Option<u32>,
    /// Sum of both.
    #[serde(default)]
    pub total_token_count: Option<u32>,
}

/// Result of a successful `generateContent` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResult {
    /// Concatenated text of the first candidate.
    pub text: String,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
    /// Token usage, when the service reports it.
    pub usage: Option<UsageMetadata>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_known_signatures() {
        let png = ImagePayload::from_bytes(vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A]);
        assert_eq!(png.mime_type, "image/png");

        let webp = ImagePayload::from_bytes(b"RIFF\0\0\0\0WEBPVP8 ".to_vec());
        assert_eq!(webp.mime_type, "image/webp");

        let gif = ImagePayload::from_bytes(b"GIF89a".to_vec());
        assert_eq!(gif.mime_type, "image/gif");
    }

    #[test]
    fn test_sniff_falls_back_to_jpeg() {
        let jpeg = ImagePayload::from_bytes(vec![0xFF, 0xD8, 0xFF, 0xE0]);
        assert_eq!(jpeg.mime_type, "image/jpeg");

        let unknown = ImagePayload::from_bytes(Vec::new());
        assert_eq!(unknown.mime_type, "image/jpeg");
    }

    #[test]
    fn test_image_debug_omits_bytes() {
        let image = ImagePayload::from_bytes(vec![1, 2, 3]);
        let debug = format!("{image:?}");
        assert!(debug.contains("len: 3"));
        assert!(!debug.contains("[1, 2, 3]"));
    }

    #[test]
    fn test_prompt_chars_counts_text_only() {
        let request = InferenceRequest {
            system_instruction: Some("abcd".to_string()),
            history: vec![Turn::service("xy")],
            parts: vec![
                Part::InlineImage(ImagePayload::from_bytes(vec![0; 64])),
                Part::text("hello"),
            ],
        };
        assert_eq!(request.prompt_chars(), 11);
    }

    #[test]
    fn test_role_wire_names() {
        assert_eq!(serde_json::to_string(&Role::Requester).unwrap(), "\"user\"");
        assert_eq!(serde_json::to_string(&Role::Service).unwrap(), "\"model\"");
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let config = ClientConfig::default().with_base_url("http://localhost:8080/v1beta/");
        assert_eq!(config.base_url, "http://localhost:8080/v1beta");
    }
}
