//! Delimiter-wrapped reply protocol shared with the inference service.
//!
//! Structured answers arrive as free text containing `<START> value <END>`.
//! [`parse_answer`] converts that into an [`Answer`] right away so nothing
//! downstream looks at delimiter strings.

/// Opening delimiter of a structured answer.
pub const START: &str = "<START>";
/// Closing delimiter of a structured answer.
pub const END: &str = "<END>";
/// The "no value found" sentinel, in replies and as the pipeline's failure value.
pub const NONE: &str = "NONE";
/// Marker the validator must emit to accept a candidate.
pub const VALID_MARKER: &str = "<VALID>";
/// Prefix the finalizer uses to flag a torn sticker.
pub const TORN_MARKER: char = '!';

/// A parsed structured answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    /// A non-empty value between the delimiters.
    Value(String),
    /// No delimiters, empty content, or the `NONE` sentinel.
    None,
}

impl Answer {
    /// Returns the value, if any.
    #[must_use]
    pub fn value(&self) -> Option<&str> {
        match self {
            Self::Value(v) => Some(v),
            Self::None => None,
        }
    }

    /// Whether this is [`Answer::None`].
    #[must_use]
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

/// Extracts the value after the last `<START>` and before the next `<END>`.
///
/// # Examples
///
/// ```
/// use partscan_pipeline::protocol::{parse_answer, Answer};
///
/// let answer = parse_answer("Found it: <START> 5K0 937 087 AC <END> on the label");
/// assert_eq!(answer, Answer::Value("5K0 937 087 AC".to_string()));
/// assert!(parse_answer("<START> none <END>").is_none());
/// ```
#[must_use]
pub fn parse_answer(text: &str) -> Answer {
    let Some(start) = text.rfind(START) else {
        return Answer::None;
    };
    let rest = &text[start + START.len()..];
    let Some(end) = rest.find(END) else {
        return Answer::None;
    };

    let value = rest[..end].trim().trim_matches('`').trim();
    if value.is_empty() || value.eq_ignore_ascii_case(NONE) {
        return Answer::None;
    }
    Answer::Value(value.to_string())
}

/// Whether a validator reply accepts the candidate.
#[must_use]
pub fn is_valid_verdict(text: &str) -> bool {
    text.contains(VALID_MARKER)
}
