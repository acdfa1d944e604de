//! Metrics for identification runs and token estimation.

use serde::Serialize;
use std::time::Duration;

use crate::dispatch::DispatchStats;

/// Metrics collected during one identification request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineMetrics {
    /// Extraction attempts made.
    pub total_attempts: usize,
    /// Service calls issued across all stages, including retried ones.
    pub service_calls: usize,
    /// Credential rotations triggered by quota errors.
    pub credential_rotations: usize,
    /// Wall-clock time for the whole request.
    #[serde(rename = "wall_time_ms", serialize_with = "millis")]
    pub wall_time: Duration,
    /// Estimated input tokens sent to the service.
    pub estimated_input_tokens: usize,
    /// Estimated output tokens received from the service.
    pub estimated_output_tokens: usize,
}

impl PipelineMetrics {
    /// Builds metrics from the dispatcher counters accumulated during a request.
    ///
    /// `before` is the snapshot taken when the request started, so a
    /// dispatcher reused across requests reports per-request figures.
    #[must_use]
    pub fn from_stats(
        total_attempts: usize,
        before: DispatchStats,
        after: DispatchStats,
        wall_time: Duration,
    ) -> Self {
        Self {
            total_attempts,
            service_calls: after.calls - before.calls,
            credential_rotations: after.rotations - before.rotations,
            wall_time,
            estimated_input_tokens: chars_to_tokens(after.input_chars - before.input_chars),
            estimated_output_tokens: chars_to_tokens(after.output_chars - before.output_chars),
        }
    }
}

fn millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

/// Estimate token count from text using the 4-chars-per-token heuristic.
///
/// Counts chars, not bytes, and rounds up.
///
/// # Examples
///
/// ```
/// use partscan_pipeline::metrics::estimate_tokens;
///
/// assert_eq!(estimate_tokens("hello"), 2);
/// assert_eq!(estimate_tokens("5K0 937 087"), 3);
/// ```
#[must_use]
pub fn estimate_tokens(text: &str) -> usize {
    chars_to_tokens(text.chars().count())
}

const fn chars_to_tokens(chars: usize) -> usize {
    chars.div_ceil(4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("a"), 1);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
    }

    #[test]
    fn test_estimate_tokens_counts_chars() {
        // "Ä" is two bytes.
        assert_eq!(estimate_tokens("ÄÄÄÄ"), 1);
    }

    #[test]
    fn test_from_stats_reports_deltas() {
        let before = DispatchStats {
            calls: 3,
            rotations: 1,
            input_chars: 40,
            output_chars: 8,
        };
        let after = DispatchStats {
            calls: 7,
            rotations: 2,
            input_chars: 81,
            output_chars: 16,
        };
        let metrics = PipelineMetrics::from_stats(2, before, after, Duration::from_millis(1500));

        assert_eq!(metrics.total_attempts, 2);
        assert_eq!(metrics.service_calls, 4);
        assert_eq!(metrics.credential_rotations, 1);
        assert_eq!(metrics.estimated_input_tokens, 11);
        assert_eq!(metrics.estimated_output_tokens, 2);

        let json = serde_json::to_value(&metrics).unwrap();
        assert_eq!(json["wall_time_ms"], 1500);
    }
}
