//! Prompt builders for extraction, validation and the final re-scan.

use crate::candidate::RejectedSet;
use crate::protocol::{END, NONE, START, VALID_MARKER};

/// Main extraction prompt used when a brand has none configured.
pub const DEFAULT_MAIN_PROMPT: &str = "\
Identify the manufacturer part number printed on the part shown in the photo.

1. Scan the whole image: labels, stickers, embossed or cast areas, and text near barcodes.
2. A part number is usually the most prominent alphanumeric sequence on the label,
   grouped into segments separated by spaces, dashes or dots
   (for example 5K0 937 087 AC or 12.34 5 678 901).
3. Ignore dates, serial numbers, supplier codes, barcodes and quantities.
4. Watch for look-alike characters: '1' vs 'I', '0' vs 'O', '8' vs 'B', '5' vs 'S', '2' vs 'Z'.
   Check whether the label is upside down.
5. If several numbers are visible, choose the one most likely to be the part number.

Respond strictly in this format:
- Part number identified: <START> [part number with its segment spacing] <END>
- No part number found: <START> NONE <END>
";

/// User text sent with the image on the first extraction attempt.
pub const FIRST_ATTEMPT_PROMPT: &str =
    "Identify the part number in this photo and answer in the required format.";

/// Builds the user text for an extraction attempt.
///
/// Retries carry a corrective nudge that names every candidate rejected so far.
///
/// # Examples
///
/// ```
/// use partscan_pipeline::candidate::RejectedSet;
/// use partscan_pipeline::prompts::build_extraction_prompt;
///
/// let mut rejected = RejectedSet::new();
/// rejected.insert("5K0 937 087");
///
/// let prompt = build_extraction_prompt(true, &rejected);
/// assert!(prompt.contains("not correct"));
/// assert!(prompt.contains("5K0 937 087"));
/// ```
#[must_use]
pub fn build_extraction_prompt(is_retry: bool, rejected: &RejectedSet) -> String {
    if !is_retry {
        return FIRST_ATTEMPT_PROMPT.to_string();
    }

    let mut prompt = String::from(
        "Your previous answer was not correct. Try again: look for the number that most \
         strongly matches this manufacturer's part-number structure.",
    );
    if !rejected.is_empty() {
        prompt.push_str("\nThese readings were already rejected, do not repeat them: ");
        prompt.push_str(&rejected.joined());
        prompt.push('.');
    }
    prompt.push_str(&format!(
        "\nRespond strictly as {START} number {END} or {START} {NONE} {END}."
    ));
    prompt
}

/// Fills a brand validation template.
///
/// `{extracted_number}` receives the candidate and `{incorrect_predictions}`
/// the comma-separated rejections. Templates without placeholders are sent
/// as-is with the candidate appended, so the service always sees it.
#[must_use]
pub fn render_validation_prompt(template: &str, candidate: &str, rejected: &RejectedSet) -> String {
    if template.trim().is_empty() {
        return String::new();
    }
    if !template.contains("{extracted_number}") {
        return format!("{template}\n\nCandidate: {candidate}");
    }
    template
        .replace("{extracted_number}", candidate)
        .replace("{incorrect_predictions}", &rejected.joined())
}

/// Builds the targeted re-scan prompt for the finalizer.
#[must_use]
pub fn build_final_scan_prompt(candidate: &str) -> String {
    let mut prompt = format!(
        "Your task is to find the number {candidate} in the provided image. \
         Check carefully whether that exact number is present; compare every character.\n"
    );
    prompt.push_str("If you find the number clearly visible, return it exactly as printed.\n");
    prompt.push_str(&format!("If you cannot find the number, return '{NONE}'.\n"));
    prompt.push_str(
        "All segments must be clearly legible:\n\
         - no mixing of 'O' (letter) with '0' (digit)\n\
         - no mixing of 'B' (letter) with '8' (digit)\n\
         - no mixing of 'S' (letter) with '5' (digit)\n\
         - no mixing of 'I' (letter) with '1' (digit)\n",
    );
    prompt.push_str(&format!(
        "If the sticker with the number is torn, return '!{candidate}'.\n"
    ));
    prompt.push_str(&format!(
        "If the photo quality is poor or the sticker is not clearly visible \
         (it must occupy a large area of the photo), you must return '{NONE}'.\n"
    ));
    prompt.push_str(&format!(
        "Briefly explain your verdict, then respond strictly in the format: {START}your_response{END}."
    ));
    prompt
}

/// Builds the full validation prompt for a candidate.
///
/// Uses the brand template when there is one. Without a template the
/// candidate and prior rejections are listed directly. Either way the reply
/// must contain the verdict marker to accept, so the instruction is appended
/// whenever the text does not already mention it.
#[must_use]
pub fn build_validation_prompt(template: &str, candidate: &str, rejected: &RejectedSet) -> String {
    let mut prompt = render_validation_prompt(template, candidate, rejected);
    if prompt.is_empty() {
        prompt = format!("Candidate part number: {candidate}");
        if !rejected.is_empty() {
            prompt.push_str(&format!("\nPreviously rejected readings: {}", rejected.joined()));
        }
    }
    if !prompt.contains(VALID_MARKER) {
        prompt.push_str(&format!(
            "\nIf the candidate is a plausible, correctly read part number visible in the image, \
             include {VALID_MARKER} in your reply; otherwise include <INVALID>."
        ));
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_attempt_prompt_has_no_nudge() {
        let prompt = build_extraction_prompt(false, &RejectedSet::new());
        assert_eq!(prompt, FIRST_ATTEMPT_PROMPT);
    }

    #[test]
    fn test_retry_prompt_without_rejections() {
        let prompt = build_extraction_prompt(true, &RejectedSet::new());
        assert!(prompt.contains("not correct"));
        assert!(!prompt.contains("already rejected"));
        assert!(prompt.contains("<START>"));
    }

    #[test]
    fn test_render_validation_template() {
        let mut rejected = RejectedSet::new();
        rejected.insert("AAA 111 222");
        rejected.insert("BBB 333 444");

        let prompt = render_validation_prompt(
            "Is {extracted_number} valid? Known wrong: {incorrect_predictions}. Reply <VALID> or <INVALID>.",
            "5K0 937 087",
            &rejected,
        );
        assert_eq!(
            prompt,
            "Is 5K0 937 087 valid? Known wrong: AAA 111 222, BBB 333 444. Reply <VALID> or <INVALID>."
        );
    }

    #[test]
    fn test_render_empty_template_stays_empty() {
        assert!(render_validation_prompt("  ", "X", &RejectedSet::new()).is_empty());
    }

    #[test]
    fn test_render_template_without_placeholders_appends_candidate() {
        let prompt =
            render_validation_prompt("Check the number.", "1J0 959 655", &RejectedSet::new());
        assert!(prompt.ends_with("Candidate: 1J0 959 655"));
    }

    #[test]
    fn test_validation_prompt_without_template() {
        let mut rejected = RejectedSet::new();
        rejected.insert("AAA 111");
        let prompt = build_validation_prompt("", "5K0 937 087", &rejected);

        assert!(prompt.starts_with("Candidate part number: 5K0 937 087"));
        assert!(prompt.contains("Previously rejected readings: AAA 111"));
        assert!(prompt.contains("<VALID>"));
    }

    #[test]
    fn test_validation_prompt_keeps_template_marker() {
        let prompt = build_validation_prompt(
            "Is {extracted_number} right? Answer <VALID> or <INVALID>.",
            "X1",
            &RejectedSet::new(),
        );
        assert_eq!(prompt, "Is X1 right? Answer <VALID> or <INVALID>.");
    }

    #[test]
    fn test_final_scan_prompt_mentions_confusions_and_torn_flag() {
        let prompt = build_final_scan_prompt("8E0 121 251");
        assert!(prompt.contains("find the number 8E0 121 251"));
        assert!(prompt.contains("'O' (letter) with '0' (digit)"));
        assert!(prompt.contains("'!8E0 121 251'"));
        assert!(prompt.contains("<START>your_response<END>"));
    }
}
