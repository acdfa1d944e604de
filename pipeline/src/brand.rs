//! Per-brand prompt templates and part-number format patterns.
//!
//! Two JSON files feed the catalog, both keyed by lower-cased brand name:
//!
//! - `prompts.json`: `{"audi": {"main_prompt": "...", "validation_prompt": "..."}}`
//! - `formats.json`: `{"audi": {"format": "3-3-3,3-3-3-1"}}`
//!
//! A missing file is not an error: brands fall back to the built-in default
//! main prompt, an empty validation prompt, and no structural pre-check.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::PipelineError;
use crate::prompts::DEFAULT_MAIN_PROMPT;

/// Environment variable overriding the prompts file location.
pub const PROMPTS_ENV_VAR: &str = "PARTSCAN_PROMPTS";
/// Environment variable overriding the formats file location.
pub const FORMATS_ENV_VAR: &str = "PARTSCAN_FORMATS";
/// Default prompts file name.
pub const PROMPTS_FILE: &str = "prompts.json";
/// Default formats file name.
pub const FORMATS_FILE: &str = "formats.json";

/// Prompt templates for one brand.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BrandPromptSpec {
    /// System instruction for extraction.
    #[serde(default = "default_main_prompt")]
    pub main_prompt: String,
    /// Validation template with `{extracted_number}` and `{incorrect_predictions}` slots.
    #[serde(default)]
    pub validation_prompt: String,
}

fn default_main_prompt() -> String {
    DEFAULT_MAIN_PROMPT.to_string()
}

impl Default for BrandPromptSpec {
    fn default() -> Self {
        Self {
            main_prompt: default_main_prompt(),
            validation_prompt: String::new(),
        }
    }
}

/// One accepted grouping of segment lengths, e.g. `3-3-3`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentPattern(Vec<usize>);

impl SegmentPattern {
    /// Segment lengths in order.
    #[must_use]
    pub fn lengths(&self) -> &[usize] {
        &self.0
    }

    /// Sum of all segment lengths.
    #[must_use]
    pub fn total_len(&self) -> usize {
        self.0.iter().sum()
    }

    /// Whether every segment has exactly the expected length.
    #[must_use]
    pub fn matches(&self, segments: &[&str]) -> bool {
        segments.len() == self.0.len()
            && segments
                .iter()
                .zip(&self.0)
                .all(|(segment, &expected)| segment.chars().count() == expected)
    }
}

impl std::str::FromStr for SegmentPattern {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lengths = s
            .split('-')
            .map(|part| match part.trim().parse::<usize>() {
                Ok(n) if n > 0 => Ok(n),
                _ => Err(PipelineError::Config(format!(
                    "invalid segment length {part:?} in pattern {s:?}"
                ))),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self(lengths))
    }
}

impl std::fmt::Display for SegmentPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        f.write_str(&parts.join("-"))
    }
}

/// Accepted segment-length patterns for one brand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrandFormatSpec {
    patterns: Vec<SegmentPattern>,
}

impl BrandFormatSpec {
    /// Parses a comma-separated list of dash-delimited lengths, e.g. `"3-3-3,3-3-3-2"`.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Config` on an empty list or a non-positive length.
    pub fn parse(spec: &str) -> Result<Self, PipelineError> {
        let patterns = spec
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::parse)
            .collect::<Result<Vec<SegmentPattern>, _>>()?;
        if patterns.is_empty() {
            return Err(PipelineError::Config(format!(
                "format spec {spec:?} contains no patterns"
            )));
        }
        Ok(Self { patterns })
    }

    /// Patterns in configuration order.
    #[must_use]
    pub fn patterns(&self) -> &[SegmentPattern] {
        &self.patterns
    }

    /// Splits a candidate on whitespace, dashes and dots.
    #[must_use]
    pub fn segments(candidate: &str) -> Vec<&str> {
        candidate
            .split(|c: char| c.is_whitespace() || c == '-' || c == '.')
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Whether the candidate matches at least one pattern, every segment included.
    #[must_use]
    pub fn accepts(&self, candidate: &str) -> bool {
        let segments = Self::segments(candidate);
        self.patterns.iter().any(|p| p.matches(&segments))
    }
}

#[derive(Debug, Deserialize)]
struct FormatEntry {
    format: String,
}

/// Where a brand's prompts came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptSource {
    /// Found in the prompts file.
    Configured,
    /// Brand missing from the prompts file; built-in defaults in use.
    Default,
}

/// Everything the pipeline needs for one brand, resolved once.
#[derive(Debug, Clone)]
pub struct BrandProfile {
    /// Lower-cased brand name.
    pub brand: String,
    /// Prompt templates (possibly the defaults).
    pub prompts: BrandPromptSpec,
    /// Where `prompts` came from.
    pub prompt_source: PromptSource,
    /// Structural patterns; `None` disables the pre-check.
    pub format: Option<BrandFormatSpec>,
}

impl BrandProfile {
    /// A profile with default prompts and no format spec.
    #[must_use]
    pub fn fallback(brand: &str) -> Self {
        Self {
            brand: brand.trim().to_lowercase(),
            prompts: BrandPromptSpec::default(),
            prompt_source: PromptSource::Default,
            format: None,
        }
    }
}

/// Brand-keyed prompt and format configuration.
#[derive(Debug, Clone, Default)]
pub struct BrandCatalog {
    prompts: HashMap<String, BrandPromptSpec>,
    formats: HashMap<String, BrandFormatSpec>,
}

impl BrandCatalog {
    /// An empty catalog; every brand resolves to the fallback profile.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the prompts for a brand.
    #[must_use]
    pub fn with_prompts(mut self, brand: &str, prompts: BrandPromptSpec) -> Self {
        self.prompts.insert(brand.trim().to_lowercase(), prompts);
        self
    }

    /// Adds or replaces the format spec for a brand.
    #[must_use]
    pub fn with_format(mut self, brand: &str, format: BrandFormatSpec) -> Self {
        self.formats.insert(brand.trim().to_lowercase(), format);
        self
    }

    /// Parses catalog contents from JSON strings.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Config` on malformed JSON or patterns.
    pub fn from_json(prompts_json: &str, formats_json: &str) -> Result<Self, PipelineError> {
        let prompts: HashMap<String, BrandPromptSpec> = serde_json::from_str(prompts_json)
            .map_err(|e| PipelineError::Config(format!("prompts: {e}")))?;
        let raw_formats: HashMap<String, FormatEntry> = serde_json::from_str(formats_json)
            .map_err(|e| PipelineError::Config(format!("formats: {e}")))?;

        let formats = raw_formats
            .into_iter()
            .map(|(brand, entry)| Ok((brand, BrandFormatSpec::parse(&entry.format)?)))
            .collect::<Result<Vec<_>, PipelineError>>()?;

        let mut catalog = Self::new();
        for (brand, spec) in prompts {
            catalog = catalog.with_prompts(&brand, spec);
        }
        for (brand, spec) in formats {
            catalog = catalog.with_format(&brand, spec);
        }
        Ok(catalog)
    }

    /// Loads the catalog from the given files. Missing files count as empty.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Io` if a present file cannot be read, or
    /// `PipelineError::Config` if its contents are malformed.
    pub fn load(prompts: Option<&Path>, formats: Option<&Path>) -> Result<Self, PipelineError> {
        let prompts_json = read_optional(prompts, PROMPTS_FILE)?;
        let formats_json = read_optional(formats, FORMATS_FILE)?;
        let catalog = Self::from_json(&prompts_json, &formats_json)?;
        tracing::debug!(
            prompt_brands = catalog.prompts.len(),
            format_brands = catalog.formats.len(),
            "Loaded brand catalog"
        );
        Ok(catalog)
    }

    /// Resolves prompts and format spec for a brand, applying fallbacks.
    #[must_use]
    pub fn resolve(&self, brand: &str) -> BrandProfile {
        let key = brand.trim().to_lowercase();
        let mut profile = BrandProfile::fallback(&key);

        if let Some(prompts) = self.prompts.get(&key) {
            profile.prompts = prompts.clone();
            profile.prompt_source = PromptSource::Configured;
        } else {
            tracing::warn!(brand = %key, "No prompts configured for brand, using defaults");
        }

        profile.format = self.formats.get(&key).cloned();
        if profile.format.is_none() {
            tracing::debug!(brand = %key, "No format spec for brand, pre-check disabled");
        }
        profile
    }
}

fn read_optional(path: Option<&Path>, label: &str) -> Result<String, PipelineError> {
    let Some(path) = path else {
        tracing::warn!("{label} not found. Using default prompts and formats.");
        return Ok("{}".to_string());
    };
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(contents),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(path = %path.display(), "{label} not found. Using defaults.");
            Ok("{}".to_string())
        }
        Err(e) => Err(PipelineError::Io(e)),
    }
}

/// Locates a configuration file.
///
/// Resolution order:
/// 1. `explicit` if provided (even if it does not exist, so the caller sees a warning).
/// 2. The path in `env_var`.
/// 3. `file_name` in the current directory.
/// 4. `file_name` under the user configuration directory, in `partscan/`.
#[must_use]
pub fn discover_config_file(
    explicit: Option<PathBuf>,
    env_var: &str,
    file_name: &str,
) -> Option<PathBuf> {
    if explicit.is_some() {
        return explicit;
    }

    if let Ok(path_str) = std::env::var(env_var) {
        let path = PathBuf::from(path_str);
        if path.exists() {
            return Some(path);
        }
    }

    let local = PathBuf::from(file_name);
    if local.exists() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("partscan").join(file_name))
        .filter(|p| p.exists())
}
