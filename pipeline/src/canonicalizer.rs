//! Brand-specific re-segmentation of confirmed part numbers.

use regex::Regex;
use std::sync::LazyLock;

use crate::brand::{BrandFormatSpec, BrandProfile};

/// Brands of the Volkswagen group sharing the `XXX NNN NNN [INDEX] [VARIANT]` layout.
pub const VAG_BRANDS: &[&str] = &["audi", "volkswagen", "vw", "skoda", "seat", "cupra"];

static VAG_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^([A-Z0-9]{3})([0-9]{3})([0-9]{3})([A-Z]{1,2})?(Z[A-Z0-9]{1,2})?$").ok()
});

static BMW_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^(\d{2})(\d{2})(\d)?(\d{3})(\d{3})(\d{1,2})?$").ok());

/// How a brand's numbers are re-segmented.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Rule {
    /// `5K0 937 087 AC Z15`
    Vag,
    /// `51.16 7 123 456`, or `51.16 123 456` without the group digit
    Bmw,
    /// Split by the first format pattern whose length fits.
    Patterns(BrandFormatSpec),
    /// Leave the input untouched.
    Passthrough,
}

/// Reformats raw part numbers into a brand's canonical spacing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canonicalizer {
    rule: Rule,
    fallback: Option<BrandFormatSpec>,
}

impl Canonicalizer {
    /// Picks the rule for a brand, using its format spec when no built-in rule exists.
    #[must_use]
    pub fn new(brand: &str, format: Option<&BrandFormatSpec>) -> Self {
        let brand = brand.trim().to_lowercase();
        let rule = if VAG_BRANDS.contains(&brand.as_str()) {
            Rule::Vag
        } else if brand == "bmw" {
            Rule::Bmw
        } else if let Some(spec) = format {
            Rule::Patterns(spec.clone())
        } else {
            Rule::Passthrough
        };
        Self {
            rule,
            fallback: format.cloned(),
        }
    }

    /// Builds the canonicalizer for a resolved brand profile.
    #[must_use]
    pub fn for_profile(profile: &BrandProfile) -> Self {
        Self::new(&profile.brand, profile.format.as_ref())
    }

    /// Returns the canonical form of `raw`, or `raw` unchanged when no rule applies.
    #[must_use]
    pub fn canonicalize(&self, raw: &str) -> String {
        let stripped = strip(raw);
        let formatted = match &self.rule {
            Rule::Vag => apply_groups(&VAG_RE, &stripped),
            Rule::Bmw => format_bmw(&stripped),
            Rule::Patterns(spec) => segment_by(spec, &stripped),
            Rule::Passthrough => None,
        };
        formatted
            .or_else(|| {
                // Built-in rules that miss still honour configured patterns.
                self.fallback
                    .as_ref()
                    .filter(|_| matches!(self.rule, Rule::Vag | Rule::Bmw))
                    .and_then(|spec| segment_by(spec, &stripped))
            })
            .unwrap_or_else(|| raw.to_string())
    }
}

/// Removes separators and upper-cases.
fn strip(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != '.')
        .flat_map(char::to_uppercase)
        .collect()
}

fn apply_groups(re: &LazyLock<Option<Regex>>, stripped: &str) -> Option<String> {
    let caps = re.as_ref()?.captures(stripped)?;
    let groups: Vec<&str> = caps
        .iter()
        .skip(1)
        .flatten()
        .map(|m| m.as_str())
        .collect();
    Some(groups.join(" "))
}

fn format_bmw(stripped: &str) -> Option<String> {
    let caps = BMW_RE.as_ref()?.captures(stripped)?;
    let mut out = format!("{}.{}", &caps[1], &caps[2]);
    for group in (3..=6).filter_map(|i| caps.get(i)) {
        out.push(' ');
        out.push_str(group.as_str());
    }
    Some(out)
}

fn segment_by(spec: &BrandFormatSpec, stripped: &str) -> Option<String> {
    if !stripped.is_ascii() {
        return None;
    }
    let pattern = spec
        .patterns()
        .iter()
        .find(|p| p.total_len() == stripped.len())?;

    let mut segments = Vec::with_capacity(pattern.lengths().len());
    let mut offset = 0;
    for &len in pattern.lengths() {
        segments.push(&stripped[offset..offset + len]);
        offset += len;
    }
    Some(segments.join(" "))
}
