//! Decoding of completion text into short label candidates.
//!
//! # Responsibility
//! - Accept either a JSON array of strings or loosely delimited text.
//! - Strip list-formatting artifacts and drop structural or meta tokens.
//!
//! # Invariants
//! - Output holds at most [`MAX_LABELS`] entries, in source order.
//! - Every entry is non-empty and at most [`MAX_LABEL_CHARS`] characters.
//! - No case folding or dedup happens here; persistence owns uniqueness.
//! - Decoding never fails; an empty result means "no labels produced".

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::IgnoredAny;
use serde::Deserialize;

/// Maximum labels kept from one completion.
pub const MAX_LABELS: usize = 6;
/// Maximum label length in characters after cleaning.
pub const MAX_LABEL_CHARS: usize = 30;

const META_WORDS: &[&str] = &["json", "array", "object"];

static LEADING_ARTIFACTS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^["'\-*\d.\[\]{}:\s]+"#).expect("valid leading artifact regex"));
static TRAILING_ARTIFACTS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"["'\[\]{}:\s]+$"#).expect("valid trailing artifact regex"));
static JSON_PUNCTUATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^[\[\]{}",:\s]+$"#).expect("valid json punctuation regex"));
static SPLIT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[,\n|]").expect("valid split regex"));
static CODE_FENCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^\s*```[A-Za-z0-9_-]*[ \t]*\r?\n?(.*?)\r?\n?```\s*$")
        .expect("valid code fence regex")
});

/// One extracted candidate before and after cleaning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelCandidate {
    pub raw: String,
    pub cleaned: String,
}

impl LabelCandidate {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let cleaned = clean_candidate(&raw);
        Self { raw, cleaned }
    }

    /// Whether the cleaned value is a usable label.
    pub fn is_valid(&self) -> bool {
        let cleaned = self.cleaned.as_str();
        !cleaned.is_empty()
            && cleaned.chars().count() <= MAX_LABEL_CHARS
            && !JSON_PUNCTUATION_RE.is_match(cleaned)
            && !META_WORDS.contains(&cleaned)
    }
}

/// How the completion text was read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedResponse {
    /// A JSON array; string elements only.
    Array(Vec<String>),
    /// Anything else; fed to the delimiter fallback.
    Unstructured(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ArrayItem {
    Text(String),
    Other(IgnoredAny),
}

/// Classifies `raw` as a JSON string array or free text.
pub fn parse_response(raw: &str) -> ParsedResponse {
    let unfenced = strip_code_fence(raw);
    match serde_json::from_str::<Vec<ArrayItem>>(unfenced) {
        Ok(items) => ParsedResponse::Array(
            items
                .into_iter()
                .filter_map(|item| match item {
                    ArrayItem::Text(value) => Some(value),
                    ArrayItem::Other(_) => None,
                })
                .collect(),
        ),
        Err(_) => ParsedResponse::Unstructured(unfenced.to_string()),
    }
}

/// Decodes completion text into at most [`MAX_LABELS`] cleaned labels.
pub fn decode(raw: &str) -> Vec<String> {
    let candidates: Vec<String> = match parse_response(raw) {
        ParsedResponse::Array(values) => values,
        ParsedResponse::Unstructured(text) => SPLIT_RE
            .split(&text)
            .map(|piece| piece.trim().to_string())
            .collect(),
    };

    candidates
        .into_iter()
        .map(LabelCandidate::new)
        .filter(LabelCandidate::is_valid)
        .map(|candidate| candidate.cleaned)
        .take(MAX_LABELS)
        .collect()
}

/// Removes leading bullets/quotes/brackets and trailing quotes/brackets.
pub fn clean_candidate(raw: &str) -> String {
    let without_leading = LEADING_ARTIFACTS_RE.replace(raw, "");
    let without_trailing = TRAILING_ARTIFACTS_RE.replace(&without_leading, "");
    without_trailing.trim().to_string()
}

fn strip_code_fence(raw: &str) -> &str {
    CODE_FENCE_RE
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map_or(raw, |inner| inner.as_str())
}
