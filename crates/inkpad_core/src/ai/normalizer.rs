//! Boundary-aware truncation of free text to a prompt budget.
//!
//! Lengths are counted in `char`s, so a cut never splits a code point.

use serde::Serialize;

/// Truncated text plus the bookkeeping callers report back to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedText {
    pub body: String,
    pub was_truncated: bool,
    pub original_length: usize,
    pub processed_length: usize,
}

/// Cuts `text` to at most `max_chars` characters.
///
/// When cutting is needed, the result ends at the last `.` or newline of the
/// `max_chars` prefix (inclusive) if that boundary sits past 70% of the
/// budget; otherwise the hard `max_chars` prefix is kept.
pub fn truncate(text: &str, max_chars: usize) -> NormalizedText {
    let original_length = text.chars().count();
    if original_length <= max_chars {
        return NormalizedText {
            body: text.to_string(),
            was_truncated: false,
            original_length,
            processed_length: original_length,
        };
    }

    let prefix_end = text
        .char_indices()
        .nth(max_chars)
        .map_or(text.len(), |(byte_idx, _)| byte_idx);
    let prefix = &text[..prefix_end];

    let boundary = prefix
        .char_indices()
        .enumerate()
        .filter(|(_, (_, ch))| *ch == '.' || *ch == '\n')
        .last()
        .map(|(char_idx, (byte_idx, _))| (char_idx, byte_idx));

    let body = match boundary {
        // cut > 0.7 * max_chars, kept in integers.
        Some((char_idx, byte_idx)) if char_idx.saturating_mul(10) > max_chars.saturating_mul(7) => {
            &prefix[..=byte_idx]
        }
        _ => prefix,
    };

    NormalizedText {
        body: body.to_string(),
        was_truncated: true,
        original_length,
        processed_length: body.chars().count(),
    }
}
