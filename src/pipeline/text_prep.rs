//! Text preparation: normalization, sentence splitting, evidence slicing.
//!
//! `combined_text` keeps the original casing and punctuation and is the
//! evidence source of truth; `normalized_text` is a lowercase,
//! whitespace-collapsed copy used only for pattern matching.

use serde::{Deserialize, Serialize};

/// Prepared listing text. Built once per listing, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreparedText {
    pub original_title: String,
    pub original_description: String,
    pub combined_text: String,
    pub normalized_text: String,
    pub sentences: Vec<String>,
}

/// Collapse all whitespace runs to single spaces and trim.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalize listing text while preserving the original for evidence.
pub fn normalize_text(title: &str, description: &str) -> PreparedText {
    let title = title.trim().to_string();
    let description = description.trim().to_string();

    let combined = if !title.is_empty() && !description.is_empty() {
        format!("{title}\n{description}")
    } else if !title.is_empty() {
        title.clone()
    } else {
        description.clone()
    };

    let normalized = collapse_whitespace(&combined).to_lowercase();
    let sentences = split_sentences(&combined);

    PreparedText {
        original_title: title,
        original_description: description,
        combined_text: combined,
        normalized_text: normalized,
        sentences,
    }
}

/// Split text into sentence-like units.
///
/// Boundaries: newlines, and terminal `. ! ?` followed by whitespace and an
/// uppercase letter. Byte scanning instead of regex because the regex crate
/// has no lookaround. Abbreviations and decimals are accepted as rough
/// splits; the tie-break behavior is pinned by tests below.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        split_line(line, &mut sentences);
    }
    sentences
}

fn split_line(line: &str, out: &mut Vec<String>) {
    let bytes = line.as_bytes();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if matches!(bytes[i], b'.' | b'!' | b'?') {
            let end = i + 1;
            let rest = &line[end..];

            let mut ws_len = 0;
            for ch in rest.chars() {
                if ch.is_whitespace() {
                    ws_len += ch.len_utf8();
                } else {
                    break;
                }
            }

            if ws_len > 0 {
                let following = line[end + ws_len..].chars().next();
                if let Some(ch) = following {
                    if ch.is_uppercase() {
                        let sentence = line[start..end].trim();
                        if !sentence.is_empty() {
                            out.push(sentence.to_string());
                        }
                        start = end + ws_len;
                        i = start;
                        continue;
                    }
                }
            }
        }
        i += 1;
    }

    let remaining = line[start..].trim();
    if !remaining.is_empty() {
        out.push(remaining.to_string());
    }
}

/// Find the evidence span containing a pattern match.
///
/// Returns the smallest sentence containing the pattern (case-insensitive).
/// Falls back to a word-boundary-trimmed character window of `window` chars
/// centered on the match when no sentence contains it. Never truncates
/// mid-word. Returns None when the pattern is absent from `text`.
pub fn find_evidence_span(
    pattern: &str,
    text: &str,
    sentences: &[String],
    window: usize,
) -> Option<String> {
    let pattern_lower = pattern.to_lowercase();
    if pattern_lower.is_empty() {
        return None;
    }

    let mut best: Option<&String> = None;
    for sentence in sentences {
        if sentence.to_lowercase().contains(&pattern_lower) {
            let shorter = best.map_or(true, |b| sentence.len() < b.len());
            if shorter {
                best = Some(sentence);
            }
        }
    }
    if let Some(sentence) = best {
        return Some(sentence.clone());
    }

    let text_lower = text.to_lowercase();
    let idx = text_lower.find(&pattern_lower)?;
    // Lowercasing can shift byte offsets for non-ASCII text; snap to char
    // boundaries on the original before slicing.
    let idx = floor_char_boundary(text, idx.min(text.len()));

    let mut start = floor_char_boundary(text, idx.saturating_sub(window / 2));
    let mut end = floor_char_boundary(text, (idx + pattern.len() + window / 2).min(text.len()));

    let bytes = text.as_bytes();
    while start > 0 && !matches!(bytes[start - 1], b' ' | b'\t' | b'\n') {
        start -= 1;
    }
    while end < bytes.len() && !matches!(bytes[end], b' ' | b'\t' | b'\n') {
        end += 1;
    }

    let span = text[start..end].trim();
    if span.is_empty() {
        None
    } else {
        Some(span.to_string())
    }
}

fn floor_char_boundary(text: &str, mut index: usize) -> usize {
    index = index.min(text.len());
    while index > 0 && !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

/// Verbatim, case-insensitive, whitespace-normalized substring test.
///
/// The single evidence authority: both the rule engine (self-consistency)
/// and the verifier (anti-hallucination gate) go through here.
pub fn check_evidence_exists(evidence: &str, original: &str) -> bool {
    let evidence_normalized = collapse_whitespace(&evidence.to_lowercase());
    let original_normalized = collapse_whitespace(&original.to_lowercase());
    if evidence_normalized.is_empty() || original_normalized.is_empty() {
        return false;
    }
    original_normalized.contains(&evidence_normalized)
}
