//! Semantic De-duplication
//!
//! Identity helpers for the additive per-run entities: normalized quotes
//! for hot buttons, and key-token overlap for objections. Consumers apply
//! the same rules across runs; the core uses them to collapse duplicates
//! within a single run.

/// Two objections are the same when their stopword-filtered key tokens
/// overlap by at least this fraction of the smaller token set.
pub const OBJECTION_SIMILARITY_THRESHOLD: f64 = 0.70;

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "i", "if", "in", "is", "it",
    "just", "me", "my", "not", "of", "on", "or", "so", "that", "the", "this", "to", "too", "we",
    "with", "you", "your",
];

/// Lowercase, strip punctuation, collapse whitespace.
pub fn normalize_text(text: &str) -> String {
    let mut normalized = String::with_capacity(text.len());
    for ch in text.chars() {
        if ch.is_alphanumeric() || ch == '\'' {
            for lower in ch.to_lowercase() {
                normalized.push(lower);
            }
        } else {
            normalized.push(' ');
        }
    }
    normalized.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Stopword-filtered key tokens of a normalized text.
pub fn key_tokens(text: &str) -> Vec<String> {
    normalize_text(text)
        .split_whitespace()
        .filter(|token| !STOPWORDS.contains(token))
        .map(|token| token.to_string())
        .collect()
}

/// Fraction of the smaller key-token set shared by both texts.
/// Returns 0.0 when either side has no key tokens.
pub fn token_overlap(a: &str, b: &str) -> f64 {
    let tokens_a: std::collections::HashSet<String> = key_tokens(a).into_iter().collect();
    let tokens_b: std::collections::HashSet<String> = key_tokens(b).into_iter().collect();
    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }
    let shared = tokens_a.intersection(&tokens_b).count() as f64;
    shared / tokens_a.len().min(tokens_b.len()) as f64
}

/// Whether two objection texts carry the same semantic identity.
pub fn is_duplicate_objection(a: &str, b: &str) -> bool {
    token_overlap(a, b) >= OBJECTION_SIMILARITY_THRESHOLD
}
