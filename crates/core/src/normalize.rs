//! Loose-equality canonicalization for submitted answers.

/// Punctuation stripped from answers before comparison: degree and
/// multiplication signs, slashes, sentence punctuation, hyphens, brackets
/// and quotes.
const STRIPPED: &[char] = &[
    '°', 'º', '^', '•', '×', '*', '/', '\\', '.', ',', ';', ':', '!', '?', '-', '(', ')', '[',
    ']', '"', '\'',
];

/// Reduce free-form answer text to its canonical comparable form.
///
/// Lowercases, trims, strips the fixed punctuation set and removes all
/// remaining whitespace. The result is used solely for equality checks
/// between a submitted answer and the expected one, so "  A-B?  " and
/// "ab" compare equal. Deterministic and idempotent.
#[must_use]
pub fn normalize(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .chars()
        .filter(|c| !STRIPPED.contains(c) && !c.is_whitespace())
        .collect()
}
