//! Answer letter extraction from free-form model output.
//!
//! Models are asked to finish with `ANSWER: X` (or `VERIFIED: X` /
//! `CHANGED: X` on the verification pass), but they do not always comply.
//! Extraction therefore falls back through progressively looser readings and
//! only accepts a fallback when it yields exactly one distinct letter.

use crate::question::Letter;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

fn think_block() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<think>.*?</think>").expect("valid regex"))
}

fn answer_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)ANSWER:\s*\(?([A-D])\b").expect("valid regex"))
}

fn verdict_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(VERIFIED|CHANGED):\s*\(?([A-D])\b").expect("valid regex")
    })
}

fn bare_letter() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[\(\[]?([A-Da-d])[\)\]]?[.:]?$").expect("valid regex"))
}

fn standalone_letter() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Lowercase "a" is the English article, so only b-d count in lowercase.
    RE.get_or_init(|| Regex::new(r"\(([A-Da-d])\)|\b([A-D]|[b-d])\b").expect("valid regex"))
}

/// A lowercase `a` that reads as an answer: after a choice word, or as the
/// final word of the text.
fn lowercase_a_answer() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i:\b(?:option|choice|answer|pick))(?:\s+is)?\s*:?\s+a\b|\ba[.!]?\s*$")
            .expect("valid regex")
    })
}

/// Remove `<think>...</think>` reasoning sections.
///
/// An unterminated `<think>` drops everything after it.
pub fn strip_reasoning(response: &str) -> String {
    let stripped = think_block().replace_all(response, "");
    match stripped.find("<think>") {
        Some(pos) => stripped[..pos].to_string(),
        None => stripped.into_owned(),
    }
}

/// Extract the answer letter from a response.
///
/// Tried in order:
/// 1. the last `ANSWER: X` marker (case-insensitive)
/// 2. a response that is nothing but a letter, e.g. `"b"`, `"(C)"`, `"D."`
/// 3. standalone letters in prose, accepted only if exactly one distinct
///    letter appears. A lowercase `a` only counts after a choice word
///    (`option a`, `pick: a`) or as the last word of the text.
pub fn extract_answer(response: &str) -> Option<Letter> {
    let text = strip_reasoning(response);

    if let Some(letter) = last_capture(answer_marker(), &text, 1) {
        return Some(letter);
    }

    if let Some(caps) = bare_letter().captures(text.trim()) {
        return caps
            .get(1)
            .and_then(|m| m.as_str().chars().next())
            .and_then(Letter::from_char);
    }

    let mut candidates: BTreeSet<Letter> = standalone_letter()
        .captures_iter(&text)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .filter_map(|m| m.as_str().chars().next())
        .filter_map(Letter::from_char)
        .collect();
    if lowercase_a_answer().is_match(&text) {
        candidates.insert(Letter::A);
    }

    if candidates.len() == 1 {
        candidates.into_iter().next()
    } else {
        None
    }
}

/// What a verifier said about the original answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// `VERIFIED: X`
    Verified(Letter),
    /// `CHANGED: X`
    Changed(Letter),
    /// No verdict marker; letter found by [`extract_answer`]
    Unmarked(Letter),
}

impl Verdict {
    pub fn letter(&self) -> Letter {
        match self {
            Verdict::Verified(l) | Verdict::Changed(l) | Verdict::Unmarked(l) => *l,
        }
    }
}

/// Extract the verifier's final letter.
///
/// The last `VERIFIED:`/`CHANGED:` marker wins; without one, falls back to
/// [`extract_answer`].
pub fn extract_verdict(response: &str) -> Option<Verdict> {
    let text = strip_reasoning(response);

    if let Some(caps) = verdict_marker().captures_iter(&text).last() {
        let letter = caps
            .get(2)
            .and_then(|m| m.as_str().chars().next())
            .and_then(Letter::from_char)?;
        let is_verified = caps
            .get(1)
            .is_some_and(|m| m.as_str().eq_ignore_ascii_case("VERIFIED"));
        return Some(if is_verified {
            Verdict::Verified(letter)
        } else {
            Verdict::Changed(letter)
        });
    }

    extract_answer(&text).map(Verdict::Unmarked)
}

/// Last `max_chars` characters of a response, for error messages.
pub fn excerpt(response: &str, max_chars: usize) -> String {
    let trimmed = response.trim();
    let count = trimmed.chars().count();
    if count <= max_chars {
        trimmed.to_string()
    } else {
        let tail: String = trimmed.chars().skip(count - max_chars).collect();
        format!("...{}", tail)
    }
}

fn last_capture(re: &Regex, text: &str, group: usize) -> Option<Letter> {
    re.captures_iter(text)
        .last()
        .and_then(|caps| caps.get(group))
        .and_then(|m| m.as_str().chars().next())
        .and_then(Letter::from_char)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::marker("Reasoning...\n\nANSWER: C", Letter::C)]
    #[case::marker_lowercase("so the answer: b", Letter::B)]
    #[case::marker_no_space("ANSWER:D", Letter::D)]
    #[case::marker_parens("ANSWER: (A)", Letter::A)]
    #[case::last_marker_wins("Format is ANSWER: A ... final ANSWER: B", Letter::B)]
    #[case::bare_upper("B", Letter::B)]
    #[case::bare_lower("  a  ", Letter::A)]
    #[case::bare_parens("(C)", Letter::C)]
    #[case::bare_period("D.", Letter::D)]
    #[case::prose_upper("I am fairly confident the right choice is C here.", Letter::C)]
    #[case::prose_lower("the option to pick is b because of entropy", Letter::B)]
    #[case::prose_parens("Going with (a) after all.", Letter::A)]
    #[case::prose_lower_a_last("I think the correct option is a.", Letter::A)]
    #[case::prose_lower_a_after_colon("my final pick: a", Letter::A)]
    #[case::prose_lower_a_trailing("answer is a", Letter::A)]
    #[case::prose_lower_a_choice("choice a fits the data best", Letter::A)]
    #[case::article_beside_letter("It is a tricky one, but B.", Letter::B)]
    fn test_extract_answer(#[case] response: &str, #[case] expected: Letter) {
        assert_eq!(extract_answer(response), Some(expected));
    }

    #[rstest]
    #[case::empty("")]
    #[case::no_letter("I cannot determine this from the information given.")]
    #[case::ambiguous("It is either B or C.")]
    #[case::article_only("This is a hard one.")]
    #[case::lower_a_with_other_letter("Either option a or C, hard to say")]
    fn test_extract_answer_none(#[case] response: &str) {
        assert_eq!(extract_answer(response), None);
    }

    #[test]
    fn test_reasoning_block_is_ignored() {
        let response = "<think>Remember to write ANSWER: A at the end.</think>\nANSWER: D";
        assert_eq!(extract_answer(response), Some(Letter::D));
    }

    #[test]
    fn test_unterminated_reasoning_is_ignored() {
        assert_eq!(extract_answer("<think>maybe ANSWER: A"), None);
    }

    #[rstest]
    #[case::verified("Looks right.\nVERIFIED: B", Verdict::Verified(Letter::B))]
    #[case::changed("Step 3 is wrong.\nCHANGED: d", Verdict::Changed(Letter::D))]
    #[case::last_wins("VERIFIED: A ... on reflection CHANGED: C", Verdict::Changed(Letter::C))]
    #[case::fallback("ANSWER: A", Verdict::Unmarked(Letter::A))]
    fn test_extract_verdict(#[case] response: &str, #[case] expected: Verdict) {
        assert_eq!(extract_verdict(response), Some(expected));
    }

    #[test]
    fn test_extract_verdict_none() {
        assert_eq!(extract_verdict("I need more information."), None);
    }

    #[test]
    fn test_excerpt() {
        assert_eq!(excerpt("  short  ", 10), "short");
        assert_eq!(excerpt("abcdefghij", 4), "...ghij");
    }
}
