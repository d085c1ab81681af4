//! Fixed regex patterns shared by the compiler and the pipeline.

use lazy_static::lazy_static;
use regex::Regex;

/// Qualifiers that introduce a bound rather than a price ("Under $20").
pub const CONTEXT_WORDS: &[&str] = &[
    "starting at",
    "starts at",
    "as low as",
    "less than",
    "more than",
    "up to",
    "under",
    "below",
    "over",
    "from",
];

/// Dash joining the two ends of a range.
pub const RANGE_JOINER: &str = r"\s*[-\u{2013}\u{2014}]\s*";

/// Hours annotation appended to converted prices, e.g. `(2h 30m)`.
pub const ANNOTATION_MARKER: &str = r"\s*\(\s*(?:[0-9]+(?:[.,][0-9]+)?\s*h(?:rs?|ours?)?(?:\s*[0-9]+\s*m(?:in)?)?|[0-9]+\s*m(?:in)?)\s*\)";

lazy_static! {
    /// `digit separator digit` shape used by the pre-filter.
    pub static ref PRICE_SHAPE: Regex = Regex::new(
        r"[0-9][.,\s\u{00a0}\u{202f}][0-9]"
    ).unwrap();

    /// Machine-readable amount as found in `data-price` style attributes.
    pub static ref MACHINE_AMOUNT: Regex = Regex::new(
        r"^\s*([0-9]+)(?:\.([0-9]{1,2}))?\s*$"
    ).unwrap();

    /// Annotation marker anchored at the start of the remaining text.
    pub static ref TRAILING_ANNOTATION: Regex = Regex::new(
        &format!("^{}", ANNOTATION_MARKER)
    ).unwrap();
}

/// Case-insensitive alternation over the context vocabulary, including the
/// whitespace that follows the word.
pub fn context_prefix() -> String {
    let words: Vec<String> = CONTEXT_WORDS
        .iter()
        .map(|w| w.split_whitespace().map(regex::escape).collect::<Vec<_>>().join(r"\s+"))
        .collect();
    format!(r"(?i:\b(?:{})\s+)", words.join("|"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_annotation_marker() {
        assert!(TRAILING_ANNOTATION.is_match(" (2h 30m)"));
        assert!(TRAILING_ANNOTATION.is_match("(1.5 hours)"));
        assert!(TRAILING_ANNOTATION.is_match(" (45 min)"));
        assert!(!TRAILING_ANNOTATION.is_match(" (new)"));
        assert!(!TRAILING_ANNOTATION.is_match(" today (2h)"));
    }

    #[test]
    fn test_machine_amount() {
        let caps = MACHINE_AMOUNT.captures(" 8.48 ").unwrap();
        assert_eq!(&caps[1], "8");
        assert_eq!(&caps[2], "48");
        assert!(MACHINE_AMOUNT.is_match("1200"));
        assert!(!MACHINE_AMOUNT.is_match("1,200.00"));
    }

    #[test]
    fn test_context_prefix() {
        let re = Regex::new(&context_prefix()).unwrap();
        assert!(re.is_match("Under "));
        assert!(re.is_match("starting  at "));
        assert!(!re.is_match("thunder "));
    }
}
