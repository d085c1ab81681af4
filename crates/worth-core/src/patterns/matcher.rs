//! Compiled matchers and the raw components they capture.

use regex::Regex;

/// A match before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMatch {
    /// Byte offset of the match start.
    pub start: usize,
    /// Byte offset of the match end.
    pub end: usize,
    /// Matched text.
    pub text: String,
    /// Captured currency symbol.
    pub symbol: Option<String>,
    /// Captured currency code.
    pub code: Option<String>,
    /// Integer part with separators as written.
    pub integer: String,
    /// Fraction digits.
    pub fraction: Option<String>,
}

impl RawMatch {
    pub fn overlaps(&self, start: usize, end: usize) -> bool {
        self.start < end && start < self.end
    }
}

/// A set of alternative regexes sharing the capture names `sym`, `code`,
/// `int` and `frac`.
#[derive(Debug, Clone)]
pub struct CompiledMatcher {
    alternatives: Vec<Regex>,
    /// Reject whole-number matches followed by a space-separated group of
    /// three digits, so `£1 234` is not read as `£1`.
    reject_spaced_groups: bool,
}

impl CompiledMatcher {
    /// Compile alternative sources.
    pub fn compile(sources: &[String]) -> Result<Self, regex::Error> {
        let alternatives = sources
            .iter()
            .map(|source| Regex::new(source))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            alternatives,
            reject_spaced_groups: false,
        })
    }

    /// For formats whose thousands separator is not a space.
    pub fn rejecting_spaced_groups(mut self, enabled: bool) -> Self {
        self.reject_spaced_groups = enabled;
        self
    }

    /// All non-overlapping isolated matches, leftmost first.
    pub fn find_all(&self, text: &str) -> Vec<RawMatch> {
        let mut found: Vec<(usize, RawMatch)> = Vec::new();

        for (alt, re) in self.alternatives.iter().enumerate() {
            for caps in re.captures_iter(text) {
                let (Some(whole), Some(integer)) = (caps.get(0), caps.name("int")) else {
                    continue;
                };
                if !is_isolated(text, whole.start(), whole.end()) {
                    continue;
                }
                if self.reject_spaced_groups
                    && caps.name("frac").is_none()
                    && continues_in_spaced_group(text, whole.end())
                {
                    continue;
                }

                found.push((
                    alt,
                    RawMatch {
                        start: whole.start(),
                        end: whole.end(),
                        text: whole.as_str().to_string(),
                        symbol: caps.name("sym").map(|m| m.as_str().to_string()),
                        code: caps.name("code").map(|m| m.as_str().to_string()),
                        integer: integer.as_str().to_string(),
                        fraction: caps.name("frac").map(|m| m.as_str().to_string()),
                    },
                ));
            }
        }

        found.sort_by(|(alt_a, a), (alt_b, b)| {
            a.start
                .cmp(&b.start)
                .then(b.end.cmp(&a.end))
                .then(alt_a.cmp(alt_b))
        });

        let mut matches: Vec<RawMatch> = Vec::with_capacity(found.len());
        for (_, m) in found {
            if matches.last().is_none_or(|last| m.start >= last.end) {
                matches.push(m);
            }
        }
        matches
    }

    /// Leftmost isolated match.
    pub fn find(&self, text: &str) -> Option<RawMatch> {
        self.find_all(text).into_iter().next()
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.find(text).is_some()
    }

    /// Regex sources, one per alternative.
    pub fn sources(&self) -> Vec<&str> {
        self.alternatives.iter().map(Regex::as_str).collect()
    }
}

/// A match must not continue a longer number on either side
/// (`$1,23` or `10.999` are not prices), and a leading symbol must not be
/// the tail of a word (`HK$5` holds no bare `$5`).
fn is_isolated(text: &str, start: usize, end: usize) -> bool {
    let is_sep = |c: char| c == ',' || c == '.';
    let starts_with_glyph = text[start..].chars().next().is_some_and(|c| !c.is_alphanumeric());

    let mut before = text[..start].chars().rev();
    let before_ok = match (before.next(), before.next()) {
        (Some(c), _) if c.is_ascii_digit() => false,
        (Some(c), _) if starts_with_glyph && c.is_ascii_alphabetic() => false,
        (Some(c), Some(p)) if is_sep(c) && p.is_ascii_digit() => false,
        _ => true,
    };

    let mut after = text[end..].chars();
    let after_ok = match (after.next(), after.next()) {
        (Some(c), _) if c.is_ascii_digit() => false,
        (Some(c), Some(n)) if is_sep(c) && n.is_ascii_digit() => false,
        _ => true,
    };

    before_ok && after_ok
}

/// Whether a match ending in a digit at `end` is followed by a space, a
/// no-break space or a narrow no-break space and exactly three digits.
fn continues_in_spaced_group(text: &str, end: usize) -> bool {
    if !text[..end].chars().next_back().is_some_and(|c| c.is_ascii_digit()) {
        return false;
    }

    let mut after = text[end..].chars();
    let spaced = after
        .next()
        .is_some_and(|c| matches!(c, ' ' | '\u{00a0}' | '\u{202f}'));
    let group = after.by_ref().take(3).filter(|c| c.is_ascii_digit()).count() == 3;
    spaced && group && !after.next().is_some_and(|c| c.is_ascii_digit())
}
