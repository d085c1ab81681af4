//! Price pattern compilation.
//!
//! A [`PricePattern`] is built from one [`CurrencyFormatRule`] and one
//! [`PatternCategory`]. Every pattern is a set of alternative regexes sharing
//! the capture names `sym`, `code`, `int` and `frac`, so the normalizer can
//! read components without knowing which shape matched.

mod cache;
mod delimiters;
mod fixed;
mod matcher;

use std::sync::Arc;

use regex::Regex;
use tracing::trace;

use crate::error::ConfigError;
use crate::formats::CurrencyFormatRule;
use crate::models::PatternCategory;

pub use cache::PatternCache;
pub use delimiters::{
    build_decimal_string, build_thousands_string, decimal_glyph, separator_chars, thousands_glyph,
};
pub use fixed::{
    context_prefix, ANNOTATION_MARKER, CONTEXT_WORDS, MACHINE_AMOUNT, PRICE_SHAPE, RANGE_JOINER,
    TRAILING_ANNOTATION,
};
pub use matcher::{CompiledMatcher, RawMatch};

/// A compiled matcher for one format and category. Immutable once built.
#[derive(Debug)]
pub struct PricePattern {
    /// Format the pattern was built from.
    pub format: Arc<CurrencyFormatRule>,
    pub category: PatternCategory,
    pub matcher: CompiledMatcher,
    pub base_confidence: f32,
}

impl PartialEq for PricePattern {
    fn eq(&self, other: &Self) -> bool {
        self.format.id == other.format.id && self.category == other.category
    }
}

impl PricePattern {
    pub fn find(&self, text: &str) -> Option<RawMatch> {
        self.matcher.find(text)
    }

    pub fn find_all(&self, text: &str) -> Vec<RawMatch> {
        self.matcher.find_all(text)
    }
}

/// Builds and memoizes price patterns.
#[derive(Debug, Default)]
pub struct PatternCompiler {
    patterns: PatternCache<(String, PatternCategory), Arc<PricePattern>>,
    legacy: PatternCache<(String, bool), Regex>,
}

impl PatternCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiled pattern for `(rule.id, category)`, built on first use.
    pub fn build_pattern(
        &self,
        rule: &CurrencyFormatRule,
        category: PatternCategory,
    ) -> Result<Arc<PricePattern>, ConfigError> {
        self.patterns
            .get_or_try_insert((rule.id.clone(), category), || {
                let sources = category_sources(rule, category)?;
                let spaced_groups = separator_chars(&rule.thousands_separator)?.contains(&' ');
                let matcher = CompiledMatcher::compile(&sources)
                    .map_err(|e| ConfigError::InvalidPattern {
                        format: rule.id.clone(),
                        reason: e.to_string(),
                    })?
                    .rejecting_spaced_groups(!spaced_groups);

                trace!(
                    "Compiled {} pattern for {} ({} alternatives)",
                    category,
                    rule.id,
                    sources.len()
                );

                Ok(Arc::new(PricePattern {
                    format: Arc::new(rule.clone()),
                    category,
                    matcher,
                    base_confidence: category.base_confidence(),
                }))
            })
    }

    /// Single regex over every structural shape of the rule, without named
    /// groups. With `reverse`, a match must be followed by an hours annotation.
    pub fn build_legacy_matcher(
        &self,
        rule: &CurrencyFormatRule,
        reverse: bool,
    ) -> Result<Regex, ConfigError> {
        self.legacy.get_or_try_insert((rule.id.clone(), reverse), || {
            let mut alternatives = Vec::new();
            for category in PatternCategory::STRUCTURAL {
                alternatives.extend(sources_with(rule, category, Capture::Plain)?);
            }

            let joined = alternatives
                .iter()
                .map(|a| format!("(?:{a})"))
                .collect::<Vec<_>>()
                .join("|");
            let source = if reverse {
                format!("(?:{joined}){ANNOTATION_MARKER}")
            } else {
                joined
            };

            Regex::new(&source).map_err(|e| ConfigError::InvalidPattern {
                format: rule.id.clone(),
                reason: e.to_string(),
            })
        })
    }

    /// Number of compiled price patterns held.
    pub fn cached_len(&self) -> usize {
        self.patterns.len()
    }
}

/// Regex sources for one category, with named captures.
/// Glyph a symbol is written with once its uppercase country letters are
/// dropped: `US$` -> `$`, `CN¥` -> `¥`. Symbols spelled in letters have none.
pub fn currency_glyph(symbol: &str) -> Option<&str> {
    let glyph = symbol.trim_start_matches(|c: char| c.is_ascii_uppercase());
    (!glyph.is_empty() && !glyph.chars().any(char::is_alphanumeric)).then_some(glyph)
}

pub fn category_sources(
    rule: &CurrencyFormatRule,
    category: PatternCategory,
) -> Result<Vec<String>, ConfigError> {
    sources_with(rule, category, Capture::Named)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Capture {
    Named,
    Plain,
}

impl Capture {
    fn group(self, name: &str, body: &str) -> String {
        match self {
            Capture::Named => format!("(?P<{name}>{body})"),
            Capture::Plain => format!("(?:{body})"),
        }
    }
}

/// Side of the amount a token is written on.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Side {
    Before,
    After,
    Inner,
}

/// Alternation over tokens, longest first. Alphanumeric tokens get a word
/// boundary on the side away from the amount.
fn alternation(tokens: &[String], side: Side) -> Option<String> {
    let mut sorted: Vec<&String> = tokens.iter().filter(|t| !t.trim().is_empty()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()));

    let word = |c: Option<char>| c.is_some_and(char::is_alphanumeric);
    let parts: Vec<String> = sorted
        .iter()
        .map(|token| {
            let escaped = regex::escape(token);
            match side {
                Side::Before if word(token.chars().next()) => format!(r"\b{escaped}"),
                Side::After if word(token.chars().last()) => format!(r"{escaped}\b"),
                _ => escaped,
            }
        })
        .collect();

    Some(format!("(?:{})", parts.join("|")))
}

struct Number {
    thousands: &'static str,
    decimal: &'static str,
}

impl Number {
    fn for_rule(rule: &CurrencyFormatRule) -> Result<Self, ConfigError> {
        Ok(Self {
            thousands: build_thousands_string(&rule.thousands_separator)?,
            decimal: build_decimal_string(&rule.decimal_separator)?,
        })
    }

    fn source(&self, capture: Capture) -> String {
        let integer = capture.group("int", &format!("[0-9]+(?:{}[0-9]{{3}})*", self.thousands));
        let fraction = capture.group("frac", "[0-9]{1,2}");
        format!("{integer}(?:{}{fraction})?", self.decimal)
    }

    fn plain(&self) -> String {
        self.source(Capture::Plain)
    }
}

fn sources_with(
    rule: &CurrencyFormatRule,
    category: PatternCategory,
    capture: Capture,
) -> Result<Vec<String>, ConfigError> {
    let number = Number::for_rule(rule)?;
    let num = number.source(capture);
    let plain = number.plain();

    let sym = |side| alternation(&rule.symbols, side).map(|a| (capture.group("sym", &a), a));
    let code = |side| alternation(&rule.codes, side).map(|a| (capture.group("code", &a), a));

    let mut sources = Vec::new();
    match category {
        PatternCategory::Standard | PatternCategory::Spaced | PatternCategory::Contextual => {
            let (gap, prefix) = match category {
                PatternCategory::Standard => ("", String::new()),
                PatternCategory::Spaced => (r"\s+", String::new()),
                _ => (r"\s?", context_prefix()),
            };
            for token in [sym(Side::Before), code(Side::Before)].into_iter().flatten() {
                sources.push(format!("{prefix}{}{gap}{num}", token.0));
            }
            for token in [sym(Side::After), code(Side::After)].into_iter().flatten() {
                sources.push(format!("{prefix}{num}{gap}{}", token.0));
            }
        }
        PatternCategory::CountryPrefixed => {
            // Two country letters and the bare glyph, so `CA$` and `BR$` share
            // one shape. Rules spelled in letters keep their symbols.
            let mut glyphs: Vec<String> = Vec::new();
            for glyph in rule.symbols.iter().filter_map(|s| currency_glyph(s)) {
                if !glyphs.iter().any(|g| g == glyph) {
                    glyphs.push(glyph.to_string());
                }
            }
            if glyphs.is_empty() {
                glyphs = rule.symbols.clone();
            }
            if let Some(alt) = alternation(&glyphs, Side::Inner) {
                let symbol = capture.group("sym", &format!(r"\b[A-Z]{{2}}{alt}"));
                sources.push(format!(r"{symbol}\s?{num}"));
            }
        }
        PatternCategory::SymbolBetween => {
            if let Some(alt) = alternation(&rule.symbols, Side::Inner) {
                sources.push(format!(
                    r"{}{}[ \u{{00a0}}]?{}",
                    capture.group("int", "[0-9]+"),
                    capture.group("sym", &alt),
                    capture.group("frac", "[0-9]{2}"),
                ));
            }
        }
        PatternCategory::Range => {
            for (before, after) in [
                (sym(Side::Before), sym(Side::After)),
                (code(Side::Before), code(Side::After)),
            ] {
                if let Some((group, bare)) = before {
                    sources.push(format!(
                        r"{group}\s?{num}{RANGE_JOINER}(?:{bare}\s?)?{plain}"
                    ));
                }
                if let Some((group, bare)) = after {
                    sources.push(format!(
                        r"{num}\s?(?:{bare}\s*)?{RANGE_JOINER}{plain}\s?{group}"
                    ));
                }
            }
        }
    }

    if sources.is_empty() {
        return Err(ConfigError::InvalidFormat {
            id: rule.id.clone(),
            reason: format!("no {category} pattern can be built without symbols or codes"),
        });
    }
    Ok(sources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::{builtin_formats, CurrencyFormatRegistry};
    use pretty_assertions::assert_eq;

    fn pattern(id: &str, category: PatternCategory) -> Arc<PricePattern> {
        let registry = CurrencyFormatRegistry::builtin();
        let rule = registry.lookup_by_id(id).unwrap();
        registry.pattern(&rule, category).unwrap()
    }

    fn parts(m: &RawMatch) -> (Option<&str>, Option<&str>, &str, Option<&str>) {
        (
            m.symbol.as_deref(),
            m.code.as_deref(),
            m.integer.as_str(),
            m.fraction.as_deref(),
        )
    }

    #[test]
    fn test_every_builtin_rule_builds_every_category() {
        let compiler = PatternCompiler::new();
        for rule in builtin_formats() {
            for category in PatternCategory::ALL {
                let built = compiler.build_pattern(&rule, category);
                assert!(built.is_ok(), "{} / {}: {:?}", rule.id, category, built.err());
            }
            assert!(compiler.build_legacy_matcher(&rule, false).is_ok());
            assert!(compiler.build_legacy_matcher(&rule, true).is_ok());
        }
        assert_eq!(
            compiler.cached_len(),
            builtin_formats().len() * PatternCategory::ALL.len()
        );
    }

    #[test]
    fn test_invalid_delimiter_fails_build() {
        let compiler = PatternCompiler::new();
        let rule = CurrencyFormatRule::new("odd", "und")
            .with_symbols(["¤"])
            .with_codes(["XXX"])
            .with_separators("commas", "semicolon");

        for category in PatternCategory::ALL {
            assert_eq!(
                compiler.build_pattern(&rule, category).unwrap_err(),
                ConfigError::UnrecognizedDelimiter("semicolon".to_string())
            );
        }
        assert_eq!(compiler.cached_len(), 0);
    }

    #[test]
    fn test_patterns_are_memoized() {
        let registry = CurrencyFormatRegistry::builtin();
        let rule = registry.lookup_by_id("eur").unwrap();

        let first = registry.pattern(&rule, PatternCategory::Standard).unwrap();
        let second = registry.pattern(&rule, PatternCategory::Standard).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.compiler().cached_len(), 1);
    }

    #[test]
    fn test_standard_shapes() {
        let usd = pattern("usd", PatternCategory::Standard);
        let m = usd.find("Total: $2,500,000").unwrap();
        assert_eq!(parts(&m), (Some("$"), None, "2,500,000", None));

        let m = usd.find("USD12.50").unwrap();
        assert_eq!(parts(&m), (None, Some("USD"), "12", Some("50")));

        let eur = pattern("eur", PatternCategory::Standard);
        let m = eur.find("nur 1.234,56€").unwrap();
        assert_eq!(parts(&m), (Some("€"), None, "1.234", Some("56")));
    }

    #[test]
    fn test_standard_rejects_symbol_glued_to_word() {
        let usd = pattern("usd", PatternCategory::Standard);
        assert!(usd.find("word$").is_none());
        assert!(usd.find("XUS$5").is_none());
        assert!(usd.find("HK$45.50").is_none());
        assert!(usd.find("MUSD5").is_none());
    }

    #[test]
    fn test_spaced_shapes() {
        let pln = pattern("pln", PatternCategory::Spaced);
        let m = pln.find("Cena: 1 299,99 zł").unwrap();
        assert_eq!(parts(&m), (Some("zł"), None, "1 299", Some("99")));

        let usd = pattern("usd", PatternCategory::Spaced);
        let m = usd.find("USD 10").unwrap();
        assert_eq!(parts(&m), (None, Some("USD"), "10", None));
        assert!(usd.find("$10").is_none());
    }

    #[test]
    fn test_country_prefixed() {
        let usd = pattern("usd", PatternCategory::CountryPrefixed);
        let m = usd.find("US$34.56").unwrap();
        assert_eq!(parts(&m), (Some("US$"), None, "34", Some("56")));
        assert!(usd.find("$34.56").is_none());
    }

    #[test]
    fn test_country_prefixed_uses_bare_glyph() {
        let cad = pattern("cad", PatternCategory::CountryPrefixed);
        assert_eq!(cad.find("CA$12.00").unwrap().symbol.as_deref(), Some("CA$"));
        assert!(cad.find("C$12.00").is_none());

        let brl = pattern("brl", PatternCategory::CountryPrefixed);
        let m = brl.find("BR$1.234,56").unwrap();
        assert_eq!(parts(&m), (Some("BR$"), None, "1.234", Some("56")));

        let cny = pattern("cny", PatternCategory::CountryPrefixed);
        assert_eq!(cny.find("CN¥88").unwrap().symbol.as_deref(), Some("CN¥"));

        let sek = pattern("sek", PatternCategory::CountryPrefixed);
        assert_eq!(sek.find("SEkr49,00").unwrap().symbol.as_deref(), Some("SEkr"));
    }

    #[test]
    fn test_currency_glyph() {
        assert_eq!(currency_glyph("US$"), Some("$"));
        assert_eq!(currency_glyph("CN¥"), Some("¥"));
        assert_eq!(currency_glyph("€"), Some("€"));
        assert_eq!(currency_glyph("Fr."), None);
        assert_eq!(currency_glyph("kr"), None);
        assert_eq!(currency_glyph("元"), None);
    }

    #[test]
    fn test_comma_grouped_formats_skip_spaced_groups() {
        let gbp = pattern("gbp", PatternCategory::Standard);
        assert!(gbp.find("£1 234").is_none());
        assert_eq!(gbp.find("£1 23").unwrap().integer, "1");

        let eur = pattern("eur", PatternCategory::Standard);
        assert_eq!(eur.find("1 234€").unwrap().integer, "1 234");
    }

    #[test]
    fn test_symbol_between() {
        let eur = pattern("eur", PatternCategory::SymbolBetween);
        for text in ["449€00", "449€ 00"] {
            let m = eur.find(text).unwrap();
            assert_eq!(parts(&m), (Some("€"), None, "449", Some("00")));
        }
        assert!(eur.find("449€").is_none());
    }

    #[test]
    fn test_range_keeps_first_amount() {
        let usd = pattern("usd", PatternCategory::Range);
        let m = usd.find("$10 - $20").unwrap();
        assert_eq!(m.text, "$10 - $20");
        assert_eq!(parts(&m), (Some("$"), None, "10", None));

        let m = usd.find("$10.50–20").unwrap();
        assert_eq!(parts(&m), (Some("$"), None, "10", Some("50")));

        let eur = pattern("eur", PatternCategory::Range);
        let m = eur.find("10 - 20 €").unwrap();
        assert_eq!(parts(&m), (Some("€"), None, "10", None));
    }

    #[test]
    fn test_contextual() {
        let usd = pattern("usd", PatternCategory::Contextual);
        let m = usd.find("Under $20").unwrap();
        assert_eq!(m.text, "Under $20");
        assert_eq!(parts(&m), (Some("$"), None, "20", None));

        assert!(usd.find("starting at $5").is_some());
        assert!(usd.find("only $20").is_none());
    }

    #[test]
    fn test_legacy_matcher() {
        let registry = CurrencyFormatRegistry::builtin();
        let usd = registry.lookup_by_id("usd").unwrap();

        let plain = registry.compiler().build_legacy_matcher(&usd, false).unwrap();
        assert_eq!(plain.find("Now $19.99").unwrap().as_str(), "$19.99");
        assert_eq!(plain.captures_len(), 1);

        let reverse = registry.compiler().build_legacy_matcher(&usd, true).unwrap();
        assert!(reverse.find("Now $19.99").is_none());
        assert_eq!(
            reverse.find("Now $19.99 (2h 30m)").unwrap().as_str(),
            "$19.99 (2h 30m)"
        );
    }

    #[test]
    fn test_rule_without_codes_still_builds() {
        let compiler = PatternCompiler::new();
        let rule = CurrencyFormatRule::new("points", "und").with_symbols(["pts"]);
        let built = compiler.build_pattern(&rule, PatternCategory::Spaced).unwrap();
        assert_eq!(built.find("1,200 pts").unwrap().integer, "1,200");
    }
}
