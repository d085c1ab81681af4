//! Locale currency formats and the registry that resolves them.

mod builtin;

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ConfigError;
use crate::models::{PatternCategory, Settings};
use crate::patterns::{self, PatternCompiler, PricePattern};

pub use builtin::{builtin_formats, DEFAULT_FORMAT_ID};

/// Where the currency symbol sits relative to the amount.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SymbolPosition {
    #[default]
    Before,
    After,
    Between,
    None,
}

/// How one currency is written in one locale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrencyFormatRule {
    /// Unique rule id.
    pub id: String,

    /// Symbols as written (`$`, `US$`).
    pub symbols: Vec<String>,

    /// ISO codes; the first one is the canonical code.
    pub codes: Vec<String>,

    /// Locale the rule describes (`en-US`).
    pub locale_id: String,

    /// Thousands separator token (`commas`, `spacesAndDots`).
    #[serde(alias = "thousands")]
    pub thousands_separator: String,

    /// Decimal separator token (`dot`, `comma`).
    #[serde(alias = "decimal")]
    pub decimal_separator: String,

    /// Preferred symbol placement.
    #[serde(default)]
    pub symbol_position: SymbolPosition,
}

impl CurrencyFormatRule {
    /// Create an empty rule with English separators.
    pub fn new(id: impl Into<String>, locale_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            symbols: Vec::new(),
            codes: Vec::new(),
            locale_id: locale_id.into(),
            thousands_separator: "commas".to_string(),
            decimal_separator: "dot".to_string(),
            symbol_position: SymbolPosition::Before,
        }
    }

    /// Build a rule from user settings. The id covers every setting so
    /// patterns cached for one configuration are never reused for another.
    pub fn from_settings(settings: &Settings) -> Self {
        let code = settings.currency_code.trim().to_ascii_uppercase();
        let symbol = settings.currency_symbol.trim();
        let id = format!(
            "settings:{}:{}@{}/{}",
            code.to_ascii_lowercase(),
            symbol,
            settings.thousands,
            settings.decimal
        );
        Self::new(id, "und")
            .with_symbols(Some(symbol).filter(|s| !s.is_empty()))
            .with_codes(Some(code.as_str()).filter(|c| !c.is_empty()))
            .with_separators(&settings.thousands, &settings.decimal)
    }

    pub fn with_symbols<I, S>(mut self, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for symbol in symbols {
            let symbol = symbol.into();
            if !self.symbols.contains(&symbol) {
                self.symbols.push(symbol);
            }
        }
        self
    }

    pub fn with_codes<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for code in codes {
            let code = code.into().to_ascii_uppercase();
            if !self.codes.contains(&code) {
                self.codes.push(code);
            }
        }
        self
    }

    pub fn with_separators(mut self, thousands: impl Into<String>, decimal: impl Into<String>) -> Self {
        self.thousands_separator = thousands.into();
        self.decimal_separator = decimal.into();
        self
    }

    pub fn with_position(mut self, position: SymbolPosition) -> Self {
        self.symbol_position = position;
        self
    }

    /// Canonical ISO code of the rule.
    pub fn currency_code(&self) -> Option<&str> {
        self.codes.first().map(String::as_str)
    }

    /// Whether the rule owns the symbol or code.
    pub fn owns(&self, token: &str) -> bool {
        self.symbols.iter().any(|s| s == token)
            || self.codes.iter().any(|c| c.eq_ignore_ascii_case(token))
    }

    /// Copy of the rule with other separators, under a derived id.
    pub fn with_user_separators(&self, thousands: &str, decimal: &str) -> Self {
        let mut rule = self.clone().with_separators(thousands, decimal);
        rule.id = format!("{}@{}/{}", self.id, thousands, decimal);
        rule
    }

    /// Render an amount the way this locale writes it.
    pub fn format_amount(&self, amount_cents: u64) -> Result<String, ConfigError> {
        let group = patterns::thousands_glyph(&self.thousands_separator)?;
        let point = patterns::decimal_glyph(&self.decimal_separator)?;

        let integer = (amount_cents / 100).to_string();
        let fraction = format!("{:02}", amount_cents % 100);
        let grouped = group_digits(&integer, group);

        let symbol = self.symbols.first().map(String::as_str).unwrap_or("");
        let code = self.currency_code().unwrap_or("");

        Ok(match self.symbol_position {
            SymbolPosition::Before => format!("{symbol}{grouped}{point}{fraction}"),
            SymbolPosition::After => format!("{grouped}{point}{fraction}{symbol}"),
            SymbolPosition::Between => format!("{integer}{symbol}{fraction}"),
            SymbolPosition::None => format!("{grouped}{point}{fraction} {code}"),
        })
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidFormat {
            id: self.id.clone(),
            reason: reason.to_string(),
        };

        if self.id.trim().is_empty() {
            return Err(invalid("empty id"));
        }
        if self.symbols.is_empty() || self.symbols.iter().any(|s| s.trim().is_empty()) {
            return Err(invalid("at least one non-empty symbol is required"));
        }
        if self.codes.is_empty() || self.codes.iter().any(|c| c.trim().is_empty()) {
            return Err(invalid("at least one non-empty code is required"));
        }

        patterns::build_thousands_string(&self.thousands_separator)?;
        patterns::build_decimal_string(&self.decimal_separator)?;
        Ok(())
    }
}

fn group_digits(integer: &str, group: char) -> String {
    let chars: Vec<char> = integer.chars().collect();
    let mut formatted = String::with_capacity(chars.len() + chars.len() / 3);

    for (i, c) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % 3 == 0 {
            formatted.push(group);
        }
        formatted.push(*c);
    }

    formatted
}

/// Registry of currency format rules plus the pattern cache built from them.
#[derive(Debug, Default)]
pub struct CurrencyFormatRegistry {
    rules: Vec<Arc<CurrencyFormatRule>>,
    by_id: HashMap<String, usize>,
    by_symbol: HashMap<String, usize>,
    by_code: HashMap<String, usize>,
    /// Symbols sorted longest first, registration order on ties.
    symbol_scan: Vec<(String, usize)>,
    compiler: PatternCompiler,
}

impl CurrencyFormatRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in table.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for rule in builtin_formats() {
            if let Err(e) = registry.register_format(rule) {
                warn!("Skipping built-in format: {}", e);
            }
        }
        registry
    }

    /// Register a rule. Fails if one of its symbols or codes is already owned
    /// by a different rule; the earlier registration is kept.
    pub fn register_format(
        &mut self,
        rule: CurrencyFormatRule,
    ) -> Result<Arc<CurrencyFormatRule>, ConfigError> {
        rule.validate()?;

        if self.by_id.contains_key(&rule.id) {
            return Err(ConfigError::DuplicateFormat(rule.id));
        }

        let conflict = |key: &str, index: usize| ConfigError::DuplicateSymbol {
            key: key.to_string(),
            existing: self.rules[index].id.clone(),
            attempted: rule.id.clone(),
        };

        for symbol in &rule.symbols {
            if let Some(&index) = self.by_symbol.get(symbol) {
                return Err(conflict(symbol, index));
            }
        }
        for code in &rule.codes {
            if let Some(&index) = self.by_code.get(&code.to_ascii_uppercase()) {
                return Err(conflict(code, index));
            }
        }

        let index = self.rules.len();
        for symbol in &rule.symbols {
            self.by_symbol.insert(symbol.clone(), index);
            self.symbol_scan.push((symbol.clone(), index));
        }
        for code in &rule.codes {
            self.by_code.insert(code.to_ascii_uppercase(), index);
        }
        self.symbol_scan
            .sort_by(|a, b| b.0.chars().count().cmp(&a.0.chars().count()).then(a.1.cmp(&b.1)));
        self.by_id.insert(rule.id.clone(), index);

        debug!(
            "Registered currency format {} ({} symbols, {} codes)",
            rule.id,
            rule.symbols.len(),
            rule.codes.len()
        );

        let rule = Arc::new(rule);
        self.rules.push(Arc::clone(&rule));
        Ok(rule)
    }

    pub fn lookup_by_symbol(&self, symbol: &str) -> Option<Arc<CurrencyFormatRule>> {
        self.by_symbol.get(symbol).map(|&i| Arc::clone(&self.rules[i]))
    }

    pub fn lookup_by_code(&self, code: &str) -> Option<Arc<CurrencyFormatRule>> {
        self.by_code
            .get(&code.trim().to_ascii_uppercase())
            .map(|&i| Arc::clone(&self.rules[i]))
    }

    pub fn lookup_by_id(&self, id: &str) -> Option<Arc<CurrencyFormatRule>> {
        self.by_id.get(id).map(|&i| Arc::clone(&self.rules[i]))
    }

    /// The format used when nothing in the text or settings resolves.
    pub fn default_format(&self) -> Option<Arc<CurrencyFormatRule>> {
        self.lookup_by_id(DEFAULT_FORMAT_ID)
            .or_else(|| self.rules.first().cloned())
    }

    /// First format whose symbol (preferred) or code occurs in the text.
    pub fn detect_format_from_text(&self, text: &str) -> Option<Arc<CurrencyFormatRule>> {
        self.detect_formats_in_text(text).into_iter().next()
    }

    /// Every format whose symbol or code occurs in the text: symbol matches
    /// first (longest symbol first), then code matches.
    pub fn detect_formats_in_text(&self, text: &str) -> Vec<Arc<CurrencyFormatRule>> {
        let mut found: Vec<usize> = Vec::new();

        for (symbol, index) in &self.symbol_scan {
            if !found.contains(index) && contains_token(text, symbol) {
                found.push(*index);
            }
        }

        for (index, rule) in self.rules.iter().enumerate() {
            if !found.contains(&index) && rule.codes.iter().any(|code| contains_token(text, code)) {
                found.push(index);
            }
        }

        found.into_iter().map(|i| Arc::clone(&self.rules[i])).collect()
    }

    /// Registered rules in registration order.
    pub fn formats(&self) -> impl Iterator<Item = &Arc<CurrencyFormatRule>> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Compiled pattern for a rule and category, built on first use.
    pub fn pattern(
        &self,
        rule: &CurrencyFormatRule,
        category: PatternCategory,
    ) -> Result<Arc<PricePattern>, ConfigError> {
        self.compiler.build_pattern(rule, category)
    }

    pub fn compiler(&self) -> &PatternCompiler {
        &self.compiler
    }
}

/// Token occurrence that is not glued to surrounding letters.
fn contains_token(text: &str, token: &str) -> bool {
    if token.is_empty() {
        return false;
    }

    let starts_alpha = token.chars().next().is_some_and(char::is_alphabetic);
    let ends_alpha = token.chars().last().is_some_and(char::is_alphabetic);

    text.match_indices(token).any(|(start, matched)| {
        let end = start + matched.len();
        let before_ok = !starts_alpha
            || !text[..start].chars().next_back().is_some_and(char::is_alphabetic);
        let after_ok = !ends_alpha || !text[end..].chars().next().is_some_and(char::is_alphabetic);
        before_ok && after_ok
    })
}
