//! Canonical amounts from extraction candidates.

use std::str::FromStr;
use std::sync::Arc;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::error::ExtractionError;
use crate::formats::{CurrencyFormatRegistry, CurrencyFormatRule};
use crate::models::{ExtractionCandidate, NormalizedPrice};
use crate::patterns;

/// Turns candidates into integer minor units plus an ISO code.
#[derive(Debug, Clone, Copy)]
pub struct PriceNormalizer<'r> {
    registry: &'r CurrencyFormatRegistry,
}

impl<'r> PriceNormalizer<'r> {
    pub fn new(registry: &'r CurrencyFormatRegistry) -> Self {
        Self { registry }
    }

    /// Normalize a candidate. Errors mean the candidate must be discarded.
    pub fn normalize(
        &self,
        candidate: &ExtractionCandidate<'_>,
    ) -> Result<NormalizedPrice, ExtractionError> {
        let rule = self.resolve_format(candidate)?;
        let currency_code = rule
            .currency_code()
            .ok_or_else(|| ExtractionError::UnknownCurrency(rule.id.clone()))?;

        // Separators follow the pattern that matched; handler candidates use the rule's.
        let thousands = candidate
            .matched_pattern
            .as_ref()
            .map(|p| p.format.thousands_separator.as_str())
            .unwrap_or(rule.thousands_separator.as_str());

        let amount_cents = to_minor_units(
            &candidate.integer_part,
            candidate.fraction_part.as_deref(),
            thousands,
        )?;

        Ok(NormalizedPrice::new(amount_cents, currency_code))
    }

    /// Resolve the format of a candidate. Symbols take precedence over codes.
    pub fn resolve_format(
        &self,
        candidate: &ExtractionCandidate<'_>,
    ) -> Result<Arc<CurrencyFormatRule>, ExtractionError> {
        let symbol = candidate.currency_symbol.as_deref().map(str::trim);
        let code = candidate.currency_code.as_deref().map(str::trim);

        if let Some(symbol) = symbol.filter(|s| !s.is_empty()) {
            if let Some(rule) = self.registry.lookup_by_symbol(symbol) {
                return Ok(rule);
            }
            if let Some((prefix, rest)) = split_country_prefix(symbol) {
                if let Some(rule) = self.spelled_with_prefix(candidate, prefix, rest) {
                    return Ok(rule);
                }
                // `HK$` without a rule of its own is not a dollar of any known country.
                if self.registry.lookup_by_symbol(rest).is_some() {
                    return Err(ExtractionError::UnknownCurrency(symbol.to_string()));
                }
            }
        }

        if let Some(rule) = code.and_then(|c| self.registry.lookup_by_code(c)) {
            return Ok(rule);
        }

        if let Some(pattern) = &candidate.matched_pattern {
            let owned = symbol.into_iter().chain(code).any(|t| pattern.format.owns(t));
            if owned {
                return Ok(Arc::clone(&pattern.format));
            }
        }

        Err(ExtractionError::UnknownCurrency(
            symbol.or(code).unwrap_or_default().to_string(),
        ))
    }

    /// Rule whose code starts with `prefix` and which writes `glyph`, either
    /// as a symbol or as the glyph of one. The matched pattern's own format
    /// is preferred over the registry.
    fn spelled_with_prefix(
        &self,
        candidate: &ExtractionCandidate<'_>,
        prefix: &str,
        glyph: &str,
    ) -> Option<Arc<CurrencyFormatRule>> {
        let spelled = |rule: &CurrencyFormatRule| {
            rule.currency_code().is_some_and(|c| c.starts_with(prefix))
                && rule
                    .symbols
                    .iter()
                    .any(|s| s == glyph || patterns::currency_glyph(s) == Some(glyph))
        };

        candidate
            .matched_pattern
            .iter()
            .map(|p| &p.format)
            .chain(self.registry.formats())
            .find(|rule| spelled(rule))
            .cloned()
    }
}

/// `HK$` -> `("HK", "$")`.
fn split_country_prefix(symbol: &str) -> Option<(&str, &str)> {
    let prefix = symbol.get(..2)?;
    let rest = &symbol[2..];
    (prefix.chars().all(|c| c.is_ascii_uppercase()) && !rest.is_empty()).then_some((prefix, rest))
}

/// Parse integer and fraction parts into minor units. The integer part may
/// contain the thousands separators of `thousands`; anything else fails.
pub fn to_minor_units(
    integer: &str,
    fraction: Option<&str>,
    thousands: &str,
) -> Result<i64, ExtractionError> {
    let parse_error = |field: &str, value: &str| ExtractionError::Parse {
        field: field.to_string(),
        value: value.to_string(),
    };

    let separators =
        patterns::separator_chars(thousands).map_err(|_| parse_error("thousands", thousands))?;
    let digits: String = integer.trim().chars().filter(|c| !separators.contains(c)).collect();
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(parse_error("integer", integer));
    }

    let fraction = match fraction.map(str::trim) {
        None | Some("") => "00".to_string(),
        Some(f) if f.len() == 1 && f.chars().all(|c| c.is_ascii_digit()) => format!("{f}0"),
        Some(f) if f.len() == 2 && f.chars().all(|c| c.is_ascii_digit()) => f.to_string(),
        Some(f) => return Err(parse_error("fraction", f)),
    };

    let canonical = format!("{digits}.{fraction}");
    let amount = Decimal::from_str(&canonical).map_err(|_| ExtractionError::Overflow(canonical.clone()))?;

    amount
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|cents| cents.to_i64())
        .ok_or(ExtractionError::Overflow(canonical))
}
