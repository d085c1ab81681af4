//! Matcher-only surface for callers that scan text themselves.

use std::sync::Arc;

use regex::Regex;

use super::{validate_settings, StrategyCoordinator};
use crate::error::ConfigError;
use crate::formats::CurrencyFormatRule;
use crate::models::Settings;
use crate::patterns;

/// A compiled matcher plus the format it was built for.
#[derive(Debug, Clone)]
pub struct FoundPrices {
    /// Every structural price shape of the format, as one regex. In reverse
    /// search the shape must be followed by an hours annotation.
    pub pattern: Regex,
    /// Thousands separator sub-pattern.
    pub thousands: String,
    /// Decimal separator sub-pattern.
    pub decimal: String,
    /// Format the matcher was built for, with the user's separators.
    pub format_info: Arc<CurrencyFormatRule>,
}

impl StrategyCoordinator {
    /// Matcher for the format detected in `text`, or for the user's currency
    /// when none is detected. Separators always come from the settings.
    pub fn find_prices(&self, text: &str, settings: &Settings) -> Result<FoundPrices, ConfigError> {
        validate_settings(settings)?;

        let detected = self.registry().detect_format_from_text(text);
        let rule = match detected {
            Some(rule) => rule,
            None => self
                .formats_for("", settings)
                .into_iter()
                .next()
                .ok_or_else(|| ConfigError::InvalidFormat {
                    id: CurrencyFormatRule::from_settings(settings).id,
                    reason: "no format registered and settings carry no currency".to_string(),
                })?,
        };

        let rule = if rule.thousands_separator == settings.thousands
            && rule.decimal_separator == settings.decimal
        {
            rule
        } else {
            Arc::new(rule.with_user_separators(&settings.thousands, &settings.decimal))
        };

        let pattern = self
            .registry()
            .compiler()
            .build_legacy_matcher(&rule, settings.is_reverse_search)?;

        Ok(FoundPrices {
            pattern,
            thousands: patterns::build_thousands_string(&settings.thousands)?.to_string(),
            decimal: patterns::build_decimal_string(&settings.decimal)?.to_string(),
            format_info: rule,
        })
    }
}
