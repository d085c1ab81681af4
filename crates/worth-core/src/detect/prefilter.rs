//! Cheap rejection of texts that cannot hold a price.

use crate::formats::CurrencyFormatRegistry;
use crate::models::Settings;
use crate::patterns::PRICE_SHAPE;

/// `false` only when the text has no known symbol or code, none of the
/// user's currency tokens and no `digit separator digit` shape.
pub fn might_contain_price(registry: &CurrencyFormatRegistry, text: &str, settings: &Settings) -> bool {
    if text.trim().is_empty() || !text.chars().any(|c| c.is_ascii_digit()) {
        return false;
    }

    let user_tokens = [settings.currency_symbol.trim(), settings.currency_code.trim()];
    user_tokens.iter().any(|t| !t.is_empty() && text.contains(t))
        || PRICE_SHAPE.is_match(text)
        || registry.detect_format_from_text(text).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_might_contain_price() {
        let registry = CurrencyFormatRegistry::builtin();
        let settings = Settings::default();

        assert!(might_contain_price(&registry, "$5", &settings));
        assert!(might_contain_price(&registry, "5 zł", &settings));
        assert!(might_contain_price(&registry, "12,50", &settings));
        assert!(!might_contain_price(&registry, "Add to cart", &settings));
        assert!(!might_contain_price(&registry, "Only 3 left", &settings));
        assert!(!might_contain_price(&registry, "word$", &settings));
    }

    #[test]
    fn test_user_symbol_passes() {
        let registry = CurrencyFormatRegistry::builtin();
        let settings = Settings::new("SFr", "CHF", "commas", "dot");

        assert!(might_contain_price(&registry, "SFr 5", &settings));
    }
}
