//! Built-in currency format table.

use super::{CurrencyFormatRule, SymbolPosition};

/// Id of the rule used when nothing else can be resolved.
pub const DEFAULT_FORMAT_ID: &str = "usd";

/// Built-in rules in registration order. Earlier rules win symbol conflicts.
pub fn builtin_formats() -> Vec<CurrencyFormatRule> {
    use SymbolPosition::{After, Before};

    vec![
        rule("usd", "en-US", &["$", "US$"], &["USD"], "commas", "dot", Before),
        rule("eur", "de-DE", &["€"], &["EUR"], "spacesAndDots", "comma", After),
        rule("gbp", "en-GB", &["£"], &["GBP"], "commas", "dot", Before),
        rule("jpy", "ja-JP", &["¥", "円"], &["JPY"], "commas", "dot", Before),
        rule("cny", "zh-CN", &["CN¥", "元"], &["CNY", "RMB"], "commas", "dot", Before),
        rule("inr", "en-IN", &["₹"], &["INR"], "commas", "dot", Before),
        rule("cad", "en-CA", &["C$", "CA$"], &["CAD"], "commas", "dot", Before),
        rule("aud", "en-AU", &["A$", "AU$"], &["AUD"], "commas", "dot", Before),
        rule("nzd", "en-NZ", &["NZ$"], &["NZD"], "commas", "dot", Before),
        rule("brl", "pt-BR", &["R$"], &["BRL"], "spacesAndDots", "comma", Before),
        rule("mxn", "es-MX", &["MX$"], &["MXN"], "commas", "dot", Before),
        rule("chf", "de-CH", &["Fr."], &["CHF"], "commas", "dot", Before),
        rule("sek", "sv-SE", &["kr"], &["SEK"], "spacesAndDots", "comma", After),
        rule("pln", "pl-PL", &["zł"], &["PLN"], "spacesAndDots", "comma", After),
        rule("krw", "ko-KR", &["₩"], &["KRW"], "commas", "dot", Before),
        rule("rub", "ru-RU", &["₽"], &["RUB"], "spacesAndDots", "comma", After),
        rule("try", "tr-TR", &["₺"], &["TRY"], "spacesAndDots", "comma", After),
    ]
}

fn rule(
    id: &str,
    locale: &str,
    symbols: &[&str],
    codes: &[&str],
    thousands: &str,
    decimal: &str,
    position: SymbolPosition,
) -> CurrencyFormatRule {
    CurrencyFormatRule::new(id, locale)
        .with_symbols(symbols.iter().copied())
        .with_codes(codes.iter().copied())
        .with_separators(thousands, decimal)
        .with_position(position)
}
