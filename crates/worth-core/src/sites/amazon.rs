//! Amazon splits prices into symbol, whole and fraction spans and keeps a
//! screen-reader copy in `.a-offscreen`.

use lazy_static::lazy_static;
use scraper::{ElementRef, Selector};

use super::{HandlerContext, SiteHandler, SITE_HANDLER_CONFIDENCE};
use crate::models::{ExtractionCandidate, Strategy};

lazy_static! {
    static ref PRICE: Selector = Selector::parse(".a-price").unwrap();
    static ref OFFSCREEN: Selector = Selector::parse(".a-offscreen").unwrap();
    static ref SYMBOL: Selector = Selector::parse(".a-price-symbol").unwrap();
    static ref WHOLE: Selector = Selector::parse(".a-price-whole").unwrap();
    static ref FRACTION: Selector = Selector::parse(".a-price-fraction").unwrap();
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AmazonPriceHandler;

impl AmazonPriceHandler {
    pub fn new() -> Self {
        Self
    }
}

fn text_of(root: ElementRef<'_>, selector: &Selector) -> Option<String> {
    let element = root.select(selector).next()?;
    let text = element.text().collect::<String>().trim().to_string();
    (!text.is_empty()).then_some(text)
}

impl SiteHandler for AmazonPriceHandler {
    fn name(&self) -> &str {
        "amazon"
    }

    fn matches_domain(&self, hostname: &str) -> bool {
        hostname
            .trim_end_matches('.')
            .split('.')
            .any(|label| label.eq_ignore_ascii_case("amazon"))
    }

    fn extract<'a>(
        &self,
        node: ElementRef<'a>,
        ctx: &HandlerContext<'_>,
    ) -> Option<ExtractionCandidate<'a>> {
        let price = if PRICE.matches(&node) {
            node
        } else {
            node.select(&PRICE).next()?
        };

        if let Some(candidate) = text_of(price, &OFFSCREEN).and_then(|t| ctx.match_text(&t, price)) {
            return Some(candidate);
        }

        let symbol = text_of(price, &SYMBOL)?;
        let whole = text_of(price, &WHOLE)?;
        let whole = whole.trim_end_matches(['.', ',']).to_string();
        let fraction = text_of(price, &FRACTION);

        let raw = format!("{}{}{}", symbol, whole, fraction.as_deref().unwrap_or(""));
        Some(
            ExtractionCandidate::new(raw, whole, fraction, Strategy::SiteHandler, SITE_HANDLER_CONFIDENCE)
                .with_symbol(symbol)
                .with_source(Some(price)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::StrategyCoordinator;
    use crate::models::{NormalizedPrice, ScanInput, Settings};
    use scraper::Html;

    const SPLIT: &str = r#"<div id="buybox"><span class="a-price">
        <span aria-hidden="true"><span class="a-price-symbol">$</span><span class="a-price-whole">1,299<span class="a-price-decimal">.</span></span><span class="a-price-fraction">99</span></span>
    </span></div>"#;

    #[test]
    fn test_matches_amazon_hosts() {
        let handler = AmazonPriceHandler::new();
        assert!(handler.matches_domain("www.amazon.com"));
        assert!(handler.matches_domain("amazon.co.uk"));
        assert!(!handler.matches_domain("notamazon.com"));
    }

    #[test]
    fn test_split_markup() {
        let coordinator = StrategyCoordinator::new();
        let settings = Settings::default();
        let doc = Html::parse_fragment(SPLIT);
        let node = doc.select(&Selector::parse("#buybox").unwrap()).next().unwrap();

        let result = coordinator
            .extract_price(&ScanInput::node(node).on_host("www.amazon.com"), &settings)
            .unwrap();

        let chosen = result.chosen.unwrap();
        assert_eq!(chosen.strategy, Strategy::SiteHandler);
        assert!(chosen.confidence >= SITE_HANDLER_CONFIDENCE);
        assert_eq!(result.normalized, Some(NormalizedPrice::new(129_999, "USD")));
        assert_eq!(result.passes_run, vec![Strategy::SiteHandler]);
    }

    #[test]
    fn test_offscreen_copy_preferred() {
        let coordinator = StrategyCoordinator::new();
        let settings = Settings::default();
        let doc = Html::parse_fragment(
            r#"<span class="a-price"><span class="a-offscreen">£24.00</span><span class="a-price-whole">99</span></span>"#,
        );
        let node = doc.select(&PRICE).next().unwrap();

        let result = coordinator
            .extract_price(&ScanInput::node(node).on_host("amazon.co.uk"), &settings)
            .unwrap();
        assert_eq!(result.normalized, Some(NormalizedPrice::new(2400, "GBP")));
    }
}
