//! CLI subcommands.

pub mod batch;
pub mod config;
pub mod extract;
pub mod formats;

use std::path::PathBuf;

use anyhow::Context;
use serde::Serialize;
use tracing::debug;

use worth_core::dom::{PRICE_ATTRIBUTES, SKIPPED_TAGS};
use worth_core::{
    DetectionResult, ElementRef, Html, ScanInput, Selector, Settings, Strategy, StrategyCoordinator,
    WorthConfig,
};

/// Default location of the configuration file.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("worth")
        .join("config.json")
}

/// Config from `--config`, else the default file when present, else defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<WorthConfig> {
    let path = config_path.map(PathBuf::from).unwrap_or_else(default_config_path);

    if config_path.is_none() && !path.exists() {
        return Ok(WorthConfig::default());
    }

    WorthConfig::from_file(&path)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}

/// One price found on a page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceHit {
    /// Tag of the scanned element, or `text` for plain-text input.
    pub element: String,
    /// Text the price was read from.
    pub text: String,
    pub amount_cents: i64,
    pub currency: String,
    /// Amount rendered in its currency's own style.
    pub formatted: String,
    pub strategy: Strategy,
    pub confidence: f32,
}

impl PriceHit {
    fn from_result(
        coordinator: &StrategyCoordinator,
        element: &str,
        result: &DetectionResult<'_>,
    ) -> Option<Self> {
        let (chosen, price) = (result.chosen.as_ref()?, result.normalized.as_ref()?);

        let formatted = coordinator
            .registry()
            .lookup_by_code(&price.currency_code)
            .zip(u64::try_from(price.amount_cents).ok())
            .and_then(|(rule, cents)| rule.format_amount(cents).ok())
            .unwrap_or_else(|| price.to_string());

        Some(Self {
            element: element.to_string(),
            text: chosen.raw_text.clone(),
            amount_cents: price.amount_cents,
            currency: price.currency_code.clone(),
            formatted,
            strategy: chosen.strategy,
            confidence: chosen.confidence,
        })
    }
}

/// Scan a plain text as one unit.
pub fn scan_text(
    coordinator: &StrategyCoordinator,
    text: &str,
    settings: &Settings,
) -> anyhow::Result<Vec<PriceHit>> {
    let result = coordinator.extract_price(&ScanInput::text(text), settings)?;
    Ok(PriceHit::from_result(coordinator, "text", &result).into_iter().collect())
}

/// Scan an HTML document, one unit per selected element.
///
/// Without a selector, every element that carries a price attribute, has a
/// `price` class, or is a leaf with digits in its text is scanned. Hits with
/// the same amount and currency are merged, keeping the most confident one.
pub fn scan_html(
    coordinator: &StrategyCoordinator,
    html: &str,
    settings: &Settings,
    hostname: Option<&str>,
    selector: Option<&str>,
) -> anyhow::Result<Vec<PriceHit>> {
    let document = Html::parse_document(html);

    let nodes: Vec<ElementRef<'_>> = match selector {
        Some(selector) => {
            let parsed = Selector::parse(selector)
                .map_err(|e| anyhow::anyhow!("Invalid selector {:?}: {:?}", selector, e))?;
            document.select(&parsed).collect()
        }
        None => document
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter(|node| is_scan_unit(*node))
            .collect(),
    };

    debug!("Scanning {} elements", nodes.len());

    let mut hits: Vec<PriceHit> = Vec::new();
    for node in nodes {
        let mut input = ScanInput::node(node);
        if let Some(host) = hostname {
            input = input.on_host(host);
        }

        let result = coordinator.extract_price(&input, settings)?;
        let Some(hit) = PriceHit::from_result(coordinator, node.value().name(), &result) else {
            continue;
        };

        match hits
            .iter_mut()
            .find(|h| h.amount_cents == hit.amount_cents && h.currency == hit.currency)
        {
            Some(existing) if hit.confidence > existing.confidence => *existing = hit,
            Some(_) => {}
            None => hits.push(hit),
        }
    }

    Ok(hits)
}

fn is_scan_unit(node: ElementRef<'_>) -> bool {
    let element = node.value();
    if SKIPPED_TAGS.contains(&element.name()) {
        return false;
    }

    if PRICE_ATTRIBUTES.iter().any(|a| element.attr(a).is_some())
        || element.attr("itemprop") == Some("price")
        || element.classes().any(|c| c.contains("price"))
    {
        return true;
    }

    let is_leaf = !node.children().any(|c| c.value().is_element());
    is_leaf && node.text().any(|t| t.chars().any(|c| c.is_ascii_digit()))
}

/// Keep only the most confident hit.
pub fn best_hit(hits: Vec<PriceHit>) -> Vec<PriceHit> {
    hits.into_iter()
        .max_by(|a, b| a.confidence.total_cmp(&b.confidence).then(b.strategy.cmp(&a.strategy)))
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_html_merges_duplicates() {
        let coordinator = StrategyCoordinator::new();
        let html = r#"<html><body>
            <div class="price" data-price="12.50" data-currency="EUR"><span>12,50 €</span></div>
            <p>Delivery in 3 days</p>
        </body></html>"#;

        let hits = scan_html(&coordinator, html, &Settings::default(), None, None).unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].amount_cents, 1250);
        assert_eq!(hits[0].currency, "EUR");
        assert_eq!(hits[0].strategy, Strategy::Attribute);
    }

    #[test]
    fn test_scan_html_invalid_selector() {
        let coordinator = StrategyCoordinator::new();
        let err = scan_html(&coordinator, "<p>$5</p>", &Settings::default(), None, Some("p[")).unwrap_err();
        assert!(err.to_string().contains("Invalid selector"));
    }

    #[test]
    fn test_best_hit() {
        let coordinator = StrategyCoordinator::new();
        let html = r#"<ul><li>Was $20.00</li><li><span aria-label="$15.00">$15</span></li></ul>"#;

        let hits = scan_html(&coordinator, html, &Settings::default(), None, None).unwrap();
        let best = best_hit(hits);

        assert_eq!(best.len(), 1);
        assert_eq!(best[0].amount_cents, 1500);
    }
}
