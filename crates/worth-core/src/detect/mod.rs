//! Multi-pass price detection.
//!
//! Passes run in a fixed order: site handlers, attribute texts, assembled
//! DOM texts, plain-text patterns and finally range or contextual phrases.
//! The pipeline stops as soon as a candidate reaches the confidence
//! threshold; otherwise the best candidate over every pass is chosen.

mod legacy;
mod prefilter;

use std::sync::Arc;

use scraper::ElementRef;
use tracing::debug;

use crate::dom::{CandidateText, DomStructureAnalyzer, CURRENCY_ATTRIBUTE};
use crate::error::{ConfigError, Result};
use crate::formats::{CurrencyFormatRegistry, CurrencyFormatRule};
use crate::models::{
    DetectionResult, ExtractionCandidate, NormalizedPrice, PatternCategory, ScanInput, ScanUnit,
    Settings, Strategy, WorthConfig,
};
use crate::normalize::PriceNormalizer;
use crate::patterns::{self, MACHINE_AMOUNT, TRAILING_ANNOTATION};
use crate::sites::{AmazonPriceHandler, HandlerContext, SelectorHandler, SiteHandlerRegistry};

pub use legacy::FoundPrices;
pub use prefilter::might_contain_price;

/// Confidence of a price read from an attribute.
pub const ATTRIBUTE_CONFIDENCE: f32 = 0.9;

/// Confidence of a price read from assembled child or sibling text.
pub const DOM_STRUCTURE_CONFIDENCE: f32 = 0.85;

/// Runs the detection passes over scan units.
#[derive(Debug)]
pub struct StrategyCoordinator {
    registry: CurrencyFormatRegistry,
    sites: SiteHandlerRegistry,
    analyzer: DomStructureAnalyzer,
    confidence_threshold: f32,
    use_prefilter: bool,
}

impl Default for StrategyCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl StrategyCoordinator {
    /// Built-in formats and the bundled site handlers.
    pub fn new() -> Self {
        let mut sites = SiteHandlerRegistry::new();
        sites.register(AmazonPriceHandler::new());
        Self::with_parts(CurrencyFormatRegistry::builtin(), sites)
    }

    pub fn with_parts(registry: CurrencyFormatRegistry, sites: SiteHandlerRegistry) -> Self {
        Self {
            registry,
            sites,
            analyzer: DomStructureAnalyzer::new(),
            confidence_threshold: 0.9,
            use_prefilter: true,
        }
    }

    /// Build a coordinator from configuration. Extra formats and declared
    /// sites are registered before the bundled handlers.
    pub fn from_config(config: &WorthConfig) -> std::result::Result<Self, ConfigError> {
        let mut registry = CurrencyFormatRegistry::builtin();
        for rule in &config.formats {
            registry.register_format(rule.clone())?;
        }

        let mut sites = SiteHandlerRegistry::new();
        for site in &config.sites {
            sites.register(SelectorHandler::from_rule(site)?);
        }
        if config.extraction.builtin_sites {
            sites.register(AmazonPriceHandler::new());
        }

        Ok(Self {
            registry,
            sites,
            analyzer: DomStructureAnalyzer::from_config(&config.extraction),
            confidence_threshold: config.extraction.confidence_threshold.clamp(0.0, 1.0),
            use_prefilter: config.extraction.use_prefilter,
        })
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    pub fn with_prefilter(mut self, enabled: bool) -> Self {
        self.use_prefilter = enabled;
        self
    }

    pub fn with_analyzer(mut self, analyzer: DomStructureAnalyzer) -> Self {
        self.analyzer = analyzer;
        self
    }

    pub fn registry(&self) -> &CurrencyFormatRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut CurrencyFormatRegistry {
        &mut self.registry
    }

    pub fn sites(&self) -> &SiteHandlerRegistry {
        &self.sites
    }

    pub fn sites_mut(&mut self) -> &mut SiteHandlerRegistry {
        &mut self.sites
    }

    pub fn normalizer(&self) -> PriceNormalizer<'_> {
        PriceNormalizer::new(&self.registry)
    }

    /// Find the price in one scan unit.
    ///
    /// Only configuration errors are returned. Finding no price yields a
    /// result with `chosen == None`.
    pub fn extract_price<'a>(
        &self,
        input: &ScanInput<'a>,
        settings: &Settings,
    ) -> Result<DetectionResult<'a>> {
        validate_settings(settings)?;

        let mut run = PassRun::new(self.confidence_threshold);
        let node = input.node_ref();

        // Pass 1: site handlers.
        if let (Some(node), Some(host)) = (node, input.hostname) {
            if self.sites.has_handler_for(host) {
                run.enter(Strategy::SiteHandler);
                let ctx = HandlerContext::new(self, settings);
                if let Some(candidate) = self.sites.extract(host, node, &ctx) {
                    run.offer(candidate, &self.normalizer());
                }
                if run.done() {
                    return Ok(run.finish());
                }
            }
        }

        // Pass 2: attribute texts.
        if let Some(node) = node {
            run.enter(Strategy::Attribute);
            for attr in self.analyzer.attribute_texts(node) {
                if let Some((candidate, _)) = self.match_attribute(&attr, node, settings)? {
                    run.offer(candidate, &self.normalizer());
                    if run.done() {
                        return Ok(run.finish());
                    }
                }
            }
        }

        // Pass 3: assembled child or sibling texts.
        if let Some(node) = node {
            run.enter(Strategy::DomStructure);
            for assembled in self.analyzer.assembled_texts(node) {
                if !self.worth_scanning(&assembled.text, settings) {
                    continue;
                }
                let found = self.match_text(
                    &assembled.text,
                    settings,
                    &PatternCategory::STRUCTURAL,
                    Strategy::DomStructure,
                    Some(DOM_STRUCTURE_CONFIDENCE),
                    Some(node),
                    false,
                )?;
                if let Some((candidate, _)) = found {
                    run.offer(candidate, &self.normalizer());
                    if run.done() {
                        return Ok(run.finish());
                    }
                }
            }
        }

        let plain = match input.unit {
            ScanUnit::Node(node) => self.analyzer.text_content(node),
            ScanUnit::Text(text) => Some(self.analyzer.collapse(text)).filter(|t| !t.is_empty()),
        };
        let Some(plain) = plain.filter(|t| self.worth_scanning(t, settings)) else {
            debug!("No plain text worth scanning");
            return Ok(run.finish());
        };

        // Pass 4: structural patterns on the plain text.
        run.enter(Strategy::Pattern);
        let found = self.match_text(
            &plain,
            settings,
            &PatternCategory::STRUCTURAL,
            Strategy::Pattern,
            None,
            node,
            true,
        )?;
        if let Some((candidate, _)) = found {
            run.offer(candidate, &self.normalizer());
            if run.done() {
                return Ok(run.finish());
            }
        }

        // Pass 5: ranges and contextual phrases.
        run.enter(Strategy::Contextual);
        let found = self.match_text(
            &plain,
            settings,
            &PatternCategory::PHRASED,
            Strategy::Contextual,
            None,
            node,
            false,
        )?;
        if let Some((candidate, _)) = found {
            run.offer(candidate, &self.normalizer());
        }

        Ok(run.finish())
    }

    /// First match in `text` that normalizes, trying each candidate format
    /// and then each category in order. With `defer_phrases`, matches that
    /// sit inside a range or contextual phrase are skipped.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn match_text<'a>(
        &self,
        text: &str,
        settings: &Settings,
        categories: &[PatternCategory],
        strategy: Strategy,
        confidence: Option<f32>,
        source: Option<ElementRef<'a>>,
        defer_phrases: bool,
    ) -> std::result::Result<Option<(ExtractionCandidate<'a>, NormalizedPrice)>, ConfigError> {
        if text.trim().is_empty() {
            return Ok(None);
        }
        let normalizer = self.normalizer();
        let formats = self.formats_for(text, settings);

        let mut phrases: Vec<(usize, usize)> = Vec::new();
        if defer_phrases {
            for rule in &formats {
                for category in PatternCategory::PHRASED {
                    let pattern = self.registry.pattern(rule, category)?;
                    phrases.extend(pattern.find_all(text).iter().map(|m| (m.start, m.end)));
                }
            }
        }

        for rule in &formats {
            for &category in categories {
                let pattern = self.registry.pattern(rule, category)?;
                for m in pattern.find_all(text) {
                    if phrases.iter().any(|&(start, end)| m.overlaps(start, end)) {
                        debug!("{}: {:?} is part of a phrase, deferred", strategy, m.text);
                        continue;
                    }
                    if settings.is_reverse_search && !TRAILING_ANNOTATION.is_match(&text[m.end..]) {
                        debug!("{}: {:?} has no annotation, skipped", strategy, m.text);
                        continue;
                    }

                    let mut candidate = ExtractionCandidate::new(
                        m.text.clone(),
                        m.integer.clone(),
                        m.fraction.clone(),
                        strategy,
                        confidence.unwrap_or(pattern.base_confidence),
                    )
                    .with_pattern(Arc::clone(&pattern))
                    .with_source(source);
                    candidate.currency_symbol = m.symbol.clone();
                    candidate.currency_code = m.code.clone();

                    match normalizer.normalize(&candidate) {
                        Ok(price) => {
                            debug!(
                                "{}: {} pattern of {} matched {:?} -> {}",
                                strategy, category, rule.id, m.text, price
                            );
                            return Ok(Some((candidate, price)));
                        }
                        Err(e) => debug!("{}: rejected {:?}: {}", strategy, m.text, e),
                    }
                }
            }
        }

        Ok(None)
    }

    /// Candidate for a bare amount such as `data-price="8.48"`.
    pub(crate) fn machine_amount<'a>(
        &self,
        text: &str,
        currency_code: &str,
        strategy: Strategy,
        confidence: f32,
        source: Option<ElementRef<'a>>,
    ) -> Option<(ExtractionCandidate<'a>, NormalizedPrice)> {
        let caps = MACHINE_AMOUNT.captures(text)?;
        let integer = caps.get(1)?.as_str();
        let fraction = caps.get(2).map(|m| m.as_str().to_string());

        let candidate = ExtractionCandidate::new(text.trim(), integer, fraction, strategy, confidence)
            .with_code(currency_code.trim())
            .with_source(source);

        match self.normalizer().normalize(&candidate) {
            Ok(price) => Some((candidate, price)),
            Err(e) => {
                debug!("{}: rejected bare amount {:?}: {}", strategy, text, e);
                None
            }
        }
    }

    fn match_attribute<'a>(
        &self,
        attr: &CandidateText,
        node: ElementRef<'a>,
        settings: &Settings,
    ) -> std::result::Result<Option<(ExtractionCandidate<'a>, NormalizedPrice)>, ConfigError> {
        let found = self.match_text(
            &attr.text,
            settings,
            &PatternCategory::STRUCTURAL,
            Strategy::Attribute,
            Some(ATTRIBUTE_CONFIDENCE),
            Some(node),
            false,
        )?;
        if found.is_some() || !attr.source.is_machine_readable() {
            return Ok(found);
        }
        if settings.is_reverse_search {
            return Ok(None);
        }

        let code = node
            .value()
            .attr(CURRENCY_ATTRIBUTE)
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(&settings.currency_code);
        Ok(self.machine_amount(&attr.text, code, Strategy::Attribute, ATTRIBUTE_CONFIDENCE, Some(node)))
    }

    /// Formats to try on a text: every format whose symbol or code occurs in
    /// it, else the user's currency, else the default format. A format for
    /// the user's currency carries the user's separators.
    pub fn formats_for(&self, text: &str, settings: &Settings) -> Vec<Arc<CurrencyFormatRule>> {
        let mut formats = self.registry.detect_formats_in_text(text);

        if formats.is_empty() {
            let preferred = self
                .registry
                .lookup_by_code(&settings.currency_code)
                .or_else(|| self.registry.lookup_by_symbol(settings.currency_symbol.trim()));
            match preferred {
                Some(rule) => formats.push(rule),
                None => {
                    let custom = CurrencyFormatRule::from_settings(settings);
                    if custom.symbols.is_empty() && custom.codes.is_empty() {
                        formats.extend(self.registry.default_format());
                    } else {
                        formats.push(Arc::new(custom));
                    }
                }
            }
        }

        formats
            .into_iter()
            .map(|rule| with_preferred_separators(rule, settings))
            .collect()
    }

    fn worth_scanning(&self, text: &str, settings: &Settings) -> bool {
        if !self.use_prefilter || might_contain_price(&self.registry, text, settings) {
            return true;
        }
        debug!("Pre-filter skipped {:?}", text);
        false
    }
}

fn with_preferred_separators(
    rule: Arc<CurrencyFormatRule>,
    settings: &Settings,
) -> Arc<CurrencyFormatRule> {
    let users_currency = rule
        .currency_code()
        .is_some_and(|code| code.eq_ignore_ascii_case(settings.currency_code.trim()));
    let differs = rule.thousands_separator != settings.thousands
        || rule.decimal_separator != settings.decimal;

    if users_currency && differs {
        Arc::new(rule.with_user_separators(&settings.thousands, &settings.decimal))
    } else {
        rule
    }
}

/// Settings tokens must be known before any pattern is built from them.
pub fn validate_settings(settings: &Settings) -> std::result::Result<(), ConfigError> {
    patterns::build_thousands_string(&settings.thousands)?;
    patterns::build_decimal_string(&settings.decimal)?;
    Ok(())
}

/// Candidates collected over one `extract_price` call.
struct PassRun<'a> {
    threshold: f32,
    passes: Vec<Strategy>,
    found: Vec<(ExtractionCandidate<'a>, NormalizedPrice)>,
}

impl<'a> PassRun<'a> {
    fn new(threshold: f32) -> Self {
        Self {
            threshold,
            passes: Vec::new(),
            found: Vec::new(),
        }
    }

    fn enter(&mut self, pass: Strategy) {
        debug!("Entering {} pass", pass);
        self.passes.push(pass);
    }

    fn offer(&mut self, candidate: ExtractionCandidate<'a>, normalizer: &PriceNormalizer<'_>) {
        match normalizer.normalize(&candidate) {
            Ok(price) => {
                debug!(
                    "{} candidate {:?} accepted at {:.2}",
                    candidate.strategy, candidate.raw_text, candidate.confidence
                );
                self.found.push((candidate, price));
            }
            Err(e) => debug!(
                "{} candidate {:?} discarded: {}",
                candidate.strategy, candidate.raw_text, e
            ),
        }
    }

    fn done(&self) -> bool {
        self.found.iter().any(|(c, _)| c.confidence >= self.threshold)
    }

    fn finish(mut self) -> DetectionResult<'a> {
        // Stable sort keeps discovery order within a pass.
        self.found.sort_by(|(a, _), (b, _)| {
            b.confidence
                .total_cmp(&a.confidence)
                .then(a.strategy.pass_index().cmp(&b.strategy.pass_index()))
        });

        let (chosen, normalized) = match self.found.first() {
            Some((candidate, price)) => (Some(candidate.clone()), Some(price.clone())),
            None => (None, None),
        };

        DetectionResult {
            candidates: self.found.into_iter().map(|(c, _)| c).collect(),
            chosen,
            normalized,
            passes_run: self.passes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WorthError;
    use crate::formats::SymbolPosition;
    use crate::models::SiteRule;
    use pretty_assertions::assert_eq;
    use scraper::{Html, Selector};

    fn first<'a>(doc: &'a Html, selector: &str) -> ElementRef<'a> {
        doc.select(&Selector::parse(selector).unwrap()).next().unwrap()
    }

    fn on_text<'a>(coordinator: &StrategyCoordinator, text: &'a str) -> DetectionResult<'a> {
        coordinator
            .extract_price(&ScanInput::text(text), &Settings::default())
            .unwrap()
    }

    #[test]
    fn test_country_prefix_split_across_spans() {
        let coordinator = StrategyCoordinator::new();
        let doc = Html::parse_fragment(r#"<div class="price"><span>US$</span><span>34.56</span></div>"#);

        let result = coordinator
            .extract_price(&ScanInput::node(first(&doc, ".price")), &Settings::default())
            .unwrap();
        assert_eq!(result.normalized, Some(NormalizedPrice::new(3456, "USD")));
        let chosen = result.chosen.unwrap();
        assert_eq!(chosen.category(), Some(PatternCategory::CountryPrefixed));

        // Scanned from the symbol span, the siblings are assembled instead.
        let leaf = doc.select(&Selector::parse("span").unwrap()).next().unwrap();
        let result = coordinator
            .extract_price(&ScanInput::node(leaf), &Settings::default())
            .unwrap();
        let chosen = result.chosen.unwrap();
        assert_eq!(chosen.strategy, Strategy::DomStructure);
        assert_eq!(chosen.category(), Some(PatternCategory::CountryPrefixed));
        assert_eq!(result.normalized, Some(NormalizedPrice::new(3456, "USD")));
    }

    #[test]
    fn test_symbol_between_split_across_spans() {
        let coordinator = StrategyCoordinator::new();
        let doc = Html::parse_fragment(
            r#"<div class="price"><span>449</span><span>€</span><span>00</span></div>"#,
        );

        let result = coordinator
            .extract_price(&ScanInput::node(first(&doc, ".price")), &Settings::default())
            .unwrap();
        let chosen = result.chosen.unwrap();
        assert_eq!(chosen.strategy, Strategy::DomStructure);
        assert_eq!(chosen.category(), Some(PatternCategory::SymbolBetween));
        assert_eq!(result.normalized, Some(NormalizedPrice::new(44900, "EUR")));
    }

    #[test]
    fn test_aria_label_stops_after_attribute_pass() {
        let coordinator = StrategyCoordinator::new();
        let doc = Html::parse_fragment(r#"<span id="p" aria-label="$8.48"> $8.48 </span>"#);
        let node = first(&doc, "#p");

        let result = coordinator
            .extract_price(&ScanInput::node(node), &Settings::default())
            .unwrap();
        let chosen = result.chosen.unwrap();
        assert_eq!(chosen.strategy, Strategy::Attribute);
        assert_eq!(chosen.confidence, ATTRIBUTE_CONFIDENCE);
        assert_eq!(chosen.source_ref, Some(node));
        assert_eq!(result.normalized, Some(NormalizedPrice::new(848, "USD")));
        assert_eq!(result.passes_run, vec![Strategy::Attribute]);
    }

    #[test]
    fn test_plain_text_with_thousands() {
        let coordinator = StrategyCoordinator::new();
        let result = on_text(&coordinator, "$2,500,000");

        let chosen = result.chosen.unwrap();
        assert_eq!(chosen.category(), Some(PatternCategory::Standard));
        assert_eq!(chosen.source_ref, None);
        assert_eq!(result.normalized, Some(NormalizedPrice::new(250_000_000, "USD")));
    }

    #[test]
    fn test_contextual_phrase() {
        let coordinator = StrategyCoordinator::new();
        let result = on_text(&coordinator, "Under $20");

        let chosen = result.chosen.unwrap();
        assert_eq!(chosen.strategy, Strategy::Contextual);
        assert_eq!(chosen.category(), Some(PatternCategory::Contextual));
        assert_eq!(chosen.confidence, 0.6);
        assert_eq!(result.candidates.len(), 1);
        assert_eq!(result.normalized, Some(NormalizedPrice::new(2000, "USD")));
    }

    #[test]
    fn test_symbol_without_amount() {
        let coordinator = StrategyCoordinator::new();
        let result = on_text(&coordinator, "word$");

        assert!(result.chosen.is_none());
        assert!(result.normalized.is_none());
        assert!(result.candidates.is_empty());
        assert!(!result.is_found());
    }

    /// Two letters of the code before the bare glyph, or before the first
    /// symbol when the rule has no glyph: `US$`, `BR$`, `CN¥`, `SEkr`.
    fn prefixed_symbol(rule: &CurrencyFormatRule) -> String {
        let code = rule.currency_code().unwrap();
        let glyph = rule
            .symbols
            .iter()
            .find_map(|s| patterns::currency_glyph(s))
            .unwrap_or(rule.symbols[0].as_str());
        format!("{}{}", &code[..2], glyph)
    }

    #[test]
    fn test_round_trip_every_builtin_format() {
        let coordinator = StrategyCoordinator::new();
        let amounts = [5_u64, 99, 123_456, 250_000_000];

        for rule in coordinator.registry().formats() {
            let code = rule.currency_code().unwrap();
            for cents in amounts {
                let expected = Some(NormalizedPrice::new(cents as i64, code));
                let standard = rule.format_amount(cents).unwrap();
                let spaced = rule
                    .as_ref()
                    .clone()
                    .with_position(SymbolPosition::None)
                    .format_amount(cents)
                    .unwrap();
                let between = rule
                    .as_ref()
                    .clone()
                    .with_position(SymbolPosition::Between)
                    .format_amount(cents)
                    .unwrap();
                let contextual = format!("from {standard}");
                let range = format!("{standard} - {}", rule.format_amount(cents + 100).unwrap());
                let country_prefixed = CurrencyFormatRule::new("prefixed", "und")
                    .with_symbols([prefixed_symbol(rule)])
                    .with_codes([code])
                    .with_separators(&rule.thousands_separator, &rule.decimal_separator)
                    .with_position(SymbolPosition::Before)
                    .format_amount(cents)
                    .unwrap();

                // `NZ$1.00` is written with a country-prefixed symbol already.
                let standard_category = if rule.symbols[0] == prefixed_symbol(rule) {
                    PatternCategory::CountryPrefixed
                } else {
                    PatternCategory::Standard
                };

                for (text, category) in [
                    (&standard, standard_category),
                    (&spaced, PatternCategory::Spaced),
                    (&country_prefixed, PatternCategory::CountryPrefixed),
                    (&between, PatternCategory::SymbolBetween),
                    (&contextual, PatternCategory::Contextual),
                    (&range, PatternCategory::Range),
                ] {
                    let result = on_text(&coordinator, text);
                    assert_eq!(result.normalized, expected, "{} / {:?}", rule.id, text);
                    assert_eq!(
                        result.chosen.and_then(|c| c.category()),
                        Some(category),
                        "{} / {:?}",
                        rule.id,
                        text
                    );
                }
            }
        }
    }

    #[test]
    fn test_dollar_of_unknown_country_is_not_usd() {
        let coordinator = StrategyCoordinator::new();

        for text in ["HK$45.50", "XY$10", "NT$300"] {
            let result = on_text(&coordinator, text);
            assert!(result.chosen.is_none(), "{text}");
            assert!(result.normalized.is_none(), "{text}");
        }
    }

    #[test]
    fn test_price_far_into_long_text() {
        let coordinator = StrategyCoordinator::new();
        let text = format!("{} Price: $19.99", "lorem ipsum ".repeat(30));

        let result = on_text(&coordinator, &text);
        assert_eq!(result.normalized, Some(NormalizedPrice::new(1999, "USD")));

        let html = format!("<p id=\"p\">{text}</p>");
        let doc = Html::parse_fragment(&html);
        let result = coordinator
            .extract_price(&ScanInput::node(first(&doc, "#p")), &Settings::default())
            .unwrap();
        assert_eq!(result.chosen.as_ref().unwrap().strategy, Strategy::Pattern);
        assert_eq!(result.normalized, Some(NormalizedPrice::new(1999, "USD")));
    }

    #[test]
    fn test_space_grouped_amount_in_comma_format() {
        let coordinator = StrategyCoordinator::new();

        for text in ["£1 234", "£1\u{00a0}234"] {
            let result = on_text(&coordinator, text);
            assert!(result.chosen.is_none(), "{text:?}");
        }

        let result = on_text(&coordinator, "£1,234");
        assert_eq!(result.normalized, Some(NormalizedPrice::new(123_400, "GBP")));
    }

    #[test]
    fn test_highest_confidence_wins() {
        let coordinator = StrategyCoordinator::new().with_threshold(1.0);
        let doc = Html::parse_fragment(
            r#"<div id="p" aria-label="Sale"><span>US$</span><span>34.56</span></div>"#,
        );

        let result = coordinator
            .extract_price(&ScanInput::node(first(&doc, "#p")), &Settings::default())
            .unwrap();

        assert_eq!(
            result.passes_run,
            vec![
                Strategy::Attribute,
                Strategy::DomStructure,
                Strategy::Pattern,
                Strategy::Contextual
            ]
        );
        let confidences: Vec<f32> = result.candidates.iter().map(|c| c.confidence).collect();
        assert_eq!(confidences, vec![0.9, 0.85, 0.85]);
        assert_eq!(result.chosen.unwrap().strategy, Strategy::Pattern);
    }

    #[test]
    fn test_equal_confidence_prefers_earlier_pass() {
        let coordinator = StrategyCoordinator::new().with_threshold(1.0);
        let doc = Html::parse_fragment(r#"<span id="p" aria-label="US$34.56">US$34.56</span>"#);

        let result = coordinator
            .extract_price(&ScanInput::node(first(&doc, "#p")), &Settings::default())
            .unwrap();

        let strategies: Vec<Strategy> = result.candidates.iter().map(|c| c.strategy).collect();
        assert_eq!(strategies, vec![Strategy::Attribute, Strategy::Pattern]);
        assert_eq!(result.chosen.unwrap().strategy, Strategy::Attribute);
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let coordinator = StrategyCoordinator::new().with_threshold(1.0);
        let doc = Html::parse_fragment(
            r#"<div id="p" data-price="12.00"><span>12</span><span>,99</span><span>€</span> from 10 €</div>"#,
        );
        let input = ScanInput::node(first(&doc, "#p"));
        let settings = Settings::default();

        let first_run = coordinator.extract_price(&input, &settings).unwrap();
        let second_run = coordinator.extract_price(&input, &settings).unwrap();
        assert_eq!(first_run, second_run);
    }

    #[test]
    fn test_bare_data_price() {
        let coordinator = StrategyCoordinator::new();
        let doc = Html::parse_fragment(
            r#"<b id="eur" data-price="8.48" data-currency="eur">Add to cart</b><b id="plain" data-amount="12">Buy</b>"#,
        );

        let result = coordinator
            .extract_price(&ScanInput::node(first(&doc, "#eur")), &Settings::default())
            .unwrap();
        assert_eq!(result.normalized, Some(NormalizedPrice::new(848, "EUR")));

        let settings = Settings::new("£", "GBP", "commas", "dot");
        let result = coordinator
            .extract_price(&ScanInput::node(first(&doc, "#plain")), &settings)
            .unwrap();
        assert_eq!(result.normalized, Some(NormalizedPrice::new(1200, "GBP")));
    }

    #[test]
    fn test_aria_label_is_not_a_bare_amount() {
        let coordinator = StrategyCoordinator::new();
        let doc = Html::parse_fragment(r#"<b id="p" aria-label="3">Only 3 left</b>"#);

        let result = coordinator
            .extract_price(&ScanInput::node(first(&doc, "#p")), &Settings::default())
            .unwrap();
        assert!(result.chosen.is_none());
    }

    #[test]
    fn test_user_separators_apply_to_user_currency() {
        let coordinator = StrategyCoordinator::new();
        let settings = Settings::new("€", "EUR", "commas", "dot");

        let result = coordinator
            .extract_price(&ScanInput::text("€1,234.56"), &settings)
            .unwrap();
        assert_eq!(result.normalized, Some(NormalizedPrice::new(123_456, "EUR")));

        let pattern = result.chosen.unwrap().matched_pattern.unwrap();
        assert_eq!(pattern.format.id, "eur@commas/dot");
    }

    #[test]
    fn test_spaced_symbol_after_amount() {
        let coordinator = StrategyCoordinator::new();
        let result = on_text(&coordinator, "Was 10,00 € now");

        assert_eq!(result.chosen.unwrap().category(), Some(PatternCategory::Spaced));
        assert_eq!(result.normalized, Some(NormalizedPrice::new(1000, "EUR")));
    }

    #[test]
    fn test_longer_symbol_tried_first() {
        let coordinator = StrategyCoordinator::new();

        let result = on_text(&coordinator, "C$5.00 - C$9.00");
        assert_eq!(result.normalized, Some(NormalizedPrice::new(500, "CAD")));

        let result = on_text(&coordinator, "from C$5.00");
        assert_eq!(result.chosen.unwrap().strategy, Strategy::Contextual);
    }

    #[test]
    fn test_reverse_search() {
        let coordinator = StrategyCoordinator::new();
        let settings = Settings::default().with_reverse_search(true);

        let annotated = coordinator
            .extract_price(&ScanInput::text("$25.00 (2h 30m)"), &settings)
            .unwrap();
        assert_eq!(annotated.normalized, Some(NormalizedPrice::new(2500, "USD")));

        let bare = coordinator
            .extract_price(&ScanInput::text("$25.00"), &settings)
            .unwrap();
        assert!(bare.chosen.is_none());
    }

    #[test]
    fn test_invalid_settings_token_is_an_error() {
        let coordinator = StrategyCoordinator::new();
        let settings = Settings::new("$", "USD", "commas", "semicolon");

        let err = coordinator
            .extract_price(&ScanInput::text("$5"), &settings)
            .unwrap_err();
        assert!(matches!(
            err,
            WorthError::Config(ConfigError::UnrecognizedDelimiter(ref t)) if t == "semicolon"
        ));
    }

    #[test]
    fn test_prefilter_skips_text_passes_only() {
        let coordinator = StrategyCoordinator::new();

        let result = on_text(&coordinator, "Add to cart");
        assert!(result.passes_run.is_empty());

        let doc = Html::parse_fragment(r#"<b id="p" data-price="$3">Add to cart</b>"#);
        let result = coordinator
            .extract_price(&ScanInput::node(first(&doc, "#p")), &Settings::default())
            .unwrap();
        assert_eq!(result.normalized, Some(NormalizedPrice::new(300, "USD")));
    }

    #[test]
    fn test_from_config() {
        let mut config = WorthConfig::default();
        config.extraction.builtin_sites = false;
        config.sites.push(SiteRule {
            name: "shop".to_string(),
            domains: vec!["shop.test".to_string()],
            selector: ".now".to_string(),
            attribute: None,
        });
        config.formats.push(
            CurrencyFormatRule::new("hkd", "zh-HK")
                .with_symbols(["HK$"])
                .with_codes(["HKD"]),
        );

        let coordinator = StrategyCoordinator::from_config(&config).unwrap();
        assert_eq!(coordinator.sites().names(), vec!["shop"]);

        let doc = Html::parse_fragment(
            r#"<div id="card"><s>HK$99.00</s> <b class="now">HK$45.50</b></div>"#,
        );
        let result = coordinator
            .extract_price(
                &ScanInput::node(first(&doc, "#card")).on_host("www.shop.test"),
                &Settings::default(),
            )
            .unwrap();
        assert_eq!(result.chosen.as_ref().unwrap().strategy, Strategy::SiteHandler);
        assert_eq!(result.normalized, Some(NormalizedPrice::new(4550, "HKD")));

        config.sites[0].selector = "[".to_string();
        assert!(matches!(
            StrategyCoordinator::from_config(&config),
            Err(ConfigError::InvalidSelector { .. })
        ));
    }
}
