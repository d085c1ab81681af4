//! Site-specific handlers for markup the generic passes cannot read.

mod amazon;
mod selector;

use std::fmt;

use scraper::ElementRef;
use tracing::{debug, warn};

use crate::detect::StrategyCoordinator;
use crate::models::{ExtractionCandidate, PatternCategory, Settings, Strategy};

pub use amazon::AmazonPriceHandler;
pub use selector::SelectorHandler;

/// Lowest confidence a site handler result is reported with.
pub const SITE_HANDLER_CONFIDENCE: f32 = 0.95;

/// A handler for one site's bespoke price markup.
pub trait SiteHandler: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Whether the handler applies to pages on this hostname.
    fn matches_domain(&self, hostname: &str) -> bool;

    /// Try to read a price from the node.
    fn extract<'a>(
        &self,
        node: ElementRef<'a>,
        ctx: &HandlerContext<'_>,
    ) -> Option<ExtractionCandidate<'a>>;
}

/// What a handler may use while extracting.
pub struct HandlerContext<'c> {
    coordinator: &'c StrategyCoordinator,
    settings: &'c Settings,
}

impl<'c> HandlerContext<'c> {
    pub fn new(coordinator: &'c StrategyCoordinator, settings: &'c Settings) -> Self {
        Self {
            coordinator,
            settings,
        }
    }

    pub fn settings(&self) -> &Settings {
        self.settings
    }

    /// Run the structural patterns over a text read by the handler.
    pub fn match_text<'a>(
        &self,
        text: &str,
        node: ElementRef<'a>,
    ) -> Option<ExtractionCandidate<'a>> {
        let found = self.coordinator.match_text(
            text,
            self.settings,
            &PatternCategory::STRUCTURAL,
            Strategy::SiteHandler,
            Some(SITE_HANDLER_CONFIDENCE),
            Some(node),
            false,
        );

        match found {
            Ok(candidate) => candidate.map(|(candidate, _)| candidate),
            Err(e) => {
                warn!("Site handler pattern failed: {}", e);
                None
            }
        }
    }

    /// Candidate for an amount without currency text.
    pub fn machine_amount<'a>(
        &self,
        text: &str,
        currency_code: Option<&str>,
        node: ElementRef<'a>,
    ) -> Option<ExtractionCandidate<'a>> {
        self.coordinator
            .machine_amount(
                text,
                currency_code.unwrap_or(&self.settings.currency_code),
                Strategy::SiteHandler,
                SITE_HANDLER_CONFIDENCE,
                Some(node),
            )
            .map(|(candidate, _)| candidate)
    }
}

/// Handlers in registration order.
#[derive(Default)]
pub struct SiteHandlerRegistry {
    handlers: Vec<Box<dyn SiteHandler>>,
}

impl fmt::Debug for SiteHandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.handlers.iter().map(|h| h.name())).finish()
    }
}

impl SiteHandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handler: impl SiteHandler + 'static) {
        self.register_boxed(Box::new(handler));
    }

    pub fn register_boxed(&mut self, handler: Box<dyn SiteHandler>) {
        debug!("Registered site handler {}", handler.name());
        self.handlers.push(handler);
    }

    /// Handlers whose domain predicate accepts the hostname.
    pub fn handlers_for<'r>(
        &'r self,
        hostname: &'r str,
    ) -> impl Iterator<Item = &'r dyn SiteHandler> + 'r {
        self.handlers
            .iter()
            .map(|h| h.as_ref())
            .filter(move |h| h.matches_domain(hostname))
    }

    pub fn has_handler_for(&self, hostname: &str) -> bool {
        self.handlers_for(hostname).next().is_some()
    }

    /// First non-empty result of the matching handlers.
    pub fn extract<'a>(
        &self,
        hostname: &str,
        node: ElementRef<'a>,
        ctx: &HandlerContext<'_>,
    ) -> Option<ExtractionCandidate<'a>> {
        for handler in self.handlers_for(hostname) {
            match handler.extract(node, ctx) {
                Some(mut candidate) => {
                    candidate.strategy = Strategy::SiteHandler;
                    candidate.confidence = candidate.confidence.max(SITE_HANDLER_CONFIDENCE);
                    if candidate.source_ref.is_none() {
                        candidate.source_ref = Some(node);
                    }
                    debug!("Site handler {} found {:?}", handler.name(), candidate.raw_text);
                    return Some(candidate);
                }
                None => debug!("Site handler {} found nothing", handler.name()),
            }
        }
        None
    }

    pub fn names(&self) -> Vec<&str> {
        self.handlers.iter().map(|h| h.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// `shop.example.com` matches `example.com`; `badexample.com` does not.
pub fn domain_matches(hostname: &str, domain: &str) -> bool {
    let host = hostname.trim().trim_end_matches('.').to_ascii_lowercase();
    let domain = domain.trim().trim_start_matches('.').to_ascii_lowercase();
    if domain.is_empty() {
        return false;
    }
    host == domain || host.ends_with(&format!(".{domain}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::{Html, Selector};

    struct Fixed(&'static str, Option<f32>);

    impl SiteHandler for Fixed {
        fn name(&self) -> &str {
            self.0
        }

        fn matches_domain(&self, hostname: &str) -> bool {
            domain_matches(hostname, "shop.test")
        }

        fn extract<'a>(
            &self,
            _node: ElementRef<'a>,
            _ctx: &HandlerContext<'_>,
        ) -> Option<ExtractionCandidate<'a>> {
            self.1.map(|confidence| {
                ExtractionCandidate::new("$1", "1", None, Strategy::Pattern, confidence)
                    .with_symbol("$")
                    .with_code(self.0)
            })
        }
    }

    #[test]
    fn test_domain_matches() {
        assert!(domain_matches("shop.test", "shop.test"));
        assert!(domain_matches("www.Shop.Test.", "shop.test"));
        assert!(!domain_matches("badshop.test", "shop.test"));
        assert!(!domain_matches("shop.test", ""));
    }

    #[test]
    fn test_first_non_empty_handler_wins() {
        let mut sites = SiteHandlerRegistry::new();
        sites.register(Fixed("empty", None));
        sites.register(Fixed("first", Some(0.5)));
        sites.register(Fixed("second", Some(1.0)));

        let coordinator = StrategyCoordinator::new();
        let settings = Settings::default();
        let ctx = HandlerContext::new(&coordinator, &settings);
        let doc = Html::parse_fragment("<span>$1</span>");
        let node = doc.select(&Selector::parse("span").unwrap()).next().unwrap();

        let found = sites.extract("www.shop.test", node, &ctx).unwrap();
        assert_eq!(found.currency_code.as_deref(), Some("first"));
        assert_eq!(found.strategy, Strategy::SiteHandler);
        assert_eq!(found.confidence, SITE_HANDLER_CONFIDENCE);
        assert_eq!(found.source_ref, Some(node));

        assert!(sites.extract("other.test", node, &ctx).is_none());
        assert_eq!(sites.names(), vec!["empty", "first", "second"]);
    }
}
