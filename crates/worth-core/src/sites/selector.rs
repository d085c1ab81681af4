//! Handlers described in configuration by a CSS selector.

use scraper::{ElementRef, Selector};

use super::{domain_matches, HandlerContext, SiteHandler};
use crate::dom::CURRENCY_ATTRIBUTE;
use crate::error::ConfigError;
use crate::models::{ExtractionCandidate, SiteRule};

/// Reads the price from the first element matching a selector, either from
/// one of its attributes or from its text.
#[derive(Debug)]
pub struct SelectorHandler {
    name: String,
    domains: Vec<String>,
    selector: Selector,
    attribute: Option<String>,
}

impl SelectorHandler {
    pub fn from_rule(rule: &SiteRule) -> Result<Self, ConfigError> {
        let selector = Selector::parse(&rule.selector).map_err(|e| ConfigError::InvalidSelector {
            selector: rule.selector.clone(),
            reason: format!("{:?}", e),
        })?;

        Ok(Self {
            name: rule.name.clone(),
            domains: rule.domains.clone(),
            selector,
            attribute: rule.attribute.clone(),
        })
    }
}

impl SiteHandler for SelectorHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn matches_domain(&self, hostname: &str) -> bool {
        self.domains.iter().any(|d| domain_matches(hostname, d))
    }

    fn extract<'a>(
        &self,
        node: ElementRef<'a>,
        ctx: &HandlerContext<'_>,
    ) -> Option<ExtractionCandidate<'a>> {
        let target = if self.selector.matches(&node) {
            node
        } else {
            node.select(&self.selector).next()?
        };

        match &self.attribute {
            Some(attribute) => {
                let value = target.value().attr(attribute)?.trim();
                ctx.match_text(value, target).or_else(|| {
                    let currency = target.value().attr(CURRENCY_ATTRIBUTE);
                    ctx.machine_amount(value, currency, target)
                })
            }
            None => {
                let text = target.text().collect::<Vec<_>>().join(" ");
                let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
                ctx.match_text(&text, target)
            }
        }
    }
}
