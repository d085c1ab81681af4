//! Configuration structures for the detection engine.

use serde::{Deserialize, Serialize};

use crate::formats::CurrencyFormatRule;

/// Main configuration for the worth engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorthConfig {
    /// User settings (preferred currency and separators).
    pub settings: Settings,

    /// Pipeline tuning.
    pub extraction: ExtractionConfig,

    /// Extra currency formats registered after the built-in table.
    pub formats: Vec<CurrencyFormatRule>,

    /// Declarative per-site handlers.
    pub sites: Vec<SiteRule>,
}

/// User settings supplied by the storage layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Preferred currency symbol.
    pub currency_symbol: String,

    /// Preferred currency code.
    pub currency_code: String,

    /// Thousands separator token: `commas` or `spacesAndDots`.
    pub thousands: String,

    /// Decimal separator token: `dot` or `comma`.
    pub decimal: String,

    /// Look for prices that already carry an hours annotation.
    pub is_reverse_search: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            currency_symbol: "$".to_string(),
            currency_code: "USD".to_string(),
            thousands: "commas".to_string(),
            decimal: "dot".to_string(),
            is_reverse_search: false,
        }
    }
}

impl Settings {
    /// Settings for a currency with the given separator tokens.
    pub fn new(
        currency_symbol: impl Into<String>,
        currency_code: impl Into<String>,
        thousands: impl Into<String>,
        decimal: impl Into<String>,
    ) -> Self {
        Self {
            currency_symbol: currency_symbol.into(),
            currency_code: currency_code.into(),
            thousands: thousands.into(),
            decimal: decimal.into(),
            is_reverse_search: false,
        }
    }

    /// Switch reverse search on or off.
    pub fn with_reverse_search(mut self, reverse: bool) -> Self {
        self.is_reverse_search = reverse;
        self
    }
}

/// Pipeline tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExtractionConfig {
    /// Stop as soon as a candidate reaches this confidence (0.0 - 1.0).
    pub confidence_threshold: f32,

    /// Skip the text passes for units that cannot contain a price.
    pub use_prefilter: bool,

    /// Maximum candidate texts produced per element.
    pub max_candidate_texts: usize,

    /// Maximum child nodes concatenated during assembly.
    pub max_children: usize,

    /// Maximum characters of any candidate text.
    pub max_text_length: usize,

    /// Register the bundled site handlers.
    pub builtin_sites: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.9,
            use_prefilter: true,
            max_candidate_texts: 6,
            max_children: 12,
            max_text_length: 256,
            builtin_sites: true,
        }
    }
}

/// A site handler described in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteRule {
    /// Handler name used in logs.
    pub name: String,

    /// Domains the handler applies to (subdomains included).
    pub domains: Vec<String>,

    /// CSS selector locating the price element inside the scanned node.
    pub selector: String,

    /// Attribute to read instead of the element text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

impl WorthConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }
}
