//! Price candidates, detection results and scan inputs.

use std::fmt;
use std::sync::Arc;

use rust_decimal::Decimal;
use scraper::ElementRef;
use serde::{Deserialize, Serialize, Serializer};

use crate::patterns::PricePattern;

/// Shape of text a price pattern recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PatternCategory {
    /// Symbol or code directly before or after the amount (`$10`, `10€`, `USD10`).
    Standard,
    /// Two-letter country prefix glued to the symbol (`US$34.56`).
    CountryPrefixed,
    /// Symbol between integer and fraction (`449€00`, `99€ 99`).
    SymbolBetween,
    /// Symbol or code separated from the amount by whitespace (`USD 10`, `10 zł`).
    Spaced,
    /// Two amounts joined by a dash (`$10 - $20`).
    Range,
    /// Amount introduced by a qualifier (`Under $20`, `from 5 €`).
    Contextual,
}

impl PatternCategory {
    /// All categories in build order.
    pub const ALL: [PatternCategory; 6] = [
        PatternCategory::Standard,
        PatternCategory::CountryPrefixed,
        PatternCategory::SymbolBetween,
        PatternCategory::Spaced,
        PatternCategory::Range,
        PatternCategory::Contextual,
    ];

    /// Categories tried by the structural passes, most specific first.
    pub const STRUCTURAL: [PatternCategory; 4] = [
        PatternCategory::CountryPrefixed,
        PatternCategory::SymbolBetween,
        PatternCategory::Standard,
        PatternCategory::Spaced,
    ];

    /// Categories tried by the contextual pass.
    pub const PHRASED: [PatternCategory; 2] = [PatternCategory::Range, PatternCategory::Contextual];

    /// Confidence a plain-text match of this category starts from.
    pub fn base_confidence(self) -> f32 {
        match self {
            PatternCategory::CountryPrefixed => 0.9,
            PatternCategory::Standard => 0.8,
            PatternCategory::SymbolBetween => 0.75,
            PatternCategory::Spaced => 0.7,
            PatternCategory::Range => 0.7,
            PatternCategory::Contextual => 0.6,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PatternCategory::Standard => "standard",
            PatternCategory::CountryPrefixed => "countryPrefixed",
            PatternCategory::SymbolBetween => "symbolBetween",
            PatternCategory::Spaced => "spaced",
            PatternCategory::Range => "range",
            PatternCategory::Contextual => "contextual",
        }
    }
}

impl fmt::Display for PatternCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pass of the detection pipeline that produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Strategy {
    SiteHandler,
    Attribute,
    DomStructure,
    Pattern,
    Contextual,
}

impl Strategy {
    /// Pipeline order, used as the tie-break between equal confidences.
    pub fn pass_index(self) -> usize {
        match self {
            Strategy::SiteHandler => 0,
            Strategy::Attribute => 1,
            Strategy::DomStructure => 2,
            Strategy::Pattern => 3,
            Strategy::Contextual => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::SiteHandler => "siteHandler",
            Strategy::Attribute => "attribute",
            Strategy::DomStructure => "domStructure",
            Strategy::Pattern => "pattern",
            Strategy::Contextual => "contextual",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One hypothesis about a price, found by one pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionCandidate<'a> {
    /// Text the match was taken from.
    pub raw_text: String,

    /// Pattern that matched, if any (site handlers may build candidates directly).
    #[serde(rename = "pattern", serialize_with = "serialize_pattern")]
    pub matched_pattern: Option<Arc<PricePattern>>,

    /// Currency symbol as written (`$`, `US$`, `€`).
    pub currency_symbol: Option<String>,

    /// Currency code as written (`USD`, `eur`).
    pub currency_code: Option<String>,

    /// Integer part including any thousands separators.
    pub integer_part: String,

    /// Fraction digits without the decimal separator.
    pub fraction_part: Option<String>,

    /// Pass that produced the candidate.
    pub strategy: Strategy,

    /// Ranking score in `[0, 1]`.
    pub confidence: f32,

    /// Element the candidate came from. Read-only; the engine never mutates it.
    #[serde(skip)]
    pub source_ref: Option<ElementRef<'a>>,
}

impl<'a> ExtractionCandidate<'a> {
    /// Create a candidate from bare components.
    pub fn new(
        raw_text: impl Into<String>,
        integer_part: impl Into<String>,
        fraction_part: Option<String>,
        strategy: Strategy,
        confidence: f32,
    ) -> Self {
        Self {
            raw_text: raw_text.into(),
            matched_pattern: None,
            currency_symbol: None,
            currency_code: None,
            integer_part: integer_part.into(),
            fraction_part,
            strategy,
            confidence: confidence.clamp(0.0, 1.0),
            source_ref: None,
        }
    }

    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.currency_symbol = Some(symbol.into());
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.currency_code = Some(code.into());
        self
    }

    pub fn with_pattern(mut self, pattern: Arc<PricePattern>) -> Self {
        self.matched_pattern = Some(pattern);
        self
    }

    pub fn with_source(mut self, node: Option<ElementRef<'a>>) -> Self {
        self.source_ref = node;
        self
    }

    /// Category of the matched pattern, if any.
    pub fn category(&self) -> Option<PatternCategory> {
        self.matched_pattern.as_ref().map(|p| p.category)
    }
}

fn serialize_pattern<S: Serializer>(
    pattern: &Option<Arc<PricePattern>>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match pattern {
        Some(p) => serializer.serialize_some(&p.category),
        None => serializer.serialize_none(),
    }
}

/// Canonical amount: integer minor units plus ISO currency code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedPrice {
    /// Amount in minor units (cents).
    pub amount_cents: i64,
    /// ISO 4217 currency code.
    pub currency_code: String,
}

impl NormalizedPrice {
    pub fn new(amount_cents: i64, currency_code: impl Into<String>) -> Self {
        Self {
            amount_cents,
            currency_code: currency_code.into(),
        }
    }

    /// Amount as a decimal in major units.
    pub fn amount(&self) -> Decimal {
        Decimal::new(self.amount_cents, 2)
    }
}

impl fmt::Display for NormalizedPrice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount(), self.currency_code)
    }
}

/// Outcome of one `extract_price` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionResult<'a> {
    /// Valid candidates by confidence desc, pass order asc on tie.
    pub candidates: Vec<ExtractionCandidate<'a>>,
    /// Best candidate, `None` when no price was found.
    pub chosen: Option<ExtractionCandidate<'a>>,
    /// Canonical form of `chosen`.
    pub normalized: Option<NormalizedPrice>,
    /// Passes that actually ran, in order.
    pub passes_run: Vec<Strategy>,
}

impl<'a> DetectionResult<'a> {
    /// A result with no price.
    pub fn empty() -> Self {
        Self {
            candidates: Vec::new(),
            chosen: None,
            normalized: None,
            passes_run: Vec::new(),
        }
    }

    pub fn is_found(&self) -> bool {
        self.chosen.is_some()
    }
}

/// Unit handed over by the DOM scanner.
#[derive(Debug, Clone, Copy)]
pub enum ScanUnit<'a> {
    /// A bare text string.
    Text(&'a str),
    /// An element with attributes and children.
    Node(ElementRef<'a>),
}

/// Input to the detection pipeline: a scan unit plus the page hostname.
#[derive(Debug, Clone, Copy)]
pub struct ScanInput<'a> {
    pub unit: ScanUnit<'a>,
    pub hostname: Option<&'a str>,
}

impl<'a> ScanInput<'a> {
    pub fn text(text: &'a str) -> Self {
        Self {
            unit: ScanUnit::Text(text),
            hostname: None,
        }
    }

    pub fn node(node: ElementRef<'a>) -> Self {
        Self {
            unit: ScanUnit::Node(node),
            hostname: None,
        }
    }

    /// Set the hostname of the page the unit belongs to.
    pub fn on_host(mut self, hostname: &'a str) -> Self {
        self.hostname = Some(hostname);
        self
    }

    pub fn node_ref(&self) -> Option<ElementRef<'a>> {
        match self.unit {
            ScanUnit::Node(node) => Some(node),
            ScanUnit::Text(_) => None,
        }
    }
}
