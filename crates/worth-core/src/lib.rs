//! Core library for locating and normalizing displayed prices.
//!
//! This crate provides:
//! - Locale currency formats and their registry
//! - Price pattern compilation with a per-registry cache
//! - DOM reading of attribute, assembled and plain candidate texts
//! - Site handlers for bespoke markup
//! - The multi-pass detection pipeline and price normalization

pub mod detect;
pub mod dom;
pub mod error;
pub mod formats;
pub mod models;
pub mod normalize;
pub mod patterns;
pub mod sites;

pub use detect::{might_contain_price, FoundPrices, StrategyCoordinator};
pub use dom::{CandidateText, DomStructureAnalyzer, TextSource};
pub use error::{ConfigError, ExtractionError, Result, WorthError};
pub use formats::{CurrencyFormatRegistry, CurrencyFormatRule, SymbolPosition};
pub use models::{
    DetectionResult, ExtractionCandidate, ExtractionConfig, NormalizedPrice, PatternCategory,
    ScanInput, ScanUnit, Settings, SiteRule, Strategy, WorthConfig,
};
pub use normalize::PriceNormalizer;
pub use patterns::{PatternCompiler, PricePattern};
pub use sites::{AmazonPriceHandler, HandlerContext, SelectorHandler, SiteHandler, SiteHandlerRegistry};

/// Re-export of the DOM types scan units are built from.
pub use scraper::{ElementRef, Html, Selector};
