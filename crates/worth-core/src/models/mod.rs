//! Data models for price detection.

pub mod config;
pub mod price;

pub use config::{ExtractionConfig, Settings, SiteRule, WorthConfig};
pub use price::{
    DetectionResult, ExtractionCandidate, NormalizedPrice, PatternCategory, ScanInput, ScanUnit,
    Strategy,
};
