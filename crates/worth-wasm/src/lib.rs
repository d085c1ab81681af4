//! WASM bindings for price detection.
//!
//! A browser extension content script hands over the outer HTML of an
//! element (or a plain text) and gets back the detected price.

use serde::Serialize;
use wasm_bindgen::prelude::*;

use worth_core::{
    CurrencyFormatRule, ElementRef, Html, ScanInput, Settings, StrategyCoordinator, WorthConfig,
    WorthError,
};

/// Largest integer a JS number holds exactly.
const MAX_SAFE_CENTS: f64 = 9_007_199_254_740_991.0;

thread_local! {
    static ENGINE: StrategyCoordinator = StrategyCoordinator::new();
}

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Version information.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Find the price in an HTML fragment.
///
/// `settings` is an optional `{ currencySymbol, currencyCode, thousands,
/// decimal, isReverseSearch }` object. `hostname` enables site handlers.
#[wasm_bindgen(js_name = extractPrice)]
pub fn extract_price(
    html: &str,
    settings: JsValue,
    hostname: Option<String>,
) -> Result<JsValue, JsValue> {
    let settings = settings_from_js(settings)?;
    let value = ENGINE
        .with(|engine| detect(engine, html, &settings, hostname.as_deref()))
        .map_err(to_js_error)?;
    to_js(&value)
}

/// Matcher for the currency found in `text`, plus the prices it matches.
///
/// The pattern source uses Rust regex syntax.
#[wasm_bindgen(js_name = findPrices)]
pub fn find_prices(text: &str, settings: JsValue) -> Result<JsValue, JsValue> {
    let settings = settings_from_js(settings)?;
    let found = ENGINE
        .with(|engine| matcher_for(engine, text, &settings))
        .map_err(to_js_error)?;
    to_js(&found)
}

/// Render minor units in the style of the currency with ISO code `code`.
#[wasm_bindgen(js_name = formatAmount)]
pub fn format_amount(cents: f64, code: &str) -> Result<String, JsValue> {
    if !cents.is_finite() || cents < 0.0 || cents.fract() != 0.0 || cents > MAX_SAFE_CENTS {
        return Err(to_js_error(format!("Invalid amount in cents: {}", cents)));
    }

    ENGINE
        .with(|engine| render_amount(engine, cents as u64, code))
        .map_err(to_js_error)
}

/// Price extractor with its own configuration, for callers that register
/// extra formats or site rules.
#[wasm_bindgen]
pub struct PriceExtractor {
    engine: StrategyCoordinator,
    settings: Settings,
}

#[wasm_bindgen]
impl PriceExtractor {
    /// Create an extractor from an optional config object.
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<PriceExtractor, JsValue> {
        let config: WorthConfig = if config.is_undefined() || config.is_null() {
            WorthConfig::default()
        } else {
            serde_wasm_bindgen::from_value(config).map_err(to_js_error)?
        };

        Self::from_config(&config).map_err(to_js_error)
    }

    /// Create an extractor from a JSON config document.
    #[wasm_bindgen(js_name = fromJson)]
    pub fn from_json(json: &str) -> Result<PriceExtractor, JsValue> {
        let config: WorthConfig = serde_json::from_str(json).map_err(to_js_error)?;
        Self::from_config(&config).map_err(to_js_error)
    }

    /// Register an extra currency format.
    #[wasm_bindgen(js_name = registerFormat)]
    pub fn register_format(&mut self, rule: JsValue) -> Result<(), JsValue> {
        let rule: CurrencyFormatRule = serde_wasm_bindgen::from_value(rule).map_err(to_js_error)?;
        self.engine
            .registry_mut()
            .register_format(rule)
            .map_err(to_js_error)?;
        Ok(())
    }

    /// Find the price in an HTML fragment using the configured settings.
    #[wasm_bindgen(js_name = extractPrice)]
    pub fn extract_price(&self, html: &str, hostname: Option<String>) -> Result<JsValue, JsValue> {
        let value =
            detect(&self.engine, html, &self.settings, hostname.as_deref()).map_err(to_js_error)?;
        to_js(&value)
    }

    /// Matcher for the currency found in `text`, using the configured settings.
    #[wasm_bindgen(js_name = findPrices)]
    pub fn find_prices(&self, text: &str) -> Result<JsValue, JsValue> {
        let found = matcher_for(&self.engine, text, &self.settings).map_err(to_js_error)?;
        to_js(&found)
    }
}

impl PriceExtractor {
    fn from_config(config: &WorthConfig) -> Result<Self, WorthError> {
        Ok(Self {
            engine: StrategyCoordinator::from_config(config)?,
            settings: config.settings.clone(),
        })
    }
}

/// Matcher returned to JS.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FoundPricesView {
    pattern: String,
    thousands: String,
    decimal: String,
    format_info: CurrencyFormatRule,
    matches: Vec<String>,
}

/// Run the pipeline on the first element of the fragment, or on its text
/// when it holds no element.
fn detect(
    engine: &StrategyCoordinator,
    html: &str,
    settings: &Settings,
    hostname: Option<&str>,
) -> Result<serde_json::Value, WorthError> {
    let fragment = Html::parse_fragment(html);
    let node = fragment.root_element().children().find_map(ElementRef::wrap);

    let text;
    let mut input = match node {
        Some(node) => ScanInput::node(node),
        None => {
            text = fragment.root_element().text().collect::<String>();
            ScanInput::text(&text)
        }
    };
    if let Some(host) = hostname {
        input = input.on_host(host);
    }

    let result = engine.extract_price(&input, settings)?;
    Ok(serde_json::to_value(&result)?)
}

fn matcher_for(
    engine: &StrategyCoordinator,
    text: &str,
    settings: &Settings,
) -> Result<FoundPricesView, WorthError> {
    let found = engine.find_prices(text, settings)?;
    let matches = found
        .pattern
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect();

    Ok(FoundPricesView {
        pattern: found.pattern.as_str().to_string(),
        thousands: found.thousands,
        decimal: found.decimal,
        format_info: found.format_info.as_ref().clone(),
        matches,
    })
}

fn render_amount(engine: &StrategyCoordinator, cents: u64, code: &str) -> Result<String, String> {
    let rule = engine
        .registry()
        .lookup_by_code(code)
        .ok_or_else(|| format!("Unknown currency code: {}", code))?;
    rule.format_amount(cents).map_err(|e| e.to_string())
}

fn settings_from_js(settings: JsValue) -> Result<Settings, JsValue> {
    if settings.is_undefined() || settings.is_null() {
        return Ok(Settings::default());
    }
    serde_wasm_bindgen::from_value(settings).map_err(to_js_error)
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(to_js_error)
}

fn to_js_error(e: impl std::fmt::Display) -> JsValue {
    js_sys::Error::new(&e.to_string()).into()
}
