//! Extract command - find prices in a single HTML file, URL or text.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use tracing::{debug, info};

use worth_core::StrategyCoordinator;

use super::{best_hit, load_config, scan_html, scan_text, PriceHit};

/// Arguments for the extract command.
#[derive(Args)]
pub struct ExtractArgs {
    /// Input HTML file or http(s) URL
    #[arg(required = true)]
    input: String,

    /// Treat the input as plain text instead of HTML
    #[arg(long)]
    text: bool,

    /// CSS selector of the elements to scan (default: price-like elements)
    #[arg(short, long)]
    selector: Option<String>,

    /// Hostname used to pick site handlers (default: the URL's host)
    #[arg(long)]
    host: Option<String>,

    /// Only report the most confident price
    #[arg(long)]
    best: bool,

    /// Only accept prices followed by an hours annotation like "(1h 30m)"
    #[arg(long)]
    reverse: bool,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output
    Csv,
    /// Plain text summary
    Text,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Text => "txt",
        }
    }
}

pub async fn run(args: ExtractArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let config = load_config(config_path)?;
    let coordinator = StrategyCoordinator::from_config(&config)?;

    let mut settings = config.settings.clone();
    if args.reverse {
        settings.is_reverse_search = true;
    }

    let (content, url_host) = read_input(&args.input).await?;
    let host = args.host.clone().or(url_host);

    info!("Scanning {}", args.input);

    let hits = if args.text {
        scan_text(&coordinator, &content, &settings)?
    } else {
        scan_html(&coordinator, &content, &settings, host.as_deref(), args.selector.as_deref())?
    };
    let hits = if args.best { best_hit(hits) } else { hits };

    let output = format_hits(&hits, args.format)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

/// Read a local file or fetch a URL. URLs also yield their hostname.
async fn read_input(input: &str) -> anyhow::Result<(String, Option<String>)> {
    if input.starts_with("http://") || input.starts_with("https://") {
        let url = reqwest::Url::parse(input)?;
        let host = url.host_str().map(str::to_string);

        debug!("Fetching {}", url);
        let body = reqwest::get(url).await?.error_for_status()?.text().await?;
        return Ok((body, host));
    }

    let path = Path::new(input);
    if !path.exists() {
        anyhow::bail!("Input file not found: {}", path.display());
    }

    Ok((fs::read_to_string(path)?, None))
}

pub fn format_hits(hits: &[PriceHit], format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(hits)?),
        OutputFormat::Csv => format_csv(hits),
        OutputFormat::Text => Ok(format_text(hits)),
    }
}

fn format_csv(hits: &[PriceHit]) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "element",
        "text",
        "amount_cents",
        "currency",
        "formatted",
        "strategy",
        "confidence",
    ])?;

    for hit in hits {
        wtr.write_record([
            hit.element.as_str(),
            hit.text.as_str(),
            &hit.amount_cents.to_string(),
            hit.currency.as_str(),
            hit.formatted.as_str(),
            hit.strategy.as_str(),
            &format!("{:.2}", hit.confidence),
        ])?;
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(hits: &[PriceHit]) -> String {
    if hits.is_empty() {
        return "No price found".to_string();
    }

    let mut output = String::new();
    for hit in hits {
        output.push_str(&format!(
            "{:<14} {} {:<8} {} via {} ({:.0}%)\n",
            hit.formatted,
            hit.currency,
            format!("<{}>", hit.element),
            hit.text,
            hit.strategy,
            hit.confidence * 100.0
        ));
    }

    output
}
