//! Batch command - find prices in many HTML files.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, warn};

use worth_core::{Settings, StrategyCoordinator};

use super::extract::{format_hits, OutputFormat};
use super::{best_hit, load_config, scan_html, scan_text, PriceHit};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Glob pattern of input files (.html, .htm, .txt)
    #[arg(required = true)]
    input: String,

    /// Output directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format for each file
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,

    /// CSS selector of the elements to scan
    #[arg(short, long)]
    selector: Option<String>,

    /// Hostname used to pick site handlers
    #[arg(long)]
    host: Option<String>,

    /// Only report the most confident price per file
    #[arg(long)]
    best: bool,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,
}

/// Result of scanning a single file.
struct ScanOutcome {
    path: PathBuf,
    hits: Option<Vec<PriceHit>>,
    error: Option<String>,
    processing_time_ms: u64,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let config = load_config(config_path)?;
    let coordinator = StrategyCoordinator::from_config(&config)?;

    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| {
            let ext = p.extension().and_then(|e| e.to_str()).unwrap_or("");
            matches!(ext.to_lowercase().as_str(), "html" | "htm" | "txt")
        })
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    println!(
        "{} Found {} files to scan",
        style("ℹ").blue(),
        files.len()
    );

    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    let mut outcomes = Vec::with_capacity(files.len());

    for path in files {
        let file_start = Instant::now();
        let result = scan_file(&path, &coordinator, &config.settings, &args);
        let processing_time_ms = file_start.elapsed().as_millis() as u64;

        match result {
            Ok(hits) => outcomes.push(ScanOutcome {
                path,
                hits: Some(hits),
                error: None,
                processing_time_ms,
            }),
            Err(e) => {
                let error_msg = e.to_string();
                if args.continue_on_error {
                    warn!("Failed to scan {}: {}", path.display(), error_msg);
                    outcomes.push(ScanOutcome {
                        path,
                        hits: None,
                        error: Some(error_msg),
                        processing_time_ms,
                    });
                } else {
                    error!("Failed to scan {}: {}", path.display(), error_msg);
                    anyhow::bail!("Scanning failed: {}", error_msg);
                }
            }
        }

        pb.inc(1);
    }

    pb.finish_with_message("Complete");

    let successful: Vec<_> = outcomes.iter().filter(|o| o.hits.is_some()).collect();
    let failed: Vec<_> = outcomes.iter().filter(|o| o.error.is_some()).collect();
    let priced = successful
        .iter()
        .filter(|o| o.hits.as_ref().is_some_and(|h| !h.is_empty()))
        .count();

    if let Some(output_dir) = &args.output_dir {
        for outcome in &successful {
            let Some(hits) = &outcome.hits else { continue };

            let output_name = outcome
                .path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("page");
            let output_path =
                output_dir.join(format!("{}.{}", output_name, args.format.extension()));

            fs::write(&output_path, format_hits(hits, args.format)?)?;
            debug!("Wrote output to {}", output_path.display());
        }
    }

    if args.summary {
        let summary_path = args
            .output_dir
            .as_ref()
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));

        write_summary(&summary_path, &outcomes)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    println!();
    println!(
        "{} Scanned {} files in {:?}",
        style("✓").green(),
        outcomes.len(),
        start.elapsed()
    );
    println!(
        "   {} with prices, {} without, {} failed",
        style(priced).green(),
        style(successful.len() - priced).yellow(),
        style(failed.len()).red()
    );

    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for outcome in &failed {
            println!(
                "  - {}: {}",
                outcome.path.display(),
                outcome.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    Ok(())
}

fn scan_file(
    path: &Path,
    coordinator: &StrategyCoordinator,
    settings: &Settings,
    args: &BatchArgs,
) -> anyhow::Result<Vec<PriceHit>> {
    let content = fs::read_to_string(path)?;
    let is_text = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("txt"));

    let hits = if is_text {
        scan_text(coordinator, &content, settings)?
    } else {
        scan_html(
            coordinator,
            &content,
            settings,
            args.host.as_deref(),
            args.selector.as_deref(),
        )?
    };

    Ok(if args.best { best_hit(hits) } else { hits })
}

fn write_summary(path: &Path, outcomes: &[ScanOutcome]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "filename",
        "status",
        "prices",
        "best_amount_cents",
        "best_currency",
        "best_strategy",
        "best_confidence",
        "processing_time_ms",
        "error",
    ])?;

    for outcome in outcomes {
        let filename = outcome
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("");
        let time = outcome.processing_time_ms.to_string();

        match &outcome.hits {
            Some(hits) => {
                let best = best_hit(hits.clone()).into_iter().next();
                let status = if best.is_some() { "found" } else { "none" };

                wtr.write_record([
                    filename,
                    status,
                    &hits.len().to_string(),
                    &best.as_ref().map(|b| b.amount_cents.to_string()).unwrap_or_default(),
                    best.as_ref().map(|b| b.currency.as_str()).unwrap_or(""),
                    best.as_ref().map(|b| b.strategy.as_str()).unwrap_or(""),
                    &best.as_ref().map(|b| format!("{:.2}", b.confidence)).unwrap_or_default(),
                    &time,
                    "",
                ])?;
            }
            None => {
                wtr.write_record([
                    filename,
                    "error",
                    "",
                    "",
                    "",
                    "",
                    "",
                    &time,
                    outcome.error.as_deref().unwrap_or(""),
                ])?;
            }
        }
    }

    wtr.flush()?;
    Ok(())
}
