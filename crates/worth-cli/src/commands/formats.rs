//! Formats command - inspect currency formats and price matchers.

use clap::{Args, Subcommand};
use console::style;

use worth_core::{CurrencyFormatRule, StrategyCoordinator};

use super::load_config;

/// Amount used to show how a format renders prices.
const SAMPLE_CENTS: u64 = 123_456;

/// Arguments for the formats command.
#[derive(Args)]
pub struct FormatsArgs {
    #[command(subcommand)]
    command: FormatsCommand,
}

#[derive(Subcommand)]
enum FormatsCommand {
    /// List registered currency formats
    List {
        /// Print the formats as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the price matcher for a sample text or the configured currency
    Pattern {
        /// Sample text; its currency picks the format and its matches are listed
        text: Option<String>,

        /// Require an hours annotation like "(1h 30m)" after each price
        #[arg(long)]
        reverse: bool,
    },
}

pub async fn run(args: FormatsArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let coordinator = StrategyCoordinator::from_config(&config)?;

    match args.command {
        FormatsCommand::List { json } => list_formats(&coordinator, json),
        FormatsCommand::Pattern { text, reverse } => {
            let settings = config.settings.clone().with_reverse_search(reverse);
            show_pattern(&coordinator, text.as_deref().unwrap_or(""), &settings)
        }
    }
}

fn list_formats(coordinator: &StrategyCoordinator, json: bool) -> anyhow::Result<()> {
    let rules: Vec<&CurrencyFormatRule> =
        coordinator.registry().formats().map(|r| r.as_ref()).collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&rules)?);
        return Ok(());
    }

    println!(
        "{:<10} {:<10} {:<16} {:<22} {}",
        style("ID").bold(),
        style("CODES").bold(),
        style("SYMBOLS").bold(),
        style("SEPARATORS").bold(),
        style("EXAMPLE").bold()
    );

    for rule in rules {
        let example = rule
            .format_amount(SAMPLE_CENTS)
            .unwrap_or_else(|e| style(e.to_string()).red().to_string());

        println!(
            "{:<10} {:<10} {:<16} {:<22} {}",
            rule.id,
            rule.codes.join(","),
            rule.symbols.join(" "),
            format!("{}/{}", rule.thousands_separator, rule.decimal_separator),
            example
        );
    }

    Ok(())
}

fn show_pattern(
    coordinator: &StrategyCoordinator,
    text: &str,
    settings: &worth_core::Settings,
) -> anyhow::Result<()> {
    let found = coordinator.find_prices(text, settings)?;

    println!("Format:    {}", found.format_info.id);
    println!("Thousands: {}", found.thousands);
    println!("Decimal:   {}", found.decimal);
    println!("Pattern:   {}", found.pattern.as_str());

    if !text.is_empty() {
        let matches: Vec<&str> = found.pattern.find_iter(text).map(|m| m.as_str()).collect();

        println!();
        if matches.is_empty() {
            println!("{} No matches", style("ℹ").blue());
        }
        for m in matches {
            println!("{} {}", style("✓").green(), m);
        }
    }

    Ok(())
}
