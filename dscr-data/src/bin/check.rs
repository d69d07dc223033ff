use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use dscr_core::defaults::DefaultsProvider;
use dscr_data::FileDefaultsProvider;

/// Check a defaults directory before publishing it.
///
/// The directory should contain:
/// - Tax_ins.json: default tax and insurance percentages
/// - rates.json: current rates, the first entry is the default
/// - dscr-messages.json or dscr-messages.csv: DSCR message ranges
#[derive(Parser, Debug)]
#[command(name = "dscr-defaults-check")]
#[command(version, about, long_about = None)]
struct Args {
    /// Directory holding the defaults files
    #[arg(short, long)]
    dir: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let provider = FileDefaultsProvider::new(&args.dir);

    println!("Checking defaults in: {}", args.dir.display());

    let rates = provider
        .rate_defaults()
        .await
        .with_context(|| format!("Failed to read rate defaults from: {}", args.dir.display()))?;

    println!("Taxes:     {}%", rates.taxes_percent);
    println!("Insurance: {}%", rates.insurance_percent);
    println!("Rate:      {}%", rates.interest_rate);

    let rules = provider
        .message_rules()
        .await
        .with_context(|| format!("Failed to read DSCR messages from: {}", args.dir.display()))?;

    for rule in &rules {
        println!("[{} - {}] {}", rule.min, rule.max, rule.message);
    }

    println!("Defaults are valid: {} message ranges.", rules.len());

    Ok(())
}
