use std::fs::{self, File};
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::Parser;
use nexus_core::calculations::{AnalysisInput, NexusEngine, SalesAggregator};
use nexus_core::{EngineConfig, RuleSnapshot};
use nexus_data::{
    AnalysisContext, JsonRuleRepository, TransactionLoader, init_logging, load_settings,
};
use tracing::info;

/// Determine sales-tax nexus and estimate unpaid liability per state.
///
/// The transactions CSV must have the columns:
/// - state: two-letter state code
/// - date: sale date (YYYY-MM-DD)
/// - amount: gross sale amount
/// - exempt_amount: exempt portion (empty for none)
/// - channel: direct or marketplace (empty for direct)
#[derive(Parser, Debug)]
#[command(name = "nexus-analyzer")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the transactions CSV file
    #[arg(short, long)]
    transactions: PathBuf,

    /// Path to the JSON rules document (threshold and penalty/interest rules)
    #[arg(short, long)]
    rules: PathBuf,

    /// Path to the JSON analysis context (tax rates, presence, registrations)
    #[arg(short, long)]
    context: Option<PathBuf>,

    /// Path to a TOML file with engine settings
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Date liability is measured to (defaults to today)
    #[arg(long)]
    as_of: Option<NaiveDate>,

    /// Write the JSON result here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Log filter, e.g. "debug" or "nexus_core=debug" (overrides RUST_LOG)
    #[arg(long)]
    log_level: Option<String>,

    /// Also append log output to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.log_level.as_deref(), args.log_file.as_deref())
        .context("Failed to initialize logging")?;

    let config = match &args.settings {
        Some(path) => load_settings(path)
            .with_context(|| format!("Failed to load settings: {}", path.display()))?,
        None => EngineConfig::default(),
    };

    let file = File::open(&args.transactions)
        .with_context(|| format!("Failed to open: {}", args.transactions.display()))?;
    let transactions = TransactionLoader::parse(file)
        .with_context(|| format!("Failed to parse CSV: {}", args.transactions.display()))?;
    info!(count = transactions.len(), "transactions loaded");

    let sales = SalesAggregator::aggregate(&transactions).context("Failed to aggregate sales")?;

    let rules_file = File::open(&args.rules)
        .with_context(|| format!("Failed to open: {}", args.rules.display()))?;
    let repo = JsonRuleRepository::from_json(rules_file)
        .with_context(|| format!("Failed to parse rules: {}", args.rules.display()))?;
    let snapshot = RuleSnapshot::load(&repo)
        .await
        .context("Failed to read rules from repository")?;

    let as_of = args.as_of.unwrap_or_else(|| Local::now().date_naive());
    let mut input = AnalysisInput::from_aggregated(
        sales,
        snapshot.threshold_rules,
        snapshot.penalty_interest_configs,
        as_of,
    );

    if let Some(path) = &args.context {
        let file =
            File::open(path).with_context(|| format!("Failed to open: {}", path.display()))?;
        AnalysisContext::from_json(file)
            .with_context(|| format!("Failed to parse context: {}", path.display()))?
            .apply(&mut input);
    }

    input.validate().context("Invalid analysis input")?;

    let engine = NexusEngine::new(config);
    let result = tokio::task::spawn_blocking(move || engine.evaluate(&input))
        .await
        .context("Engine task failed")?;

    let json = serde_json::to_string_pretty(&result).context("Failed to encode result")?;
    match &args.output {
        Some(path) => {
            fs::write(path, json)
                .with_context(|| format!("Failed to write: {}", path.display()))?;
            info!(path = %path.display(), "result written");
        }
        None => println!("{json}"),
    }

    eprintln!("{}", result.summary.headline());

    Ok(())
}
