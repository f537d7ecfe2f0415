//! MCP Lab CLI — rule validation, batch runs, price solves and what-if simulation.
//!
//! Commands:
//! - `validate` — load a rule config (and optionally an override document) and report problems
//! - `batch` — run a TOML batch config and write `report.json` + `rows.csv`
//! - `solve` — price for a target margin given a cost
//! - `simulate` — fee breakdown for a single item at a hypothetical price and subsidy
//!
//! Logging goes to stderr through `tracing-subscriber`; set `RUST_LOG` to
//! change the level (default `info`).

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use mcplab_core::{
    simulate_with_overrides, Item, ItemKeys, LogisticType, OverrideSet, PriceSolver,
    SolverSettings,
};
use mcplab_runner::{load_overrides, load_rules, save_report, BatchConfig, BatchReport};

#[derive(Parser)]
#[command(
    name = "mcplab",
    about = "MCP Lab — marketplace fees, contribution margin and target-margin pricing"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and validate a rule config and, optionally, an override document.
    Validate {
        /// Rule config JSON.
        #[arg(long)]
        rules: PathBuf,

        /// Override document JSON.
        #[arg(long)]
        overrides: Option<PathBuf>,
    },
    /// Run a batch described by a TOML config file.
    Batch {
        /// Path to the batch TOML config.
        #[arg(long)]
        config: PathBuf,

        /// Evaluation date (YYYY-MM-DD), overrides the config file.
        #[arg(long)]
        as_of: Option<String>,

        /// Scenario name, overrides the config file.
        #[arg(long)]
        scenario: Option<String>,

        /// Output directory for report.json and rows.csv.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// Solve the listing price for a target margin.
    Solve {
        #[command(flatten)]
        context: PricingContext,

        /// Purchase cost of the item.
        #[arg(long)]
        cost: f64,

        /// Target margin as a fraction. Defaults to the configured min and max.
        #[arg(long)]
        target: Option<f64>,
    },
    /// Fee breakdown for one item at a hypothetical price and subsidy.
    Simulate {
        #[command(flatten)]
        context: PricingContext,

        /// Current listing price.
        #[arg(long)]
        price: f64,

        /// Purchase cost of the item.
        #[arg(long)]
        cost: Option<f64>,

        /// Hypothetical price to evaluate instead of the current one.
        #[arg(long)]
        new_price: Option<f64>,

        /// Subsidy absorbed by the marketplace, in currency.
        #[arg(long, default_value_t = 0.0)]
        subsidy: f64,
    },
}

/// Rules, overrides and item identity shared by `solve` and `simulate`.
#[derive(Args)]
struct PricingContext {
    /// Rule config JSON.
    #[arg(long)]
    rules: PathBuf,

    /// Override document JSON.
    #[arg(long)]
    overrides: Option<PathBuf>,

    /// Logistics class: FULL or SELLER (marketplace aliases accepted).
    #[arg(long, default_value = "FULL", value_parser = parse_logistic_type)]
    logistic_type: LogisticType,

    /// Item identifiers used to match per-item overrides.
    #[arg(long)]
    mlb: Option<String>,
    #[arg(long)]
    sku: Option<String>,
    #[arg(long)]
    gtin: Option<String>,

    /// Scenario name.
    #[arg(long)]
    scenario: Option<String>,

    /// Evaluation date (YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    as_of: Option<String>,
}

impl PricingContext {
    fn keys(&self) -> ItemKeys {
        ItemKeys {
            mlb: self.mlb.clone(),
            sku: self.sku.clone(),
            gtin: self.gtin.clone(),
        }
    }

    fn overrides(&self) -> Result<OverrideSet> {
        match &self.overrides {
            Some(path) => Ok(load_overrides(path)?),
            None => Ok(OverrideSet::empty()),
        }
    }

    fn as_of(&self) -> Result<NaiveDate> {
        Ok(parse_date(self.as_of.as_deref())?
            .unwrap_or_else(|| chrono::Local::now().date_naive()))
    }
}

fn parse_logistic_type(s: &str) -> Result<LogisticType, String> {
    serde_json::from_value(serde_json::Value::String(s.trim().to_string()))
        .map_err(|_| format!("unknown logistic type '{s}' (expected FULL or SELLER)"))
}

fn parse_date(s: Option<&str>) -> Result<Option<NaiveDate>> {
    s.map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("invalid date '{s}'")))
        .transpose()
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { rules, overrides } => run_validate(&rules, overrides.as_deref()),
        Commands::Batch {
            config,
            as_of,
            scenario,
            output_dir,
        } => run_batch(&config, as_of, scenario, &output_dir),
        Commands::Solve {
            context,
            cost,
            target,
        } => run_solve(&context, cost, target),
        Commands::Simulate {
            context,
            price,
            cost,
            new_price,
            subsidy,
        } => run_simulate(&context, price, cost, new_price, subsidy),
    }
}

fn run_validate(rules_path: &Path, overrides_path: Option<&Path>) -> Result<()> {
    let rules = load_rules(rules_path)?;
    println!("Rules OK: {}", rules_path.display());
    println!("  Channel:     {}", rules.channel);
    println!("  Fingerprint: {}", rules.fingerprint());
    println!(
        "  Margin band: {:.2}% .. {:.2}%",
        rules.defaults.margin_min * 100.0,
        rules.defaults.margin_max * 100.0
    );
    for logistic_type in [LogisticType::Full, LogisticType::Seller] {
        let ladder = rules.ladder(logistic_type);
        println!(
            "  {:<6} commission {:.2}%, {} tier(s){}",
            logistic_type,
            rules.commission_pct(logistic_type) * 100.0,
            ladder.tiers().len(),
            if ladder.fallback().is_some() { ", with fallback" } else { "" }
        );
    }

    let Some(path) = overrides_path else {
        return Ok(());
    };
    let overrides = load_overrides(path)?;
    println!("Overrides: {}", path.display());
    if let Some(channel) = overrides.channel() {
        if channel != rules.channel {
            println!("  WARNING: channel '{channel}' differs from rules '{}'", rules.channel);
        }
    }
    let scenarios: Vec<&str> = overrides.scenario_names().collect();
    println!("  Entries:   {}", overrides.len());
    println!("  Scenarios: {}", if scenarios.is_empty() { "-".to_string() } else { scenarios.join(", ") });

    let invalid: Vec<_> = overrides.invalid_entries().collect();
    for (section, key, reason) in &invalid {
        println!("  INVALID {section}.{key}: {reason}");
    }
    if !invalid.is_empty() {
        bail!("{} invalid override entr(ies)", invalid.len());
    }
    Ok(())
}

fn run_batch(
    config_path: &Path,
    as_of: Option<String>,
    scenario: Option<String>,
    output_dir: &Path,
) -> Result<()> {
    let mut config = BatchConfig::from_file(config_path)?;
    if let Some(date) = parse_date(as_of.as_deref())? {
        config.as_of = Some(date);
    }
    if scenario.is_some() {
        config.scenario = scenario;
    }

    info!(config = %config_path.display(), as_of = %config.effective_as_of(), "starting batch");
    let report = config.run()?;
    print_summary(&report);

    save_report(&report, output_dir)?;
    println!("Report saved to: {}", output_dir.display());
    Ok(())
}

fn run_solve(context: &PricingContext, cost: f64, target: Option<f64>) -> Result<()> {
    let base = load_rules(&context.rules)?;
    let overrides = context.overrides()?;
    let keys = context.keys();
    let resolution = overrides.effective_config(&base, &keys, context.scenario.as_deref(), context.as_of()?);
    let config = resolution.config.as_ref();
    if let Some(m) = resolution.matched {
        println!("Override: {:?} '{}'", m.source, m.key);
    }

    let targets = match target {
        Some(t) => vec![t],
        None => vec![config.defaults.margin_min, config.defaults.margin_max],
    };
    let solver = PriceSolver::new(SolverSettings::default());
    for t in targets {
        match solver.solve_detailed(cost, context.logistic_type, t, config) {
            Ok(solution) => {
                let note = if solution.converged { "" } else { " (approximate)" };
                println!(
                    "target {:>6.2}% -> price {:.2}{note} after {} iteration(s)",
                    t * 100.0,
                    solution.price,
                    solution.iterations
                );
            }
            Err(e) => println!("target {:>6.2}% -> no price: {e}", t * 100.0),
        }
    }
    Ok(())
}

fn run_simulate(
    context: &PricingContext,
    price: f64,
    cost: Option<f64>,
    new_price: Option<f64>,
    subsidy: f64,
) -> Result<()> {
    let base = load_rules(&context.rules)?;
    let overrides = context.overrides()?;
    let mut keys = context.keys();
    if keys.is_empty() {
        keys = ItemKeys::mlb("cli");
    }
    let mut item = Item::new(keys, price, context.logistic_type);
    if let Some(cost) = cost {
        item = item.with_cost(cost);
    }
    item.validate()?;

    let simulation = simulate_with_overrides(
        &item,
        new_price,
        subsidy,
        &base,
        &overrides,
        context.scenario.as_deref(),
        context.as_of()?,
    );
    println!(
        "{}",
        serde_json::to_string_pretty(&simulation).context("failed to serialize simulation")?
    );
    Ok(())
}

fn print_summary(report: &BatchReport) {
    let s = &report.summary;
    println!("=== Batch Results ===");
    println!("Channel:           {}", report.channel);
    println!("As of:             {}", report.as_of);
    if let Some(scenario) = &report.scenario {
        println!("Scenario:          {scenario}");
    }
    println!("Items:             {}", s.items);
    println!("Evaluated:         {}", s.evaluated);
    println!("Rejected:          {}", s.rejected);
    println!("With cost:         {}", s.with_cost);
    println!("Overridden:        {}", s.overridden);
    println!("Negative margin:   {}", s.negative_margin);
    println!("Bounds solved:     {}", s.bounds_solved);
    println!("Bounds infeasible: {}", s.bounds_infeasible);
    println!("Approximate:       {}", s.bounds_approximate);
    println!("Bounds unsolvable: {}", s.bounds_unsolvable);
    for reject in &report.rejected {
        println!(
            "  rejected #{} {}: {}",
            reject.index,
            reject.keys.primary().unwrap_or("-"),
            reject.reason
        );
    }
}
