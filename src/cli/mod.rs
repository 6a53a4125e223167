//! Tabular Bench CLI Module
//!
//! Command-line interface for cross-validation and holdout benchmarks.

use clap::{Parser, Subcommand};
use colored::*;
use std::collections::BTreeSet;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::data::ColumnValues;
use crate::evaluation::BenchmarkReport;
use crate::experiment::{self, ExperimentConfig};
use crate::training::{StrategyFactory, StrategyKind};
use crate::utils::DatasetLoader;

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
    let _ = io::stdout().flush();
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "tabular-bench")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Cross-validation and holdout benchmarks for tabular classifiers")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by the two evaluation modes
#[derive(clap::Args, Debug, Clone)]
pub struct ExperimentArgs {
    /// Experiment file (TOML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Input data file (CSV); overrides the experiment file
    #[arg(short, long)]
    pub data: Option<PathBuf>,

    /// Per-strategy time budget in seconds
    #[arg(long)]
    pub timeout: Option<f64>,

    /// Write the structured report as JSON
    #[arg(short, long)]
    pub report: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// K-fold cross-validation of every strategy on the whole file
    CrossValidate {
        #[command(flatten)]
        args: ExperimentArgs,

        /// Number of folds
        #[arg(short = 'k', long)]
        folds: Option<usize>,

        /// Evaluate the folds of each strategy in parallel
        #[arg(long)]
        parallel: bool,
    },

    /// Train on rows with validation = 0, score on validation = 1
    Holdout {
        #[command(flatten)]
        args: ExperimentArgs,

        /// Write the encoded training table here
        #[arg(long)]
        export_train: Option<PathBuf>,

        /// Write the encoded holdout table here
        #[arg(long)]
        export_holdout: Option<PathBuf>,
    },

    /// Show column names, kinds and distinct counts of a data file
    Info {
        /// Input data file
        #[arg(short, long)]
        data: PathBuf,
    },

    /// List the built-in strategies and their hyperparameters
    Strategies,
}

// ─── Experiment loading ────────────────────────────────────────────────────────

pub fn load_experiment(args: &ExperimentArgs) -> anyhow::Result<ExperimentConfig> {
    let mut config = match &args.config {
        Some(path) => ExperimentConfig::from_toml_file(path)?,
        None => ExperimentConfig::default(),
    };
    if let Some(data) = &args.data {
        config = config.with_data_path(data);
    }
    if let Some(secs) = args.timeout {
        config.harness.strategy_timeout_secs = Some(secs);
    }
    config.validate()?;
    Ok(config)
}

fn finish(report: &BenchmarkReport, out: Option<&Path>) -> anyhow::Result<()> {
    println!();
    report.print();

    if let Some(path) = out {
        report.save_json(path)?;
        println!();
        step_ok(&format!("Report written to {}", path.display()));
    }

    if report.completed().next().is_none() {
        anyhow::bail!("no strategy completed");
    }
    println!();
    Ok(())
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_cross_validate(
    args: &ExperimentArgs,
    folds: Option<usize>,
    parallel: bool,
) -> anyhow::Result<()> {
    section("Cross-validate");

    let mut config = load_experiment(args)?;
    if let Some(k) = folds {
        config.harness = config.harness.with_folds(k);
    }
    if parallel {
        config.harness.parallel_folds = true;
    }
    config.validate()?;

    step_run("Preparing data");
    let start = Instant::now();
    let data = experiment::prepare_cross_validation(&config)?;
    step_done(&format!(
        "{} rows × {} features in {:.2?}",
        data.features.n_rows(),
        data.features.n_cols(),
        start.elapsed()
    ));

    let factories = config.factories();
    step_ok(&format!(
        "{} strategies, {} folds",
        factories.len(),
        config.harness.cv_strategy.n_splits()
    ));

    let harness = crate::evaluation::EvaluationHarness::new(config.harness.clone())?;
    let report = harness.run_cross_validation(&factories, &data.features, &data.labels)?;
    finish(&report, args.report.as_deref())
}

pub fn cmd_holdout(
    args: &ExperimentArgs,
    export_train: Option<PathBuf>,
    export_holdout: Option<PathBuf>,
) -> anyhow::Result<()> {
    section("Holdout");

    let mut config = load_experiment(args)?;
    if export_train.is_some() {
        config.export.train_path = export_train;
    }
    if export_holdout.is_some() {
        config.export.holdout_path = export_holdout;
    }

    step_run("Preparing data");
    let start = Instant::now();
    let data = experiment::prepare_holdout(&config)?;
    step_done(&format!(
        "{} train / {} holdout rows in {:.2?}",
        data.train.features.n_rows(),
        data.holdout.features.n_rows(),
        start.elapsed()
    ));

    for path in [&config.export.train_path, &config.export.holdout_path].into_iter().flatten() {
        step_ok(&format!("Exported {}", path.display()));
    }

    let harness = crate::evaluation::EvaluationHarness::new(config.harness.clone())?;
    let report = harness.run_holdout(
        &config.factories(),
        &data.train.features,
        &data.train.labels,
        &data.holdout.features,
        &data.holdout.labels,
    )?;
    finish(&report, args.report.as_deref())
}

pub fn cmd_info(data_path: &Path) -> anyhow::Result<()> {
    section("Data Info");

    let table = DatasetLoader::default().load(data_path)?;

    println!("  {:<12} {}", muted("File"), data_path.display());
    println!("  {:<12} {}", muted("Rows"), table.n_rows());
    println!("  {:<12} {}", muted("Columns"), table.n_cols());
    println!();

    println!(
        "  {:<20} {:<12} {:>8}  {}",
        muted("Column"),
        muted("Kind"),
        muted("Unique"),
        muted("First")
    );
    println!("  {}", dim(&"─".repeat(56)));

    for column in table.columns() {
        let unique = match column.values() {
            ColumnValues::Numeric(values) => values
                .iter()
                .map(|v| v.to_bits())
                .collect::<BTreeSet<_>>()
                .len(),
            ColumnValues::Text(values) => values.iter().collect::<BTreeSet<_>>().len(),
        };
        let first = if column.is_empty() {
            String::new()
        } else {
            column.display_value(0)
        };
        println!(
            "  {:<20} {:<12} {:>8}  {}",
            column.name(),
            format!("{:?}", column.kind()).truecolor(140, 140, 140),
            unique,
            dim(&first)
        );
    }

    println!();
    Ok(())
}

pub fn cmd_strategies() -> anyhow::Result<()> {
    section("Built-in strategies");

    for strategy in ExperimentConfig::default().strategies() {
        println!("  {}", strategy.id().white());
    }

    section("Hyperparameters");
    let kinds = [
        StrategyKind::LogisticRegression,
        StrategyKind::LinearSvc,
        StrategyKind::SgdClassifier,
        StrategyKind::RandomForest,
        StrategyKind::ExtraTrees,
    ];
    for kind in kinds {
        println!(
            "  {:<22} {}",
            accent(kind.name()),
            muted(&kind.hyperparameter_names().join(", "))
        );
    }

    println!();
    Ok(())
}
