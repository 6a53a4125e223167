//! Tabular Bench - Main Entry Point

use clap::Parser;
use tabular_bench::cli::{cmd_cross_validate, cmd_holdout, cmd_info, cmd_strategies, Cli, Commands};
use tabular_bench::BenchError;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tabular_bench=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::CrossValidate { args, folds, parallel } => cmd_cross_validate(&args, folds, parallel),
        Commands::Holdout { args, export_train, export_holdout } => {
            cmd_holdout(&args, export_train, export_holdout)
        }
        Commands::Info { data } => cmd_info(&data),
        Commands::Strategies => cmd_strategies(),
    };

    if let Err(err) = &result {
        if err.downcast_ref::<BenchError>().is_some_and(BenchError::is_fatal) {
            tracing::error!(error = %err, "Input rejected before any strategy ran");
        }
    }

    result
}
