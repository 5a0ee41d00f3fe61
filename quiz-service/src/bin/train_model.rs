use anyhow::Context;
use clap::Parser;
use hitflop_core::{TrainingConfig, train_and_save};
use std::path::PathBuf;
use tracing::{Level, info};

/// Fit the hit/flop classifier from the movie CSV and write the model artifacts
#[derive(Debug, Parser)]
#[command(name = "train_model")]
struct Args {
    /// Movie catalog CSV
    #[arg(long, default_value = "data/moviesDb.csv")]
    data: PathBuf,

    /// Directory receiving the model and column-schema artifacts
    #[arg(long, default_value = "models")]
    models_dir: PathBuf,

    /// Inverse regularization strength
    #[arg(long, default_value_t = 1000.0)]
    c: f64,

    #[arg(long, default_value_t = 1000)]
    max_iter: usize,

    #[arg(long, default_value_t = 1e-4)]
    tol: f64,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .compact()
        .init();

    let args = Args::parse();
    let config = TrainingConfig {
        c: args.c,
        max_iter: args.max_iter,
        tol: args.tol,
    };

    let report = train_and_save(&args.data, &args.models_dir, &config).with_context(|| {
        format!(
            "training from {} into {} failed",
            args.data.display(),
            args.models_dir.display()
        )
    })?;

    info!(
        samples = report.samples,
        skipped = report.skipped,
        features = report.features,
        iterations = report.iterations,
        accuracy = report.accuracy,
        "Model written to {}",
        args.models_dir.display()
    );
    Ok(())
}
