//! Offline training: catalog in, fitted model and column schema out.

use std::path::Path;
use tracing::{info, warn};

use crate::artifacts::ModelArtifacts;
use crate::catalog::{CategoricalColumn, Catalog, Movie, NumericColumn};
use crate::classifier::LogisticRegression;
use crate::error::{QuizError, Result};
use crate::features::FeatureSchema;

#[derive(Debug, Clone)]
pub struct TrainingConfig {
    /// Inverse regularization strength
    pub c: f64,
    pub max_iter: usize,
    pub tol: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            c: 1000.0,
            max_iter: 1000,
            tol: 1e-4,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub samples: usize,
    pub skipped: usize,
    pub features: usize,
    pub iterations: usize,
    pub accuracy: f64,
}

/// Fit a classifier on every catalog row that has all numeric predictors and a label
pub fn train(catalog: &Catalog, config: &TrainingConfig) -> Result<(ModelArtifacts, TrainingReport)> {
    let missing = catalog.missing_predictors();
    if !missing.is_empty() {
        return Err(QuizError::MissingColumn(missing.join(", ")));
    }
    if !catalog.has_success_column() {
        return Err(QuizError::MissingColumn("success".into()));
    }

    for column in CategoricalColumn::ALL {
        let filled = catalog.filled_unknown(column);
        if filled > 0 {
            warn!(
                "{} missing values in categorical column '{}' were filled with 'Unknown'",
                filled,
                column.header()
            );
        }
    }

    let usable: Vec<&Movie> = catalog
        .movies()
        .iter()
        .filter(|m| m.success.is_some() && NumericColumn::ALL.iter().all(|c| m.numeric(*c).is_some()))
        .collect();
    let skipped = catalog.len() - usable.len();
    if skipped > 0 {
        warn!(
            "Skipping {} rows with a missing numeric predictor or success label",
            skipped
        );
    }

    let schema = FeatureSchema::from_movies(usable.iter().copied());
    let x = usable
        .iter()
        .map(|m| schema.encode(m))
        .collect::<Result<Vec<_>>>()?;
    let y: Vec<bool> = usable.iter().filter_map(|m| m.success).collect();

    info!(
        "Training logistic regression on {} rows x {} features with C={}, max_iter={}",
        x.len(),
        schema.len(),
        config.c,
        config.max_iter
    );
    let mut model = LogisticRegression::new()
        .with_c(config.c)
        .with_max_iter(config.max_iter)
        .with_tolerance(config.tol);
    model.fit(&x, &y)?;

    let report = TrainingReport {
        samples: x.len(),
        skipped,
        features: schema.len(),
        iterations: model.n_iter(),
        accuracy: model.score(&x, &y)?,
    };
    info!(
        "Training finished after {} iterations, training accuracy {:.3}",
        report.iterations, report.accuracy
    );

    Ok((ModelArtifacts::new(model, schema)?, report))
}

/// Load the CSV, fit, and overwrite the two artifacts in `models_dir`
pub fn train_and_save(
    data_path: impl AsRef<Path>,
    models_dir: impl AsRef<Path>,
    config: &TrainingConfig,
) -> Result<TrainingReport> {
    let catalog = Catalog::load(data_path)?;
    let (artifacts, report) = train(&catalog, config)?;
    artifacts.save(models_dir)?;
    info!("Model training and saving complete");
    Ok(report)
}
