use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

use crate::catalog::{Movie, Outcome};
use crate::classifier::LogisticRegression;
use crate::error::{QuizError, Result};
use crate::features::FeatureSchema;

pub const MODEL_FILE: &str = "logistic_regression_model.json";
pub const COLUMNS_FILE: &str = "model_columns.json";

/// Classifier output for a single movie
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub outcome: Outcome,
    pub hit_probability: f64,
}

impl Prediction {
    /// Probability of a hit as a whole-number percentage
    pub fn confidence_percent(&self) -> u32 {
        // Halves go to the even neighbour: 12.5% reads as 12%.
        (self.hit_probability.clamp(0.0, 1.0) * 100.0).round_ties_even() as u32
    }
}

/// A fitted classifier together with the column schema it was trained on.
/// The two are only ever written and read as a pair.
#[derive(Debug, Clone)]
pub struct ModelArtifacts {
    model: LogisticRegression,
    schema: FeatureSchema,
}

impl ModelArtifacts {
    pub fn new(model: LogisticRegression, schema: FeatureSchema) -> Result<Self> {
        let width = model.validated_width()?;
        if width != schema.len() {
            return Err(QuizError::SchemaMismatch {
                model: width,
                schema: schema.len(),
            });
        }
        Ok(Self { model, schema })
    }

    /// Load both artifacts from `dir` using the default file names
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        Self::load_from(dir.join(MODEL_FILE), dir.join(COLUMNS_FILE))
    }

    pub fn load_from(model_path: impl AsRef<Path>, columns_path: impl AsRef<Path>) -> Result<Self> {
        let model_path = model_path.as_ref();
        let columns_path = columns_path.as_ref();

        info!("Loading model from {}", model_path.display());
        let model: LogisticRegression = serde_json::from_slice(&fs::read(model_path)?)?;

        info!("Loading model columns from {}", columns_path.display());
        let schema: FeatureSchema = serde_json::from_slice(&fs::read(columns_path)?)?;

        Self::new(model, schema)
    }

    /// Write both artifacts into `dir`, creating it if needed
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let model_path = dir.join(MODEL_FILE);
        info!("Saving trained model to {}", model_path.display());
        fs::write(&model_path, serde_json::to_vec_pretty(&self.model)?)?;

        let columns_path = dir.join(COLUMNS_FILE);
        info!("Saving model columns to {}", columns_path.display());
        fs::write(&columns_path, serde_json::to_vec_pretty(&self.schema)?)?;

        Ok(())
    }

    pub fn model(&self) -> &LogisticRegression {
        &self.model
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Encode `movie` against the stored schema and run the classifier on it
    pub fn predict_movie(&self, movie: &Movie) -> Result<Prediction> {
        let row = self.schema.encode(movie)?;
        let predicted = self.model.predict(&row)?;
        let [_, hit_probability] = self.model.predict_proba(&row)?;
        Ok(Prediction {
            outcome: Outcome::from(predicted),
            hit_probability,
        })
    }
}
