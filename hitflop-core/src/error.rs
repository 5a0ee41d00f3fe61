use thiserror::Error;

#[derive(Error, Debug)]
pub enum QuizError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Feature error: {0}")]
    Feature(String),

    #[error("Model is not fitted")]
    NotFitted,

    #[error("Training failed: {0}")]
    Training(String),

    #[error("Schema mismatch: model expects {model} features, schema has {schema} columns")]
    SchemaMismatch { model: usize, schema: usize },
}

pub type Result<T> = std::result::Result<T, QuizError>;
