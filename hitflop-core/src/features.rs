//! One-hot encoding of movie predictors and alignment to a stored column schema.
//!
//! The classifier only understands a fixed-width vector whose layout was decided
//! at training time. [`FeatureSchema`] keeps that layout as an ordered list of
//! column names plus a name → slot map, so aligning an encoded movie is a
//! zero-fill followed by one lookup per encoded column.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use crate::catalog::{CategoricalColumn, Movie, NumericColumn};
use crate::error::{QuizError, Result};

/// Name of the dummy column for `value` of a categorical predictor, e.g. `genre_Action`
pub fn dummy_column(column: CategoricalColumn, value: &str) -> String {
    format!("{}_{}", column.header(), value)
}

/// Encode one movie as `(column name, value)` pairs: the numeric predictors
/// followed by one active dummy per categorical predictor.
///
/// Fails when a numeric predictor has no value for this row.
pub fn encode_movie(movie: &Movie) -> Result<Vec<(String, f64)>> {
    let mut encoded = Vec::with_capacity(NumericColumn::ALL.len() + CategoricalColumn::ALL.len());

    for column in NumericColumn::ALL {
        let value = movie.numeric(column).ok_or_else(|| {
            QuizError::Feature(format!(
                "movie {} has no value for '{}'",
                movie.id,
                column.header()
            ))
        })?;
        encoded.push((column.header().to_string(), value));
    }

    for column in CategoricalColumn::ALL {
        encoded.push((dummy_column(column, movie.categorical(column)), 1.0));
    }

    Ok(encoded)
}

/// Ordered feature columns the classifier was trained on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct FeatureSchema {
    columns: Vec<String>,
    slots: HashMap<String, usize>,
}

impl FeatureSchema {
    pub fn new(columns: Vec<String>) -> Self {
        let slots = columns
            .iter()
            .enumerate()
            .map(|(slot, name)| (name.clone(), slot))
            .collect();
        Self { columns, slots }
    }

    /// Build the training-time layout: numeric predictors first, then the
    /// dummies of each categorical predictor sorted by value.
    pub fn from_movies<'a>(movies: impl IntoIterator<Item = &'a Movie>) -> Self {
        let mut values: HashMap<CategoricalColumn, BTreeSet<&str>> = HashMap::new();
        for movie in movies {
            for column in CategoricalColumn::ALL {
                values
                    .entry(column)
                    .or_default()
                    .insert(movie.categorical(column));
            }
        }

        let numeric = NumericColumn::ALL.iter().map(|c| c.header().to_string());
        let dummies = CategoricalColumn::ALL.into_iter().flat_map(|column| {
            values
                .get(&column)
                .into_iter()
                .flatten()
                .map(move |value| dummy_column(column, value))
                .collect::<Vec<_>>()
        });

        Self::new(numeric.chain(dummies).collect())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn slot(&self, column: &str) -> Option<usize> {
        self.slots.get(column).copied()
    }

    /// Reindex encoded pairs onto the schema. Schema columns without a value
    /// stay zero; encoded columns unknown to the schema are dropped.
    pub fn align(&self, encoded: &[(String, f64)]) -> Vec<f64> {
        let mut row = vec![0.0; self.columns.len()];
        for (name, value) in encoded {
            if let Some(slot) = self.slot(name) {
                row[slot] = *value;
            }
        }
        row
    }

    /// Encode and align a movie in one step
    pub fn encode(&self, movie: &Movie) -> Result<Vec<f64>> {
        Ok(self.align(&encode_movie(movie)?))
    }
}

impl From<Vec<String>> for FeatureSchema {
    fn from(columns: Vec<String>) -> Self {
        Self::new(columns)
    }
}

impl From<FeatureSchema> for Vec<String> {
    fn from(schema: FeatureSchema) -> Self {
        schema.columns
    }
}
