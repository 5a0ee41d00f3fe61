use hitflop_core::{Catalog, ModelArtifacts};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::ServiceConfig;
use crate::error::ApiError;
use crate::poster::{PosterSource, TmdbClient};

/// Everything loaded at startup. Never mutated afterwards, so handlers share
/// it without locking.
#[derive(Debug, Default)]
pub struct QuizContext {
    catalog: Option<Catalog>,
    artifacts: Option<ModelArtifacts>,
}

impl QuizContext {
    pub fn new(catalog: Option<Catalog>, artifacts: Option<ModelArtifacts>) -> Self {
        Self { catalog, artifacts }
    }

    /// Load catalog and model artifacts, degrading instead of failing when
    /// either is missing
    pub fn load(config: &ServiceConfig) -> Self {
        let catalog = match Catalog::load(&config.data_path) {
            Ok(catalog) => Some(catalog),
            Err(e) => {
                error!(
                    "Movie data could not be loaded from {}: {}",
                    config.data_path.display(),
                    e
                );
                None
            }
        };

        let artifacts = match ModelArtifacts::load(&config.models_dir) {
            Ok(artifacts) => {
                info!(
                    "Model loaded with {} feature columns",
                    artifacts.schema().len()
                );
                Some(artifacts)
            }
            Err(e) => {
                error!(
                    "Model artifacts could not be loaded from {}: {}",
                    config.models_dir.display(),
                    e
                );
                None
            }
        };

        Self::new(catalog, artifacts)
    }

    /// The catalog, or `DataUnavailable` when it is missing or empty
    pub fn catalog(&self) -> Result<&Catalog, ApiError> {
        self.catalog
            .as_ref()
            .filter(|c| !c.is_empty())
            .ok_or_else(|| ApiError::DataUnavailable("Movie data not available".into()))
    }

    pub fn artifacts(&self) -> Option<&ModelArtifacts> {
        self.artifacts.as_ref()
    }
}

#[derive(Clone)]
pub struct AppState {
    pub context: Arc<QuizContext>,
    pub posters: Arc<dyn PosterSource>,
}

impl AppState {
    pub fn new(context: QuizContext, posters: Arc<dyn PosterSource>) -> Self {
        Self {
            context: Arc::new(context),
            posters,
        }
    }

    pub fn from_config(config: &ServiceConfig) -> Self {
        let tmdb = TmdbClient::new(config.tmdb_base_url.clone(), config.tmdb_api_key.clone());
        if !tmdb.has_api_key() {
            warn!("TMDB_API_KEY not found in environment. Poster fetching will be skipped.");
        }
        Self::new(QuizContext::load(config), Arc::new(tmdb))
    }
}
