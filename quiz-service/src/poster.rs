use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

/// Outcome of a best-effort poster lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PosterLookup {
    Found(String),
    Unavailable,
}

impl PosterLookup {
    pub fn into_option(self) -> Option<String> {
        match self {
            PosterLookup::Found(path) => Some(path),
            PosterLookup::Unavailable => None,
        }
    }
}

/// Anything that can resolve a movie id to a poster path
#[async_trait]
pub trait PosterSource: Send + Sync {
    /// Never fails: every error collapses to [`PosterLookup::Unavailable`]
    async fn poster_path(&self, movie_id: i64) -> PosterLookup;
}

#[derive(Debug, Deserialize)]
struct TmdbMovieDetails {
    poster_path: Option<String>,
}

/// TMDB `/movie/{id}` client
pub struct TmdbClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl TmdbClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    async fn fetch_details(&self, api_key: &str, movie_id: i64) -> anyhow::Result<TmdbMovieDetails> {
        let url = format!("{}/movie/{}", self.base_url, movie_id);
        let details = self
            .client
            .get(&url)
            .query(&[("api_key", api_key)])
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("TMDB request failed: {}", e))?
            .error_for_status()
            .map_err(|e| anyhow::anyhow!("TMDB returned an error status: {}", e))?
            .json::<TmdbMovieDetails>()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to parse TMDB response: {}", e))?;
        Ok(details)
    }
}

#[async_trait]
impl PosterSource for TmdbClient {
    async fn poster_path(&self, movie_id: i64) -> PosterLookup {
        let Some(api_key) = self.api_key.as_deref() else {
            return PosterLookup::Unavailable;
        };

        match self.fetch_details(api_key, movie_id).await {
            Ok(TmdbMovieDetails {
                poster_path: Some(path),
            }) if !path.is_empty() => PosterLookup::Found(path),
            Ok(_) => PosterLookup::Unavailable,
            Err(e) => {
                warn!(movie_id, "Error fetching movie details from TMDB: {}", e);
                PosterLookup::Unavailable
            }
        }
    }
}
