use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 5001;
pub const DEFAULT_DATA_PATH: &str = "data/moviesDb.csv";
pub const DEFAULT_MODELS_DIR: &str = "models";
pub const DEFAULT_TMDB_BASE_URL: &str = "https://api.themoviedb.org/3";

/// Configuration for the quiz service, read from the environment
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub port: u16,
    pub data_path: PathBuf,
    pub models_dir: PathBuf,
    pub tmdb_api_key: Option<String>,
    pub tmdb_base_url: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl ServiceConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let port = lookup("PORT")
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);

        Self {
            port,
            data_path: lookup("QUIZ_DATA_PATH")
                .unwrap_or_else(|| DEFAULT_DATA_PATH.to_string())
                .into(),
            models_dir: lookup("QUIZ_MODELS_DIR")
                .unwrap_or_else(|| DEFAULT_MODELS_DIR.to_string())
                .into(),
            tmdb_api_key: lookup("TMDB_API_KEY").filter(|k| !k.trim().is_empty()),
            tmdb_base_url: lookup("TMDB_BASE_URL")
                .unwrap_or_else(|| DEFAULT_TMDB_BASE_URL.to_string()),
        }
    }
}
