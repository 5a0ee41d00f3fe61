pub mod config;
pub mod error;
pub mod models;
pub mod poster;
pub mod quiz;
pub mod service;
pub mod state;

#[cfg(test)]
mod test_support;

pub use config::ServiceConfig;
pub use error::{ApiError, ApiResult};
pub use models::*;
pub use poster::{PosterLookup, PosterSource, TmdbClient};
pub use service::{build_router, create_app};
pub use state::{AppState, QuizContext};
