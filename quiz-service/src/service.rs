use axum::{
    Router,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{HeaderValue, Request},
    middleware::{Next, from_fn},
    response::Json,
    routing::{get, post},
};
use hitflop_core::MovieFilter;
use serde_json::{Value, json};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{Instrument, info, warn};
use uuid::Uuid;

use crate::{
    config::ServiceConfig,
    error::{ApiError, ApiResult},
    models::{FilterOptions, GuessResponse, QuizMovie, SubmitGuessRequest},
    quiz,
    state::AppState,
};

const CORRELATION_HEADER: &str = "x-correlation-id";

pub fn create_app(config: &ServiceConfig) -> Router {
    build_router(AppState::from_config(config))
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/quiz/filter-options", get(get_filter_options))
        .route("/api/quiz/next-movie", get(get_next_movie))
        .route("/api/quiz/submit-guess", post(submit_guess))
        .layer(
            ServiceBuilder::new()
                .layer(from_fn(correlation_id_middleware))
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(app_state)
}

/// Tag every request with a correlation id and run it inside a span carrying it
async fn correlation_id_middleware(
    mut request: Request<axum::body::Body>,
    next: Next,
) -> axum::response::Response {
    let correlation_id = Uuid::new_v4().to_string();
    let header = HeaderValue::from_str(&correlation_id).ok();

    if let Some(value) = &header {
        request.headers_mut().insert(CORRELATION_HEADER, value.clone());
    }

    let span = tracing::info_span!("http_request", correlation_id = %correlation_id);
    let mut response = next.run(request).instrument(span).await;

    if let Some(value) = header {
        response.headers_mut().insert(CORRELATION_HEADER, value);
    }
    response
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn get_filter_options(State(state): State<AppState>) -> ApiResult<FilterOptions> {
    let options = quiz::filter_options(&state.context)?;
    Ok(Json(options))
}

async fn get_next_movie(
    State(state): State<AppState>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> ApiResult<QuizMovie> {
    let Query(pairs) = query.map_err(|rejection| {
        warn!("Rejected next-movie query: {}", rejection);
        ApiError::BadRequest("Invalid query parameters".into())
    })?;
    let filter = MovieFilter::from_query_pairs(pairs);
    info!(?filter, "Picking next quiz movie");
    let movie = quiz::next_movie(&state.context, &filter, state.posters.as_ref()).await?;
    Ok(Json(movie))
}

async fn submit_guess(
    State(state): State<AppState>,
    payload: Result<Json<SubmitGuessRequest>, JsonRejection>,
) -> ApiResult<GuessResponse> {
    // An unreadable body is treated like one with the fields missing.
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!("Rejected submit-guess body: {}", rejection);
            SubmitGuessRequest::default()
        }
    };

    let response = quiz::submit_guess(&state.context, request)?;
    Ok(Json(response))
}
