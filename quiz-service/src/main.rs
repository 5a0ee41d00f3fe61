use anyhow::Context;
use quiz_service::{ServiceConfig, create_app};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// JSON logs by default, `LOG_FORMAT=pretty` for local development
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "quiz_service=debug,hitflop_core=debug,tower_http=debug".into());

    match log_format.as_str() {
        "pretty" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_level(true),
                )
                .init();
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; real environment variables still apply.
    let dotenv = dotenvy::dotenv();
    init_tracing();
    if let Ok(path) = dotenv {
        info!("Loaded environment from {}", path.display());
    }

    let config = ServiceConfig::from_env();
    let app = create_app(&config);

    let listener = TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .with_context(|| format!("failed to bind port {}", config.port))?;
    let addr = listener.local_addr()?;

    info!("Movie quiz service running on http://{}", addr);
    info!("Available endpoints:");
    info!("  GET  /health                   - Health check");
    info!("  GET  /api/quiz/filter-options  - Genres, countries and certifications");
    info!("  GET  /api/quiz/next-movie      - Random movie, filterable by genre/country/certification");
    info!("  POST /api/quiz/submit-guess    - Score a Hit/Flop guess");

    axum::serve(listener, app).await?;

    Ok(())
}
