use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::AppState;
use grokdoc_core::AppConfig;

/// Main entry point for the GrokDoc server
///
/// Serves the REST API (with Swagger UI at `/swagger-ui`) on `GROKDOC_REST_ADDR`.
///
/// # Environment Variables
/// - `GROKDOC_REST_ADDR`: server address (default: "0.0.0.0:3000")
/// - `GROKDOC_FAST_PROVIDER` / `GROKDOC_FAST_MODEL`: conversational model (default: xai, grok-2-latest)
/// - `GROKDOC_ADVANCED_PROVIDER` / `GROKDOC_ADVANCED_MODEL`: diagnosis and plan model
///   (default: openai, o1-preview)
/// - `OPENAI_API_KEY`, `XAI_API_KEY`: keys for the selected providers
/// - `GOOGLE_MAPS_API_KEY`: facility search
///
/// # Errors
/// Returns an error if:
/// - the configuration is invalid or a required key is missing,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("grokdoc=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    let state = AppState::from_config(&config)?;

    tracing::info!(
        fast = %config.fast().model_id,
        advanced = %config.advanced().model_id,
        "++ Starting GrokDoc REST on {}",
        config.rest_addr()
    );

    let app = api_rest::router(state);
    let listener = tokio::net::TcpListener::bind(config.rest_addr()).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
