use chatbot_relay::{config::RelayConfig, routes, state::AppState};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chatbot_relay=debug,tower_http=debug".into()),
        )
        .init();

    let config = RelayConfig::from_env();
    if config.api_key.is_none() {
        warn!("OPENROUTER_API_KEY is not set; /api/chat will answer 500");
    }

    let addr = format!("0.0.0.0:{}", config.port);
    let app = routes::create_router().with_state(AppState::shared(config));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Chat relay listening on http://{addr}/");

    axum::serve(listener, app).await?;
    Ok(())
}
