use std::sync::{Arc, Mutex};

use tracing_subscriber::EnvFilter;

use salon_booking::config::AppConfig;
use salon_booking::db;
use salon_booking::handlers;
use salon_booking::services::gateway::razorpay::RazorpayGateway;
use salon_booking::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    anyhow::ensure!(
        !config.gateway_key_id.is_empty() && !config.gateway_key_secret.is_empty(),
        "GATEWAY_KEY_ID and GATEWAY_KEY_SECRET must be set"
    );
    anyhow::ensure!(config.advance_amount > 0, "ADVANCE_AMOUNT must be positive");
    if config.admin_token == "changeme" {
        tracing::warn!("ADMIN_TOKEN is the default value, set it before exposing the server");
    }

    let conn = db::init_db(&config.database_url)?;

    tracing::info!("using payment gateway at {}", config.gateway_url);
    let gateway = RazorpayGateway::new(
        config.gateway_url.clone(),
        config.gateway_key_id.clone(),
        config.gateway_key_secret.clone(),
    );

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: config.clone(),
        gateway: Box::new(gateway),
    });

    let app = handlers::router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
