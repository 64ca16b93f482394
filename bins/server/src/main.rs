//! Quill API Server
//!
//! Main entry point for the Quill backend service.

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quill_api::{AppState, create_router};
use quill_db::connect;
use quill_shared::{AppConfig, payment::HttpPaymentGateway};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quill=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = AppConfig::load().expect("Failed to load configuration");

    // Connect to database
    let db = connect(&config.database.url).await?;
    info!("Connected to database");

    // Create payment gateway
    let payment = HttpPaymentGateway::new(&config.billing.payment)
        .map_err(|e| anyhow::anyhow!("Failed to build payment gateway: {e}"))?;
    info!(
        base_url = %config.billing.payment.base_url,
        timeout_secs = config.billing.payment.timeout_secs,
        "Payment gateway configured"
    );

    // Create application state
    let state = AppState {
        db: Arc::new(db),
        balance_tolerance: config.ledger.balance_tolerance,
        service_token_sha256: config.billing.service_token_sha256.clone(),
        payment: Arc::new(payment),
        merchant_id: config.billing.payment.merchant_id.clone(),
    };

    // Create router
    let app = create_router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
