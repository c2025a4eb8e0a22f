mod handlers;
mod routes;
mod metrics;

use std::sync::Arc;
use testforge_common::Config;
use tokio::net::TcpListener;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub start_time: Arc<std::time::Instant>,
}

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
        )
        .with_target(false)
        .init();

    info!("testforge API booting...");

    metrics::init_metrics();
    info!("Metrics registry initialized");

    let config = Config::from_env();
    info!(
        max_upload_bytes = config.max_upload_bytes,
        default_format = %config.default_format,
        "Loaded configuration"
    );

    let addr = config.bind_addr();
    let state = Arc::new(AppState {
        config,
        start_time: Arc::new(std::time::Instant::now()),
    });

    let app = routes::app(state);

    let listener = TcpListener::bind(&addr).await
        .expect("Failed to bind to address");

    info!("HTTP server listening on {}", addr);

    axum::serve(listener, app).await
        .expect("Server error");
}
