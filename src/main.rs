use axum::Router;
use dotenvy::dotenv;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use agora_checkout::config::Config;
use agora_checkout::routes::create_routes;
use agora_checkout::state::AppState;

#[tokio::main]
async fn main() {
    dotenv().ok();
    let config = Config::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    let state = AppState::from_config(&config).expect("Failed to build checkout services");
    tracing::info!(
        ticketing_api = %config.ticketing_api_url,
        fallback_currency = %config.fallback_currency,
        "Checkout services ready"
    );

    let app: Router = create_routes(state);

    let addr = config.bind_addr;
    tracing::info!("🚀 Checkout API running at http://{}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .expect("Failed to bind address");

    axum::serve(listener, app).await.expect("Server failed");
}
