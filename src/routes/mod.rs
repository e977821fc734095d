use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, create_response_headers_layer};
use crate::handlers::{checkout_summary, create_order, health_check, payment_status};
use crate::state::AppState;

pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/checkout/summary", post(checkout_summary))
        .route("/orders", post(create_order))
        .route("/orders/:order_id/payment", get(payment_status))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(create_response_headers_layer())
        .layer(create_cors_layer())
}
