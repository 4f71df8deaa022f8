pub mod checkout;
pub mod health;
pub mod orders;
pub mod webhooks;

use crate::AppState;
use axum::{
    routing::{get, post},
    Router,
};

/// Builds the `/api/v1` router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/v1/checkout", post(checkout::submit_checkout))
        .route("/api/v1/payments/webhook", post(webhooks::payment_webhook))
        .route(
            "/api/v1/orders/exists/:payment_reference",
            get(orders::order_exists),
        )
        .route("/api/v1/orders/:id", get(orders::get_order))
        .with_state(state)
}
