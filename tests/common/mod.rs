// Shared by the integration test binaries; not every binary uses every
// helper.
#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Method, Request, Response},
    Router,
};
use checkout_api::{
    config::AppConfig,
    db,
    services::checkout::CheckoutService,
    services::dispatcher::SideEffectDispatcher,
    services::inventory::InventoryService,
    services::orders::OrderService,
    services::webhook::WebhookProcessor,
    AppState,
};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

/// Test harness: application state backed by a throwaway SQLite database,
/// with the gateway pointed wherever the test wants (usually a wiremock
/// server).
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    db_path: std::path::PathBuf,
}

impl TestApp {
    pub async fn new() -> Self {
        // Unroutable gateway; tests that need one override it.
        Self::with_gateway_url("http://127.0.0.1:1").await
    }

    pub async fn with_gateway_url(gateway_url: &str) -> Self {
        let db_path = std::env::temp_dir().join(format!("checkout-test-{}.db", Uuid::new_v4()));
        let database_url = format!("sqlite://{}?mode=rwc", db_path.display());

        let mut cfg = AppConfig::new(
            database_url,
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.gateway.base_url = gateway_url.to_string();

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db = Arc::new(pool);
        let orders = OrderService::new(db.clone());
        let inventory = InventoryService::new(db.clone());
        let dispatcher = Arc::new(SideEffectDispatcher::new(inventory, None, None));
        let gateway = checkout_api::gateway::PaymentGatewayClient::new(&cfg.gateway);

        let state = AppState {
            db,
            config: cfg.clone(),
            orders: orders.clone(),
            checkout: CheckoutService::new(orders.clone(), gateway, dispatcher.clone()),
            webhooks: WebhookProcessor::new(orders, dispatcher),
        };

        let router = checkout_api::handlers::router(state.clone());

        Self {
            router,
            state,
            db_path,
        }
    }

    /// Issues a request against the in-process router.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(path);
        let request = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                builder.body(Body::from(json.to_string())).unwrap()
            }
            None => builder.body(Body::empty()).unwrap(),
        };

        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router request failed")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.db_path);
    }
}

pub async fn response_json(response: Response<Body>) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}
