use std::{net::SocketAddr, sync::Arc};

use axum::http::Method;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

use checkout_api as api;
use api::erp::{DbTokenStore, ErpClient};
use api::services::checkout::CheckoutService;
use api::services::dispatcher::SideEffectDispatcher;
use api::services::inventory::InventoryService;
use api::services::orders::OrderService;
use api::services::webhook::WebhookProcessor;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = api::config::load_config()?;
    api::config::init_tracing(cfg.log_level(), cfg.log_json);

    let db = Arc::new(api::db::establish_connection_from_app_config(&cfg).await?);
    if cfg.auto_migrate {
        api::db::run_migrations(&db).await?;
    }

    let orders = OrderService::new(db.clone());
    let inventory = InventoryService::new(db.clone());

    let email = match &cfg.email {
        Some(email_cfg) => match api::email::EmailClient::new(email_cfg, &cfg.site_base_url) {
            Ok(client) => Some(client),
            Err(err) => {
                warn!(error = %err, "email client unavailable, notifications disabled");
                None
            }
        },
        None => {
            info!("email integration not configured; confirmation emails disabled");
            None
        }
    };

    let erp = if cfg.erp_configured() {
        cfg.erp
            .clone()
            .map(|erp_cfg| ErpClient::new(erp_cfg, Arc::new(DbTokenStore::new(db.clone()))))
    } else {
        info!("ERP integration not configured; order sync disabled");
        None
    };

    let dispatcher = Arc::new(SideEffectDispatcher::new(inventory, email, erp));
    let gateway = api::gateway::PaymentGatewayClient::new(&cfg.gateway);

    let state = api::AppState {
        db: db.clone(),
        config: cfg.clone(),
        orders: orders.clone(),
        checkout: CheckoutService::new(orders.clone(), gateway, dispatcher.clone()),
        webhooks: WebhookProcessor::new(orders, dispatcher),
    };

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
        .allow_origin(Any);

    let app = api::handlers::router(state)
        .merge(api::openapi::swagger())
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr: SocketAddr = format!("{}:{}", cfg.host, cfg.port).parse()?;
    info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
}
