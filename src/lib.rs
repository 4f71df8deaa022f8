//! Checkout payment and order-reconciliation core.
//!
//! Accepts a cart and customer data, initiates payment with the external
//! processor (card or PIX), and produces exactly one persisted order per
//! payment — whether confirmation arrives synchronously or through the
//! processor's webhook — before fanning out to inventory confirmation,
//! customer email, and ERP synchronization.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod db;
pub mod email;
pub mod entities;
pub mod erp;
pub mod errors;
pub mod gateway;
pub mod handlers;
pub mod migrator;
pub mod openapi;
pub mod services;
pub mod validation;

use sea_orm::DatabaseConnection;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use services::checkout::CheckoutService;
use services::orders::OrderService;
use services::webhook::WebhookProcessor;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub orders: OrderService,
    pub checkout: CheckoutService,
    pub webhooks: WebhookProcessor,
}

/// Common success wrapper for API responses.
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
        }
    }
}

#[cfg(test)]
mod response_tests {
    use super::*;

    #[test]
    fn success_response_wraps_data() {
        let response = ApiResponse::success("ok");
        assert!(response.success);
        assert_eq!(response.data, Some("ok"));
        assert!(response.message.is_none());
    }

    #[test]
    fn error_response_carries_message() {
        let response = ApiResponse::<()>::error("oops".into());
        assert!(!response.success);
        assert_eq!(response.message.as_deref(), Some("oops"));
    }
}
