//! ERP (invoicing backend) sync client.
//!
//! Given an order and its lines, produces a sales record in the external
//! ERP with an attached customer contact. Owns the OAuth token lifecycle,
//! contact deduplication by tax document, and internal-to-external product
//! id mapping. Every step is single-attempt; callers needing resilience
//! wrap this client externally. A failure here never affects the order.

pub mod contacts;
pub mod products;
pub mod sales;
pub mod token;

use crate::config::ErpConfig;
use crate::entities::{order, order_line};
use sea_orm::error::DbErr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, instrument};

pub use contacts::ContactRef;
pub use products::ProductMap;
pub use token::{DbTokenStore, StoredToken, TokenStore};

#[derive(Debug, Error)]
pub enum ErpError {
    /// No OAuth credentials, stored token, or static token exists. Reported
    /// as a skip by the dispatcher, not a failure.
    #[error("ERP integration is not configured")]
    NotConfigured,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("ERP API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("token refresh failed: {0}")]
    TokenRefresh(String),

    #[error("could not resolve contact for document {document}: {reason}")]
    ContactResolution { document: String, reason: String },

    /// A cart product with no external mapping fails the whole sync with
    /// the offending product named.
    #[error("no ERP product mapping for '{0}'")]
    UnmappedProduct(String),

    #[error("database error: {0}")]
    Database(#[from] DbErr),
}

/// Outcome of a completed sync, for logging.
#[derive(Debug, Clone)]
pub struct ErpSaleRef {
    pub sale_id: String,
    pub sale_number: String,
    pub contact_id: String,
}

/// OAuth-token-managed HTTP client for the ERP API.
#[derive(Clone)]
pub struct ErpClient {
    http: reqwest::Client,
    config: ErpConfig,
    token_store: Arc<dyn TokenStore>,
    products: ProductMap,
}

impl ErpClient {
    pub fn new(config: ErpConfig, token_store: Arc<dyn TokenStore>) -> Self {
        let products = ProductMap::from_config(&config);
        Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(20))
                .build()
                .unwrap_or_default(),
            config,
            token_store,
            products,
        }
    }

    pub fn base_url(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    /// Full sync pipeline: token → contact → product mapping → sale.
    #[instrument(skip(self, order, lines), fields(order_id = %order.id))]
    pub async fn sync_order(
        &self,
        order: &order::Model,
        lines: &[order_line::Model],
    ) -> Result<ErpSaleRef, ErpError> {
        let access_token = self.access_token().await?;

        let contact = self.resolve_contact(&access_token, order).await?;

        let mapped = self.map_lines(lines)?;

        let sale = self
            .create_sale(&access_token, order, &contact, &mapped)
            .await?;

        info!(
            order_id = %order.id,
            sale_id = %sale.sale_id,
            sale_number = %sale.sale_number,
            "order synced to ERP"
        );
        Ok(sale)
    }

    fn map_lines(
        &self,
        lines: &[order_line::Model],
    ) -> Result<Vec<sales::MappedLine>, ErpError> {
        lines
            .iter()
            .map(|line| {
                let erp_product_id = self.products.resolve(&line.product_id)?;
                Ok(sales::MappedLine {
                    erp_product_id,
                    description: line.name.clone(),
                    quantity: line.quantity,
                    unit_price: line.unit_price,
                })
            })
            .collect()
    }
}
