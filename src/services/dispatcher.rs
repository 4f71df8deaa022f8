//! Fan-out of downstream actions after an order exists.
//!
//! Each action runs independently: a failing email never stops the ERP
//! sync, and nothing here ever rolls the order back. Outcomes are captured
//! as values and reported in a single structured log entry keyed by the
//! order id; none of them is persisted onto the order.

use crate::email::EmailClient;
use crate::entities::{order, order_line};
use crate::erp::{ErpClient, ErpError};
use crate::services::inventory::InventoryService;
use std::fmt;
use tracing::{info, instrument, warn};

/// What happened to one side effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SideEffectOutcome {
    Succeeded,
    /// Preconditions not met; deliberately not attempted. Routine, not an
    /// error — many orders legitimately lack ERP readiness.
    Skipped(String),
    Failed(String),
}

impl fmt::Display for SideEffectOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SideEffectOutcome::Succeeded => write!(f, "succeeded"),
            SideEffectOutcome::Skipped(reason) => write!(f, "skipped: {}", reason),
            SideEffectOutcome::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// Aggregated result of one dispatch run.
#[derive(Debug, Clone)]
pub struct SideEffectReport {
    pub inventory: SideEffectOutcome,
    pub email: SideEffectOutcome,
    pub erp: SideEffectOutcome,
}

/// Runs the three downstream actions for a created order.
#[derive(Clone)]
pub struct SideEffectDispatcher {
    inventory: InventoryService,
    email: Option<EmailClient>,
    erp: Option<ErpClient>,
}

impl SideEffectDispatcher {
    pub fn new(
        inventory: InventoryService,
        email: Option<EmailClient>,
        erp: Option<ErpClient>,
    ) -> Self {
        Self {
            inventory,
            email,
            erp,
        }
    }

    /// Dispatches all side effects. None of them depends on another's
    /// result, so they run concurrently.
    #[instrument(skip(self, order, lines), fields(order_id = %order.id))]
    pub async fn dispatch(
        &self,
        order: &order::Model,
        lines: &[order_line::Model],
    ) -> SideEffectReport {
        let (inventory, email, erp) = tokio::join!(
            self.confirm_inventory(order),
            self.send_email(order, lines),
            self.sync_erp(order, lines),
        );

        let report = SideEffectReport {
            inventory,
            email,
            erp,
        };

        info!(
            order_id = %order.id,
            inventory = %report.inventory,
            email = %report.email,
            erp = %report.erp,
            "side effects dispatched"
        );
        report
    }

    async fn confirm_inventory(&self, order: &order::Model) -> SideEffectOutcome {
        match self
            .inventory
            .confirm_reservations(&order.payment_reference)
            .await
        {
            Ok(_) => SideEffectOutcome::Succeeded,
            Err(err) => {
                warn!(order_id = %order.id, error = %err, "inventory confirmation failed");
                SideEffectOutcome::Failed(err.to_string())
            }
        }
    }

    async fn send_email(
        &self,
        order: &order::Model,
        lines: &[order_line::Model],
    ) -> SideEffectOutcome {
        let Some(email) = &self.email else {
            return SideEffectOutcome::Skipped("email integration not configured".to_string());
        };

        match email.send_order_confirmation(order, lines).await {
            Ok(()) => SideEffectOutcome::Succeeded,
            Err(err) => {
                warn!(order_id = %order.id, error = %err, "confirmation email failed");
                SideEffectOutcome::Failed(err.to_string())
            }
        }
    }

    async fn sync_erp(
        &self,
        order: &order::Model,
        lines: &[order_line::Model],
    ) -> SideEffectOutcome {
        let Some(erp) = &self.erp else {
            return SideEffectOutcome::Skipped("ERP integration not configured".to_string());
        };

        // The ERP requires a shippable address; orders without one are
        // expected and skipped with a diagnostic naming the gap.
        if let Some(missing) = missing_erp_address_field(order) {
            return SideEffectOutcome::Skipped(format!(
                "shipping address missing {missing}, ERP sync not attempted"
            ));
        }

        match erp.sync_order(order, lines).await {
            Ok(sale) => {
                info!(order_id = %order.id, sale_number = %sale.sale_number, "ERP sale created");
                SideEffectOutcome::Succeeded
            }
            Err(ErpError::NotConfigured) => {
                SideEffectOutcome::Skipped("ERP integration not configured".to_string())
            }
            Err(err) => {
                warn!(order_id = %order.id, error = %err, "ERP sync failed");
                SideEffectOutcome::Failed(err.to_string())
            }
        }
    }
}

/// ERP sync needs at minimum postal code, city and state.
fn missing_erp_address_field(order: &order::Model) -> Option<&'static str> {
    fn blank(field: &Option<String>) -> bool {
        field.as_deref().map_or(true, |v| v.trim().is_empty())
    }

    if blank(&order.ship_postal_code) {
        Some("postal code")
    } else if blank(&order.ship_city) {
        Some("city")
    } else if blank(&order.ship_state) {
        Some("state")
    } else {
        None
    }
}
