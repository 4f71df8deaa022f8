//! Webhook-driven order reconciliation.
//!
//! The payment processor delivers confirmation events at-least-once; this
//! pipeline turns each confirmed payment into exactly one persisted order.
//! De-duplication rests on the idempotency pre-check plus the unique index
//! on the payment reference — a delivery that loses the insert race is
//! acknowledged exactly like a replay.

use crate::{
    errors::ServiceError,
    services::dispatcher::SideEffectDispatcher,
    services::orders::{NewOrder, NewOrderLine, OrderService},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// The only event type that triggers processing.
const PAYMENT_CONFIRMED_TYPE: &str = "order.paid";

/// Cart entries that represent freight or discounts rather than products.
const PSEUDO_ITEM_CODES: [&str; 2] = ["shipping", "pix_discount"];

/// Inbound event, parsed defensively: every payload field is optional and
/// unknown event types collapse into [`WebhookEvent::Ignored`].
#[derive(Debug)]
pub enum WebhookEvent {
    OrderPaid(OrderPaidData),
    Ignored { event_type: Option<String> },
}

impl WebhookEvent {
    pub fn parse(payload: &Value) -> Self {
        let event_type = payload
            .get("type")
            .and_then(|v| v.as_str())
            .map(String::from);

        if event_type.as_deref() != Some(PAYMENT_CONFIRMED_TYPE) {
            return WebhookEvent::Ignored { event_type };
        }

        let data = payload
            .get("data")
            .cloned()
            .and_then(|data| serde_json::from_value::<OrderPaidData>(data).ok())
            .unwrap_or_default();

        WebhookEvent::OrderPaid(data)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct OrderPaidData {
    /// The processor's transaction id — the external payment reference
    pub id: Option<String>,
    /// Total in minor units
    pub amount: Option<i64>,
    pub status: Option<String>,
    #[serde(default)]
    pub items: Vec<PaidItem>,
    pub customer: Option<PaidCustomer>,
    pub shipping: Option<PaidShipping>,
    pub metadata: Option<PaidMetadata>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PaidItem {
    pub id: Option<Value>,
    pub code: Option<String>,
    pub description: Option<String>,
    /// Line total in minor units
    pub amount: Option<i64>,
    pub quantity: Option<i64>,
}

impl PaidItem {
    fn is_pseudo(&self) -> bool {
        self.code
            .as_deref()
            .is_some_and(|code| PSEUDO_ITEM_CODES.contains(&code))
    }

    fn product_id(&self) -> Option<String> {
        self.code.clone().or_else(|| {
            self.id.as_ref().map(|id| match id {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
        })
    }

    /// `line total / 100 / quantity`; a zero quantity prices at zero
    /// instead of dividing by it.
    fn unit_price(&self) -> Decimal {
        let quantity = self.quantity.unwrap_or(0);
        if quantity == 0 {
            return Decimal::ZERO;
        }
        let total = Decimal::from(self.amount.unwrap_or(0)) / Decimal::from(100);
        total / Decimal::from(quantity)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PaidCustomer {
    pub name: Option<String>,
    pub email: Option<String>,
    pub document: Option<String>,
    /// Shape varies by processor version: a bare string or a nested
    /// object. Extracted leniently, degrading to none.
    pub phone: Option<Value>,
    pub address: Option<PaidAddress>,
}

impl PaidCustomer {
    fn phone_string(&self) -> Option<String> {
        match self.phone.as_ref()? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Object(obj) => {
                let nested = obj
                    .get("mobile_phone")
                    .or_else(|| obj.get("home_phone"))
                    .and_then(|v| v.as_object())?;
                let area = nested.get("area_code").and_then(|v| v.as_str())?;
                let number = nested.get("number").and_then(|v| v.as_str())?;
                Some(format!("{}{}", area, number))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PaidShipping {
    pub address: Option<PaidAddress>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PaidAddress {
    #[serde(alias = "line_1")]
    pub street: Option<String>,
    pub number: Option<String>,
    pub complement: Option<String>,
    pub neighborhood: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    #[serde(alias = "zip_code")]
    pub postal_code: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PaidMetadata {
    pub customer_email: Option<String>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub user_id: Option<String>,
}

/// How a delivery was resolved. Every variant except a hard error is
/// acknowledged with success so the processor stops redelivering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// Event type is not the confirmed-payment type
    Ignored,
    /// Confirmed payment without a payment identifier
    MissingPaymentId,
    /// An order for this payment reference already exists
    AlreadyProcessed,
    /// No resolvable customer email; retries cannot supply one
    MissingEmail,
    Created { order_id: Uuid },
}

/// Processes confirmed-payment events into orders and fans out the
/// downstream side effects.
#[derive(Clone)]
pub struct WebhookProcessor {
    orders: OrderService,
    dispatcher: Arc<SideEffectDispatcher>,
}

impl WebhookProcessor {
    pub fn new(orders: OrderService, dispatcher: Arc<SideEffectDispatcher>) -> Self {
        Self { orders, dispatcher }
    }

    /// Runs the reconciliation pipeline for one delivery.
    ///
    /// Order and line persistence is the critical path; side effects are
    /// spawned afterwards so a slow ERP or email call cannot push the
    /// webhook response past the processor's delivery timeout. An `Err`
    /// here means persistence failed in a way a retry might fix — the
    /// handler maps it to an error status to request redelivery.
    #[instrument(skip(self, event))]
    pub async fn process(&self, event: WebhookEvent) -> Result<WebhookOutcome, ServiceError> {
        let data = match event {
            WebhookEvent::Ignored { event_type } => {
                info!(?event_type, "ignoring webhook event type");
                return Ok(WebhookOutcome::Ignored);
            }
            WebhookEvent::OrderPaid(data) => data,
        };

        let Some(payment_reference) = data.id.clone().filter(|id| !id.is_empty()) else {
            warn!("confirmed-payment event without payment id, acknowledging");
            return Ok(WebhookOutcome::MissingPaymentId);
        };

        // Sole de-duplication mechanism; must precede any write.
        if self
            .orders
            .find_by_payment_reference(&payment_reference)
            .await?
            .is_some()
        {
            info!(%payment_reference, "order already exists, acknowledging redelivery");
            return Ok(WebhookOutcome::AlreadyProcessed);
        }

        let Some(customer_email) = resolve_email(&data) else {
            // Unrecoverable: redelivery carries the same payload.
            warn!(%payment_reference, "no resolvable customer email, acknowledging without order");
            return Ok(WebhookOutcome::MissingEmail);
        };

        let new_order = build_order(&data, &payment_reference, customer_email);
        let lines = build_lines(&data);

        let (order, lines) = match self.orders.create_with_lines(new_order, lines).await {
            Ok(created) => created,
            Err(ServiceError::AlreadyExists(_)) => {
                // Lost the insert race against a concurrent delivery.
                return Ok(WebhookOutcome::AlreadyProcessed);
            }
            Err(err) => return Err(err),
        };

        let order_id = order.id;
        let dispatcher = self.dispatcher.clone();
        tokio::spawn(async move {
            dispatcher.dispatch(&order, &lines).await;
        });

        info!(%order_id, %payment_reference, "order reconciled from webhook");
        Ok(WebhookOutcome::Created { order_id })
    }
}

/// Processor customer record first, checkout metadata fallback.
fn resolve_email(data: &OrderPaidData) -> Option<String> {
    data.customer
        .as_ref()
        .and_then(|c| c.email.clone())
        .or_else(|| {
            data.metadata
                .as_ref()
                .and_then(|m| m.customer_email.clone())
        })
        .filter(|email| !email.trim().is_empty())
}

/// Assembles the order row. Everything beyond reference, email and amount
/// is best-effort enrichment: the processor's shipping address is
/// preferred, then the customer's billing address, then nothing.
fn build_order(data: &OrderPaidData, payment_reference: &str, customer_email: String) -> NewOrder {
    let total_amount = Decimal::from(data.amount.unwrap_or(0)) / Decimal::from(100);

    let customer = data.customer.as_ref();
    let metadata = data.metadata.as_ref();

    let address = data
        .shipping
        .as_ref()
        .and_then(|s| s.address.as_ref())
        .or_else(|| customer.and_then(|c| c.address.as_ref()));

    NewOrder {
        payment_reference: payment_reference.to_string(),
        customer_email,
        user_id: metadata.and_then(|m| m.user_id.clone()),
        total_amount,
        customer_name: customer
            .and_then(|c| c.name.clone())
            .or_else(|| metadata.and_then(|m| m.customer_name.clone())),
        customer_phone: customer
            .and_then(|c| c.phone_string())
            .or_else(|| metadata.and_then(|m| m.customer_phone.clone())),
        customer_document: customer.and_then(|c| c.document.clone()),
        ship_street: address.and_then(|a| a.street.clone()),
        ship_number: address.and_then(|a| a.number.clone()),
        ship_complement: address.and_then(|a| a.complement.clone()),
        ship_neighborhood: address.and_then(|a| a.neighborhood.clone()),
        ship_city: address.and_then(|a| a.city.clone()),
        ship_state: address.and_then(|a| a.state.clone()),
        ship_postal_code: address.and_then(|a| a.postal_code.clone()),
    }
}

fn build_lines(data: &OrderPaidData) -> Vec<NewOrderLine> {
    data.items
        .iter()
        .filter(|item| !item.is_pseudo())
        .filter_map(|item| {
            let product_id = item.product_id()?;
            Some(NewOrderLine {
                name: item
                    .description
                    .clone()
                    .unwrap_or_else(|| product_id.clone()),
                product_id,
                quantity: item.quantity.unwrap_or(0) as i32,
                unit_price: item.unit_price(),
                image_url: None,
            })
        })
        .collect()
}
