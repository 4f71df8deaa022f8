use crate::{
    errors::ServiceError,
    gateway::{
        CardData, GatewayCustomer, GatewayItem, GatewayMetadata, GatewayOrderRequest,
        GatewayPayment, PaymentGatewayClient, PixInstructions,
    },
    services::dispatcher::SideEffectDispatcher,
    services::orders::{NewOrder, NewOrderLine, OrderService},
    validation::{validate_cpf, validate_phone},
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

/// How long a PIX charge stays payable, in seconds.
const PIX_EXPIRES_IN_SECS: u64 = 3600;

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: String,
    pub name: String,
    /// Unit price in currency units (reais)
    pub price: Decimal,
    pub quantity: i32,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutAddress {
    pub street: String,
    pub number: String,
    #[serde(default)]
    pub complement: Option<String>,
    pub neighborhood: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutData {
    pub email: String,
    pub full_name: String,
    pub cpf: String,
    pub phone: String,
    pub address: CheckoutAddress,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CardInput {
    pub number: String,
    pub holder_name: String,
    pub exp_month: u8,
    pub exp_year: u16,
    pub cvv: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Pix,
    Card,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub items: Vec<CartItem>,
    #[serde(default)]
    pub user_id: Option<String>,
    pub payment_method: PaymentMethod,
    pub checkout_data: CheckoutData,
    #[serde(default)]
    pub coupon_code: Option<String>,
    /// Shipping cost in currency units
    #[serde(default)]
    pub shipping_reais: Option<Decimal>,
    #[serde(default)]
    pub installment_option: Option<u8>,
    /// Raw card fields; required when `payment_method` is `card`
    #[serde(default)]
    pub card: Option<CardInput>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(untagged)]
pub enum CheckoutResponse {
    /// Card settles synchronously; the order already exists.
    #[serde(rename_all = "camelCase")]
    Card { order_id: Uuid },
    /// PIX is pending; the caller polls for the webhook-materialized order.
    #[serde(rename_all = "camelCase")]
    Pix {
        order_id: String,
        pix: PixInstructions,
    },
}

/// Validates cart + customer input and drives the dual-path payment
/// initiation against the gateway.
#[derive(Clone)]
pub struct CheckoutService {
    orders: OrderService,
    gateway: PaymentGatewayClient,
    dispatcher: Arc<SideEffectDispatcher>,
}

impl CheckoutService {
    pub fn new(
        orders: OrderService,
        gateway: PaymentGatewayClient,
        dispatcher: Arc<SideEffectDispatcher>,
    ) -> Self {
        Self {
            orders,
            gateway,
            dispatcher,
        }
    }

    #[instrument(skip(self, request), fields(method = ?request.payment_method))]
    pub async fn checkout(
        &self,
        request: CheckoutRequest,
    ) -> Result<CheckoutResponse, ServiceError> {
        validate_request(&request)?;

        match request.payment_method {
            PaymentMethod::Card => self.checkout_card(request).await,
            PaymentMethod::Pix => self.checkout_pix(request).await,
        }
    }

    /// Card path: tokenize, charge, persist the paid order, dispatch side
    /// effects in the background, return the order id.
    async fn checkout_card(
        &self,
        request: CheckoutRequest,
    ) -> Result<CheckoutResponse, ServiceError> {
        let card = request
            .card
            .as_ref()
            .ok_or_else(|| {
                ServiceError::ValidationError(vec!["card: card data is required".to_string()])
            })?;

        let token = self
            .gateway
            .tokenize_card(&CardData {
                number: card.number.clone(),
                holder_name: card.holder_name.clone(),
                exp_month: card.exp_month,
                exp_year: card.exp_year,
                cvv: card.cvv.clone(),
            })
            .await?;

        let payment = GatewayPayment::CreditCard {
            card_token: token,
            installments: request.installment_option.unwrap_or(1),
        };
        let charge = self
            .gateway
            .create_order(&gateway_request(&request, payment))
            .await?;

        let (order, lines) = self
            .orders
            .create_with_lines(
                new_order_from_checkout(&request, &charge.payment_reference),
                request
                    .items
                    .iter()
                    .map(|item| NewOrderLine {
                        product_id: item.id.clone(),
                        name: item.name.clone(),
                        quantity: item.quantity,
                        unit_price: item.price,
                        image_url: item.image_url.clone(),
                    })
                    .collect(),
            )
            .await?;

        info!(order_id = %order.id, "card checkout completed");

        let order_id = order.id;
        let dispatcher = self.dispatcher.clone();
        tokio::spawn(async move {
            dispatcher.dispatch(&order, &lines).await;
        });

        Ok(CheckoutResponse::Card { order_id })
    }

    /// PIX path: create the pending charge and hand back the payment
    /// instructions. The order materializes later via the webhook.
    async fn checkout_pix(
        &self,
        request: CheckoutRequest,
    ) -> Result<CheckoutResponse, ServiceError> {
        let payment = GatewayPayment::Pix {
            expires_in: PIX_EXPIRES_IN_SECS,
        };
        let charge = self
            .gateway
            .create_order(&gateway_request(&request, payment))
            .await?;

        let Some(pix) = charge.pix else {
            // The processor accepted the charge but returned nothing the
            // customer could pay with. That is an integration problem.
            warn!(
                payment_reference = %charge.payment_reference,
                "PIX charge returned no payable instructions"
            );
            return Err(ServiceError::InvalidGatewayResponse(
                "PIX charge returned no QR code or copy-paste payload".to_string(),
            ));
        };

        info!(payment_reference = %charge.payment_reference, "PIX charge created");
        Ok(CheckoutResponse::Pix {
            order_id: charge.payment_reference,
            pix,
        })
    }
}

/// Field-by-field validation; collects every failure before reporting.
fn validate_request(request: &CheckoutRequest) -> Result<(), ServiceError> {
    let mut errors = Vec::new();

    if request.items.is_empty() {
        errors.push("items: cart must not be empty".to_string());
    }
    for item in &request.items {
        if item.quantity <= 0 {
            errors.push(format!("items: quantity for '{}' must be positive", item.id));
        }
    }

    let data = &request.checkout_data;
    if !validator::validate_email(&data.email) {
        errors.push("email: invalid email format".to_string());
    }
    if data.full_name.trim().is_empty() {
        errors.push("fullName: must not be empty".to_string());
    }
    if let Err(e) = validate_cpf(&data.cpf) {
        errors.push(format!(
            "cpf: {}",
            e.message.as_deref().unwrap_or("invalid document")
        ));
    }
    if let Err(e) = validate_phone(&data.phone) {
        errors.push(format!(
            "phone: {}",
            e.message.as_deref().unwrap_or("invalid phone")
        ));
    }

    let address = &data.address;
    for (field, value) in [
        ("address.street", &address.street),
        ("address.number", &address.number),
        ("address.neighborhood", &address.neighborhood),
        ("address.city", &address.city),
        ("address.state", &address.state),
        ("address.postalCode", &address.postal_code),
    ] {
        if value.trim().is_empty() {
            errors.push(format!("{field}: must not be empty"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ServiceError::ValidationError(errors))
    }
}

/// Builds the gateway payload: cart items in minor units plus a shipping
/// pseudo item when the order carries freight.
fn gateway_request(request: &CheckoutRequest, payment: GatewayPayment) -> GatewayOrderRequest {
    let data = &request.checkout_data;

    let mut items: Vec<GatewayItem> = request
        .items
        .iter()
        .map(|item| GatewayItem {
            code: item.id.clone(),
            description: item.name.clone(),
            amount: to_cents(item.price * Decimal::from(item.quantity)),
            quantity: item.quantity,
        })
        .collect();

    if let Some(shipping) = request.shipping_reais.filter(|v| *v > Decimal::ZERO) {
        items.push(GatewayItem {
            code: "shipping".to_string(),
            description: "Frete".to_string(),
            amount: to_cents(shipping),
            quantity: 1,
        });
    }

    GatewayOrderRequest {
        customer: GatewayCustomer {
            name: data.full_name.clone(),
            email: data.email.clone(),
            document: digits_only(&data.cpf),
            phone: digits_only(&data.phone),
        },
        items,
        payment,
        metadata: GatewayMetadata {
            customer_email: data.email.clone(),
            customer_name: data.full_name.clone(),
            customer_phone: data.phone.clone(),
            user_id: request.user_id.clone(),
            coupon_code: request.coupon_code.clone(),
        },
    }
}

fn new_order_from_checkout(request: &CheckoutRequest, payment_reference: &str) -> NewOrder {
    let data = &request.checkout_data;
    let address = &data.address;

    let items_total: Decimal = request
        .items
        .iter()
        .map(|item| item.price * Decimal::from(item.quantity))
        .sum();
    let total = items_total + request.shipping_reais.unwrap_or(Decimal::ZERO);

    NewOrder {
        payment_reference: payment_reference.to_string(),
        customer_email: data.email.clone(),
        user_id: request.user_id.clone(),
        total_amount: total,
        customer_name: Some(data.full_name.clone()),
        customer_phone: Some(data.phone.clone()),
        customer_document: Some(digits_only(&data.cpf)),
        ship_street: Some(address.street.clone()),
        ship_number: Some(address.number.clone()),
        ship_complement: address.complement.clone(),
        ship_neighborhood: Some(address.neighborhood.clone()),
        ship_city: Some(address.city.clone()),
        ship_state: Some(address.state.clone()),
        ship_postal_code: Some(address.postal_code.clone()),
    }
}

fn to_cents(amount: Decimal) -> i64 {
    (amount * Decimal::from(100)).round().to_i64().unwrap_or(0)
}

fn digits_only(value: &str) -> String {
    value.chars().filter(|c| c.is_ascii_digit()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn valid_request(method: PaymentMethod) -> CheckoutRequest {
        CheckoutRequest {
            items: vec![CartItem {
                id: "prod_1".to_string(),
                name: "Camiseta".to_string(),
                price: dec!(109.50),
                quantity: 2,
                image_url: None,
            }],
            user_id: Some("user_9".to_string()),
            payment_method: method,
            checkout_data: CheckoutData {
                email: "ana@example.com".to_string(),
                full_name: "Ana Souza".to_string(),
                cpf: "529.982.247-25".to_string(),
                phone: "(11) 98765-4321".to_string(),
                address: CheckoutAddress {
                    street: "Rua das Flores".to_string(),
                    number: "100".to_string(),
                    complement: None,
                    neighborhood: "Centro".to_string(),
                    city: "São Paulo".to_string(),
                    state: "SP".to_string(),
                    postal_code: "01000-000".to_string(),
                },
            },
            coupon_code: None,
            shipping_reais: Some(dec!(19.90)),
            installment_option: None,
            card: None,
        }
    }

    #[test]
    fn valid_request_passes_validation() {
        assert!(validate_request(&valid_request(PaymentMethod::Pix)).is_ok());
    }

    #[test]
    fn validation_reports_every_failing_field() {
        let mut request = valid_request(PaymentMethod::Pix);
        request.items.clear();
        request.checkout_data.email = "not-an-email".to_string();
        request.checkout_data.cpf = "123".to_string();
        request.checkout_data.address.city = "".to_string();

        let err = validate_request(&request).unwrap_err();
        match err {
            ServiceError::ValidationError(messages) => {
                assert!(messages.iter().any(|m| m.starts_with("items:")));
                assert!(messages.iter().any(|m| m.starts_with("email:")));
                assert!(messages.iter().any(|m| m.starts_with("cpf:")));
                assert!(messages.iter().any(|m| m.starts_with("address.city:")));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn gateway_items_are_in_minor_units_with_shipping_pseudo_item() {
        let request = valid_request(PaymentMethod::Pix);
        let payload = gateway_request(&request, GatewayPayment::Pix { expires_in: 3600 });

        assert_eq!(payload.items.len(), 2);
        assert_eq!(payload.items[0].amount, 21900);
        assert_eq!(payload.items[1].code, "shipping");
        assert_eq!(payload.items[1].amount, 1990);
        assert_eq!(payload.customer.document, "52998224725");
    }

    #[test]
    fn order_total_includes_shipping() {
        let request = valid_request(PaymentMethod::Card);
        let order = new_order_from_checkout(&request, "or_x");
        assert_eq!(order.total_amount, dec!(238.90));
        assert_eq!(order.ship_city.as_deref(), Some("São Paulo"));
    }
}
