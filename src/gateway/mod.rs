//! Thin HTTP client for the external payment processor.
//!
//! Wraps the card tokenization and order-creation endpoints. Carries no
//! business logic: amounts are already in minor units, and rejection
//! messages from the processor are passed through untranslated so the
//! checkout caller can surface them.

use crate::errors::ServiceError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

use crate::config::GatewayConfig;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// The processor rejected the request and said why. The message is
    /// surfaced to the caller verbatim.
    #[error("{0}")]
    Rejected(String),

    /// Transport failure; reported generically, never with wire details.
    #[error("payment gateway unreachable")]
    Transport(#[source] reqwest::Error),

    /// The processor answered with a body this client cannot use.
    #[error("unexpected gateway response: {0}")]
    UnexpectedResponse(String),
}

impl From<GatewayError> for ServiceError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Rejected(msg) => ServiceError::PaymentFailed(msg),
            GatewayError::Transport(_) => {
                ServiceError::ExternalServiceError("payment gateway unreachable".to_string())
            }
            GatewayError::UnexpectedResponse(msg) => ServiceError::InvalidGatewayResponse(msg),
        }
    }
}

/// Raw card data submitted for tokenization. Never persisted or logged.
#[derive(Debug, Clone, Serialize)]
pub struct CardData {
    pub number: String,
    pub holder_name: String,
    pub exp_month: u8,
    pub exp_year: u16,
    pub cvv: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    id: String,
}

/// Customer block sent with a charge.
#[derive(Debug, Clone, Serialize)]
pub struct GatewayCustomer {
    pub name: String,
    pub email: String,
    pub document: String,
    pub phone: String,
}

/// One billable item of a charge, amount in minor units.
#[derive(Debug, Clone, Serialize)]
pub struct GatewayItem {
    pub code: String,
    pub description: String,
    pub amount: i64,
    pub quantity: i32,
}

/// Extra context forwarded with the charge; echoed back in webhooks and
/// used there as a fallback source for customer fields.
#[derive(Debug, Clone, Serialize)]
pub struct GatewayMetadata {
    pub customer_email: String,
    pub customer_name: String,
    pub customer_phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon_code: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "payment_method", rename_all = "snake_case")]
pub enum GatewayPayment {
    CreditCard {
        card_token: String,
        installments: u8,
    },
    Pix {
        expires_in: u64,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct GatewayOrderRequest {
    pub customer: GatewayCustomer,
    pub items: Vec<GatewayItem>,
    pub payment: GatewayPayment,
    pub metadata: GatewayMetadata,
}

/// Pending-payment instruction set returned for PIX charges.
#[derive(Debug, Clone, Default, Serialize, Deserialize, utoipa::ToSchema)]
pub struct PixInstructions {
    /// EMV QR payload
    pub qr_code: Option<String>,
    /// Rendered QR image URL
    pub qr_code_url: Option<String>,
    /// Copy-and-paste code
    pub pix_copy_paste: Option<String>,
}

impl PixInstructions {
    /// A PIX charge with no usable payload cannot be presented to the
    /// customer at all.
    pub fn is_empty(&self) -> bool {
        self.qr_code.is_none() && self.qr_code_url.is_none() && self.pix_copy_paste.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct GatewayOrderResponse {
    /// The processor's transaction id — the external payment reference.
    pub payment_reference: String,
    pub status: String,
    pub pix: Option<PixInstructions>,
}

/// HTTP client for the payment processor.
#[derive(Clone)]
pub struct PaymentGatewayClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl PaymentGatewayClient {
    pub fn new(config: &GatewayConfig) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()
                .unwrap_or_default(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        }
    }

    /// Exchanges raw card data for an opaque single-use token.
    pub async fn tokenize_card(&self, card: &CardData) -> Result<String, GatewayError> {
        let url = format!("{}/tokens", self.base_url);
        let body = serde_json::json!({ "type": "card", "card": card });

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.api_key, Some(""))
            .json(&body)
            .send()
            .await
            .map_err(GatewayError::Transport)?;

        if !response.status().is_success() {
            return Err(Self::rejection(response).await);
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::UnexpectedResponse(e.to_string()))?;
        Ok(token.id)
    }

    /// Submits the checkout payload and creates a charge. For card payments
    /// the charge settles synchronously; for PIX the response carries the
    /// pending-payment instructions.
    pub async fn create_order(
        &self,
        request: &GatewayOrderRequest,
    ) -> Result<GatewayOrderResponse, GatewayError> {
        let url = format!("{}/orders", self.base_url);

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.api_key, Some(""))
            .json(request)
            .send()
            .await
            .map_err(GatewayError::Transport)?;

        if !response.status().is_success() {
            return Err(Self::rejection(response).await);
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| GatewayError::UnexpectedResponse(e.to_string()))?;

        Self::parse_order_response(&body)
    }

    fn parse_order_response(body: &Value) -> Result<GatewayOrderResponse, GatewayError> {
        let payment_reference = body
            .get("id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| GatewayError::UnexpectedResponse("missing order id".to_string()))?
            .to_string();

        let status = body
            .get("status")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown")
            .to_string();

        // A charge may carry a PIX transaction block; absent for cards.
        let pix = body
            .get("charges")
            .and_then(|c| c.as_array())
            .and_then(|charges| charges.first())
            .and_then(|charge| charge.get("last_transaction"))
            .map(|tx| PixInstructions {
                qr_code: tx.get("qr_code").and_then(|v| v.as_str()).map(String::from),
                qr_code_url: tx
                    .get("qr_code_url")
                    .and_then(|v| v.as_str())
                    .map(String::from),
                pix_copy_paste: tx
                    .get("pix_copy_paste")
                    .and_then(|v| v.as_str())
                    .map(String::from),
            })
            .filter(|pix| !pix.is_empty());

        Ok(GatewayOrderResponse {
            payment_reference,
            status,
            pix,
        })
    }

    /// Extracts the processor's own rejection message so it can be passed
    /// through to the caller.
    async fn rejection(response: reqwest::Response) -> GatewayError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| {
                v.get("message")
                    .or_else(|| v.get("error"))
                    .and_then(|m| m.as_str())
                    .map(String::from)
            })
            .unwrap_or_else(|| format!("gateway returned status {}", status));

        warn!(%status, %message, "payment gateway rejected request");
        GatewayError::Rejected(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_pix_instructions_from_charge() {
        let body = json!({
            "id": "or_abc123",
            "status": "pending",
            "charges": [{
                "last_transaction": {
                    "qr_code": "00020126580014br.gov.bcb.pix",
                    "qr_code_url": "https://api.example.com/qr/or_abc123.png"
                }
            }]
        });

        let parsed = PaymentGatewayClient::parse_order_response(&body).unwrap();
        assert_eq!(parsed.payment_reference, "or_abc123");
        let pix = parsed.pix.unwrap();
        assert!(pix.qr_code.is_some());
        assert!(pix.pix_copy_paste.is_none());
    }

    #[test]
    fn card_response_has_no_pix_block() {
        let body = json!({
            "id": "or_card1",
            "status": "paid",
            "charges": [{ "last_transaction": { "operation_type": "auth_and_capture" } }]
        });

        let parsed = PaymentGatewayClient::parse_order_response(&body).unwrap();
        assert!(parsed.pix.is_none());
        assert_eq!(parsed.status, "paid");
    }

    #[test]
    fn missing_order_id_is_an_unexpected_response() {
        let body = json!({ "status": "paid" });
        assert!(PaymentGatewayClient::parse_order_response(&body).is_err());
    }

    #[test]
    fn payment_serializes_with_method_tag() {
        let payment = GatewayPayment::Pix { expires_in: 3600 };
        let json = serde_json::to_value(&payment).unwrap();
        assert_eq!(json["payment_method"], "pix");
        assert_eq!(json["expires_in"], 3600);
    }
}
