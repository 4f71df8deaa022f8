use crate::{errors::ServiceError, services::webhook::WebhookEvent, AppState};
use axum::{extract::State, http::HeaderMap, response::IntoResponse, Json};
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use tracing::warn;

type HmacSha256 = Hmac<Sha256>;

/// Inbound payment-processor webhook.
///
/// Response contract: `{received: true}` with 200 for every acknowledged
/// branch — ignored event types, duplicates, unrecoverable payloads —
/// because redelivery cannot improve on any of those. An error status is
/// returned only when persistence failed in a retryable way.
#[utoipa::path(
    post,
    path = "/api/v1/payments/webhook",
    request_body = String,
    responses(
        (status = 200, description = "Delivery acknowledged"),
        (status = 401, description = "Invalid signature", body = crate::errors::ErrorResponse),
        (status = 500, description = "Persistence failed; the processor should redeliver", body = crate::errors::ErrorResponse)
    ),
    tag = "Payments"
)]
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<impl IntoResponse, ServiceError> {
    if let Some(secret) = &state.config.gateway.webhook_secret {
        if !verify_signature(&headers, &body, secret) {
            warn!("webhook signature verification failed");
            return Err(ServiceError::Unauthorized(
                "invalid webhook signature".to_string(),
            ));
        }
    }

    let payload: Value = match serde_json::from_str(&body) {
        Ok(payload) => payload,
        Err(err) => {
            // Redelivering a malformed body yields the same malformed body.
            warn!(error = %err, "malformed webhook payload, acknowledging");
            return Ok(Json(json!({ "received": true })));
        }
    };

    let event = WebhookEvent::parse(&payload);
    state.webhooks.process(event).await?;

    Ok(Json(json!({ "received": true })))
}

/// HMAC-SHA256 over `"{timestamp}.{body}"` with `x-timestamp` and
/// `x-signature` headers.
fn verify_signature(headers: &HeaderMap, body: &str, secret: &str) -> bool {
    let (Some(timestamp), Some(signature)) = (
        headers.get("x-timestamp").and_then(|v| v.to_str().ok()),
        headers.get("x-signature").and_then(|v| v.to_str().ok()),
    ) else {
        return false;
    };

    let signed = format!("{}.{}", timestamp, body);
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(signed.as_bytes());
    let expected = hex::encode(mac.finalize().into_bytes());

    constant_time_eq(&expected, signature)
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut res = 0u8;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes()) {
        res |= x ^ y;
    }
    res == 0
}
