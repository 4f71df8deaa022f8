use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use sea_orm::error::DbErr;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

/// Error body returned to HTTP callers.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "error": "Payment Required",
    "message": "Payment failed: card_declined: insufficient funds",
    "details": null,
    "timestamp": "2025-06-01T10:30:00.000Z"
}))]
pub struct ErrorResponse {
    /// HTTP status category (e.g. "Bad Request", "Payment Required")
    pub error: String,
    /// Human-readable error description
    pub message: String,
    /// Additional detail (field-level validation messages)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
    /// ISO 8601 timestamp when the error occurred
    pub timestamp: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::error::DbErr),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad customer input; carries per-field messages.
    #[error("Validation error")]
    ValidationError(Vec<String>),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The payment processor rejected tokenization or the charge.
    /// The processor's own message is passed through verbatim.
    #[error("Payment failed: {0}")]
    PaymentFailed(String),

    /// The processor answered but the response is unusable (e.g. a PIX
    /// charge with no QR payload). An integration misconfiguration, not a
    /// customer problem.
    #[error("Invalid gateway response: {0}")]
    InvalidGatewayResponse(String),

    /// Transport-level failure talking to an external system.
    #[error("External service error: {0}")]
    ExternalServiceError(String),

    /// An order already exists for this payment reference.
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        let messages = err
            .field_errors()
            .into_iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| match &e.message {
                    Some(msg) => format!("{}: {}", field, msg),
                    None => format!("{}: invalid value", field),
                })
            })
            .collect();
        ServiceError::ValidationError(messages)
    }
}

impl ServiceError {
    /// Whether a sea-orm error is a unique-constraint violation. Used by the
    /// order store to treat the loser of a duplicate-webhook insert race the
    /// same as "order already exists".
    pub fn is_unique_violation(err: &DbErr) -> bool {
        match err {
            DbErr::Query(e) | DbErr::Exec(e) => {
                let msg = e.to_string().to_lowercase();
                msg.contains("unique") || msg.contains("duplicate key")
            }
            _ => false,
        }
    }

    /// Single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::DatabaseError(_)
            | Self::SerializationError(_)
            | Self::InternalError(_)
            | Self::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ValidationError(_) | Self::InvalidInput(_) | Self::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::PaymentFailed(_) => StatusCode::PAYMENT_REQUIRED,
            Self::InvalidGatewayResponse(_) | Self::ExternalServiceError(_) => {
                StatusCode::BAD_GATEWAY
            }
            Self::AlreadyExists(_) => StatusCode::CONFLICT,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        }
    }

    /// Message suitable for HTTP responses. Internal errors return generic
    /// text so implementation details never leak to callers.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database error".to_string(),
            Self::SerializationError(_) | Self::InternalError(_) | Self::Other(_) => {
                "Internal server error".to_string()
            }
            Self::ValidationError(_) => "Validation failed".to_string(),
            _ => self.to_string(),
        }
    }

    fn details(&self) -> Option<Vec<String>> {
        match self {
            Self::ValidationError(messages) => Some(messages.clone()),
            _ => None,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Unknown").to_string(),
            message: self.response_message(),
            details: self.details(),
            timestamp: Utc::now().to_rfc3339(),
        };
        (status, Json(body)).into_response()
    }
}
