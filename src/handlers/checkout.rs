use crate::{
    errors::ServiceError,
    services::checkout::{CheckoutRequest, CheckoutResponse},
    ApiResponse, AppState,
};
use axum::{extract::State, Json};

/// Submits a checkout: validates the cart and customer data, initiates
/// payment, and — for card — creates the order synchronously.
#[utoipa::path(
    post,
    path = "/api/v1/checkout",
    request_body = CheckoutRequest,
    responses(
        (status = 200, description = "Checkout accepted; card responses carry the order id, PIX responses the payment instructions"),
        (status = 400, description = "Validation failed", body = crate::errors::ErrorResponse),
        (status = 402, description = "The payment processor rejected the charge", body = crate::errors::ErrorResponse),
        (status = 502, description = "Payment gateway unreachable or returned an unusable response", body = crate::errors::ErrorResponse)
    ),
    tag = "Checkout"
)]
pub async fn submit_checkout(
    State(state): State<AppState>,
    Json(request): Json<CheckoutRequest>,
) -> Result<Json<ApiResponse<CheckoutResponse>>, ServiceError> {
    let response = state.checkout.checkout(request).await?;
    Ok(Json(ApiResponse::success(response)))
}
