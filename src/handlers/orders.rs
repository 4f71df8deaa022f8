use crate::{
    entities::{order, order_line},
    errors::ServiceError,
    ApiResponse, AppState,
};
use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

/// Whether the webhook has materialized an order for this payment
/// reference. This is the bridge that lets the synchronous PIX checkout
/// flow observe asynchronous confirmation.
#[utoipa::path(
    get,
    path = "/api/v1/orders/exists/{payment_reference}",
    params(("payment_reference" = String, Path, description = "External payment reference")),
    responses((status = 200, description = "Existence flag")),
    tag = "Orders"
)]
pub async fn order_exists(
    State(state): State<AppState>,
    Path(payment_reference): Path<String>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let exists = state.orders.exists(&payment_reference).await?;
    Ok(Json(json!({ "exists": exists })))
}

#[derive(Debug, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: order::Model,
    pub lines: Vec<order_line::Model>,
}

/// Order readback with its lines.
#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "The order and its lines"),
        (status = 404, description = "No such order", body = crate::errors::ErrorResponse)
    ),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<OrderDetail>>, ServiceError> {
    let (order, lines) = state
        .orders
        .get_with_lines(id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("order {} not found", id)))?;

    Ok(Json(ApiResponse::success(OrderDetail { order, lines })))
}
