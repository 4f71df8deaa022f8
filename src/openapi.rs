use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Checkout API",
        description = "Checkout payment initiation and webhook-driven order reconciliation",
    ),
    paths(
        crate::handlers::health::health,
        crate::handlers::checkout::submit_checkout,
        crate::handlers::webhooks::payment_webhook,
        crate::handlers::orders::order_exists,
        crate::handlers::orders::get_order,
    ),
    components(schemas(
        crate::errors::ErrorResponse,
        crate::services::checkout::CheckoutRequest,
        crate::services::checkout::CartItem,
        crate::services::checkout::CheckoutData,
        crate::services::checkout::CheckoutAddress,
        crate::services::checkout::CardInput,
        crate::services::checkout::PaymentMethod,
    )),
    tags(
        (name = "Checkout", description = "Cart submission and payment initiation"),
        (name = "Payments", description = "Payment processor webhooks"),
        (name = "Orders", description = "Order lookups"),
        (name = "Health", description = "Service probes"),
    )
)]
pub struct ApiDoc;

/// Swagger UI mounted at `/docs`.
pub fn swagger() -> SwaggerUi {
    SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi())
}
