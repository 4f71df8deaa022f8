//! Checkout orchestrator tests: validation, the synchronous card path,
//! and the asynchronous PIX path, with wiremock standing in for the
//! payment processor.

mod common;

use axum::http::Method;
use common::{response_json, TestApp};
use sea_orm::{EntityTrait, PaginatorTrait};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn checkout_body(payment_method: &str) -> serde_json::Value {
    json!({
        "items": [
            {"id": "prod_1", "name": "Camiseta Azul", "price": "109.50", "quantity": 2}
        ],
        "userId": "user_9",
        "paymentMethod": payment_method,
        "checkoutData": {
            "email": "ana@example.com",
            "fullName": "Ana Souza",
            "cpf": "529.982.247-25",
            "phone": "(11) 98765-4321",
            "address": {
                "street": "Rua das Flores",
                "number": "100",
                "neighborhood": "Centro",
                "city": "São Paulo",
                "state": "SP",
                "postalCode": "01000-000"
            }
        },
        "shippingReais": "19.90",
        "card": {
            "number": "4111111111111111",
            "holderName": "ANA SOUZA",
            "expMonth": 12,
            "expYear": 2030,
            "cvv": "123"
        }
    })
}

#[tokio::test]
async fn card_checkout_creates_paid_order_synchronously() {
    let gateway = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/tokens"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "tok_abc"})))
        .mount(&gateway)
        .await;

    Mock::given(method("POST"))
        .and(path("/orders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "or_card_1",
            "status": "paid",
            "charges": [{"last_transaction": {"operation_type": "auth_and_capture"}}]
        })))
        .mount(&gateway)
        .await;

    let app = TestApp::with_gateway_url(&gateway.uri()).await;

    let response = app
        .request(Method::POST, "/api/v1/checkout", Some(checkout_body("card")))
        .await;

    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["success"], true);
    let order_id = body["data"]["orderId"].as_str().expect("order id");

    let order = app
        .state
        .orders
        .find_by_payment_reference("or_card_1")
        .await
        .unwrap()
        .expect("order persisted");
    assert_eq!(order.id.to_string(), order_id);

    let (_, lines) = app
        .state
        .orders
        .get_with_lines(order.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].quantity, 2);
}

#[tokio::test]
async fn rejected_card_surfaces_gateway_reason_and_creates_nothing() {
    let gateway = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/tokens"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({"message": "card_declined: expired card"})),
        )
        .mount(&gateway)
        .await;

    let app = TestApp::with_gateway_url(&gateway.uri()).await;

    let response = app
        .request(Method::POST, "/api/v1/checkout", Some(checkout_body("card")))
        .await;

    assert_eq!(response.status(), 402);
    let body = response_json(response).await;
    // The processor's rejection reason reaches the caller untranslated.
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("card_declined: expired card"));

    let count = checkout_api::entities::Order::find()
        .count(&*app.state.db)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn pix_checkout_returns_instructions_without_an_order() {
    let gateway = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/orders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "or_pix_1",
            "status": "pending",
            "charges": [{
                "last_transaction": {
                    "qr_code": "00020126580014br.gov.bcb.pix",
                    "qr_code_url": "https://gateway.test/qr/or_pix_1.png",
                    "pix_copy_paste": "00020126580014br.gov.bcb.pix"
                }
            }]
        })))
        .mount(&gateway)
        .await;

    let app = TestApp::with_gateway_url(&gateway.uri()).await;

    let response = app
        .request(Method::POST, "/api/v1/checkout", Some(checkout_body("pix")))
        .await;

    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["orderId"], "or_pix_1");
    assert_eq!(
        body["data"]["pix"]["qr_code"],
        "00020126580014br.gov.bcb.pix"
    );

    // No order until the webhook lands.
    let count = checkout_api::entities::Order::find()
        .count(&*app.state.db)
        .await
        .unwrap();
    assert_eq!(count, 0);

    let poll = app
        .request(Method::GET, "/api/v1/orders/exists/or_pix_1", None)
        .await;
    assert_eq!(response_json(poll).await["exists"], false);
}

#[tokio::test]
async fn pix_charge_without_payload_is_a_gateway_error() {
    let gateway = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/orders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "or_pix_bad",
            "status": "pending",
            "charges": [{"last_transaction": {}}]
        })))
        .mount(&gateway)
        .await;

    let app = TestApp::with_gateway_url(&gateway.uri()).await;

    let response = app
        .request(Method::POST, "/api/v1/checkout", Some(checkout_body("pix")))
        .await;

    // Configuration problem, not a user error.
    assert_eq!(response.status(), 502);
}

#[tokio::test]
async fn invalid_input_fails_field_by_field_before_any_gateway_call() {
    // No mocks mounted: any gateway call would fail the test with a 502.
    let app = TestApp::new().await;

    let mut body = checkout_body("card");
    body["items"] = json!([]);
    body["checkoutData"]["cpf"] = json!("111.111.111-11");
    body["checkoutData"]["address"]["city"] = json!("");

    let response = app
        .request(Method::POST, "/api/v1/checkout", Some(body))
        .await;

    assert_eq!(response.status(), 400);
    let body = response_json(response).await;
    let details: Vec<String> = body["details"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap().to_string())
        .collect();

    assert!(details.iter().any(|d| d.starts_with("items:")));
    assert!(details.iter().any(|d| d.starts_with("cpf:")));
    assert!(details.iter().any(|d| d.starts_with("address.city:")));
}

#[tokio::test]
async fn unreachable_gateway_reports_generically() {
    let app = TestApp::new().await;

    let response = app
        .request(Method::POST, "/api/v1/checkout", Some(checkout_body("card")))
        .await;

    assert_eq!(response.status(), 502);
    let body = response_json(response).await;
    // Network failures are generic; no connection details leak.
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("payment gateway unreachable"));
}
