//! Transactional email client.
//!
//! Renders the fixed order-confirmation template and submits it to the
//! email-delivery API. Send failures surface as [`EmailError`] so the
//! side-effect dispatcher can record them; they never block the order.

use crate::config::EmailConfig;
use crate::entities::{order, order_line};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::info;
use url::Url;

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("invalid email configuration: {0}")]
    Config(String),
}

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    from: &'a str,
    to: Vec<&'a str>,
    subject: String,
    html: String,
}

/// Client for the transactional email delivery API.
#[derive(Clone)]
pub struct EmailClient {
    client: reqwest::Client,
    base_url: String,
    from_address: String,
    site_base_url: String,
}

impl EmailClient {
    pub fn new(config: &EmailConfig, site_base_url: &str) -> Result<Self, EmailError> {
        let mut headers = HeaderMap::new();
        let auth_value = format!("Bearer {}", config.api_key);
        headers.insert(
            "Authorization",
            HeaderValue::from_str(&auth_value)
                .map_err(|e| EmailError::Config(format!("invalid API key: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            from_address: config.from_address.clone(),
            site_base_url: site_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Sends the order-confirmation email for a freshly created order.
    pub async fn send_order_confirmation(
        &self,
        order: &order::Model,
        lines: &[order_line::Model],
    ) -> Result<(), EmailError> {
        let subject = format!(
            "Pedido confirmado — #{}",
            short_reference(&order.payment_reference)
        );
        let html = self.render_confirmation(order, lines);

        let request = SendRequest {
            from: &self.from_address,
            to: vec![&order.customer_email],
            subject,
            html,
        };

        let url = format!("{}/emails", self.base_url);
        let response = self.client.post(&url).json(&request).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(EmailError::Api {
                status: status.as_u16(),
                message,
            });
        }

        info!(order_id = %order.id, email = %order.customer_email, "order confirmation email sent");
        Ok(())
    }

    fn render_confirmation(&self, order: &order::Model, lines: &[order_line::Model]) -> String {
        let greeting = order
            .customer_name
            .as_deref()
            .map(|name| format!("Olá, {}!", name))
            .unwrap_or_else(|| "Olá!".to_string());

        let mut rows = String::new();
        for line in lines {
            let image = line
                .image_url
                .as_deref()
                .map(|src| {
                    format!(
                        r#"<img src="{}" alt="" width="48" style="vertical-align:middle;margin-right:8px">"#,
                        self.absolute_url(src)
                    )
                })
                .unwrap_or_default();
            rows.push_str(&format!(
                "<tr><td style=\"padding:8px 0\">{image}{name}</td>\
                 <td align=\"center\">{qty}</td>\
                 <td align=\"right\">R$ {price:.2}</td></tr>",
                image = image,
                name = line.name,
                qty = line.quantity,
                price = line.unit_price,
            ));
        }

        format!(
            "<html><body style=\"font-family:sans-serif;color:#333\">\
             <h2>{greeting}</h2>\
             <p>Recebemos a confirmação do pagamento do seu pedido \
             <strong>#{reference}</strong>.</p>\
             <table width=\"100%\" cellspacing=\"0\">\
             <tr><th align=\"left\">Produto</th><th>Qtd.</th><th align=\"right\">Preço</th></tr>\
             {rows}\
             </table>\
             <p style=\"margin-top:16px\"><strong>Total: R$ {total:.2}</strong></p>\
             <p>Acompanhe seu pedido em <a href=\"{site}\">{site}</a>.</p>\
             </body></html>",
            greeting = greeting,
            reference = short_reference(&order.payment_reference),
            rows = rows,
            total = order.total_amount,
            site = self.site_base_url,
        )
    }

    /// Image paths stored relative to the storefront become absolute links.
    fn absolute_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        Url::parse(&self.site_base_url)
            .and_then(|base| base.join(path.trim_start_matches('/')))
            .map(|u| u.to_string())
            .unwrap_or_else(|_| format!("{}/{}", self.site_base_url, path.trim_start_matches('/')))
    }
}

/// Customer-facing short reference: the tail of the payment reference.
fn short_reference(payment_reference: &str) -> &str {
    let len = payment_reference.len();
    if len <= 8 {
        payment_reference
    } else {
        &payment_reference[len - 8..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn sample_order() -> order::Model {
        order::Model {
            id: Uuid::new_v4(),
            payment_reference: "or_1234567890abcdef".to_string(),
            customer_email: "ana@example.com".to_string(),
            user_id: None,
            status: order::OrderStatus::Paid,
            total_amount: dec!(219.00),
            customer_name: Some("Ana".to_string()),
            customer_phone: None,
            customer_document: None,
            ship_street: None,
            ship_number: None,
            ship_complement: None,
            ship_neighborhood: None,
            ship_city: None,
            ship_state: None,
            ship_postal_code: None,
            created_at: Utc::now(),
        }
    }

    fn client() -> EmailClient {
        EmailClient::new(
            &EmailConfig {
                base_url: "https://api.resend.com".into(),
                api_key: "re_test".into(),
                from_address: "pedidos@example.com".into(),
            },
            "https://loja.example.com",
        )
        .unwrap()
    }

    #[test]
    fn renders_template_with_lines_and_total() {
        let order = sample_order();
        let lines = vec![order_line::Model {
            id: Uuid::new_v4(),
            order_id: order.id,
            product_id: "prod_1".to_string(),
            name: "Camiseta Azul".to_string(),
            quantity: 2,
            unit_price: dec!(109.50),
            image_url: Some("/images/camiseta.png".to_string()),
            created_at: Utc::now(),
        }];

        let html = client().render_confirmation(&order, &lines);
        assert!(html.contains("Olá, Ana!"));
        assert!(html.contains("Camiseta Azul"));
        assert!(html.contains("R$ 219.00"));
        assert!(html.contains("https://loja.example.com/images/camiseta.png"));
        assert!(html.contains("#90abcdef"));
    }

    #[test]
    fn short_reference_keeps_small_ids_whole() {
        assert_eq!(short_reference("abc"), "abc");
        assert_eq!(short_reference("or_1234567890abcdef"), "90abcdef");
    }

    #[test]
    fn absolute_urls_pass_through() {
        let url = client().absolute_url("https://cdn.example.com/x.png");
        assert_eq!(url, "https://cdn.example.com/x.png");
    }
}
