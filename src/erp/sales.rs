//! Sales-order creation in the ERP.

use super::{ContactRef, ErpClient, ErpError, ErpSaleRef};
use crate::entities::order;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;

/// An order line with its product id already translated to the ERP's.
#[derive(Debug, Clone)]
pub struct MappedLine {
    pub erp_product_id: String,
    pub description: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

#[derive(Debug, Serialize)]
struct SaleItem<'a> {
    product_id: &'a str,
    description: &'a str,
    quantity: i32,
    unit_price: Decimal,
}

#[derive(Debug, Serialize)]
struct SaleAddress<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    street: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    number: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    complement: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    neighborhood: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    city: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    postal_code: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct SaleRequest<'a> {
    number: String,
    contact_id: &'a str,
    items: Vec<SaleItem<'a>>,
    shipping_address: SaleAddress<'a>,
    total_amount: Decimal,
    generate_invoice: bool,
}

impl ErpClient {
    /// Submits the sales order. The external-facing number is short and
    /// deterministic so support staff can find the sale from a payment
    /// reference by hand.
    pub(super) async fn create_sale(
        &self,
        access_token: &str,
        order: &order::Model,
        contact: &ContactRef,
        lines: &[MappedLine],
    ) -> Result<ErpSaleRef, ErpError> {
        let number = sale_number(&self.config.store_prefix, &order.payment_reference);

        let request = SaleRequest {
            number: number.clone(),
            contact_id: &contact.id,
            items: lines
                .iter()
                .map(|line| SaleItem {
                    product_id: &line.erp_product_id,
                    description: &line.description,
                    quantity: line.quantity,
                    unit_price: line.unit_price,
                })
                .collect(),
            shipping_address: SaleAddress {
                street: order.ship_street.as_deref(),
                number: order.ship_number.as_deref(),
                complement: order.ship_complement.as_deref(),
                neighborhood: order.ship_neighborhood.as_deref(),
                city: order.ship_city.as_deref(),
                state: order.ship_state.as_deref(),
                postal_code: order.ship_postal_code.as_deref(),
            },
            total_amount: order.total_amount,
            generate_invoice: self.config.generate_invoice,
        };

        let url = format!("{}/sales", self.base_url());
        let response = self
            .http
            .post(&url)
            .bearer_auth(access_token)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ErpError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: Value = response.json().await?;
        let sale_id = body
            .get("data")
            .and_then(|d| d.get("id"))
            .or_else(|| body.get("id"))
            .map(|id| match id {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .unwrap_or_else(|| number.clone());

        Ok(ErpSaleRef {
            sale_id,
            sale_number: number,
            contact_id: contact.id.clone(),
        })
    }
}

/// `<prefix>-<last 8 chars of the payment reference>`, uppercased.
fn sale_number(prefix: &str, payment_reference: &str) -> String {
    let tail: String = payment_reference
        .chars()
        .rev()
        .take(8)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("{}-{}", prefix, tail.to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sale_number_uses_reference_tail() {
        assert_eq!(sale_number("LOJA", "or_1234567890abcdef"), "LOJA-90ABCDEF");
    }

    #[test]
    fn short_references_are_kept_whole() {
        assert_eq!(sale_number("LOJA", "abc"), "LOJA-ABC");
    }
}
