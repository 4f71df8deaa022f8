//! Contact resolution against the ERP.
//!
//! The ERP keys contacts by tax document and rejects duplicates. Creation
//! is attempted first; on a duplicate-document conflict the existing
//! contact is located — by document search, then by the name the conflict
//! message itself mentions, then by walking the paginated listing — and
//! its address is brought up to date. No sale can be created without a
//! resolved contact, so an unresolvable contact fails the whole sync.

use super::{ErpClient, ErpError};
use crate::entities::order;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

/// Pages to walk before giving up on the listing fallback.
const MAX_LIST_PAGES: u32 = 10;
const LIST_PAGE_SIZE: u32 = 100;

/// Conflict messages read like:
/// `document 52998224725 is already registered for contact "Ana Souza"`.
static CONFLICT_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?:contact|contato)\s+"([^"]+)""#).unwrap());

/// Reference to a resolved ERP contact.
#[derive(Debug, Clone)]
pub struct ContactRef {
    pub id: String,
}

#[derive(Debug, Serialize)]
struct ContactPayload {
    name: String,
    document: String,
    email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    phone: Option<String>,
    address: ContactAddress,
}

#[derive(Debug, Serialize)]
struct ContactAddress {
    #[serde(skip_serializing_if = "Option::is_none")]
    street: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    complement: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    neighborhood: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    postal_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContactRecord {
    id: Value,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    document: Option<String>,
}

impl ContactRecord {
    fn id_string(&self) -> String {
        match &self.id {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ContactListResponse {
    #[serde(default)]
    data: Vec<ContactRecord>,
}

impl ErpClient {
    /// Creates or locates the contact for this order's customer and keeps
    /// its address current.
    pub(super) async fn resolve_contact(
        &self,
        access_token: &str,
        order: &order::Model,
    ) -> Result<ContactRef, ErpError> {
        let document = order.customer_document.clone().unwrap_or_default();
        let payload = contact_payload(order);

        let contact = match self.create_contact(access_token, &payload).await {
            Ok(contact) => contact,
            Err(ErpError::Api { status, message }) if is_duplicate_conflict(status, &message) => {
                debug!(%document, "contact already registered, locating existing record");
                self.locate_existing(access_token, &document, &payload.name, &message)
                    .await?
            }
            Err(err) => return Err(err),
        };

        // Keep the stored address current even when the contact predates
        // this order.
        if let Err(err) = self
            .update_contact(access_token, &contact.id, &payload)
            .await
        {
            warn!(contact_id = %contact.id, error = %err, "contact address update failed");
        }

        info!(contact_id = %contact.id, "ERP contact resolved");
        Ok(contact)
    }

    async fn create_contact(
        &self,
        access_token: &str,
        payload: &ContactPayload,
    ) -> Result<ContactRef, ErpError> {
        let url = format!("{}/contacts", self.base_url());
        let response = self
            .http
            .post(&url)
            .bearer_auth(access_token)
            .json(payload)
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
        let id = body
            .get("data")
            .and_then(|d| d.get("id"))
            .or_else(|| body.get("id"))
            .map(|id| match id {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .ok_or_else(|| ErpError::Api {
                status: status.as_u16(),
                message: "contact creation response has no id".to_string(),
            })?;

        Ok(ContactRef { id })
    }

    /// Conflict fallback chain: document search → name parsed from the
    /// conflict message → paginated listing with local matching.
    async fn locate_existing(
        &self,
        access_token: &str,
        document: &str,
        name: &str,
        conflict_message: &str,
    ) -> Result<ContactRef, ErpError> {
        if let Some(contact) = self.search_contacts(access_token, "document", document).await? {
            return Ok(contact);
        }

        if let Some(conflict_name) = parse_conflict_name(conflict_message) {
            if let Some(contact) = self
                .search_contacts(access_token, "name", &conflict_name)
                .await?
            {
                return Ok(contact);
            }
        }

        if let Some(contact) = self
            .list_and_match(access_token, document, name)
            .await?
        {
            return Ok(contact);
        }

        Err(ErpError::ContactResolution {
            document: document.to_string(),
            reason: "conflict reported but no matching contact found".to_string(),
        })
    }

    async fn search_contacts(
        &self,
        access_token: &str,
        field: &str,
        value: &str,
    ) -> Result<Option<ContactRef>, ErpError> {
        if value.is_empty() {
            return Ok(None);
        }

        let url = format!("{}/contacts", self.base_url());
        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .query(&[(field, value)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Ok(None);
        }

        let list: ContactListResponse = response.json().await.unwrap_or(ContactListResponse {
            data: Vec::new(),
        });
        Ok(list
            .data
            .into_iter()
            .next()
            .map(|record| ContactRef {
                id: record.id_string(),
            }))
    }

    async fn list_and_match(
        &self,
        access_token: &str,
        document: &str,
        name: &str,
    ) -> Result<Option<ContactRef>, ErpError> {
        let url = format!("{}/contacts", self.base_url());
        let digits: String = document.chars().filter(|c| c.is_ascii_digit()).collect();

        for page in 1..=MAX_LIST_PAGES {
            let response = self
                .http
                .get(&url)
                .bearer_auth(access_token)
                .query(&[("page", page), ("limit", LIST_PAGE_SIZE)])
                .send()
                .await?;

            if !response.status().is_success() {
                return Ok(None);
            }

            let list: ContactListResponse = response.json().await.unwrap_or(ContactListResponse {
                data: Vec::new(),
            });
            if list.data.is_empty() {
                return Ok(None);
            }

            let matched = list.data.into_iter().find(|record| {
                let doc_match = record.document.as_deref().is_some_and(|d| {
                    let d_digits: String = d.chars().filter(|c| c.is_ascii_digit()).collect();
                    !d_digits.is_empty() && d_digits == digits
                });
                let name_match = record
                    .name
                    .as_deref()
                    .is_some_and(|n| n.eq_ignore_ascii_case(name));
                doc_match || name_match
            });

            if let Some(record) = matched {
                return Ok(Some(ContactRef {
                    id: record.id_string(),
                }));
            }
        }

        Ok(None)
    }

    async fn update_contact(
        &self,
        access_token: &str,
        contact_id: &str,
        payload: &ContactPayload,
    ) -> Result<(), ErpError> {
        let url = format!("{}/contacts/{}", self.base_url(), contact_id);
        let response = self
            .http
            .put(&url)
            .bearer_auth(access_token)
            .json(payload)
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
        Ok(())
    }
}

fn contact_payload(order: &order::Model) -> ContactPayload {
    ContactPayload {
        name: order
            .customer_name
            .clone()
            .unwrap_or_else(|| order.customer_email.clone()),
        document: order.customer_document.clone().unwrap_or_default(),
        email: order.customer_email.clone(),
        phone: order.customer_phone.clone(),
        address: ContactAddress {
            street: order.ship_street.clone(),
            number: order.ship_number.clone(),
            complement: order.ship_complement.clone(),
            neighborhood: order.ship_neighborhood.clone(),
            city: order.ship_city.clone(),
            state: order.ship_state.clone(),
            postal_code: order.ship_postal_code.clone(),
        },
    }
}

fn is_duplicate_conflict(status: u16, message: &str) -> bool {
    let lower = message.to_lowercase();
    status == 409
        || (status == 400
            && (lower.contains("already registered")
                || lower.contains("já cadastrado")
                || lower.contains("duplicate")))
}

fn parse_conflict_name(message: &str) -> Option<String> {
    CONFLICT_NAME_RE
        .captures(message)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
