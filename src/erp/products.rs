//! Internal-to-external product id mapping.
//!
//! Every cart product must resolve to an ERP product id before a sale can
//! be created. Two sources: a per-product environment variable
//! (`ERP_PRODUCT_<ID>`, uppercased, non-alphanumerics folded to `_`) and a
//! single JSON object from configuration. The environment wins.

use super::ErpError;
use crate::config::ErpConfig;
use serde_json::Value;
use std::collections::HashMap;
use std::env;
use tracing::warn;

#[derive(Debug, Clone, Default)]
pub struct ProductMap {
    mapped: HashMap<String, String>,
}

impl ProductMap {
    /// Builds the map from the configured JSON object. A malformed map is
    /// logged and treated as empty; lookups then fall back to the
    /// environment alone.
    pub fn from_config(config: &ErpConfig) -> Self {
        let mapped = config
            .product_map_json
            .as_deref()
            .map(|raw| match serde_json::from_str::<Value>(raw) {
                Ok(Value::Object(entries)) => entries
                    .into_iter()
                    .filter_map(|(key, value)| match value {
                        Value::String(s) => Some((key, s)),
                        Value::Number(n) => Some((key, n.to_string())),
                        _ => None,
                    })
                    .collect(),
                Ok(_) => {
                    warn!("ERP product map is not a JSON object, ignoring");
                    HashMap::new()
                }
                Err(err) => {
                    warn!(error = %err, "failed to parse ERP product map JSON");
                    HashMap::new()
                }
            })
            .unwrap_or_default();

        Self { mapped }
    }

    /// Resolves an internal product id to its ERP counterpart.
    pub fn resolve(&self, product_id: &str) -> Result<String, ErpError> {
        if let Ok(value) = env::var(env_key(product_id)) {
            if !value.trim().is_empty() {
                return Ok(value.trim().to_string());
            }
        }

        self.mapped
            .get(product_id)
            .cloned()
            .ok_or_else(|| ErpError::UnmappedProduct(product_id.to_string()))
    }
}

fn env_key(product_id: &str) -> String {
    let suffix: String = product_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("ERP_PRODUCT_{}", suffix)
}
