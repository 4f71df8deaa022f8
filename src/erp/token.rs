//! OAuth token lifecycle for the ERP API.
//!
//! Tokens live in a single-row store. The access token is reused until it
//! is within a safety margin of expiry, then refreshed with the stored
//! refresh token and persisted. Statically configured tokens act as the
//! fallback when the store is empty or a refresh fails. Concurrent
//! refreshes are tolerated: the exchange is idempotent on the provider
//! side, so last write wins.

use super::{ErpClient, ErpError};
use crate::entities::erp_token::{self, TOKEN_ROW_ID};
use async_trait::async_trait;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Refresh this long before the recorded expiry.
const EXPIRY_SAFETY_MARGIN_SECS: i64 = 300;

/// An access/refresh token pair with its expiry.
#[derive(Debug, Clone)]
pub struct StoredToken {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl StoredToken {
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - now < Duration::seconds(EXPIRY_SAFETY_MARGIN_SECS)
    }
}

/// Capability over the persisted token row; injected so tests can swap in
/// an in-memory double and so the cache is shared across request tasks.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn get(&self) -> Result<Option<StoredToken>, ErpError>;
    async fn save(&self, token: &StoredToken) -> Result<(), ErpError>;
}

/// Token store backed by the `erp_tokens` table.
pub struct DbTokenStore {
    db: Arc<DatabaseConnection>,
}

impl DbTokenStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TokenStore for DbTokenStore {
    async fn get(&self) -> Result<Option<StoredToken>, ErpError> {
        let row = erp_token::Entity::find_by_id(TOKEN_ROW_ID)
            .one(&*self.db)
            .await?;
        Ok(row.map(|row| StoredToken {
            access_token: row.access_token,
            refresh_token: row.refresh_token,
            expires_at: row.expires_at,
        }))
    }

    async fn save(&self, token: &StoredToken) -> Result<(), ErpError> {
        let existing = erp_token::Entity::find_by_id(TOKEN_ROW_ID)
            .one(&*self.db)
            .await?;

        let model = erp_token::ActiveModel {
            id: Set(TOKEN_ROW_ID),
            access_token: Set(token.access_token.clone()),
            refresh_token: Set(token.refresh_token.clone()),
            expires_at: Set(token.expires_at),
            updated_at: Set(Utc::now()),
        };

        if existing.is_some() {
            model.update(&*self.db).await?;
        } else {
            model.insert(&*self.db).await?;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct TokenGrant {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: i64,
}

impl ErpClient {
    /// Returns a usable access token, refreshing and persisting as needed.
    pub(super) async fn access_token(&self) -> Result<String, ErpError> {
        let now = Utc::now();

        if let Some(stored) = self.token_store.get().await? {
            if !stored.needs_refresh(now) {
                return Ok(stored.access_token);
            }

            match self.refresh(&stored.refresh_token).await {
                Ok(renewed) => return Ok(renewed.access_token),
                Err(err) => {
                    // Statically configured token keeps the sync alive when
                    // the refresh endpoint is down or the stored refresh
                    // token was revoked.
                    if let Some(static_token) = &self.config.static_access_token {
                        warn!(error = %err, "token refresh failed, using static fallback token");
                        return Ok(static_token.clone());
                    }
                    return Err(err);
                }
            }
        }

        // Empty store: bootstrap from static configuration.
        if let Some(static_refresh) = self.config.static_refresh_token.clone() {
            match self.refresh(&static_refresh).await {
                Ok(renewed) => return Ok(renewed.access_token),
                Err(err) => {
                    if let Some(static_token) = &self.config.static_access_token {
                        warn!(error = %err, "bootstrap refresh failed, using static access token");
                        return Ok(static_token.clone());
                    }
                    return Err(err);
                }
            }
        }

        if let Some(static_token) = &self.config.static_access_token {
            return Ok(static_token.clone());
        }

        Err(ErpError::NotConfigured)
    }

    /// Exchanges a refresh token and persists the renewed pair.
    async fn refresh(&self, refresh_token: &str) -> Result<StoredToken, ErpError> {
        let (client_id, client_secret) = match (
            self.config.client_id.as_deref(),
            self.config.client_secret.as_deref(),
        ) {
            (Some(id), Some(secret)) => (id, secret),
            _ => return Err(ErpError::NotConfigured),
        };

        let basic = base64::engine::general_purpose::STANDARD
            .encode(format!("{}:{}", client_id, client_secret));

        let response = self
            .http
            .post(&self.config.token_url)
            .header("Authorization", format!("Basic {}", basic))
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .send()
            .await
            .map_err(|e| ErpError::TokenRefresh(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ErpError::TokenRefresh(format!(
                "token endpoint returned {}: {}",
                status, body
            )));
        }

        let grant: TokenGrant = response
            .json()
            .await
            .map_err(|e| ErpError::TokenRefresh(e.to_string()))?;

        let renewed = StoredToken {
            access_token: grant.access_token,
            // Providers that do not rotate the refresh token keep the old one.
            refresh_token: grant
                .refresh_token
                .unwrap_or_else(|| refresh_token.to_string()),
            expires_at: Utc::now() + Duration::seconds(grant.expires_in),
        };

        self.token_store.save(&renewed).await?;
        info!(expires_at = %renewed.expires_at, "ERP access token refreshed");
        Ok(renewed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_within_margin_needs_refresh() {
        let now = Utc::now();
        let token = StoredToken {
            access_token: "a".into(),
            refresh_token: "r".into(),
            expires_at: now + Duration::seconds(120),
        };
        assert!(token.needs_refresh(now));
    }

    #[test]
    fn fresh_token_does_not_need_refresh() {
        let now = Utc::now();
        let token = StoredToken {
            access_token: "a".into(),
            refresh_token: "r".into(),
            expires_at: now + Duration::hours(6),
        };
        assert!(!token.needs_refresh(now));
    }

    #[test]
    fn expired_token_needs_refresh() {
        let now = Utc::now();
        let token = StoredToken {
            access_token: "a".into(),
            refresh_token: "r".into(),
            expires_at: now - Duration::hours(1),
        };
        assert!(token.needs_refresh(now));
    }
}
