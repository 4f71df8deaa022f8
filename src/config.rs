use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};
use validator::Validate;

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";

/// Payment gateway configuration.
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct GatewayConfig {
    /// Base URL of the payment processor API
    pub base_url: String,

    /// Secret API key used for Basic authentication
    pub api_key: String,

    /// Shared secret for inbound webhook signature verification.
    /// Verification is skipped when unset.
    #[serde(default)]
    pub webhook_secret: Option<String>,

    /// HTTP timeout for gateway calls in seconds
    #[serde(default = "default_gateway_timeout")]
    pub timeout_secs: u64,
}

/// ERP (invoicing backend) configuration. The integration is considered
/// configured when OAuth client credentials or static tokens are present.
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct ErpConfig {
    /// Base URL of the ERP API
    pub base_url: String,

    /// OAuth token endpoint URL
    pub token_url: String,

    pub client_id: Option<String>,
    pub client_secret: Option<String>,

    /// Static fallback tokens used when the token store is empty or a
    /// refresh fails.
    #[serde(default)]
    pub static_access_token: Option<String>,
    #[serde(default)]
    pub static_refresh_token: Option<String>,

    /// JSON object mapping internal product ids to ERP product ids,
    /// e.g. `{"prod_1": "48231"}`. Per-product `ERP_PRODUCT_<ID>`
    /// environment variables take precedence.
    #[serde(default)]
    pub product_map_json: Option<String>,

    /// Prefix for the external-facing order number
    #[serde(default = "default_store_prefix")]
    pub store_prefix: String,

    /// Whether to request invoice generation when creating the sale
    #[serde(default)]
    pub generate_invoice: bool,
}

/// Transactional email configuration.
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct EmailConfig {
    /// Base URL of the email delivery API
    #[serde(default = "default_email_base_url")]
    pub base_url: String,

    pub api_key: String,

    /// From address for order confirmation messages
    pub from_address: String,
}

/// Application configuration with validation.
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// Server host address
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// Public site base URL, used to build absolute product image URLs in
    /// confirmation emails
    pub site_base_url: String,

    /// Payment gateway settings
    pub gateway: GatewayConfig,

    /// ERP settings; the ERP side effect is skipped when absent
    #[serde(default)]
    pub erp: Option<ErpConfig>,

    /// Email settings; the notification side effect is skipped when absent
    #[serde(default)]
    pub email: Option<EmailConfig>,
}

impl AppConfig {
    /// Minimal constructor used by tests.
    pub fn new(database_url: String, host: String, port: u16, environment: String) -> Self {
        Self {
            database_url,
            host,
            port,
            environment,
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: false,
            site_base_url: "http://localhost:3000".to_string(),
            gateway: GatewayConfig {
                base_url: "http://localhost:9080".to_string(),
                api_key: "sk_test".to_string(),
                webhook_secret: None,
                timeout_secs: default_gateway_timeout(),
            },
            erp: None,
            email: None,
        }
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    /// ERP is configured when credentials or static tokens exist.
    pub fn erp_configured(&self) -> bool {
        self.erp.as_ref().is_some_and(|erp| {
            (erp.client_id.is_some() && erp.client_secret.is_some())
                || erp.static_access_token.is_some()
        })
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_gateway_timeout() -> u64 {
    15
}

fn default_store_prefix() -> String {
    "LOJA".to_string()
}

fn default_email_base_url() -> String {
    "https://api.resend.com".to_string()
}

/// Initializes the tracing subscriber.
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::fmt;

    let default_directive = format!("checkout_api={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt().with_env_filter(filter_directive).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter_directive).try_init();
    }
}

/// Loads application configuration.
///
/// Layers configuration sources in this order:
/// 1. Default config (config/default.toml)
/// 2. Environment-specific config (config/{env}.toml)
/// 3. Environment variables (APP__*)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    let config = Config::builder()
        .set_default("database_url", "sqlite://checkout.db?mode=rwc")?
        .set_default("host", "0.0.0.0")?
        .set_default("port", DEFAULT_PORT as i64)?
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .set_default("site_base_url", "http://localhost:3000")?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn erp_configured_requires_credentials_or_static_token() {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".into(),
            "127.0.0.1".into(),
            8080,
            "test".into(),
        );
        assert!(!cfg.erp_configured());

        cfg.erp = Some(ErpConfig {
            base_url: "http://erp.local".into(),
            token_url: "http://erp.local/oauth/token".into(),
            client_id: Some("id".into()),
            client_secret: Some("secret".into()),
            static_access_token: None,
            static_refresh_token: None,
            product_map_json: None,
            store_prefix: default_store_prefix(),
            generate_invoice: false,
        });
        assert!(cfg.erp_configured());

        cfg.erp.as_mut().unwrap().client_secret = None;
        assert!(!cfg.erp_configured());

        cfg.erp.as_mut().unwrap().static_access_token = Some("tok".into());
        assert!(cfg.erp_configured());
    }
}
