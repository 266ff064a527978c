use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// `AppConfig` holds all configuration parameters required by the application.
///
/// The configuration is loaded from environment variables (optionally via a `.env` file)
/// or uses default values if the variable is not set. It is read once at startup and
/// handed to the components that need it.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AppConfig {
    // --- Database settings ---
    /// Database hostname or service name.
    pub db_host: String,
    /// Database port (default: 5432).
    pub db_port: u16,
    /// Database user.
    pub db_user: String,
    /// Database password.
    pub db_password: String,
    /// Database name.
    pub db_name: String,
    /// Maximum number of pooled connections.
    pub db_pool_size: usize,
    /// Directory holding the `.sql` migrations applied at startup.
    pub migrations_dir: String,

    // --- Authentication ---
    /// HMAC secret used to sign access tokens.
    pub auth_secret: String,
    /// Password hashing cost (argon2 iterations).
    pub auth_cost: u32,
    /// Access token lifetime in hours.
    pub auth_exp_hours: i64,

    // --- HTTP server ---
    /// The port on which the HTTP server will listen.
    pub http_port: u16,

    // --- Shutdown timeout ---
    /// Graceful shutdown timeout (human-friendly format, e.g. "5s", "1m").
    #[serde(deserialize_with = "deserialize_duration")]
    pub shutdown_timeout: Duration,

    // --- Payment gateway ---
    pub midtrans_base_url: String,
    /// Sent verbatim as the `Authorization` header of charge requests.
    pub midtrans_server_key: String,
    /// Prefix of the order references exchanged with the gateway, e.g. `EOP-42`.
    pub order_reference_prefix: String,
    /// Secret path segment of the payment callback, mounted at `/v1/<path>`.
    pub payment_webhook_path: String,

    // --- Sentiment analysis ---
    pub sentiment_base_url: String,
    pub sentiment_api_key: String,

    /// Timeout of every outbound HTTP call.
    #[serde(deserialize_with = "deserialize_duration")]
    pub outbound_timeout: Duration,
}

/// Accepts human-readable durations like "5s", "1m", etc.
fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    let val = String::deserialize(deserializer)?;
    humantime::parse_duration(&val)
        .map_err(|e| D::Error::custom(format!("Invalid duration '{val}': {e}")))
}

impl AppConfig {
    /// Loads configuration from environment variables (and optionally from `.env` file).
    ///
    /// Fields not set via env will be filled with default values.
    ///
    /// # Errors
    /// Returns an error if environment variables are invalid.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::load_with(None)
    }

    /// Loads configuration from `vars` instead of the process environment when given.
    ///
    /// Keys are matched case-insensitively, so `HTTP_PORT` sets `http_port`.
    pub fn load_with(vars: Option<HashMap<String, String>>) -> Result<Self> {
        let settings = config::Config::builder()
            // Database
            .set_default("db_host", "localhost")?
            .set_default("db_port", 5432)?
            .set_default("db_user", "eoplatform")?
            .set_default("db_password", "eoplatform")?
            .set_default("db_name", "eoplatform")?
            .set_default("db_pool_size", 16)?
            .set_default("migrations_dir", "migrations")?
            // Auth
            .set_default("auth_secret", "dev-secret-change-me")?
            .set_default("auth_cost", 2)?
            .set_default("auth_exp_hours", 1)?
            // HTTP
            .set_default("http_port", 8080)?
            // Shutdown
            .set_default("shutdown_timeout", "5s")?
            // Payment gateway
            .set_default("midtrans_base_url", "https://api.sandbox.midtrans.com")?
            .set_default("midtrans_server_key", "")?
            .set_default("order_reference_prefix", "EOP")?
            .set_default("payment_webhook_path", "MDDRlkYVFm9QOLK08MDp")?
            // Sentiment
            .set_default("sentiment_base_url", "https://language.googleapis.com")?
            .set_default("sentiment_api_key", "")?
            .set_default("outbound_timeout", "10s")?
            .add_source(
                config::Environment::default()
                    .try_parsing(true)
                    .source(vars),
            )
            .build()?;

        settings
            .try_deserialize()
            .context("Failed to load configuration")
    }
}
