use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

/// The application's configuration.
///
/// Provider credentials are optional on purpose: a missing credential is
/// reported as a configuration error when the matching endpoint is hit,
/// not at startup.
#[derive(Clone)]
pub struct Config {
    /// The base URL of the hosted record store.
    pub record_store_base_url: String,
    /// The API token for the record store (`xc-token` header).
    pub record_store_token: String,
    /// The record store table holding sessions.
    pub sessions_table: String,
    /// The record store table holding orders.
    pub orders_table: String,
    /// The record store table holding customers.
    pub customers_table: String,

    /// The base URL of the Black Cat payment API.
    pub blackcat_base_url: String,
    /// The Black Cat public key, if configured.
    pub blackcat_public_key: Option<String>,
    /// The Black Cat secret key, if configured.
    pub blackcat_secret_key: Option<String>,
    /// The base URL of the Hyper Cash payment API.
    pub hypercash_base_url: String,
    /// The Hyper Cash secret key, if configured.
    pub hypercash_secret_key: Option<String>,

    /// Maximum accepted requests per IP per rate-limit window.
    pub rate_limit_max_requests: u32,
    /// The rate-limit window duration in seconds.
    pub rate_limit_window_secs: u64,
    /// How long an idempotency entry is honored, in seconds.
    pub idempotency_ttl_secs: u64,

    /// The interval between inactivity sweeps, in seconds.
    pub sweep_interval_secs: u64,
    /// How long a session may be idle before the sweep marks it inactive.
    pub inactivity_timeout_secs: u64,

    /// Per-attempt timeout for record store calls, in milliseconds.
    pub record_store_timeout_ms: u64,
    /// Per-attempt timeout for provider calls, in milliseconds.
    pub provider_timeout_ms: u64,
    /// Extra attempts after the first for outbound calls.
    pub outbound_max_retries: u32,
    /// Base backoff delay between outbound attempts, in milliseconds.
    pub outbound_base_delay_ms: u64,
}

fn env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T: std::str::FromStr>(name: &str, default: &str) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    env_or(name, default)
        .parse()
        .with_context(|| format!("Invalid {}", name))
}

impl Config {
    /// Creates a new `Config` from environment variables.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `Config`.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            record_store_base_url: env_or("RECORD_STORE_BASE_URL", "http://127.0.0.1:8080"),
            record_store_token: env_or("RECORD_STORE_TOKEN", ""),
            sessions_table: env_or("SESSIONS_TABLE", "sessions"),
            orders_table: env_or("ORDERS_TABLE", "orders"),
            customers_table: env_or("CUSTOMERS_TABLE", "customers"),

            blackcat_base_url: env_or("BLACKCAT_BASE_URL", "https://api.blackcatpagamentos.com"),
            blackcat_public_key: env::var("BLACKCAT_PUBLIC_KEY").ok(),
            blackcat_secret_key: env::var("BLACKCAT_SECRET_KEY").ok(),
            hypercash_base_url: env_or(
                "HYPERCASH_BASE_URL",
                "https://api.hypercashbrasil.com.br",
            ),
            hypercash_secret_key: env::var("HYPERCASH_SECRET_KEY").ok(),

            rate_limit_max_requests: parse_env("RATE_LIMIT_MAX_REQUESTS", "10")?,
            rate_limit_window_secs: parse_env("RATE_LIMIT_WINDOW_SECS", "60")?,
            idempotency_ttl_secs: parse_env("IDEMPOTENCY_TTL_SECS", "600")?,

            sweep_interval_secs: parse_env("SWEEP_INTERVAL_SECS", "300")?,
            inactivity_timeout_secs: parse_env("INACTIVITY_TIMEOUT_SECS", "300")?,

            record_store_timeout_ms: parse_env("RECORD_STORE_TIMEOUT_MS", "10000")?,
            provider_timeout_ms: parse_env("PROVIDER_TIMEOUT_MS", "12000")?,
            outbound_max_retries: parse_env("OUTBOUND_MAX_RETRIES", "2")?,
            outbound_base_delay_ms: parse_env("OUTBOUND_BASE_DELAY_MS", "300")?,
        })
    }

    /// The inactivity timeout as a `Duration`.
    pub fn inactivity_timeout(&self) -> Duration {
        Duration::from_secs(self.inactivity_timeout_secs)
    }

    /// The sweep interval as a `Duration`.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}
