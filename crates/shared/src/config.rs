//! Application configuration management.

use rust_decimal::Decimal;
use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Ledger configuration.
    #[serde(default)]
    pub ledger: LedgerConfig,
    /// Billing configuration.
    pub billing: BillingConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Ledger configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// Permitted debit/credit mismatch in major currency units.
    ///
    /// Accumulated rounding from percentage splits is tolerated up to this
    /// amount (default one cent). The source system inherited this loose
    /// tolerance; it is configurable rather than hard-coded so a stricter
    /// policy can be enforced per deployment.
    #[serde(default = "default_balance_tolerance")]
    pub balance_tolerance: Decimal,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            balance_tolerance: default_balance_tolerance(),
        }
    }
}

fn default_balance_tolerance() -> Decimal {
    // 0.01 major units = one cent
    Decimal::new(1, 2)
}

/// Billing configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BillingConfig {
    /// SHA-256 hex digest of the service credential that authenticates the
    /// scheduled billing job. The plaintext never lives in this struct.
    pub service_token_sha256: String,
    /// Payment collaborator configuration.
    pub payment: PaymentConfig,
}

/// Payment collaborator configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Base URL of the payment processor API.
    pub base_url: String,
    /// Platform merchant identifier. Missing configuration is treated as a
    /// charge failure, not a transient error.
    pub merchant_id: Option<String>,
    /// Request timeout in seconds for charge calls.
    #[serde(default = "default_payment_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_payment_timeout_secs() -> u64 {
    30
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("QUILL").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_balance_tolerance_is_one_cent() {
        assert_eq!(LedgerConfig::default().balance_tolerance, dec!(0.01));
    }

    #[test]
    fn test_default_payment_timeout() {
        assert_eq!(default_payment_timeout_secs(), 30);
    }
}
