//! Configuration management for the Opportunity Pipeline
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with PIPELINE_ prefix

use config::{ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{PricingConfig, StockLocation};

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Which document store backs the services
    pub store: StoreConfig,

    /// Database configuration, used by the postgres store
    pub database: DatabaseConfig,

    /// Exchange rate provider and cache configuration
    pub exchange_rate: ExchangeRateConfig,

    /// Margin analysis multipliers and threshold
    pub pricing: PricingConfig,

    /// Default stock locations
    pub inventory: InventoryConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Postgres,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    pub backend: StoreBackend,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExchangeRateConfig {
    /// Rate provider base URL (expects `/latest/USD`)
    pub api_base_url: String,

    /// Maximum age of a cached sample, in seconds
    pub freshness_secs: i64,

    /// Rate used when neither the provider nor the audit log has one
    pub default_rate: Decimal,

    /// HTTP timeout for provider calls, in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InventoryConfig {
    /// Where received purchase orders land unless told otherwise
    pub receiving_location: StockLocation,

    /// Where sales draw stock from unless told otherwise
    pub sales_location: StockLocation,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("PIPELINE_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("store.backend", "memory")?
            .set_default("database.url", "postgres://localhost/pipeline")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("exchange_rate.api_base_url", "https://api.exchangerate-api.com/v4")?
            .set_default("exchange_rate.freshness_secs", 3600)?
            .set_default("exchange_rate.default_rate", "3.75")?
            .set_default("exchange_rate.timeout_secs", 10)?
            .set_default("pricing.competitive_multiplier", "0.80")?
            .set_default("pricing.average_multiplier", "1.00")?
            .set_default("pricing.premium_multiplier", "1.10")?
            .set_default("pricing.approve_threshold_percent", "30")?
            .set_default("inventory.receiving_location", "en_almacen_us")?
            .set_default("inventory.sales_location", "la_victoria")?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (PIPELINE_ prefix)
            .add_source(
                Environment::with_prefix("PIPELINE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "0.0.0.0".to_string(),
        }
    }
}

impl Default for ExchangeRateConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.exchangerate-api.com/v4".to_string(),
            freshness_secs: 3600,
            default_rate: Decimal::new(375, 2),
            timeout_secs: 10,
        }
    }
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            receiving_location: StockLocation::EnAlmacenUs,
            sales_location: StockLocation::LaVictoria,
        }
    }
}

impl Default for Config {
    /// In-memory configuration with production-equivalent defaults
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            server: ServerConfig::default(),
            store: StoreConfig {
                backend: StoreBackend::Memory,
            },
            database: DatabaseConfig {
                url: "postgres://localhost/pipeline".to_string(),
                max_connections: 10,
                min_connections: 2,
            },
            exchange_rate: ExchangeRateConfig::default(),
            pricing: PricingConfig::default(),
            inventory: InventoryConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.exchange_rate.freshness_secs, 3600);
        assert_eq!(config.exchange_rate.default_rate, Decimal::new(375, 2));
        assert_eq!(config.pricing, PricingConfig::default());
        assert_eq!(config.inventory.sales_location, StockLocation::LaVictoria);
        assert_eq!(config.store.backend, StoreBackend::Memory);
    }
}
