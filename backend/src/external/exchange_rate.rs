//! Exchange rate provider client
//!
//! Fetches the latest USD rates from exchangerate-api.com and extracts the
//! USD→PEN rate from `rates.PEN`

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde_json::Value;
use shared::validate_exchange_rate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RateProviderError {
    #[error("rate provider request failed: {0}")]
    Request(String),

    #[error("rate provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("rate provider response has no numeric rates.PEN")]
    MissingRate,

    #[error("rate provider returned an implausible rate: {0}")]
    InvalidRate(Decimal),
}

/// Source of fresh USD→PEN rates
#[async_trait]
pub trait RateProvider: Send + Sync {
    async fn fetch_usd_to_pen(&self) -> Result<Decimal, RateProviderError>;

    /// Label recorded as the sample source
    fn source_name(&self) -> &str;
}

/// exchangerate-api.com client
#[derive(Clone)]
pub struct ExchangeRateApiClient {
    client: Client,
    base_url: String,
}

impl ExchangeRateApiClient {
    /// Create a new client against the public API
    pub fn new(timeout: Duration) -> Self {
        Self::with_base_url("https://api.exchangerate-api.com/v4".to_string(), timeout)
    }

    /// Create a new client with custom base URL (for testing)
    pub fn with_base_url(base_url: String, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client, base_url }
    }
}

#[async_trait]
impl RateProvider for ExchangeRateApiClient {
    async fn fetch_usd_to_pen(&self) -> Result<Decimal, RateProviderError> {
        let url = format!("{}/latest/USD", self.base_url.trim_end_matches('/'));

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| RateProviderError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(RateProviderError::Status { status, body });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| RateProviderError::Request(format!("invalid JSON body: {}", e)))?;

        parse_pen_rate(&body)
    }

    fn source_name(&self) -> &str {
        "exchangerate-api.com"
    }
}

/// Extract `rates.PEN` as an exact decimal
pub fn parse_pen_rate(body: &Value) -> Result<Decimal, RateProviderError> {
    let number = body
        .get("rates")
        .and_then(|rates| rates.get("PEN"))
        .and_then(Value::as_number)
        .ok_or(RateProviderError::MissingRate)?;

    let rate: Decimal = number
        .to_string()
        .parse()
        .map_err(|_| RateProviderError::MissingRate)?;

    validate_exchange_rate(rate).map_err(|_| RateProviderError::InvalidRate(rate))?;
    Ok(rate)
}
