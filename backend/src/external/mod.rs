//! External API integrations

pub mod exchange_rate;

pub use exchange_rate::{ExchangeRateApiClient, RateProvider, RateProviderError};
