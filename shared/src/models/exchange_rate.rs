//! Exchange rate audit models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One fetched USD→PEN rate. Append-only audit record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeRateSample {
    pub id: String,
    /// Stored as epoch milliseconds so samples order numerically
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub date: DateTime<Utc>,
    #[serde(rename = "rateUSD_to_PEN")]
    pub rate_usd_to_pen: Decimal,
    pub source: String,
    pub requested_by: Option<String>,
}

impl ExchangeRateSample {
    /// Age of the sample relative to `now`
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.date
    }
}
