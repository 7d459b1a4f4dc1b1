//! USD→PEN rate cache backed by the exchange rate audit log
//!
//! `get_rate` never fails: a fresh sample (younger than the freshness
//! window) is served as-is, otherwise the provider is asked and the result
//! appended to the audit log. Provider failures fall back to the latest
//! persisted sample regardless of age, then to the configured default.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use shared::{validate_exchange_rate, Actor, ExchangeRateSample};

use crate::config::ExchangeRateConfig;
use crate::error::{AppError, AppResult};
use crate::external::RateProvider;
use crate::store::{self, collections, Query, SharedStore};

/// Where an effective rate came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RateSource {
    /// Latest sample was within the freshness window
    Cached,
    /// Fetched from the provider on this call
    Fetched,
    /// Provider failed; latest sample served regardless of age
    StaleFallback,
    /// Provider failed and no sample exists
    Default,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveRate {
    pub rate: Decimal,
    pub source: RateSource,
    pub sampled_at: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct RateCache {
    store: SharedStore,
    provider: Arc<dyn RateProvider>,
    freshness: Duration,
    default_rate: Decimal,
}

impl RateCache {
    pub fn new(store: SharedStore, provider: Arc<dyn RateProvider>, config: &ExchangeRateConfig) -> Self {
        Self {
            store,
            provider,
            freshness: Duration::seconds(config.freshness_secs),
            default_rate: config.default_rate,
        }
    }

    /// Most recent sample in the audit log
    pub async fn latest_sample(&self) -> AppResult<Option<ExchangeRateSample>> {
        let query = Query::new().order_by_desc("date").limit(1);
        let mut samples: Vec<ExchangeRateSample> =
            store::list(self.store.as_ref(), collections::EXCHANGE_RATES, &query).await?;
        Ok(samples.pop())
    }

    /// Effective rate for dependent workflows. Never fails.
    pub async fn get_rate(&self) -> EffectiveRate {
        let latest = match self.latest_sample().await {
            Ok(sample) => sample,
            Err(e) => {
                tracing::warn!(error = %e, "Could not read exchange rate audit log");
                None
            }
        };

        if let Some(sample) = &latest {
            if sample.age(Utc::now()) < self.freshness {
                return EffectiveRate {
                    rate: sample.rate_usd_to_pen,
                    source: RateSource::Cached,
                    sampled_at: Some(sample.date),
                };
            }
        }

        let sample = match self.fetch_sample(None).await {
            Ok(sample) => sample,
            Err(e) => {
                tracing::warn!(error = %e, "Exchange rate fetch failed, falling back");
                return match latest {
                    Some(sample) => EffectiveRate {
                        rate: sample.rate_usd_to_pen,
                        source: RateSource::StaleFallback,
                        sampled_at: Some(sample.date),
                    },
                    None => EffectiveRate {
                        rate: self.default_rate,
                        source: RateSource::Default,
                        sampled_at: None,
                    },
                };
            }
        };

        // A fetched rate is served even when the audit log rejects it
        if let Err(e) = self.record(&sample).await {
            tracing::warn!(error = %e, rate = %sample.rate_usd_to_pen, "Could not record exchange rate sample");
        }
        EffectiveRate {
            rate: sample.rate_usd_to_pen,
            source: RateSource::Fetched,
            sampled_at: Some(sample.date),
        }
    }

    /// Shorthand for `get_rate().await.rate`
    pub async fn current_rate(&self) -> Decimal {
        self.get_rate().await.rate
    }

    /// Fetch and persist unconditionally; provider and store failures are returned
    pub async fn refresh_rate(&self, requested_by: Option<&Actor>) -> AppResult<ExchangeRateSample> {
        let sample = self
            .fetch_sample(requested_by.map(|a| a.user_id.clone()))
            .await?;
        self.record(&sample).await?;
        Ok(sample)
    }

    async fn fetch_sample(&self, requested_by: Option<String>) -> AppResult<ExchangeRateSample> {
        let rate = self
            .provider
            .fetch_usd_to_pen()
            .await
            .map_err(|e| AppError::Provider(e.to_string()))?;
        validate_exchange_rate(rate)
            .map_err(|msg| AppError::Provider(format!("{}: {}", msg, rate)))?;

        Ok(ExchangeRateSample {
            id: self.store.new_id(),
            date: Utc::now(),
            rate_usd_to_pen: rate,
            source: self.provider.source_name().to_string(),
            requested_by,
        })
    }

    async fn record(&self, sample: &ExchangeRateSample) -> AppResult<()> {
        store::insert(self.store.as_ref(), collections::EXCHANGE_RATES, &sample.id, sample).await?;
        tracing::info!(rate = %sample.rate_usd_to_pen, sample_id = %sample.id, "Recorded exchange rate sample");
        Ok(())
    }

    /// Audit log, newest first
    pub async fn history(&self, limit: usize) -> AppResult<Vec<ExchangeRateSample>> {
        let query = Query::new().order_by_desc("date").limit(limit);
        Ok(store::list(self.store.as_ref(), collections::EXCHANGE_RATES, &query).await?)
    }
}
