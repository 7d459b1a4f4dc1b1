//! Exchange rate cache tests
//!
//! Freshness window, unconditional refresh, and the fallback chain
//! (stale sample, then configured default) when the provider fails.

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use pipeline_backend::error::AppError;
use pipeline_backend::services::RateSource;
use pipeline_backend::store::{
    self, collections, ChangeStream, Document, DocumentStore, MemoryStore, Query, SharedStore,
    StoreError, StoreResult, Transaction,
};
use serde_json::{Map, Value};
use shared::ExchangeRateSample;

use common::{actor, dec, memory_store, rate_cache, StubRateProvider};

async fn record_sample(store: &pipeline_backend::store::SharedStore, rate: &str, age: Duration) {
    let sample = ExchangeRateSample {
        id: format!("sample-{}", rate),
        date: Utc::now() - age,
        rate_usd_to_pen: dec(rate),
        source: "seed".to_string(),
        requested_by: None,
    };
    store::insert(store.as_ref(), collections::EXCHANGE_RATES, &sample.id, &sample)
        .await
        .unwrap();
}

#[tokio::test]
async fn fresh_sample_is_served_without_refetching() {
    let store = memory_store();
    let provider = StubRateProvider::returning(dec("3.7421"));
    let cache = rate_cache(&store, provider.clone());

    let first = cache.get_rate().await;
    assert_eq!(first.source, RateSource::Fetched);
    assert_eq!(first.rate, dec("3.7421"));

    provider.set_rate(Some(dec("9.99")));
    let second = cache.get_rate().await;
    assert_eq!(second.source, RateSource::Cached);
    assert_eq!(second.rate, dec("3.7421"));
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn stale_sample_triggers_a_fetch() {
    let store = memory_store();
    record_sample(&store, "3.60", Duration::hours(2)).await;
    let provider = StubRateProvider::returning(dec("3.80"));
    let cache = rate_cache(&store, provider.clone());

    let rate = cache.get_rate().await;
    assert_eq!(rate.source, RateSource::Fetched);
    assert_eq!(rate.rate, dec("3.80"));
    assert_eq!(provider.calls(), 1);

    let latest = cache.latest_sample().await.unwrap().unwrap();
    assert_eq!(latest.rate_usd_to_pen, dec("3.80"));
    assert_eq!(latest.source, "stub");
}

#[tokio::test]
async fn provider_failure_falls_back_to_stale_sample() {
    let store = memory_store();
    record_sample(&store, "3.65", Duration::days(3)).await;
    let provider = StubRateProvider::failing();
    let cache = rate_cache(&store, provider.clone());

    let rate = cache.get_rate().await;
    assert_eq!(rate.source, RateSource::StaleFallback);
    assert_eq!(rate.rate, dec("3.65"));
    assert_eq!(provider.calls(), 1);

    // Nothing new was recorded
    assert_eq!(cache.history(10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn provider_failure_with_empty_log_uses_default() {
    let store = memory_store();
    let cache = rate_cache(&store, StubRateProvider::failing());

    let rate = cache.get_rate().await;
    assert_eq!(rate.source, RateSource::Default);
    assert_eq!(rate.rate, dec("3.75"));
    assert!(rate.sampled_at.is_none());
    assert_eq!(cache.current_rate().await, dec("3.75"));
}

#[tokio::test]
async fn refresh_always_calls_the_provider() {
    let store = memory_store();
    let provider = StubRateProvider::returning(dec("3.70"));
    let cache = rate_cache(&store, provider.clone());

    cache.refresh_rate(None).await.unwrap();
    provider.set_rate(Some(dec("3.72")));
    let sample = cache.refresh_rate(Some(&actor())).await.unwrap();

    assert_eq!(provider.calls(), 2);
    assert_eq!(sample.rate_usd_to_pen, dec("3.72"));
    assert_eq!(sample.requested_by.as_deref(), Some("user-1"));
    assert_eq!(cache.history(10).await.unwrap().len(), 2);
}

#[tokio::test]
async fn refresh_surfaces_provider_errors() {
    let store = memory_store();
    let cache = rate_cache(&store, StubRateProvider::failing());

    let err = cache.refresh_rate(Some(&actor())).await.unwrap_err();
    assert!(matches!(err, AppError::Provider(_)));
    assert!(cache.latest_sample().await.unwrap().is_none());
}

#[tokio::test]
async fn history_is_newest_first_and_limited() {
    let store = memory_store();
    record_sample(&store, "3.50", Duration::days(2)).await;
    record_sample(&store, "3.55", Duration::days(1)).await;
    record_sample(&store, "3.60", Duration::hours(3)).await;
    let cache = rate_cache(&store, StubRateProvider::failing());

    let history = cache.history(2).await.unwrap();
    let rates: Vec<_> = history.iter().map(|s| s.rate_usd_to_pen).collect();
    assert_eq!(rates, vec![dec("3.60"), dec("3.55")]);
}

/// Memory store whose exchange rate log refuses new samples
struct ReadOnlyRateLog {
    inner: MemoryStore,
}

#[async_trait]
impl DocumentStore for ReadOnlyRateLog {
    async fn create(&self, collection: &str, id: &str, data: Value) -> StoreResult<()> {
        if collection == collections::EXCHANGE_RATES {
            return Err(StoreError::NotAnObject);
        }
        self.inner.create(collection, id, data).await
    }

    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        self.inner.get(collection, id).await
    }

    async fn update(&self, collection: &str, id: &str, fields: Map<String, Value>) -> StoreResult<()> {
        self.inner.update(collection, id, fields).await
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
        self.inner.delete(collection, id).await
    }

    async fn query(&self, collection: &str, query: &Query) -> StoreResult<Vec<Document>> {
        self.inner.query(collection, query).await
    }

    async fn begin(&self) -> StoreResult<Box<dyn Transaction>> {
        self.inner.begin().await
    }

    fn subscribe(&self, collection: &str, filter: Query) -> ChangeStream {
        self.inner.subscribe(collection, filter)
    }
}

#[tokio::test]
async fn fetched_rate_is_served_when_recording_fails() {
    let store: SharedStore = Arc::new(ReadOnlyRateLog {
        inner: MemoryStore::new(),
    });
    record_sample_direct(&store, "3.50", Duration::hours(5)).await;
    let provider = StubRateProvider::returning(dec("3.81"));
    let cache = rate_cache(&store, provider.clone());

    let rate = cache.get_rate().await;
    assert_eq!(rate.source, RateSource::Fetched);
    assert_eq!(rate.rate, dec("3.81"));
    assert_eq!(provider.calls(), 1);

    let err = cache.refresh_rate(Some(&actor())).await.unwrap_err();
    assert!(matches!(err, AppError::Store(_)));
}

/// Seed through a transaction, which the wrapper passes through
async fn record_sample_direct(store: &SharedStore, rate: &str, age: Duration) {
    let sample = ExchangeRateSample {
        id: format!("sample-{}", rate),
        date: Utc::now() - age,
        rate_usd_to_pen: dec(rate),
        source: "seed".to_string(),
        requested_by: None,
    };
    let mut tx = store.begin().await.unwrap();
    tx.create(collections::EXCHANGE_RATES, &sample.id, store::encode(&sample).unwrap())
        .unwrap();
    tx.commit().await.unwrap();
}

#[tokio::test]
async fn implausible_provider_rate_is_not_recorded() {
    let store = memory_store();
    record_sample(&store, "3.70", Duration::hours(2)).await;
    let cache = rate_cache(&store, StubRateProvider::returning(dec("37000")));

    let rate = cache.get_rate().await;
    assert_eq!(rate.source, RateSource::StaleFallback);
    assert_eq!(rate.rate, dec("3.70"));

    let err = cache.refresh_rate(Some(&actor())).await.unwrap_err();
    assert!(matches!(err, AppError::Provider(_)));
    assert_eq!(cache.history(10).await.unwrap().len(), 1);
}
