//! Document store contract
//!
//! A collection-oriented store with generated ids, top-level field merges,
//! equality queries, a live change feed and multi-document transactions.
//! Transactions stage every write until commit; reads must come before the
//! first write, and commit aborts with [`StoreError::Conflict`] when any
//! document read inside the transaction changed in the meantime.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

mod feed;
pub mod memory;
pub mod postgres;

pub use feed::{ChangeEvent, ChangeFeed, ChangeKind, ChangeStream};
pub use memory::MemoryStore;
pub use postgres::PgDocumentStore;

/// Collection names
pub mod collections {
    pub const REQUIREMENTS: &str = "requirements";
    pub const OPPORTUNITIES: &str = "opportunities";
    pub const CATEGORIES: &str = "categories";
    pub const PRODUCTS: &str = "products";
    pub const BRANDS: &str = "brands";
    pub const SKUS: &str = "skus";
    pub const PURCHASE_ORDERS: &str = "purchase_orders";
    pub const SALES: &str = "sales";
    pub const QUOTATIONS: &str = "quotation_requests";
    pub const CUSTOMERS: &str = "customers";
    pub const EXCHANGE_RATES: &str = "exchange_rates";
}

/// Store layer errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{collection}/{id} not found")]
    NotFound { collection: String, id: String },

    #[error("{collection}/{id} already exists")]
    AlreadyExists { collection: String, id: String },

    #[error("transaction conflict on {collection}/{id}")]
    Conflict { collection: String, id: String },

    /// The database aborted the commit to resolve a concurrent write
    #[error("transaction aborted by the database: {0}")]
    Aborted(String),

    #[error("reads must precede writes within a transaction")]
    ReadAfterWrite,

    #[error("document fields must be a JSON object")]
    NotAnObject,

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A stored document with its optimistic-concurrency version
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub version: i64,
    pub data: Value,
}

impl Document {
    pub fn decode<T: DeserializeOwned>(&self) -> StoreResult<T> {
        Ok(serde_json::from_value(self.data.clone())?)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub field: String,
    pub descending: bool,
}

/// Equality filters plus optional single-field ordering and limit.
///
/// Without an ordering, result order is unspecified.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<(String, Value)>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push((field.into(), value.into()));
        self
    }

    pub fn order_by_desc(mut self, field: impl Into<String>) -> Self {
        self.order_by = Some(OrderBy {
            field: field.into(),
            descending: true,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether `data` satisfies every equality filter
    pub fn matches(&self, data: &Value) -> bool {
        self.filters
            .iter()
            .all(|(field, expected)| data.get(field) == Some(expected))
    }
}

/// Collection-oriented document store
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Generate a fresh document id
    fn new_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }

    async fn create(&self, collection: &str, id: &str, data: Value) -> StoreResult<()>;

    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>>;

    /// Merge top-level `fields` into an existing document
    async fn update(&self, collection: &str, id: &str, fields: Map<String, Value>) -> StoreResult<()>;

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()>;

    async fn query(&self, collection: &str, query: &Query) -> StoreResult<Vec<Document>>;

    async fn begin(&self) -> StoreResult<Box<dyn Transaction>>;

    /// Live stream of changes in `collection` matching `filter`
    fn subscribe(&self, collection: &str, filter: Query) -> ChangeStream;
}

/// Read-then-write transaction with optimistic validation at commit
#[async_trait]
pub trait Transaction: Send {
    async fn get(&mut self, collection: &str, id: &str) -> StoreResult<Option<Document>>;

    fn create(&mut self, collection: &str, id: &str, data: Value) -> StoreResult<()>;

    fn update(&mut self, collection: &str, id: &str, fields: Map<String, Value>) -> StoreResult<()>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;
}

pub type SharedStore = Arc<dyn DocumentStore>;

/// A write staged inside a transaction
#[derive(Debug, Clone)]
pub(crate) enum StagedWrite {
    Create {
        collection: String,
        id: String,
        data: Value,
    },
    Update {
        collection: String,
        id: String,
        fields: Map<String, Value>,
    },
}

// ============================================================================
// Typed helpers
// ============================================================================

/// Serialize a model into document data
pub fn encode<T: Serialize>(value: &T) -> StoreResult<Value> {
    Ok(serde_json::to_value(value)?)
}

/// Serialize a partial update; must produce a JSON object
pub fn patch<T: Serialize>(value: T) -> StoreResult<Map<String, Value>> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        _ => Err(StoreError::NotAnObject),
    }
}

pub async fn fetch<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    collection: &str,
    id: &str,
) -> StoreResult<Option<T>> {
    store
        .get(collection, id)
        .await?
        .map(|doc| doc.decode())
        .transpose()
}

pub async fn insert<T: Serialize>(
    store: &dyn DocumentStore,
    collection: &str,
    id: &str,
    value: &T,
) -> StoreResult<()> {
    store.create(collection, id, encode(value)?).await
}

pub async fn list<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    collection: &str,
    query: &Query,
) -> StoreResult<Vec<T>> {
    store
        .query(collection, query)
        .await?
        .iter()
        .map(Document::decode)
        .collect()
}

/// Read and decode inside a transaction
pub async fn tx_fetch<T: DeserializeOwned>(
    tx: &mut dyn Transaction,
    collection: &str,
    id: &str,
) -> StoreResult<Option<T>> {
    tx.get(collection, id).await?.map(|doc| doc.decode()).transpose()
}

/// Order two JSON values for `order_by`: numbers numerically, strings
/// lexicographically, anything else as equal.
pub(crate) fn compare_values(a: Option<&Value>, b: Option<&Value>) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        _ => Ordering::Equal,
    }
}
