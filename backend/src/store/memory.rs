//! In-memory document store used for development and tests

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use super::{
    compare_values, ChangeEvent, ChangeFeed, ChangeKind, ChangeStream, Document, DocumentStore,
    Query, StagedWrite, StoreError, StoreResult, Transaction,
};

#[derive(Debug, Clone)]
struct Stored {
    version: i64,
    data: Value,
}

type Collections = HashMap<String, BTreeMap<String, Stored>>;

struct Inner {
    collections: RwLock<Collections>,
    feed: ChangeFeed,
}

/// Document store held entirely in process memory
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                collections: RwLock::new(HashMap::new()),
                feed: ChangeFeed::default(),
            }),
        }
    }

    /// Number of documents in a collection
    pub async fn count(&self, collection: &str) -> usize {
        self.inner
            .collections
            .read()
            .await
            .get(collection)
            .map_or(0, BTreeMap::len)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn merge_fields(data: &mut Value, fields: Map<String, Value>) {
    match data {
        Value::Object(map) => map.extend(fields),
        other => *other = Value::Object(fields),
    }
}

fn not_found(collection: &str, id: &str) -> StoreError {
    StoreError::NotFound {
        collection: collection.to_string(),
        id: id.to_string(),
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn create(&self, collection: &str, id: &str, data: Value) -> StoreResult<()> {
        let mut state = self.inner.collections.write().await;
        let docs = state.entry(collection.to_string()).or_default();
        if docs.contains_key(id) {
            return Err(StoreError::AlreadyExists {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }
        docs.insert(
            id.to_string(),
            Stored {
                version: 1,
                data: data.clone(),
            },
        );
        drop(state);

        self.inner.feed.publish(ChangeEvent {
            collection: collection.to_string(),
            id: id.to_string(),
            kind: ChangeKind::Created,
            data: Some(data),
        });
        Ok(())
    }

    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        let state = self.inner.collections.read().await;
        Ok(state
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|stored| Document {
                id: id.to_string(),
                version: stored.version,
                data: stored.data.clone(),
            }))
    }

    async fn update(&self, collection: &str, id: &str, fields: Map<String, Value>) -> StoreResult<()> {
        let mut state = self.inner.collections.write().await;
        let stored = state
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| not_found(collection, id))?;
        merge_fields(&mut stored.data, fields);
        stored.version += 1;
        let data = stored.data.clone();
        drop(state);

        self.inner.feed.publish(ChangeEvent {
            collection: collection.to_string(),
            id: id.to_string(),
            kind: ChangeKind::Updated,
            data: Some(data),
        });
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
        let mut state = self.inner.collections.write().await;
        state
            .get_mut(collection)
            .and_then(|docs| docs.remove(id))
            .ok_or_else(|| not_found(collection, id))?;
        drop(state);

        self.inner.feed.publish(ChangeEvent {
            collection: collection.to_string(),
            id: id.to_string(),
            kind: ChangeKind::Deleted,
            data: None,
        });
        Ok(())
    }

    async fn query(&self, collection: &str, query: &Query) -> StoreResult<Vec<Document>> {
        let state = self.inner.collections.read().await;
        let mut docs: Vec<Document> = state
            .get(collection)
            .into_iter()
            .flat_map(|docs| docs.iter())
            .filter(|(_, stored)| query.matches(&stored.data))
            .map(|(id, stored)| Document {
                id: id.clone(),
                version: stored.version,
                data: stored.data.clone(),
            })
            .collect();
        drop(state);

        if let Some(order) = &query.order_by {
            docs.sort_by(|a, b| {
                let ordering = compare_values(a.data.get(&order.field), b.data.get(&order.field));
                if order.descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            });
        }
        if let Some(limit) = query.limit {
            docs.truncate(limit);
        }
        Ok(docs)
    }

    async fn begin(&self) -> StoreResult<Box<dyn Transaction>> {
        Ok(Box::new(MemoryTransaction {
            inner: self.inner.clone(),
            reads: HashMap::new(),
            writes: Vec::new(),
        }))
    }

    fn subscribe(&self, collection: &str, filter: Query) -> ChangeStream {
        self.inner.feed.subscribe(collection, filter)
    }
}

struct MemoryTransaction {
    inner: Arc<Inner>,
    /// Version observed for each read; `None` when the document was absent
    reads: HashMap<(String, String), Option<i64>>,
    writes: Vec<StagedWrite>,
}

#[async_trait]
impl Transaction for MemoryTransaction {
    async fn get(&mut self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        if !self.writes.is_empty() {
            return Err(StoreError::ReadAfterWrite);
        }
        let state = self.inner.collections.read().await;
        let doc = state
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|stored| Document {
                id: id.to_string(),
                version: stored.version,
                data: stored.data.clone(),
            });
        self.reads
            .entry((collection.to_string(), id.to_string()))
            .or_insert_with(|| doc.as_ref().map(|d| d.version));
        Ok(doc)
    }

    fn create(&mut self, collection: &str, id: &str, data: Value) -> StoreResult<()> {
        self.writes.push(StagedWrite::Create {
            collection: collection.to_string(),
            id: id.to_string(),
            data,
        });
        Ok(())
    }

    fn update(&mut self, collection: &str, id: &str, fields: Map<String, Value>) -> StoreResult<()> {
        self.writes.push(StagedWrite::Update {
            collection: collection.to_string(),
            id: id.to_string(),
            fields,
        });
        Ok(())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemoryTransaction { inner, reads, writes } = *self;
        let mut state = inner.collections.write().await;

        for ((collection, id), observed) in &reads {
            let current = state
                .get(collection)
                .and_then(|docs| docs.get(id))
                .map(|stored| stored.version);
            if current != *observed {
                return Err(StoreError::Conflict {
                    collection: collection.clone(),
                    id: id.clone(),
                });
            }
        }

        // Resolve every write before touching shared state so a failing
        // write leaves nothing applied.
        let mut pending: HashMap<(String, String), Stored> = HashMap::new();
        let mut events = Vec::with_capacity(writes.len());
        for write in writes {
            match write {
                StagedWrite::Create { collection, id, data } => {
                    let key = (collection.clone(), id.clone());
                    let exists = pending.contains_key(&key)
                        || state
                            .get(&collection)
                            .is_some_and(|docs| docs.contains_key(&id));
                    if exists {
                        return Err(StoreError::AlreadyExists { collection, id });
                    }
                    pending.insert(
                        key,
                        Stored {
                            version: 1,
                            data: data.clone(),
                        },
                    );
                    events.push(ChangeEvent {
                        collection,
                        id,
                        kind: ChangeKind::Created,
                        data: Some(data),
                    });
                }
                StagedWrite::Update { collection, id, fields } => {
                    let key = (collection.clone(), id.clone());
                    let mut stored = match pending.remove(&key) {
                        Some(stored) => stored,
                        None => state
                            .get(&collection)
                            .and_then(|docs| docs.get(&id))
                            .cloned()
                            .ok_or_else(|| not_found(&collection, &id))?,
                    };
                    merge_fields(&mut stored.data, fields);
                    stored.version += 1;
                    events.push(ChangeEvent {
                        collection: collection.clone(),
                        id: id.clone(),
                        kind: ChangeKind::Updated,
                        data: Some(stored.data.clone()),
                    });
                    pending.insert(key, stored);
                }
            }
        }

        for ((collection, id), stored) in pending {
            state.entry(collection).or_default().insert(id, stored);
        }
        drop(state);

        for event in events {
            inner.feed.publish(event);
        }
        Ok(())
    }
}
