//! PostgreSQL-backed document store
//!
//! All collections share one `documents` table keyed by `(collection, id)`
//! with the document body in a JSONB column and a version counter used to
//! validate transactions. The change feed only carries writes made through
//! this process.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::PgPool;

use super::{
    ChangeEvent, ChangeFeed, ChangeKind, ChangeStream, Document, DocumentStore, Query,
    StagedWrite, StoreError, StoreResult, Transaction,
};

#[derive(Debug, sqlx::FromRow)]
struct DocumentRow {
    id: String,
    version: i64,
    data: Value,
}

impl From<DocumentRow> for Document {
    fn from(row: DocumentRow) -> Self {
        Document {
            id: row.id,
            version: row.version,
            data: row.data,
        }
    }
}

#[derive(Clone)]
pub struct PgDocumentStore {
    db: PgPool,
    feed: ChangeFeed,
}

impl PgDocumentStore {
    pub fn new(db: PgPool) -> Self {
        Self {
            db,
            feed: ChangeFeed::default(),
        }
    }
}

fn filter_object(query: &Query) -> Value {
    Value::Object(query.filters.iter().cloned().collect())
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn create(&self, collection: &str, id: &str, data: Value) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO documents (collection, id, data, version)
            VALUES ($1, $2, $3, 1)
            ON CONFLICT (collection, id) DO NOTHING
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(&data)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::AlreadyExists {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }

        self.feed.publish(ChangeEvent {
            collection: collection.to_string(),
            id: id.to_string(),
            kind: ChangeKind::Created,
            data: Some(data),
        });
        Ok(())
    }

    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        let row = sqlx::query_as::<_, DocumentRow>(
            "SELECT id, version, data FROM documents WHERE collection = $1 AND id = $2",
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(Document::from))
    }

    async fn update(&self, collection: &str, id: &str, fields: Map<String, Value>) -> StoreResult<()> {
        let data: Option<Value> = sqlx::query_scalar(
            r#"
            UPDATE documents
            SET data = data || $3, version = version + 1, updated_at = NOW()
            WHERE collection = $1 AND id = $2
            RETURNING data
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(Value::Object(fields))
        .fetch_optional(&self.db)
        .await?;

        let data = data.ok_or_else(|| StoreError::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        })?;

        self.feed.publish(ChangeEvent {
            collection: collection.to_string(),
            id: id.to_string(),
            kind: ChangeKind::Updated,
            data: Some(data),
        });
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }

        self.feed.publish(ChangeEvent {
            collection: collection.to_string(),
            id: id.to_string(),
            kind: ChangeKind::Deleted,
            data: None,
        });
        Ok(())
    }

    async fn query(&self, collection: &str, query: &Query) -> StoreResult<Vec<Document>> {
        let mut sql = String::from(
            "SELECT id, version, data FROM documents WHERE collection = $1 AND data @> $2",
        );
        if let Some(order) = &query.order_by {
            sql.push_str(if order.descending {
                " ORDER BY data -> $3 DESC"
            } else {
                " ORDER BY data -> $3 ASC"
            });
        }
        if let Some(limit) = query.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        let mut statement = sqlx::query_as::<_, DocumentRow>(&sql)
            .bind(collection)
            .bind(filter_object(query));
        if let Some(order) = &query.order_by {
            statement = statement.bind(order.field.as_str());
        }

        let rows = statement.fetch_all(&self.db).await?;
        Ok(rows.into_iter().map(Document::from).collect())
    }

    async fn begin(&self) -> StoreResult<Box<dyn Transaction>> {
        Ok(Box::new(PgTransaction {
            db: self.db.clone(),
            feed: self.feed.clone(),
            reads: BTreeMap::new(),
            writes: Vec::new(),
        }))
    }

    fn subscribe(&self, collection: &str, filter: Query) -> ChangeStream {
        self.feed.subscribe(collection, filter)
    }
}

struct PgTransaction {
    db: PgPool,
    feed: ChangeFeed,
    /// Ordered so every commit locks rows in the same sequence
    reads: BTreeMap<(String, String), Option<i64>>,
    writes: Vec<StagedWrite>,
}

#[async_trait]
impl Transaction for PgTransaction {
    async fn get(&mut self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        if !self.writes.is_empty() {
            return Err(StoreError::ReadAfterWrite);
        }
        let row = sqlx::query_as::<_, DocumentRow>(
            "SELECT id, version, data FROM documents WHERE collection = $1 AND id = $2",
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        let doc = row.map(Document::from);
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
        let PgTransaction { db, feed, reads, writes } = *self;
        let mut tx = db.begin().await.map_err(commit_error)?;

        // Lock every document that was read and confirm it is unchanged.
        // Returning early drops `tx`, which rolls back.
        for ((collection, id), observed) in &reads {
            let current: Option<i64> = sqlx::query_scalar(
                "SELECT version FROM documents WHERE collection = $1 AND id = $2 FOR UPDATE",
            )
            .bind(collection)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(commit_error)?;

            if current != *observed {
                tracing::debug!(%collection, %id, "Transaction read set changed; aborting");
                return Err(StoreError::Conflict {
                    collection: collection.clone(),
                    id: id.clone(),
                });
            }
        }

        let mut events = Vec::with_capacity(writes.len());
        for write in writes {
            match write {
                StagedWrite::Create { collection, id, data } => {
                    let result = sqlx::query(
                        r#"
                        INSERT INTO documents (collection, id, data, version)
                        VALUES ($1, $2, $3, 1)
                        ON CONFLICT (collection, id) DO NOTHING
                        "#,
                    )
                    .bind(&collection)
                    .bind(&id)
                    .bind(&data)
                    .execute(&mut *tx)
                    .await
                    .map_err(commit_error)?;

                    if result.rows_affected() == 0 {
                        return Err(StoreError::AlreadyExists { collection, id });
                    }
                    events.push(ChangeEvent {
                        collection,
                        id,
                        kind: ChangeKind::Created,
                        data: Some(data),
                    });
                }
                StagedWrite::Update { collection, id, fields } => {
                    let data: Option<Value> = sqlx::query_scalar(
                        r#"
                        UPDATE documents
                        SET data = data || $3, version = version + 1, updated_at = NOW()
                        WHERE collection = $1 AND id = $2
                        RETURNING data
                        "#,
                    )
                    .bind(&collection)
                    .bind(&id)
                    .bind(Value::Object(fields))
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(commit_error)?;

                    let Some(data) = data else {
                        return Err(StoreError::NotFound { collection, id });
                    };
                    events.push(ChangeEvent {
                        collection,
                        id,
                        kind: ChangeKind::Updated,
                        data: Some(data),
                    });
                }
            }
        }

        tx.commit().await.map_err(commit_error)?;

        for event in events {
            feed.publish(event);
        }
        Ok(())
    }
}

/// Serialization failure and deadlock: Postgres aborted this side of a race
fn is_retryable(sqlstate: Option<&str>) -> bool {
    matches!(sqlstate, Some("40001" | "40P01"))
}

fn commit_error(err: sqlx::Error) -> StoreError {
    let sqlstate = err
        .as_database_error()
        .and_then(|db| db.code())
        .map(|code| code.into_owned());
    if is_retryable(sqlstate.as_deref()) {
        tracing::debug!(sqlstate = ?sqlstate, error = %err, "Commit aborted by the database");
        StoreError::Aborted(err.to_string())
    } else {
        StoreError::Database(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn filters_become_containment_object() {
        let query = Query::new().filter("status", "ordered").filter("skuId", "s1");
        assert_eq!(
            filter_object(&query),
            json!({"status": "ordered", "skuId": "s1"})
        );
        assert_eq!(filter_object(&Query::new()), json!({}));
    }

    #[test]
    fn deadlocks_and_serialization_failures_are_retryable() {
        assert!(is_retryable(Some("40P01")));
        assert!(is_retryable(Some("40001")));
        assert!(!is_retryable(Some("23505")));
        assert!(!is_retryable(None));
        assert!(matches!(commit_error(sqlx::Error::RowNotFound), StoreError::Database(_)));
    }

    #[test]
    fn read_set_iterates_in_key_order() {
        let mut reads: BTreeMap<(String, String), Option<i64>> = BTreeMap::new();
        for (collection, id) in [("skus", "b"), ("sales", "z"), ("skus", "a")] {
            reads.insert((collection.to_string(), id.to_string()), Some(1));
        }
        let order: Vec<_> = reads.keys().map(|(c, i)| format!("{}/{}", c, i)).collect();
        assert_eq!(order, vec!["sales/z", "skus/a", "skus/b"]);
    }
}
