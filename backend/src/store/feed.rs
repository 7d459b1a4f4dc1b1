//! In-process change feed shared by store implementations

use serde_json::Value;
use tokio::sync::broadcast;

use super::Query;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

/// A committed change to one document
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub collection: String,
    pub id: String,
    pub kind: ChangeKind,
    /// Document data after the change; `None` for deletions
    pub data: Option<Value>,
}

#[derive(Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<ChangeEvent>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn publish(&self, event: ChangeEvent) {
        // No subscribers is not an error
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self, collection: &str, filter: Query) -> ChangeStream {
        ChangeStream {
            receiver: self.sender.subscribe(),
            collection: collection.to_string(),
            filter,
        }
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(1024)
    }
}

/// Filtered view over the change feed for one collection
pub struct ChangeStream {
    receiver: broadcast::Receiver<ChangeEvent>,
    collection: String,
    filter: Query,
}

impl ChangeStream {
    /// Next matching change; `None` once the store is gone
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.accepts(&event) => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        collection = %self.collection,
                        skipped,
                        "Change stream lagged; events were dropped"
                    );
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    fn accepts(&self, event: &ChangeEvent) -> bool {
        if event.collection != self.collection {
            return false;
        }
        match &event.data {
            Some(data) => self.filter.matches(data),
            None => true,
        }
    }
}
