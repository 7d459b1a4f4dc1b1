//! Background reactions to store changes

use shared::Sale;
use tokio::task::JoinHandle;

use crate::services::CustomerService;
use crate::store::{collections, ChangeEvent, ChangeKind, Query, SharedStore};

/// Promote customers on their first sale as sales are created.
///
/// Subscribes before spawning so no sale created after this call is missed.
pub fn spawn_first_sale_listener(store: SharedStore) -> JoinHandle<()> {
    let mut stream = store.subscribe(collections::SALES, Query::new());
    let customers = CustomerService::new(store);

    tokio::spawn(async move {
        while let Some(event) = stream.next().await {
            handle_sale_event(&customers, event).await;
        }
        tracing::debug!("Sales change stream closed; first-sale listener exiting");
    })
}

pub async fn handle_sale_event(customers: &CustomerService, event: ChangeEvent) {
    if event.kind != ChangeKind::Created {
        return;
    }
    let Some(data) = event.data else {
        return;
    };
    let sale: Sale = match serde_json::from_value(data) {
        Ok(sale) => sale,
        Err(e) => {
            tracing::warn!(sale_id = %event.id, error = %e, "Could not decode sale document");
            return;
        }
    };
    if let Err(e) = customers.promote_on_first_sale(&sale).await {
        tracing::warn!(sale_id = %sale.id, error = %e, "First-sale promotion failed");
    }
}
