//! Purchase orders and stock receipt

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use shared::{
    purchase_total, validate_name, validate_price, validate_quantity, Actor, PurchaseOrder,
    PurchaseOrderStatus, Sku, StockLocation,
};

use crate::error::{AppError, AppResult};
use crate::services::inventory::stock_error;
use crate::store::{self, collections, Query, SharedStore};

#[derive(Clone)]
pub struct ProcurementService {
    store: SharedStore,
    receiving_location: StockLocation,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePurchaseOrderInput {
    pub sku_id: String,
    pub quantity: u32,
    pub cost_per_item: Decimal,
    pub supplier: String,
    /// Defaults to the configured receiving location
    pub destination: Option<StockLocation>,
    pub opportunity_id: Option<String>,
}

impl ProcurementService {
    pub fn new(store: SharedStore, receiving_location: StockLocation) -> Self {
        Self {
            store,
            receiving_location,
        }
    }

    /// Create an `ordered` purchase order for an existing SKU
    pub async fn create_purchase_order(
        &self,
        actor: &Actor,
        input: CreatePurchaseOrderInput,
    ) -> AppResult<PurchaseOrder> {
        validate_quantity(input.quantity).map_err(|msg| AppError::Validation {
            field: "quantity".to_string(),
            message: msg.to_string(),
            message_es: "La cantidad debe ser positiva".to_string(),
        })?;
        validate_price(input.cost_per_item).map_err(|msg| AppError::Validation {
            field: "costPerItem".to_string(),
            message: msg.to_string(),
            message_es: "El costo debe estar entre 0 y 1 000 000 000 000".to_string(),
        })?;
        validate_name(&input.supplier).map_err(|_| {
            AppError::validation(
                "supplier",
                "Supplier must not be empty",
                "El proveedor no puede estar vacío",
            )
        })?;

        let sku: Sku = store::fetch(self.store.as_ref(), collections::SKUS, &input.sku_id)
            .await?
            .ok_or_else(|| AppError::not_found("SKU", &input.sku_id))?;

        let order = PurchaseOrder {
            id: self.store.new_id(),
            sku_id: sku.id,
            sku_full_name: sku.full_name,
            quantity: input.quantity,
            cost_per_item: input.cost_per_item,
            total_cost: purchase_total(input.quantity, input.cost_per_item),
            supplier: input.supplier.trim().to_string(),
            destination: input.destination.unwrap_or(self.receiving_location),
            opportunity_id: input.opportunity_id,
            status: PurchaseOrderStatus::Ordered,
            created_at: Utc::now(),
            created_by: actor.user_id.clone(),
            received_at: None,
            received_by: None,
            cancelled_at: None,
        };
        store::insert(self.store.as_ref(), collections::PURCHASE_ORDERS, &order.id, &order).await?;

        tracing::info!(
            purchase_order_id = %order.id,
            sku_id = %order.sku_id,
            quantity = order.quantity,
            total_cost = %order.total_cost,
            "Purchase order created"
        );
        Ok(order)
    }

    pub async fn get_purchase_order(&self, id: &str) -> AppResult<PurchaseOrder> {
        store::fetch(self.store.as_ref(), collections::PURCHASE_ORDERS, id)
            .await?
            .ok_or_else(|| AppError::not_found("Purchase order", id))
    }

    /// Orders, optionally narrowed to one status, newest first
    pub async fn list_purchase_orders(
        &self,
        status: Option<PurchaseOrderStatus>,
    ) -> AppResult<Vec<PurchaseOrder>> {
        let query = match status {
            Some(status) => Query::new().filter("status", status.as_str()),
            None => Query::new(),
        };
        let mut orders: Vec<PurchaseOrder> =
            store::list(self.store.as_ref(), collections::PURCHASE_ORDERS, &query).await?;
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    /// Credit the SKU's destination stock and mark the order received, atomically.
    ///
    /// Only `ordered` orders can be received, so a second receipt never
    /// credits stock again.
    pub async fn receive_order(&self, actor: &Actor, order_id: &str) -> AppResult<PurchaseOrder> {
        let mut tx = self.store.begin().await?;
        let mut order: PurchaseOrder =
            store::tx_fetch(tx.as_mut(), collections::PURCHASE_ORDERS, order_id)
                .await?
                .ok_or_else(|| AppError::not_found("Purchase order", order_id))?;

        if order.status != PurchaseOrderStatus::Ordered {
            return Err(AppError::InvalidStateTransition(format!(
                "Purchase order {} is already {}",
                order.id, order.status
            )));
        }

        let sku: Sku = store::tx_fetch(tx.as_mut(), collections::SKUS, &order.sku_id)
            .await?
            .ok_or_else(|| AppError::not_found("SKU", &order.sku_id))?;

        let mut stock = sku.stock.clone();
        let new_level = stock
            .credit(order.destination, order.quantity)
            .map_err(|e| stock_error(&sku, e))?;

        let now = Utc::now();
        order.status = PurchaseOrderStatus::Received;
        order.received_at = Some(now);
        order.received_by = Some(actor.user_id.clone());

        tx.update(collections::SKUS, &sku.id, store::patch(json!({ "stock": stock }))?)?;
        tx.update(
            collections::PURCHASE_ORDERS,
            order_id,
            store::patch(json!({
                "status": order.status,
                "receivedAt": now,
                "receivedBy": actor.user_id,
            }))?,
        )?;
        tx.commit().await?;

        tracing::info!(
            purchase_order_id = order_id,
            sku_id = %sku.id,
            location = %order.destination,
            quantity = order.quantity,
            new_level,
            "Purchase order received"
        );
        Ok(order)
    }

    /// Cancel an `ordered` purchase order
    pub async fn cancel_order(&self, actor: &Actor, order_id: &str) -> AppResult<PurchaseOrder> {
        let mut tx = self.store.begin().await?;
        let mut order: PurchaseOrder =
            store::tx_fetch(tx.as_mut(), collections::PURCHASE_ORDERS, order_id)
                .await?
                .ok_or_else(|| AppError::not_found("Purchase order", order_id))?;

        if order.status != PurchaseOrderStatus::Ordered {
            return Err(AppError::InvalidStateTransition(format!(
                "Purchase order {} is already {}",
                order.id, order.status
            )));
        }

        let now = Utc::now();
        order.status = PurchaseOrderStatus::Cancelled;
        order.cancelled_at = Some(now);

        tx.update(
            collections::PURCHASE_ORDERS,
            order_id,
            store::patch(json!({ "status": order.status, "cancelledAt": now }))?,
        )?;
        tx.commit().await?;

        tracing::info!(purchase_order_id = order_id, user_id = %actor.user_id, "Purchase order cancelled");
        Ok(order)
    }
}
