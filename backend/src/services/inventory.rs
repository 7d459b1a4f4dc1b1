//! Per-location stock queries and transfers

use serde::{Deserialize, Serialize};
use serde_json::json;
use shared::{validate_quantity, Actor, Sku, StockError, StockLevels, StockLocation};

use crate::error::{AppError, AppResult};
use crate::store::{self, collections, SharedStore};

#[derive(Clone)]
pub struct InventoryService {
    store: SharedStore,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockSummary {
    pub sku_id: String,
    pub full_name: String,
    pub stock: StockLevels,
    pub total: u64,
    pub available_for_sale: u64,
}

impl From<&Sku> for StockSummary {
    fn from(sku: &Sku) -> Self {
        Self {
            sku_id: sku.id.clone(),
            full_name: sku.full_name.clone(),
            stock: sku.stock.clone(),
            total: sku.stock.total(),
            available_for_sale: sku.stock.available_for_sale(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferStockInput {
    pub from: StockLocation,
    pub to: StockLocation,
    pub quantity: u32,
}

/// Translate a stock arithmetic failure on `sku` into an application error
pub(crate) fn stock_error(sku: &Sku, err: StockError) -> AppError {
    match err {
        StockError::Insufficient {
            location,
            available,
            requested,
        } => AppError::InsufficientStock {
            sku_id: sku.id.clone(),
            sku_name: sku.full_name.clone(),
            location: location.to_string(),
            available,
            requested: u64::from(requested),
        },
        StockError::Overflow { location } => AppError::ValidationError(format!(
            "Stock for {} at {} would overflow",
            sku.full_name, location
        )),
    }
}

impl InventoryService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub async fn stock_summary(&self, sku_id: &str) -> AppResult<StockSummary> {
        let sku: Sku = store::fetch(self.store.as_ref(), collections::SKUS, sku_id)
            .await?
            .ok_or_else(|| AppError::not_found("SKU", sku_id))?;
        Ok(StockSummary::from(&sku))
    }

    /// Move units between two locations of one SKU atomically
    pub async fn transfer_stock(
        &self,
        actor: &Actor,
        sku_id: &str,
        input: TransferStockInput,
    ) -> AppResult<StockSummary> {
        if input.from == input.to {
            return Err(AppError::validation(
                "to",
                "Source and destination locations must differ",
                "El origen y el destino deben ser distintos",
            ));
        }
        validate_quantity(input.quantity).map_err(|msg| AppError::Validation {
            field: "quantity".to_string(),
            message: msg.to_string(),
            message_es: "La cantidad debe ser positiva".to_string(),
        })?;

        let mut tx = self.store.begin().await?;
        let mut sku: Sku = store::tx_fetch(tx.as_mut(), collections::SKUS, sku_id)
            .await?
            .ok_or_else(|| AppError::not_found("SKU", sku_id))?;

        let mut stock = sku.stock.clone();
        stock
            .debit(input.from, input.quantity)
            .map_err(|e| stock_error(&sku, e))?;
        stock
            .credit(input.to, input.quantity)
            .map_err(|e| stock_error(&sku, e))?;

        tx.update(collections::SKUS, sku_id, store::patch(json!({ "stock": stock }))?)?;
        tx.commit().await?;
        sku.stock = stock;

        tracing::info!(
            sku_id,
            from = %input.from,
            to = %input.to,
            quantity = input.quantity,
            user_id = %actor.user_id,
            "Stock transferred"
        );
        Ok(StockSummary::from(&sku))
    }
}
