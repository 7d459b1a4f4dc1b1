//! Sales ledger: all-or-nothing stock-decrementing sales

use std::collections::{BTreeMap, HashMap};

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use shared::{
    sale_total, validate_name, validate_price, validate_quantity, Actor, Sale, SaleItem,
    SaleStatus, Sku, StockLocation,
};

use crate::error::{AppError, AppResult};
use crate::services::inventory::stock_error;
use crate::store::{self, collections, Query, SharedStore};

#[derive(Clone)]
pub struct SalesService {
    store: SharedStore,
    sales_location: StockLocation,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleLineInput {
    pub sku_id: String,
    pub quantity: u32,
    /// Defaults to the SKU's sale price
    pub sale_price: Option<Decimal>,
    /// Defaults to the configured sales location
    pub location: Option<StockLocation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterSaleInput {
    pub customer_name: String,
    pub customer_id: Option<String>,
    pub items: Vec<SaleLineInput>,
}

impl SalesService {
    pub fn new(store: SharedStore, sales_location: StockLocation) -> Self {
        Self {
            store,
            sales_location,
        }
    }

    /// Register a sale and decrement stock for every line in one transaction.
    ///
    /// Every SKU is read and every line validated before anything is
    /// written; if any line lacks stock the whole sale fails and no stock
    /// changes.
    pub async fn register_sale(&self, actor: &Actor, input: RegisterSaleInput) -> AppResult<Sale> {
        validate_name(&input.customer_name).map_err(|_| {
            AppError::validation(
                "customerName",
                "Customer name must not be empty",
                "El nombre del cliente no puede estar vacío",
            )
        })?;
        if input.items.is_empty() {
            return Err(AppError::validation(
                "items",
                "A sale needs at least one line item",
                "La venta necesita al menos un ítem",
            ));
        }
        for line in &input.items {
            validate_quantity(line.quantity).map_err(|msg| AppError::Validation {
                field: "quantity".to_string(),
                message: msg.to_string(),
                message_es: "La cantidad debe ser positiva".to_string(),
            })?;
            if let Some(price) = line.sale_price {
                validate_price(price).map_err(|msg| AppError::Validation {
                    field: "salePrice".to_string(),
                    message: msg.to_string(),
                    message_es: "El precio debe estar entre 0 y 1 000 000 000 000".to_string(),
                })?;
            }
        }

        let mut tx = self.store.begin().await?;

        // Read phase
        let mut skus: HashMap<String, Sku> = HashMap::new();
        let mut read_order: Vec<String> = Vec::new();
        for line in &input.items {
            if skus.contains_key(&line.sku_id) {
                continue;
            }
            let sku: Sku = store::tx_fetch(tx.as_mut(), collections::SKUS, &line.sku_id)
                .await?
                .ok_or_else(|| AppError::not_found("SKU", &line.sku_id))?;
            read_order.push(sku.id.clone());
            skus.insert(sku.id.clone(), sku);
        }

        // Validate aggregated demand per SKU and location
        let mut demand: BTreeMap<(String, StockLocation), u64> = BTreeMap::new();
        for line in &input.items {
            let location = line.location.unwrap_or(self.sales_location);
            *demand.entry((line.sku_id.clone(), location)).or_default() += u64::from(line.quantity);
        }

        let mut new_stock = HashMap::new();
        for ((sku_id, location), requested) in &demand {
            let Some(sku) = skus.get(sku_id) else {
                return Err(AppError::not_found("SKU", sku_id));
            };
            let stock = new_stock
                .entry(sku_id.clone())
                .or_insert_with(|| sku.stock.clone());
            let available = stock.get(*location);
            let quantity = match u32::try_from(*requested) {
                Ok(quantity) if quantity <= available => quantity,
                _ => {
                    return Err(AppError::InsufficientStock {
                        sku_id: sku.id.clone(),
                        sku_name: sku.full_name.clone(),
                        location: location.to_string(),
                        available,
                        requested: *requested,
                    })
                }
            };
            stock
                .debit(*location, quantity)
                .map_err(|e| stock_error(sku, e))?;
        }

        let mut items = Vec::with_capacity(input.items.len());
        for line in input.items {
            let Some(sku) = skus.get(&line.sku_id) else {
                return Err(AppError::not_found("SKU", &line.sku_id));
            };
            items.push(SaleItem {
                full_name: sku.full_name.clone(),
                sale_price: line.sale_price.unwrap_or(sku.sale_price),
                location: line.location.unwrap_or(self.sales_location),
                quantity: line.quantity,
                sku_id: line.sku_id,
            });
        }

        let sale = Sale {
            id: self.store.new_id(),
            customer_id: input.customer_id,
            customer_name: input.customer_name.trim().to_string(),
            total_sale: sale_total(&items),
            items,
            status: SaleStatus::Completed,
            created_at: Utc::now(),
            created_by: actor.user_id.clone(),
        };

        // Write phase
        tx.create(collections::SALES, &sale.id, store::encode(&sale)?)?;
        for sku_id in &read_order {
            if let Some(stock) = new_stock.get(sku_id) {
                tx.update(collections::SKUS, sku_id, store::patch(json!({ "stock": stock }))?)?;
            }
        }
        tx.commit().await?;

        tracing::info!(
            sale_id = %sale.id,
            lines = sale.items.len(),
            total = %sale.total_sale,
            user_id = %actor.user_id,
            "Sale registered"
        );
        Ok(sale)
    }

    pub async fn get_sale(&self, id: &str) -> AppResult<Sale> {
        store::fetch(self.store.as_ref(), collections::SALES, id)
            .await?
            .ok_or_else(|| AppError::not_found("Sale", id))
    }

    /// All sales, newest first
    pub async fn list_sales(&self) -> AppResult<Vec<Sale>> {
        let mut sales: Vec<Sale> =
            store::list(self.store.as_ref(), collections::SALES, &Query::new()).await?;
        sales.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sales)
    }
}
