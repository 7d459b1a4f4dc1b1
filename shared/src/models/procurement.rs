//! Purchase order models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::StockLocation;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseOrderStatus {
    Ordered,
    Received,
    Cancelled,
}

impl PurchaseOrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseOrderStatus::Ordered => "ordered",
            PurchaseOrderStatus::Received => "received",
            PurchaseOrderStatus::Cancelled => "cancelled",
        }
    }

    /// Received and cancelled orders never change again
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PurchaseOrderStatus::Ordered)
    }
}

impl std::fmt::Display for PurchaseOrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOrder {
    pub id: String,
    pub sku_id: String,
    pub sku_full_name: String,
    pub quantity: u32,
    pub cost_per_item: Decimal,
    pub total_cost: Decimal,
    pub supplier: String,
    /// Location credited when the order is received
    pub destination: StockLocation,
    pub opportunity_id: Option<String>,
    pub status: PurchaseOrderStatus,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub received_at: Option<DateTime<Utc>>,
    pub received_by: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

/// `quantity × cost_per_item`
pub fn purchase_total(quantity: u32, cost_per_item: Decimal) -> Decimal {
    Decimal::from(quantity) * cost_per_item
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn total_cost_is_quantity_times_unit_cost() {
        let unit = Decimal::from_str("12.50").unwrap();
        assert_eq!(purchase_total(8, unit), Decimal::from(100));
        assert_eq!(purchase_total(0, unit), Decimal::ZERO);
    }

    #[test]
    fn only_ordered_is_open() {
        assert!(!PurchaseOrderStatus::Ordered.is_terminal());
        assert!(PurchaseOrderStatus::Received.is_terminal());
        assert!(PurchaseOrderStatus::Cancelled.is_terminal());
    }
}
