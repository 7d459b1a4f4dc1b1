//! Sales and quotation models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::StockLocation;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SaleItem {
    pub sku_id: String,
    pub full_name: String,
    pub quantity: u32,
    pub sale_price: Decimal,
    /// Location the units were taken from
    pub location: StockLocation,
}

impl SaleItem {
    pub fn line_total(&self) -> Decimal {
        Decimal::from(self.quantity) * self.sale_price
    }
}

/// A completed sale. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: String,
    pub customer_id: Option<String>,
    pub customer_name: String,
    pub items: Vec<SaleItem>,
    pub total_sale: Decimal,
    pub status: SaleStatus,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
}

/// Σ(quantity × sale_price)
pub fn sale_total(items: &[SaleItem]) -> Decimal {
    items.iter().map(SaleItem::line_total).sum()
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QuotationStatus {
    Quoted,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuotationItem {
    /// Empty when the product is not catalogued yet
    pub sku_id: Option<String>,
    pub full_name: String,
    pub quantity: u32,
    pub price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotationRequest {
    pub id: String,
    pub customer_name: String,
    pub notes: Option<String>,
    pub items: Vec<QuotationItem>,
    pub opportunity_id: Option<String>,
    pub total: Decimal,
    pub status: QuotationStatus,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
}

pub fn quotation_total(items: &[QuotationItem]) -> Decimal {
    items
        .iter()
        .map(|i| Decimal::from(i.quantity) * i.price)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn sale_total_sums_line_totals() {
        let items = vec![
            SaleItem {
                sku_id: "a".to_string(),
                full_name: "A".to_string(),
                quantity: 2,
                sale_price: dec("15.50"),
                location: StockLocation::LaVictoria,
            },
            SaleItem {
                sku_id: "b".to_string(),
                full_name: "B".to_string(),
                quantity: 3,
                sale_price: dec("10"),
                location: StockLocation::Smp,
            },
        ];
        assert_eq!(sale_total(&items), dec("61.00"));
        assert_eq!(sale_total(&[]), Decimal::ZERO);
    }

    #[test]
    fn quotation_total_sums_lines() {
        let items = vec![QuotationItem {
            sku_id: None,
            full_name: "Colágeno".to_string(),
            quantity: 4,
            price: dec("25"),
        }];
        assert_eq!(quotation_total(&items), dec("100"));
    }
}
