//! Product catalog models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::StockLevels;

/// Top-level catalog taxonomy node
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Abstract product family (e.g. "Vitamina D") grouping concrete SKUs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductFamily {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub category_id: String,
    pub category_name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Brand {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Variant attributes that distinguish SKUs of one product family
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SkuAttributes {
    pub presentation: String,
    pub dosage: String,
    pub quantity: u32,
}

/// How a SKU entered the catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SkuOrigin {
    Manual,
    Opportunity { id: String },
}

impl SkuOrigin {
    pub fn opportunity_id(&self) -> Option<&str> {
        match self {
            SkuOrigin::Manual => None,
            SkuOrigin::Opportunity { id } => Some(id),
        }
    }
}

/// A concrete sellable variant with its own stock and prices
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sku {
    pub id: String,
    pub product_id: String,
    pub product_name: String,
    pub category_id: String,
    pub category_name: String,
    pub brand_id: String,
    pub brand_name: String,
    pub sku_code: String,
    pub full_name: String,
    pub attributes: SkuAttributes,
    pub stock: StockLevels,
    pub sale_price: Decimal,
    pub purchase_price: Decimal,
    pub active: bool,
    pub origin: SkuOrigin,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
}

/// Compose the display name of a SKU, e.g. `Vitamina C Bayer Tabletas 500mg - 30 un.`
pub fn compose_sku_full_name(product: &str, brand: &str, attributes: &SkuAttributes) -> String {
    let head = [product, brand, &attributes.presentation, &attributes.dosage]
        .into_iter()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    format!("{} - {} un.", head, attributes.quantity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_name_includes_every_attribute() {
        let attributes = SkuAttributes {
            presentation: "Tabletas".to_string(),
            dosage: "500mg".to_string(),
            quantity: 30,
        };
        assert_eq!(
            compose_sku_full_name("Vitamina C", "Bayer", &attributes),
            "Vitamina C Bayer Tabletas 500mg - 30 un."
        );
    }

    #[test]
    fn full_name_skips_blank_attributes() {
        let attributes = SkuAttributes {
            presentation: String::new(),
            dosage: " 1000mg ".to_string(),
            quantity: 60,
        };
        assert_eq!(
            compose_sku_full_name("Omega 3", "Nature", &attributes),
            "Omega 3 Nature 1000mg - 60 un."
        );
    }

    #[test]
    fn origin_is_tagged() {
        let origin = SkuOrigin::Opportunity { id: "opp-1".to_string() };
        let json = serde_json::to_value(&origin).unwrap();
        assert_eq!(json["type"], "opportunity");
        assert_eq!(json["id"], "opp-1");
        assert_eq!(origin.opportunity_id(), Some("opp-1"));
        assert_eq!(SkuOrigin::Manual.opportunity_id(), None);
    }
}
