//! Requirement intake models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::EndGoal;

/// Who raised a requirement
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RequirementSource {
    #[serde(rename = "Cliente")]
    Customer,
    #[serde(rename = "Vendedor")]
    Salesperson,
    #[serde(rename = "Gerencia")]
    Management,
    #[serde(rename = "Otro")]
    Other,
}

impl RequirementSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequirementSource::Customer => "Cliente",
            RequirementSource::Salesperson => "Vendedor",
            RequirementSource::Management => "Gerencia",
            RequirementSource::Other => "Otro",
        }
    }

    /// Customer requests end in a quotation; everything else feeds the catalog
    pub fn end_goal(&self) -> EndGoal {
        match self {
            RequirementSource::Customer => EndGoal::QuoteCustomer,
            _ => EndGoal::AddToCatalog,
        }
    }
}

/// Per-item progress through intake
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RequirementItemStatus {
    #[default]
    PendingReview,
    Classified,
    AnalysisStarted,
}

impl RequirementItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequirementItemStatus::PendingReview => "pending_review",
            RequirementItemStatus::Classified => "classified",
            RequirementItemStatus::AnalysisStarted => "analysis_started",
        }
    }
}

/// One requested product line inside a requirement
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RequirementItem {
    pub requested_product: String,
    pub brand: Option<String>,
    pub presentation: Option<String>,
    pub dosage: Option<String>,
    pub quantity: Option<String>,
    pub status: RequirementItemStatus,
    /// Set by classification
    pub category_id: Option<String>,
    pub product_id: Option<String>,
}

impl RequirementItem {
    pub fn new(requested_product: impl Into<String>) -> Self {
        Self {
            requested_product: requested_product.into(),
            brand: None,
            presentation: None,
            dosage: None,
            quantity: None,
            status: RequirementItemStatus::PendingReview,
            category_id: None,
            product_id: None,
        }
    }

    /// Ready for analysis: classified and carrying a product family
    pub fn is_classified(&self) -> bool {
        self.status == RequirementItemStatus::Classified
            && self.product_id.as_deref().is_some_and(|p| !p.trim().is_empty())
    }

    /// Non-empty attributes joined for display, e.g. `Bayer / Tabletas / 500mg`
    pub fn specifics_label(&self) -> String {
        [&self.brand, &self.presentation, &self.dosage, &self.quantity]
            .into_iter()
            .filter_map(|v| v.as_deref())
            .filter(|v| !v.trim().is_empty())
            .collect::<Vec<_>>()
            .join(" / ")
    }
}

/// A batch of requested items from one source
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Requirement {
    pub id: String,
    pub source: RequirementSource,
    pub contact_info: Option<String>,
    pub notes: Option<String>,
    pub items: Vec<RequirementItem>,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
}

impl Requirement {
    /// Whether any item still needs attention in the inbox
    pub fn has_open_items(&self) -> bool {
        self.items.iter().any(|i| {
            matches!(
                i.status,
                RequirementItemStatus::PendingReview | RequirementItemStatus::Classified
            )
        })
    }

    pub fn pending_count(&self) -> usize {
        self.items
            .iter()
            .filter(|i| i.status == RequirementItemStatus::PendingReview)
            .count()
    }
}
