//! Opportunity lifecycle models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::RequirementSource;
use crate::types::Currency;

/// Where an approved opportunity is headed, fixed at creation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EndGoal {
    QuoteCustomer,
    AddToCatalog,
}

impl EndGoal {
    /// The approved state an opportunity with this goal enters
    pub fn approved_status(&self) -> OpportunityStatus {
        match self {
            EndGoal::QuoteCustomer => OpportunityStatus::ApprovedForQuotation,
            EndGoal::AddToCatalog => OpportunityStatus::ApprovedForCatalog,
        }
    }
}

/// Opportunity pipeline state
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OpportunityStatus {
    Analysis,
    ApprovedForCatalog,
    ApprovedForQuotation,
    Catalogued,
    Quoted,
    Rejected,
}

impl OpportunityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpportunityStatus::Analysis => "analysis",
            OpportunityStatus::ApprovedForCatalog => "approved_for_catalog",
            OpportunityStatus::ApprovedForQuotation => "approved_for_quotation",
            OpportunityStatus::Catalogued => "catalogued",
            OpportunityStatus::Quoted => "quoted",
            OpportunityStatus::Rejected => "rejected",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "analysis" => Some(OpportunityStatus::Analysis),
            "approved_for_catalog" => Some(OpportunityStatus::ApprovedForCatalog),
            "approved_for_quotation" => Some(OpportunityStatus::ApprovedForQuotation),
            "catalogued" => Some(OpportunityStatus::Catalogued),
            "quoted" => Some(OpportunityStatus::Quoted),
            "rejected" => Some(OpportunityStatus::Rejected),
            _ => None,
        }
    }

    /// Valid forward moves of the pipeline
    pub fn can_transition_to(&self, next: OpportunityStatus) -> bool {
        use OpportunityStatus::*;
        matches!(
            (self, next),
            (Analysis, ApprovedForCatalog)
                | (Analysis, ApprovedForQuotation)
                | (Analysis, Rejected)
                | (ApprovedForCatalog, Catalogued)
                | (ApprovedForQuotation, Quoted)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OpportunityStatus::Catalogued | OpportunityStatus::Quoted | OpportunityStatus::Rejected
        )
    }
}

impl std::fmt::Display for OpportunityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Product attributes copied from the originating requirement item
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OpportunitySpecifics {
    pub brand: String,
    pub presentation: String,
    pub dosage: String,
    pub quantity: String,
}

impl OpportunitySpecifics {
    pub fn label(&self) -> String {
        [&self.brand, &self.presentation, &self.dosage, &self.quantity]
            .into_iter()
            .filter(|v| !v.trim().is_empty())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// A supplier's offer for the requested product
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProviderQuote {
    pub id: String,
    pub name: String,
    pub price: Decimal,
    pub currency: Currency,
    pub shipping_cost: Decimal,
    /// USD→PEN rate captured when the quote was recorded
    pub saved_exchange_rate: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}

impl ProviderQuote {
    /// Price plus shipping in the quote's own currency
    pub fn total_cost(&self) -> Decimal {
        self.price + self.shipping_cost
    }

    /// Total cost converted to PEN at `rate`
    pub fn total_cost_pen(&self, rate: Decimal) -> Decimal {
        match self.currency {
            Currency::Usd => self.total_cost() * rate,
            Currency::Pen => self.total_cost(),
        }
    }
}

/// A competitor's observed sale price (PEN)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CompetitorEntry {
    pub id: String,
    pub name: String,
    pub sale_price: Decimal,
    pub competitor_link: Option<String>,
    pub phone_number: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A candidate deal under analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Opportunity {
    pub id: String,
    pub requirement_id: Option<String>,
    /// Product family assigned during classification
    pub product_id: Option<String>,
    pub product_name: String,
    pub source: RequirementSource,
    pub specifics: OpportunitySpecifics,
    pub status: OpportunityStatus,
    pub end_goal: EndGoal,
    pub provider_quotes: Vec<ProviderQuote>,
    pub competitor_analysis: Vec<CompetitorEntry>,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub approved_at: Option<DateTime<Utc>>,
    pub approved_by: Option<String>,
    pub approved_exchange_rate: Option<Decimal>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub decision_notes: Option<String>,
}

impl Opportunity {
    /// Quotes and competitor entries may only change while under analysis
    pub fn is_editable(&self) -> bool {
        self.status == OpportunityStatus::Analysis
    }
}
