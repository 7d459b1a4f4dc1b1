//! Customer quotations, optionally closing an approved opportunity

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use shared::{
    quotation_total, validate_price, Actor, Opportunity, OpportunityStatus, QuotationItem,
    QuotationRequest, QuotationStatus, RequirementSource,
};

use crate::error::{AppError, AppResult};
use crate::store::{self, collections, Query, SharedStore};

#[derive(Clone)]
pub struct QuotationService {
    store: SharedStore,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotationLineInput {
    pub sku_id: Option<String>,
    pub full_name: String,
    pub quantity: u32,
    #[serde(default)]
    pub price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuotationInput {
    pub customer_name: String,
    pub notes: Option<String>,
    pub items: Vec<QuotationLineInput>,
    pub opportunity_id: Option<String>,
}

impl QuotationService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Pre-filled quotation for an approved opportunity; nothing is stored
    pub async fn draft_from_opportunity(&self, opportunity_id: &str) -> AppResult<CreateQuotationInput> {
        let opportunity: Opportunity =
            store::fetch(self.store.as_ref(), collections::OPPORTUNITIES, opportunity_id)
                .await?
                .ok_or_else(|| AppError::not_found("Opportunity", opportunity_id))?;
        Ok(draft_for(&opportunity))
    }

    /// Store a quotation. A linked opportunity moves to `quoted` in the
    /// same transaction and must be approved for quotation.
    pub async fn create_quotation(
        &self,
        actor: &Actor,
        input: CreateQuotationInput,
    ) -> AppResult<QuotationRequest> {
        let items: Vec<QuotationItem> = input
            .items
            .into_iter()
            .filter(|line| !line.full_name.trim().is_empty() && line.quantity > 0)
            .map(|line| QuotationItem {
                sku_id: line.sku_id.filter(|id| !id.trim().is_empty()),
                full_name: line.full_name.trim().to_string(),
                quantity: line.quantity,
                price: line.price,
            })
            .collect();

        if items.is_empty() {
            return Err(AppError::validation(
                "items",
                "Add at least one product with a name and quantity",
                "Añada al menos un producto válido",
            ));
        }
        for item in &items {
            validate_price(item.price).map_err(|msg| AppError::Validation {
                field: "price".to_string(),
                message: msg.to_string(),
                message_es: "El precio debe estar entre 0 y 1 000 000 000 000".to_string(),
            })?;
        }

        let mut tx = self.store.begin().await?;
        if let Some(opportunity_id) = &input.opportunity_id {
            let opportunity: Opportunity =
                store::tx_fetch(tx.as_mut(), collections::OPPORTUNITIES, opportunity_id)
                    .await?
                    .ok_or_else(|| AppError::not_found("Opportunity", opportunity_id))?;
            if !opportunity.status.can_transition_to(OpportunityStatus::Quoted) {
                return Err(AppError::InvalidStateTransition(format!(
                    "Opportunity {} is {}, expected approved_for_quotation",
                    opportunity.id, opportunity.status
                )));
            }
        }

        let quotation = QuotationRequest {
            id: self.store.new_id(),
            customer_name: input.customer_name.trim().to_string(),
            notes: input.notes,
            total: quotation_total(&items),
            items,
            opportunity_id: input.opportunity_id,
            status: QuotationStatus::Quoted,
            created_at: Utc::now(),
            created_by: actor.user_id.clone(),
        };

        tx.create(collections::QUOTATIONS, &quotation.id, store::encode(&quotation)?)?;
        if let Some(opportunity_id) = &quotation.opportunity_id {
            tx.update(
                collections::OPPORTUNITIES,
                opportunity_id,
                store::patch(json!({ "status": OpportunityStatus::Quoted }))?,
            )?;
        }
        tx.commit().await?;

        tracing::info!(
            quotation_id = %quotation.id,
            opportunity_id = ?quotation.opportunity_id,
            total = %quotation.total,
            "Quotation created"
        );
        Ok(quotation)
    }

    /// Approved-for-quotation opportunities awaiting a quotation
    pub async fn pending_opportunities(&self) -> AppResult<Vec<Opportunity>> {
        let query = Query::new().filter("status", OpportunityStatus::ApprovedForQuotation.as_str());
        Ok(store::list(self.store.as_ref(), collections::OPPORTUNITIES, &query).await?)
    }

    /// All quotations, newest first
    pub async fn list_quotations(&self) -> AppResult<Vec<QuotationRequest>> {
        let mut quotations: Vec<QuotationRequest> =
            store::list(self.store.as_ref(), collections::QUOTATIONS, &Query::new()).await?;
        quotations.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(quotations)
    }
}

/// Customer placeholder, notes listing the specifics, and one uncatalogued line
pub fn draft_for(opportunity: &Opportunity) -> CreateQuotationInput {
    let customer_name = match opportunity.source {
        RequirementSource::Customer => "Cliente del Requerimiento (ver notas)",
        _ => "N/A",
    };
    CreateQuotationInput {
        customer_name: customer_name.to_string(),
        notes: Some(format!(
            "Cotización generada desde la oportunidad: {}. Detalles: {}",
            opportunity.product_name,
            opportunity.specifics.label()
        )),
        items: vec![QuotationLineInput {
            sku_id: None,
            full_name: opportunity.product_name.clone(),
            quantity: 1,
            price: Decimal::ZERO,
        }],
        opportunity_id: Some(opportunity.id.clone()),
    }
}
