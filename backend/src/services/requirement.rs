//! Requirement intake, classification and the hand-off into analysis

use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use shared::{
    validate_requirement_items, Actor, Opportunity, OpportunitySpecifics, OpportunityStatus,
    Requirement, RequirementItem, RequirementItemStatus, RequirementSource,
};

use crate::error::{AppError, AppResult};
use crate::store::{self, collections, Query, SharedStore};

#[derive(Clone)]
pub struct RequirementService {
    store: SharedStore,
}

/// One requested product line
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequirementItemInput {
    pub requested_product: String,
    pub brand: Option<String>,
    pub presentation: Option<String>,
    pub dosage: Option<String>,
    pub quantity: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequirementInput {
    pub source: RequirementSource,
    pub contact_info: Option<String>,
    pub notes: Option<String>,
    pub items: Vec<RequirementItemInput>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifyItemInput {
    pub category_id: Option<String>,
    #[serde(default)]
    pub product_id: String,
}

impl From<RequirementItemInput> for RequirementItem {
    fn from(input: RequirementItemInput) -> Self {
        let mut item = RequirementItem::new(input.requested_product.trim());
        item.brand = input.brand;
        item.presentation = input.presentation;
        item.dosage = input.dosage;
        item.quantity = input.quantity;
        item
    }
}

impl RequirementService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Record a new requirement; blank item rows are dropped
    pub async fn create_requirement(
        &self,
        actor: &Actor,
        input: CreateRequirementInput,
    ) -> AppResult<Requirement> {
        let items: Vec<RequirementItem> = input
            .items
            .into_iter()
            .filter(|i| !i.requested_product.trim().is_empty())
            .map(RequirementItem::from)
            .collect();

        validate_requirement_items(&items).map_err(|msg| AppError::Validation {
            field: "items".to_string(),
            message: msg.to_string(),
            message_es: "Debe indicar al menos un producto solicitado".to_string(),
        })?;

        let requirement = Requirement {
            id: self.store.new_id(),
            source: input.source,
            contact_info: input.contact_info,
            notes: input.notes,
            items,
            created_at: Utc::now(),
            created_by: actor.user_id.clone(),
        };
        store::insert(self.store.as_ref(), collections::REQUIREMENTS, &requirement.id, &requirement)
            .await?;

        tracing::info!(
            requirement_id = %requirement.id,
            items = requirement.items.len(),
            "Requirement created"
        );
        Ok(requirement)
    }

    pub async fn get_requirement(&self, id: &str) -> AppResult<Requirement> {
        store::fetch(self.store.as_ref(), collections::REQUIREMENTS, id)
            .await?
            .ok_or_else(|| AppError::not_found("Requirement", id))
    }

    /// All requirements, newest first
    pub async fn list_requirements(&self) -> AppResult<Vec<Requirement>> {
        let mut requirements: Vec<Requirement> =
            store::list(self.store.as_ref(), collections::REQUIREMENTS, &Query::new()).await?;
        requirements.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(requirements)
    }

    /// Requirements with at least one item still pending or classified
    pub async fn inbox(&self) -> AppResult<Vec<Requirement>> {
        let requirements = self.list_requirements().await?;
        Ok(requirements.into_iter().filter(Requirement::has_open_items).collect())
    }

    /// Attach a product family to an item. Re-classifying overwrites.
    pub async fn classify_item(
        &self,
        actor: &Actor,
        requirement_id: &str,
        item_index: usize,
        input: ClassifyItemInput,
    ) -> AppResult<Requirement> {
        let product_id = input.product_id.trim();
        if product_id.is_empty() {
            return Err(AppError::validation(
                "productId",
                "A product family must be selected",
                "Debe seleccionar una familia de producto",
            ));
        }

        let mut tx = self.store.begin().await?;
        let mut requirement: Requirement =
            store::tx_fetch(tx.as_mut(), collections::REQUIREMENTS, requirement_id)
                .await?
                .ok_or_else(|| AppError::not_found("Requirement", requirement_id))?;

        let item = requirement
            .items
            .get_mut(item_index)
            .ok_or_else(|| AppError::not_found("Requirement item", &item_index.to_string()))?;

        if item.status == RequirementItemStatus::AnalysisStarted {
            return Err(AppError::PreconditionFailed(format!(
                "Analysis already started for \"{}\"",
                item.requested_product
            )));
        }

        item.status = RequirementItemStatus::Classified;
        item.product_id = Some(product_id.to_string());
        item.category_id = input.category_id.filter(|c| !c.trim().is_empty());

        tx.update(
            collections::REQUIREMENTS,
            requirement_id,
            store::patch(json!({ "items": requirement.items }))?,
        )?;
        tx.commit().await?;

        tracing::info!(
            requirement_id,
            item_index,
            product_id,
            user_id = %actor.user_id,
            "Requirement item classified"
        );
        Ok(requirement)
    }

    /// Open an opportunity for a classified item and mark the item as started
    pub async fn start_analysis(
        &self,
        actor: &Actor,
        requirement_id: &str,
        item_index: usize,
    ) -> AppResult<Opportunity> {
        let mut tx = self.store.begin().await?;
        let mut requirement: Requirement =
            store::tx_fetch(tx.as_mut(), collections::REQUIREMENTS, requirement_id)
                .await?
                .ok_or_else(|| AppError::not_found("Requirement", requirement_id))?;

        let item = requirement
            .items
            .get_mut(item_index)
            .ok_or_else(|| AppError::not_found("Requirement item", &item_index.to_string()))?;

        if !item.is_classified() {
            return Err(AppError::PreconditionFailed(format!(
                "Item \"{}\" must be classified before analysis can start",
                item.requested_product
            )));
        }

        let opportunity = Opportunity {
            id: self.store.new_id(),
            requirement_id: Some(requirement.id.clone()),
            product_id: item.product_id.clone(),
            product_name: item.requested_product.clone(),
            source: requirement.source,
            specifics: OpportunitySpecifics {
                brand: item.brand.clone().unwrap_or_default(),
                presentation: item.presentation.clone().unwrap_or_default(),
                dosage: item.dosage.clone().unwrap_or_default(),
                quantity: item.quantity.clone().unwrap_or_default(),
            },
            status: OpportunityStatus::Analysis,
            end_goal: requirement.source.end_goal(),
            provider_quotes: Vec::new(),
            competitor_analysis: Vec::new(),
            created_at: Utc::now(),
            created_by: actor.user_id.clone(),
            approved_at: None,
            approved_by: None,
            approved_exchange_rate: None,
            rejected_at: None,
            decision_notes: None,
        };
        item.status = RequirementItemStatus::AnalysisStarted;

        tx.create(
            collections::OPPORTUNITIES,
            &opportunity.id,
            store::encode(&opportunity)?,
        )?;
        tx.update(
            collections::REQUIREMENTS,
            requirement_id,
            store::patch(json!({ "items": requirement.items }))?,
        )?;
        tx.commit().await?;

        tracing::info!(
            requirement_id,
            item_index,
            opportunity_id = %opportunity.id,
            end_goal = ?opportunity.end_goal,
            "Analysis started"
        );
        Ok(opportunity)
    }
}
