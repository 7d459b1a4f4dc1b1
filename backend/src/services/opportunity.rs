//! Opportunity engine: quote and competitor capture, margin analysis and
//! the approve/reject decision

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use shared::{
    analyze_margins, new_entry_id, validate_name, validate_price, Actor, CompetitorEntry,
    Currency, MarginAnalysis, Opportunity, OpportunityStatus, PricingConfig, ProviderQuote,
};

use crate::error::{AppError, AppResult};
use crate::services::RateCache;
use crate::store::{self, collections, Query, SharedStore, Transaction};

#[derive(Clone)]
pub struct OpportunityService {
    store: SharedStore,
    rate_cache: RateCache,
    pricing: PricingConfig,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderQuoteInput {
    pub name: String,
    pub price: Decimal,
    /// Defaults to USD
    pub currency: Option<Currency>,
    #[serde(default)]
    pub shipping_cost: Decimal,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitorEntryInput {
    pub name: String,
    pub sale_price: Decimal,
    pub competitor_link: Option<String>,
    pub phone_number: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionInput {
    pub notes: Option<String>,
}

/// Which embedded list an entry lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Provider,
    Competitor,
}

impl ProviderQuoteInput {
    fn validate(&self) -> AppResult<()> {
        validate_name(&self.name).map_err(|msg| AppError::Validation {
            field: "name".to_string(),
            message: msg.to_string(),
            message_es: "El nombre del proveedor no puede estar vacío".to_string(),
        })?;
        for (field, amount) in [("price", self.price), ("shippingCost", self.shipping_cost)] {
            validate_price(amount).map_err(|msg| AppError::Validation {
                field: field.to_string(),
                message: msg.to_string(),
                message_es: "El monto debe estar entre 0 y 1 000 000 000 000".to_string(),
            })?;
        }
        Ok(())
    }
}

impl CompetitorEntryInput {
    fn validate(&self) -> AppResult<()> {
        validate_name(&self.name).map_err(|msg| AppError::Validation {
            field: "name".to_string(),
            message: msg.to_string(),
            message_es: "El nombre del competidor no puede estar vacío".to_string(),
        })?;
        validate_price(self.sale_price).map_err(|msg| AppError::Validation {
            field: "salePrice".to_string(),
            message: msg.to_string(),
            message_es: "El precio debe estar entre 0 y 1 000 000 000 000".to_string(),
        })
    }
}

fn ensure_editable(opportunity: &Opportunity) -> AppResult<()> {
    if opportunity.is_editable() {
        Ok(())
    } else {
        Err(AppError::InvalidStateTransition(format!(
            "Opportunity {} is {}; quotes and competitors can only change during analysis",
            opportunity.id, opportunity.status
        )))
    }
}

/// Status an approval moves the opportunity to, if it may be approved now
fn approval_target(opportunity: &Opportunity) -> AppResult<OpportunityStatus> {
    if opportunity.provider_quotes.is_empty() {
        return Err(AppError::PreconditionFailed(
            "At least one provider quote is required before approval".to_string(),
        ));
    }
    let next = opportunity.end_goal.approved_status();
    if !opportunity.status.can_transition_to(next) {
        return Err(AppError::InvalidStateTransition(format!(
            "Cannot approve opportunity {} from {}",
            opportunity.id, opportunity.status
        )));
    }
    Ok(next)
}

impl OpportunityService {
    pub fn new(store: SharedStore, rate_cache: RateCache, pricing: PricingConfig) -> Self {
        Self {
            store,
            rate_cache,
            pricing,
        }
    }

    pub async fn get_opportunity(&self, id: &str) -> AppResult<Opportunity> {
        store::fetch(self.store.as_ref(), collections::OPPORTUNITIES, id)
            .await?
            .ok_or_else(|| AppError::not_found("Opportunity", id))
    }

    /// Opportunities, optionally narrowed to one status, newest first
    pub async fn list_opportunities(
        &self,
        status: Option<OpportunityStatus>,
    ) -> AppResult<Vec<Opportunity>> {
        let query = match status {
            Some(status) => Query::new().filter("status", status.as_str()),
            None => Query::new(),
        };
        let mut opportunities: Vec<Opportunity> =
            store::list(self.store.as_ref(), collections::OPPORTUNITIES, &query).await?;
        opportunities.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(opportunities)
    }

    /// Append a provider quote. USD quotes capture the current rate.
    pub async fn add_provider_quote(
        &self,
        actor: &Actor,
        opportunity_id: &str,
        input: ProviderQuoteInput,
    ) -> AppResult<Opportunity> {
        input.validate()?;
        ensure_editable(&self.get_opportunity(opportunity_id).await?)?;
        let currency = input.currency.unwrap_or_default();
        let saved_exchange_rate = self.snapshot_rate(currency).await;

        let quote = ProviderQuote {
            id: new_entry_id("prov"),
            name: input.name.trim().to_string(),
            price: input.price,
            currency,
            shipping_cost: input.shipping_cost,
            saved_exchange_rate,
            created_at: Utc::now(),
        };
        let quote_id = quote.id.clone();

        let opportunity = self
            .modify(opportunity_id, |opportunity, tx| {
                opportunity.provider_quotes.push(quote);
                tx.update(
                    collections::OPPORTUNITIES,
                    &opportunity.id,
                    store::patch(json!({ "providerQuotes": opportunity.provider_quotes }))?,
                )?;
                Ok(())
            })
            .await?;

        tracing::info!(
            opportunity_id,
            quote_id = %quote_id,
            user_id = %actor.user_id,
            "Provider quote added"
        );
        Ok(opportunity)
    }

    /// Edit a quote in place; a USD quote re-snapshots the rate
    pub async fn update_provider_quote(
        &self,
        actor: &Actor,
        opportunity_id: &str,
        quote_id: &str,
        input: ProviderQuoteInput,
    ) -> AppResult<Opportunity> {
        input.validate()?;
        let current = self.get_opportunity(opportunity_id).await?;
        ensure_editable(&current)?;
        if !current.provider_quotes.iter().any(|q| q.id == quote_id) {
            return Err(AppError::not_found("Provider quote", quote_id));
        }
        let currency = input.currency.unwrap_or_default();
        let saved_exchange_rate = self.snapshot_rate(currency).await;

        let opportunity = self
            .modify(opportunity_id, |opportunity, tx| {
                let quote = opportunity
                    .provider_quotes
                    .iter_mut()
                    .find(|q| q.id == quote_id)
                    .ok_or_else(|| AppError::not_found("Provider quote", quote_id))?;
                quote.name = input.name.trim().to_string();
                quote.price = input.price;
                quote.currency = currency;
                quote.shipping_cost = input.shipping_cost;
                quote.saved_exchange_rate = saved_exchange_rate;

                tx.update(
                    collections::OPPORTUNITIES,
                    &opportunity.id,
                    store::patch(json!({ "providerQuotes": opportunity.provider_quotes }))?,
                )?;
                Ok(())
            })
            .await?;

        tracing::info!(opportunity_id, quote_id, user_id = %actor.user_id, "Provider quote updated");
        Ok(opportunity)
    }

    pub async fn add_competitor_entry(
        &self,
        actor: &Actor,
        opportunity_id: &str,
        input: CompetitorEntryInput,
    ) -> AppResult<Opportunity> {
        input.validate()?;

        let entry = CompetitorEntry {
            id: new_entry_id("comp"),
            name: input.name.trim().to_string(),
            sale_price: input.sale_price,
            competitor_link: input.competitor_link,
            phone_number: input.phone_number,
            notes: input.notes,
            created_at: Utc::now(),
        };
        let entry_id = entry.id.clone();

        let opportunity = self
            .modify(opportunity_id, |opportunity, tx| {
                opportunity.competitor_analysis.push(entry);
                tx.update(
                    collections::OPPORTUNITIES,
                    &opportunity.id,
                    store::patch(json!({ "competitorAnalysis": opportunity.competitor_analysis }))?,
                )?;
                Ok(())
            })
            .await?;

        tracing::info!(
            opportunity_id,
            entry_id = %entry_id,
            user_id = %actor.user_id,
            "Competitor entry added"
        );
        Ok(opportunity)
    }

    /// Remove a quote or competitor entry by id; unknown ids are a no-op
    pub async fn remove_item(
        &self,
        actor: &Actor,
        opportunity_id: &str,
        kind: EntryKind,
        item_id: &str,
    ) -> AppResult<Opportunity> {
        let opportunity = self
            .modify(opportunity_id, |opportunity, tx| {
                let fields = match kind {
                    EntryKind::Provider => {
                        let before = opportunity.provider_quotes.len();
                        opportunity.provider_quotes.retain(|q| q.id != item_id);
                        if opportunity.provider_quotes.len() == before {
                            return Ok(());
                        }
                        json!({ "providerQuotes": opportunity.provider_quotes })
                    }
                    EntryKind::Competitor => {
                        let before = opportunity.competitor_analysis.len();
                        opportunity.competitor_analysis.retain(|c| c.id != item_id);
                        if opportunity.competitor_analysis.len() == before {
                            return Ok(());
                        }
                        json!({ "competitorAnalysis": opportunity.competitor_analysis })
                    }
                };
                tx.update(collections::OPPORTUNITIES, &opportunity.id, store::patch(fields)?)?;
                Ok(())
            })
            .await?;

        tracing::info!(
            opportunity_id,
            item_id,
            kind = ?kind,
            user_id = %actor.user_id,
            "Opportunity entry removed"
        );
        Ok(opportunity)
    }

    /// Margin analysis at the current rate
    pub async fn analyze(&self, opportunity_id: &str) -> AppResult<MarginAnalysis> {
        let opportunity = self.get_opportunity(opportunity_id).await?;
        let rate = self.rate_cache.current_rate().await;
        Ok(analyze_margins(
            &opportunity.provider_quotes,
            &opportunity.competitor_analysis,
            Some(rate),
            &self.pricing,
        ))
    }

    /// Approve toward the end goal's state, snapshotting the current rate
    pub async fn approve(
        &self,
        actor: &Actor,
        opportunity_id: &str,
        input: DecisionInput,
    ) -> AppResult<Opportunity> {
        // Refused approvals never reach the rate provider
        approval_target(&self.get_opportunity(opportunity_id).await?)?;
        let rate = self.rate_cache.current_rate().await;

        let opportunity = self
            .modify_any_status(opportunity_id, |opportunity, tx| {
                let next = approval_target(opportunity)?;

                let now = Utc::now();
                opportunity.status = next;
                opportunity.approved_at = Some(now);
                opportunity.approved_by = Some(actor.user_id.clone());
                opportunity.approved_exchange_rate = Some(rate);
                opportunity.decision_notes = input.notes;

                tx.update(
                    collections::OPPORTUNITIES,
                    &opportunity.id,
                    store::patch(json!({
                        "status": opportunity.status,
                        "approvedAt": now,
                        "approvedBy": actor.user_id,
                        "approvedExchangeRate": rate,
                        "decisionNotes": opportunity.decision_notes,
                    }))?,
                )?;
                Ok(())
            })
            .await?;

        tracing::info!(
            opportunity_id,
            status = %opportunity.status,
            rate = %rate,
            user_id = %actor.user_id,
            "Opportunity approved"
        );
        Ok(opportunity)
    }

    /// Reject an opportunity under analysis. Rejecting twice is a no-op.
    pub async fn reject(
        &self,
        actor: &Actor,
        opportunity_id: &str,
        input: DecisionInput,
    ) -> AppResult<Opportunity> {
        let opportunity = self
            .modify_any_status(opportunity_id, |opportunity, tx| {
                if opportunity.status == OpportunityStatus::Rejected {
                    return Ok(());
                }
                if !opportunity.status.can_transition_to(OpportunityStatus::Rejected) {
                    return Err(AppError::InvalidStateTransition(format!(
                        "Cannot reject opportunity {} from {}",
                        opportunity.id, opportunity.status
                    )));
                }

                let now = Utc::now();
                opportunity.status = OpportunityStatus::Rejected;
                opportunity.rejected_at = Some(now);
                opportunity.decision_notes = input.notes;

                tx.update(
                    collections::OPPORTUNITIES,
                    &opportunity.id,
                    store::patch(json!({
                        "status": opportunity.status,
                        "rejectedAt": now,
                        "decisionNotes": opportunity.decision_notes,
                    }))?,
                )?;
                Ok(())
            })
            .await?;

        tracing::info!(opportunity_id, user_id = %actor.user_id, "Opportunity rejected");
        Ok(opportunity)
    }

    async fn snapshot_rate(&self, currency: Currency) -> Option<Decimal> {
        match currency {
            Currency::Usd => Some(self.rate_cache.current_rate().await),
            Currency::Pen => None,
        }
    }

    /// Transactional read-modify-write on an opportunity still in analysis
    async fn modify<F>(&self, opportunity_id: &str, apply: F) -> AppResult<Opportunity>
    where
        F: FnOnce(&mut Opportunity, &mut dyn Transaction) -> AppResult<()> + Send,
    {
        self.modify_any_status(opportunity_id, |opportunity, tx| {
            ensure_editable(opportunity)?;
            apply(opportunity, tx)
        })
        .await
    }

    async fn modify_any_status<F>(&self, opportunity_id: &str, apply: F) -> AppResult<Opportunity>
    where
        F: FnOnce(&mut Opportunity, &mut dyn Transaction) -> AppResult<()> + Send,
    {
        let mut tx = self.store.begin().await?;
        let mut opportunity: Opportunity =
            store::tx_fetch(tx.as_mut(), collections::OPPORTUNITIES, opportunity_id)
                .await?
                .ok_or_else(|| AppError::not_found("Opportunity", opportunity_id))?;

        apply(&mut opportunity, tx.as_mut())?;
        tx.commit().await?;
        Ok(opportunity)
    }
}
