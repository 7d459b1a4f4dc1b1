//! Opportunity margin analysis
//!
//! Pure function of an opportunity's provider quotes, competitor observations
//! and the USD→PEN rate. Derives the cheapest sourcing cost, a reference sale
//! price and three pricing scenarios, and produces an advisory
//! recommendation. Nothing here blocks approval.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{CompetitorEntry, ProviderQuote};

/// Tunable scenario multipliers and the approval threshold.
///
/// Two sets of multipliers exist in practice (0.80/1.00/1.10 and
/// 0.85/1.00/1.15); both are available and the choice is configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PricingConfig {
    pub competitive_multiplier: Decimal,
    pub average_multiplier: Decimal,
    pub premium_multiplier: Decimal,
    /// Average-scenario margin (in %) that must be exceeded for `APPROVE`
    pub approve_threshold_percent: Decimal,
}

impl PricingConfig {
    /// 0.85 / 1.00 / 1.15 multiplier set
    pub fn wide_band() -> Self {
        Self {
            competitive_multiplier: Decimal::new(85, 2),
            average_multiplier: Decimal::ONE,
            premium_multiplier: Decimal::new(115, 2),
            approve_threshold_percent: Decimal::from(30),
        }
    }
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            competitive_multiplier: Decimal::new(80, 2),
            average_multiplier: Decimal::ONE,
            premium_multiplier: Decimal::new(110, 2),
            approve_threshold_percent: Decimal::from(30),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioKind {
    Competitive,
    Average,
    Premium,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PricingScenario {
    pub kind: ScenarioKind,
    pub price: Decimal,
    /// `None` when the price is not positive (margin undefined)
    pub margin_percent: Option<Decimal>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    Approve,
    Review,
}

/// Where the reference sale price came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReferencePriceSource {
    CompetitorAverage,
    /// No competitors recorded yet: best cost × 2
    DefaultMarkup,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BestProvider {
    pub quote_id: String,
    pub name: String,
    pub cost_pen: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MarginReport {
    pub exchange_rate: Decimal,
    pub best_provider: BestProvider,
    pub reference_price: Decimal,
    pub reference_source: ReferencePriceSource,
    pub scenarios: Vec<PricingScenario>,
    pub recommendation: Recommendation,
}

impl MarginReport {
    pub fn scenario(&self, kind: ScenarioKind) -> Option<&PricingScenario> {
        self.scenarios.iter().find(|s| s.kind == kind)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MarginAnalysis {
    /// No provider quotes, or no usable exchange rate
    InsufficientData,
    Complete(MarginReport),
}

impl MarginAnalysis {
    pub fn report(&self) -> Option<&MarginReport> {
        match self {
            MarginAnalysis::InsufficientData => None,
            MarginAnalysis::Complete(report) => Some(report),
        }
    }

    pub fn recommendation(&self) -> Option<Recommendation> {
        self.report().map(|r| r.recommendation)
    }
}

/// `(price − cost) / price × 100`, undefined for non-positive prices
pub fn margin_percent(price: Decimal, cost: Decimal) -> Option<Decimal> {
    if price <= Decimal::ZERO {
        return None;
    }
    Some((price - cost) / price * Decimal::ONE_HUNDRED)
}

/// Cheapest quote in PEN. Ties keep the first quote in list order.
pub fn best_provider(quotes: &[ProviderQuote], rate: Decimal) -> Option<(&ProviderQuote, Decimal)> {
    let mut best: Option<(&ProviderQuote, Decimal)> = None;
    for quote in quotes {
        let cost = quote.total_cost_pen(rate);
        match best {
            Some((_, best_cost)) if cost >= best_cost => {}
            _ => best = Some((quote, cost)),
        }
    }
    best
}

/// Mean competitor sale price, or `None` when no competitors are recorded
pub fn competitor_average(competitors: &[CompetitorEntry]) -> Option<Decimal> {
    if competitors.is_empty() {
        return None;
    }
    let sum: Decimal = competitors.iter().map(|c| c.sale_price).sum();
    Some(sum / Decimal::from(competitors.len()))
}

/// Run the full margin analysis
pub fn analyze_margins(
    quotes: &[ProviderQuote],
    competitors: &[CompetitorEntry],
    rate: Option<Decimal>,
    config: &PricingConfig,
) -> MarginAnalysis {
    let rate = match rate {
        Some(rate) if rate > Decimal::ZERO => rate,
        _ => return MarginAnalysis::InsufficientData,
    };
    let Some((best, best_cost)) = best_provider(quotes, rate) else {
        return MarginAnalysis::InsufficientData;
    };

    let (reference_price, reference_source) = match competitor_average(competitors) {
        Some(avg) => (avg, ReferencePriceSource::CompetitorAverage),
        None => (best_cost * Decimal::TWO, ReferencePriceSource::DefaultMarkup),
    };

    let scenarios: Vec<PricingScenario> = [
        (ScenarioKind::Competitive, config.competitive_multiplier),
        (ScenarioKind::Average, config.average_multiplier),
        (ScenarioKind::Premium, config.premium_multiplier),
    ]
    .into_iter()
    .map(|(kind, multiplier)| {
        let price = reference_price * multiplier;
        PricingScenario {
            kind,
            price,
            margin_percent: margin_percent(price, best_cost),
        }
    })
    .collect();

    let average_margin = scenarios
        .iter()
        .find(|s| s.kind == ScenarioKind::Average)
        .and_then(|s| s.margin_percent);
    let recommendation = match average_margin {
        Some(m) if m > config.approve_threshold_percent => Recommendation::Approve,
        _ => Recommendation::Review,
    };

    MarginAnalysis::Complete(MarginReport {
        exchange_rate: rate,
        best_provider: BestProvider {
            quote_id: best.id.clone(),
            name: best.name.clone(),
            cost_pen: best_cost,
        },
        reference_price,
        reference_source,
        scenarios,
        recommendation,
    })
}
