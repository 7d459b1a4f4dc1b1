//! Shared fixtures for backend integration tests
#![allow(dead_code)]

use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use pipeline_backend::config::{Config, ExchangeRateConfig};
use pipeline_backend::external::{RateProvider, RateProviderError};
use pipeline_backend::services::catalog::{CreateNamedInput, CreateProductFamilyInput, CreateSkuInput};
use pipeline_backend::services::requirement::{
    ClassifyItemInput, CreateRequirementInput, RequirementItemInput,
};
use pipeline_backend::services::{CatalogService, OpportunityService, RateCache, RequirementService};
use pipeline_backend::store::{self, collections, MemoryStore, SharedStore};
use pipeline_backend::AppState;
use rust_decimal::Decimal;
use serde_json::json;
use shared::{Actor, Opportunity, PricingConfig, RequirementSource, Sku, SkuAttributes, StockLevels, StockLocation};

// ============================================================================
// Rate provider stub
// ============================================================================

/// Scripted rate provider; `None` makes every fetch fail
pub struct StubRateProvider {
    rate: Mutex<Option<Decimal>>,
    calls: AtomicUsize,
}

impl StubRateProvider {
    pub fn returning(rate: Decimal) -> Arc<Self> {
        Arc::new(Self {
            rate: Mutex::new(Some(rate)),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            rate: Mutex::new(None),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn set_rate(&self, rate: Option<Decimal>) {
        *self.rate.lock().unwrap() = rate;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RateProvider for StubRateProvider {
    async fn fetch_usd_to_pen(&self) -> Result<Decimal, RateProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let rate = *self.rate.lock().unwrap();
        rate.ok_or(RateProviderError::MissingRate)
    }

    fn source_name(&self) -> &str {
        "stub"
    }
}

// ============================================================================
// Builders
// ============================================================================

pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

pub fn actor() -> Actor {
    Actor::new("user-1").with_name("Ana Quispe")
}

pub fn memory_store() -> SharedStore {
    Arc::new(MemoryStore::new())
}

pub fn rate_cache(store: &SharedStore, provider: Arc<StubRateProvider>) -> RateCache {
    RateCache::new(store.clone(), provider, &ExchangeRateConfig::default())
}

pub fn opportunity_service(store: &SharedStore, provider: Arc<StubRateProvider>) -> OpportunityService {
    OpportunityService::new(
        store.clone(),
        rate_cache(store, provider),
        PricingConfig::default(),
    )
}

pub fn app_state(store: &SharedStore, provider: Arc<StubRateProvider>) -> AppState {
    AppState::new(store.clone(), rate_cache(store, provider), Config::default())
}

// ============================================================================
// Seed data
// ============================================================================

/// Requirement with one classified item, moved into analysis
pub async fn open_opportunity(store: &SharedStore, source: RequirementSource) -> Opportunity {
    let requirements = RequirementService::new(store.clone());
    let requirement = requirements
        .create_requirement(
            &actor(),
            CreateRequirementInput {
                source,
                contact_info: Some("Farmacia San Juan".to_string()),
                notes: None,
                items: vec![RequirementItemInput {
                    requested_product: "Vitamina D3".to_string(),
                    brand: Some("Now Foods".to_string()),
                    presentation: Some("Cápsulas".to_string()),
                    dosage: Some("5000 UI".to_string()),
                    quantity: Some("120".to_string()),
                }],
            },
        )
        .await
        .unwrap();

    requirements
        .classify_item(
            &actor(),
            &requirement.id,
            0,
            ClassifyItemInput {
                category_id: Some("cat-vitaminas".to_string()),
                product_id: "prod-vitamina-d".to_string(),
            },
        )
        .await
        .unwrap();

    requirements
        .start_analysis(&actor(), &requirement.id, 0)
        .await
        .unwrap()
}

/// Category, product family, brand and a SKU with the given stock
pub async fn seed_sku(store: &SharedStore, stock: &[(StockLocation, u32)]) -> Sku {
    let catalog = CatalogService::new(store.clone());
    let category = catalog
        .create_category(&actor(), CreateNamedInput { name: "Vitaminas".to_string() })
        .await
        .unwrap();
    let product = catalog
        .create_product_family(
            &actor(),
            CreateProductFamilyInput {
                name: "Vitamina C".to_string(),
                category_id: category.id,
                description: None,
            },
        )
        .await
        .unwrap();
    let brand = catalog
        .create_brand(&actor(), CreateNamedInput { name: "Bayer".to_string() })
        .await
        .unwrap();
    let sku = catalog
        .create_sku(
            &actor(),
            CreateSkuInput {
                product_id: product.id,
                brand_id: brand.id,
                sku_code: "VC-500-30".to_string(),
                attributes: SkuAttributes {
                    presentation: "Tabletas".to_string(),
                    dosage: "500mg".to_string(),
                    quantity: 30,
                },
                sale_price: dec("25.00"),
                purchase_price: dec("10.00"),
                opportunity_id: None,
            },
        )
        .await
        .unwrap();

    set_stock(store, &sku.id, stock).await
}

/// Overwrite a SKU's stock directly
pub async fn set_stock(store: &SharedStore, sku_id: &str, levels: &[(StockLocation, u32)]) -> Sku {
    let mut stock = StockLevels::zeroed();
    for (location, quantity) in levels {
        stock.credit(*location, *quantity).unwrap();
    }
    store
        .update(
            collections::SKUS,
            sku_id,
            store::patch(json!({ "stock": stock })).unwrap(),
        )
        .await
        .unwrap();
    load_sku(store, sku_id).await
}

pub async fn load_sku(store: &SharedStore, sku_id: &str) -> Sku {
    store::fetch(store.as_ref(), collections::SKUS, sku_id)
        .await
        .unwrap()
        .unwrap()
}

pub async fn load_opportunity(store: &SharedStore, id: &str) -> Opportunity {
    store::fetch(store.as_ref(), collections::OPPORTUNITIES, id)
        .await
        .unwrap()
        .unwrap()
}
