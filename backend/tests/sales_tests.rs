//! Sales ledger and stock tests
//!
//! Property: a sale either applies every line or changes nothing.

mod common;

use pipeline_backend::error::AppError;
use pipeline_backend::services::inventory::TransferStockInput;
use pipeline_backend::services::sales::{RegisterSaleInput, SaleLineInput};
use pipeline_backend::services::{InventoryService, SalesService};
use pipeline_backend::store::{collections, MemoryStore, SharedStore};
use proptest::prelude::*;
use shared::StockLocation;
use std::sync::Arc;

use common::{actor, dec, load_sku, seed_sku};

fn line(sku_id: &str, quantity: u32) -> SaleLineInput {
    SaleLineInput {
        sku_id: sku_id.to_string(),
        quantity,
        sale_price: None,
        location: None,
    }
}

fn sale(items: Vec<SaleLineInput>) -> RegisterSaleInput {
    RegisterSaleInput {
        customer_name: "Cliente mostrador".to_string(),
        customer_id: None,
        items,
    }
}

fn sales_service(store: &SharedStore) -> SalesService {
    SalesService::new(store.clone(), StockLocation::LaVictoria)
}

// ============================================================================
// Sales
// ============================================================================

#[tokio::test]
async fn sale_decrements_stock_and_totals_lines() {
    let memory = Arc::new(MemoryStore::new());
    let store: SharedStore = memory.clone();
    let sku = seed_sku(&store, &[(StockLocation::LaVictoria, 10), (StockLocation::Smp, 4)]).await;

    let registered = sales_service(&store)
        .register_sale(
            &actor(),
            sale(vec![
                line(&sku.id, 3),
                SaleLineInput {
                    sku_id: sku.id.clone(),
                    quantity: 2,
                    sale_price: Some(dec("20.00")),
                    location: Some(StockLocation::Smp),
                },
            ]),
        )
        .await
        .unwrap();

    // 3 × 25.00 at the SKU price + 2 × 20.00 override
    assert_eq!(registered.total_sale, dec("115.00"));
    assert_eq!(registered.items[0].full_name, sku.full_name);
    assert_eq!(registered.created_by, "user-1");

    let after = load_sku(&store, &sku.id).await;
    assert_eq!(after.stock.get(StockLocation::LaVictoria), 7);
    assert_eq!(after.stock.get(StockLocation::Smp), 2);
    assert_eq!(memory.count(collections::SALES).await, 1);
}

#[tokio::test]
async fn one_short_line_fails_the_whole_sale() {
    let memory = Arc::new(MemoryStore::new());
    let store: SharedStore = memory.clone();
    let plenty = seed_sku(&store, &[(StockLocation::LaVictoria, 50)]).await;
    let scarce = seed_sku(&store, &[(StockLocation::LaVictoria, 1)]).await;

    let err = sales_service(&store)
        .register_sale(&actor(), sale(vec![line(&plenty.id, 5), line(&scarce.id, 2)]))
        .await
        .unwrap_err();

    match err {
        AppError::InsufficientStock {
            sku_id,
            available,
            requested,
            ..
        } => {
            assert_eq!(sku_id, scarce.id);
            assert_eq!(available, 1);
            assert_eq!(requested, 2);
        }
        other => panic!("expected insufficient stock, got {:?}", other),
    }

    assert_eq!(load_sku(&store, &plenty.id).await.stock.get(StockLocation::LaVictoria), 50);
    assert_eq!(load_sku(&store, &scarce.id).await.stock.get(StockLocation::LaVictoria), 1);
    assert_eq!(memory.count(collections::SALES).await, 0);
}

#[tokio::test]
async fn demand_is_aggregated_across_lines() {
    let store: SharedStore = Arc::new(MemoryStore::new());
    let sku = seed_sku(&store, &[(StockLocation::LaVictoria, 5)]).await;

    let err = sales_service(&store)
        .register_sale(&actor(), sale(vec![line(&sku.id, 3), line(&sku.id, 3)]))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InsufficientStock { requested: 6, .. }));
    assert_eq!(load_sku(&store, &sku.id).await.stock.get(StockLocation::LaVictoria), 5);
}

#[tokio::test]
async fn invalid_sales_are_rejected_up_front() {
    let store: SharedStore = Arc::new(MemoryStore::new());
    let sku = seed_sku(&store, &[(StockLocation::LaVictoria, 5)]).await;
    let service = sales_service(&store);

    let err = service.register_sale(&actor(), sale(vec![])).await.unwrap_err();
    assert!(matches!(err, AppError::Validation { ref field, .. } if field == "items"));

    let err = service
        .register_sale(&actor(), sale(vec![line(&sku.id, 0)]))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation { ref field, .. } if field == "quantity"));

    let err = service
        .register_sale(&actor(), sale(vec![line("missing-sku", 1)]))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let mut oversized = line(&sku.id, 2);
    oversized.sale_price = Some(rust_decimal::Decimal::MAX);
    let err = service
        .register_sale(&actor(), sale(vec![oversized]))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation { ref field, .. } if field == "salePrice"));
    assert_eq!(load_sku(&store, &sku.id).await.stock.get(StockLocation::LaVictoria), 5);
}

#[tokio::test]
async fn concurrent_sales_never_oversell() {
    let store: SharedStore = Arc::new(MemoryStore::new());
    let sku = seed_sku(&store, &[(StockLocation::LaVictoria, 5)]).await;
    let service = sales_service(&store);
    let clerk = actor();

    let (first, second) = tokio::join!(
        service.register_sale(&clerk, sale(vec![line(&sku.id, 3)])),
        service.register_sale(&clerk, sale(vec![line(&sku.id, 3)])),
    );

    let successes = [&first, &second].iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);
    for result in [first, second] {
        if let Err(e) = result {
            assert!(matches!(
                e,
                AppError::InsufficientStock { .. } | AppError::Conflict { .. }
            ));
        }
    }
    assert_eq!(load_sku(&store, &sku.id).await.stock.get(StockLocation::LaVictoria), 2);
}

// ============================================================================
// Transfers
// ============================================================================

#[tokio::test]
async fn transfer_moves_units_between_locations() {
    let store: SharedStore = Arc::new(MemoryStore::new());
    let sku = seed_sku(&store, &[(StockLocation::EnAlmacenUs, 12)]).await;
    let inventory = InventoryService::new(store.clone());

    let summary = inventory
        .transfer_stock(
            &actor(),
            &sku.id,
            TransferStockInput {
                from: StockLocation::EnAlmacenUs,
                to: StockLocation::EnTransitoPeru,
                quantity: 12,
            },
        )
        .await
        .unwrap();
    assert_eq!(summary.stock.get(StockLocation::EnAlmacenUs), 0);
    assert_eq!(summary.stock.get(StockLocation::EnTransitoPeru), 12);
    assert_eq!(summary.total, 12);
    assert_eq!(summary.available_for_sale, 0);

    inventory
        .transfer_stock(
            &actor(),
            &sku.id,
            TransferStockInput {
                from: StockLocation::EnTransitoPeru,
                to: StockLocation::Smp,
                quantity: 5,
            },
        )
        .await
        .unwrap();
    let summary = inventory.stock_summary(&sku.id).await.unwrap();
    assert_eq!(summary.available_for_sale, 5);
    assert_eq!(summary.total, 12);
}

#[tokio::test]
async fn invalid_transfers_change_nothing() {
    let store: SharedStore = Arc::new(MemoryStore::new());
    let sku = seed_sku(&store, &[(StockLocation::LaVictoria, 2)]).await;
    let inventory = InventoryService::new(store.clone());

    let same = inventory
        .transfer_stock(
            &actor(),
            &sku.id,
            TransferStockInput {
                from: StockLocation::LaVictoria,
                to: StockLocation::LaVictoria,
                quantity: 1,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(same, AppError::Validation { .. }));

    let short = inventory
        .transfer_stock(
            &actor(),
            &sku.id,
            TransferStockInput {
                from: StockLocation::LaVictoria,
                to: StockLocation::Smp,
                quantity: 3,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(short, AppError::InsufficientStock { available: 2, .. }));

    let after = load_sku(&store, &sku.id).await;
    assert_eq!(after.stock.get(StockLocation::LaVictoria), 2);
    assert_eq!(after.stock.get(StockLocation::Smp), 0);
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Either every line's stock drops by its quantity or no stock changes
    #[test]
    fn prop_sale_is_all_or_nothing(
        stocks in prop::collection::vec(0u32..20, 1..4),
        demand in prop::collection::vec((0usize..4, 1u32..15), 1..6),
    ) {
        tokio_test::block_on(async {
            let store: SharedStore = Arc::new(MemoryStore::new());
            let mut skus = Vec::new();
            for stock in &stocks {
                skus.push(seed_sku(&store, &[(StockLocation::LaVictoria, *stock)]).await);
            }

            let lines: Vec<SaleLineInput> = demand
                .iter()
                .map(|(index, quantity)| line(&skus[index % skus.len()].id, *quantity))
                .collect();
            let mut requested = vec![0u32; skus.len()];
            for (index, quantity) in &demand {
                requested[index % skus.len()] += quantity;
            }
            let fits = requested.iter().zip(&stocks).all(|(r, s)| r <= s);

            let result = sales_service(&store).register_sale(&actor(), sale(lines)).await;
            assert_eq!(result.is_ok(), fits);

            for (i, sku) in skus.iter().enumerate() {
                let level = load_sku(&store, &sku.id).await.stock.get(StockLocation::LaVictoria);
                if fits {
                    assert_eq!(level, stocks[i] - requested[i]);
                } else {
                    assert_eq!(level, stocks[i]);
                }
            }
        });
    }
}
