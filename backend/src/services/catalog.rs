//! Catalog taxonomy (categories, product families, brands) and SKUs

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use shared::{
    compose_sku_full_name, validate_name, validate_price, validate_quantity, Actor, Brand,
    Category, Opportunity, OpportunityStatus, ProductFamily, Sku, SkuAttributes, SkuOrigin,
    StockLevels,
};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::store::{self, collections, Query, SharedStore};

#[derive(Clone)]
pub struct CatalogService {
    store: SharedStore,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateNamedInput {
    #[validate(length(min = 1, max = 200, message = "Name must not be empty"))]
    pub name: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductFamilyInput {
    #[validate(length(min = 1, max = 200, message = "Name must not be empty"))]
    pub name: String,
    pub category_id: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSkuInput {
    pub product_id: String,
    pub brand_id: String,
    pub sku_code: String,
    pub attributes: SkuAttributes,
    pub sale_price: Decimal,
    pub purchase_price: Decimal,
    /// Approved-for-catalog opportunity this SKU fulfils
    pub opportunity_id: Option<String>,
}

fn name_error(msg: &str) -> AppError {
    AppError::Validation {
        field: "name".to_string(),
        message: msg.to_string(),
        message_es: "El nombre no puede estar vacío".to_string(),
    }
}

impl CatalogService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    // ------------------------------------------------------------------
    // Categories
    // ------------------------------------------------------------------

    pub async fn create_category(&self, actor: &Actor, input: CreateNamedInput) -> AppResult<Category> {
        input.validate()?;
        validate_name(&input.name).map_err(name_error)?;

        let category = Category {
            id: self.store.new_id(),
            name: input.name.trim().to_string(),
            created_at: Utc::now(),
        };
        store::insert(self.store.as_ref(), collections::CATEGORIES, &category.id, &category).await?;

        tracing::info!(category_id = %category.id, user_id = %actor.user_id, "Category created");
        Ok(category)
    }

    pub async fn list_categories(&self) -> AppResult<Vec<Category>> {
        let mut categories: Vec<Category> =
            store::list(self.store.as_ref(), collections::CATEGORIES, &Query::new()).await?;
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    /// Refused while any product family belongs to the category
    pub async fn delete_category(&self, actor: &Actor, id: &str) -> AppResult<()> {
        self.ensure_exists(collections::CATEGORIES, "Category", id).await?;
        self.ensure_unreferenced(collections::PRODUCTS, "categoryId", "Category", id)
            .await?;
        self.store.delete(collections::CATEGORIES, id).await?;

        tracing::info!(category_id = id, user_id = %actor.user_id, "Category deleted");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Product families
    // ------------------------------------------------------------------

    pub async fn create_product_family(
        &self,
        actor: &Actor,
        input: CreateProductFamilyInput,
    ) -> AppResult<ProductFamily> {
        input.validate()?;
        validate_name(&input.name).map_err(name_error)?;

        let category: Option<Category> =
            store::fetch(self.store.as_ref(), collections::CATEGORIES, &input.category_id).await?;

        let product = ProductFamily {
            id: self.store.new_id(),
            name: input.name.trim().to_string(),
            description: input.description,
            category_id: input.category_id,
            category_name: category.map(|c| c.name).unwrap_or_else(|| "N/A".to_string()),
            created_at: Utc::now(),
        };
        store::insert(self.store.as_ref(), collections::PRODUCTS, &product.id, &product).await?;

        tracing::info!(
            product_id = %product.id,
            category_id = %product.category_id,
            user_id = %actor.user_id,
            "Product family created"
        );
        Ok(product)
    }

    pub async fn list_product_families(&self, category_id: Option<&str>) -> AppResult<Vec<ProductFamily>> {
        let query = match category_id {
            Some(category_id) => Query::new().filter("categoryId", category_id),
            None => Query::new(),
        };
        let mut products: Vec<ProductFamily> =
            store::list(self.store.as_ref(), collections::PRODUCTS, &query).await?;
        products.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(products)
    }

    pub async fn delete_product_family(&self, actor: &Actor, id: &str) -> AppResult<()> {
        self.ensure_exists(collections::PRODUCTS, "Product family", id).await?;
        self.ensure_unreferenced(collections::SKUS, "productId", "Product family", id)
            .await?;
        self.store.delete(collections::PRODUCTS, id).await?;

        tracing::info!(product_id = id, user_id = %actor.user_id, "Product family deleted");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Brands
    // ------------------------------------------------------------------

    pub async fn create_brand(&self, actor: &Actor, input: CreateNamedInput) -> AppResult<Brand> {
        input.validate()?;
        validate_name(&input.name).map_err(name_error)?;

        let brand = Brand {
            id: self.store.new_id(),
            name: input.name.trim().to_string(),
            created_at: Utc::now(),
        };
        store::insert(self.store.as_ref(), collections::BRANDS, &brand.id, &brand).await?;

        tracing::info!(brand_id = %brand.id, user_id = %actor.user_id, "Brand created");
        Ok(brand)
    }

    pub async fn list_brands(&self) -> AppResult<Vec<Brand>> {
        let mut brands: Vec<Brand> =
            store::list(self.store.as_ref(), collections::BRANDS, &Query::new()).await?;
        brands.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(brands)
    }

    pub async fn delete_brand(&self, actor: &Actor, id: &str) -> AppResult<()> {
        self.ensure_exists(collections::BRANDS, "Brand", id).await?;
        self.ensure_unreferenced(collections::SKUS, "brandId", "Brand", id)
            .await?;
        self.store.delete(collections::BRANDS, id).await?;

        tracing::info!(brand_id = id, user_id = %actor.user_id, "Brand deleted");
        Ok(())
    }

    // ------------------------------------------------------------------
    // SKUs
    // ------------------------------------------------------------------

    /// Create a SKU with every stock location at zero.
    ///
    /// When `opportunity_id` is given the opportunity must be approved for
    /// the catalog; it moves to `catalogued` in the same transaction.
    pub async fn create_sku(&self, actor: &Actor, input: CreateSkuInput) -> AppResult<Sku> {
        let sku_code = input.sku_code.trim();
        if sku_code.is_empty() {
            return Err(AppError::validation(
                "skuCode",
                "SKU code must not be empty",
                "El código SKU no puede estar vacío",
            ));
        }
        validate_quantity(input.attributes.quantity).map_err(|msg| AppError::Validation {
            field: "attributes.quantity".to_string(),
            message: msg.to_string(),
            message_es: "La cantidad debe ser positiva".to_string(),
        })?;
        for (field, price) in [("salePrice", input.sale_price), ("purchasePrice", input.purchase_price)] {
            validate_price(price).map_err(|msg| AppError::Validation {
                field: field.to_string(),
                message: msg.to_string(),
                message_es: "El precio debe estar entre 0 y 1 000 000 000 000".to_string(),
            })?;
        }

        let mut tx = self.store.begin().await?;
        let product: ProductFamily =
            store::tx_fetch(tx.as_mut(), collections::PRODUCTS, &input.product_id)
                .await?
                .ok_or_else(|| AppError::not_found("Product family", &input.product_id))?;
        let brand: Brand = store::tx_fetch(tx.as_mut(), collections::BRANDS, &input.brand_id)
            .await?
            .ok_or_else(|| AppError::not_found("Brand", &input.brand_id))?;

        let origin = match &input.opportunity_id {
            Some(opportunity_id) => {
                let opportunity: Opportunity =
                    store::tx_fetch(tx.as_mut(), collections::OPPORTUNITIES, opportunity_id)
                        .await?
                        .ok_or_else(|| AppError::not_found("Opportunity", opportunity_id))?;
                if !opportunity.status.can_transition_to(OpportunityStatus::Catalogued) {
                    return Err(AppError::InvalidStateTransition(format!(
                        "Opportunity {} is {}, expected approved_for_catalog",
                        opportunity.id, opportunity.status
                    )));
                }
                SkuOrigin::Opportunity {
                    id: opportunity.id,
                }
            }
            None => SkuOrigin::Manual,
        };

        let sku = Sku {
            id: self.store.new_id(),
            full_name: compose_sku_full_name(&product.name, &brand.name, &input.attributes),
            product_id: product.id,
            product_name: product.name,
            category_id: product.category_id,
            category_name: product.category_name,
            brand_id: brand.id,
            brand_name: brand.name,
            sku_code: sku_code.to_string(),
            attributes: input.attributes,
            stock: StockLevels::zeroed(),
            sale_price: input.sale_price,
            purchase_price: input.purchase_price,
            active: true,
            origin,
            created_at: Utc::now(),
            created_by: actor.user_id.clone(),
        };

        tx.create(collections::SKUS, &sku.id, store::encode(&sku)?)?;
        if let Some(opportunity_id) = sku.origin.opportunity_id() {
            tx.update(
                collections::OPPORTUNITIES,
                opportunity_id,
                store::patch(json!({ "status": OpportunityStatus::Catalogued }))?,
            )?;
        }
        tx.commit().await?;

        tracing::info!(
            sku_id = %sku.id,
            full_name = %sku.full_name,
            opportunity_id = ?sku.origin.opportunity_id(),
            "SKU created"
        );
        Ok(sku)
    }

    pub async fn get_sku(&self, id: &str) -> AppResult<Sku> {
        store::fetch(self.store.as_ref(), collections::SKUS, id)
            .await?
            .ok_or_else(|| AppError::not_found("SKU", id))
    }

    pub async fn list_skus(&self, active_only: bool) -> AppResult<Vec<Sku>> {
        let query = if active_only {
            Query::new().filter("active", true)
        } else {
            Query::new()
        };
        let mut skus: Vec<Sku> = store::list(self.store.as_ref(), collections::SKUS, &query).await?;
        skus.sort_by(|a, b| a.full_name.cmp(&b.full_name));
        Ok(skus)
    }

    /// Unguarded: sales and purchase orders keep their denormalised names
    pub async fn delete_sku(&self, actor: &Actor, id: &str) -> AppResult<()> {
        self.store.delete(collections::SKUS, id).await?;
        tracing::info!(sku_id = id, user_id = %actor.user_id, "SKU deleted");
        Ok(())
    }

    /// Opportunities approved for the catalog and waiting for a SKU
    pub async fn catalog_candidates(&self) -> AppResult<Vec<Opportunity>> {
        self.opportunities_in(OpportunityStatus::ApprovedForCatalog).await
    }

    /// Approved-for-catalog opportunities procurement may buy for
    pub async fn purchase_candidates(&self) -> AppResult<Vec<Opportunity>> {
        self.opportunities_in(OpportunityStatus::ApprovedForCatalog).await
    }

    async fn opportunities_in(&self, status: OpportunityStatus) -> AppResult<Vec<Opportunity>> {
        let query = Query::new().filter("status", status.as_str());
        Ok(store::list(self.store.as_ref(), collections::OPPORTUNITIES, &query).await?)
    }

    async fn ensure_exists(&self, collection: &str, resource: &str, id: &str) -> AppResult<()> {
        match self.store.get(collection, id).await? {
            Some(_) => Ok(()),
            None => Err(AppError::not_found(resource, id)),
        }
    }

    async fn ensure_unreferenced(
        &self,
        collection: &str,
        field: &str,
        resource: &str,
        id: &str,
    ) -> AppResult<()> {
        let dependents = self
            .store
            .query(collection, &Query::new().filter(field, id))
            .await?
            .len();
        if dependents > 0 {
            return Err(AppError::Dependency {
                resource: format!("{} {}", resource, id),
                dependents,
            });
        }
        Ok(())
    }
}
