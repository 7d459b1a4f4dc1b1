//! Business logic services for the Opportunity Pipeline

pub mod catalog;
pub mod customer;
pub mod inventory;
pub mod opportunity;
pub mod procurement;
pub mod quotation;
pub mod rate_cache;
pub mod requirement;
pub mod sales;
pub mod triggers;

pub use catalog::CatalogService;
pub use customer::CustomerService;
pub use inventory::InventoryService;
pub use opportunity::OpportunityService;
pub use procurement::ProcurementService;
pub use quotation::QuotationService;
pub use rate_cache::{EffectiveRate, RateCache, RateSource};
pub use requirement::RequirementService;
pub use sales::SalesService;
