//! HTTP request handlers

pub mod catalog;
pub mod customer;
pub mod exchange_rate;
pub mod health;
pub mod inventory;
pub mod opportunity;
pub mod procurement;
pub mod quotation;
pub mod requirement;
pub mod sales;

pub use catalog::*;
pub use customer::*;
pub use exchange_rate::*;
pub use health::*;
pub use inventory::*;
pub use opportunity::*;
pub use procurement::*;
pub use quotation::*;
pub use requirement::*;
pub use sales::*;
