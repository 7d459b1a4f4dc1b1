//! Domain models for the Opportunity Pipeline

mod catalog;
mod customer;
mod exchange_rate;
mod opportunity;
mod procurement;
mod requirement;
mod sale;

pub use catalog::*;
pub use customer::*;
pub use exchange_rate::*;
pub use opportunity::*;
pub use procurement::*;
pub use requirement::*;
pub use sale::*;
