//! Shared types and models for the Opportunity Pipeline
//!
//! Domain models, pipeline state machines, stock arithmetic and the margin
//! analysis used by the backend services.

pub mod analysis;
pub mod models;
pub mod types;
pub mod validation;

pub use analysis::*;
pub use models::*;
pub use types::*;
pub use validation::*;
