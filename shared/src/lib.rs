//! Shared types and models for the Print Shop ERP
//!
//! This crate holds the pure business rules (weight normalisation, delivery
//! pricing, line totals, workflow state machines) shared between the backend,
//! the browser (via WASM), and tests. Nothing in here performs I/O.

pub mod error;
pub mod models;
pub mod pricing;
pub mod totals;
pub mod types;
pub mod validation;
pub mod weight;

pub use error::*;
pub use models::*;
pub use pricing::*;
pub use totals::*;
pub use types::*;
pub use validation::*;
pub use weight::*;
