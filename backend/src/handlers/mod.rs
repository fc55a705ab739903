//! HTTP handlers, one module per resource

mod auth;
mod company;
mod customer;
mod health;
mod invoice;
mod payment_verification;
mod pricing;
mod product;
mod production;
mod reporting;
mod role;
mod user;

pub use auth::*;
pub use company::*;
pub use customer::*;
pub use health::*;
pub use invoice::*;
pub use payment_verification::*;
pub use pricing::*;
pub use product::*;
pub use production::*;
pub use reporting::*;
pub use role::*;
pub use user::*;
