//! Business logic services for the Print Shop ERP

pub mod auth;
pub mod company;
pub mod customer;
pub mod delivery;
pub mod invoice;
pub mod payment_verification;
pub mod pricing_tier;
pub mod product;
pub mod production;
pub mod reporting;
pub mod role;
pub mod user;

#[cfg(test)]
mod test_support;

pub use auth::AuthService;
pub use pricing_tier::PricingTierService;
pub use product::ProductService;
pub use role::RoleService;
