//! Domain models for the Print Shop ERP

mod company;
mod customer;
mod invoice;
mod payment;
mod product;
mod production;
mod user;

pub use company::*;
pub use customer::*;
pub use invoice::*;
pub use payment::*;
pub use product::*;
pub use production::*;
pub use user::*;
