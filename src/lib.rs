//! Tally
//!
//! Tally is the pricing and applicability pipeline behind a checkout: it decides which shipping
//! methods a cart may use, computes taxes, nets out weighted price alterations such as discount
//! coupons, and freezes the result into an order snapshot that stays readable as the providers
//! that produced it evolve.

pub mod alterations;
pub mod cart;
pub mod checkout;
pub mod config;
pub mod coupons;
pub mod criteria;
pub mod fixtures;
pub mod observability;
pub mod orders;
pub mod prelude;
pub mod pricing;
pub mod receipt;
pub mod scope;
pub mod shipping;
pub mod storage;
pub mod taxes;
