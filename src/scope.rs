//! Operation scope
//!
//! State that lives for exactly one logical checkout operation. Create a scope when the
//! operation starts and drop it when it ends; nothing here may be shared across operations.

use crate::coupons::{CouponLookup, CouponRepository};

/// Per-operation context threaded through criteria and alteration processors.
#[derive(Debug)]
pub struct OperationScope<'a> {
    coupons: CouponLookup<'a>,
}

impl<'a> OperationScope<'a> {
    /// Start a new operation against the given coupon repository.
    pub fn new(coupons: &'a dyn CouponRepository) -> Self {
        OperationScope {
            coupons: CouponLookup::new(coupons),
        }
    }

    /// Cached coupon lookups for this operation.
    pub fn coupons(&self) -> &CouponLookup<'a> {
        &self.coupons
    }
}
