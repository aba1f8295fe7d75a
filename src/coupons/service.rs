//! Coupon application service

use std::{fmt, sync::Arc};

use tracing::{info, warn};

use crate::{
    alterations::PriceAlteration,
    cart::Cart,
    coupons::{
        COUPON_ALTERATION_TYPE, COUPON_ALTERATION_WEIGHT, Coupon, CouponCriteria, CouponError,
    },
    scope::OperationScope,
};

/// Result of trying to apply a coupon code. Anything other than `Applied` left the cart as it was.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CouponOutcome {
    /// The coupon was added to the cart's alterations.
    Applied(Coupon),

    /// No coupon has this code.
    NotFound,

    /// The coupon is already on the cart.
    AlreadyApplied,

    /// The coupon exists but is unpublished or fails its criteria.
    Ineligible,
}

impl CouponOutcome {
    /// Whether the coupon was applied.
    pub fn is_applied(&self) -> bool {
        matches!(self, CouponOutcome::Applied(_))
    }
}

impl fmt::Display for CouponOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CouponOutcome::Applied(coupon) => write!(f, "coupon {} applied", coupon.code),
            CouponOutcome::NotFound => f.write_str("invalid coupon code"),
            CouponOutcome::AlreadyApplied => f.write_str("coupon already applied"),
            CouponOutcome::Ineligible => f.write_str("coupon is unpublished or not valid for this cart"),
        }
    }
}

/// Applies and removes discount codes on a cart.
#[derive(Debug, Clone)]
pub struct CouponApplicationService {
    criteria: Arc<CouponCriteria>,
}

impl CouponApplicationService {
    /// Create a service checking the given coupon criteria.
    pub fn new(criteria: Arc<CouponCriteria>) -> Self {
        CouponApplicationService { criteria }
    }

    /// Apply a coupon code to the cart.
    ///
    /// Not found, already applied and ineligible codes are reported through [`CouponOutcome`]
    /// and leave the cart untouched.
    ///
    /// # Errors
    ///
    /// Returns a [`CouponError`] if storage or criteria evaluation fails.
    #[tracing::instrument(
        name = "coupons.service.apply_coupon",
        skip(self, cart, scope),
        fields(code = %code.trim()),
        err
    )]
    pub fn apply_coupon(
        &self,
        cart: &mut Cart,
        code: &str,
        scope: &OperationScope<'_>,
    ) -> Result<CouponOutcome, CouponError> {
        let Some(coupon) = scope.coupons().by_code(code)? else {
            warn!("coupon code not found");

            return Ok(CouponOutcome::NotFound);
        };

        if cart.has_alteration(COUPON_ALTERATION_TYPE, &coupon.code) {
            return Ok(CouponOutcome::AlreadyApplied);
        }

        if !self.criteria.applies(&coupon, cart, scope)? {
            warn!(published = coupon.published, "coupon is not applicable");

            return Ok(CouponOutcome::Ineligible);
        }

        cart.add_alteration(PriceAlteration::new(
            COUPON_ALTERATION_TYPE,
            coupon.code.clone(),
            COUPON_ALTERATION_WEIGHT,
        ))?;

        info!(coupon_id = %coupon.id, "applied coupon");

        Ok(CouponOutcome::Applied(coupon))
    }

    /// Remove a coupon from the cart, returning whether it was present.
    pub fn remove_coupon(&self, cart: &mut Cart, code: &str) -> bool {
        let removed = cart
            .remove_alteration(COUPON_ALTERATION_TYPE, code.trim())
            .is_some();

        if removed {
            info!(code = code.trim(), "removed coupon");
        }

        removed
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use rusty_money::iso;
    use testresult::TestResult;

    use crate::{
        cart::{CartLine, Product},
        coupons::{CouponRepository, MemoryCouponRepository, NewCoupon},
    };

    use super::*;

    fn service() -> CouponApplicationService {
        CouponApplicationService::new(Arc::new(CouponCriteria::with_builtin()))
    }

    fn cart() -> TestResult<Cart> {
        let mut cart = Cart::new(iso::USD);
        cart.add_line(CartLine::new(
            Product::new(1, "Widget", Decimal::new(10000, 2)),
            1,
        )?);

        Ok(cart)
    }

    #[test]
    fn applies_published_coupon_with_weight_one() -> TestResult {
        let repository = MemoryCouponRepository::new();
        repository.create(NewCoupon::percent("SAVE10", Decimal::TEN))?;
        let scope = OperationScope::new(&repository);
        let mut cart = cart()?;

        let outcome = service().apply_coupon(&mut cart, "save10", &scope)?;

        assert!(outcome.is_applied());
        assert_eq!(
            cart.alterations(),
            [PriceAlteration::new("Coupon", "SAVE10", 1)]
        );

        Ok(())
    }

    #[test]
    fn unknown_code_is_not_found() -> TestResult {
        let repository = MemoryCouponRepository::new();
        let scope = OperationScope::new(&repository);
        let mut cart = cart()?;

        let outcome = service().apply_coupon(&mut cart, "NOPE", &scope)?;

        assert_eq!(outcome, CouponOutcome::NotFound);
        assert_eq!(outcome.to_string(), "invalid coupon code");
        assert!(cart.alterations().is_empty());

        Ok(())
    }

    #[test]
    fn second_application_is_already_applied() -> TestResult {
        let repository = MemoryCouponRepository::new();
        repository.create(NewCoupon::percent("SAVE10", Decimal::TEN))?;
        let scope = OperationScope::new(&repository);
        let mut cart = cart()?;

        service().apply_coupon(&mut cart, "SAVE10", &scope)?;
        let outcome = service().apply_coupon(&mut cart, "Save10", &scope)?;

        assert_eq!(outcome, CouponOutcome::AlreadyApplied);
        assert_eq!(cart.alterations().len(), 1);

        Ok(())
    }

    #[test]
    fn empty_cart_is_ineligible() -> TestResult {
        let repository = MemoryCouponRepository::new();
        repository.create(NewCoupon::percent("SAVE10", Decimal::TEN))?;
        let scope = OperationScope::new(&repository);
        let mut cart = Cart::new(iso::USD);

        let outcome = service().apply_coupon(&mut cart, "SAVE10", &scope)?;

        assert_eq!(outcome, CouponOutcome::Ineligible);
        assert!(cart.alterations().is_empty());

        Ok(())
    }

    #[test]
    fn remove_coupon_reports_presence() -> TestResult {
        let repository = MemoryCouponRepository::new();
        repository.create(NewCoupon::percent("SAVE10", Decimal::TEN))?;
        let scope = OperationScope::new(&repository);
        let mut cart = cart()?;

        service().apply_coupon(&mut cart, "SAVE10", &scope)?;

        assert!(service().remove_coupon(&mut cart, "save10"));
        assert!(!service().remove_coupon(&mut cart, "save10"));
        assert!(cart.alterations().is_empty());

        Ok(())
    }
}
