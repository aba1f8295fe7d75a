//! Coupon alteration processor

use std::sync::Arc;

use decimal_percentage::Percentage;
use rust_decimal::Decimal;

use crate::{
    alterations::{AlterationError, AlterationProcessor, PriceAlteration},
    cart::{Cart, CartLine},
    coupons::{COUPON_ALTERATION_TYPE, Coupon, CouponCriteria, CouponType},
    orders::AdditionalElement,
    scope::OperationScope,
};

/// Prices `Coupon` alterations from the current coupon record.
///
/// The coupon is looked up through the operation scope on every call, so edits made to a coupon
/// after it was applied to a cart take effect on the next operation.
#[derive(Debug, Clone)]
pub struct CouponAlterationProcessor {
    criteria: Arc<CouponCriteria>,
}

impl CouponAlterationProcessor {
    /// Create a processor that checks the given coupon criteria.
    pub fn new(criteria: Arc<CouponCriteria>) -> Self {
        CouponAlterationProcessor { criteria }
    }

    /// The coupon behind an alteration, if it exists and currently applies.
    fn applicable_coupon(
        &self,
        alteration: &PriceAlteration,
        cart: &Cart,
        scope: &OperationScope<'_>,
    ) -> Result<Option<Coupon>, AlterationError> {
        if !alteration
            .alteration_type
            .eq_ignore_ascii_case(COUPON_ALTERATION_TYPE)
        {
            return Ok(None);
        }

        let Some(coupon) = scope.coupons().by_code(&alteration.key)? else {
            return Ok(None);
        };

        if self.criteria.applies(&coupon, cart, scope)? {
            Ok(Some(coupon))
        } else {
            Ok(None)
        }
    }
}

/// `value` percent points as a fraction.
fn fraction(value: Decimal) -> Percentage {
    Percentage::from(value / Decimal::ONE_HUNDRED)
}

impl AlterationProcessor for CouponAlterationProcessor {
    fn alteration_type(&self) -> &'static str {
        COUPON_ALTERATION_TYPE
    }

    fn can_process(
        &self,
        alteration: &PriceAlteration,
        cart: &Cart,
        scope: &OperationScope<'_>,
    ) -> Result<bool, AlterationError> {
        Ok(self.applicable_coupon(alteration, cart, scope)?.is_some())
    }

    fn cart_amount(
        &self,
        alteration: &PriceAlteration,
        cart: &Cart,
        scope: &OperationScope<'_>,
    ) -> Result<Decimal, AlterationError> {
        let Some(coupon) = self.applicable_coupon(alteration, cart, scope)? else {
            return Ok(Decimal::ZERO);
        };

        let subtotal = cart.subtotal();

        let amount = match coupon.coupon_type {
            CouponType::Percent => -(fraction(coupon.value) * subtotal),
            CouponType::Amount => -coupon.value.min(subtotal.max(Decimal::ZERO)),
        };

        Ok(amount)
    }

    fn line_amount(
        &self,
        alteration: &PriceAlteration,
        cart: &Cart,
        line: &CartLine,
        scope: &OperationScope<'_>,
    ) -> Result<Decimal, AlterationError> {
        let Some(coupon) = self.applicable_coupon(alteration, cart, scope)? else {
            return Ok(Decimal::ZERO);
        };

        let amount = match coupon.coupon_type {
            CouponType::Percent => -(fraction(coupon.value) * line.total()),
            CouponType::Amount => Decimal::ZERO,
        };

        Ok(amount)
    }

    fn cart_label(
        &self,
        alteration: &PriceAlteration,
        cart: &Cart,
        scope: &OperationScope<'_>,
    ) -> Result<Option<String>, AlterationError> {
        Ok(self
            .applicable_coupon(alteration, cart, scope)?
            .map(|coupon| coupon.code))
    }

    fn order_element(
        &self,
        alteration: &PriceAlteration,
        cart: &Cart,
        scope: &OperationScope<'_>,
    ) -> Result<Option<AdditionalElement>, AlterationError> {
        Ok(self
            .applicable_coupon(alteration, cart, scope)?
            .map(|coupon| coupon.to_order_element()))
    }
}
