//! Coupon applicability criteria

use std::fmt;

use tracing::debug;

use crate::{cart::Cart, coupons::Coupon, criteria::CriteriaError, scope::OperationScope};

/// What a coupon criterion sees. Applicability starts at the coupon's published flag and can
/// only be narrowed.
#[derive(Debug)]
pub struct CouponApplicabilityContext<'c> {
    coupon: &'c Coupon,
    cart: &'c Cart,
    scope: &'c OperationScope<'c>,
    is_applicable: bool,
}

impl<'c> CouponApplicabilityContext<'c> {
    /// Create a context seeded from `coupon.published`.
    pub fn new(coupon: &'c Coupon, cart: &'c Cart, scope: &'c OperationScope<'c>) -> Self {
        CouponApplicabilityContext {
            coupon,
            cart,
            scope,
            is_applicable: coupon.published,
        }
    }

    /// Coupon under test
    pub fn coupon(&self) -> &'c Coupon {
        self.coupon
    }

    /// Cart the coupon would apply to
    pub fn cart(&self) -> &'c Cart {
        self.cart
    }

    /// Operation scope
    pub fn scope(&self) -> &'c OperationScope<'c> {
        self.scope
    }

    /// Current verdict
    pub fn is_applicable(&self) -> bool {
        self.is_applicable
    }

    /// Mark the coupon as not applicable. There is no way back.
    pub fn veto(&mut self) {
        self.is_applicable = false;
    }
}

/// A rule that can veto a coupon.
pub trait CouponCriterion: fmt::Debug + Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Inspect the context and veto if the rule is not met.
    ///
    /// # Errors
    ///
    /// Returns a [`CriteriaError`] if the rule could not be evaluated.
    fn evaluate(&self, context: &mut CouponApplicabilityContext<'_>) -> Result<(), CriteriaError>;
}

/// Coupons never apply to an empty cart.
#[derive(Debug, Clone, Copy, Default)]
pub struct NonEmptyCart;

impl CouponCriterion for NonEmptyCart {
    fn name(&self) -> &'static str {
        "NonEmptyCart"
    }

    fn evaluate(&self, context: &mut CouponApplicabilityContext<'_>) -> Result<(), CriteriaError> {
        if context.cart().is_empty() {
            context.veto();
        }

        Ok(())
    }
}

/// Every coupon criterion registered with the host.
#[derive(Debug, Default)]
pub struct CouponCriteria {
    criteria: Vec<Box<dyn CouponCriterion>>,
}

impl CouponCriteria {
    /// No criteria: only the published flag counts.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in criteria.
    pub fn with_builtin() -> Self {
        let mut criteria = Self::new();
        criteria.push(Box::new(NonEmptyCart));
        criteria
    }

    /// Register a criterion.
    pub fn push(&mut self, criterion: Box<dyn CouponCriterion>) {
        self.criteria.push(criterion);
    }

    /// Number of registered criteria.
    pub fn len(&self) -> usize {
        self.criteria.len()
    }

    /// Whether no criteria are registered.
    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    /// Run every criterion, without stopping at the first veto.
    ///
    /// # Errors
    ///
    /// Returns the first [`CriteriaError`] raised by a criterion.
    pub fn applies(
        &self,
        coupon: &Coupon,
        cart: &Cart,
        scope: &OperationScope<'_>,
    ) -> Result<bool, CriteriaError> {
        let mut context = CouponApplicabilityContext::new(coupon, cart, scope);

        for criterion in &self.criteria {
            let before = context.is_applicable();
            criterion.evaluate(&mut context)?;

            if before && !context.is_applicable() {
                debug!(
                    coupon = %coupon.code,
                    criterion = criterion.name(),
                    "coupon vetoed"
                );
            }
        }

        Ok(context.is_applicable())
    }
}
