//! Integration tests for coupon application and coupon alteration amounts

use std::sync::Arc;

use rust_decimal::Decimal;
use rusty_money::iso::USD;
use testresult::TestResult;

use tally::{
    alterations::{AlterationPipeline, PriceAlteration},
    cart::{Cart, CartLine, Product},
    coupons::{
        COUPON_ALTERATION_TYPE, COUPON_ALTERATION_WEIGHT, Coupon, CouponAlterationProcessor,
        CouponApplicationService, CouponCriteria, CouponId, CouponOutcome, CouponRepository,
        CouponRepositoryError, MemoryCouponRepository, NewCoupon,
    },
    scope::OperationScope,
    storage::StoreError,
};

struct Harness {
    repository: MemoryCouponRepository,
    service: CouponApplicationService,
    pipeline: AlterationPipeline,
}

fn harness() -> TestResult<Harness> {
    let criteria = Arc::new(CouponCriteria::with_builtin());
    let mut pipeline = AlterationPipeline::new();
    pipeline.register(Box::new(CouponAlterationProcessor::new(Arc::clone(
        &criteria,
    ))))?;

    Ok(Harness {
        repository: MemoryCouponRepository::new(),
        service: CouponApplicationService::new(criteria),
        pipeline,
    })
}

fn cart_with(price: Decimal, quantity: u32) -> TestResult<Cart> {
    let mut cart = Cart::new(USD);
    cart.add_line(CartLine::new(Product::new(1, "Widget", price), quantity)?);

    Ok(cart)
}

fn coupon_alterations(cart: &Cart) -> usize {
    cart.alterations()
        .iter()
        .filter(|alteration| alteration.alteration_type == COUPON_ALTERATION_TYPE)
        .count()
}

#[test]
fn unpublished_coupons_never_mutate_the_cart() -> TestResult {
    let harness = harness()?;

    for (code, value) in [("XMAS", 25), ("SPRING", 10), ("ONE", 1)] {
        harness
            .repository
            .create(NewCoupon::percent(code, Decimal::from(value)).published(false))?;
    }

    for quantity in 1..=3 {
        let mut cart = cart_with(Decimal::new(1999, 2), quantity)?;
        cart.add_alteration(PriceAlteration::new("Gift", "WRAP", 0))?;
        let before = cart.alterations().to_vec();

        let scope = OperationScope::new(&harness.repository);

        for code in ["XMAS", "spring", " one "] {
            let outcome = harness.service.apply_coupon(&mut cart, code, &scope)?;

            assert_eq!(outcome, CouponOutcome::Ineligible, "code {code} was applied");
            assert_eq!(cart.alterations(), before.as_slice());
        }
    }

    Ok(())
}

#[test]
fn unpublished_xmas_reports_unpublished_or_invalid() -> TestResult {
    let harness = harness()?;
    harness
        .repository
        .create(NewCoupon::percent("XMAS", Decimal::TEN).published(false))?;

    let mut cart = cart_with(Decimal::new(5000, 2), 1)?;
    let scope = OperationScope::new(&harness.repository);

    let outcome = harness.service.apply_coupon(&mut cart, "XMAS", &scope)?;

    assert_eq!(outcome, CouponOutcome::Ineligible);
    assert_eq!(
        outcome.to_string(),
        "coupon is unpublished or not valid for this cart"
    );
    assert!(cart.alterations().is_empty());

    Ok(())
}

#[test]
fn applying_twice_keeps_one_alteration() -> TestResult {
    let harness = harness()?;
    harness
        .repository
        .create(NewCoupon::percent("SAVE10", Decimal::TEN))?;

    let mut cart = cart_with(Decimal::new(10000, 2), 1)?;
    let scope = OperationScope::new(&harness.repository);

    let first = harness.service.apply_coupon(&mut cart, "SAVE10", &scope)?;
    let second = harness.service.apply_coupon(&mut cart, "save10", &scope)?;

    assert!(first.is_applied());
    assert_eq!(second, CouponOutcome::AlreadyApplied);
    assert_eq!(coupon_alterations(&cart), 1);

    Ok(())
}

#[test]
fn unknown_code_is_not_found() -> TestResult {
    let harness = harness()?;
    let mut cart = cart_with(Decimal::new(10000, 2), 1)?;
    let scope = OperationScope::new(&harness.repository);

    let outcome = harness.service.apply_coupon(&mut cart, "NOPE", &scope)?;

    assert_eq!(outcome, CouponOutcome::NotFound);
    assert_eq!(outcome.to_string(), "invalid coupon code");
    assert!(cart.alterations().is_empty());

    Ok(())
}

#[test]
fn percent_coupon_takes_value_percent_of_subtotal() -> TestResult {
    let harness = harness()?;

    let subtotals = [
        Decimal::new(10000, 2),
        Decimal::new(4000, 2),
        Decimal::new(1250, 2),
        Decimal::new(99999, 2),
    ];
    let values = [1, 10, 25, 50, 100];

    for value in values {
        harness.repository.create(NewCoupon::percent(
            format!("P{value}"),
            Decimal::from(value),
        ))?;
    }

    for subtotal in subtotals {
        for value in values {
            let mut cart = cart_with(subtotal, 1)?;
            let scope = OperationScope::new(&harness.repository);

            harness
                .service
                .apply_coupon(&mut cart, &format!("P{value}"), &scope)?;

            let amount = harness.pipeline.cart_adjustment(&cart, &scope)?;
            let expected = -subtotal * Decimal::from(value) / Decimal::ONE_HUNDRED;

            assert_eq!(amount, expected, "subtotal {subtotal}, value {value}");
        }
    }

    Ok(())
}

#[test]
fn inapplicable_coupon_contributes_nothing() -> TestResult {
    let harness = harness()?;
    harness
        .repository
        .create(NewCoupon::percent("HIDDEN", Decimal::TEN).published(false))?;

    let mut cart = cart_with(Decimal::new(10000, 2), 1)?;
    cart.set_alterations([PriceAlteration::new(
        COUPON_ALTERATION_TYPE,
        "HIDDEN",
        COUPON_ALTERATION_WEIGHT,
    )]);
    let scope = OperationScope::new(&harness.repository);

    let summary = harness.pipeline.summarize(&cart, &scope)?;

    assert_eq!(summary.total(), Decimal::ZERO);
    assert!(summary.entries.is_empty());
    assert!(summary.unclaimed.is_empty());
    assert_eq!(summary.inapplicable.len(), 1);

    Ok(())
}

#[test]
fn ten_percent_coupon_on_cart_and_line() -> TestResult {
    let harness = harness()?;
    harness
        .repository
        .create(NewCoupon::percent("TEN", Decimal::TEN))?;

    let mut cart = Cart::new(USD);
    cart.add_line(CartLine::new(
        Product::new(1, "Scarf", Decimal::new(4000, 2)),
        2,
    )?);
    cart.add_line(CartLine::new(
        Product::new(2, "Hat", Decimal::new(2000, 2)),
        1,
    )?);
    let scope = OperationScope::new(&harness.repository);

    harness.service.apply_coupon(&mut cart, "TEN", &scope)?;

    let line = cart.lines().first().ok_or("missing line")?;

    assert_eq!(
        harness.pipeline.cart_adjustment(&cart, &scope)?,
        Decimal::new(-1000, 2)
    );
    assert_eq!(
        harness.pipeline.line_adjustment(&cart, line, &scope)?,
        Decimal::new(-800, 2)
    );

    Ok(())
}

#[test]
fn lookups_are_not_shared_between_operations() -> TestResult {
    let harness = harness()?;
    let coupon = harness
        .repository
        .create(NewCoupon::percent("LATER", Decimal::TEN).published(false))?;
    let mut cart = cart_with(Decimal::new(10000, 2), 1)?;

    {
        let scope = OperationScope::new(&harness.repository);
        let outcome = harness.service.apply_coupon(&mut cart, "LATER", &scope)?;

        assert_eq!(outcome, CouponOutcome::Ineligible);
    }

    harness
        .repository
        .update(coupon.id, NewCoupon::percent("LATER", Decimal::TEN))?;

    let scope = OperationScope::new(&harness.repository);
    let outcome = harness.service.apply_coupon(&mut cart, "LATER", &scope)?;

    assert!(outcome.is_applied());

    Ok(())
}

#[derive(Debug)]
struct UnavailableCoupons;

impl CouponRepository for UnavailableCoupons {
    fn get(
        &self,
        _id: CouponId,
    ) -> Result<Option<Coupon>, StoreError> {
        Err(StoreError::Unavailable("coupon table offline".to_string()))
    }

    fn get_by_code(
        &self,
        _code: &str,
        _published_only: bool,
    ) -> Result<Option<Coupon>, StoreError> {
        Err(StoreError::Unavailable("coupon table offline".to_string()))
    }

    fn list(&self) -> Result<Vec<Coupon>, StoreError> {
        Err(StoreError::Unavailable("coupon table offline".to_string()))
    }

    fn create(
        &self,
        _coupon: NewCoupon,
    ) -> Result<Coupon, CouponRepositoryError> {
        Err(StoreError::Unavailable("coupon table offline".to_string()).into())
    }

    fn update(
        &self,
        _id: CouponId,
        _coupon: NewCoupon,
    ) -> Result<Coupon, CouponRepositoryError> {
        Err(StoreError::Unavailable("coupon table offline".to_string()).into())
    }

    fn delete(
        &self,
        _id: CouponId,
    ) -> Result<(), CouponRepositoryError> {
        Err(StoreError::Unavailable("coupon table offline".to_string()).into())
    }
}

#[test]
fn storage_failures_propagate_without_mutation() -> TestResult {
    let harness = harness()?;
    let mut cart = cart_with(Decimal::new(10000, 2), 1)?;
    let scope = OperationScope::new(&UnavailableCoupons);

    let result = harness.service.apply_coupon(&mut cart, "SAVE10", &scope);

    assert!(result.is_err());
    assert!(cart.alterations().is_empty());

    Ok(())
}
