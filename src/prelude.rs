//! Tally prelude.
//!
//! Convenience exports for common library consumers.

pub use crate::{
    alterations::{
        AlterationError, AlterationPipeline, AlterationProcessor, AlterationSummary,
        AppliedAlteration, PriceAlteration,
    },
    cart::{AttributeValue, Cart, CartError, CartLine, Destination, Product, ProductId},
    checkout::{Checkout, CheckoutError, CheckoutTotals, LineTotals, OrderDetails},
    coupons::{
        Coupon, CouponApplicationService, CouponError, CouponOutcome, CouponRepository,
        CouponType, MemoryCouponRepository, NewCoupon,
    },
    criteria::{
        ApplicabilityContext, ApplicabilityCriterion, CriteriaEngine, CriteriaError, Criterion,
        CriterionRegistry, Evaluation, TypedCriterion,
    },
    fixtures::{Fixture, FixtureError},
    orders::{
        Address, Charge, DocumentKind, EventCategory, MemoryOrderStore, OrderDraft, OrderError,
        OrderEvent, OrderKey, OrderSnapshot, OrderStore,
    },
    receipt::{Receipt, ReceiptError},
    scope::OperationScope,
    shipping::{
        MemoryShippingMethodRepository, ShippingMethod, ShippingMethodId,
        ShippingMethodRepository, ShippingOption,
    },
    storage::StoreError,
    taxes::{Tax, TaxAmount, TaxRule, TaxService},
};
