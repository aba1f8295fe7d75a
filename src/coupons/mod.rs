//! Coupons

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::{
    alterations::AlterationError, cart::CartError, criteria::CriteriaError,
    orders::AdditionalElement, storage::StoreError,
};

pub mod criteria;
pub mod lookup;
pub mod processor;
pub mod repository;
pub mod service;

pub use criteria::{CouponApplicabilityContext, CouponCriteria, CouponCriterion, NonEmptyCart};
pub use lookup::CouponLookup;
pub use processor::CouponAlterationProcessor;
pub use repository::{CouponRepository, CouponRepositoryError, MemoryCouponRepository};
pub use service::{CouponApplicationService, CouponOutcome};

/// Alteration type tag for discount coupons.
pub const COUPON_ALTERATION_TYPE: &str = "Coupon";

/// Weight given to coupon alterations.
pub const COUPON_ALTERATION_WEIGHT: i32 = 1;

/// Errors raised while applying or removing coupons.
#[derive(Debug, Error)]
pub enum CouponError {
    /// Applicability criteria could not be evaluated.
    #[error(transparent)]
    Criteria(#[from] CriteriaError),

    /// An alteration processor failed.
    #[error(transparent)]
    Alteration(#[from] AlterationError),

    /// The cart rejected the alteration.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// Coupon storage failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Coupon Id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CouponId(pub u32);

impl fmt::Display for CouponId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a coupon's value is interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CouponType {
    /// Percentage off the subtotal (value is in percent points)
    #[default]
    Percent,

    /// Fixed amount off the cart subtotal
    Amount,
}

impl fmt::Display for CouponType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CouponType::Percent => f.write_str("Percent"),
            CouponType::Amount => f.write_str("Amount"),
        }
    }
}

/// Coupon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coupon {
    /// Coupon id
    pub id: CouponId,

    /// Display name
    pub name: String,

    /// Code customers enter; unique ignoring case
    pub code: String,

    /// Percent points or amount, depending on `coupon_type`
    pub value: Decimal,

    /// Coupon type
    pub coupon_type: CouponType,

    /// Only published coupons may be used
    pub published: bool,
}

impl Coupon {
    /// Whether `code` is this coupon's code, ignoring case.
    pub fn has_code(&self, code: &str) -> bool {
        self.code.eq_ignore_ascii_case(code.trim())
    }

    /// The element recorded on an order that used this coupon.
    pub fn to_order_element(&self) -> AdditionalElement {
        AdditionalElement::new(
            COUPON_ALTERATION_TYPE,
            json!({
                "name": self.name,
                "code": self.code,
                "published": self.published,
                "value": self.value,
                "couponType": self.coupon_type,
            }),
        )
    }
}

/// Coupon fields supplied on creation or update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCoupon {
    /// Display name
    pub name: String,

    /// Code
    pub code: String,

    /// Value
    pub value: Decimal,

    /// Coupon type
    #[serde(default)]
    pub coupon_type: CouponType,

    /// Published flag
    #[serde(default)]
    pub published: bool,
}

impl NewCoupon {
    /// A published percentage coupon.
    pub fn percent(code: impl Into<String>, value: Decimal) -> Self {
        let code = code.into();

        NewCoupon {
            name: code.clone(),
            code,
            value,
            coupon_type: CouponType::Percent,
            published: true,
        }
    }

    /// A published fixed-amount coupon.
    pub fn amount(code: impl Into<String>, value: Decimal) -> Self {
        NewCoupon {
            coupon_type: CouponType::Amount,
            ..Self::percent(code, value)
        }
    }

    /// Set the published flag.
    #[must_use]
    pub fn published(mut self, published: bool) -> Self {
        self.published = published;
        self
    }

    /// Set the display name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub(crate) fn into_coupon(self, id: CouponId) -> Coupon {
        Coupon {
            id,
            name: self.name,
            code: self.code.trim().to_string(),
            value: self.value,
            coupon_type: self.coupon_type,
            published: self.published,
        }
    }
}
