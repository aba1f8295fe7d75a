//! Price Alterations
//!
//! An alteration is a named, weighted instruction on the cart ("apply coupon `SAVE10`"). It
//! carries no amount: every amount and label is recomputed by the processor that owns its
//! alteration type, each time it is asked.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    cart::{Cart, CartLine},
    criteria::CriteriaError,
    orders::AdditionalElement,
    scope::OperationScope,
    storage::StoreError,
};

pub mod pipeline;

pub use pipeline::{AlterationPipeline, AlterationSummary, AppliedAlteration, ProcessorKey};

/// Errors raised while processing alterations.
#[derive(Debug, Error)]
pub enum AlterationError {
    /// Two processors were registered for the same alteration type.
    #[error("a processor for alteration type '{0}' is already registered")]
    DuplicateProcessor(String),

    /// Applicability criteria could not be evaluated.
    #[error(transparent)]
    Criteria(#[from] CriteriaError),

    /// Backing storage failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Price alteration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceAlteration {
    /// Provider category, e.g. `Coupon`
    pub alteration_type: String,

    /// Key unique within the type, e.g. the coupon code
    pub key: String,

    /// Ordering weight; heavier alterations come first
    pub weight: i32,
}

impl PriceAlteration {
    /// Create a new alteration.
    pub fn new(alteration_type: impl Into<String>, key: impl Into<String>, weight: i32) -> Self {
        PriceAlteration {
            alteration_type: alteration_type.into(),
            key: key.into(),
            weight,
        }
    }

    /// Whether this alteration has the given type and key, ignoring case.
    pub fn matches(&self, alteration_type: &str, key: &str) -> bool {
        self.alteration_type.eq_ignore_ascii_case(alteration_type)
            && self.key.eq_ignore_ascii_case(key)
    }
}

impl fmt::Display for PriceAlteration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.alteration_type, self.key)
    }
}

/// Turns alterations of one type into amounts and labels.
///
/// Implementations must re-derive applicability on every call; nothing computed here is cached
/// on the cart. Cart and line amounts are independent: a processor may discount the whole
/// cart, individual lines, both or neither.
pub trait AlterationProcessor: fmt::Debug + Send + Sync {
    /// The alteration type this processor owns.
    fn alteration_type(&self) -> &str;

    /// Whether this processor owns the alteration and it currently applies to the cart.
    ///
    /// # Errors
    ///
    /// Returns an [`AlterationError`] if applicability could not be determined.
    fn can_process(
        &self,
        alteration: &PriceAlteration,
        cart: &Cart,
        scope: &OperationScope<'_>,
    ) -> Result<bool, AlterationError>;

    /// Cart level adjustment; zero when the alteration does not apply.
    ///
    /// # Errors
    ///
    /// Returns an [`AlterationError`] if the amount could not be computed.
    fn cart_amount(
        &self,
        alteration: &PriceAlteration,
        cart: &Cart,
        scope: &OperationScope<'_>,
    ) -> Result<Decimal, AlterationError>;

    /// Line level adjustment; zero when the alteration does not apply.
    ///
    /// # Errors
    ///
    /// Returns an [`AlterationError`] if the amount could not be computed.
    fn line_amount(
        &self,
        alteration: &PriceAlteration,
        cart: &Cart,
        line: &CartLine,
        scope: &OperationScope<'_>,
    ) -> Result<Decimal, AlterationError>;

    /// User facing label for the cart adjustment, or `None` when it does not apply.
    ///
    /// # Errors
    ///
    /// Returns an [`AlterationError`] if applicability could not be determined.
    fn cart_label(
        &self,
        alteration: &PriceAlteration,
        cart: &Cart,
        scope: &OperationScope<'_>,
    ) -> Result<Option<String>, AlterationError>;

    /// User facing label for a line adjustment. Defaults to the cart label.
    ///
    /// # Errors
    ///
    /// Returns an [`AlterationError`] if applicability could not be determined.
    fn line_label(
        &self,
        alteration: &PriceAlteration,
        cart: &Cart,
        _line: &CartLine,
        scope: &OperationScope<'_>,
    ) -> Result<Option<String>, AlterationError> {
        self.cart_label(alteration, cart, scope)
    }

    /// Element contributed to the order snapshot's additional information.
    ///
    /// # Errors
    ///
    /// Returns an [`AlterationError`] if the element could not be built.
    fn order_element(
        &self,
        _alteration: &PriceAlteration,
        _cart: &Cart,
        _scope: &OperationScope<'_>,
    ) -> Result<Option<AdditionalElement>, AlterationError> {
        Ok(None)
    }
}
