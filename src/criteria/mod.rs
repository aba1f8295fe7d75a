//! Applicability Criteria
//!
//! A shipping method owns an ordered list of [`ApplicabilityCriterion`] records. Each record names
//! a criterion type and carries an opaque JSON state blob; the registered [`Criterion`] for that
//! type decodes the blob and may veto the method for the cart at hand. Criteria only ever narrow
//! applicability.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;

use crate::{
    cart::{Cart, CartLine},
    shipping::{ShippingMethod, ShippingMethodId},
    storage::StoreError,
};

pub mod builtin;
pub mod engine;
pub mod registry;

pub use builtin::{DestinationCountry, MaximumQuantity, MinimumSubtotal, PostalCodePrefix};
pub use engine::{CriteriaEngine, Evaluation, Verdict};
pub use registry::{CriterionDescriptor, CriterionRegistry};

/// Errors raised while configuring or evaluating criteria.
#[derive(Debug, Error)]
pub enum CriteriaError {
    /// A stored criterion names a type with no registered implementation.
    #[error("no criterion implementation registered for type '{criterion_type}' (criterion {criterion_id})")]
    UnknownCriterion {
        /// Type tag on the stored record
        criterion_type: String,
        /// Id of the stored record
        criterion_id: CriterionId,
    },

    /// Two implementations were registered for the same type tag.
    #[error("criterion type '{0}' is already registered")]
    DuplicateCriterion(String),

    /// A state blob could not be decoded by its criterion.
    #[error("invalid state for criterion type '{criterion_type}': {source}")]
    InvalidState {
        /// Type tag of the criterion that rejected the state
        criterion_type: String,
        /// Decoding error
        #[source]
        source: serde_json::Error,
    },

    /// The shipping method to test does not exist.
    #[error("shipping method {0} not found")]
    MethodNotFound(ShippingMethodId),

    /// Backing storage failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Criterion record id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CriterionId(pub u32);

impl fmt::Display for CriterionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A stored criterion: which implementation to run, with what configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicabilityCriterion {
    /// Record id
    pub id: CriterionId,

    /// Type tag resolving to a registered [`Criterion`]
    pub criterion_type: String,

    /// Free-form category
    #[serde(default)]
    pub category: String,

    /// Serialized configuration, decoded only by the matching implementation
    pub state: String,

    /// Evaluation order within the owning shipping method
    #[serde(default)]
    pub position: i32,
}

impl ApplicabilityCriterion {
    /// Create a criterion record with a JSON state blob.
    pub fn new(
        id: u32,
        criterion_type: impl Into<String>,
        state: impl Into<String>,
        position: i32,
    ) -> Self {
        ApplicabilityCriterion {
            id: CriterionId(id),
            criterion_type: criterion_type.into(),
            category: String::new(),
            state: state.into(),
            position,
        }
    }
}

/// Cart and destination data criteria are evaluated against.
#[derive(Debug, Clone, Copy)]
pub struct ApplicabilityContext<'a> {
    /// Cart lines with products and quantities
    pub lines: &'a [CartLine],

    /// Shipping methods being considered together
    pub shipping_methods: &'a [ShippingMethod],

    /// Destination country
    pub country: &'a str,

    /// Destination postal code
    pub postal_code: &'a str,
}

impl<'a> ApplicabilityContext<'a> {
    /// Build a context from a cart's lines and destination.
    pub fn for_cart(cart: &'a Cart, shipping_methods: &'a [ShippingMethod]) -> Self {
        ApplicabilityContext {
            lines: cart.lines(),
            shipping_methods,
            country: &cart.destination().country,
            postal_code: &cart.destination().postal_code,
        }
    }

    /// Sum of line totals.
    pub fn subtotal(&self) -> Decimal {
        self.lines.iter().map(CartLine::total).sum()
    }

    /// Total quantity across lines.
    pub fn total_quantity(&self) -> u32 {
        self.lines
            .iter()
            .fold(0, |acc, line| acc.saturating_add(line.quantity()))
    }
}

/// What a single criterion sees while it runs.
#[derive(Debug)]
pub struct CriterionContext<'c> {
    applicability: &'c ApplicabilityContext<'c>,
    is_applicable: bool,
    vetoed: bool,
}

impl<'c> CriterionContext<'c> {
    pub(crate) fn new(applicability: &'c ApplicabilityContext<'c>, is_applicable: bool) -> Self {
        CriterionContext {
            applicability,
            is_applicable,
            vetoed: false,
        }
    }

    /// Cart and destination
    pub fn applicability(&self) -> &'c ApplicabilityContext<'c> {
        self.applicability
    }

    /// Verdict accumulated by earlier criteria and this one so far
    pub fn is_applicable(&self) -> bool {
        self.is_applicable
    }

    /// Mark the method as not applicable. There is no way back.
    pub fn veto(&mut self) {
        self.is_applicable = false;
        self.vetoed = true;
    }

    pub(crate) fn vetoed(&self) -> bool {
        self.vetoed
    }
}

/// An applicability rule keyed by type tag.
pub trait Criterion: fmt::Debug + Send + Sync {
    /// Type tag stored on criterion records.
    fn criterion_type(&self) -> &str;

    /// Category shown to administrators.
    fn category(&self) -> &str;

    /// Check that a state blob decodes.
    ///
    /// # Errors
    ///
    /// Returns [`CriteriaError::InvalidState`] if it does not.
    fn validate(&self, state: &str) -> Result<(), CriteriaError>;

    /// Veto the context if the rule, configured by `state`, is not met.
    ///
    /// # Errors
    ///
    /// Returns [`CriteriaError::InvalidState`] if the state does not decode.
    fn evaluate(&self, state: &str, context: &mut CriterionContext<'_>) -> Result<(), CriteriaError>;

    /// Human readable summary of a configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CriteriaError::InvalidState`] if the state does not decode.
    fn describe(&self, state: &str) -> Result<String, CriteriaError>;
}

/// A criterion whose state is a JSON document decoding to [`Self::State`].
pub trait TypedCriterion: fmt::Debug + Send + Sync {
    /// Decoded configuration
    type State: DeserializeOwned;

    /// Type tag
    const TYPE: &'static str;

    /// Category
    const CATEGORY: &'static str;

    /// Whether the rule is met.
    fn is_met(&self, state: &Self::State, context: &ApplicabilityContext<'_>) -> bool;

    /// Human readable summary of a configuration.
    fn describe_state(&self, state: &Self::State) -> String;
}

/// Decode a JSON state blob for a criterion type.
///
/// # Errors
///
/// Returns [`CriteriaError::InvalidState`] if the blob does not decode.
pub fn decode_state<T: DeserializeOwned>(criterion_type: &str, state: &str) -> Result<T, CriteriaError> {
    serde_json::from_str(state).map_err(|source| CriteriaError::InvalidState {
        criterion_type: criterion_type.to_string(),
        source,
    })
}

impl<T: TypedCriterion> Criterion for T {
    fn criterion_type(&self) -> &str {
        T::TYPE
    }

    fn category(&self) -> &str {
        T::CATEGORY
    }

    fn validate(&self, state: &str) -> Result<(), CriteriaError> {
        decode_state::<T::State>(T::TYPE, state).map(|_state| ())
    }

    fn evaluate(&self, state: &str, context: &mut CriterionContext<'_>) -> Result<(), CriteriaError> {
        let state = decode_state::<T::State>(T::TYPE, state)?;

        if !self.is_met(&state, context.applicability()) {
            context.veto();
        }

        Ok(())
    }

    fn describe(&self, state: &str) -> Result<String, CriteriaError> {
        Ok(self.describe_state(&decode_state::<T::State>(T::TYPE, state)?))
    }
}
