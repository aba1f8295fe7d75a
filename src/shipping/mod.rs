//! Shipping

use std::{collections::BTreeMap, fmt, sync::RwLock};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    cart::Cart,
    criteria::{ApplicabilityContext, ApplicabilityCriterion, CriteriaEngine, CriteriaError},
    storage::StoreError,
};

/// Shipping method id
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShippingMethodId(pub u32);

impl fmt::Display for ShippingMethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A flat-rate shipping method gated by its criteria.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShippingMethod {
    id: ShippingMethodId,
    name: String,
    company: String,
    default_price: Decimal,
    included_areas: Vec<String>,
    excluded_areas: Vec<String>,
    criteria: Vec<ApplicabilityCriterion>,
}

impl ShippingMethod {
    /// Create a method. Its id is assigned when stored.
    pub fn new(name: impl Into<String>, default_price: Decimal) -> Self {
        ShippingMethod {
            id: ShippingMethodId::default(),
            name: name.into(),
            company: String::new(),
            default_price,
            included_areas: Vec::new(),
            excluded_areas: Vec::new(),
            criteria: Vec::new(),
        }
    }

    /// Set the carrier.
    #[must_use]
    pub fn with_company(mut self, company: impl Into<String>) -> Self {
        self.company = company.into();
        self
    }

    /// Set the shipping areas.
    #[must_use]
    pub fn with_areas(mut self, included: Vec<String>, excluded: Vec<String>) -> Self {
        self.included_areas = included;
        self.excluded_areas = excluded;
        self
    }

    /// Add a criterion, keeping the list in position order.
    #[must_use]
    pub fn with_criterion(mut self, criterion: ApplicabilityCriterion) -> Self {
        self.criteria.push(criterion);
        self.criteria
            .sort_by_key(|criterion| (criterion.position, criterion.id));
        self
    }

    /// Id
    pub fn id(&self) -> ShippingMethodId {
        self.id
    }

    /// Name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Carrier
    pub fn company(&self) -> &str {
        &self.company
    }

    /// Flat price
    pub fn default_price(&self) -> Decimal {
        self.default_price
    }

    /// Criteria in position order
    pub fn criteria(&self) -> &[ApplicabilityCriterion] {
        &self.criteria
    }

    /// The option offered to a customer when this method applies.
    pub fn to_option(&self) -> ShippingOption {
        ShippingOption {
            description: self.name.clone(),
            company: self.company.clone(),
            price: self.default_price,
            method_id: self.id,
            default_price: self.default_price,
            included_areas: self.included_areas.clone(),
            excluded_areas: self.excluded_areas.clone(),
        }
    }
}

/// A priced shipping choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingOption {
    /// Description shown to the customer
    pub description: String,

    /// Carrier
    pub company: String,

    /// Price charged
    pub price: Decimal,

    /// Method that produced the option
    pub method_id: ShippingMethodId,

    /// Method's default price
    pub default_price: Decimal,

    /// Areas served
    #[serde(default)]
    pub included_areas: Vec<String>,

    /// Areas not served
    #[serde(default)]
    pub excluded_areas: Vec<String>,
}

/// Storage of shipping methods and their criteria.
pub trait ShippingMethodRepository: Send + Sync {
    /// Fetch a method.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if storage fails.
    fn get(&self, id: ShippingMethodId) -> Result<Option<ShippingMethod>, StoreError>;

    /// Every method, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if storage fails.
    fn list(&self) -> Result<Vec<ShippingMethod>, StoreError>;

    /// Store a new method, assigning its id.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if storage fails.
    fn insert(&self, method: ShippingMethod) -> Result<ShippingMethodId, StoreError>;

    /// Delete a method together with its criteria, returning whether it existed.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if storage fails.
    fn delete(&self, id: ShippingMethodId) -> Result<bool, StoreError>;
}

#[derive(Debug, Default)]
struct MethodTable {
    last_id: u32,
    rows: BTreeMap<ShippingMethodId, ShippingMethod>,
}

/// In-memory shipping method repository.
#[derive(Debug, Default)]
pub struct MemoryShippingMethodRepository {
    table: RwLock<MethodTable>,
}

impl MemoryShippingMethodRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ShippingMethodRepository for MemoryShippingMethodRepository {
    fn get(&self, id: ShippingMethodId) -> Result<Option<ShippingMethod>, StoreError> {
        Ok(self.table.read()?.rows.get(&id).cloned())
    }

    fn list(&self) -> Result<Vec<ShippingMethod>, StoreError> {
        Ok(self.table.read()?.rows.values().cloned().collect())
    }

    fn insert(&self, mut method: ShippingMethod) -> Result<ShippingMethodId, StoreError> {
        let mut table = self.table.write()?;

        table.last_id = table.last_id.saturating_add(1);
        method.id = ShippingMethodId(table.last_id);
        table.rows.insert(method.id, method);

        Ok(ShippingMethodId(table.last_id))
    }

    fn delete(&self, id: ShippingMethodId) -> Result<bool, StoreError> {
        Ok(self.table.write()?.rows.remove(&id).is_some())
    }
}

/// Options for every method whose criteria let the cart through, in method order.
///
/// # Errors
///
/// Returns a [`CriteriaError`] if any method's criteria cannot be evaluated.
pub fn available_options(
    engine: &CriteriaEngine,
    methods: &[ShippingMethod],
    cart: &Cart,
) -> Result<Vec<ShippingOption>, CriteriaError> {
    let context = ApplicabilityContext::for_cart(cart, methods);
    let mut options = Vec::new();

    for method in methods {
        let evaluation = engine.evaluate(method.criteria(), &context)?;

        debug!(
            method_id = %method.id(),
            method = method.name(),
            applicable = evaluation.applicable,
            "evaluated shipping method"
        );

        if evaluation.applicable {
            options.push(method.to_option());
        }
    }

    Ok(options)
}
