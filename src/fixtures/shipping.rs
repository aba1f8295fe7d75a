//! Shipping Fixtures

use serde::Deserialize;

use crate::{
    criteria::ApplicabilityCriterion,
    fixtures::{FixtureError, parse_price},
    shipping::ShippingMethod,
};

/// Wrapper for shipping methods in YAML
#[derive(Debug, Deserialize)]
pub struct ShippingFixture {
    /// Methods in id order
    pub methods: Vec<ShippingMethodFixture>,
}

/// Shipping method fixture
#[derive(Debug, Deserialize)]
pub struct ShippingMethodFixture {
    /// Method name
    pub name: String,

    /// Carrier
    #[serde(default)]
    pub company: String,

    /// Flat price (e.g., "10.00 USD")
    pub price: String,

    /// Areas shipped to
    #[serde(default)]
    pub included_areas: Vec<String>,

    /// Areas never shipped to
    #[serde(default)]
    pub excluded_areas: Vec<String>,

    /// Criteria gating the method
    #[serde(default)]
    pub criteria: Vec<CriterionFixture>,
}

/// Criterion fixture; the state is written as YAML and stored as JSON
#[derive(Debug, Deserialize)]
pub struct CriterionFixture {
    /// Registered criterion type
    #[serde(rename = "type")]
    pub criterion_type: String,

    /// Evaluation position; defaults to declaration order
    #[serde(default)]
    pub position: Option<i32>,

    /// Criterion state
    #[serde(default)]
    pub state: serde_json::Value,
}

impl ShippingFixture {
    /// Convert to shipping methods, numbering criteria across the whole fixture
    ///
    /// # Errors
    ///
    /// Returns an error if a price is invalid or a state cannot be encoded.
    pub fn into_methods(self) -> Result<Vec<ShippingMethod>, FixtureError> {
        let mut next_criterion_id = 0_u32;
        let mut methods = Vec::with_capacity(self.methods.len());

        for fixture in self.methods {
            let (price, _currency) = parse_price(&fixture.price)?;

            let mut method = ShippingMethod::new(fixture.name, price)
                .with_company(fixture.company)
                .with_areas(fixture.included_areas, fixture.excluded_areas);

            for (index, criterion) in fixture.criteria.into_iter().enumerate() {
                next_criterion_id = next_criterion_id.saturating_add(1);

                let state = if criterion.state.is_null() {
                    "{}".to_string()
                } else {
                    serde_json::to_string(&criterion.state)?
                };
                let position = criterion
                    .position
                    .unwrap_or_else(|| i32::try_from(index).unwrap_or(i32::MAX));

                method = method.with_criterion(ApplicabilityCriterion::new(
                    next_criterion_id,
                    criterion.criterion_type,
                    state,
                    position,
                ));
            }

            methods.push(method);
        }

        Ok(methods)
    }
}
