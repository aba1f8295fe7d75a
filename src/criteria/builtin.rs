//! Built-in criteria

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::criteria::{ApplicabilityContext, TypedCriterion};

/// `DestinationCountry` state: `{"include": ["US"], "exclude": []}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CountryState {
    /// Countries shipped to; empty means all
    #[serde(default)]
    pub include: Vec<String>,

    /// Countries never shipped to
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// Vetoes destinations outside the included countries or inside the excluded ones.
#[derive(Debug, Clone, Copy, Default)]
pub struct DestinationCountry;

impl TypedCriterion for DestinationCountry {
    type State = CountryState;

    const TYPE: &'static str = "DestinationCountry";
    const CATEGORY: &'static str = "Destination";

    fn is_met(&self, state: &CountryState, context: &ApplicabilityContext<'_>) -> bool {
        let country = context.country.trim();
        let listed = |countries: &[String]| {
            countries
                .iter()
                .any(|candidate| candidate.trim().eq_ignore_ascii_case(country))
        };

        (state.include.is_empty() || listed(&state.include)) && !listed(&state.exclude)
    }

    fn describe_state(&self, state: &CountryState) -> String {
        match (state.include.is_empty(), state.exclude.is_empty()) {
            (true, true) => "Any country".to_string(),
            (false, true) => format!("Ships to {}", state.include.join(", ")),
            (true, false) => format!("Does not ship to {}", state.exclude.join(", ")),
            (false, false) => format!(
                "Ships to {} except {}",
                state.include.join(", "),
                state.exclude.join(", ")
            ),
        }
    }
}

/// `PostalCodePrefix` state: `{"prefixes": ["90", "91"]}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostalCodeState {
    /// Accepted postal code prefixes
    pub prefixes: Vec<String>,
}

fn normalize_postal_code(code: &str) -> String {
    code.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect()
}

/// Vetoes postal codes that start with none of the configured prefixes.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostalCodePrefix;

impl TypedCriterion for PostalCodePrefix {
    type State = PostalCodeState;

    const TYPE: &'static str = "PostalCodePrefix";
    const CATEGORY: &'static str = "Destination";

    fn is_met(&self, state: &PostalCodeState, context: &ApplicabilityContext<'_>) -> bool {
        let postal_code = normalize_postal_code(context.postal_code);

        state
            .prefixes
            .iter()
            .any(|prefix| postal_code.starts_with(&normalize_postal_code(prefix)))
    }

    fn describe_state(&self, state: &PostalCodeState) -> String {
        format!("Postal codes starting with {}", state.prefixes.join(", "))
    }
}

/// `MinimumSubtotal` state: `{"amount": "50.00"}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MinimumSubtotalState {
    /// Smallest qualifying subtotal
    pub amount: Decimal,
}

/// Vetoes carts whose subtotal is below a threshold.
#[derive(Debug, Clone, Copy, Default)]
pub struct MinimumSubtotal;

impl TypedCriterion for MinimumSubtotal {
    type State = MinimumSubtotalState;

    const TYPE: &'static str = "MinimumSubtotal";
    const CATEGORY: &'static str = "Cart";

    fn is_met(&self, state: &MinimumSubtotalState, context: &ApplicabilityContext<'_>) -> bool {
        context.subtotal() >= state.amount
    }

    fn describe_state(&self, state: &MinimumSubtotalState) -> String {
        format!("Subtotal of at least {}", state.amount)
    }
}

/// `MaximumQuantity` state: `{"quantity": 10}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MaximumQuantityState {
    /// Largest qualifying item count
    pub quantity: u32,
}

/// Vetoes carts holding more items than allowed.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaximumQuantity;

impl TypedCriterion for MaximumQuantity {
    type State = MaximumQuantityState;

    const TYPE: &'static str = "MaximumQuantity";
    const CATEGORY: &'static str = "Cart";

    fn is_met(&self, state: &MaximumQuantityState, context: &ApplicabilityContext<'_>) -> bool {
        context.total_quantity() <= state.quantity
    }

    fn describe_state(&self, state: &MaximumQuantityState) -> String {
        format!("At most {} items", state.quantity)
    }
}
