//! Taxes
//!
//! A [`Tax`] is a stored definition; [`TaxComputationHelper`]s know how to price definitions of
//! their kind. Helpers are additive: a tax's amount is the sum over every helper, and a tax no
//! helper understands costs nothing.

use std::{cmp::Reverse, collections::BTreeMap, fmt};

use decimal_percentage::Percentage;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    cart::{CartLine, ProductId},
    pricing::round_money,
};

/// Matches every country in a [`TaxRule::Country`] rule.
pub const ANY_COUNTRY: &str = "*";

/// Quantity of one product in the taxed order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductQuantity {
    /// Product
    pub product_id: ProductId,

    /// Quantity
    pub quantity: u32,
}

impl From<&CartLine> for ProductQuantity {
    fn from(line: &CartLine) -> Self {
        ProductQuantity {
            product_id: line.product().id,
            quantity: line.quantity(),
        }
    }
}

/// Everything a tax helper needs to know about an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxContext {
    /// Product quantities
    pub product_quantities: Vec<ProductQuantity>,

    /// Taxable subtotal
    pub subtotal: Decimal,

    /// Shipping cost
    pub shipping_cost: Decimal,

    /// Destination country
    pub country: String,

    /// Destination zip code
    pub zip_code: String,
}

impl TaxContext {
    /// Subtotal plus shipping.
    pub fn taxable_amount(&self) -> Decimal {
        self.subtotal + self.shipping_cost
    }
}

/// How a tax decides its rate. Rates are fractions: `0.08` is 8%.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum TaxRule {
    /// One rate for a country (or `*` for every country)
    Country {
        /// Country name or code
        country: String,
        /// Rate as a fraction
        rate: Decimal,
    },

    /// Rates per zip code
    ZipCode {
        /// Zip code to rate
        rates: BTreeMap<String, Decimal>,
    },
}

/// Tax definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tax {
    /// Label shown on orders
    pub name: String,

    /// Higher priorities are tried first
    #[serde(default)]
    pub priority: i32,

    /// Rule
    pub rule: TaxRule,
}

/// A tax charged on an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxAmount {
    /// Tax name
    pub name: String,

    /// Amount
    pub amount: Decimal,
}

/// Prices taxes of the kinds it understands and returns zero for the rest.
pub trait TaxComputationHelper: fmt::Debug + Send + Sync {
    /// Tax owed under `tax` for `context`.
    fn compute(&self, tax: &Tax, context: &TaxContext) -> Decimal;
}

fn charge(rate: Decimal, context: &TaxContext) -> Decimal {
    round_money(Percentage::from(rate) * context.taxable_amount())
}

/// Computes [`TaxRule::Country`] taxes.
#[derive(Debug, Clone, Copy, Default)]
pub struct CountryTaxHelper;

impl TaxComputationHelper for CountryTaxHelper {
    fn compute(&self, tax: &Tax, context: &TaxContext) -> Decimal {
        match &tax.rule {
            TaxRule::Country { country, rate }
                if country == ANY_COUNTRY
                    || country.trim().eq_ignore_ascii_case(context.country.trim()) =>
            {
                charge(*rate, context)
            }
            _ => Decimal::ZERO,
        }
    }
}

/// Computes [`TaxRule::ZipCode`] taxes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipCodeTaxHelper;

impl TaxComputationHelper for ZipCodeTaxHelper {
    fn compute(&self, tax: &Tax, context: &TaxContext) -> Decimal {
        let TaxRule::ZipCode { rates } = &tax.rule else {
            return Decimal::ZERO;
        };

        let zip_code = context.zip_code.trim();

        rates
            .iter()
            .find(|(candidate, _rate)| candidate.trim().eq_ignore_ascii_case(zip_code))
            .map_or(Decimal::ZERO, |(_zip, rate)| charge(*rate, context))
    }
}

/// Sums the registered helpers' results.
#[derive(Debug, Default)]
pub struct TaxService {
    helpers: Vec<Box<dyn TaxComputationHelper>>,
}

impl TaxService {
    /// A service with no helpers; every tax costs nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// A service with the built-in helpers.
    pub fn with_builtin() -> Self {
        let mut service = Self::new();
        service.register(Box::new(CountryTaxHelper));
        service.register(Box::new(ZipCodeTaxHelper));
        service
    }

    /// Register a helper.
    pub fn register(&mut self, helper: Box<dyn TaxComputationHelper>) {
        self.helpers.push(helper);
    }

    /// Assemble a context. Pure.
    pub fn create_context(
        product_quantities: Vec<ProductQuantity>,
        subtotal: Decimal,
        shipping_cost: Decimal,
        country: impl Into<String>,
        zip_code: impl Into<String>,
    ) -> TaxContext {
        TaxContext {
            product_quantities,
            subtotal,
            shipping_cost,
            country: country.into(),
            zip_code: zip_code.into(),
        }
    }

    /// Sum of every helper's result for one tax.
    pub fn total_taxes(&self, tax: &Tax, context: &TaxContext) -> Decimal {
        self.helpers
            .iter()
            .map(|helper| helper.compute(tax, context))
            .sum()
    }

    /// The highest priority tax that charges anything, with its amount.
    ///
    /// Taxes with equal priority keep their given order.
    pub fn cart_taxes(&self, taxes: &[Tax], context: &TaxContext) -> Option<TaxAmount> {
        let mut by_priority: Vec<&Tax> = taxes.iter().collect();
        by_priority.sort_by_key(|tax| Reverse(tax.priority));

        by_priority.into_iter().find_map(|tax| {
            let amount = self.total_taxes(tax, context);

            debug!(tax = %tax.name, %amount, "computed tax");

            (amount != Decimal::ZERO).then(|| TaxAmount {
                name: tax.name.clone(),
                amount,
            })
        })
    }
}
