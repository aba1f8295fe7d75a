//! Fixtures
//!
//! YAML fixture sets live under `<base>/<kind>/<name>.yml` for the kinds `coupons`, `shipping`,
//! `taxes` and `carts`. Prices are written as `"AMOUNT CURRENCY"` and rates as `"8%"` or `"0.08"`.

use std::{fs, path::PathBuf, sync::Arc};

use rust_decimal::Decimal;
use rusty_money::iso::Currency;
use thiserror::Error;

use crate::{
    cart::{Cart, CartError},
    coupons::{CouponRepository, CouponRepositoryError, MemoryCouponRepository},
    pricing::currency_from_code,
    shipping::{MemoryShippingMethodRepository, ShippingMethodRepository},
    storage::StoreError,
    taxes::Tax,
};

pub mod carts;
pub mod coupons;
pub mod shipping;
pub mod taxes;

/// Fixture Parsing Errors
#[derive(Debug, Error)]
pub enum FixtureError {
    /// IO error reading fixture files
    #[error("Failed to read fixture file: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_norway::Error),

    /// Criterion state could not be encoded
    #[error("Failed to encode criterion state: {0}")]
    State(#[from] serde_json::Error),

    /// Invalid price format
    #[error("Invalid price format: {0}")]
    InvalidPrice(String),

    /// Invalid rate format
    #[error("Invalid rate format: {0}")]
    InvalidRate(String),

    /// Unknown currency code
    #[error("Unknown currency code: {0}")]
    UnknownCurrency(String),

    /// Currency mismatch between cart prices
    #[error("Currency mismatch: expected {0}, found {1}")]
    CurrencyMismatch(String, String),

    /// Cart has no lines to take a currency from
    #[error("No cart lines; currency unknown")]
    NoCurrency,

    /// No cart loaded
    #[error("No cart loaded")]
    NoCart,

    /// Cart construction failed
    #[error(transparent)]
    Cart(#[from] CartError),

    /// Coupon could not be stored
    #[error(transparent)]
    Coupon(#[from] CouponRepositoryError),

    /// Repository storage failed
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Parse price string (e.g., "2.99 GBP") into an amount and currency
///
/// # Errors
///
/// Returns an error if the string is not in the format "AMOUNT CURRENCY", if the amount is not a
/// decimal, or if the currency code is not recognized.
pub fn parse_price(s: &str) -> Result<(Decimal, &'static Currency), FixtureError> {
    let mut parts = s.split_whitespace();

    let (Some(amount), Some(code), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(FixtureError::InvalidPrice(format!(
            "Expected format 'AMOUNT CURRENCY', got: {s}"
        )));
    };

    let amount = amount
        .parse::<Decimal>()
        .map_err(|_err| FixtureError::InvalidPrice(s.to_string()))?;

    let currency =
        currency_from_code(code).ok_or_else(|| FixtureError::UnknownCurrency(code.to_string()))?;

    Ok((amount, currency))
}

/// Parse a rate string ("8%" or "0.08") into a fraction
///
/// # Errors
///
/// Returns an error if the string is not a decimal.
pub fn parse_rate(s: &str) -> Result<Decimal, FixtureError> {
    let trimmed = s.trim();

    if let Some(percent) = trimmed.strip_suffix('%') {
        let value = percent
            .trim()
            .parse::<Decimal>()
            .map_err(|_err| FixtureError::InvalidRate(s.to_string()))?;

        Ok(value / Decimal::ONE_HUNDRED)
    } else {
        trimmed
            .parse::<Decimal>()
            .map_err(|_err| FixtureError::InvalidRate(s.to_string()))
    }
}

/// Fixture
#[derive(Debug)]
pub struct Fixture {
    /// Base path for fixture files
    base_path: PathBuf,

    coupons: Arc<MemoryCouponRepository>,
    shipping_methods: Arc<MemoryShippingMethodRepository>,
    taxes: Vec<Tax>,
    cart: Option<Cart>,
}

impl Fixture {
    /// Create a new empty fixture with default base path
    pub fn new() -> Self {
        Self::with_base_path("./fixtures")
    }

    /// Create a new empty fixture with custom base path
    pub fn with_base_path(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            coupons: Arc::new(MemoryCouponRepository::new()),
            shipping_methods: Arc::new(MemoryShippingMethodRepository::new()),
            taxes: Vec::new(),
            cart: None,
        }
    }

    fn read(&self, kind: &str, name: &str) -> Result<String, FixtureError> {
        let file_path = self.base_path.join(kind).join(format!("{name}.yml"));

        Ok(fs::read_to_string(file_path)?)
    }

    /// Load coupons from a YAML fixture file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or a code is used twice.
    pub fn load_coupons(&mut self, name: &str) -> Result<&mut Self, FixtureError> {
        let fixture: coupons::CouponsFixture = serde_norway::from_str(&self.read("coupons", name)?)?;

        for coupon in fixture.coupons {
            self.coupons.create(coupon.try_into()?)?;
        }

        Ok(self)
    }

    /// Load shipping methods and their criteria from a YAML fixture file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or a price is invalid.
    pub fn load_shipping(&mut self, name: &str) -> Result<&mut Self, FixtureError> {
        let fixture: shipping::ShippingFixture =
            serde_norway::from_str(&self.read("shipping", name)?)?;

        for method in fixture.into_methods()? {
            self.shipping_methods.insert(method)?;
        }

        Ok(self)
    }

    /// Load tax definitions from a YAML fixture file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or a rate is invalid.
    pub fn load_taxes(&mut self, name: &str) -> Result<&mut Self, FixtureError> {
        let fixture: taxes::TaxesFixture = serde_norway::from_str(&self.read("taxes", name)?)?;

        for tax in fixture.taxes {
            self.taxes.push(tax.try_into()?);
        }

        Ok(self)
    }

    /// Load a cart from a YAML fixture file, replacing any loaded cart
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or prices disagree on currency.
    pub fn load_cart(&mut self, name: &str) -> Result<&mut Self, FixtureError> {
        let fixture: carts::CartFixture = serde_norway::from_str(&self.read("carts", name)?)?;

        self.cart = Some(fixture.try_into()?);

        Ok(self)
    }

    /// Load a complete fixture set (coupons, shipping, taxes and cart with the same name)
    ///
    /// # Errors
    ///
    /// Returns an error if any of the fixture files cannot be loaded.
    pub fn from_set(base_path: impl Into<PathBuf>, name: &str) -> Result<Self, FixtureError> {
        let mut fixture = Self::with_base_path(base_path);

        fixture
            .load_coupons(name)?
            .load_shipping(name)?
            .load_taxes(name)?
            .load_cart(name)?;

        Ok(fixture)
    }

    /// Coupon repository holding the loaded coupons
    pub fn coupons(&self) -> Arc<MemoryCouponRepository> {
        Arc::clone(&self.coupons)
    }

    /// Shipping repository holding the loaded methods
    pub fn shipping_methods(&self) -> Arc<MemoryShippingMethodRepository> {
        Arc::clone(&self.shipping_methods)
    }

    /// Loaded tax definitions
    pub fn taxes(&self) -> &[Tax] {
        &self.taxes
    }

    /// A copy of the loaded cart
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError::NoCart`] if no cart has been loaded.
    pub fn cart(&self) -> Result<Cart, FixtureError> {
        self.cart.clone().ok_or(FixtureError::NoCart)
    }
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}
