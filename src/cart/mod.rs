//! Cart

use std::{cmp::Reverse, collections::BTreeMap, fmt};

use rust_decimal::Decimal;
use rusty_money::iso::Currency;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{alterations::PriceAlteration, pricing::round_money, shipping::ShippingOption};

/// Errors related to cart construction and mutation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CartError {
    /// A line was given a zero quantity.
    #[error("product {0} must have a quantity greater than zero")]
    ZeroQuantity(ProductId),

    /// An alteration with the same type and key is already on the cart.
    #[error("alteration {alteration_type} '{key}' is already applied")]
    DuplicateAlteration {
        /// Alteration type tag
        alteration_type: String,
        /// Alteration key within its type
        key: String,
    },

    /// No line exists at the given index.
    #[error("no cart line at index {0}")]
    LineNotFound(usize),
}

/// Product identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub u32);

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Product as referenced by a cart line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    /// Product id
    pub id: ProductId,

    /// Product title
    pub title: String,

    /// List price
    pub price: Decimal,

    /// Optional sale price
    pub discount_price: Option<Decimal>,
}

impl Product {
    /// Create a product at its list price.
    pub fn new(id: u32, title: impl Into<String>, price: Decimal) -> Self {
        Product {
            id: ProductId(id),
            title: title.into(),
            price,
            discount_price: None,
        }
    }

    /// Set a sale price.
    #[must_use]
    pub fn with_discount_price(mut self, discount_price: Decimal) -> Self {
        self.discount_price = Some(discount_price);
        self
    }

    /// The unit price a customer pays: the sale price when it is set and below the list price.
    pub fn effective_price(&self) -> Decimal {
        match self.discount_price {
            Some(discount) if discount >= Decimal::ZERO && discount < self.price => discount,
            _ => self.price,
        }
    }
}

/// Extension data attached to an attribute value.
///
/// The payload only means something to the provider that wrote it, so the two travel together.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AttributeExtension {
    /// Name of the extension provider that understands the payload
    pub provider: String,

    /// Opaque provider payload
    pub payload: String,
}

/// A chosen product attribute value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AttributeValue {
    value: String,
    extension: Option<AttributeExtension>,
}

impl AttributeValue {
    /// A plain attribute value.
    pub fn plain(value: impl Into<String>) -> Self {
        AttributeValue {
            value: value.into(),
            extension: None,
        }
    }

    /// An attribute value carrying a provider-specific payload.
    pub fn extended(
        value: impl Into<String>,
        provider: impl Into<String>,
        payload: impl Into<String>,
    ) -> Self {
        AttributeValue {
            value: value.into(),
            extension: Some(AttributeExtension {
                provider: provider.into(),
                payload: payload.into(),
            }),
        }
    }

    /// Displayed value
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Extension data, if any
    pub fn extension(&self) -> Option<&AttributeExtension> {
        self.extension.as_ref()
    }
}

/// Attribute id to chosen value.
pub type AttributeMap = BTreeMap<u32, AttributeValue>;

/// Cart line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    product: Product,
    quantity: u32,
    line_adjustment: Decimal,
    attributes: AttributeMap,
    promotion_id: Option<u32>,
}

impl CartLine {
    /// Create a new line.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::ZeroQuantity`] if `quantity` is zero.
    pub fn new(product: Product, quantity: u32) -> Result<Self, CartError> {
        if quantity == 0 {
            return Err(CartError::ZeroQuantity(product.id));
        }

        Ok(CartLine {
            product,
            quantity,
            line_adjustment: Decimal::ZERO,
            attributes: AttributeMap::new(),
            promotion_id: None,
        })
    }

    /// Set the per-line price adjustment.
    #[must_use]
    pub fn with_adjustment(mut self, adjustment: Decimal) -> Self {
        self.line_adjustment = adjustment;
        self
    }

    /// Attach an attribute value.
    #[must_use]
    pub fn with_attribute(mut self, attribute_id: u32, value: AttributeValue) -> Self {
        self.attributes.insert(attribute_id, value);
        self
    }

    /// Record the promotion that produced this line.
    #[must_use]
    pub fn with_promotion(mut self, promotion_id: u32) -> Self {
        self.promotion_id = Some(promotion_id);
        self
    }

    /// Product
    pub fn product(&self) -> &Product {
        &self.product
    }

    /// Quantity
    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Per-line price adjustment
    pub fn line_adjustment(&self) -> Decimal {
        self.line_adjustment
    }

    /// Chosen attributes
    pub fn attributes(&self) -> &AttributeMap {
        &self.attributes
    }

    /// Promotion id, if any
    pub fn promotion_id(&self) -> Option<u32> {
        self.promotion_id
    }

    /// Unit price times quantity, rounded, before the line adjustment.
    pub fn extended_price(&self) -> Decimal {
        round_money(self.product.effective_price() * Decimal::from(self.quantity))
    }

    /// Line total including the line adjustment.
    pub fn total(&self) -> Decimal {
        self.extended_price() + self.line_adjustment
    }

    fn merges_with(&self, other: &CartLine) -> bool {
        self.product.id == other.product.id
            && self.attributes == other.attributes
            && self.promotion_id == other.promotion_id
    }
}

/// Shipping destination
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    /// Country name or code
    pub country: String,

    /// Postal or zip code
    pub postal_code: String,
}

impl Destination {
    /// Create a destination.
    pub fn new(country: impl Into<String>, postal_code: impl Into<String>) -> Self {
        Destination {
            country: country.into(),
            postal_code: postal_code.into(),
        }
    }
}

/// Cart
#[derive(Debug, Clone)]
pub struct Cart {
    lines: Vec<CartLine>,
    destination: Destination,
    shipping_option: Option<ShippingOption>,
    alterations: Vec<PriceAlteration>,
    currency: &'static Currency,
}

impl Cart {
    /// Create an empty cart in the given currency.
    pub fn new(currency: &'static Currency) -> Self {
        Cart {
            lines: Vec::new(),
            destination: Destination::default(),
            shipping_option: None,
            alterations: Vec::new(),
            currency,
        }
    }

    /// Set the destination.
    #[must_use]
    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    /// Add a line, merging its quantity into an identical existing line.
    pub fn add_line(&mut self, line: CartLine) {
        if let Some(existing) = self.lines.iter_mut().find(|l| l.merges_with(&line)) {
            existing.quantity = existing.quantity.saturating_add(line.quantity);
        } else {
            self.lines.push(line);
        }
    }

    /// Change the quantity of the line at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::LineNotFound`] or [`CartError::ZeroQuantity`].
    pub fn set_quantity(&mut self, index: usize, quantity: u32) -> Result<(), CartError> {
        let line = self
            .lines
            .get_mut(index)
            .ok_or(CartError::LineNotFound(index))?;

        if quantity == 0 {
            return Err(CartError::ZeroQuantity(line.product.id));
        }

        line.quantity = quantity;

        Ok(())
    }

    /// Remove the line at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::LineNotFound`] if the index is out of range.
    pub fn remove_line(&mut self, index: usize) -> Result<CartLine, CartError> {
        if index >= self.lines.len() {
            return Err(CartError::LineNotFound(index));
        }

        Ok(self.lines.remove(index))
    }

    /// Lines in insertion order.
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Whether the cart has no lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total quantity across lines.
    pub fn item_count(&self) -> u32 {
        self.lines
            .iter()
            .fold(0, |acc, line| acc.saturating_add(line.quantity))
    }

    /// Sum of line totals.
    pub fn subtotal(&self) -> Decimal {
        self.lines.iter().map(CartLine::total).sum()
    }

    /// Destination
    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    /// Replace the destination.
    pub fn set_destination(&mut self, destination: Destination) {
        self.destination = destination;
    }

    /// Chosen shipping option
    pub fn shipping_option(&self) -> Option<&ShippingOption> {
        self.shipping_option.as_ref()
    }

    /// Choose (or clear) the shipping option.
    pub fn set_shipping_option(&mut self, option: Option<ShippingOption>) {
        self.shipping_option = option;
    }

    /// Currency
    pub fn currency(&self) -> &'static Currency {
        self.currency
    }

    /// Active alterations, heaviest first.
    pub fn alterations(&self) -> &[PriceAlteration] {
        &self.alterations
    }

    /// Whether an alteration of this type and key (case-insensitive) is active.
    pub fn has_alteration(&self, alteration_type: &str, key: &str) -> bool {
        self.alterations
            .iter()
            .any(|alteration| alteration.matches(alteration_type, key))
    }

    /// Prepend an alteration and re-sort by weight, heaviest first.
    ///
    /// Among equal weights the newest alteration comes first.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::DuplicateAlteration`] if the same type and key is already active.
    pub fn add_alteration(&mut self, alteration: PriceAlteration) -> Result<(), CartError> {
        if self.has_alteration(&alteration.alteration_type, &alteration.key) {
            return Err(CartError::DuplicateAlteration {
                alteration_type: alteration.alteration_type,
                key: alteration.key,
            });
        }

        self.alterations.insert(0, alteration);
        self.sort_alterations();

        Ok(())
    }

    /// Remove an alteration by type and key, returning it if it was active.
    pub fn remove_alteration(&mut self, alteration_type: &str, key: &str) -> Option<PriceAlteration> {
        let index = self
            .alterations
            .iter()
            .position(|alteration| alteration.matches(alteration_type, key))?;

        Some(self.alterations.remove(index))
    }

    /// Replace every alteration, dropping later duplicates.
    pub fn set_alterations(&mut self, alterations: impl IntoIterator<Item = PriceAlteration>) {
        self.alterations.clear();

        for alteration in alterations {
            if !self.has_alteration(&alteration.alteration_type, &alteration.key) {
                self.alterations.push(alteration);
            }
        }

        self.sort_alterations();
    }

    fn sort_alterations(&mut self) {
        self.alterations
            .sort_by_key(|alteration| Reverse(alteration.weight));
    }
}

#[cfg(test)]
mod tests {
    use rusty_money::iso;
    use testresult::TestResult;

    use super::*;

    fn widget() -> Product {
        Product::new(1, "Widget", Decimal::new(4000, 2))
    }

    #[test]
    fn effective_price_prefers_lower_discount_price() {
        let product = widget().with_discount_price(Decimal::new(3500, 2));

        assert_eq!(product.effective_price(), Decimal::new(3500, 2));
    }

    #[test]
    fn effective_price_ignores_higher_or_negative_discount_price() {
        let higher = widget().with_discount_price(Decimal::new(4500, 2));
        let negative = widget().with_discount_price(Decimal::new(-100, 2));

        assert_eq!(higher.effective_price(), Decimal::new(4000, 2));
        assert_eq!(negative.effective_price(), Decimal::new(4000, 2));
    }

    #[test]
    fn zero_quantity_is_rejected() {
        let result = CartLine::new(widget(), 0);

        assert_eq!(result, Err(CartError::ZeroQuantity(ProductId(1))));
    }

    #[test]
    fn line_total_rounds_before_adjustment() -> TestResult {
        let product = Product::new(2, "Bolt", Decimal::new(3333, 3));
        let line = CartLine::new(product, 3)?.with_adjustment(Decimal::new(-50, 2));

        // 3.333 * 3 = 9.999 -> 10.00, then -0.50
        assert_eq!(line.total(), Decimal::new(950, 2));

        Ok(())
    }

    #[test]
    fn identical_lines_merge() -> TestResult {
        let mut cart = Cart::new(iso::USD);

        cart.add_line(CartLine::new(widget(), 1)?);
        cart.add_line(CartLine::new(widget(), 2)?);
        cart.add_line(CartLine::new(widget(), 1)?.with_attribute(7, AttributeValue::plain("Red")));

        assert_eq!(cart.lines().len(), 2);
        assert_eq!(cart.item_count(), 4);
        assert_eq!(cart.subtotal(), Decimal::new(16000, 2));

        Ok(())
    }

    #[test]
    fn alterations_sort_by_weight_descending() -> TestResult {
        let mut cart = Cart::new(iso::USD);

        cart.add_alteration(PriceAlteration::new("Coupon", "A", 1))?;
        cart.add_alteration(PriceAlteration::new("Promotion", "B", 5))?;
        cart.add_alteration(PriceAlteration::new("Coupon", "C", 1))?;

        let keys: Vec<&str> = cart.alterations().iter().map(|a| a.key.as_str()).collect();

        assert_eq!(keys, ["B", "C", "A"]);

        Ok(())
    }

    #[test]
    fn duplicate_alteration_is_rejected_case_insensitively() -> TestResult {
        let mut cart = Cart::new(iso::USD);

        cart.add_alteration(PriceAlteration::new("Coupon", "save10", 1))?;
        let result = cart.add_alteration(PriceAlteration::new("coupon", "SAVE10", 1));

        assert!(matches!(result, Err(CartError::DuplicateAlteration { .. })));
        assert_eq!(cart.alterations().len(), 1);

        Ok(())
    }

    #[test]
    fn remove_alteration_returns_removed_entry() -> TestResult {
        let mut cart = Cart::new(iso::USD);
        cart.add_alteration(PriceAlteration::new("Coupon", "SAVE10", 1))?;

        let removed = cart.remove_alteration("Coupon", "save10");

        assert_eq!(removed.map(|a| a.key), Some("SAVE10".to_string()));
        assert!(cart.alterations().is_empty());

        Ok(())
    }

    #[test]
    fn set_quantity_validates_index_and_quantity() -> TestResult {
        let mut cart = Cart::new(iso::USD);
        cart.add_line(CartLine::new(widget(), 1)?);

        assert_eq!(cart.set_quantity(3, 1), Err(CartError::LineNotFound(3)));
        assert_eq!(
            cart.set_quantity(0, 0),
            Err(CartError::ZeroQuantity(ProductId(1)))
        );

        cart.set_quantity(0, 5)?;

        assert_eq!(cart.item_count(), 5);

        Ok(())
    }

    #[test]
    fn extended_attribute_keeps_provider_with_payload() {
        let value = AttributeValue::extended("Engraving", "TextField", "Happy birthday");

        let extension = value.extension();

        assert_eq!(value.value(), "Engraving");
        assert_eq!(extension.map(|e| e.provider.as_str()), Some("TextField"));
        assert_eq!(extension.map(|e| e.payload.as_str()), Some("Happy birthday"));
    }
}
