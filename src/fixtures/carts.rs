//! Cart Fixtures

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rusty_money::iso::Currency;
use serde::Deserialize;

use crate::{
    cart::{AttributeValue, Cart, CartLine, Destination, Product},
    fixtures::{FixtureError, parse_price},
};

/// Cart fixture
#[derive(Debug, Deserialize)]
pub struct CartFixture {
    /// Ship-to destination
    #[serde(default)]
    pub destination: DestinationFixture,

    /// Cart lines
    pub lines: Vec<LineFixture>,
}

/// Destination fixture
#[derive(Debug, Default, Deserialize)]
pub struct DestinationFixture {
    /// Country code
    #[serde(default)]
    pub country: String,

    /// Postal code
    #[serde(default)]
    pub postal_code: String,
}

/// Cart line fixture
#[derive(Debug, Deserialize)]
pub struct LineFixture {
    /// Product id
    pub product: u32,

    /// Product title
    pub title: String,

    /// List price (e.g., "40.00 USD")
    pub price: String,

    /// Sale price, when on sale
    #[serde(default)]
    pub discount_price: Option<String>,

    /// Quantity
    pub quantity: u32,

    /// Attributes by attribute id
    #[serde(default)]
    pub attributes: BTreeMap<u32, String>,
}

fn price_in(
    price: &str,
    currency: &mut Option<&'static Currency>,
) -> Result<Decimal, FixtureError> {
    let (amount, parsed) = parse_price(price)?;

    match currency {
        Some(existing) if *existing != parsed => Err(FixtureError::CurrencyMismatch(
            existing.iso_alpha_code.to_string(),
            parsed.iso_alpha_code.to_string(),
        )),
        Some(_) => Ok(amount),
        None => {
            *currency = Some(parsed);
            Ok(amount)
        }
    }
}

impl TryFrom<CartFixture> for Cart {
    type Error = FixtureError;

    fn try_from(fixture: CartFixture) -> Result<Self, Self::Error> {
        let mut currency = None;
        let mut lines = Vec::with_capacity(fixture.lines.len());

        for line in fixture.lines {
            let mut product =
                Product::new(line.product, line.title, price_in(&line.price, &mut currency)?);

            if let Some(discount_price) = &line.discount_price {
                product = product.with_discount_price(price_in(discount_price, &mut currency)?);
            }

            let mut cart_line = CartLine::new(product, line.quantity)?;

            for (attribute_id, value) in line.attributes {
                cart_line = cart_line.with_attribute(attribute_id, AttributeValue::plain(value));
            }

            lines.push(cart_line);
        }

        let currency = currency.ok_or(FixtureError::NoCurrency)?;
        let mut cart = Cart::new(currency).with_destination(Destination::new(
            fixture.destination.country,
            fixture.destination.postal_code,
        ));

        for line in lines {
            cart.add_line(line);
        }

        Ok(cart)
    }
}
