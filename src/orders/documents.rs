//! Order documents
//!
//! Every document keeps fields it does not recognise in `extensions`, so records written by newer
//! providers survive a read-modify-write by older code.

use std::{fmt, str::FromStr};

use jiff::Timestamp;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    cart::{AttributeExtension, AttributeMap, AttributeValue, CartLine},
    orders::OrderError,
    shipping::ShippingOption,
    taxes::TaxAmount,
};

/// A provider-contributed element, tagged with its own name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdditionalElement {
    /// Element name, e.g. `Coupon`
    pub name: String,

    /// Provider-defined content
    pub content: Value,
}

impl AdditionalElement {
    /// Create an element.
    pub fn new(name: impl Into<String>, content: Value) -> Self {
        AdditionalElement {
            name: name.into(),
            content,
        }
    }
}

/// How an order was paid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Charge {
    /// A payment processor charge
    Payment {
        /// Processor transaction id
        transaction_id: String,
        /// Text shown to the customer
        charge_text: String,
    },

    /// A card charge, as recorded by older orders
    Card {
        /// Processor transaction id
        transaction_id: String,
        /// Last four digits
        last4: String,
        /// Expiry month
        expiration_month: u8,
        /// Expiry year
        expiration_year: u16,
    },
}

impl Charge {
    /// Transaction id
    pub fn transaction_id(&self) -> &str {
        match self {
            Charge::Payment { transaction_id, .. } | Charge::Card { transaction_id, .. } => {
                transaction_id
            }
        }
    }
}

/// `charge` element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeElement {
    /// Processor transaction id
    pub transaction_id: String,

    /// Text shown to the customer
    #[serde(default)]
    pub charge_text: String,
}

/// Legacy `card` element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardElement {
    /// Processor transaction id
    pub transaction_id: String,

    /// Last four digits
    pub last4: String,

    /// Expiry month
    pub expiration_month: u8,

    /// Expiry year
    pub expiration_year: u16,
}

/// One chosen attribute of an ordered item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeElement {
    /// Attribute id
    pub key: u32,

    /// Chosen value
    pub value: String,

    /// Provider data, if the value carried any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension: Option<AttributeExtension>,
}

/// An ordered line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    /// Product id
    pub product_id: u32,

    /// Quantity
    pub quantity: u32,

    /// Product title
    pub title: String,

    /// Unit price charged
    pub price: Decimal,

    /// List price
    pub original_price: Decimal,

    /// Per-line adjustment
    #[serde(default)]
    pub line_price_adjustment: Decimal,

    /// Promotion that produced the line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promotion_id: Option<u32>,

    /// Chosen attributes
    #[serde(default)]
    pub attributes: Vec<AttributeElement>,
}

impl OrderItem {
    /// The item's attributes as a map.
    pub fn attribute_map(&self) -> AttributeMap {
        self.attributes
            .iter()
            .map(|attribute| {
                let value = match &attribute.extension {
                    Some(extension) => AttributeValue::extended(
                        attribute.value.clone(),
                        extension.provider.clone(),
                        extension.payload.clone(),
                    ),
                    None => AttributeValue::plain(attribute.value.clone()),
                };

                (attribute.key, value)
            })
            .collect()
    }
}

impl From<&CartLine> for OrderItem {
    fn from(line: &CartLine) -> Self {
        let product = line.product();

        OrderItem {
            product_id: product.id.0,
            quantity: line.quantity(),
            title: product.title.clone(),
            price: product.effective_price(),
            original_price: product.price,
            line_price_adjustment: line.line_adjustment(),
            promotion_id: line.promotion_id(),
            attributes: line
                .attributes()
                .iter()
                .map(|(key, value)| AttributeElement {
                    key: *key,
                    value: value.value().to_string(),
                    extension: value.extension().cloned(),
                })
                .collect(),
        }
    }
}

/// The pricing document of an order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentsDocument {
    /// Subtotal
    pub subtotal: Decimal,

    /// Total
    pub total: Decimal,

    /// Amount paid, when it differs from the total
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_paid: Option<Decimal>,

    /// Purchase order reference
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub purchase_order: String,

    /// ISO currency code
    pub currency_code: String,

    /// Payment charge
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charge: Option<ChargeElement>,

    /// Legacy card charge
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card: Option<CardElement>,

    /// Line items
    #[serde(default)]
    pub items: Vec<OrderItem>,

    /// Tax charged
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taxes: Option<TaxAmount>,

    /// Shipping choice
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping: Option<ShippingOption>,

    /// Provider-contributed elements
    #[serde(default)]
    pub additional_order_information: Vec<AdditionalElement>,

    /// Fields this version does not know about
    #[serde(flatten)]
    pub extensions: Map<String, Value>,
}

impl ContentsDocument {
    /// Amount paid, defaulting to the total.
    pub fn amount_paid(&self) -> Decimal {
        self.amount_paid.unwrap_or(self.total)
    }

    /// The charge, reading legacy card elements too.
    pub fn charge(&self) -> Option<Charge> {
        if let Some(charge) = &self.charge {
            return Some(Charge::Payment {
                transaction_id: charge.transaction_id.clone(),
                charge_text: charge.charge_text.clone(),
            });
        }

        self.card.as_ref().map(|card| Charge::Card {
            transaction_id: card.transaction_id.clone(),
            last4: card.last4.clone(),
            expiration_month: card.expiration_month,
            expiration_year: card.expiration_year,
        })
    }

    /// Record a charge, replacing any previous one.
    pub fn set_charge(&mut self, charge: Option<Charge>) {
        self.charge = None;
        self.card = None;

        match charge {
            Some(Charge::Payment {
                transaction_id,
                charge_text,
            }) => {
                self.charge = Some(ChargeElement {
                    transaction_id,
                    charge_text,
                });
            }
            Some(Charge::Card {
                transaction_id,
                last4,
                expiration_month,
                expiration_year,
            }) => {
                self.card = Some(CardElement {
                    transaction_id,
                    last4,
                    expiration_month,
                    expiration_year,
                });
            }
            None => {}
        }
    }

    /// Additional elements with the given name.
    pub fn additional_elements<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a AdditionalElement> + 'a {
        self.additional_order_information
            .iter()
            .filter(move |element| element.name == name)
    }
}

/// Postal address
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Address {
    /// Honorific
    pub honorific: String,

    /// First name
    pub first_name: String,

    /// Last name
    pub last_name: String,

    /// Company
    pub company: String,

    /// First address line
    pub address1: String,

    /// Second address line
    pub address2: String,

    /// City
    pub city: String,

    /// Province or state
    pub province: String,

    /// Postal code
    pub postal_code: String,

    /// Country
    pub country: String,
}

/// The customer document of an order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDocument {
    /// Shipping address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<Address>,

    /// Billing address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing_address: Option<Address>,

    /// Email
    #[serde(default)]
    pub email: String,

    /// Phone
    #[serde(default)]
    pub phone: String,

    /// Delivery instructions
    #[serde(default)]
    pub instructions: String,

    /// Fields this version does not know about
    #[serde(flatten)]
    pub extensions: Map<String, Value>,
}

/// Activity categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventCategory {
    /// Note
    Note,
    /// Warning
    Warning,
    /// Error
    Error,
    /// Task
    Task,
    /// Event
    Event,
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventCategory::Note => "Note",
            EventCategory::Warning => "Warning",
            EventCategory::Error => "Error",
            EventCategory::Task => "Task",
            EventCategory::Event => "Event",
        };

        f.write_str(name)
    }
}

impl FromStr for EventCategory {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "note" => Ok(EventCategory::Note),
            "warning" => Ok(EventCategory::Warning),
            "error" => Ok(EventCategory::Error),
            "task" => Ok(EventCategory::Task),
            "event" => Ok(EventCategory::Event),
            _ => Err(OrderError::UnknownCategory(s.to_string())),
        }
    }
}

/// An activity log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderEvent {
    /// When it happened (UTC)
    pub date: Timestamp,

    /// Category
    pub category: EventCategory,

    /// Description
    pub description: String,
}

/// The activity document of an order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityDocument {
    /// Events in the order they were logged
    #[serde(default)]
    pub events: Vec<OrderEvent>,

    /// Fields this version does not know about
    #[serde(flatten)]
    pub extensions: Map<String, Value>,
}
