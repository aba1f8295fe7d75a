//! Orders
//!
//! An [`OrderSnapshot`] freezes a checkout into three documents stored under one [`OrderKey`]:
//! contents (pricing), customer (addresses and contact details) and activity (an append-only
//! event log). Each document is parsed on first access, cached for the lifetime of the snapshot,
//! and written back immediately whenever it changes.

use std::sync::Arc;

use jiff::Timestamp;
use once_cell::unsync::OnceCell;
use rust_decimal::Decimal;
use rusty_money::iso::Currency;
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;
use tracing::info;

use crate::{pricing::currency_from_code, shipping::ShippingOption, storage::StoreError, taxes::TaxAmount};

pub mod documents;
pub mod store;

pub use documents::{
    ActivityDocument, AdditionalElement, Address, AttributeElement, CardElement, Charge,
    ChargeElement, ContentsDocument, CustomerDocument, EventCategory, OrderEvent, OrderItem,
};
pub use store::{DocumentKind, MemoryOrderStore, OrderKey, OrderStore};

/// Errors raised while building or reading order snapshots.
#[derive(Debug, Error)]
pub enum OrderError {
    /// An order with this key has already been built.
    #[error("order {0} already exists")]
    AlreadyExists(OrderKey),

    /// No order is stored under this key.
    #[error("order {0} not found")]
    NotFound(OrderKey),

    /// The currency code is not supported.
    #[error("unknown currency code '{0}'")]
    UnknownCurrency(String),

    /// The activity category is not one of the known set.
    #[error("unknown event category '{0}'")]
    UnknownCategory(String),

    /// A stored document could not be parsed.
    #[error("{kind} document of order {key} is corrupt: {source}")]
    Corrupt {
        /// Order
        key: OrderKey,
        /// Document
        kind: DocumentKind,
        /// Parse error
        #[source]
        source: serde_json::Error,
    },

    /// A document could not be serialized.
    #[error("failed to encode {kind} document: {source}")]
    Encode {
        /// Document
        kind: DocumentKind,
        /// Encoding error
        #[source]
        source: serde_json::Error,
    },

    /// Backing storage failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Everything frozen into a new order.
#[derive(Debug, Clone, Default)]
pub struct OrderDraft {
    /// Payment charge
    pub charge: Option<Charge>,

    /// Final line items
    pub items: Vec<OrderItem>,

    /// Subtotal
    pub subtotal: Decimal,

    /// Total
    pub total: Decimal,

    /// Amount paid; defaults to the total when read
    pub amount_paid: Option<Decimal>,

    /// Tax charged
    pub tax: Option<TaxAmount>,

    /// Shipping choice
    pub shipping: Option<ShippingOption>,

    /// Shipping address
    pub shipping_address: Option<Address>,

    /// Billing address
    pub billing_address: Option<Address>,

    /// Customer email
    pub email: String,

    /// Customer phone
    pub phone: String,

    /// Delivery instructions
    pub instructions: String,

    /// ISO currency code
    pub currency_code: String,

    /// Purchase order reference
    pub purchase_order: String,

    /// Provider-contributed elements
    pub additional_elements: Vec<AdditionalElement>,
}

fn encode<T: Serialize>(kind: DocumentKind, document: &T) -> Result<String, OrderError> {
    serde_json::to_string(document).map_err(|source| OrderError::Encode { kind, source })
}

fn validate_currency(code: &str) -> Result<&'static Currency, OrderError> {
    currency_from_code(code).ok_or_else(|| OrderError::UnknownCurrency(code.to_string()))
}

/// A document parsed on first access and written through on every change.
#[derive(Debug)]
struct LazyDocument<T> {
    kind: DocumentKind,
    cell: OnceCell<T>,
}

impl<T: Serialize + DeserializeOwned + Default> LazyDocument<T> {
    fn new(kind: DocumentKind) -> Self {
        LazyDocument {
            kind,
            cell: OnceCell::new(),
        }
    }

    fn loaded(kind: DocumentKind, document: T) -> Self {
        LazyDocument {
            kind,
            cell: OnceCell::from(document),
        }
    }

    fn load(&self, key: &OrderKey, store: &dyn OrderStore) -> Result<T, OrderError> {
        match store.read(key, self.kind)? {
            Some(text) => serde_json::from_str(&text).map_err(|source| OrderError::Corrupt {
                key: key.clone(),
                kind: self.kind,
                source,
            }),
            None => Ok(T::default()),
        }
    }

    fn get(&self, key: &OrderKey, store: &dyn OrderStore) -> Result<&T, OrderError> {
        self.cell.get_or_try_init(|| self.load(key, store))
    }

    /// Apply `change` and persist the result. If persisting fails the cached copy is dropped, so
    /// the next read comes from storage again.
    fn update<R>(
        &mut self,
        key: &OrderKey,
        store: &dyn OrderStore,
        change: impl FnOnce(&mut T) -> R,
    ) -> Result<R, OrderError> {
        let mut document = match self.cell.take() {
            Some(document) => document,
            None => self.load(key, store)?,
        };

        let result = change(&mut document);

        store.write(key, self.kind, encode(self.kind, &document)?)?;
        self.cell = OnceCell::from(document);

        Ok(result)
    }
}

/// The frozen record of one order.
#[derive(Debug)]
pub struct OrderSnapshot {
    key: OrderKey,
    store: Arc<dyn OrderStore>,
    contents: LazyDocument<ContentsDocument>,
    customer: LazyDocument<CustomerDocument>,
    activity: LazyDocument<ActivityDocument>,
}

impl OrderSnapshot {
    /// Build and store the contents and customer documents of a new order in one write.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::UnknownCurrency`], [`OrderError::AlreadyExists`], an encoding error,
    /// or a storage error. Nothing is stored unless every document is.
    pub fn build(
        key: OrderKey,
        store: Arc<dyn OrderStore>,
        draft: OrderDraft,
    ) -> Result<Self, OrderError> {
        let currency = validate_currency(&draft.currency_code)?;

        if store.contains(&key)? {
            return Err(OrderError::AlreadyExists(key));
        }

        let mut contents = ContentsDocument {
            subtotal: draft.subtotal,
            total: draft.total,
            amount_paid: draft.amount_paid,
            purchase_order: draft.purchase_order,
            currency_code: currency.iso_alpha_code.to_string(),
            items: draft.items,
            taxes: draft.tax,
            shipping: draft.shipping,
            additional_order_information: draft.additional_elements,
            ..ContentsDocument::default()
        };
        contents.set_charge(draft.charge);

        let customer = CustomerDocument {
            shipping_address: draft.shipping_address,
            billing_address: draft.billing_address,
            email: draft.email,
            phone: draft.phone,
            instructions: draft.instructions,
            ..CustomerDocument::default()
        };

        store.write_all(
            &key,
            vec![
                (
                    DocumentKind::Contents,
                    encode(DocumentKind::Contents, &contents)?,
                ),
                (
                    DocumentKind::Customer,
                    encode(DocumentKind::Customer, &customer)?,
                ),
            ],
        )?;

        info!(order = %key, total = %contents.total, "built order snapshot");

        Ok(OrderSnapshot {
            key,
            store,
            contents: LazyDocument::loaded(DocumentKind::Contents, contents),
            customer: LazyDocument::loaded(DocumentKind::Customer, customer),
            activity: LazyDocument::new(DocumentKind::Activity),
        })
    }

    /// Open a stored order. Documents are parsed lazily.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::NotFound`] if nothing is stored under the key.
    pub fn load(key: OrderKey, store: Arc<dyn OrderStore>) -> Result<Self, OrderError> {
        if !store.contains(&key)? {
            return Err(OrderError::NotFound(key));
        }

        Ok(OrderSnapshot {
            key,
            store,
            contents: LazyDocument::new(DocumentKind::Contents),
            customer: LazyDocument::new(DocumentKind::Customer),
            activity: LazyDocument::new(DocumentKind::Activity),
        })
    }

    /// Order key
    pub fn key(&self) -> &OrderKey {
        &self.key
    }

    /// The contents document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be read or parsed.
    pub fn contents(&self) -> Result<&ContentsDocument, OrderError> {
        self.contents.get(&self.key, self.store.as_ref())
    }

    /// The customer document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be read or parsed.
    pub fn customer(&self) -> Result<&CustomerDocument, OrderError> {
        self.customer.get(&self.key, self.store.as_ref())
    }

    /// Every logged event, in the order it was logged.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be read or parsed.
    pub fn activity(&self) -> Result<&[OrderEvent], OrderError> {
        Ok(&self.activity.get(&self.key, self.store.as_ref())?.events)
    }

    /// The order's currency.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::UnknownCurrency`] if the stored code is not supported.
    pub fn currency(&self) -> Result<&'static Currency, OrderError> {
        validate_currency(&self.contents()?.currency_code)
    }

    /// Change the currency code.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::UnknownCurrency`] or a storage error.
    pub fn set_currency_code(&mut self, code: &str) -> Result<(), OrderError> {
        let currency = validate_currency(code)?;

        self.contents
            .update(&self.key, self.store.as_ref(), |contents| {
                contents.currency_code = currency.iso_alpha_code.to_string();
            })
    }

    /// Record the amount paid.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be read or written.
    pub fn set_amount_paid(&mut self, amount: Decimal) -> Result<(), OrderError> {
        self.contents
            .update(&self.key, self.store.as_ref(), |contents| {
                contents.amount_paid = Some(amount);
            })
    }

    /// Record the purchase order reference.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be read or written.
    pub fn set_purchase_order(&mut self, purchase_order: &str) -> Result<(), OrderError> {
        self.contents
            .update(&self.key, self.store.as_ref(), |contents| {
                contents.purchase_order = purchase_order.to_string();
            })
    }

    /// Replace the charge.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be read or written.
    pub fn update_charge(&mut self, charge: Option<Charge>) -> Result<(), OrderError> {
        self.contents
            .update(&self.key, self.store.as_ref(), |contents| {
                contents.set_charge(charge);
            })
    }

    /// Replace the shipping address.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be read or written.
    pub fn set_shipping_address(&mut self, address: Option<Address>) -> Result<(), OrderError> {
        self.customer
            .update(&self.key, self.store.as_ref(), |customer| {
                customer.shipping_address = address;
            })
    }

    /// Replace the billing address.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be read or written.
    pub fn set_billing_address(&mut self, address: Option<Address>) -> Result<(), OrderError> {
        self.customer
            .update(&self.key, self.store.as_ref(), |customer| {
                customer.billing_address = address;
            })
    }

    /// Append an event to the activity log and persist it.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be read or written.
    pub fn log_activity(
        &mut self,
        category: EventCategory,
        description: impl Into<String>,
    ) -> Result<OrderEvent, OrderError> {
        let event = OrderEvent {
            date: Timestamp::now(),
            category,
            description: description.into(),
        };

        let logged = event.clone();
        self.activity
            .update(&self.key, self.store.as_ref(), move |activity| {
                activity.events.push(logged);
            })?;

        Ok(event)
    }
}
