//! Order document store

use std::{collections::BTreeMap, fmt, sync::RwLock};

use serde::{Deserialize, Serialize};

use crate::storage::StoreError;

/// Order identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderKey(pub String);

impl OrderKey {
    /// Create a key.
    pub fn new(key: impl Into<String>) -> Self {
        OrderKey(key.into())
    }
}

impl fmt::Display for OrderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The independently stored documents of one order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DocumentKind {
    /// Pricing: totals, items, taxes, shipping, charge
    Contents,

    /// Addresses and contact details
    Customer,

    /// Append-only event log
    Activity,
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentKind::Contents => f.write_str("contents"),
            DocumentKind::Customer => f.write_str("customer"),
            DocumentKind::Activity => f.write_str("activity"),
        }
    }
}

/// Keyed storage of serialized order documents.
pub trait OrderStore: fmt::Debug + Send + Sync {
    /// Read one document.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if storage fails.
    fn read(&self, key: &OrderKey, kind: DocumentKind) -> Result<Option<String>, StoreError>;

    /// Replace one document.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if storage fails.
    fn write(&self, key: &OrderKey, kind: DocumentKind, text: String) -> Result<(), StoreError>;

    /// Write several documents of one order at once; either all are written or none.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if storage fails.
    fn write_all(
        &self,
        key: &OrderKey,
        documents: Vec<(DocumentKind, String)>,
    ) -> Result<(), StoreError>;

    /// Whether any document exists for the order.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if storage fails.
    fn contains(&self, key: &OrderKey) -> Result<bool, StoreError>;
}

/// In-memory order store.
#[derive(Debug, Default)]
pub struct MemoryOrderStore {
    documents: RwLock<BTreeMap<(OrderKey, DocumentKind), String>>,
}

impl MemoryOrderStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl OrderStore for MemoryOrderStore {
    fn read(&self, key: &OrderKey, kind: DocumentKind) -> Result<Option<String>, StoreError> {
        Ok(self
            .documents
            .read()?
            .get(&(key.clone(), kind))
            .cloned())
    }

    fn write(&self, key: &OrderKey, kind: DocumentKind, text: String) -> Result<(), StoreError> {
        self.documents.write()?.insert((key.clone(), kind), text);

        Ok(())
    }

    fn write_all(
        &self,
        key: &OrderKey,
        documents: Vec<(DocumentKind, String)>,
    ) -> Result<(), StoreError> {
        let mut stored = self.documents.write()?;

        for (kind, text) in documents {
            stored.insert((key.clone(), kind), text);
        }

        Ok(())
    }

    fn contains(&self, key: &OrderKey) -> Result<bool, StoreError> {
        Ok(self
            .documents
            .read()?
            .keys()
            .any(|(stored_key, _kind)| stored_key == key))
    }
}
