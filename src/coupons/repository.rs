//! Coupon repository

use std::{collections::BTreeMap, sync::RwLock};

#[cfg(test)]
use mockall::automock;
use thiserror::Error;

use crate::{
    coupons::{Coupon, CouponId, NewCoupon},
    storage::StoreError,
};

/// Errors raised by coupon administration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CouponRepositoryError {
    /// No coupon has the given id.
    #[error("coupon {0} not found")]
    NotFound(CouponId),

    /// Another coupon already uses the code.
    #[error("coupon code '{0}' is already in use")]
    DuplicateCode(String),

    /// Backing storage failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Storage of coupons.
#[cfg_attr(test, automock)]
pub trait CouponRepository: Send + Sync {
    /// Fetch a coupon by id.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if storage fails.
    fn get(&self, id: CouponId) -> Result<Option<Coupon>, StoreError>;

    /// Fetch a coupon by code, ignoring case. With `published_only`, unpublished coupons are
    /// treated as missing.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if storage fails.
    fn get_by_code(&self, code: &str, published_only: bool) -> Result<Option<Coupon>, StoreError>;

    /// Every coupon, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if storage fails.
    fn list(&self) -> Result<Vec<Coupon>, StoreError>;

    /// Create a coupon.
    ///
    /// # Errors
    ///
    /// Returns [`CouponRepositoryError::DuplicateCode`] if the code is taken.
    fn create(&self, coupon: NewCoupon) -> Result<Coupon, CouponRepositoryError>;

    /// Replace a coupon's fields.
    ///
    /// # Errors
    ///
    /// Returns [`CouponRepositoryError::NotFound`] or [`CouponRepositoryError::DuplicateCode`].
    fn update(&self, id: CouponId, coupon: NewCoupon) -> Result<Coupon, CouponRepositoryError>;

    /// Delete a coupon.
    ///
    /// # Errors
    ///
    /// Returns [`CouponRepositoryError::NotFound`] if no coupon has the id.
    fn delete(&self, id: CouponId) -> Result<(), CouponRepositoryError>;
}

#[derive(Debug, Default)]
struct CouponTable {
    last_id: u32,
    rows: BTreeMap<CouponId, Coupon>,
}

impl CouponTable {
    fn code_taken(&self, code: &str, except: Option<CouponId>) -> bool {
        self.rows
            .values()
            .any(|coupon| Some(coupon.id) != except && coupon.has_code(code))
    }
}

/// In-memory coupon repository.
#[derive(Debug, Default)]
pub struct MemoryCouponRepository {
    table: RwLock<CouponTable>,
}

impl MemoryCouponRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }
}

impl CouponRepository for MemoryCouponRepository {
    fn get(&self, id: CouponId) -> Result<Option<Coupon>, StoreError> {
        Ok(self.table.read()?.rows.get(&id).cloned())
    }

    fn get_by_code(&self, code: &str, published_only: bool) -> Result<Option<Coupon>, StoreError> {
        let table = self.table.read()?;

        Ok(table
            .rows
            .values()
            .find(|coupon| coupon.has_code(code) && (coupon.published || !published_only))
            .cloned())
    }

    fn list(&self) -> Result<Vec<Coupon>, StoreError> {
        Ok(self.table.read()?.rows.values().cloned().collect())
    }

    fn create(&self, coupon: NewCoupon) -> Result<Coupon, CouponRepositoryError> {
        let mut table = self.table.write().map_err(StoreError::from)?;

        if table.code_taken(&coupon.code, None) {
            return Err(CouponRepositoryError::DuplicateCode(coupon.code));
        }

        table.last_id = table.last_id.saturating_add(1);
        let coupon = coupon.into_coupon(CouponId(table.last_id));
        table.rows.insert(coupon.id, coupon.clone());

        Ok(coupon)
    }

    fn update(&self, id: CouponId, coupon: NewCoupon) -> Result<Coupon, CouponRepositoryError> {
        let mut table = self.table.write().map_err(StoreError::from)?;

        if !table.rows.contains_key(&id) {
            return Err(CouponRepositoryError::NotFound(id));
        }

        if table.code_taken(&coupon.code, Some(id)) {
            return Err(CouponRepositoryError::DuplicateCode(coupon.code));
        }

        let coupon = coupon.into_coupon(id);
        table.rows.insert(id, coupon.clone());

        Ok(coupon)
    }

    fn delete(&self, id: CouponId) -> Result<(), CouponRepositoryError> {
        let mut table = self.table.write().map_err(StoreError::from)?;

        table
            .rows
            .remove(&id)
            .map(|_coupon| ())
            .ok_or(CouponRepositoryError::NotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use testresult::TestResult;

    use super::*;

    #[test]
    fn create_assigns_sequential_ids() -> TestResult {
        let repository = MemoryCouponRepository::new();

        let first = repository.create(NewCoupon::percent("ONE", Decimal::TEN))?;
        let second = repository.create(NewCoupon::percent("TWO", Decimal::TEN))?;

        assert_eq!(first.id, CouponId(1));
        assert_eq!(second.id, CouponId(2));
        assert_eq!(repository.list()?.len(), 2);

        Ok(())
    }

    #[test]
    fn codes_are_unique_ignoring_case() -> TestResult {
        let repository = MemoryCouponRepository::new();
        repository.create(NewCoupon::percent("SAVE10", Decimal::TEN))?;

        let result = repository.create(NewCoupon::percent("save10", Decimal::ONE));

        assert_eq!(
            result,
            Err(CouponRepositoryError::DuplicateCode("save10".to_string()))
        );

        Ok(())
    }

    #[test]
    fn get_by_code_honours_published_only() -> TestResult {
        let repository = MemoryCouponRepository::new();
        repository.create(NewCoupon::percent("XMAS", Decimal::TEN).published(false))?;

        assert!(repository.get_by_code("xmas", true)?.is_none());
        assert!(repository.get_by_code("xmas", false)?.is_some());

        Ok(())
    }

    #[test]
    fn update_replaces_fields_and_keeps_id() -> TestResult {
        let repository = MemoryCouponRepository::new();
        let created = repository.create(NewCoupon::percent("SAVE10", Decimal::TEN))?;

        let updated = repository.update(
            created.id,
            NewCoupon::percent("SAVE10", Decimal::new(15, 0)).named("Fifteen"),
        )?;

        assert_eq!(updated.id, created.id);
        assert_eq!(repository.get(created.id)?, Some(updated));

        Ok(())
    }

    #[test]
    fn update_rejects_code_used_by_another_coupon() -> TestResult {
        let repository = MemoryCouponRepository::new();
        repository.create(NewCoupon::percent("ONE", Decimal::TEN))?;
        let two = repository.create(NewCoupon::percent("TWO", Decimal::TEN))?;

        let result = repository.update(two.id, NewCoupon::percent("one", Decimal::TEN));

        assert!(matches!(result, Err(CouponRepositoryError::DuplicateCode(_))));

        Ok(())
    }

    #[test]
    fn delete_missing_coupon_is_not_found() -> TestResult {
        let repository = MemoryCouponRepository::new();
        let created = repository.create(NewCoupon::percent("ONE", Decimal::TEN))?;

        repository.delete(created.id)?;

        assert_eq!(
            repository.delete(created.id),
            Err(CouponRepositoryError::NotFound(created.id))
        );
        assert!(repository.get(created.id)?.is_none());

        Ok(())
    }
}
