//! Per-operation coupon lookup cache

use std::{cell::RefCell, fmt};

use rustc_hash::FxHashMap;

use crate::{
    coupons::{Coupon, CouponRepository},
    storage::StoreError,
};

/// Looks coupons up by code, asking storage at most once per code.
///
/// Misses are cached too. The cache belongs to one [`OperationScope`](crate::scope::OperationScope)
/// and dies with it, so admin edits made between operations are always observed.
pub struct CouponLookup<'a> {
    repository: &'a dyn CouponRepository,
    cache: RefCell<FxHashMap<String, Option<Coupon>>>,
}

impl<'a> CouponLookup<'a> {
    /// Create an empty lookup over a repository.
    pub fn new(repository: &'a dyn CouponRepository) -> Self {
        CouponLookup {
            repository,
            cache: RefCell::new(FxHashMap::default()),
        }
    }

    /// Find a coupon by code, ignoring case, published or not.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the repository fails. Failures are not cached.
    pub fn by_code(&self, code: &str) -> Result<Option<Coupon>, StoreError> {
        let key = code.trim().to_ascii_lowercase();

        if let Some(cached) = self.cache.borrow().get(&key) {
            return Ok(cached.clone());
        }

        let coupon = self.repository.get_by_code(&key, false)?;
        self.cache.borrow_mut().insert(key, coupon.clone());

        Ok(coupon)
    }

    /// The underlying repository.
    pub fn repository(&self) -> &'a dyn CouponRepository {
        self.repository
    }

    /// Number of codes looked up so far.
    pub fn cached_codes(&self) -> usize {
        self.cache.borrow().len()
    }
}

impl fmt::Debug for CouponLookup<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CouponLookup")
            .field("cached_codes", &self.cached_codes())
            .finish_non_exhaustive()
    }
}
