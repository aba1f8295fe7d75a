//! Criterion registry

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::criteria::{
    Criterion, CriteriaError, DestinationCountry, MaximumQuantity, MinimumSubtotal,
    PostalCodePrefix,
};

/// A registered criterion type, for admin listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CriterionDescriptor {
    /// Type tag
    pub criterion_type: String,

    /// Category
    pub category: String,
}

/// Criterion implementations keyed by type tag (ignoring case).
#[derive(Debug, Default, Clone)]
pub struct CriterionRegistry {
    criteria: FxHashMap<String, Arc<dyn Criterion>>,
}

impl CriterionRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in criteria.
    ///
    /// # Errors
    ///
    /// Never fails in practice; registration errors are propagated for uniformity.
    pub fn with_builtin() -> Result<Self, CriteriaError> {
        let mut registry = Self::new();

        registry.register(Arc::new(DestinationCountry))?;
        registry.register(Arc::new(PostalCodePrefix))?;
        registry.register(Arc::new(MinimumSubtotal))?;
        registry.register(Arc::new(MaximumQuantity))?;

        Ok(registry)
    }

    /// Register an implementation under its type tag.
    ///
    /// # Errors
    ///
    /// Returns [`CriteriaError::DuplicateCriterion`] if the tag is taken.
    pub fn register(&mut self, criterion: Arc<dyn Criterion>) -> Result<(), CriteriaError> {
        let key = criterion.criterion_type().to_ascii_lowercase();

        if self.criteria.contains_key(&key) {
            return Err(CriteriaError::DuplicateCriterion(
                criterion.criterion_type().to_string(),
            ));
        }

        self.criteria.insert(key, criterion);

        Ok(())
    }

    /// Resolve a type tag.
    pub fn get(&self, criterion_type: &str) -> Option<&Arc<dyn Criterion>> {
        self.criteria.get(&criterion_type.to_ascii_lowercase())
    }

    /// Every registered type, sorted by category then type.
    pub fn descriptors(&self) -> Vec<CriterionDescriptor> {
        let mut descriptors: Vec<CriterionDescriptor> = self
            .criteria
            .values()
            .map(|criterion| CriterionDescriptor {
                criterion_type: criterion.criterion_type().to_string(),
                category: criterion.category().to_string(),
            })
            .collect();

        descriptors.sort_by(|a, b| {
            a.category
                .cmp(&b.category)
                .then_with(|| a.criterion_type.cmp(&b.criterion_type))
        });

        descriptors
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.criteria.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }
}
