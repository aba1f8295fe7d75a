//! Criteria engine

use std::sync::Arc;

use smallvec::SmallVec;
use tracing::debug;

use crate::{
    criteria::{
        ApplicabilityContext, ApplicabilityCriterion, Criterion, CriteriaError, CriterionContext,
        CriterionId, CriterionRegistry,
    },
    shipping::{ShippingMethodId, ShippingMethodRepository},
};

/// One criterion's contribution to an evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    /// Criterion record id
    pub criterion_id: CriterionId,

    /// Criterion type tag
    pub criterion_type: String,

    /// Whether this criterion let the method through
    pub passed: bool,
}

/// Outcome of running a criteria chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    /// True only if no criterion vetoed
    pub applicable: bool,

    /// Every criterion's verdict, in evaluation order
    pub verdicts: SmallVec<[Verdict; 4]>,
}

impl Evaluation {
    /// Verdicts of the criteria that vetoed.
    pub fn vetoes(&self) -> impl Iterator<Item = &Verdict> {
        self.verdicts.iter().filter(|verdict| !verdict.passed)
    }
}

/// Runs criteria chains against a registry of implementations.
#[derive(Debug, Clone)]
pub struct CriteriaEngine {
    registry: CriterionRegistry,
}

impl CriteriaEngine {
    /// Create an engine over a registry.
    pub fn new(registry: CriterionRegistry) -> Self {
        CriteriaEngine { registry }
    }

    /// The registry
    pub fn registry(&self) -> &CriterionRegistry {
        &self.registry
    }

    fn resolve(&self, criterion: &ApplicabilityCriterion) -> Result<&Arc<dyn Criterion>, CriteriaError> {
        self.registry
            .get(&criterion.criterion_type)
            .ok_or_else(|| CriteriaError::UnknownCriterion {
                criterion_type: criterion.criterion_type.clone(),
                criterion_id: criterion.id,
            })
    }

    /// Check that every record resolves to an implementation and its state decodes.
    ///
    /// # Errors
    ///
    /// Returns [`CriteriaError::UnknownCriterion`] or [`CriteriaError::InvalidState`] for the
    /// first record that fails.
    pub fn validate(&self, criteria: &[ApplicabilityCriterion]) -> Result<(), CriteriaError> {
        criteria.iter().try_for_each(|criterion| {
            self.resolve(criterion)?.validate(&criterion.state)
        })
    }

    /// Run every criterion in position order. A veto never stops the chain, so every verdict is
    /// recorded.
    ///
    /// Every record is resolved before any runs, so an unknown type fails the whole evaluation.
    ///
    /// # Errors
    ///
    /// Returns [`CriteriaError::UnknownCriterion`] for an unregistered type tag and
    /// [`CriteriaError::InvalidState`] for an undecodable state.
    pub fn evaluate(
        &self,
        criteria: &[ApplicabilityCriterion],
        context: &ApplicabilityContext<'_>,
    ) -> Result<Evaluation, CriteriaError> {
        let mut chain = criteria
            .iter()
            .map(|criterion| Ok((criterion, self.resolve(criterion)?)))
            .collect::<Result<SmallVec<[_; 4]>, CriteriaError>>()?;

        chain.sort_by_key(|(criterion, _implementation)| (criterion.position, criterion.id));

        let mut applicable = true;
        let mut verdicts = SmallVec::new();

        for (criterion, implementation) in chain {
            let mut criterion_context = CriterionContext::new(context, applicable);
            implementation.evaluate(&criterion.state, &mut criterion_context)?;

            let passed = !criterion_context.vetoed();
            applicable = applicable && criterion_context.is_applicable();

            debug!(
                criterion_id = %criterion.id,
                criterion_type = %criterion.criterion_type,
                passed,
                "evaluated criterion"
            );

            verdicts.push(Verdict {
                criterion_id: criterion.id,
                criterion_type: criterion.criterion_type.clone(),
                passed,
            });
        }

        Ok(Evaluation {
            applicable,
            verdicts,
        })
    }

    /// Whether a stored shipping method is usable in this context.
    ///
    /// # Errors
    ///
    /// Returns [`CriteriaError::MethodNotFound`] for an unknown method, a storage error, or any
    /// evaluation error.
    pub fn test_criteria(
        &self,
        method_id: ShippingMethodId,
        methods: &dyn ShippingMethodRepository,
        context: &ApplicabilityContext<'_>,
    ) -> Result<bool, CriteriaError> {
        let method = methods
            .get(method_id)?
            .ok_or(CriteriaError::MethodNotFound(method_id))?;

        Ok(self.evaluate(method.criteria(), context)?.applicable)
    }

    /// Describe a stored criterion using its implementation.
    ///
    /// # Errors
    ///
    /// Returns [`CriteriaError::UnknownCriterion`] or [`CriteriaError::InvalidState`].
    pub fn describe(&self, criterion: &ApplicabilityCriterion) -> Result<String, CriteriaError> {
        self.resolve(criterion)?.describe(&criterion.state)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use rusty_money::iso;
    use testresult::TestResult;

    use crate::{
        cart::{Cart, CartLine, Destination, Product},
        shipping::{MemoryShippingMethodRepository, ShippingMethod},
    };

    use super::*;

    fn engine() -> TestResult<CriteriaEngine> {
        Ok(CriteriaEngine::new(CriterionRegistry::with_builtin()?))
    }

    fn cart() -> TestResult<Cart> {
        let mut cart = Cart::new(iso::USD).with_destination(Destination::new("CA", "K1A 0B1"));
        cart.add_line(CartLine::new(
            Product::new(1, "Widget", Decimal::new(6000, 2)),
            1,
        )?);

        Ok(cart)
    }

    fn country_us(position: i32) -> ApplicabilityCriterion {
        ApplicabilityCriterion::new(1, "DestinationCountry", r#"{"include": ["US"]}"#, position)
    }

    fn minimum_50(position: i32) -> ApplicabilityCriterion {
        ApplicabilityCriterion::new(2, "MinimumSubtotal", r#"{"amount": "50.00"}"#, position)
    }

    #[test]
    fn one_veto_makes_method_inapplicable_in_any_order() -> TestResult {
        let engine = engine()?;
        let cart = cart()?;
        let context = ApplicabilityContext::for_cart(&cart, &[]);

        let forward = engine.evaluate(&[country_us(0), minimum_50(1)], &context)?;
        let reversed = engine.evaluate(&[country_us(1), minimum_50(0)], &context)?;

        assert!(!forward.applicable);
        assert!(!reversed.applicable);
        assert_eq!(forward.verdicts.len(), 2);
        assert_eq!(reversed.vetoes().count(), 1);

        Ok(())
    }

    #[test]
    fn criteria_run_in_position_order() -> TestResult {
        let engine = engine()?;
        let cart = cart()?;
        let context = ApplicabilityContext::for_cart(&cart, &[]);

        let evaluation = engine.evaluate(&[country_us(5), minimum_50(-1)], &context)?;
        let order: Vec<CriterionId> = evaluation
            .verdicts
            .iter()
            .map(|verdict| verdict.criterion_id)
            .collect();

        assert_eq!(order, [CriterionId(2), CriterionId(1)]);

        Ok(())
    }

    #[test]
    fn empty_chain_is_applicable() -> TestResult {
        let engine = engine()?;
        let cart = cart()?;
        let context = ApplicabilityContext::for_cart(&cart, &[]);

        assert!(engine.evaluate(&[], &context)?.applicable);

        Ok(())
    }

    #[test]
    fn unknown_type_fails_before_anything_runs() -> TestResult {
        let engine = engine()?;
        let cart = cart()?;
        let context = ApplicabilityContext::for_cart(&cart, &[]);
        let criteria = [
            minimum_50(0),
            ApplicabilityCriterion::new(9, "Weight", "{}", 1),
        ];

        let result = engine.evaluate(&criteria, &context);

        assert!(matches!(
            result,
            Err(CriteriaError::UnknownCriterion { criterion_id: CriterionId(9), .. })
        ));
        assert!(engine.validate(&criteria).is_err());

        Ok(())
    }

    #[test]
    fn test_criteria_looks_up_stored_method() -> TestResult {
        let engine = engine()?;
        let cart = cart()?;
        let context = ApplicabilityContext::for_cart(&cart, &[]);

        let methods = MemoryShippingMethodRepository::new();
        let method = methods.insert(
            ShippingMethod::new("Ground", Decimal::new(500, 2)).with_criterion(minimum_50(0)),
        )?;

        assert!(engine.test_criteria(method, &methods, &context)?);
        assert!(matches!(
            engine.test_criteria(ShippingMethodId(99), &methods, &context),
            Err(CriteriaError::MethodNotFound(ShippingMethodId(99)))
        ));

        Ok(())
    }
}
