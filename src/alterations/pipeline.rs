//! Alteration pipeline

use rust_decimal::Decimal;
use rustc_hash::FxHashMap;
use slotmap::{SlotMap, new_key_type};
use smallvec::SmallVec;
use tracing::{debug, info, warn};

use crate::{
    alterations::{AlterationError, AlterationProcessor, PriceAlteration},
    cart::{Cart, CartLine},
    orders::AdditionalElement,
    scope::OperationScope,
};

new_key_type! {
    /// Processor Key
    pub struct ProcessorKey;
}

/// One alteration's resolved effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedAlteration {
    /// The alteration on the cart
    pub alteration: PriceAlteration,

    /// Label from the owning processor
    pub label: Option<String>,

    /// Monetary adjustment (negative for discounts)
    pub amount: Decimal,
}

/// Resolved effects of every alteration on a cart or line, in cart order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlterationSummary {
    /// Alterations a processor claimed
    pub entries: Vec<AppliedAlteration>,

    /// Alterations of a type no registered processor owns; they contribute nothing
    pub unclaimed: Vec<PriceAlteration>,

    /// Alterations whose processor is registered but reports them as not applicable to the
    /// cart; they contribute nothing
    pub inapplicable: Vec<PriceAlteration>,
}

impl AlterationSummary {
    /// Net adjustment. Amounts are summed, never compounded.
    pub fn total(&self) -> Decimal {
        self.entries.iter().map(|entry| entry.amount).sum()
    }
}

/// Registry of alteration processors, dispatching each alteration to the processor that owns it.
#[derive(Debug, Default)]
pub struct AlterationPipeline {
    processors: SlotMap<ProcessorKey, Box<dyn AlterationProcessor>>,
    types: FxHashMap<String, ProcessorKey>,
}

impl AlterationPipeline {
    /// Create an empty pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a processor for its alteration type.
    ///
    /// # Errors
    ///
    /// Returns [`AlterationError::DuplicateProcessor`] if the type already has a processor.
    pub fn register(
        &mut self,
        processor: Box<dyn AlterationProcessor>,
    ) -> Result<ProcessorKey, AlterationError> {
        let alteration_type = processor.alteration_type().to_ascii_lowercase();

        if self.types.contains_key(&alteration_type) {
            return Err(AlterationError::DuplicateProcessor(
                processor.alteration_type().to_string(),
            ));
        }

        let key = self.processors.insert(processor);
        self.types.insert(alteration_type, key);

        Ok(key)
    }

    /// The processor registered for an alteration type.
    pub fn processor(&self, alteration_type: &str) -> Option<&dyn AlterationProcessor> {
        let key = self.types.get(&alteration_type.to_ascii_lowercase())?;

        self.processors.get(*key).map(AsRef::as_ref)
    }

    /// Number of registered processors.
    pub fn len(&self) -> usize {
        self.processors.len()
    }

    /// Whether no processors are registered.
    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }

    /// Resolve every cart alteration at cart level.
    ///
    /// # Errors
    ///
    /// Propagates any [`AlterationError`] raised by a processor.
    pub fn summarize(
        &self,
        cart: &Cart,
        scope: &OperationScope<'_>,
    ) -> Result<AlterationSummary, AlterationError> {
        self.resolve(cart, scope, |processor, alteration| {
            Ok((
                processor.cart_amount(alteration, cart, scope)?,
                processor.cart_label(alteration, cart, scope)?,
            ))
        })
    }

    /// Resolve every cart alteration against a single line.
    ///
    /// # Errors
    ///
    /// Propagates any [`AlterationError`] raised by a processor.
    pub fn summarize_line(
        &self,
        cart: &Cart,
        line: &CartLine,
        scope: &OperationScope<'_>,
    ) -> Result<AlterationSummary, AlterationError> {
        self.resolve(cart, scope, |processor, alteration| {
            Ok((
                processor.line_amount(alteration, cart, line, scope)?,
                processor.line_label(alteration, cart, line, scope)?,
            ))
        })
    }

    /// Net cart level adjustment.
    ///
    /// # Errors
    ///
    /// Propagates any [`AlterationError`] raised by a processor.
    pub fn cart_adjustment(
        &self,
        cart: &Cart,
        scope: &OperationScope<'_>,
    ) -> Result<Decimal, AlterationError> {
        Ok(self.summarize(cart, scope)?.total())
    }

    /// Net adjustment for one line.
    ///
    /// # Errors
    ///
    /// Propagates any [`AlterationError`] raised by a processor.
    pub fn line_adjustment(
        &self,
        cart: &Cart,
        line: &CartLine,
        scope: &OperationScope<'_>,
    ) -> Result<Decimal, AlterationError> {
        Ok(self.summarize_line(cart, line, scope)?.total())
    }

    /// Elements the claiming processors contribute to an order snapshot.
    ///
    /// # Errors
    ///
    /// Propagates any [`AlterationError`] raised by a processor.
    pub fn order_elements(
        &self,
        cart: &Cart,
        scope: &OperationScope<'_>,
    ) -> Result<Vec<AdditionalElement>, AlterationError> {
        let mut elements = Vec::new();

        for alteration in cart.alterations() {
            for processor in self.claimants(alteration, cart, scope)? {
                if let Some(element) = processor.order_element(alteration, cart, scope)? {
                    elements.push(element);
                }
            }
        }

        Ok(elements)
    }

    fn resolve<F>(
        &self,
        cart: &Cart,
        scope: &OperationScope<'_>,
        mut amount_and_label: F,
    ) -> Result<AlterationSummary, AlterationError>
    where
        F: FnMut(
            &dyn AlterationProcessor,
            &PriceAlteration,
        ) -> Result<(Decimal, Option<String>), AlterationError>,
    {
        let mut summary = AlterationSummary::default();

        for alteration in cart.alterations() {
            let claimants = self.claimants(alteration, cart, scope)?;

            if claimants.is_empty() {
                if self.processor(&alteration.alteration_type).is_some() {
                    info!(
                        alteration = %alteration,
                        "alteration does not apply to the cart; it has no effect"
                    );

                    summary.inapplicable.push(alteration.clone());
                } else {
                    warn!(
                        alteration = %alteration,
                        "no processor registered for alteration type; it has no effect"
                    );

                    summary.unclaimed.push(alteration.clone());
                }

                continue;
            }

            for processor in claimants {
                let (amount, label) = amount_and_label(processor, alteration)?;

                debug!(alteration = %alteration, %amount, "resolved alteration");

                summary.entries.push(AppliedAlteration {
                    alteration: alteration.clone(),
                    label,
                    amount,
                });
            }
        }

        Ok(summary)
    }

    fn claimants<'p>(
        &'p self,
        alteration: &PriceAlteration,
        cart: &Cart,
        scope: &OperationScope<'_>,
    ) -> Result<SmallVec<[&'p dyn AlterationProcessor; 1]>, AlterationError> {
        let mut claimants = SmallVec::new();

        for processor in self.processors.values() {
            if processor.can_process(alteration, cart, scope)? {
                claimants.push(processor.as_ref());
            }
        }

        Ok(claimants)
    }
}

#[cfg(test)]
mod tests {
    use rusty_money::iso;
    use serde_json::json;
    use testresult::TestResult;

    use crate::{cart::Product, coupons::MemoryCouponRepository};

    use super::*;

    /// Applies a fixed amount per alteration of its type.
    #[derive(Debug)]
    struct FixedProcessor {
        alteration_type: &'static str,
        applies: bool,
        cart_amount: Decimal,
        line_amount: Decimal,
    }

    impl AlterationProcessor for FixedProcessor {
        fn alteration_type(&self) -> &str {
            self.alteration_type
        }

        fn can_process(
            &self,
            alteration: &PriceAlteration,
            _cart: &Cart,
            _scope: &OperationScope<'_>,
        ) -> Result<bool, AlterationError> {
            Ok(self.applies && alteration.alteration_type == self.alteration_type)
        }

        fn cart_amount(
            &self,
            _alteration: &PriceAlteration,
            _cart: &Cart,
            _scope: &OperationScope<'_>,
        ) -> Result<Decimal, AlterationError> {
            Ok(self.cart_amount)
        }

        fn line_amount(
            &self,
            _alteration: &PriceAlteration,
            _cart: &Cart,
            _line: &CartLine,
            _scope: &OperationScope<'_>,
        ) -> Result<Decimal, AlterationError> {
            Ok(self.line_amount)
        }

        fn cart_label(
            &self,
            alteration: &PriceAlteration,
            _cart: &Cart,
            _scope: &OperationScope<'_>,
        ) -> Result<Option<String>, AlterationError> {
            Ok(Some(alteration.key.clone()))
        }

        fn order_element(
            &self,
            alteration: &PriceAlteration,
            _cart: &Cart,
            _scope: &OperationScope<'_>,
        ) -> Result<Option<AdditionalElement>, AlterationError> {
            Ok(Some(AdditionalElement::new(
                "Fixed",
                json!({ "key": alteration.key }),
            )))
        }
    }

    fn fixed(alteration_type: &'static str, cart_amount: i64) -> Box<FixedProcessor> {
        Box::new(FixedProcessor {
            alteration_type,
            applies: true,
            cart_amount: Decimal::new(cart_amount, 2),
            line_amount: Decimal::new(-100, 2),
        })
    }

    fn cart_with(alterations: &[(&str, &str, i32)]) -> TestResult<Cart> {
        let mut cart = Cart::new(iso::USD);
        cart.add_line(CartLine::new(
            Product::new(1, "Widget", Decimal::new(2000, 2)),
            1,
        )?);

        for (alteration_type, key, weight) in alterations {
            cart.add_alteration(PriceAlteration::new(*alteration_type, *key, *weight))?;
        }

        Ok(cart)
    }

    #[test]
    fn duplicate_processor_types_are_rejected() -> TestResult {
        let mut pipeline = AlterationPipeline::new();
        pipeline.register(fixed("Promotion", -100))?;

        let result = pipeline.register(fixed("promotion", -200));

        assert!(matches!(
            result,
            Err(AlterationError::DuplicateProcessor(t)) if t == "promotion"
        ));
        assert_eq!(pipeline.len(), 1);

        Ok(())
    }

    #[test]
    fn amounts_are_summed_in_weight_order() -> TestResult {
        let mut pipeline = AlterationPipeline::new();
        pipeline.register(fixed("Promotion", -150))?;
        pipeline.register(fixed("Loyalty", -50))?;

        let cart = cart_with(&[("Promotion", "P1", 1), ("Loyalty", "L1", 3)])?;
        let repository = MemoryCouponRepository::default();
        let scope = OperationScope::new(&repository);

        let summary = pipeline.summarize(&cart, &scope)?;
        let labels: Vec<Option<&str>> = summary
            .entries
            .iter()
            .map(|entry| entry.label.as_deref())
            .collect();

        assert_eq!(labels, [Some("L1"), Some("P1")]);
        assert_eq!(summary.total(), Decimal::new(-200, 2));
        assert_eq!(pipeline.cart_adjustment(&cart, &scope)?, Decimal::new(-200, 2));

        Ok(())
    }

    #[test]
    fn unclaimed_alterations_are_recorded_with_zero_effect() -> TestResult {
        let mut pipeline = AlterationPipeline::new();
        pipeline.register(fixed("Promotion", -150))?;

        let cart = cart_with(&[("Promotion", "P1", 1), ("GiftCard", "G1", 1)])?;
        let repository = MemoryCouponRepository::default();
        let scope = OperationScope::new(&repository);

        let summary = pipeline.summarize(&cart, &scope)?;

        assert_eq!(summary.entries.len(), 1);
        assert_eq!(
            summary.unclaimed,
            vec![PriceAlteration::new("GiftCard", "G1", 1)]
        );
        assert!(summary.inapplicable.is_empty());
        assert_eq!(summary.total(), Decimal::new(-150, 2));

        Ok(())
    }

    #[test]
    fn inapplicable_alterations_are_kept_apart_from_unclaimed() -> TestResult {
        let mut pipeline = AlterationPipeline::new();
        pipeline.register(Box::new(FixedProcessor {
            alteration_type: "Promotion",
            applies: false,
            cart_amount: Decimal::new(-150, 2),
            line_amount: Decimal::new(-100, 2),
        }))?;

        let cart = cart_with(&[("Promotion", "P1", 1), ("GiftCard", "G1", 1)])?;
        let repository = MemoryCouponRepository::default();
        let scope = OperationScope::new(&repository);

        let summary = pipeline.summarize(&cart, &scope)?;

        assert!(summary.entries.is_empty());
        assert_eq!(
            summary.inapplicable,
            vec![PriceAlteration::new("Promotion", "P1", 1)]
        );
        assert_eq!(
            summary.unclaimed,
            vec![PriceAlteration::new("GiftCard", "G1", 1)]
        );
        assert_eq!(summary.total(), Decimal::ZERO);

        Ok(())
    }

    #[test]
    fn line_adjustment_uses_line_amounts() -> TestResult {
        let mut pipeline = AlterationPipeline::new();
        pipeline.register(fixed("Promotion", -150))?;

        let cart = cart_with(&[("Promotion", "P1", 1), ("Promotion", "P2", 1)])?;
        let repository = MemoryCouponRepository::default();
        let scope = OperationScope::new(&repository);

        let line = cart.lines().first().ok_or("cart has no lines")?;

        assert_eq!(
            pipeline.line_adjustment(&cart, line, &scope)?,
            Decimal::new(-200, 2)
        );

        Ok(())
    }

    #[test]
    fn order_elements_come_from_claiming_processors() -> TestResult {
        let mut pipeline = AlterationPipeline::new();
        pipeline.register(fixed("Promotion", -150))?;

        let cart = cart_with(&[("Promotion", "P1", 1), ("GiftCard", "G1", 1)])?;
        let repository = MemoryCouponRepository::default();
        let scope = OperationScope::new(&repository);

        let elements = pipeline.order_elements(&cart, &scope)?;

        assert_eq!(elements, vec![AdditionalElement::new("Fixed", json!({ "key": "P1" }))]);

        Ok(())
    }

    #[test]
    fn processor_lookup_ignores_case() -> TestResult {
        let mut pipeline = AlterationPipeline::new();
        pipeline.register(fixed("Promotion", -150))?;

        assert!(pipeline.processor("PROMOTION").is_some());
        assert!(pipeline.processor("Coupon").is_none());

        Ok(())
    }
}
