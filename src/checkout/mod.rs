//! Checkout

use std::{fmt, sync::Arc};

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::info;

use crate::{
    alterations::{AlterationError, AlterationPipeline, AlterationProcessor, AlterationSummary},
    cart::{Cart, ProductId},
    coupons::{
        CouponAlterationProcessor, CouponApplicationService, CouponCriteria, CouponError,
        CouponOutcome, CouponRepository,
    },
    criteria::{CriteriaEngine, CriteriaError, CriterionRegistry},
    orders::{
        Address, Charge, EventCategory, OrderDraft, OrderError, OrderItem, OrderKey,
        OrderSnapshot, OrderStore,
    },
    pricing::round_money,
    scope::OperationScope,
    shipping::{ShippingMethodId, ShippingMethodRepository, ShippingOption, available_options},
    storage::StoreError,
    taxes::{ProductQuantity, Tax, TaxAmount, TaxService},
};

/// Errors raised by checkout operations.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The chosen shipping method does not apply to the cart.
    #[error("shipping method {0} is not available for this cart")]
    ShippingUnavailable(ShippingMethodId),

    /// Criteria configuration or evaluation failed.
    #[error(transparent)]
    Criteria(#[from] CriteriaError),

    /// Coupon application failed.
    #[error(transparent)]
    Coupon(#[from] CouponError),

    /// An alteration processor failed.
    #[error(transparent)]
    Alteration(#[from] AlterationError),

    /// The order snapshot could not be built.
    #[error(transparent)]
    Order(#[from] OrderError),

    /// Backing storage failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Alteration effects on one cart line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineTotals {
    /// Product on the line
    pub product_id: ProductId,

    /// Line total before alterations
    pub total: Decimal,

    /// Line level alteration effects
    pub alterations: AlterationSummary,
}

impl LineTotals {
    /// Net line adjustment, rounded.
    pub fn discount(&self) -> Decimal {
        round_money(self.alterations.total())
    }
}

/// Computed totals for a cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutTotals {
    /// Sum of line totals
    pub subtotal: Decimal,

    /// Cart level alteration effects
    pub alterations: AlterationSummary,

    /// Line level alteration effects, in cart line order
    pub lines: Vec<LineTotals>,

    /// Net alteration adjustment, rounded
    pub discount: Decimal,

    /// Subtotal after alterations, never negative
    pub discounted_subtotal: Decimal,

    /// Shipping price
    pub shipping: Decimal,

    /// Shipping choice, confirmed against the current cart
    pub shipping_option: Option<ShippingOption>,

    /// Tax charged, if any
    pub tax: Option<TaxAmount>,

    /// Amount due
    pub total: Decimal,
}

impl CheckoutTotals {
    /// Tax amount, zero when no tax applies.
    pub fn tax_amount(&self) -> Decimal {
        self.tax.as_ref().map_or(Decimal::ZERO, |tax| tax.amount)
    }
}

/// Customer and payment details recorded on an order.
#[derive(Debug, Clone, Default)]
pub struct OrderDetails {
    /// Payment charge
    pub charge: Option<Charge>,

    /// Shipping address
    pub shipping_address: Option<Address>,

    /// Billing address
    pub billing_address: Option<Address>,

    /// Email
    pub email: String,

    /// Phone
    pub phone: String,

    /// Delivery instructions
    pub instructions: String,

    /// Purchase order reference
    pub purchase_order: String,
}

/// The pricing pipeline wired to its repositories.
pub struct Checkout {
    engine: CriteriaEngine,
    shipping_methods: Arc<dyn ShippingMethodRepository>,
    coupons: Arc<dyn CouponRepository>,
    orders: Arc<dyn OrderStore>,
    taxes: Vec<Tax>,
    tax_service: TaxService,
    pipeline: AlterationPipeline,
    coupon_service: CouponApplicationService,
}

impl fmt::Debug for Checkout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Checkout")
            .field("engine", &self.engine)
            .field("taxes", &self.taxes)
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}

impl Checkout {
    /// Wire a checkout with the built-in coupon criteria, tax helpers and coupon processor.
    ///
    /// Every stored shipping criterion is resolved against the registry here, so a criterion
    /// type with no implementation is reported before any cart is priced.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::Criteria`] for an unregistered criterion type or undecodable
    /// state, or a storage error.
    pub fn new(
        registry: CriterionRegistry,
        shipping_methods: Arc<dyn ShippingMethodRepository>,
        coupons: Arc<dyn CouponRepository>,
        orders: Arc<dyn OrderStore>,
        taxes: Vec<Tax>,
    ) -> Result<Self, CheckoutError> {
        let engine = CriteriaEngine::new(registry);

        for method in shipping_methods.list()? {
            engine.validate(method.criteria())?;
        }

        let coupon_criteria = Arc::new(CouponCriteria::with_builtin());

        let mut pipeline = AlterationPipeline::new();
        pipeline.register(Box::new(CouponAlterationProcessor::new(Arc::clone(
            &coupon_criteria,
        ))))?;

        Ok(Checkout {
            engine,
            shipping_methods,
            coupons,
            orders,
            taxes,
            tax_service: TaxService::with_builtin(),
            pipeline,
            coupon_service: CouponApplicationService::new(coupon_criteria),
        })
    }

    /// Register an additional alteration processor.
    ///
    /// # Errors
    ///
    /// Returns [`AlterationError::DuplicateProcessor`] if its type is taken.
    pub fn with_processor(
        mut self,
        processor: Box<dyn AlterationProcessor>,
    ) -> Result<Self, CheckoutError> {
        self.pipeline.register(processor)?;

        Ok(self)
    }

    /// Start a checkout operation. Drop the scope when the operation ends.
    pub fn begin(&self) -> OperationScope<'_> {
        OperationScope::new(self.coupons.as_ref())
    }

    /// The criteria engine
    pub fn engine(&self) -> &CriteriaEngine {
        &self.engine
    }

    /// The alteration pipeline
    pub fn pipeline(&self) -> &AlterationPipeline {
        &self.pipeline
    }

    /// Apply a coupon code to the cart.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::Coupon`] if storage or criteria evaluation fails.
    pub fn apply_coupon(
        &self,
        cart: &mut Cart,
        code: &str,
        scope: &OperationScope<'_>,
    ) -> Result<CouponOutcome, CheckoutError> {
        Ok(self.coupon_service.apply_coupon(cart, code, scope)?)
    }

    /// Remove a coupon from the cart, returning whether it was present.
    pub fn remove_coupon(&self, cart: &mut Cart, code: &str) -> bool {
        self.coupon_service.remove_coupon(cart, code)
    }

    /// Shipping options the cart qualifies for.
    ///
    /// # Errors
    ///
    /// Returns a criteria or storage error.
    pub fn shipping_options(&self, cart: &Cart) -> Result<Vec<ShippingOption>, CheckoutError> {
        let methods = self.shipping_methods.list()?;

        Ok(available_options(&self.engine, &methods, cart)?)
    }

    /// Choose a shipping method for the cart.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::ShippingUnavailable`] if the method does not apply to the cart.
    pub fn select_shipping(
        &self,
        cart: &mut Cart,
        method_id: ShippingMethodId,
    ) -> Result<ShippingOption, CheckoutError> {
        let option = self
            .shipping_options(cart)?
            .into_iter()
            .find(|option| option.method_id == method_id)
            .ok_or(CheckoutError::ShippingUnavailable(method_id))?;

        cart.set_shipping_option(Some(option.clone()));

        Ok(option)
    }

    /// The cart's shipping choice, if its method still applies to the cart as it is now.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::ShippingUnavailable`] if the cart changed so that the chosen
    /// method's criteria now reject it, or a criteria or storage error.
    pub fn confirm_shipping(&self, cart: &Cart) -> Result<Option<ShippingOption>, CheckoutError> {
        let Some(selected) = cart.shipping_option() else {
            return Ok(None);
        };

        if self
            .shipping_options(cart)?
            .iter()
            .any(|option| option.method_id == selected.method_id)
        {
            Ok(Some(selected.clone()))
        } else {
            Err(CheckoutError::ShippingUnavailable(selected.method_id))
        }
    }

    /// Price the cart: alterations, then shipping, then tax on the discounted subtotal.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::ShippingUnavailable`] if the chosen shipping method no longer
    /// applies, or an alteration error if a processor fails.
    #[tracing::instrument(name = "checkout.totals", skip_all, err)]
    pub fn totals(
        &self,
        cart: &Cart,
        scope: &OperationScope<'_>,
    ) -> Result<CheckoutTotals, CheckoutError> {
        let subtotal = cart.subtotal();
        let shipping_option = self.confirm_shipping(cart)?;
        let alterations = self.pipeline.summarize(cart, scope)?;
        let lines = cart
            .lines()
            .iter()
            .map(|line| {
                Ok::<_, AlterationError>(LineTotals {
                    product_id: line.product().id,
                    total: line.total(),
                    alterations: self.pipeline.summarize_line(cart, line, scope)?,
                })
            })
            .collect::<Result<Vec<_>, AlterationError>>()?;
        let discount = round_money(alterations.total());
        let discounted_subtotal = (subtotal + discount).max(Decimal::ZERO);
        let shipping = shipping_option
            .as_ref()
            .map_or(Decimal::ZERO, |option| option.price);

        let context = TaxService::create_context(
            cart.lines().iter().map(ProductQuantity::from).collect(),
            discounted_subtotal,
            shipping,
            cart.destination().country.clone(),
            cart.destination().postal_code.clone(),
        );
        let tax = self.tax_service.cart_taxes(&self.taxes, &context);
        let tax_amount = tax.as_ref().map_or(Decimal::ZERO, |tax| tax.amount);

        Ok(CheckoutTotals {
            subtotal,
            alterations,
            lines,
            discount,
            discounted_subtotal,
            shipping,
            shipping_option,
            tax,
            total: discounted_subtotal + shipping + tax_amount,
        })
    }

    /// Freeze the cart into a new order and log its creation.
    ///
    /// # Errors
    ///
    /// Returns an error if pricing fails, including a shipping choice the cart no longer
    /// qualifies for, or if the snapshot cannot be built.
    #[tracing::instrument(name = "checkout.place_order", skip_all, fields(order = %key), err)]
    pub fn place_order(
        &self,
        key: OrderKey,
        cart: &Cart,
        scope: &OperationScope<'_>,
        details: OrderDetails,
    ) -> Result<OrderSnapshot, CheckoutError> {
        let totals = self.totals(cart, scope)?;

        let draft = OrderDraft {
            charge: details.charge,
            items: cart.lines().iter().map(OrderItem::from).collect(),
            subtotal: totals.subtotal,
            total: totals.total,
            amount_paid: None,
            tax: totals.tax,
            shipping: totals.shipping_option,
            shipping_address: details.shipping_address,
            billing_address: details.billing_address,
            email: details.email,
            phone: details.phone,
            instructions: details.instructions,
            currency_code: cart.currency().iso_alpha_code.to_string(),
            purchase_order: details.purchase_order,
            additional_elements: self.pipeline.order_elements(cart, scope)?,
        };

        let mut snapshot = OrderSnapshot::build(key, Arc::clone(&self.orders), draft)?;
        snapshot.log_activity(EventCategory::Event, "Order created")?;

        info!(total = %totals.total, "placed order");

        Ok(snapshot)
    }
}
