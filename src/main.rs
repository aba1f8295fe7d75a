//! Tally command line entry point

use std::{
    io::{self, Write},
    process::ExitCode,
    sync::Arc,
};

use thiserror::Error;
use tracing::{error, info};

use tally::{
    checkout::{Checkout, CheckoutError, OrderDetails},
    config::CliConfig,
    criteria::{CriteriaError, CriterionRegistry},
    fixtures::{Fixture, FixtureError},
    observability::init_subscriber,
    orders::{MemoryOrderStore, OrderError, OrderKey},
    receipt::{Receipt, ReceiptError},
    shipping::ShippingMethodId,
};

#[derive(Debug, Error)]
enum AppError {
    #[error(transparent)]
    Fixture(#[from] FixtureError),

    #[error(transparent)]
    Criteria(#[from] CriteriaError),

    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Receipt(#[from] ReceiptError),

    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),

    #[error("failed to encode order: {0}")]
    Json(#[from] serde_json::Error),
}

fn run(config: &CliConfig) -> Result<(), AppError> {
    let args = &config.checkout;
    let fixture = Fixture::from_set(args.fixtures.clone(), &args.fixture)?;

    let checkout = Checkout::new(
        CriterionRegistry::with_builtin()?,
        fixture.shipping_methods(),
        fixture.coupons(),
        Arc::new(MemoryOrderStore::new()),
        fixture.taxes().to_vec(),
    )?;

    let mut cart = fixture.cart()?;
    let scope = checkout.begin();

    for code in &args.coupons {
        let outcome = checkout.apply_coupon(&mut cart, code, &scope)?;

        info!(code = code.as_str(), %outcome, "coupon");
    }

    let method_id = match args.shipping {
        Some(id) => Some(ShippingMethodId(id)),
        None => checkout
            .shipping_options(&cart)?
            .first()
            .map(|option| option.method_id),
    };

    if let Some(method_id) = method_id {
        checkout.select_shipping(&mut cart, method_id)?;
    }

    let totals = checkout.totals(&cart, &scope)?;
    let mut stdout = io::stdout().lock();

    Receipt::new(&cart, &totals).write_to(&mut stdout)?;

    let snapshot = checkout.place_order(
        OrderKey::new(&args.order),
        &cart,
        &scope,
        OrderDetails::default(),
    )?;

    serde_json::to_writer_pretty(&mut stdout, snapshot.contents()?)?;
    writeln!(stdout)?;

    Ok(())
}

fn main() -> ExitCode {
    let config = match CliConfig::load() {
        Ok(config) => config,
        Err(err) => {
            _ = err.print();

            return ExitCode::from(2);
        }
    };

    if let Err(err) = init_subscriber(&config.logging) {
        #[expect(
            clippy::print_stderr,
            reason = "logging not initialized, must use eprintln for subscriber errors"
        )]
        {
            eprintln!("{err}");
        }

        return ExitCode::FAILURE;
    }

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");

            ExitCode::FAILURE
        }
    }
}
