//! Pricing

use rust_decimal::{Decimal, RoundingStrategy};
use rusty_money::{Money, iso};

/// Number of fractional digits every monetary result is rounded to.
pub const MONEY_SCALE: u32 = 2;

/// Round a monetary amount to two places, half away from zero.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Look up a supported ISO currency by its alpha code.
pub fn currency_from_code(code: &str) -> Option<&'static iso::Currency> {
    match code.trim().to_ascii_uppercase().as_str() {
        "GBP" => Some(iso::GBP),
        "USD" => Some(iso::USD),
        "EUR" => Some(iso::EUR),
        "CAD" => Some(iso::CAD),
        "CHF" => Some(iso::CHF),
        _ => None,
    }
}

/// Render an amount in the given currency, e.g. `£10.50`.
pub fn format_money(amount: Decimal, currency: &'static iso::Currency) -> String {
    Money::from_decimal(amount, currency).to_string()
}
