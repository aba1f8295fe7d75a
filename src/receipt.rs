//! Receipt

use std::{fmt::Write, io};

use rust_decimal::Decimal;
use rusty_money::iso::Currency;
use smallvec::SmallVec;
use tabled::{
    builder::Builder,
    grid::config::HorizontalLine,
    settings::{
        Alignment, Color, Style, Theme,
        object::{Columns, Rows},
    },
};
use thiserror::Error;

use crate::{cart::Cart, checkout::CheckoutTotals, pricing::format_money};

/// Errors that can occur when writing a receipt.
#[derive(Debug, Error)]
pub enum ReceiptError {
    /// IO error
    #[error("IO error")]
    IO,
}

/// One priced cart line.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ReceiptLine {
    title: String,
    quantity: u32,
    list_price: Decimal,
    sale_price: Option<Decimal>,
    total: Decimal,
}

/// Priced summary of a cart, ready for printing.
#[derive(Debug, Clone)]
pub struct Receipt {
    lines: SmallVec<[ReceiptLine; 8]>,

    /// Label and amount of each cart level alteration
    alterations: SmallVec<[(String, Decimal); 2]>,

    shipping: Option<(String, Decimal)>,
    tax: Option<(String, Decimal)>,
    subtotal: Decimal,
    total: Decimal,

    /// Currency used for all monetary values
    currency: &'static Currency,
}

impl Receipt {
    /// Build a receipt from a cart and its computed totals.
    #[must_use]
    pub fn new(cart: &Cart, totals: &CheckoutTotals) -> Self {
        let lines = cart
            .lines()
            .iter()
            .map(|line| {
                let product = line.product();
                let effective = product.effective_price();

                ReceiptLine {
                    title: product.title.clone(),
                    quantity: line.quantity(),
                    list_price: product.price,
                    sale_price: (effective != product.price).then_some(effective),
                    total: line.total(),
                }
            })
            .collect();

        let alterations = totals
            .alterations
            .entries
            .iter()
            .map(|entry| {
                let label = entry
                    .label
                    .clone()
                    .unwrap_or_else(|| entry.alteration.to_string());

                (format!("{} {label}", entry.alteration.alteration_type), entry.amount)
            })
            .collect();

        Receipt {
            lines,
            alterations,
            shipping: totals
                .shipping_option
                .as_ref()
                .map(|option| (option.description.clone(), option.price)),
            tax: totals.tax.as_ref().map(|tax| (tax.name.clone(), tax.amount)),
            subtotal: totals.subtotal,
            total: totals.total,
            currency: cart.currency(),
        }
    }

    /// Total of all lines before alterations
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.subtotal
    }

    /// Amount due
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.total
    }

    /// Amount taken off by alterations
    #[must_use]
    pub fn savings(&self) -> Decimal {
        -self.alterations.iter().map(|(_label, amount)| *amount).sum::<Decimal>()
    }

    /// Currency used for all monetary values.
    #[must_use]
    pub fn currency(&self) -> &'static Currency {
        self.currency
    }

    /// Prints the receipt.
    ///
    /// # Errors
    ///
    /// Returns an error if the receipt cannot be written.
    pub fn write_to(&self, mut out: impl io::Write) -> Result<(), ReceiptError> {
        let mut builder = Builder::default();

        builder.push_record(["", "Item", "Qty", "Price", "Sale Price", "Total"]);

        let mut color_ops: SmallVec<[(usize, usize, Color); 16]> = SmallVec::new();

        for (idx, line) in self.lines.iter().enumerate() {
            let row = idx + 1;

            builder.push_record([
                format!("#{row:<3}"),
                line.title.clone(),
                line.quantity.to_string(),
                self.money(line.list_price),
                line.sale_price
                    .map_or_else(String::new, |price| self.money(price)),
                self.money(line.total),
            ]);

            if line.sale_price.is_some() {
                color_ops.push((row, 3, color_dark_grey()));
                color_ops.push((row, 4, Color::FG_GREEN));
            }
        }

        write_receipt_table(&mut out, builder, color_ops)?;
        self.write_summary(&mut out)
    }

    fn money(&self, amount: Decimal) -> String {
        format_money(amount, self.currency)
    }

    fn write_summary(&self, out: &mut impl io::Write) -> Result<(), ReceiptError> {
        let mut rows: SmallVec<[(String, String); 8]> = SmallVec::new();

        rows.push((" Subtotal:".to_string(), format!("{}  ", self.money(self.subtotal))));

        for (label, amount) in &self.alterations {
            rows.push((format!(" {label}:"), format!("{}  ", self.money(*amount))));
        }

        if let Some((description, price)) = &self.shipping {
            rows.push((
                format!(" Shipping ({description}):"),
                format!("{}  ", self.money(*price)),
            ));
        }

        if let Some((name, amount)) = &self.tax {
            rows.push((format!(" {name}:"), format!("{}  ", self.money(*amount))));
        }

        rows.push((
            " \x1b[1mTotal:\x1b[0m".to_string(),
            format!("\x1b[1m{}  \x1b[0m", self.money(self.total)),
        ));

        let label_width = rows
            .iter()
            .map(|(label, _value)| visible_width(label))
            .max()
            .unwrap_or_default();

        let value_width = rows
            .iter()
            .map(|(_label, value)| visible_width(value))
            .max()
            .unwrap_or_default();

        for (label, value) in &rows {
            write_summary_line(out, label, value, label_width, value_width)?;
        }

        writeln!(out).map_err(|_err| ReceiptError::IO)
    }
}

fn write_receipt_table(
    out: &mut impl io::Write,
    builder: Builder,
    color_ops: SmallVec<[(usize, usize, Color); 16]>,
) -> Result<(), ReceiptError> {
    let mut table = builder.build();
    let mut theme = Theme::from(Style::modern_rounded());
    let separator = HorizontalLine::new(Some('─'), Some('┼'), Some('├'), Some('┤'));

    theme.remove_horizontal_lines();
    theme.insert_horizontal_line(1, separator);

    table.with(theme);
    table.modify(Rows::first(), Color::BOLD);
    table.modify(Columns::new(2..6), Alignment::right());

    for (row, col, color) in color_ops {
        table.modify((row, col), color);
    }

    let table_str = colorize_borders(&table.to_string());

    writeln!(out, "\n{table_str}").map_err(|_err| ReceiptError::IO)
}

/// Wraps runs of UTF-8 box-drawing characters in ANSI dark-grey escape codes.
fn colorize_borders(table: &str) -> String {
    let mut out = String::with_capacity(table.len() + 256);
    let mut in_run = false;

    for ch in table.chars() {
        let box_char = ('\u{2500}'..='\u{257F}').contains(&ch);

        if box_char && !in_run {
            _ = out.write_str("\x1b[90m");
            in_run = true;
        } else if !box_char && in_run {
            _ = out.write_str("\x1b[0m");
            in_run = false;
        }

        out.push(ch);
    }

    if in_run {
        _ = out.write_str("\x1b[0m");
    }

    out
}

/// Returns the visible (non-ANSI) width of a string.
fn visible_width(s: &str) -> usize {
    let mut width = 0usize;
    let mut in_escape = false;

    for ch in s.chars() {
        if in_escape {
            if ch.is_ascii_alphabetic() {
                in_escape = false;
            }
        } else if ch == '\x1b' {
            in_escape = true;
        } else {
            width += 1;
        }
    }

    width
}

/// Writes a summary line with a right-aligned label and a fixed-width value column.
fn write_summary_line(
    out: &mut impl io::Write,
    label: &str,
    value: &str,
    label_col_width: usize,
    value_col_width: usize,
) -> Result<(), ReceiptError> {
    let label_pad = label_col_width.saturating_sub(visible_width(label));
    let value_pad = value_col_width.saturating_sub(visible_width(value));

    writeln!(
        out,
        "{:>label_pad$}{label}  {value_pad}{value}",
        "",
        value_pad = " ".repeat(value_pad)
    )
    .map_err(|_err| ReceiptError::IO)
}

/// ANSI dark grey foreground.
fn color_dark_grey() -> Color {
    Color::new("\x1b[90m", "\x1b[0m")
}

#[cfg(test)]
mod tests {
    use rusty_money::iso::GBP;
    use testresult::TestResult;

    use crate::{
        alterations::{AlterationSummary, AppliedAlteration, PriceAlteration},
        cart::{CartLine, Product},
        taxes::TaxAmount,
    };

    use super::*;

    fn priced() -> TestResult<(Cart, CheckoutTotals)> {
        let mut cart = Cart::new(GBP);
        cart.add_line(CartLine::new(
            Product::new(1, "Scarf", Decimal::new(4000, 2)).with_discount_price(Decimal::new(3500, 2)),
            2,
        )?);

        let totals = CheckoutTotals {
            subtotal: Decimal::new(7000, 2),
            alterations: AlterationSummary {
                entries: vec![AppliedAlteration {
                    alteration: PriceAlteration::new("Coupon", "SAVE10", 1),
                    label: Some("SAVE10".to_string()),
                    amount: Decimal::new(-700, 2),
                }],
                unclaimed: Vec::new(),
                inapplicable: Vec::new(),
            },
            lines: Vec::new(),
            discount: Decimal::new(-700, 2),
            discounted_subtotal: Decimal::new(6300, 2),
            shipping: Decimal::ZERO,
            shipping_option: None,
            tax: Some(TaxAmount {
                name: "VAT".to_string(),
                amount: Decimal::new(1260, 2),
            }),
            total: Decimal::new(7560, 2),
        };

        Ok((cart, totals))
    }

    #[test]
    fn savings_are_the_negated_alterations() -> TestResult {
        let (cart, totals) = priced()?;

        let receipt = Receipt::new(&cart, &totals);

        assert_eq!(receipt.subtotal(), Decimal::new(7000, 2));
        assert_eq!(receipt.savings(), Decimal::new(700, 2));
        assert_eq!(receipt.total(), Decimal::new(7560, 2));
        assert_eq!(receipt.currency(), GBP);

        Ok(())
    }

    #[test]
    fn write_to_lists_lines_and_summary() -> TestResult {
        let (cart, totals) = priced()?;
        let mut out = Vec::new();

        Receipt::new(&cart, &totals).write_to(&mut out)?;

        let printed = String::from_utf8(out)?;

        assert!(printed.contains("Scarf"));
        assert!(printed.contains("Coupon SAVE10:"));
        assert!(printed.contains("VAT:"));
        assert!(printed.contains("75.60"));

        Ok(())
    }

    #[test]
    fn visible_width_ignores_escape_codes() {
        assert_eq!(visible_width("\x1b[1mTotal:\x1b[0m"), 6);
    }
}
