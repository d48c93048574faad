//! Receipt
//!
//! Terminal rendering of a [`CartView`]: one table of priced rows, the
//! totals underneath and, when the shop runs gift tiers, a second table with
//! their unlock state.

use std::io;

use tabled::{
    builder::Builder,
    settings::{
        Alignment, Color, Style, Theme,
        object::{Columns, Rows},
    },
};
use thiserror::Error;

use crate::{
    cart::{
        gifts::GiftTier,
        summary::{LineRow, Purchase},
    },
    money::MoneyFormatter,
    render::CartView,
};

/// Errors that can occur while writing a receipt.
#[derive(Debug, Error)]
pub enum ReceiptError {
    /// Writing to the output failed
    #[error("Failed to write receipt")]
    IO,
}

/// A printable rendering of one cart view.
#[derive(Debug)]
pub struct Receipt<'a> {
    view: &'a CartView,
    formatter: &'a MoneyFormatter,
    progress_message: Option<String>,
}

impl<'a> Receipt<'a> {
    /// Render `view` with amounts formatted by `formatter`.
    pub fn new(view: &'a CartView, formatter: &'a MoneyFormatter) -> Self {
        Self {
            view,
            formatter,
            progress_message: None,
        }
    }

    /// Print a gift progress label under the gift table.
    #[must_use]
    pub fn with_progress_message(mut self, message: impl Into<String>) -> Self {
        self.progress_message = Some(message.into());
        self
    }

    /// Write the receipt.
    ///
    /// # Errors
    ///
    /// Returns an error if the output cannot be written.
    pub fn write_to(&self, mut out: impl io::Write) -> Result<(), ReceiptError> {
        if self.view.is_empty() {
            writeln!(out, "\nYour cart is empty.\n").map_err(|_err| ReceiptError::IO)?;
        } else {
            write_table(&mut out, self.line_table())?;
            self.write_summary(&mut out)?;
        }

        if !self.view.gift_tiers.is_empty() {
            write_table(&mut out, self.gift_table())?;

            if let Some(message) = &self.progress_message {
                writeln!(out, " {message}\n").map_err(|_err| ReceiptError::IO)?;
            }
        }

        Ok(())
    }

    fn line_table(&self) -> Builder {
        let mut builder = Builder::default();

        builder.push_record(["Item", "Qty", "Unit Price", "Price", "Total", "Purchase"]);

        for row in self.view.summary.rows() {
            builder.push_record(self.line_cells(row));
        }

        builder
    }

    fn line_cells(&self, row: &LineRow) -> [String; 6] {
        let price = |amount| self.formatter.format_active(amount);

        [
            row.name.clone(),
            row.quantity.to_string(),
            price(row.unit_price),
            if row.applied_unit_price == row.unit_price {
                String::new()
            } else {
                price(row.applied_unit_price)
            },
            price(row.line_total),
            purchase_label(&row.purchase),
        ]
    }

    fn gift_table(&self) -> Builder {
        let mut builder = Builder::default();

        builder.push_record(["Tier", "Spend", "Gift", "Status"]);

        for tier in &self.view.gift_tiers {
            builder.push_record([
                tier.tier().to_string(),
                if tier.is_free_shipping() {
                    "any".to_string()
                } else {
                    self.formatter.format_base_major(tier.threshold())
                },
                gift_label(tier),
                if tier.is_unlocked() {
                    "unlocked".to_string()
                } else {
                    format!(
                        "{} to go",
                        self.formatter
                            .format_base_major(tier.amount_needed(self.view.cart_total_base))
                    )
                },
            ]);
        }

        builder
    }

    fn write_summary(&self, out: &mut impl io::Write) -> Result<(), ReceiptError> {
        let summary = &self.view.summary;

        let mut lines = vec![(
            "Subtotal:",
            self.formatter.format_active(summary.subtotal()),
        )];

        if summary.has_discount() {
            lines.push((
                "Discount:",
                format!("-{}", self.formatter.format_active(summary.total_discount())),
            ));
        }

        lines.push(("Total:", self.formatter.format_active(summary.total())));
        lines.push(("Items:", summary.item_count().to_string()));

        if summary.free_item_count() > 0 {
            lines.push(("Free items:", summary.free_item_count().to_string()));
        }

        let label_width = lines.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
        let value_width = lines.iter().map(|(_, value)| value.chars().count()).max().unwrap_or(0);

        for (label, value) in lines {
            writeln!(out, " {label:>label_width$}  {value:>value_width$}")
                .map_err(|_err| ReceiptError::IO)?;
        }

        writeln!(out).map_err(|_err| ReceiptError::IO)
    }
}

fn purchase_label(purchase: &Purchase) -> String {
    match purchase {
        Purchase::OneTime => "One-time".to_string(),
        Purchase::Subscription {
            plan_name,
            discount_percent,
        } => format!("{plan_name} (-{discount_percent}%)"),
        Purchase::UpsellPackage { discount_percent } => {
            format!("Package (-{}%)", discount_percent.normalize())
        }
    }
}

fn gift_label(tier: &GiftTier) -> String {
    match (tier.product(), tier.handle()) {
        (Some(product), _) => product.title().to_string(),
        (None, Some(handle)) => format!("{} ({handle})", tier.banner()),
        (None, None) => tier.banner().to_string(),
    }
}

fn write_table(out: &mut impl io::Write, builder: Builder) -> Result<(), ReceiptError> {
    let mut table = builder.build();

    table.with(Theme::from(Style::modern_rounded()));
    table.modify(Rows::first(), Color::BOLD);
    table.modify(Columns::new(1..5), Alignment::right());

    writeln!(out, "\n{table}").map_err(|_err| ReceiptError::IO)
}
