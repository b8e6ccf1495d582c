//! Receipt

use std::io;

use rusty_money::{
    Money,
    iso::{self, Currency},
};
use tabled::{
    builder::Builder,
    grid::config::HorizontalLine,
    settings::{
        Alignment, Color, Style, Theme,
        object::{Columns, Rows},
    },
};
use thiserror::Error;

use crate::evaluation::Evaluation;

/// Errors that can occur when building or writing a receipt.
#[derive(Debug, Error)]
pub enum ReceiptError {
    /// The currency code is not a known ISO currency.
    #[error("unknown currency code: {0}")]
    UnknownCurrency(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// One line of a receipt.
#[derive(Debug, Clone)]
pub struct ReceiptLine<'a> {
    /// Breakdown key
    pub key: String,

    /// Display name, the key when the entry has none
    pub name: String,

    /// Selected value
    pub value: String,

    /// Amount charged
    pub price: Money<'a, Currency>,
}

/// Printable summary of an evaluation.
#[derive(Debug, Clone)]
pub struct Receipt<'a> {
    lines: Vec<ReceiptLine<'a>>,
    total: Money<'a, Currency>,
}

impl Receipt<'static> {
    /// Build a receipt from an evaluation, treating prices as whole units of
    /// the currency with the given ISO code.
    ///
    /// # Errors
    ///
    /// Returns [`ReceiptError::UnknownCurrency`] if the code is not recognised.
    pub fn from_evaluation(evaluation: &Evaluation, currency: &str) -> Result<Self, ReceiptError> {
        let code = currency.trim().to_uppercase();
        let currency = iso::find(&code).ok_or(ReceiptError::UnknownCurrency(code))?;

        let mut lines: Vec<_> = evaluation
            .breakdown()
            .iter()
            .map(|(key, entry)| ReceiptLine {
                key: key.clone(),
                name: if entry.name.is_empty() {
                    key.clone()
                } else {
                    entry.name.clone()
                },
                value: entry.value.clone(),
                price: Money::from_major(entry.price, currency),
            })
            .collect();

        lines.sort_by(|a, b| a.key.cmp(&b.key));

        Ok(Self {
            lines,
            total: Money::from_major(evaluation.total(), currency),
        })
    }
}

impl<'a> Receipt<'a> {
    /// Receipt lines, sorted by breakdown key.
    pub fn lines(&self) -> &[ReceiptLine<'a>] {
        &self.lines
    }

    /// Total amount
    pub fn total(&self) -> Money<'a, Currency> {
        self.total
    }

    /// Writes the receipt as a table followed by the total.
    ///
    /// # Errors
    ///
    /// Returns an error if the output cannot be written.
    pub fn write_to(&self, mut out: impl io::Write) -> Result<(), ReceiptError> {
        let mut builder = Builder::default();

        builder.push_record(["Item", "Value", "Price"]);

        for line in &self.lines {
            builder.push_record([
                line.name.clone(),
                line.value.clone(),
                format!("{}", line.price),
            ]);
        }

        let mut table = builder.build();
        let mut theme = Theme::from(Style::modern_rounded());

        theme.remove_horizontal_lines();
        theme.insert_horizontal_line(
            1,
            HorizontalLine::new(Some('─'), Some('┼'), Some('├'), Some('┤')),
        );

        table.with(theme);
        table.modify(Rows::first(), Color::BOLD);
        table.modify(Columns::last(), Alignment::right());

        writeln!(out, "{table}")?;
        writeln!(out, " Total: {}", self.total)?;

        Ok(())
    }
}
