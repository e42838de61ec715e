//! Panel data: a rectangular dataset keyed by (symbol, date).

use crate::domain::cross_section::CrossSection;
use crate::domain::error::{InvalidIndexError, MarketPanelError};
use crate::domain::table::{Index, Table, Value};
use crate::domain::time_series::TimeSeries;
use chrono::NaiveDateTime;
use std::collections::HashSet;
use std::fmt;

/// Immutable panel of observations for multiple symbols across multiple
/// dates.
///
/// The backing table must carry a compound index named exactly
/// `("symbol", "date")`, with text symbols and timestamp dates. The check
/// runs once at construction; a `Panel` in hand is always well-formed.
#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    table: Table,
}

impl Panel {
    pub fn new(table: Table) -> Result<Self, InvalidIndexError> {
        let expected = "compound index named (\"symbol\", \"date\")";
        let keys = match table.index() {
            Index::Compound { names, keys } if names[0] == "symbol" && names[1] == "date" => keys,
            other => return Err(InvalidIndexError::new(expected, other.describe())),
        };
        for (symbol, date) in keys {
            if !matches!(symbol, Value::Text(_)) {
                return Err(InvalidIndexError::new(
                    "text values in the symbol component",
                    format!("{} value", symbol.type_name()),
                ));
            }
            if !matches!(date, Value::Timestamp(_)) {
                return Err(InvalidIndexError::new(
                    "timestamp values in the date component",
                    format!("{} value", date.type_name()),
                ));
            }
        }
        Ok(Self { table })
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    fn keys(&self) -> &[(Value, Value)] {
        match self.table.index() {
            Index::Compound { keys, .. } => keys,
            // Unreachable: `new` only accepts a compound index.
            Index::Single { .. } => &[],
        }
    }

    /// Distinct symbols, de-duplicated in first-occurrence order.
    pub fn symbols(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.keys()
            .iter()
            .filter_map(|(symbol, _)| symbol.as_text())
            .filter(|s| seen.insert(*s))
            .collect()
    }

    /// Distinct dates, de-duplicated in first-occurrence order.
    pub fn dates(&self) -> Vec<NaiveDateTime> {
        let mut seen = HashSet::new();
        self.keys()
            .iter()
            .filter_map(|(_, date)| date.as_timestamp())
            .filter(|d| seen.insert(*d))
            .collect()
    }

    /// Project out the full date-keyed history of one symbol.
    ///
    /// Rows keep their panel order; duplicate dates survive. Zero matching
    /// rows is an error, never an empty `TimeSeries`.
    pub fn time_series(&self, symbol: &str) -> Result<TimeSeries, MarketPanelError> {
        let mut keys = Vec::new();
        let mut rows = Vec::new();
        for ((sym, date), row) in self.keys().iter().zip(self.table.rows()) {
            if sym.as_text() == Some(symbol) {
                keys.push(date.clone());
                rows.push(row.clone());
            }
        }
        if keys.is_empty() {
            return Err(MarketPanelError::NotFound {
                kind: "symbol",
                key: symbol.to_string(),
            });
        }
        let table = Table::new(
            Index::Single {
                name: "date".into(),
                keys,
            },
            self.table.columns().to_vec(),
            rows,
        )?;
        Ok(TimeSeries::new(symbol, table)?)
    }

    /// Project out the symbol-keyed slice at one date.
    ///
    /// Matching is exact, time-of-day included: probing midnight data with a
    /// nonzero time-of-day yields [`MarketPanelError::NotFound`], not a fuzzy
    /// match.
    pub fn cross_section(&self, date: NaiveDateTime) -> Result<CrossSection, MarketPanelError> {
        let mut keys = Vec::new();
        let mut rows = Vec::new();
        for ((sym, d), row) in self.keys().iter().zip(self.table.rows()) {
            if d.as_timestamp() == Some(date) {
                keys.push(sym.clone());
                rows.push(row.clone());
            }
        }
        if keys.is_empty() {
            return Err(MarketPanelError::NotFound {
                kind: "date",
                key: date.format("%Y-%m-%d %H:%M:%S").to_string(),
            });
        }
        let table = Table::new(
            Index::Single {
                name: "symbol".into(),
                keys,
            },
            self.table.columns().to_vec(),
            rows,
        )?;
        Ok(CrossSection::new(date, table)?)
    }
}

impl fmt::Display for Panel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Panel data with {} symbols and {} dates",
            self.symbols().len(),
            self.dates().len()
        )
    }
}
