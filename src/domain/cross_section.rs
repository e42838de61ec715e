//! Cross section: observations for all symbols at one date.

use crate::domain::error::InvalidIndexError;
use crate::domain::table::{Index, Table, Value};
use chrono::NaiveDateTime;
use std::fmt;

/// Immutable, symbol-keyed observations at a single date.
///
/// Usually produced by [`crate::domain::panel::Panel::cross_section`]. The
/// index invariant (single index, text keys) is enforced here just as the
/// other containers enforce theirs.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossSection {
    date: NaiveDateTime,
    table: Table,
}

impl CrossSection {
    pub fn new(date: NaiveDateTime, table: Table) -> Result<Self, InvalidIndexError> {
        let keys = match table.index() {
            Index::Single { keys, .. } => keys,
            other @ Index::Compound { .. } => {
                return Err(InvalidIndexError::new(
                    "single symbol index",
                    other.describe(),
                ));
            }
        };
        if let Some(bad) = keys.iter().find(|k| !matches!(k, Value::Text(_))) {
            return Err(InvalidIndexError::new(
                "text index values",
                format!("{} value", bad.type_name()),
            ));
        }
        Ok(Self { date, table })
    }

    pub fn date(&self) -> NaiveDateTime {
        self.date
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Symbols in table order, duplicates preserved.
    pub fn symbols(&self) -> Vec<&str> {
        match self.table.index() {
            Index::Single { keys, .. } => keys.iter().filter_map(Value::as_text).collect(),
            Index::Compound { .. } => Vec::new(),
        }
    }
}

impl fmt::Display for CrossSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} Cross sectional data with {} symbols",
            self.date.format("%Y-%m-%d %H:%M:%S"),
            self.symbols().len()
        )
    }
}
