//! Time series: the date-keyed observation history of one symbol.

use crate::domain::error::InvalidIndexError;
use crate::domain::table::{Index, Table, Value};
use chrono::NaiveDateTime;
use std::fmt;

/// Immutable, date-keyed observations for a single symbol.
///
/// Usually produced by [`crate::domain::panel::Panel::time_series`], but any
/// timestamp-indexed table qualifies. Row order is whatever the caller
/// supplied; no sort, no de-duplication.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    symbol: String,
    table: Table,
}

impl TimeSeries {
    pub fn new(symbol: impl Into<String>, table: Table) -> Result<Self, InvalidIndexError> {
        let keys = match table.index() {
            Index::Single { keys, .. } => keys,
            other @ Index::Compound { .. } => {
                return Err(InvalidIndexError::new(
                    "single timestamp index",
                    other.describe(),
                ));
            }
        };
        if let Some(bad) = keys.iter().find(|k| !matches!(k, Value::Timestamp(_))) {
            return Err(InvalidIndexError::new(
                "timestamp index values",
                format!("{} value", bad.type_name()),
            ));
        }
        Ok(Self {
            symbol: symbol.into(),
            table,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Dates in supplied order, duplicates preserved.
    pub fn dates(&self) -> Vec<NaiveDateTime> {
        match self.table.index() {
            Index::Single { keys, .. } => keys.iter().filter_map(Value::as_timestamp).collect(),
            Index::Compound { .. } => Vec::new(),
        }
    }
}

impl fmt::Display for TimeSeries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} Time series data with {} dates",
            self.symbol,
            self.dates().len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn date_table(dates: &[NaiveDateTime]) -> Table {
        Table::new(
            Index::Single {
                name: "date".into(),
                keys: dates.iter().map(|d| Value::Timestamp(*d)).collect(),
            },
            vec!["close".into()],
            dates.iter().map(|_| vec![Value::Float(1.0)]).collect(),
        )
        .unwrap()
    }

    #[test]
    fn accepts_timestamp_index() {
        let series = TimeSeries::new("AAPL", date_table(&[ts(2021, 1, 1), ts(2021, 1, 2)]));
        assert!(series.is_ok());
        assert_eq!(series.unwrap().symbol(), "AAPL");
    }

    #[test]
    fn rejects_text_index() {
        let table = Table::new(
            Index::Single {
                name: "date".into(),
                keys: vec![Value::Text("2021-01-01".into())],
            },
            vec!["close".into()],
            vec![vec![Value::Float(1.0)]],
        )
        .unwrap();
        let err = TimeSeries::new("AAPL", table).unwrap_err();
        assert!(err.found.contains("text"));
    }

    #[test]
    fn rejects_compound_index() {
        let table = Table::new(
            Index::Compound {
                names: ["symbol".into(), "date".into()],
                keys: vec![(Value::Text("AAPL".into()), Value::Timestamp(ts(2021, 1, 1)))],
            },
            vec!["close".into()],
            vec![vec![Value::Float(1.0)]],
        )
        .unwrap();
        assert!(TimeSeries::new("AAPL", table).is_err());
    }

    #[test]
    fn dates_preserve_order_and_duplicates() {
        let dates = [ts(2021, 1, 3), ts(2021, 1, 1), ts(2021, 1, 1)];
        let series = TimeSeries::new("AAPL", date_table(&dates)).unwrap();
        assert_eq!(series.dates(), dates.to_vec());
    }

    #[test]
    fn display_names_symbol_and_count() {
        let series = TimeSeries::new("TSLA", date_table(&[ts(2021, 1, 1)])).unwrap();
        assert_eq!(series.to_string(), "TSLA Time series data with 1 dates");
    }
}
