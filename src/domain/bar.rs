//! Daily bar representation and conversion into a compound-indexed table.

use crate::domain::error::MarketPanelError;
use crate::domain::market::KeyOrder;
use crate::domain::table::{Index, Table, Value};
use chrono::{NaiveDate, NaiveTime};

#[derive(Debug, Clone)]
pub struct DailyBar {
    pub symbol: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

pub const DAILY_COLUMNS: [&str; 5] = ["open", "high", "low", "close", "volume"];

/// Assemble bars into a (symbol, date)-keyed table, dates at midnight.
///
/// With [`KeyOrder::SymbolFirst`] the result satisfies the
/// [`crate::domain::panel::Panel`] index invariant as-is. Row order follows
/// the input; no sort is imposed here.
pub fn daily_table_from_bars(
    bars: &[DailyBar],
    key_order: KeyOrder,
) -> Result<Table, MarketPanelError> {
    let keys = bars
        .iter()
        .map(|bar| {
            let symbol = Value::Text(bar.symbol.clone());
            let date = Value::Timestamp(bar.date.and_time(NaiveTime::MIN));
            match key_order {
                KeyOrder::SymbolFirst => (symbol, date),
                KeyOrder::DateFirst => (date, symbol),
            }
        })
        .collect();
    let rows = bars
        .iter()
        .map(|bar| {
            vec![
                Value::Float(bar.open),
                Value::Float(bar.high),
                Value::Float(bar.low),
                Value::Float(bar.close),
                Value::Int(bar.volume),
            ]
        })
        .collect();
    Table::new(
        Index::Compound {
            names: key_order.index_names(),
            keys,
        },
        DAILY_COLUMNS.iter().map(|c| c.to_string()).collect(),
        rows,
    )
}
