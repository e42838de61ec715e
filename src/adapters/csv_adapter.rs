//! CSV data adapter: a database-free path to a Panel.
//!
//! Expects a header of `symbol,date,open,high,low,close,volume` with
//! `%Y-%m-%d` dates.

use crate::domain::bar::{daily_table_from_bars, DailyBar};
use crate::domain::error::MarketPanelError;
use crate::domain::market::KeyOrder;
use crate::domain::table::Table;
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;

pub struct CsvTableAdapter {
    path: PathBuf,
}

impl CsvTableAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn load_bars(&self) -> Result<Vec<DailyBar>, MarketPanelError> {
        let content = fs::read_to_string(&self.path).map_err(|e| MarketPanelError::Database {
            reason: format!("failed to read {}: {}", self.path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| MarketPanelError::Database {
                reason: format!("CSV parse error: {}", e),
            })?;

            let field = |i: usize, name: &str| {
                record
                    .get(i)
                    .ok_or_else(|| MarketPanelError::Database {
                        reason: format!("missing {name} column"),
                    })
                    .map(str::trim)
            };

            let symbol = field(0, "symbol")?.to_string();
            let date_str = field(1, "date")?;
            let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| {
                MarketPanelError::Database {
                    reason: format!("invalid date \"{date_str}\": {e}"),
                }
            })?;

            let float_field = |i: usize, name: &str| -> Result<f64, MarketPanelError> {
                field(i, name)?
                    .parse()
                    .map_err(|e| MarketPanelError::Database {
                        reason: format!("invalid {name} value: {e}"),
                    })
            };

            let open = float_field(2, "open")?;
            let high = float_field(3, "high")?;
            let low = float_field(4, "low")?;
            let close = float_field(5, "close")?;
            let volume: i64 = field(6, "volume")?
                .parse()
                .map_err(|e| MarketPanelError::Database {
                    reason: format!("invalid volume value: {e}"),
                })?;

            bars.push(DailyBar {
                symbol,
                date,
                open,
                high,
                low,
                close,
                volume,
            });
        }

        Ok(bars)
    }

    /// Load the file as a compound-indexed table, rows in file order.
    pub fn load_table(&self, key_order: KeyOrder) -> Result<Table, MarketPanelError> {
        let bars = self.load_bars()?;
        daily_table_from_bars(&bars, key_order)
    }
}
