//! Query port trait: the relational boundary of the data model.
//!
//! Implementations fetch raw rows and shape them into [`Table`]s; they never
//! construct a `Panel` themselves. A daily result with
//! [`KeyOrder::SymbolFirst`] can be handed straight to
//! [`crate::domain::panel::Panel::new`].

use crate::domain::error::MarketPanelError;
use crate::domain::market::{KeyOrder, Market};
use crate::domain::table::Table;
use chrono::NaiveDate;

/// Parameters of a daily-bars query: one or many codes, an optional inclusive
/// date range, and the shape of the returned compound index.
#[derive(Debug, Clone)]
pub struct DailyRequest {
    pub codes: Vec<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub key_order: KeyOrder,
    pub market: Market,
}

impl DailyRequest {
    pub fn new(codes: Vec<String>, market: Market) -> Self {
        Self {
            codes,
            start: None,
            end: None,
            key_order: KeyOrder::default(),
            market,
        }
    }

    pub fn for_code(code: impl Into<String>, market: Market) -> Self {
        Self::new(vec![code.into()], market)
    }

    pub fn with_range(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }

    pub fn with_key_order(mut self, key_order: KeyOrder) -> Self {
        self.key_order = key_order;
        self
    }
}

pub trait QueryPort {
    /// Table names visible on the connection.
    fn show_tables(&self) -> Result<Vec<String>, MarketPanelError>;

    /// Trading-day flags keyed by `cal_date` (parsed to timestamps).
    /// `is_open` filters to open/closed days when given.
    fn trade_calendar(
        &self,
        market: Market,
        is_open: Option<bool>,
    ) -> Result<Table, MarketPanelError>;

    /// Static reference data keyed by `ts_code`, optionally filtered to a
    /// code set.
    fn stock_basic(
        &self,
        market: Market,
        codes: Option<&[String]>,
    ) -> Result<Table, MarketPanelError>;

    /// Daily bars with a compound index shaped per the request, rows sorted
    /// by the compound key.
    fn daily(&self, req: &DailyRequest) -> Result<Table, MarketPanelError>;

    /// Like [`QueryPort::daily`] against the adjusted-price table; fails for
    /// markets without one.
    fn daily_adjusted(&self, req: &DailyRequest) -> Result<Table, MarketPanelError>;
}
