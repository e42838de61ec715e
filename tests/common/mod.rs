#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use marketpanel::domain::bar::{daily_table_from_bars, DailyBar};
use marketpanel::domain::error::MarketPanelError;
use marketpanel::domain::market::Market;
use marketpanel::domain::table::{Index, Table, Value};
use marketpanel::ports::query_port::{DailyRequest, QueryPort};
use std::collections::HashMap;

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn midnight(y: i32, m: u32, d: u32) -> NaiveDateTime {
    day(y, m, d).and_time(NaiveTime::MIN)
}

pub fn make_bar(symbol: &str, date: NaiveDate, close: f64) -> DailyBar {
    DailyBar {
        symbol: symbol.to_string(),
        date,
        open: close - 1.0,
        high: close + 1.0,
        low: close - 2.0,
        close,
        volume: 1000,
    }
}

/// Six weekdays of bars starting 2021-01-01 for one symbol.
pub fn sample_bars(symbol: &str) -> Vec<DailyBar> {
    (1..=6)
        .map(|d| make_bar(symbol, day(2021, 1, d), 100.0 + d as f64))
        .collect()
}

/// In-memory [`QueryPort`] keyed by code, serving pre-canned daily bars.
pub struct MockQueryPort {
    pub bars: HashMap<String, Vec<DailyBar>>,
    pub errors: HashMap<String, String>,
}

impl MockQueryPort {
    pub fn new() -> Self {
        Self {
            bars: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, code: &str, bars: Vec<DailyBar>) -> Self {
        self.bars.insert(code.to_string(), bars);
        self
    }

    pub fn with_error(mut self, code: &str, reason: &str) -> Self {
        self.errors.insert(code.to_string(), reason.to_string());
        self
    }

    fn select(&self, req: &DailyRequest) -> Result<Vec<DailyBar>, MarketPanelError> {
        let mut selected = Vec::new();
        for code in &req.codes {
            if let Some(reason) = self.errors.get(code) {
                return Err(MarketPanelError::DatabaseQuery {
                    reason: reason.clone(),
                });
            }
            for bar in self.bars.get(code).into_iter().flatten() {
                let after_start = req.start.is_none_or(|s| bar.date >= s);
                let before_end = req.end.is_none_or(|e| bar.date <= e);
                if after_start && before_end {
                    selected.push(bar.clone());
                }
            }
        }
        selected.sort_by(|a, b| a.symbol.cmp(&b.symbol).then(a.date.cmp(&b.date)));
        Ok(selected)
    }
}

impl QueryPort for MockQueryPort {
    fn show_tables(&self) -> Result<Vec<String>, MarketPanelError> {
        Ok(vec!["daily".into(), "trade_cal".into(), "stock_basic".into()])
    }

    fn trade_calendar(
        &self,
        _market: Market,
        is_open: Option<bool>,
    ) -> Result<Table, MarketPanelError> {
        let days = [(day(2021, 1, 1), false), (day(2021, 1, 4), true)];
        let filtered: Vec<_> = days
            .iter()
            .filter(|(_, open)| is_open.is_none_or(|flag| flag == *open))
            .collect();
        Table::new(
            Index::Single {
                name: "cal_date".into(),
                keys: filtered
                    .iter()
                    .map(|(d, _)| Value::Timestamp(d.and_time(NaiveTime::MIN)))
                    .collect(),
            },
            vec!["is_open".into()],
            filtered
                .iter()
                .map(|(_, open)| vec![Value::Int(i64::from(*open))])
                .collect(),
        )
    }

    fn stock_basic(
        &self,
        _market: Market,
        codes: Option<&[String]>,
    ) -> Result<Table, MarketPanelError> {
        let mut known: Vec<&String> = self.bars.keys().collect();
        known.sort();
        let selected: Vec<&String> = match codes {
            Some(codes) => known
                .into_iter()
                .filter(|code| codes.contains(code))
                .collect(),
            None => known,
        };
        Table::new(
            Index::Single {
                name: "ts_code".into(),
                keys: selected
                    .iter()
                    .map(|code| Value::Text((*code).clone()))
                    .collect(),
            },
            vec!["name".into()],
            selected
                .iter()
                .map(|code| vec![Value::Text(format!("{code} Inc"))])
                .collect(),
        )
    }

    fn daily(&self, req: &DailyRequest) -> Result<Table, MarketPanelError> {
        let bars = self.select(req)?;
        daily_table_from_bars(&bars, req.key_order)
    }

    fn daily_adjusted(&self, req: &DailyRequest) -> Result<Table, MarketPanelError> {
        req.market.daily_adjusted_table()?;
        self.daily(req)
    }
}
