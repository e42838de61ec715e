//! SQLite query adapter.
//!
//! Dates live in TEXT columns as `%Y-%m-%d` and are parsed to midnight
//! timestamps on read, so daily results are Panel-ready without further
//! coercion by the caller.

use crate::domain::bar::DailyBar;
use crate::domain::error::MarketPanelError;
use crate::domain::market::{KeyOrder, Market};
use crate::domain::table::{Index, Table, Value};
use crate::ports::config_port::ConfigPort;
use crate::ports::query_port::{DailyRequest, QueryPort};
use chrono::{NaiveDate, NaiveTime};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::ValueRef;
use rusqlite::{params, params_from_iter};

/// Static reference-data row for seeding the `stock_basic` / `us_basic`
/// tables.
#[derive(Debug, Clone)]
pub struct BasicRow {
    pub code: String,
    pub name: String,
    pub industry: String,
}

pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
}

fn db_err(e: r2d2::Error) -> MarketPanelError {
    MarketPanelError::Database {
        reason: e.to_string(),
    }
}

fn query_err(e: rusqlite::Error) -> MarketPanelError {
    MarketPanelError::DatabaseQuery {
        reason: e.to_string(),
    }
}

fn value_from_sql(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Int(i),
        ValueRef::Real(x) => Value::Float(x),
        ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(_) => Value::Null,
    }
}

/// Parse a `%Y-%m-%d` cell into a midnight timestamp key.
fn day_key(value: Value) -> Result<Value, MarketPanelError> {
    match value {
        Value::Timestamp(_) => Ok(value),
        Value::Text(s) => NaiveDate::parse_from_str(&s, "%Y-%m-%d")
            .map(|d| Value::Timestamp(d.and_time(NaiveTime::MIN)))
            .map_err(|e| MarketPanelError::DatabaseQuery {
                reason: format!("unparseable date \"{s}\": {e}"),
            }),
        other => Err(MarketPanelError::DatabaseQuery {
            reason: format!("expected a date cell, found {}", other.type_name()),
        }),
    }
}

impl SqliteAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, MarketPanelError> {
        let db_path =
            config
                .get_string("sqlite", "path")
                .ok_or_else(|| MarketPanelError::ConfigMissing {
                    section: "sqlite".into(),
                    key: "path".into(),
                })?;

        let pool_size = config.get_int("sqlite", "pool_size", 4) as u32;

        let manager = SqliteConnectionManager::file(&db_path);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(db_err)?;

        Ok(Self { pool })
    }

    pub fn in_memory() -> Result<Self, MarketPanelError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder().max_size(1).build(manager).map_err(db_err)?;
        Ok(Self { pool })
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, MarketPanelError> {
        self.pool.get().map_err(db_err)
    }

    /// Create the seven market tables if they do not exist.
    pub fn initialize_schema(&self) -> Result<(), MarketPanelError> {
        let daily_shape = "(
            ts_code TEXT NOT NULL,
            trade_date TEXT NOT NULL,
            open REAL NOT NULL,
            high REAL NOT NULL,
            low REAL NOT NULL,
            close REAL NOT NULL,
            volume INTEGER NOT NULL,
            PRIMARY KEY (ts_code, trade_date)
        )";
        let calendar_shape = "(
            cal_date TEXT PRIMARY KEY,
            is_open INTEGER NOT NULL
        )";
        let basic_shape = "(
            ts_code TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            industry TEXT
        )";

        let mut batch = String::new();
        for table in ["daily", "us_daily", "us_daily_adj"] {
            batch.push_str(&format!(
                "CREATE TABLE IF NOT EXISTS {table} {daily_shape};\n"
            ));
        }
        for table in ["trade_cal", "us_tradecal"] {
            batch.push_str(&format!(
                "CREATE TABLE IF NOT EXISTS {table} {calendar_shape};\n"
            ));
        }
        for table in ["stock_basic", "us_basic"] {
            batch.push_str(&format!(
                "CREATE TABLE IF NOT EXISTS {table} {basic_shape};\n"
            ));
        }

        self.conn()?.execute_batch(&batch).map_err(query_err)
    }

    fn insert_bars_into(&self, table: &str, bars: &[DailyBar]) -> Result<(), MarketPanelError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;
        {
            let sql = format!(
                "INSERT OR REPLACE INTO {table}
                 (ts_code, trade_date, open, high, low, close, volume)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"
            );
            let mut stmt = tx.prepare(&sql).map_err(query_err)?;
            for bar in bars {
                stmt.execute(params![
                    bar.symbol,
                    bar.date.format("%Y-%m-%d").to_string(),
                    bar.open,
                    bar.high,
                    bar.low,
                    bar.close,
                    bar.volume
                ])
                .map_err(query_err)?;
            }
        }
        tx.commit().map_err(query_err)
    }

    pub fn insert_daily(&self, market: Market, bars: &[DailyBar]) -> Result<(), MarketPanelError> {
        self.insert_bars_into(market.daily_table(), bars)
    }

    pub fn insert_daily_adjusted(
        &self,
        market: Market,
        bars: &[DailyBar],
    ) -> Result<(), MarketPanelError> {
        self.insert_bars_into(market.daily_adjusted_table()?, bars)
    }

    pub fn insert_calendar(
        &self,
        market: Market,
        days: &[(NaiveDate, bool)],
    ) -> Result<(), MarketPanelError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;
        {
            let sql = format!(
                "INSERT OR REPLACE INTO {} (cal_date, is_open) VALUES (?1, ?2)",
                market.calendar_table()
            );
            let mut stmt = tx.prepare(&sql).map_err(query_err)?;
            for (day, open) in days {
                stmt.execute(params![
                    day.format("%Y-%m-%d").to_string(),
                    i64::from(*open)
                ])
                .map_err(query_err)?;
            }
        }
        tx.commit().map_err(query_err)
    }

    pub fn insert_basic(&self, market: Market, rows: &[BasicRow]) -> Result<(), MarketPanelError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;
        {
            let sql = format!(
                "INSERT OR REPLACE INTO {} (ts_code, name, industry) VALUES (?1, ?2, ?3)",
                market.basic_table()
            );
            let mut stmt = tx.prepare(&sql).map_err(query_err)?;
            for row in rows {
                stmt.execute(params![row.code, row.name, row.industry])
                    .map_err(query_err)?;
            }
        }
        tx.commit().map_err(query_err)
    }

    /// Run `sql`, capture all columns, and move `index_col` into a single
    /// index. `date_index` parses the key column as `%Y-%m-%d`.
    fn fetch_single_indexed(
        &self,
        sql: &str,
        sql_params: Vec<rusqlite::types::Value>,
        index_col: &str,
        date_index: bool,
    ) -> Result<Table, MarketPanelError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql).map_err(query_err)?;
        let names: Vec<String> = stmt.column_names().iter().map(|n| n.to_string()).collect();
        let index_pos = names.iter().position(|n| n == index_col).ok_or_else(|| {
            MarketPanelError::DatabaseQuery {
                reason: format!("result has no \"{index_col}\" column"),
            }
        })?;

        let mut keys = Vec::new();
        let mut data = Vec::new();
        let mut rows = stmt
            .query(params_from_iter(sql_params))
            .map_err(query_err)?;
        while let Some(row) = rows.next().map_err(query_err)? {
            let mut cells = Vec::with_capacity(names.len() - 1);
            for i in 0..names.len() {
                let value = value_from_sql(row.get_ref(i).map_err(query_err)?);
                if i == index_pos {
                    keys.push(if date_index { day_key(value)? } else { value });
                } else {
                    cells.push(value);
                }
            }
            data.push(cells);
        }

        let columns = names
            .into_iter()
            .enumerate()
            .filter(|(i, _)| *i != index_pos)
            .map(|(_, n)| n)
            .collect();
        Table::new(
            Index::Single {
                name: index_col.to_string(),
                keys,
            },
            columns,
            data,
        )
    }

    fn fetch_daily(&self, table: &str, req: &DailyRequest) -> Result<Table, MarketPanelError> {
        if req.codes.is_empty() {
            return Err(MarketPanelError::InvalidArgument {
                reason: "at least one code is required".into(),
            });
        }

        let placeholders = vec!["?"; req.codes.len()].join(", ");
        let mut sql = format!("SELECT * FROM {table} WHERE ts_code IN ({placeholders})");
        let mut sql_params: Vec<rusqlite::types::Value> =
            req.codes.iter().map(|c| c.clone().into()).collect();
        if let Some(start) = req.start {
            sql.push_str(" AND trade_date >= ?");
            sql_params.push(start.format("%Y-%m-%d").to_string().into());
        }
        if let Some(end) = req.end {
            sql.push_str(" AND trade_date <= ?");
            sql_params.push(end.format("%Y-%m-%d").to_string().into());
        }

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql).map_err(query_err)?;
        let names: Vec<String> = stmt.column_names().iter().map(|n| n.to_string()).collect();
        let code_pos = names.iter().position(|n| n == "ts_code").ok_or_else(|| {
            MarketPanelError::DatabaseQuery {
                reason: "result has no \"ts_code\" column".into(),
            }
        })?;
        let date_pos = names.iter().position(|n| n == "trade_date").ok_or_else(|| {
            MarketPanelError::DatabaseQuery {
                reason: "result has no \"trade_date\" column".into(),
            }
        })?;

        let mut keyed: Vec<((Value, Value), Vec<Value>)> = Vec::new();
        let mut rows = stmt
            .query(params_from_iter(sql_params))
            .map_err(query_err)?;
        while let Some(row) = rows.next().map_err(query_err)? {
            let mut symbol = Value::Null;
            let mut date = Value::Null;
            let mut cells = Vec::with_capacity(names.len() - 2);
            for i in 0..names.len() {
                let value = value_from_sql(row.get_ref(i).map_err(query_err)?);
                if i == code_pos {
                    symbol = value;
                } else if i == date_pos {
                    date = day_key(value)?;
                } else {
                    cells.push(value);
                }
            }
            let key = match req.key_order {
                KeyOrder::SymbolFirst => (symbol, date),
                KeyOrder::DateFirst => (date, symbol),
            };
            keyed.push((key, cells));
        }

        keyed.sort_by(|a, b| {
            a.0 .0
                .cmp_key(&b.0 .0)
                .then_with(|| a.0 .1.cmp_key(&b.0 .1))
        });

        let columns: Vec<String> = names
            .into_iter()
            .enumerate()
            .filter(|(i, _)| *i != code_pos && *i != date_pos)
            .map(|(_, n)| n)
            .collect();
        let (keys, data): (Vec<_>, Vec<_>) = keyed.into_iter().unzip();
        Table::new(
            Index::Compound {
                names: req.key_order.index_names(),
                keys,
            },
            columns,
            data,
        )
    }
}

impl QueryPort for SqliteAdapter {
    fn show_tables(&self) -> Result<Vec<String>, MarketPanelError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .map_err(query_err)?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(query_err)?;

        let mut tables = Vec::new();
        for row in rows {
            tables.push(row.map_err(query_err)?);
        }
        Ok(tables)
    }

    fn trade_calendar(
        &self,
        market: Market,
        is_open: Option<bool>,
    ) -> Result<Table, MarketPanelError> {
        let mut sql = format!("SELECT * FROM {}", market.calendar_table());
        let mut sql_params: Vec<rusqlite::types::Value> = Vec::new();
        if let Some(open) = is_open {
            sql.push_str(" WHERE is_open = ?");
            sql_params.push(i64::from(open).into());
        }
        self.fetch_single_indexed(&sql, sql_params, "cal_date", true)
    }

    fn stock_basic(
        &self,
        market: Market,
        codes: Option<&[String]>,
    ) -> Result<Table, MarketPanelError> {
        let mut sql = format!("SELECT * FROM {}", market.basic_table());
        let mut sql_params: Vec<rusqlite::types::Value> = Vec::new();
        if let Some(codes) = codes {
            let placeholders = vec!["?"; codes.len()].join(", ");
            sql.push_str(&format!(" WHERE ts_code IN ({placeholders})"));
            sql_params.extend(codes.iter().map(|c| c.clone().into()));
        }
        self.fetch_single_indexed(&sql, sql_params, "ts_code", false)
    }

    fn daily(&self, req: &DailyRequest) -> Result<Table, MarketPanelError> {
        self.fetch_daily(req.market.daily_table(), req)
    }

    fn daily_adjusted(&self, req: &DailyRequest) -> Result<Table, MarketPanelError> {
        self.fetch_daily(req.market.daily_adjusted_table()?, req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::panel::Panel;

    struct EmptyConfig;

    impl ConfigPort for EmptyConfig {
        fn get_string(&self, _section: &str, _key: &str) -> Option<String> {
            None
        }
        fn get_int(&self, _section: &str, _key: &str, default: i64) -> i64 {
            default
        }
        fn get_double(&self, _section: &str, _key: &str, default: f64) -> f64 {
            default
        }
        fn get_bool(&self, _section: &str, _key: &str, default: bool) -> bool {
            default
        }
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn make_bar(symbol: &str, date: NaiveDate, close: f64) -> DailyBar {
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

    fn seeded_adapter() -> SqliteAdapter {
        let adapter = SqliteAdapter::in_memory().unwrap();
        adapter.initialize_schema().unwrap();

        let mut bars = Vec::new();
        for symbol in ["AAPL", "MSFT"] {
            for d in 1..=6 {
                bars.push(make_bar(symbol, day(2021, 1, d), 100.0 + d as f64));
            }
        }
        adapter.insert_daily(Market::Us, &bars).unwrap();
        adapter.insert_daily_adjusted(Market::Us, &bars).unwrap();
        adapter
            .insert_daily(Market::Cn, &[make_bar("000001.SZ", day(2021, 1, 4), 12.0)])
            .unwrap();

        adapter
            .insert_calendar(
                Market::Us,
                &[
                    (day(2021, 1, 1), false),
                    (day(2021, 1, 4), true),
                    (day(2021, 1, 5), true),
                ],
            )
            .unwrap();
        adapter
            .insert_calendar(Market::Cn, &[(day(2021, 1, 4), true)])
            .unwrap();

        adapter
            .insert_basic(
                Market::Us,
                &[
                    BasicRow {
                        code: "AAPL".into(),
                        name: "Apple Inc".into(),
                        industry: "Technology".into(),
                    },
                    BasicRow {
                        code: "MSFT".into(),
                        name: "Microsoft".into(),
                        industry: "Technology".into(),
                    },
                ],
            )
            .unwrap();
        adapter
    }

    #[test]
    fn from_config_missing_path() {
        let result = SqliteAdapter::from_config(&EmptyConfig);
        match result {
            Err(MarketPanelError::ConfigMissing { section, key }) => {
                assert_eq!(section, "sqlite");
                assert_eq!(key, "path");
            }
            Err(other) => panic!("expected ConfigMissing, got: {other}"),
            Ok(_) => panic!("expected error, got Ok"),
        }
    }

    #[test]
    fn show_tables_lists_schema() {
        let adapter = seeded_adapter();
        let tables = adapter.show_tables().unwrap();
        for expected in [
            "daily",
            "us_daily",
            "us_daily_adj",
            "trade_cal",
            "us_tradecal",
            "stock_basic",
            "us_basic",
        ] {
            assert!(tables.iter().any(|t| t == expected), "missing {expected}");
        }
    }

    #[test]
    fn trade_calendar_unfiltered_and_filtered() {
        let adapter = seeded_adapter();

        let all = adapter.trade_calendar(Market::Us, None).unwrap();
        assert_eq!(all.row_count(), 3);
        assert_eq!(all.columns(), ["is_open"]);
        match all.index() {
            Index::Single { name, keys } => {
                assert_eq!(name, "cal_date");
                assert!(keys.iter().all(|k| matches!(k, Value::Timestamp(_))));
            }
            Index::Compound { .. } => panic!("expected single index"),
        }

        let open = adapter.trade_calendar(Market::Us, Some(true)).unwrap();
        assert_eq!(open.row_count(), 2);
        assert!(open.rows().iter().all(|r| r[0] == Value::Int(1)));

        let closed = adapter.trade_calendar(Market::Us, Some(false)).unwrap();
        assert_eq!(closed.row_count(), 1);

        let cn = adapter.trade_calendar(Market::Cn, None).unwrap();
        assert_eq!(cn.row_count(), 1);
    }

    #[test]
    fn stock_basic_optionally_filters_codes() {
        let adapter = seeded_adapter();

        let all = adapter.stock_basic(Market::Us, None).unwrap();
        assert_eq!(all.row_count(), 2);
        assert_eq!(all.columns(), ["name", "industry"]);

        let filter = vec!["AAPL".to_string()];
        let some = adapter.stock_basic(Market::Us, Some(&filter)).unwrap();
        assert_eq!(some.row_count(), 1);
        match some.index() {
            Index::Single { keys, .. } => assert_eq!(keys[0], Value::Text("AAPL".into())),
            Index::Compound { .. } => panic!("expected single index"),
        }
    }

    #[test]
    fn daily_single_code_all_dates() {
        let adapter = seeded_adapter();
        let req = DailyRequest::for_code("AAPL", Market::Us);
        let table = adapter.daily(&req).unwrap();
        assert_eq!(table.row_count(), 6);
        assert_eq!(
            table.columns(),
            ["open", "high", "low", "close", "volume"]
        );
    }

    #[test]
    fn daily_multi_code_with_range_is_sorted() {
        let adapter = seeded_adapter();
        let req = DailyRequest::new(vec!["MSFT".into(), "AAPL".into()], Market::Us)
            .with_range(day(2021, 1, 2), day(2021, 1, 3));
        let table = adapter.daily(&req).unwrap();
        assert_eq!(table.row_count(), 4);

        match table.index() {
            Index::Compound { names, keys } => {
                assert_eq!(names, &["symbol".to_string(), "date".to_string()]);
                // Sorted by (symbol, date) even though MSFT was requested first.
                assert_eq!(keys[0].0, Value::Text("AAPL".into()));
                assert_eq!(keys[3].0, Value::Text("MSFT".into()));
                assert!(keys[0].1.cmp_key(&keys[1].1).is_lt());
            }
            Index::Single { .. } => panic!("expected compound index"),
        }
    }

    #[test]
    fn daily_date_first_key_order() {
        let adapter = seeded_adapter();
        let req = DailyRequest::new(vec!["AAPL".into(), "MSFT".into()], Market::Us)
            .with_key_order(KeyOrder::DateFirst);
        let table = adapter.daily(&req).unwrap();
        match table.index() {
            Index::Compound { names, keys } => {
                assert_eq!(names, &["date".to_string(), "symbol".to_string()]);
                assert!(matches!(keys[0].0, Value::Timestamp(_)));
                // Both symbols appear under the first date before it advances.
                assert_eq!(keys[0].0, keys[1].0);
            }
            Index::Single { .. } => panic!("expected compound index"),
        }
    }

    #[test]
    fn daily_unknown_code_returns_empty_table() {
        let adapter = seeded_adapter();
        let req = DailyRequest::for_code("GOOG", Market::Us);
        let table = adapter.daily(&req).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn daily_requires_codes() {
        let adapter = seeded_adapter();
        let req = DailyRequest::new(vec![], Market::Us);
        assert!(matches!(
            adapter.daily(&req),
            Err(MarketPanelError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn daily_adjusted_cn_is_unsupported() {
        let adapter = seeded_adapter();
        let req = DailyRequest::for_code("000001.SZ", Market::Cn);
        assert!(matches!(
            adapter.daily_adjusted(&req),
            Err(MarketPanelError::UnsupportedMarket { .. })
        ));
    }

    #[test]
    fn daily_adjusted_us_returns_rows() {
        let adapter = seeded_adapter();
        let req = DailyRequest::for_code("AAPL", Market::Us);
        let table = adapter.daily_adjusted(&req).unwrap();
        assert_eq!(table.row_count(), 6);
    }

    #[test]
    fn symbol_first_daily_result_constructs_a_panel() {
        let adapter = seeded_adapter();
        let req = DailyRequest::new(vec!["AAPL".into(), "MSFT".into()], Market::Us);
        let table = adapter.daily(&req).unwrap();

        let panel = Panel::new(table).unwrap();
        assert_eq!(panel.symbols(), vec!["AAPL", "MSFT"]);
        assert_eq!(panel.dates().len(), 6);
        assert_eq!(panel.time_series("AAPL").unwrap().dates().len(), 6);
    }
}
