//! PostgreSQL query adapter.
//!
//! The connection string is assembled from flat `[database]` keys
//! (host/port/user/password/dbname), or taken verbatim from
//! `connection_string` when present. Market tables are expected to use
//! DATE columns for `cal_date` / `trade_date`.

use crate::domain::error::MarketPanelError;
use crate::domain::market::{KeyOrder, Market};
use crate::domain::table::{Index, Table, Value};
use crate::ports::config_port::ConfigPort;
use crate::ports::query_port::{DailyRequest, QueryPort};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use postgres::types::{ToSql, Type};
use postgres::{Client, NoTls, Row};
use std::cell::RefCell;

pub struct PostgresAdapter {
    client: RefCell<Client>,
}

fn db_err(e: postgres::Error) -> MarketPanelError {
    MarketPanelError::Database {
        reason: e.to_string(),
    }
}

fn query_err(e: postgres::Error) -> MarketPanelError {
    MarketPanelError::DatabaseQuery {
        reason: e.to_string(),
    }
}

/// Read one cell, mapping the common SQL types onto [`Value`]. Types the
/// model does not represent come back as [`Value::Null`].
fn value_from_row(row: &Row, idx: usize) -> Result<Value, MarketPanelError> {
    let ty = row.columns()[idx].type_();
    let value = if *ty == Type::TEXT || *ty == Type::VARCHAR || *ty == Type::BPCHAR {
        row.try_get::<_, Option<String>>(idx)
            .map_err(query_err)?
            .map_or(Value::Null, Value::Text)
    } else if *ty == Type::INT2 {
        row.try_get::<_, Option<i16>>(idx)
            .map_err(query_err)?
            .map_or(Value::Null, |v| Value::Int(v as i64))
    } else if *ty == Type::INT4 {
        row.try_get::<_, Option<i32>>(idx)
            .map_err(query_err)?
            .map_or(Value::Null, |v| Value::Int(v as i64))
    } else if *ty == Type::INT8 {
        row.try_get::<_, Option<i64>>(idx)
            .map_err(query_err)?
            .map_or(Value::Null, Value::Int)
    } else if *ty == Type::FLOAT4 {
        row.try_get::<_, Option<f32>>(idx)
            .map_err(query_err)?
            .map_or(Value::Null, |v| Value::Float(v as f64))
    } else if *ty == Type::FLOAT8 {
        row.try_get::<_, Option<f64>>(idx)
            .map_err(query_err)?
            .map_or(Value::Null, Value::Float)
    } else if *ty == Type::BOOL {
        row.try_get::<_, Option<bool>>(idx)
            .map_err(query_err)?
            .map_or(Value::Null, |v| Value::Int(i64::from(v)))
    } else if *ty == Type::DATE {
        row.try_get::<_, Option<NaiveDate>>(idx)
            .map_err(query_err)?
            .map_or(Value::Null, |d| {
                Value::Timestamp(d.and_time(NaiveTime::MIN))
            })
    } else if *ty == Type::TIMESTAMP {
        row.try_get::<_, Option<NaiveDateTime>>(idx)
            .map_err(query_err)?
            .map_or(Value::Null, Value::Timestamp)
    } else if *ty == Type::TIMESTAMPTZ {
        row.try_get::<_, Option<DateTime<Utc>>>(idx)
            .map_err(query_err)?
            .map_or(Value::Null, |dt| Value::Timestamp(dt.naive_utc()))
    } else {
        Value::Null
    };
    Ok(value)
}

impl PostgresAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, MarketPanelError> {
        let connection_string = match config.get_string("database", "connection_string") {
            Some(s) => s,
            None => Self::conninfo_from_parts(config)?,
        };

        let client = Client::connect(&connection_string, NoTls).map_err(db_err)?;
        Ok(Self {
            client: RefCell::new(client),
        })
    }

    fn conninfo_from_parts(config: &dyn ConfigPort) -> Result<String, MarketPanelError> {
        let get = |key: &str| {
            config
                .get_string("database", key)
                .ok_or_else(|| MarketPanelError::ConfigMissing {
                    section: "database".into(),
                    key: key.into(),
                })
        };
        let host = get("host")?;
        let user = get("user")?;
        let password = get("password")?;
        let dbname = get("dbname")?;
        let port = config.get_int("database", "port", 5432);

        Ok(format!(
            "host={host} port={port} user={user} password={password} dbname={dbname}"
        ))
    }

    fn fetch_single_indexed(
        &self,
        sql: &str,
        sql_params: &[&(dyn ToSql + Sync)],
        index_col: &str,
    ) -> Result<Table, MarketPanelError> {
        let rows = self
            .client
            .borrow_mut()
            .query(sql, sql_params)
            .map_err(query_err)?;

        let mut keys = Vec::new();
        let mut data = Vec::new();
        let mut columns: Vec<String> = Vec::new();
        let mut index_pos: Option<usize> = None;

        for (n, row) in rows.iter().enumerate() {
            if n == 0 {
                index_pos = row
                    .columns()
                    .iter()
                    .position(|c| c.name() == index_col);
                if index_pos.is_none() {
                    return Err(MarketPanelError::DatabaseQuery {
                        reason: format!("result has no \"{index_col}\" column"),
                    });
                }
                columns = row
                    .columns()
                    .iter()
                    .filter(|c| c.name() != index_col)
                    .map(|c| c.name().to_string())
                    .collect();
            }
            let index_pos = index_pos.unwrap_or(0);
            let mut cells = Vec::with_capacity(row.len().saturating_sub(1));
            for i in 0..row.len() {
                let value = value_from_row(row, i)?;
                if i == index_pos {
                    keys.push(value);
                } else {
                    cells.push(value);
                }
            }
            data.push(cells);
        }

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

        let placeholders = (1..=req.codes.len())
            .map(|n| format!("${n}"))
            .collect::<Vec<_>>()
            .join(", ");
        let mut sql = format!("SELECT * FROM {table} WHERE ts_code IN ({placeholders})");
        let mut sql_params: Vec<&(dyn ToSql + Sync)> = req
            .codes
            .iter()
            .map(|c| c as &(dyn ToSql + Sync))
            .collect();
        if let Some(start) = req.start.as_ref() {
            sql.push_str(&format!(" AND trade_date >= ${}", sql_params.len() + 1));
            sql_params.push(start);
        }
        if let Some(end) = req.end.as_ref() {
            sql.push_str(&format!(" AND trade_date <= ${}", sql_params.len() + 1));
            sql_params.push(end);
        }

        let rows = self
            .client
            .borrow_mut()
            .query(&sql, &sql_params)
            .map_err(query_err)?;

        let mut keyed: Vec<((Value, Value), Vec<Value>)> = Vec::new();
        let mut columns: Vec<String> = Vec::new();

        for (n, row) in rows.iter().enumerate() {
            let code_pos = row.columns().iter().position(|c| c.name() == "ts_code");
            let date_pos = row.columns().iter().position(|c| c.name() == "trade_date");
            let (Some(code_pos), Some(date_pos)) = (code_pos, date_pos) else {
                return Err(MarketPanelError::DatabaseQuery {
                    reason: "result lacks ts_code / trade_date columns".into(),
                });
            };
            if n == 0 {
                columns = row
                    .columns()
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != code_pos && *i != date_pos)
                    .map(|(_, c)| c.name().to_string())
                    .collect();
            }

            let mut symbol = Value::Null;
            let mut date = Value::Null;
            let mut cells = Vec::with_capacity(row.len().saturating_sub(2));
            for i in 0..row.len() {
                let value = value_from_row(row, i)?;
                if i == code_pos {
                    symbol = value;
                } else if i == date_pos {
                    date = value;
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

impl QueryPort for PostgresAdapter {
    fn show_tables(&self) -> Result<Vec<String>, MarketPanelError> {
        let rows = self
            .client
            .borrow_mut()
            .query(
                "SELECT table_name FROM information_schema.tables
                 WHERE table_schema = 'public' ORDER BY table_name",
                &[],
            )
            .map_err(query_err)?;
        Ok(rows.into_iter().map(|row| row.get(0)).collect())
    }

    fn trade_calendar(
        &self,
        market: Market,
        is_open: Option<bool>,
    ) -> Result<Table, MarketPanelError> {
        let mut sql = format!("SELECT * FROM {}", market.calendar_table());
        let flag = is_open.map(i64::from);
        let mut sql_params: Vec<&(dyn ToSql + Sync)> = Vec::new();
        if let Some(flag) = flag.as_ref() {
            sql.push_str(" WHERE is_open = $1");
            sql_params.push(flag);
        }
        self.fetch_single_indexed(&sql, &sql_params, "cal_date")
    }

    fn stock_basic(
        &self,
        market: Market,
        codes: Option<&[String]>,
    ) -> Result<Table, MarketPanelError> {
        let mut sql = format!("SELECT * FROM {}", market.basic_table());
        let mut sql_params: Vec<&(dyn ToSql + Sync)> = Vec::new();
        if let Some(codes) = codes {
            let placeholders = (1..=codes.len())
                .map(|n| format!("${n}"))
                .collect::<Vec<_>>()
                .join(", ");
            sql.push_str(&format!(" WHERE ts_code IN ({placeholders})"));
            sql_params.extend(codes.iter().map(|c| c as &(dyn ToSql + Sync)));
        }
        self.fetch_single_indexed(&sql, &sql_params, "ts_code")
    }

    fn daily(&self, req: &DailyRequest) -> Result<Table, MarketPanelError> {
        self.fetch_daily(req.market.daily_table(), req)
    }

    fn daily_adjusted(&self, req: &DailyRequest) -> Result<Table, MarketPanelError> {
        self.fetch_daily(req.market.daily_adjusted_table()?, req)
    }
}
