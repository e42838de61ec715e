//! Minimal labeled 2-D table.
//!
//! The query layer returns tables whose shape is only known at runtime, so
//! cells and row keys are dynamically typed [`Value`]s. The containers in
//! [`crate::domain::panel`] and friends check the index schema explicitly at
//! construction instead of trusting the producer.

use crate::domain::error::MarketPanelError;
use chrono::NaiveDateTime;
use std::cmp::Ordering;
use std::fmt;

/// A dynamically typed cell or row-key component.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Int(i64),
    Float(f64),
    Timestamp(NaiveDateTime),
    Null,
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Text(_) => "text",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Timestamp(_) => "timestamp",
            Value::Null => "null",
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            Value::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    /// Total order used when sorting rows by key. Values of different types
    /// order by type name; NaN floats sort last among floats.
    pub fn cmp_key(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => a
                .partial_cmp(b)
                .unwrap_or_else(|| a.is_nan().cmp(&b.is_nan())),
            (Value::Timestamp(a), Value::Timestamp(b)) => a.cmp(b),
            (a, b) => a.type_name().cmp(b.type_name()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{s}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S")),
            Value::Null => write!(f, ""),
        }
    }
}

/// Row labels of a [`Table`]: a single named key per row, or a compound
/// two-component key per row.
#[derive(Debug, Clone, PartialEq)]
pub enum Index {
    Single {
        name: String,
        keys: Vec<Value>,
    },
    Compound {
        names: [String; 2],
        keys: Vec<(Value, Value)>,
    },
}

impl Index {
    pub fn len(&self) -> usize {
        match self {
            Index::Single { keys, .. } => keys.len(),
            Index::Compound { keys, .. } => keys.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Short human description used in invariant-violation messages.
    pub fn describe(&self) -> String {
        match self {
            Index::Single { name, .. } => format!("single index named \"{name}\""),
            Index::Compound { names, .. } => {
                format!("compound index named (\"{}\", \"{}\")", names[0], names[1])
            }
        }
    }
}

/// A rectangular table: named columns, one row of cells per index key.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    index: Index,
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Build a table, checking that every row has one key and `columns.len()`
    /// cells.
    pub fn new(
        index: Index,
        columns: Vec<String>,
        rows: Vec<Vec<Value>>,
    ) -> Result<Self, MarketPanelError> {
        if index.len() != rows.len() {
            return Err(MarketPanelError::Shape {
                reason: format!("{} index keys but {} rows", index.len(), rows.len()),
            });
        }
        if let Some((i, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != columns.len())
        {
            return Err(MarketPanelError::Shape {
                reason: format!(
                    "row {} has {} cells, expected {}",
                    i,
                    row.len(),
                    columns.len()
                ),
            });
        }
        Ok(Self {
            index,
            columns,
            rows,
        })
    }

    pub fn index(&self) -> &Index {
        &self.index
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
