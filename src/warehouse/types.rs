//! Request and result types exchanged with the query service.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A named `STRING` parameter bound to an `@name` placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryParameter {
    pub name: String,
    pub value: String,
}

impl QueryParameter {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A statement body plus its bindings, submitted as one job.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryRequest {
    pub sql: String,
    pub params: Vec<QueryParameter>,
}

impl QueryRequest {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Adds a parameter binding.
    pub fn bind(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push(QueryParameter::new(name, value));
        self
    }

    /// Looks up a bound value by placeholder name (without the `@`).
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.value.as_str())
    }
}

/// Everything a finished job returned.
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    /// Column metadata for the result set.
    pub columns: Vec<ColumnInfo>,

    /// Rows of data, in the order the service returned them.
    pub rows: Vec<Row>,

    /// Rows touched by a DML statement, when the service reports it.
    pub affected_rows: Option<u64>,

    /// Identifier of the job that produced this result.
    pub job_id: Option<String>,

    /// Wall-clock time from submission to completion.
    pub execution_time: Duration,
}

impl QueryResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// A SELECT-style result.
    pub fn with_data(columns: Vec<ColumnInfo>, rows: Vec<Row>) -> Self {
        Self {
            columns,
            rows,
            ..Self::default()
        }
    }

    pub fn with_affected_rows(mut self, affected: u64) -> Self {
        self.affected_rows = Some(affected);
        self
    }

    pub fn with_execution_time(mut self, duration: Duration) -> Self {
        self.execution_time = duration;
        self
    }

    /// True when no rows came back.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the position of the named column.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Returns the value of `column` in `row`, or `None` if either is out of range.
    pub fn value<'a>(&'a self, row: &'a Row, column: &str) -> Option<&'a Value> {
        self.column_index(column).and_then(|i| row.get(i))
    }
}

/// Name and service-reported type of a result column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,

    /// Column data type as reported by the service (e.g. `STRING`, `INTEGER`).
    pub data_type: String,
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }
}

/// Cells in column order.
pub type Row = Vec<Value>;

/// One decoded cell.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    /// `INTEGER`/`INT64` columns.
    Int(i64),
    Float(f64),
    /// `STRING` columns and any type without a dedicated variant.
    String(String),
}

impl Value {
    /// Returns the string contents, or `None` for NULL and non-string values.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the value as an unsigned integer if it is a non-negative integer.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Int(i) => u64::try_from(*i).ok(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Value::Null,
        }
    }
}
