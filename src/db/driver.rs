//! Driver boundary.
//!
//! The adapter never talks to a wire protocol itself. It opens connections through a
//! [`Driver`] and issues statements through the [`DriverConnection`] it gets back. Every
//! call is synchronous and blocks until the backend answers.

use crate::config::ConnectionConfig;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

/// Failure reported by a driver.
///
/// `code` is the backend error number (MySQL `errno`); it is non-zero for every
/// connect failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverError {
    pub code: u32,
    pub message: String,
}

impl DriverError {
    pub fn new(code: u32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}: {}", self.code, self.message)
    }
}

impl std::error::Error for DriverError {}

/// A single cell value read from the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

impl Value {
    /// Textual form of the value, if it has one.
    ///
    /// Binary cells are accepted when they hold valid UTF-8, since MySQL reports some
    /// metadata columns (`SHOW TABLES` on older servers) as `VARBINARY`.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Int(v) => Some(v.to_string()),
            Value::UInt(v) => Some(v.to_string()),
            Value::Float(v) => Some(v.to_string()),
            Value::Text(v) => Some(v.clone()),
            Value::Bytes(v) => String::from_utf8(v.clone()).ok(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

/// Forward-only cursor over the rows of one result set.
#[derive(Debug, Clone, Default)]
pub struct RowSet {
    columns: Arc<Vec<String>>,
    rows: VecDeque<Vec<Value>>,
}

impl RowSet {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self {
            columns: Arc::new(columns),
            rows: rows.into(),
        }
    }

    pub fn columns(&self) -> &Arc<Vec<String>> {
        &self.columns
    }

    /// Rows not yet consumed.
    pub fn remaining(&self) -> usize {
        self.rows.len()
    }

    /// Take the next row, advancing the cursor.
    pub fn next_row(&mut self) -> Option<Vec<Value>> {
        self.rows.pop_front()
    }
}

/// Raw outcome of one statement.
#[derive(Debug, Clone)]
pub enum QueryOutput {
    /// The statement produced a result set (`SELECT`, `SHOW`, `DESCRIBE`, ...).
    Rows(RowSet),
    /// The statement only acknowledged (`INSERT`, `UPDATE`, `DELETE`, DDL, ...).
    Ack {
        affected_rows: u64,
        last_insert_id: u64,
    },
}

impl QueryOutput {
    pub fn into_rows(self) -> Option<RowSet> {
        match self {
            QueryOutput::Rows(rows) => Some(rows),
            QueryOutput::Ack { .. } => None,
        }
    }
}

/// Opens physical connections.
pub trait Driver {
    type Connection: DriverConnection;

    /// Open a connection to the endpoint described by `config`.
    fn connect(&self, config: &ConnectionConfig) -> Result<Self::Connection, DriverError>;
}

/// One open physical connection.
pub trait DriverConnection {
    /// Run a statement as plain text.
    fn query(&mut self, sql: &str) -> Result<QueryOutput, DriverError>;

    /// Escape a string for embedding between single quotes.
    fn escape(&self, value: &str) -> String;

    /// Auto-increment id generated by the most recent insert on this connection.
    fn insert_id(&self) -> u64;

    /// Error text of the most recent failed statement, empty when none failed.
    fn error(&self) -> &str;

    fn set_charset(&mut self, charset: &str) -> Result<(), DriverError> {
        self.query(&format!("SET NAMES {charset}")).map(drop)
    }

    fn set_autocommit(&mut self, enabled: bool) -> Result<(), DriverError> {
        let flag = if enabled { 1 } else { 0 };
        self.query(&format!("SET autocommit={flag}")).map(drop)
    }

    fn commit(&mut self) -> Result<(), DriverError> {
        self.query("COMMIT").map(drop)
    }

    fn rollback(&mut self) -> Result<(), DriverError> {
        self.query("ROLLBACK").map(drop)
    }

    /// Close the connection. The handle is unusable afterwards.
    fn close(self) -> Result<(), DriverError>
    where
        Self: Sized;
}
