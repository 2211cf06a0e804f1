//! Error types for the database adapter.
//!
//! This module defines all error types using `thiserror` for ergonomic error handling.
//! Errors are raised where the failure happens and propagate to the caller unchanged;
//! the adapter never retries on its own.

use crate::db::driver::DriverError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    /// Displays the backend error text followed by the offending statement.
    #[error("{message}\n{sql}")]
    Query { message: String, sql: String },

    #[error("Schema error: {message} (object: {object})")]
    Schema { message: String, object: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DbError {
    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a query error for the given statement.
    pub fn query(message: impl Into<String>, sql: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
            sql: sql.into(),
        }
    }

    /// Create a schema error.
    pub fn schema(message: impl Into<String>, object: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
            object: object.into(),
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Build the error raised when a driver refuses to open a connection.
    pub fn connect_failed(err: &DriverError) -> Self {
        Self::connection(
            format!("Db connection error #{}: {}", err.code, err.message),
            connect_suggestion(&err.message),
        )
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            _ => None,
        }
    }
}

/// Generate a helpful suggestion for connection errors.
fn connect_suggestion(message: &str) -> String {
    let lower = message.to_lowercase();

    if lower.contains("connection refused") || lower.contains("can't connect") {
        return "Check that the MySQL server is running and accessible".to_string();
    }
    if lower.contains("access denied") || lower.contains("password") {
        return "Verify the user and password of this connection".to_string();
    }
    if lower.contains("unknown database") {
        return "Check that the database name exists".to_string();
    }
    if lower.contains("tls") || lower.contains("ssl") {
        return "Check TLS/SSL configuration or try disabling it".to_string();
    }

    "Verify host, port and socket of this connection".to_string()
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;
