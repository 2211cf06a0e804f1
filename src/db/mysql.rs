//! MySQL driver backed by sqlx.
//!
//! sqlx is asynchronous; the adapter is not. [`MySqlDriver`] owns a current-thread
//! tokio runtime and every connection blocks on it for the duration of a call.
//! Statements go over the text protocol, so anything the server accepts as a
//! plain query (`SHOW`, `DESCRIBE`, `SET`, ...) works.

use crate::config::{ConnectionConfig, DEFAULT_CHARSET};
use crate::db::driver::{Driver, DriverConnection, DriverError, QueryOutput, RowSet};
use crate::db::quote::escape_string;
use crate::db::types::{column_names, decode_row};
use crate::error::{DbError, DbResult};
use futures_util::TryStreamExt;
use sqlx::mysql::{MySqlConnectOptions, MySqlDatabaseError};
use sqlx::{ConnectOptions, Connection, Either, Executor};
use std::sync::Arc;
use tokio::runtime::Runtime;
use tracing::debug;

/// Client error numbers used when the failure did not come from the server.
const CR_UNKNOWN_ERROR: u32 = 2000;
const CR_CONNECTION_ERROR: u32 = 2002;
const CR_CONN_HOST_ERROR: u32 = 2003;
const CR_SSL_CONNECTION_ERROR: u32 = 2026;

/// Statements that produce a result set even when it is empty.
const ROW_KEYWORDS: &[&str] = &["SELECT", "SHOW", "DESCRIBE", "DESC", "EXPLAIN", "WITH"];

#[derive(Debug, Clone)]
pub struct MySqlDriver {
    runtime: Arc<Runtime>,
}

impl MySqlDriver {
    pub fn new() -> DbResult<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| DbError::internal(format!("Failed to start driver runtime: {}", e)))?;

        Ok(Self {
            runtime: Arc::new(runtime),
        })
    }
}

impl Driver for MySqlDriver {
    type Connection = MySqlConnection;

    fn connect(&self, config: &ConnectionConfig) -> Result<MySqlConnection, DriverError> {
        let options = connect_options(config);
        let conn = self
            .runtime
            .block_on(options.connect())
            .map_err(driver_error)?;

        if config.persistent {
            debug!("Persistent connections are not pooled, opened a regular connection");
        }

        Ok(MySqlConnection {
            runtime: Arc::clone(&self.runtime),
            conn,
            last_insert_id: 0,
            last_error: String::new(),
        })
    }
}

fn connect_options(config: &ConnectionConfig) -> MySqlConnectOptions {
    let mut options = MySqlConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.user)
        .charset(DEFAULT_CHARSET);

    if !config.password.is_empty() {
        options = options.password(&config.password);
    }
    if let Some(database) = &config.database {
        options = options.database(database);
    }
    if let Some(socket) = &config.socket {
        options = options.socket(socket);
    }

    options
}

pub struct MySqlConnection {
    runtime: Arc<Runtime>,
    conn: sqlx::MySqlConnection,
    last_insert_id: u64,
    last_error: String,
}

impl std::fmt::Debug for MySqlConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MySqlConnection")
            .field("last_insert_id", &self.last_insert_id)
            .field("last_error", &self.last_error)
            .finish_non_exhaustive()
    }
}

impl MySqlConnection {
    fn run(&mut self, sql: &str) -> Result<QueryOutput, DriverError> {
        let conn = &mut self.conn;
        let items: Vec<_> = self
            .runtime
            .block_on(conn.fetch_many(sql).try_collect())
            .map_err(driver_error)?;

        let mut columns = None;
        let mut rows = Vec::new();
        let mut affected_rows = 0;
        let mut last_insert_id = 0;

        for item in items {
            match item {
                Either::Left(done) => {
                    affected_rows += done.rows_affected();
                    if done.last_insert_id() != 0 {
                        last_insert_id = done.last_insert_id();
                    }
                }
                Either::Right(row) => {
                    if columns.is_none() {
                        columns = Some(column_names(&row));
                    }
                    rows.push(decode_row(&row));
                }
            }
        }

        self.last_insert_id = last_insert_id;

        if columns.is_some() || returns_rows(sql) {
            return Ok(QueryOutput::Rows(RowSet::new(
                columns.unwrap_or_default(),
                rows,
            )));
        }
        Ok(QueryOutput::Ack {
            affected_rows,
            last_insert_id,
        })
    }
}

impl DriverConnection for MySqlConnection {
    fn query(&mut self, sql: &str) -> Result<QueryOutput, DriverError> {
        match self.run(sql) {
            Ok(output) => {
                self.last_error.clear();
                Ok(output)
            }
            Err(e) => {
                self.last_error = e.message.clone();
                Err(e)
            }
        }
    }

    fn escape(&self, value: &str) -> String {
        escape_string(value)
    }

    fn insert_id(&self) -> u64 {
        self.last_insert_id
    }

    fn error(&self) -> &str {
        &self.last_error
    }

    fn close(self) -> Result<(), DriverError> {
        self.runtime.block_on(self.conn.close()).map_err(driver_error)
    }
}

/// Whether a statement yields a result set, judged by its leading keyword.
fn returns_rows(sql: &str) -> bool {
    let trimmed = sql.trim_start();
    if trimmed.starts_with('(') {
        return true;
    }

    let keyword: String = trimmed
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect::<String>()
        .to_ascii_uppercase();
    ROW_KEYWORDS.contains(&keyword.as_str())
}

/// Map a sqlx error to the backend error number and text.
fn driver_error(err: sqlx::Error) -> DriverError {
    match err {
        sqlx::Error::Database(db) => {
            let code = db
                .try_downcast_ref::<MySqlDatabaseError>()
                .map(|e| u32::from(e.number()))
                .unwrap_or(CR_UNKNOWN_ERROR);
            DriverError::new(code, db.message())
        }
        sqlx::Error::Io(io) => {
            let code = match io.kind() {
                std::io::ErrorKind::NotFound => CR_CONNECTION_ERROR,
                _ => CR_CONN_HOST_ERROR,
            };
            DriverError::new(code, io.to_string())
        }
        sqlx::Error::Tls(e) => DriverError::new(CR_SSL_CONNECTION_ERROR, e.to_string()),
        other => DriverError::new(CR_UNKNOWN_ERROR, other.to_string()),
    }
}
