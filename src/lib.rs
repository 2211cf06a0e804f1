//! DB Adapter Library
//!
//! A synchronous MySQL adapter for statement builders: reads go to a pinned slave,
//! writes, DDL and transactions to the master, with value quoting and table
//! introspection on top.

pub mod config;
pub mod db;
pub mod error;

pub use config::{AdapterConfig, Config, ConnectionConfig, ConnectionParams};
pub use db::{Adapter, MySqlDriver, SqlResult, SqlValue, TableDescription};
pub use error::{DbError, DbResult};
