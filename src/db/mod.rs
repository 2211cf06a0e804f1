//! Database abstraction layer.
//!
//! This module provides the adapter and everything underneath it:
//! - The driver boundary and the sqlx-backed MySQL driver
//! - Master/slave connection routing
//! - Transaction state
//! - Value quoting
//! - Statement results and table introspection
//! - Type mappings

pub mod adapter;
pub mod driver;
pub mod mysql;
pub mod quote;
pub mod result;
pub mod router;
pub mod schema;
pub mod transaction;
pub mod types;

pub use adapter::Adapter;
pub use driver::{Driver, DriverConnection, DriverError, QueryOutput, RowSet, Value};
pub use mysql::{MySqlConnection, MySqlDriver};
pub use quote::{Number, SqlValue};
pub use result::{FetchMode, Fetched, Row, SqlResult};
pub use router::{ConnectionRouter, RandomSelector, Role, SlaveSelector, SlaveTarget};
pub use schema::TableDescription;
pub use transaction::{TransactionState, TxEffect, TxEvent, TxState};
