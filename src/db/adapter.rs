//! The adapter facade.
//!
//! [`Adapter`] is the single execution surface for statement builders and
//! application code. It combines the [`ConnectionRouter`] with the transaction state
//! and adds quoting and introspection helpers. Writes, DDL, introspection and
//! transactions always run on the master connection.

use crate::config::AdapterConfig;
use crate::db::driver::{Driver, DriverConnection, DriverError, QueryOutput, RowSet};
use crate::db::quote::SqlValue;
use crate::db::result::SqlResult;
use crate::db::router::{ConnectionRouter, Role, SlaveSelector, SlaveTarget};
use crate::db::schema::TableDescription;
use crate::db::transaction::{TransactionState, TxEffect, TxEvent};
use crate::error::{DbError, DbResult};
use tracing::{debug, warn};

pub struct Adapter<D: Driver> {
    router: ConnectionRouter<D>,
    transaction: TransactionState,
}

impl<D: Driver> std::fmt::Debug for Adapter<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Adapter")
            .field("router", &self.router)
            .field("transaction", &self.transaction.state())
            .finish()
    }
}

impl<D: Driver> Adapter<D> {
    /// Create an adapter. No connection is opened until first use.
    pub fn new(driver: D, config: AdapterConfig) -> Self {
        Self::from_router(ConnectionRouter::new(driver, config))
    }

    /// Create an adapter with a custom slave selection strategy.
    pub fn with_selector(
        driver: D,
        config: AdapterConfig,
        selector: impl SlaveSelector + Send + 'static,
    ) -> Self {
        Self::from_router(ConnectionRouter::with_selector(driver, config, selector))
    }

    pub fn from_router(router: ConnectionRouter<D>) -> Self {
        Self {
            router,
            transaction: TransactionState::new(),
        }
    }

    pub fn router(&self) -> &ConnectionRouter<D> {
        &self.router
    }

    /// The master connection, opened on first call.
    pub fn master(&mut self) -> DbResult<&mut D::Connection> {
        self.router.master()
    }

    /// The read connection, opened and pinned on first call.
    pub fn slave(&mut self) -> DbResult<&mut D::Connection> {
        self.router.slave()
    }

    pub fn slave_target(&self) -> Option<SlaveTarget> {
        self.router.slave_target()
    }

    // =========================================================================
    // Statement execution
    // =========================================================================

    /// Run a statement on the master (`use_master`) or the slave role.
    pub fn query(&mut self, sql: &str, use_master: bool) -> DbResult<SqlResult> {
        let role = if use_master { Role::Master } else { Role::Slave };
        let conn = self.router.route(role)?;
        run(conn, sql, role).map(SqlResult::new)
    }

    pub fn query_master(&mut self, sql: &str) -> DbResult<SqlResult> {
        self.query(sql, true)
    }

    pub fn query_slave(&mut self, sql: &str) -> DbResult<SqlResult> {
        self.query(sql, false)
    }

    /// Run a statement on the master and hand back the raw driver output.
    pub fn execute(&mut self, sql: &str) -> DbResult<QueryOutput> {
        let conn = self.router.master()?;
        run(conn, sql, Role::Master)
    }

    /// Alias of [`Adapter::execute`].
    pub fn exec(&mut self, sql: &str) -> DbResult<QueryOutput> {
        self.execute(sql)
    }

    // =========================================================================
    // Quoting
    // =========================================================================

    /// Render a value for embedding in SQL text.
    ///
    /// Only text needs the master connection (for escaping); other kinds render
    /// without connecting.
    pub fn quote_value(&mut self, value: impl Into<SqlValue>) -> DbResult<String> {
        let value = value.into();
        if !value.needs_escape() {
            return Ok(value.quote_with(&mut |s: &str| s.to_string()));
        }

        let conn = self.router.master()?;
        Ok(value.quote_with(&mut |s: &str| conn.escape(s)))
    }

    /// Identifiers are returned untouched: no escaping, no backticks.
    pub fn quote_identifier<'a>(&self, name: &'a str) -> &'a str {
        name
    }

    /// Escape a string with the master connection's escaping rules.
    pub fn escape(&mut self, value: &str) -> DbResult<String> {
        Ok(self.router.master()?.escape(value))
    }

    /// Auto-increment id of the most recent insert on the master connection.
    pub fn last_insert_id(&mut self) -> DbResult<u64> {
        Ok(self.router.master()?.insert_id())
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// Names of all tables in the master database, in server order.
    pub fn tables(&mut self) -> DbResult<Vec<String>> {
        let mut rows = self.rows("SHOW TABLES", "tables")?;

        let mut tables = Vec::with_capacity(rows.remaining());
        while let Some(row) = rows.next_row() {
            if let Some(name) = row.first().and_then(|v| v.as_text()) {
                tables.push(name);
            }
        }
        Ok(tables)
    }

    /// Columns, primary key and identity column of a table.
    pub fn describe(&mut self, table: &str) -> DbResult<TableDescription> {
        let rows = self.rows(&format!("DESCRIBE {}", table), table)?;
        TableDescription::from_rows(table, rows)
    }

    /// The `CREATE TABLE` statement the server reports for a table.
    pub fn create_table_sql(&mut self, table: &str) -> DbResult<String> {
        let mut rows = self.rows(&format!("SHOW CREATE TABLE `{}`", table), table)?;

        rows.next_row()
            .and_then(|row| row.get(1).and_then(|v| v.as_text()))
            .ok_or_else(|| DbError::schema("SHOW CREATE TABLE returned no definition", table))
    }

    fn rows(&mut self, sql: &str, object: &str) -> DbResult<RowSet> {
        self.execute(sql)?
            .into_rows()
            .ok_or_else(|| DbError::schema(format!("'{}' returned no result set", sql), object))
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    pub fn in_transaction(&self) -> bool {
        self.transaction.is_active()
    }

    /// Start a transaction by disabling autocommit on the master.
    ///
    /// Calling this inside a transaction does nothing.
    pub fn begin(&mut self) -> DbResult<()> {
        let transition = self.transaction.plan(TxEvent::Begin);
        self.perform(transition.effect)?;
        self.transaction.apply(transition);
        Ok(())
    }

    /// Commit the open transaction and restore autocommit.
    ///
    /// Returns `false` without touching the connection when no transaction is open.
    pub fn commit(&mut self) -> DbResult<bool> {
        let transition = self.transaction.plan(TxEvent::Commit);
        if transition.effect == TxEffect::None {
            debug!("Commit without an open transaction, nothing to commit");
            return Ok(false);
        }

        let outcome = self.perform(transition.effect);
        self.transaction.apply(transition);
        outcome.map(|()| true)
    }

    /// Roll back and restore autocommit. Runs even when no transaction is open.
    pub fn rollback(&mut self) -> DbResult<()> {
        let transition = self.transaction.plan(TxEvent::Rollback);
        let outcome = self.perform(transition.effect);
        self.transaction.apply(transition);
        outcome
    }

    fn perform(&mut self, effect: TxEffect) -> DbResult<()> {
        if effect == TxEffect::None {
            return Ok(());
        }

        let conn = self.router.master()?;
        match effect {
            TxEffect::None => Ok(()),
            TxEffect::DisableAutocommit => {
                debug!("Beginning transaction");
                conn.set_autocommit(false)
                    .map_err(|e| DbError::query(e.message, "SET autocommit=0"))
            }
            TxEffect::CommitAndRestore => {
                let committed = conn.commit();
                end_transaction(conn, committed, "COMMIT")
            }
            TxEffect::RollbackAndRestore => {
                let rolled_back = conn.rollback();
                end_transaction(conn, rolled_back, "ROLLBACK")
            }
        }
    }

    // =========================================================================
    // Lifecycle and diagnostics
    // =========================================================================

    /// Close all connections and forget any open transaction.
    pub fn disconnect(&mut self) -> DbResult<()> {
        self.transaction.reset();
        self.router.disconnect()
    }

    pub fn is_connected(&self) -> bool {
        self.router.is_connected()
    }

    /// Error text of the last failed statement on the master, empty if none.
    pub fn error_message(&self) -> String {
        self.router
            .master_if_open()
            .map(|conn| conn.error().to_string())
            .unwrap_or_default()
    }

    /// Always `0`: error codes are carried by [`DbError`] instead.
    pub fn error_code(&self) -> u32 {
        0
    }

    pub fn platform_name(&self) -> &'static str {
        "mysql"
    }
}

/// Restore autocommit whether or not the ending statement succeeded.
fn end_transaction<C: DriverConnection>(
    conn: &mut C,
    outcome: Result<(), DriverError>,
    statement: &str,
) -> DbResult<()> {
    debug!(statement, ok = outcome.is_ok(), "Ending transaction");

    let restored = conn.set_autocommit(true);
    outcome.map_err(|e| DbError::query(e.message, statement))?;
    restored.map_err(|e| DbError::query(e.message, "SET autocommit=1"))
}

fn run<C: DriverConnection>(conn: &mut C, sql: &str, role: Role) -> DbResult<QueryOutput> {
    debug!(sql = %sql, role = ?role, "Executing statement");

    conn.query(sql).map_err(|e| {
        warn!(sql = %sql, role = ?role, code = e.code, error = %e.message, "Statement failed");
        DbError::query(e.message, sql)
    })
}
