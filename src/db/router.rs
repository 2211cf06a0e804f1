//! Master/slave connection routing.
//!
//! The router owns at most one master and one slave connection. Both are opened
//! lazily on first use and kept for the router's lifetime. The slave endpoint is
//! chosen once; load spreads across router instances, not across queries.

use crate::config::{AdapterConfig, ConnectionConfig, DEFAULT_CHARSET};
use crate::db::driver::{Driver, DriverConnection};
use crate::error::{DbError, DbResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

/// Connection role a statement is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Master,
    Slave,
}

/// What the slave role resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlaveTarget {
    /// Reads share the master connection.
    Master,
    /// Reads use a dedicated connection to the slave at this index.
    Replica(usize),
}

/// Picks one slave out of `count` (always called with `count > 1`).
pub trait SlaveSelector {
    fn select(&mut self, count: usize) -> usize;
}

/// Uniform random selection.
#[derive(Debug)]
pub struct RandomSelector {
    rng: StdRng,
}

impl RandomSelector {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic selection for tests and reproducible runs.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl SlaveSelector for RandomSelector {
    fn select(&mut self, count: usize) -> usize {
        self.rng.gen_range(0..count)
    }
}

enum SlaveSlot<C> {
    Unresolved,
    Master,
    Replica { index: usize, conn: C },
}

pub struct ConnectionRouter<D: Driver> {
    driver: D,
    config: AdapterConfig,
    selector: Box<dyn SlaveSelector + Send>,
    master: Option<D::Connection>,
    slave: SlaveSlot<D::Connection>,
}

impl<D: Driver> std::fmt::Debug for ConnectionRouter<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionRouter")
            .field("replication", &self.config.replication_enabled())
            .field("slaves", &self.config.slave.len())
            .field("master_open", &self.master.is_some())
            .field("slave_target", &self.slave_target())
            .finish_non_exhaustive()
    }
}

impl<D: Driver> ConnectionRouter<D> {
    pub fn new(driver: D, config: AdapterConfig) -> Self {
        Self::with_selector(driver, config, RandomSelector::new())
    }

    pub fn with_selector(
        driver: D,
        config: AdapterConfig,
        selector: impl SlaveSelector + Send + 'static,
    ) -> Self {
        Self {
            driver,
            config,
            selector: Box::new(selector),
            master: None,
            slave: SlaveSlot::Unresolved,
        }
    }

    /// True once the master connection is open.
    pub fn is_connected(&self) -> bool {
        self.master.is_some()
    }

    /// What the slave role resolved to, `None` before its first use.
    pub fn slave_target(&self) -> Option<SlaveTarget> {
        match &self.slave {
            SlaveSlot::Unresolved => None,
            SlaveSlot::Master => Some(SlaveTarget::Master),
            SlaveSlot::Replica { index, .. } => Some(SlaveTarget::Replica(*index)),
        }
    }

    /// The open master connection, if any, without opening it.
    pub fn master_if_open(&self) -> Option<&D::Connection> {
        self.master.as_ref()
    }

    /// The master connection, opened on first call.
    pub fn master(&mut self) -> DbResult<&mut D::Connection> {
        if self.master.is_none() {
            let config = self.config.master_config();
            let conn = open(&self.driver, &config, "master")?;
            self.master = Some(conn);
        }

        self.master
            .as_mut()
            .ok_or_else(|| DbError::internal("master connection slot empty after connect"))
    }

    /// The connection used for reads, opened and pinned on first call.
    ///
    /// Without replication this is the master connection. A slave that cannot be
    /// opened fails the call and leaves the role unresolved; the master stays usable.
    pub fn slave(&mut self) -> DbResult<&mut D::Connection> {
        if matches!(self.slave, SlaveSlot::Unresolved) {
            self.slave = self.resolve_slave()?;
        }

        if !matches!(self.slave, SlaveSlot::Replica { .. }) {
            return self.master();
        }
        match &mut self.slave {
            SlaveSlot::Replica { conn, .. } => Ok(conn),
            _ => Err(DbError::internal("slave connection slot changed during routing")),
        }
    }

    /// Route to the connection for `role`.
    pub fn route(&mut self, role: Role) -> DbResult<&mut D::Connection> {
        match role {
            Role::Master => self.master(),
            Role::Slave => self.slave(),
        }
    }

    fn resolve_slave(&mut self) -> DbResult<SlaveSlot<D::Connection>> {
        if !self.config.replication_enabled() {
            debug!("Replication disabled, reads use the master connection");
            return Ok(SlaveSlot::Master);
        }

        let count = self.config.slave.len();
        let index = if count == 1 {
            0
        } else {
            self.selector.select(count).min(count - 1)
        };

        let config = self
            .config
            .slave_config(index)
            .ok_or_else(|| DbError::internal(format!("no slave configured at index {index}")))?;

        match open(&self.driver, &config, "slave") {
            Ok(conn) => {
                debug!(index, count, endpoint = %config.endpoint(), "Slave selected");
                Ok(SlaveSlot::Replica { index, conn })
            }
            Err(e) => {
                warn!(
                    index,
                    endpoint = %config.endpoint(),
                    error = %e,
                    "Slave connection failed"
                );
                Err(e)
            }
        }
    }

    /// Close every open connection. The next use reconnects and reselects.
    pub fn disconnect(&mut self) -> DbResult<()> {
        let mut first_error = None;

        let slave = std::mem::replace(&mut self.slave, SlaveSlot::Unresolved);
        if let SlaveSlot::Replica { conn, index } = slave {
            if let Err(e) = conn.close() {
                warn!(index, error = %e, "Failed to close slave connection");
                first_error = Some(e);
            }
        }

        if let Some(conn) = self.master.take() {
            if let Err(e) = conn.close() {
                warn!(error = %e, "Failed to close master connection");
                first_error = first_error.or(Some(e));
            }
        }

        info!("Disconnected");
        match first_error {
            Some(e) => Err(DbError::connection(
                format!("Failed to close connection: {}", e),
                "The connection is dropped regardless",
            )),
            None => Ok(()),
        }
    }
}

/// Open one connection and force the session charset.
fn open<D: Driver>(driver: &D, config: &ConnectionConfig, role: &str) -> DbResult<D::Connection> {
    info!(role, endpoint = %config.endpoint(), "Connecting to database");

    let mut conn = driver.connect(config).map_err(|e| DbError::connect_failed(&e))?;

    // the configured charset is ignored on purpose
    if let Err(e) = conn.set_charset(DEFAULT_CHARSET) {
        if let Err(close_err) = conn.close() {
            warn!(role, error = %close_err, "Failed to close connection after charset error");
        }
        return Err(DbError::connect_failed(&e));
    }

    info!(role, endpoint = %config.endpoint(), "Connected successfully");
    Ok(conn)
}
