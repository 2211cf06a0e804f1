//! Scripted in-memory driver shared by the integration tests.
//!
//! Every connection records the statements it receives under its host name, so a
//! test can tell which endpoint a statement was routed to.

#![allow(dead_code)]

use db_adapter::config::{AdapterConfig, ConnectionConfig, ConnectionParams};
use db_adapter::db::quote::escape_string;
use db_adapter::db::{
    Driver, DriverConnection, DriverError, QueryOutput, RowSet, SlaveSelector, Value,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct State {
    connects: Vec<String>,
    statements: Vec<(String, String)>,
    closed: Vec<String>,
    failing_hosts: HashMap<String, DriverError>,
    failing_sql: HashMap<String, DriverError>,
    responses: HashMap<String, QueryOutput>,
}

#[derive(Debug, Clone, Default)]
pub struct FakeDriver {
    state: Arc<Mutex<State>>,
}

impl FakeDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse connections to `host` with the given error.
    pub fn fail_host(&self, host: &str, code: u32, message: &str) {
        self.lock()
            .failing_hosts
            .insert(host.to_string(), DriverError::new(code, message));
    }

    /// Fail every run of `sql`.
    pub fn fail_sql(&self, sql: &str, code: u32, message: &str) {
        self.lock()
            .failing_sql
            .insert(sql.to_string(), DriverError::new(code, message));
    }

    /// Answer `sql` with `output`. Unscripted statements get an empty acknowledgment.
    pub fn respond(&self, sql: &str, output: QueryOutput) {
        self.lock().responses.insert(sql.to_string(), output);
    }

    pub fn respond_rows(&self, sql: &str, columns: &[&str], rows: Vec<Vec<Value>>) {
        self.respond(sql, QueryOutput::Rows(rows_of(columns, rows)));
    }

    /// Hosts connected to, in order.
    pub fn connects(&self) -> Vec<String> {
        self.lock().connects.clone()
    }

    pub fn closed(&self) -> Vec<String> {
        self.lock().closed.clone()
    }

    /// Every statement run on `host`, including session setup.
    pub fn statements_on(&self, host: &str) -> Vec<String> {
        self.lock()
            .statements
            .iter()
            .filter(|(h, _)| h == host)
            .map(|(_, sql)| sql.clone())
            .collect()
    }

    /// Statements run on `host`, without the charset setup issued on connect.
    pub fn queries_on(&self, host: &str) -> Vec<String> {
        self.statements_on(host)
            .into_iter()
            .filter(|sql| !sql.starts_with("SET NAMES"))
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }
}

impl Driver for FakeDriver {
    type Connection = FakeConnection;

    fn connect(&self, config: &ConnectionConfig) -> Result<FakeConnection, DriverError> {
        let mut state = self.lock();
        state.connects.push(config.host.clone());
        if let Some(err) = state.failing_hosts.get(&config.host) {
            return Err(err.clone());
        }

        Ok(FakeConnection {
            host: config.host.clone(),
            state: Arc::clone(&self.state),
            insert_id: 0,
            error: String::new(),
        })
    }
}

#[derive(Debug)]
pub struct FakeConnection {
    host: String,
    state: Arc<Mutex<State>>,
    insert_id: u64,
    error: String,
}

impl DriverConnection for FakeConnection {
    fn query(&mut self, sql: &str) -> Result<QueryOutput, DriverError> {
        let mut state = self.state.lock().unwrap();
        state.statements.push((self.host.clone(), sql.to_string()));

        if let Some(err) = state.failing_sql.get(sql) {
            self.error = err.message.clone();
            return Err(err.clone());
        }

        let output = state
            .responses
            .get(sql)
            .cloned()
            .unwrap_or(QueryOutput::Ack {
                affected_rows: 0,
                last_insert_id: 0,
            });

        self.error.clear();
        self.insert_id = match &output {
            QueryOutput::Ack { last_insert_id, .. } => *last_insert_id,
            QueryOutput::Rows(_) => 0,
        };
        Ok(output)
    }

    fn escape(&self, value: &str) -> String {
        escape_string(value)
    }

    fn insert_id(&self) -> u64 {
        self.insert_id
    }

    fn error(&self) -> &str {
        &self.error
    }

    fn close(self) -> Result<(), DriverError> {
        self.state.lock().unwrap().closed.push(self.host.clone());
        Ok(())
    }
}

/// Always picks the same slave and counts how often it was asked.
#[derive(Debug, Clone, Default)]
pub struct FixedSelector {
    pub index: usize,
    pub calls: Arc<AtomicUsize>,
}

impl FixedSelector {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SlaveSelector for FixedSelector {
    fn select(&mut self, _count: usize) -> usize {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.index
    }
}

pub fn host(name: &str) -> ConnectionParams {
    ConnectionParams {
        host: Some(name.to_string()),
        ..Default::default()
    }
}

/// A master named `master` and slaves named `slave-0`, `slave-1`, ...
pub fn topology(slaves: usize) -> AdapterConfig {
    AdapterConfig {
        replication: true,
        defaults: ConnectionParams {
            user: Some("app".into()),
            password: Some("secret".into()),
            database: Some("shop".into()),
            ..Default::default()
        },
        master: host("master"),
        slave: (0..slaves).map(|i| host(&format!("slave-{i}"))).collect(),
    }
}

pub fn rows_of(columns: &[&str], rows: Vec<Vec<Value>>) -> RowSet {
    RowSet::new(columns.iter().map(|c| c.to_string()).collect(), rows)
}

pub fn text(s: &str) -> Value {
    Value::Text(s.to_string())
}
