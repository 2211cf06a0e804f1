//! Integration tests for transaction functionality.

mod common;

use common::{FakeDriver, FixedSelector, topology};
use db_adapter::db::Adapter;
use db_adapter::error::DbError;

fn adapter(driver: &FakeDriver) -> Adapter<FakeDriver> {
    Adapter::with_selector(driver.clone(), topology(2), FixedSelector::new(0))
}

#[test]
fn test_begin_commit() {
    let driver = FakeDriver::new();
    let mut adapter = adapter(&driver);

    adapter.begin().unwrap();
    assert!(adapter.in_transaction());
    adapter.execute("INSERT INTO users (name) VALUES ('ann')").unwrap();
    assert!(adapter.commit().unwrap());
    assert!(!adapter.in_transaction());

    assert_eq!(
        driver.queries_on("master"),
        [
            "SET autocommit=0",
            "INSERT INTO users (name) VALUES ('ann')",
            "COMMIT",
            "SET autocommit=1",
        ]
    );
}

#[test]
fn test_begin_twice_is_silent() {
    let driver = FakeDriver::new();
    let mut adapter = adapter(&driver);

    adapter.begin().unwrap();
    adapter.begin().unwrap();

    assert!(adapter.in_transaction());
    assert_eq!(driver.queries_on("master"), ["SET autocommit=0"]);
}

#[test]
fn test_commit_without_transaction_does_nothing() {
    let driver = FakeDriver::new();
    let mut adapter = adapter(&driver);

    assert!(!adapter.commit().unwrap());
    assert!(driver.connects().is_empty());
}

#[test]
fn test_rollback_from_idle_still_runs() {
    let driver = FakeDriver::new();
    let mut adapter = adapter(&driver);

    adapter.rollback().unwrap();

    assert!(!adapter.in_transaction());
    assert_eq!(driver.queries_on("master"), ["ROLLBACK", "SET autocommit=1"]);
}

#[test]
fn test_begin_rollback() {
    let driver = FakeDriver::new();
    let mut adapter = adapter(&driver);

    adapter.begin().unwrap();
    adapter.execute("DELETE FROM users").unwrap();
    adapter.rollback().unwrap();

    assert!(!adapter.in_transaction());
    assert_eq!(
        driver.queries_on("master"),
        [
            "SET autocommit=0",
            "DELETE FROM users",
            "ROLLBACK",
            "SET autocommit=1"
        ]
    );
}

#[test]
fn test_transactions_never_touch_slaves() {
    let driver = FakeDriver::new();
    let mut adapter = adapter(&driver);

    adapter.begin().unwrap();
    adapter.commit().unwrap();
    adapter.rollback().unwrap();

    assert_eq!(driver.connects(), ["master"]);
}

#[test]
fn test_failed_commit_restores_autocommit() {
    let driver = FakeDriver::new();
    driver.fail_sql("COMMIT", 1213, "Deadlock found when trying to get lock");
    let mut adapter = adapter(&driver);

    adapter.begin().unwrap();
    let err = adapter.commit().unwrap_err();

    assert!(matches!(err, DbError::Query { ref sql, .. } if sql == "COMMIT"));
    assert!(!adapter.in_transaction());
    assert_eq!(
        driver.queries_on("master"),
        ["SET autocommit=0", "COMMIT", "SET autocommit=1"]
    );
}

#[test]
fn test_failed_begin_stays_idle() {
    let driver = FakeDriver::new();
    driver.fail_sql("SET autocommit=0", 2013, "Lost connection to MySQL server");
    let mut adapter = adapter(&driver);

    assert!(adapter.begin().is_err());
    assert!(!adapter.in_transaction());
}

#[test]
fn test_disconnect_forgets_transaction() {
    let driver = FakeDriver::new();
    let mut adapter = adapter(&driver);

    adapter.begin().unwrap();
    adapter.disconnect().unwrap();

    assert!(!adapter.in_transaction());
    assert!(!adapter.commit().unwrap());
}
