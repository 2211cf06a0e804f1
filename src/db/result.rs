//! Statement results.
//!
//! A [`SqlResult`] owns the driver output of one statement. Rows are materialized on
//! [`SqlResult::fetch`], which drains the cursor: a second fetch returns nothing.

use crate::db::driver::{QueryOutput, RowSet, Value};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde_json::Value as JsonValue;
use std::str::FromStr;
use std::sync::Arc;

/// Row representation produced by a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchMode {
    /// [`Row`] values with access by column name or position.
    #[default]
    Object,
    /// JSON maps keyed by column name.
    Assoc,
}

impl FromStr for FetchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "object" | "obj" => Ok(FetchMode::Object),
            "assoc" | "array" => Ok(FetchMode::Assoc),
            other => Err(format!("Unknown fetch mode '{other}'")),
        }
    }
}

/// One fetched row.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched {
    Object(Row),
    Assoc(serde_json::Map<String, JsonValue>),
}

/// A row with access by column name or position.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<Vec<String>>,
    values: Vec<Value>,
}

impl Row {
    pub fn new(columns: Arc<Vec<String>>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Value of the first column with this name.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|idx| self.values.get(idx))
    }

    /// Value at a column position.
    pub fn get_index(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Text of a column, `None` for NULL or missing columns.
    pub fn text(&self, column: &str) -> Option<String> {
        self.get(column).and_then(Value::as_text)
    }

    /// Convert into a JSON map keyed by column name.
    pub fn to_json_map(&self) -> serde_json::Map<String, JsonValue> {
        self.columns
            .iter()
            .zip(&self.values)
            .map(|(name, value)| (name.clone(), value_to_json(value)))
            .collect()
    }
}

/// Render a cell value as JSON. Binary data is base64-encoded unless it is valid UTF-8.
pub fn value_to_json(value: &Value) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,
        Value::Int(v) => JsonValue::Number((*v).into()),
        Value::UInt(v) => JsonValue::Number((*v).into()),
        Value::Float(v) => serde_json::Number::from_f64(*v)
            .map(JsonValue::Number)
            .unwrap_or_else(|| JsonValue::String(v.to_string())),
        Value::Text(v) => JsonValue::String(v.clone()),
        Value::Bytes(bytes) => match std::str::from_utf8(bytes) {
            Ok(s) => JsonValue::String(s.to_string()),
            Err(_) => JsonValue::String(STANDARD.encode(bytes)),
        },
    }
}

#[derive(Debug)]
enum Resource {
    Rows(RowSet),
    Ack {
        affected_rows: u64,
        last_insert_id: u64,
    },
    Failed,
}

/// Result of one statement run through the adapter.
#[derive(Debug)]
pub struct SqlResult {
    resource: Resource,
}

impl SqlResult {
    pub fn new(output: QueryOutput) -> Self {
        let resource = match output {
            QueryOutput::Rows(rows) => Resource::Rows(rows),
            QueryOutput::Ack {
                affected_rows,
                last_insert_id,
            } => Resource::Ack {
                affected_rows,
                last_insert_id,
            },
        };
        Self { resource }
    }

    /// The failure sentinel, for builders that decide not to run a statement.
    pub fn failed() -> Self {
        Self {
            resource: Resource::Failed,
        }
    }

    pub fn is_valid(&self) -> bool {
        !matches!(self.resource, Resource::Failed)
    }

    /// True when the statement produced a result set.
    pub fn has_rows(&self) -> bool {
        matches!(self.resource, Resource::Rows(_))
    }

    /// Column names of the result set, empty for acknowledgments.
    pub fn columns(&self) -> Vec<String> {
        match &self.resource {
            Resource::Rows(rows) => rows.columns().to_vec(),
            _ => Vec::new(),
        }
    }

    pub fn affected_rows(&self) -> u64 {
        match self.resource {
            Resource::Ack { affected_rows, .. } => affected_rows,
            _ => 0,
        }
    }

    pub fn last_insert_id(&self) -> u64 {
        match self.resource {
            Resource::Ack { last_insert_id, .. } => last_insert_id,
            _ => 0,
        }
    }

    /// Drain every remaining row as [`Row`] values.
    pub fn fetch(&mut self) -> Vec<Row> {
        let Resource::Rows(rows) = &mut self.resource else {
            return Vec::new();
        };

        let columns = Arc::clone(rows.columns());
        let mut fetched = Vec::with_capacity(rows.remaining());
        while let Some(values) = rows.next_row() {
            fetched.push(Row::new(Arc::clone(&columns), values));
        }
        fetched
    }

    /// Drain every remaining row in the requested representation.
    pub fn fetch_mode(&mut self, mode: FetchMode) -> Vec<Fetched> {
        let rows = self.fetch();
        match mode {
            FetchMode::Object => rows.into_iter().map(Fetched::Object).collect(),
            FetchMode::Assoc => rows
                .iter()
                .map(|row| Fetched::Assoc(row.to_json_map()))
                .collect(),
        }
    }

    /// Fetch with a mode given by name.
    ///
    /// An unrecognized name yields no rows and leaves the cursor where it was.
    pub fn fetch_named(&mut self, mode: &str) -> Vec<Fetched> {
        match mode.parse::<FetchMode>() {
            Ok(mode) => self.fetch_mode(mode),
            Err(_) => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn users() -> SqlResult {
        SqlResult::new(QueryOutput::Rows(RowSet::new(
            vec!["id".into(), "name".into()],
            vec![
                vec![Value::Int(1), Value::Text("ann".into())],
                vec![Value::Int(2), Value::Null],
            ],
        )))
    }

    #[test]
    fn test_fetch_twice_returns_empty_second_time() {
        let mut result = users();
        let rows = result.fetch();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("name"), Some(&Value::Text("ann".into())));
        assert_eq!(rows[1].get_index(0), Some(&Value::Int(2)));
        assert!(rows[1].get("name").unwrap().is_null());

        assert!(result.fetch().is_empty());
    }

    #[test]
    fn test_fetch_assoc() {
        let mut result = users();
        let rows = result.fetch_mode(FetchMode::Assoc);
        let Fetched::Assoc(first) = &rows[0] else {
            panic!("expected assoc row");
        };
        assert_eq!(JsonValue::Object(first.clone()), json!({"id": 1, "name": "ann"}));
    }

    #[test]
    fn test_fetch_named_unknown_mode_is_empty_and_keeps_cursor() {
        let mut result = users();
        assert!(result.fetch_named("both").is_empty());
        assert_eq!(result.fetch_named("OBJECT").len(), 2);
        assert!(result.fetch_named("assoc").is_empty());
    }

    #[test]
    fn test_ack_result() {
        let mut result = SqlResult::new(QueryOutput::Ack {
            affected_rows: 3,
            last_insert_id: 17,
        });
        assert!(result.is_valid());
        assert!(!result.has_rows());
        assert_eq!(result.affected_rows(), 3);
        assert_eq!(result.last_insert_id(), 17);
        assert!(result.columns().is_empty());
        assert!(result.fetch().is_empty());
    }

    #[test]
    fn test_failed_sentinel() {
        let mut result = SqlResult::failed();
        assert!(!result.is_valid());
        assert!(result.fetch().is_empty());
        assert!(users().is_valid());
    }

    #[test]
    fn test_value_to_json() {
        assert_eq!(value_to_json(&Value::UInt(5)), json!(5));
        assert_eq!(value_to_json(&Value::Float(f64::NAN)), json!("NaN"));
        assert_eq!(value_to_json(&Value::Bytes(b"abc".to_vec())), json!("abc"));
        assert_eq!(value_to_json(&Value::Bytes(vec![0xff])), json!("/w=="));
    }
}
