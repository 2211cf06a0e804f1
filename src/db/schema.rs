//! Table introspection results.

use crate::db::driver::RowSet;
use crate::error::{DbError, DbResult};
use indexmap::IndexSet;
use serde::Serialize;

/// Column summary of one table, derived from `DESCRIBE <table>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TableDescription {
    pub name: String,
    /// Every column, in table order.
    pub column: IndexSet<String>,
    /// Columns that are part of the primary key.
    pub primary: IndexSet<String>,
    /// The auto-increment column, empty when the table has none.
    pub identity: String,
}

impl TableDescription {
    /// Build a description from the rows of `DESCRIBE`.
    ///
    /// Expects the MySQL column layout (`Field`, `Type`, `Null`, `Key`, `Default`,
    /// `Extra`); key and extra flags compare case-insensitively.
    pub fn from_rows(table: &str, mut rows: RowSet) -> DbResult<Self> {
        let columns = rows.columns().clone();
        let position = |name: &str| {
            columns
                .iter()
                .position(|c| c.eq_ignore_ascii_case(name))
                .ok_or_else(|| {
                    DbError::schema(format!("DESCRIBE returned no '{}' column", name), table)
                })
        };
        let field_idx = position("Field")?;
        let key_idx = position("Key")?;
        let extra_idx = position("Extra")?;

        let mut description = TableDescription {
            name: table.to_string(),
            ..Default::default()
        };

        while let Some(row) = rows.next_row() {
            let text = |idx: usize| row.get(idx).and_then(|v| v.as_text()).unwrap_or_default();
            let field = text(field_idx);

            if text(key_idx).eq_ignore_ascii_case("pri") {
                description.primary.insert(field.clone());
            }
            if text(extra_idx).eq_ignore_ascii_case("auto_increment") {
                description.identity = field.clone();
            }
            description.column.insert(field);
        }

        Ok(description)
    }
}
