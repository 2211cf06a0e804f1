//! MySQL column type mappings.
//!
//! Type conversion uses a two-phase approach:
//! 1. `TypeCategory` classifies the column type reported by the server
//! 2. The decoder extracts the cell into a driver [`Value`] for that category
//!
//! Anything the decoder cannot read as its category falls back to text, then to
//! raw bytes, so a row never loses a column.

use crate::db::driver::Value;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::mysql::{MySqlRow, MySqlTypeInfo, MySqlValueRef};
use sqlx::{Column, Decode, Row, Type, TypeInfo};

// =============================================================================
// Type Classification
// =============================================================================

/// Logical category for MySQL column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Integer,
    Unsigned,
    Float,
    Decimal,
    Boolean,
    Temporal,
    Text,
    Binary,
}

/// Classify a MySQL type name (as reported by the server) into a logical category.
pub fn categorize_type(type_name: &str) -> TypeCategory {
    let lower = type_name.to_lowercase();

    // Decimal/Numeric - check first as it overlaps with "numeric" in float checks
    if lower.contains("decimal") || lower.contains("numeric") {
        return TypeCategory::Decimal;
    }

    if lower == "bool" || lower == "boolean" {
        return TypeCategory::Boolean;
    }

    if lower.contains("int") || lower == "bit" || lower == "year" {
        if lower.contains("unsigned") || lower == "bit" || lower == "year" {
            return TypeCategory::Unsigned;
        }
        return TypeCategory::Integer;
    }

    if lower.contains("float") || lower.contains("double") || lower == "real" {
        return TypeCategory::Float;
    }

    if lower == "date" || lower == "time" || lower == "datetime" || lower == "timestamp" {
        return TypeCategory::Temporal;
    }

    if lower.contains("blob") || lower.contains("binary") || lower == "geometry" {
        return TypeCategory::Binary;
    }

    // varchar, char, text, enum, set, json, ...
    TypeCategory::Text
}

// =============================================================================
// Decimal Type Support
// =============================================================================

/// Wrapper type for raw DECIMAL/NUMERIC values as strings.
/// This preserves the exact database representation.
#[derive(Debug)]
pub struct RawDecimal(pub String);

impl Type<sqlx::MySql> for RawDecimal {
    fn type_info() -> MySqlTypeInfo {
        <String as Type<sqlx::MySql>>::type_info()
    }

    fn compatible(ty: &MySqlTypeInfo) -> bool {
        let name = ty.name().to_lowercase();
        name.contains("decimal") || name.contains("numeric")
    }
}

impl<'r> Decode<'r, sqlx::MySql> for RawDecimal {
    fn decode(value: MySqlValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as Decode<sqlx::MySql>>::decode(value)?;
        Ok(RawDecimal(s.to_string()))
    }
}

// =============================================================================
// Row Decoding
// =============================================================================

/// Column names of a row, in select order.
pub fn column_names(row: &MySqlRow) -> Vec<String> {
    row.columns().iter().map(|c| c.name().to_string()).collect()
}

/// Decode every cell of a row.
pub fn decode_row(row: &MySqlRow) -> Vec<Value> {
    row.columns()
        .iter()
        .enumerate()
        .map(|(idx, col)| decode_column(row, idx, categorize_type(col.type_info().name())))
        .collect()
}

fn decode_column(row: &MySqlRow, idx: usize, category: TypeCategory) -> Value {
    let decoded = match category {
        TypeCategory::Decimal => decode_decimal(row, idx),
        TypeCategory::Integer => decode_integer(row, idx),
        TypeCategory::Unsigned => decode_unsigned(row, idx),
        TypeCategory::Boolean => decode_boolean(row, idx),
        TypeCategory::Float => decode_float(row, idx),
        TypeCategory::Temporal => decode_temporal(row, idx),
        TypeCategory::Binary => decode_bytes(row, idx),
        TypeCategory::Text => None,
    };

    decoded
        .or_else(|| decode_text(row, idx))
        .or_else(|| decode_bytes(row, idx))
        .unwrap_or_else(|| {
            tracing::warn!(column = idx, ?category, "Failed to decode column, using NULL");
            Value::Null
        })
}

fn decode_decimal(row: &MySqlRow, idx: usize) -> Option<Value> {
    match row.try_get::<Option<RawDecimal>, _>(idx) {
        Ok(v) => Some(v.map(|d| Value::Text(d.0)).unwrap_or(Value::Null)),
        Err(e) => {
            tracing::debug!("Failed to decode DECIMAL: {:?}", e);
            None
        }
    }
}

fn decode_integer(row: &MySqlRow, idx: usize) -> Option<Value> {
    if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
        return Some(v.map(Value::Int).unwrap_or(Value::Null));
    }
    if let Ok(v) = row.try_get::<Option<i32>, _>(idx) {
        return Some(v.map(|v| Value::Int(v.into())).unwrap_or(Value::Null));
    }
    if let Ok(v) = row.try_get::<Option<i16>, _>(idx) {
        return Some(v.map(|v| Value::Int(v.into())).unwrap_or(Value::Null));
    }
    if let Ok(v) = row.try_get::<Option<i8>, _>(idx) {
        return Some(v.map(|v| Value::Int(v.into())).unwrap_or(Value::Null));
    }
    decode_unsigned(row, idx)
}

fn decode_unsigned(row: &MySqlRow, idx: usize) -> Option<Value> {
    if let Ok(v) = row.try_get::<Option<u64>, _>(idx) {
        return Some(v.map(Value::UInt).unwrap_or(Value::Null));
    }
    if let Ok(v) = row.try_get::<Option<u32>, _>(idx) {
        return Some(v.map(|v| Value::UInt(v.into())).unwrap_or(Value::Null));
    }
    if let Ok(v) = row.try_get::<Option<u16>, _>(idx) {
        return Some(v.map(|v| Value::UInt(v.into())).unwrap_or(Value::Null));
    }
    if let Ok(v) = row.try_get::<Option<u8>, _>(idx) {
        return Some(v.map(|v| Value::UInt(v.into())).unwrap_or(Value::Null));
    }
    None
}

// MySQL has no boolean storage; TINYINT(1) reads back as 0/1.
fn decode_boolean(row: &MySqlRow, idx: usize) -> Option<Value> {
    row.try_get::<Option<bool>, _>(idx)
        .ok()
        .map(|v| v.map(|b| Value::Int(b.into())).unwrap_or(Value::Null))
        .or_else(|| decode_integer(row, idx))
}

fn decode_float(row: &MySqlRow, idx: usize) -> Option<Value> {
    if let Ok(v) = row.try_get::<Option<f64>, _>(idx) {
        return Some(v.map(Value::Float).unwrap_or(Value::Null));
    }
    if let Ok(v) = row.try_get::<Option<f32>, _>(idx) {
        return Some(v.map(|v| Value::Float(v.into())).unwrap_or(Value::Null));
    }
    None
}

/// Dates and times come back in the server's text layout.
fn decode_temporal(row: &MySqlRow, idx: usize) -> Option<Value> {
    fn text<T>(v: Option<T>, render: impl Fn(T) -> String) -> Value {
        v.map(|v| Value::Text(render(v))).unwrap_or(Value::Null)
    }

    if let Ok(v) = row.try_get::<Option<NaiveDateTime>, _>(idx) {
        return Some(text(v, |v| v.format("%Y-%m-%d %H:%M:%S").to_string()));
    }
    if let Ok(v) = row.try_get::<Option<DateTime<Utc>>, _>(idx) {
        return Some(text(v, |v| v.format("%Y-%m-%d %H:%M:%S").to_string()));
    }
    if let Ok(v) = row.try_get::<Option<NaiveDate>, _>(idx) {
        return Some(text(v, |v| v.format("%Y-%m-%d").to_string()));
    }
    if let Ok(v) = row.try_get::<Option<NaiveTime>, _>(idx) {
        return Some(text(v, |v| v.format("%H:%M:%S").to_string()));
    }
    None
}

fn decode_text(row: &MySqlRow, idx: usize) -> Option<Value> {
    row.try_get::<Option<String>, _>(idx)
        .ok()
        .map(|v| v.map(Value::Text).unwrap_or(Value::Null))
}

fn decode_bytes(row: &MySqlRow, idx: usize) -> Option<Value> {
    row.try_get::<Option<Vec<u8>>, _>(idx)
        .ok()
        .map(|v| v.map(Value::Bytes).unwrap_or(Value::Null))
}
