//! Value quoting for statement builders.
//!
//! [`SqlValue`] is the closed set of value kinds a builder can hand to the adapter.
//! Each kind has exactly one rendering rule; only text is escaped and quoted.

use std::fmt;

/// A numeric literal rendered without quotes.
#[derive(Debug, Clone, PartialEq)]
pub enum Number {
    Int(i64),
    UInt(u64),
    Float(f64),
    /// Decimal literal kept verbatim, e.g. `"19.99"` or `"-3e5"`.
    Decimal(String),
}

impl Number {
    /// Accept a string as a numeric literal if it parses as one.
    pub fn parse(s: &str) -> Option<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.parse::<f64>().ok()?.is_nan() {
            return None;
        }
        // reject spellings f64 accepts but SQL does not
        if trimmed.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') {
            return None;
        }
        Some(Number::Decimal(trimmed.to_string()))
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(v) => write!(f, "{v}"),
            Number::UInt(v) => write!(f, "{v}"),
            Number::Float(v) if v.is_finite() => write!(f, "{v}"),
            Number::Float(_) => f.write_str("NULL"),
            Number::Decimal(v) => f.write_str(v),
        }
    }
}

/// A value to be embedded in SQL text.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Number(Number),
    Text(String),
    Sequence(Vec<SqlValue>),
    /// Raw SQL fragment passed through untouched, e.g. `NOW()`.
    Other(String),
}

impl SqlValue {
    /// Render the value, escaping text with `escape`.
    ///
    /// Sequences render each element with the same rules, joined by `, `.
    pub fn quote_with<F>(&self, escape: &mut F) -> String
    where
        F: FnMut(&str) -> String,
    {
        match self {
            SqlValue::Bool(true) => "1".to_string(),
            SqlValue::Bool(false) => "0".to_string(),
            SqlValue::Null => "NULL".to_string(),
            SqlValue::Sequence(items) => items
                .iter()
                .map(|item| item.quote_with(escape))
                .collect::<Vec<_>>()
                .join(", "),
            SqlValue::Text(s) => format!("'{}'", escape(s)),
            SqlValue::Number(n) => n.to_string(),
            SqlValue::Other(raw) => raw.clone(),
        }
    }

    /// True if rendering needs the escaping primitive.
    pub fn needs_escape(&self) -> bool {
        match self {
            SqlValue::Text(_) => true,
            SqlValue::Sequence(items) => items.iter().any(SqlValue::needs_escape),
            _ => false,
        }
    }
}

macro_rules! impl_number_from {
    ($($ty:ty => $variant:ident as $target:ty),+ $(,)?) => {
        $(
            impl From<$ty> for SqlValue {
                fn from(v: $ty) -> Self {
                    SqlValue::Number(Number::$variant(v as $target))
                }
            }
        )+
    };
}

impl_number_from!(
    i8 => Int as i64,
    i16 => Int as i64,
    i32 => Int as i64,
    i64 => Int as i64,
    u8 => UInt as u64,
    u16 => UInt as u64,
    u32 => UInt as u64,
    u64 => UInt as u64,
);

// SQL has no NaN or infinity literal.
impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        if v.is_finite() {
            SqlValue::Number(Number::Float(v))
        } else {
            SqlValue::Null
        }
    }
}

// Rendered from its own digits; widening to f64 would print binary noise.
impl From<f32> for SqlValue {
    fn from(v: f32) -> Self {
        if v.is_finite() {
            SqlValue::Number(Number::Decimal(v.to_string()))
        } else {
            SqlValue::Null
        }
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<Number> for SqlValue {
    fn from(v: Number) -> Self {
        SqlValue::Number(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(SqlValue::Null, Into::into)
    }
}

impl<T: Into<SqlValue>> From<Vec<T>> for SqlValue {
    fn from(v: Vec<T>) -> Self {
        SqlValue::Sequence(v.into_iter().map(Into::into).collect())
    }
}

/// Escape a string the way MySQL's `real_escape_string` does.
///
/// Assumes the session is not running with `NO_BACKSLASH_ESCAPES`.
pub fn escape_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 2);
    for ch in s.chars() {
        match ch {
            '\0' => result.push_str("\\0"),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\\' => result.push_str("\\\\"),
            '\'' => result.push_str("\\'"),
            '"' => result.push_str("\\\""),
            '\x1a' => result.push_str("\\Z"),
            _ => result.push(ch),
        }
    }
    result
}
