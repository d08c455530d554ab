//! SQL values and parameter handling.
//!
//! Values are always sent as bound parameters. The only place a value is
//! rendered into SQL text is a DDL default, see [`SqlValue::to_sql_inline`].

use serde_json::{Map, Number, Value};

use crate::error::{BuildError, Result};

/// A SQL value that can be used as a parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// NULL value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Float value.
    Float(f64),
    /// Text value.
    Text(String),
    /// Binary blob value.
    Blob(Vec<u8>),
}

/// Ordered column/value pairs for INSERT and UPDATE.
pub type Values = Vec<(String, SqlValue)>;

impl SqlValue {
    /// Returns the SQL representation for inline use (escaped).
    ///
    /// **Warning**: only DDL defaults are rendered this way. Everything else
    /// is parameterized.
    #[must_use]
    pub fn to_sql_inline(&self) -> String {
        match self {
            Self::Null => String::from("NULL"),
            Self::Bool(b) => {
                if *b {
                    String::from("TRUE")
                } else {
                    String::from("FALSE")
                }
            }
            Self::Int(n) => format!("{n}"),
            Self::Float(f) => format!("{f}"),
            Self::Text(s) => {
                let escaped = s.replace('\'', "''");
                format!("'{escaped}'")
            }
            Self::Blob(b) => {
                let hex: String = b.iter().map(|byte| format!("{byte:02X}")).collect();
                format!("X'{hex}'")
            }
        }
    }

    /// Returns `true` for [`SqlValue::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Converts a JSON value into a bindable value.
    ///
    /// Objects and arrays are stored as their JSON text.
    #[must_use]
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => n
                .as_i64()
                .map_or_else(|| Self::Float(n.as_f64().unwrap_or(f64::NAN)), Self::Int),
            Value::String(s) => Self::Text(s.clone()),
            Value::Array(_) | Value::Object(_) => Self::Text(value.to_string()),
        }
    }

    /// Converts the value back into JSON.
    ///
    /// Non-finite floats become `null`; blobs become arrays of bytes.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Int(n) => Value::Number(Number::from(*n)),
            Self::Float(f) => Number::from_f64(*f).map_or(Value::Null, Value::Number),
            Self::Text(s) => Value::String(s.clone()),
            Self::Blob(b) => Value::Array(b.iter().map(|byte| Value::from(*byte)).collect()),
        }
    }
}

/// Flattens a JSON object into column/value pairs, keeping key order.
///
/// Anything other than an object is rejected; a row must name its columns.
pub fn values_from_json(value: &Value) -> Result<Values> {
    let Value::Object(map) = value else {
        return Err(BuildError::invalid(format!(
            "expected a JSON object, found {}",
            json_kind(value)
        )));
    };
    Ok(values_from_map(map))
}

/// Flattens an already-decoded JSON object.
#[must_use]
pub fn values_from_map(map: &Map<String, Value>) -> Values {
    map.iter()
        .map(|(k, v)| (k.clone(), SqlValue::from_json(v)))
        .collect()
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Trait for types that can be converted to SQL values.
pub trait ToSqlValue {
    /// Converts the value to a `SqlValue`.
    fn to_sql_value(self) -> SqlValue;
}

impl ToSqlValue for SqlValue {
    fn to_sql_value(self) -> SqlValue {
        self
    }
}

impl ToSqlValue for bool {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Bool(self)
    }
}

impl ToSqlValue for i64 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Int(self)
    }
}

impl ToSqlValue for i32 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Int(i64::from(self))
    }
}

impl ToSqlValue for i16 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Int(i64::from(self))
    }
}

impl ToSqlValue for u32 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Int(i64::from(self))
    }
}

impl ToSqlValue for u16 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Int(i64::from(self))
    }
}

impl ToSqlValue for u8 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Int(i64::from(self))
    }
}

impl ToSqlValue for f64 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Float(self)
    }
}

impl ToSqlValue for f32 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Float(f64::from(self))
    }
}

impl ToSqlValue for String {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Text(self)
    }
}

impl ToSqlValue for &str {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Text(String::from(self))
    }
}

impl ToSqlValue for &String {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Text(self.clone())
    }
}

impl ToSqlValue for Vec<u8> {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Blob(self)
    }
}

impl ToSqlValue for &[u8] {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Blob(self.to_vec())
    }
}

impl ToSqlValue for Value {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::from_json(&self)
    }
}

impl ToSqlValue for &Value {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::from_json(self)
    }
}

impl<T: ToSqlValue> ToSqlValue for Option<T> {
    fn to_sql_value(self) -> SqlValue {
        match self {
            Some(v) => v.to_sql_value(),
            None => SqlValue::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_inline_escaping() {
        assert_eq!(SqlValue::Null.to_sql_inline(), "NULL");
        assert_eq!(SqlValue::Int(42).to_sql_inline(), "42");
        assert_eq!(
            SqlValue::Text(String::from("it's")).to_sql_inline(),
            "'it''s'"
        );
        assert_eq!(
            SqlValue::Text(String::from("'; DROP TABLE users; --")).to_sql_inline(),
            "'''; DROP TABLE users; --'"
        );
        assert_eq!(SqlValue::Blob(vec![0xDE, 0xAD]).to_sql_inline(), "X'DEAD'");
    }

    #[test]
    fn test_to_sql_value() {
        assert_eq!(true.to_sql_value(), SqlValue::Bool(true));
        assert_eq!(42i32.to_sql_value(), SqlValue::Int(42));
        assert_eq!("hello".to_sql_value(), SqlValue::Text(String::from("hello")));
        assert_eq!(None::<i32>.to_sql_value(), SqlValue::Null);
        assert_eq!(Some(7u8).to_sql_value(), SqlValue::Int(7));
    }

    #[test]
    fn test_from_json() {
        assert_eq!(SqlValue::from_json(&json!(null)), SqlValue::Null);
        assert_eq!(SqlValue::from_json(&json!(5)), SqlValue::Int(5));
        assert_eq!(SqlValue::from_json(&json!(1.5)), SqlValue::Float(1.5));
        assert_eq!(
            SqlValue::from_json(&json!({"a": 1})),
            SqlValue::Text(String::from("{\"a\":1}"))
        );
    }

    #[test]
    fn test_to_json() {
        assert_eq!(SqlValue::Int(5).to_json(), json!(5));
        assert_eq!(SqlValue::Float(f64::NAN).to_json(), Value::Null);
        assert_eq!(SqlValue::Blob(vec![1, 2]).to_json(), json!([1, 2]));
    }

    #[test]
    fn test_values_from_json() {
        let values = values_from_json(&json!({"name": "Ann", "age": 30})).unwrap();
        assert_eq!(
            values,
            vec![
                (String::from("age"), SqlValue::Int(30)),
                (String::from("name"), SqlValue::Text(String::from("Ann"))),
            ]
        );
    }

    #[test]
    fn test_values_from_json_rejects_non_objects() {
        let err = values_from_json(&json!([1, 2])).unwrap_err();
        assert!(matches!(err, BuildError::InvalidArgument(_)));
    }
}
