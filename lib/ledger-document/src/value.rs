//! Tagged field values.

use serde_json::{Map, Number, Value as JsonValue};

use crate::{LedgerError, Strut};

/// A document in its plain associative form, as exchanged with gateways.
pub type Snapshot = Map<String, JsonValue>;

/// A value held by a document field or a nested [`Strut`].
///
/// Associative values are always `Nested`; sequences keep their elements in
/// plain form and are never reconstructed.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
    Sequence(Vec<JsonValue>),
    Nested(Strut),
}

impl Value {
    /// Convert a plain value, reconstructing objects into nested structs.
    pub fn from_json(value: JsonValue) -> Result<Self, LedgerError> {
        Ok(match value {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Bool(b),
            JsonValue::Number(n) => Self::from_number(&n),
            JsonValue::String(s) => Value::String(s),
            JsonValue::Array(items) => Value::Sequence(items),
            JsonValue::Object(map) => Value::Nested(Strut::from_snapshot(&map)?),
        })
    }

    fn from_number(n: &Number) -> Self {
        if let Some(i) = n.as_i64() {
            Value::Int(i)
        } else if let Some(u) = n.as_u64() {
            Value::UInt(u)
        } else {
            // serde_json numbers are always one of the three
            Value::Float(n.as_f64().unwrap_or(f64::NAN))
        }
    }

    /// Plain form of this value. Non-finite floats become `null`.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Null => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Int(i) => JsonValue::Number((*i).into()),
            Value::UInt(u) => JsonValue::Number((*u).into()),
            Value::Float(f) => Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Value::String(s) => JsonValue::String(s.clone()),
            Value::Sequence(items) => JsonValue::Array(items.clone()),
            Value::Nested(strut) => strut.to_json(),
        }
    }

    /// Textual identity for scalar values; `None` for null, sequences and nested values.
    pub fn identity(&self) -> Option<String> {
        match self {
            Value::String(s) => Some(s.clone()),
            Value::Int(i) => Some(i.to_string()),
            Value::UInt(u) => Some(u.to_string()),
            Value::Float(f) => Some(f.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Null | Value::Sequence(_) | Value::Nested(_) => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::UInt(u) => i64::try_from(*u).ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            Value::UInt(u) => Some(*u as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[JsonValue]> {
        match self {
            Value::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_nested(&self) -> Option<&Strut> {
        match self {
            Value::Nested(strut) => Some(strut),
            _ => None,
        }
    }

    pub fn as_nested_mut(&mut self) -> Option<&mut Strut> {
        match self {
            Value::Nested(strut) => Some(strut),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Value::String(s.clone())
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n.into())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::UInt(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Vec<JsonValue>> for Value {
    fn from(v: Vec<JsonValue>) -> Self {
        Value::Sequence(v)
    }
}

impl<'a> From<Vec<&'a str>> for Value {
    fn from(v: Vec<&'a str>) -> Self {
        Value::Sequence(v.into_iter().map(JsonValue::from).collect())
    }
}

impl From<Strut> for Value {
    fn from(strut: Strut) -> Self {
        Value::Nested(strut)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}
