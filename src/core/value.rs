use std::fmt;
use serde::{Deserialize, Serialize};
use crate::core::{ChangeError, Result};

/// A single attribute value as held by a record.
///
/// Serialized untagged, so a change-set renders as plain JSON
/// (`{"name": ["foo", "fub"]}`). Deserializing picks the first variant that
/// fits: a `Json` string or number comes back as `Text`, `Integer` or
/// `Float`. Use [`DataType::rehydrate`] with the column type to get the
/// stored variant back.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Json(serde_json::Value),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Integer(_) => "INTEGER",
            Self::Float(_) => "FLOAT",
            Self::Text(_) => "TEXT",
            Self::Boolean(_) => "BOOLEAN",
            Self::Json(_) => "JSON",
        }
    }

    /// Data type a freshly seen value would be stored under, if it has one.
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Self::Null => None,
            Self::Integer(_) => Some(DataType::Integer),
            Self::Float(_) => Some(DataType::Float),
            Self::Text(_) => Some(DataType::Text),
            Self::Boolean(_) => Some(DataType::Boolean),
            Self::Json(_) => Some(DataType::Json),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Boolean(b) => serde_json::Value::Bool(*b),
            Self::Integer(i) => serde_json::Value::from(*i),
            Self::Float(f) => serde_json::Value::from(*f),
            Self::Text(s) => serde_json::Value::String(s.clone()),
            Self::Json(j) => j.clone(),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => {
                if a.is_nan() && b.is_nan() {
                    return true;
                }
                (a - b).abs() < f64::EPSILON
            }
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Json(a), Self::Json(b)) => a == b,
            (Self::Integer(i), Self::Float(f)) | (Self::Float(f), Self::Integer(i)) => {
                (*i as f64 - f).abs() < f64::EPSILON
            }
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(fl) => write!(f, "{}", fl),
            Self::Text(s) => write!(f, "{}", s),
            Self::Boolean(b) => write!(f, "{}", b),
            Self::Json(j) => write!(f, "{}", j),
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<serde_json::Value> for Value {
    fn from(j: serde_json::Value) -> Self {
        Self::Json(j)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Self::Null)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Integer,
    Float,
    Text,
    Boolean,
    Json,
}

impl DataType {
    pub fn is_compatible(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (Self::Integer, Value::Integer(_)) => true,
            (Self::Float, Value::Float(_)) => true,
            (Self::Float, Value::Integer(_)) => true,
            (Self::Text, Value::Text(_)) => true,
            (Self::Boolean, Value::Boolean(_)) => true,
            (Self::Json, Value::Json(_)) => true,
            _ => false,
        }
    }

    /// Casts a raw user-supplied value into this type's canonical representation.
    ///
    /// `NULL` passes through every type. Text is parsed for the scalar types,
    /// and scalars are rendered when the target is `Text`.
    pub fn cast_user_value(&self, value: Value) -> Result<Value> {
        let cast = match (self, value) {
            (_, Value::Null) => Value::Null,

            (Self::Integer, Value::Integer(i)) => Value::Integer(i),
            (Self::Integer, Value::Float(f)) if f.is_finite() && f.fract() == 0.0 => {
                Value::Integer(f as i64)
            }
            (Self::Integer, Value::Boolean(b)) => Value::Integer(i64::from(b)),
            (Self::Integer, Value::Text(s)) => match s.trim().parse::<i64>() {
                Ok(i) => Value::Integer(i),
                Err(_) => return Err(self.mismatch(&Value::Text(s))),
            },

            (Self::Float, Value::Float(f)) => Value::Float(f),
            (Self::Float, Value::Integer(i)) => Value::Float(i as f64),
            (Self::Float, Value::Text(s)) => match s.trim().parse::<f64>() {
                Ok(f) => Value::Float(f),
                Err(_) => return Err(self.mismatch(&Value::Text(s))),
            },

            (Self::Text, Value::Text(s)) => Value::Text(s),
            (Self::Text, v @ (Value::Integer(_) | Value::Float(_) | Value::Boolean(_))) => {
                Value::Text(v.to_string())
            }

            (Self::Boolean, Value::Boolean(b)) => Value::Boolean(b),
            (Self::Boolean, Value::Integer(i)) => Value::Boolean(i != 0),
            (Self::Boolean, Value::Text(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "" => Value::Null,
                "true" | "t" | "1" | "yes" | "on" => Value::Boolean(true),
                "false" | "f" | "0" | "no" | "off" => Value::Boolean(false),
                _ => return Err(self.mismatch(&Value::Text(s))),
            },

            (Self::Json, Value::Json(j)) => Value::Json(j),
            (Self::Json, Value::Text(s)) => match serde_json::from_str(&s) {
                Ok(j) => Value::Json(j),
                Err(_) => Value::Json(serde_json::Value::String(s)),
            },
            (Self::Json, other) => Value::Json(other.to_json()),

            (_, other) => return Err(self.mismatch(&other)),
        };
        Ok(cast)
    }

    /// Restores the variant a value of this type is stored as, after it went
    /// through the untagged serde form. Never fails; values that don't
    /// belong to this type are returned as they are.
    pub fn rehydrate(&self, value: Value) -> Value {
        match (self, value) {
            (_, Value::Null) => Value::Null,
            (Self::Json, value) => Value::Json(value.to_json()),
            (Self::Float, Value::Integer(i)) => Value::Float(i as f64),
            (_, value) => value,
        }
    }

    fn mismatch(&self, value: &Value) -> ChangeError {
        ChangeError::TypeMismatch(format!(
            "cannot cast {} '{}' to {}",
            value.type_name(),
            value,
            self
        ))
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer => write!(f, "INTEGER"),
            Self::Float => write!(f, "FLOAT"),
            Self::Text => write!(f, "TEXT"),
            Self::Boolean => write!(f, "BOOLEAN"),
            Self::Json => write!(f, "JSON"),
        }
    }
}
