use serde::{Deserialize, Serialize};
use std::fmt;

/// A bound parameter or a fetched cell.
///
/// Deserialized untagged so that plan files can carry plain JSON scalars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SoqlValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for SoqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SoqlValue::Null => write!(f, "null"),
            SoqlValue::Bool(b) => write!(f, "{}", b),
            SoqlValue::Integer(i) => write!(f, "{}", i),
            SoqlValue::Float(x) => write!(f, "{}", x),
            SoqlValue::Text(s) => write!(f, "'{}'", s.replace('\'', "\\'")),
        }
    }
}

impl From<&str> for SoqlValue {
    fn from(s: &str) -> Self {
        SoqlValue::Text(s.to_string())
    }
}

impl From<String> for SoqlValue {
    fn from(s: String) -> Self {
        SoqlValue::Text(s)
    }
}

impl From<i64> for SoqlValue {
    fn from(i: i64) -> Self {
        SoqlValue::Integer(i)
    }
}

impl From<bool> for SoqlValue {
    fn from(b: bool) -> Self {
        SoqlValue::Bool(b)
    }
}

impl From<f64> for SoqlValue {
    fn from(x: f64) -> Self {
        SoqlValue::Float(x)
    }
}

/// One fetched row.
pub type Row = Vec<SoqlValue>;
