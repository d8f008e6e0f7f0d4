//! Tagged runtime value shared by scalar parameters, cube lookups and the
//! comparison evaluator.
//!
//! Comparisons never coerce between text and numbers; the numeric variants
//! (`Int`, `Float`) compare against each other by value so that an integer
//! expectation matches a floating-point cube cell.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// TypeTag
// ---------------------------------------------------------------------------

/// Runtime type tag of a resolved value.
///
/// The string forms (`boolean`, `integer`, `double`, `string`, `NULL`)
/// are stable; composition rules key off them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeTag {
    Boolean,
    Integer,
    Double,
    Text,
    Null,
}

impl TypeTag {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Double => "double",
            Self::Text => "string",
            Self::Null => "NULL",
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// CellValue
// ---------------------------------------------------------------------------

/// A resolved comparison value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Null,
}

impl CellValue {
    pub fn type_tag(&self) -> TypeTag {
        match self {
            Self::Bool(_) => TypeTag::Boolean,
            Self::Int(_) => TypeTag::Integer,
            Self::Float(_) => TypeTag::Double,
            Self::Text(_) => TypeTag::Text,
            Self::Null => TypeTag::Null,
        }
    }

    /// Numeric view used by arithmetic composition and delta comparison.
    ///
    /// Booleans coerce to 1/0 and `Null` to 0; text never coerces, even
    /// when it looks like a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Bool(true) => Some(1.0),
            Self::Bool(false) => Some(0.0),
            Self::Int(value) => Some(*value as f64),
            Self::Float(value) => Some(*value),
            Self::Text(_) => None,
            Self::Null => Some(0.0),
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Int(_) | Self::Float(_))
    }

    /// Value equality used by `Equals`/`NotEquals`: same-variant equality,
    /// plus numeric equality across `Int`/`Float`.
    pub fn equals(&self, other: &CellValue) -> bool {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Null, Self::Null) => true,
            (a, b) if a.is_numeric() && b.is_numeric() => {
                // both numeric variants, as_number is total on them
                a.as_number() == b.as_number()
            }
            _ => false,
        }
    }

    /// Ordering used by the less-than/greater-than comparison family.
    ///
    /// Numeric variants order by value, text lexicographically, booleans
    /// with `false < true`. Mixed-type pairs are incomparable.
    pub fn compare(&self, other: &CellValue) -> Option<Ordering> {
        match (self, other) {
            (Self::Text(a), Self::Text(b)) => Some(a.cmp(b)),
            (Self::Bool(a), Self::Bool(b)) => Some(a.cmp(b)),
            (Self::Null, Self::Null) => Some(Ordering::Equal),
            (a, b) if a.is_numeric() && b.is_numeric() => {
                match (a.as_number(), b.as_number()) {
                    (Some(x), Some(y)) => x.partial_cmp(&y),
                    _ => None,
                }
            }
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
            Self::Null => Ok(()),
        }
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for CellValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}
