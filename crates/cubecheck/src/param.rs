//! Value parameters: what an assertion compares.
//!
//! A [`TestParam`] is either a scalar literal, coerced once at the
//! registration boundary, or a cube-backed lookup resolved from the batch
//! cache at evaluation time. Numeric cube lookups compose with `add`/
//! `subtract`; text operands are rejected when the composition is built,
//! not when it is evaluated.

use std::fmt;

use thiserror::Error;

use crate::cell_value::{CellValue, TypeTag};
use crate::cube::{Coordinates, CubeCell, CubeHandle, TransportError};

// ---------------------------------------------------------------------------
// Composition errors
// ---------------------------------------------------------------------------

/// Arithmetic composition operator on a numeric cube parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositionOp {
    Add,
    Subtract,
}

impl CompositionOp {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Subtract => "subtract",
        }
    }
}

impl fmt::Display for CompositionOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamError {
    #[error("text parameter can not be used with numeric {op}()")]
    TextOperand { op: CompositionOp },
}

// ---------------------------------------------------------------------------
// TestParam
// ---------------------------------------------------------------------------

/// A value source for one side of a comparison.
#[derive(Debug, Clone)]
pub enum TestParam {
    Scalar(CellValue),
    CubeNumeric(CubeNumParam),
    CubeText(CubeTextParam),
}

impl TestParam {
    /// Resolve the value. For cube-backed parameters this must run after
    /// the batch flush has populated the transport cache; the parameter
    /// itself never opens a session.
    pub fn value(&self) -> Result<CellValue, TransportError> {
        match self {
            Self::Scalar(value) => Ok(value.clone()),
            Self::CubeNumeric(param) => param.value(),
            Self::CubeText(param) => param.value(),
        }
    }

    pub fn type_tag(&self) -> TypeTag {
        match self {
            Self::Scalar(value) => value.type_tag(),
            Self::CubeNumeric(_) => TypeTag::Double,
            Self::CubeText(_) => TypeTag::Text,
        }
    }

    /// Coordinates used in failure messages. Scalars report one synthetic
    /// label embedding the literal so templating is uniform across
    /// parameter kinds.
    pub fn display_coordinates(&self) -> Coordinates {
        match self {
            Self::Scalar(value) => vec![scalar_label(value)],
            Self::CubeNumeric(param) => param.coordinates().to_vec(),
            Self::CubeText(param) => param.coordinates().to_vec(),
        }
    }

    pub fn is_cube_backed(&self) -> bool {
        matches!(self, Self::CubeNumeric(_) | Self::CubeText(_))
    }

    pub fn cube(&self) -> Option<&CubeHandle> {
        match self {
            Self::Scalar(_) => None,
            Self::CubeNumeric(param) => Some(param.cube()),
            Self::CubeText(param) => Some(param.cube()),
        }
    }
}

fn scalar_label(value: &CellValue) -> String {
    match value {
        CellValue::Bool(b) => format!("Bool<{b}>"),
        CellValue::Int(i) => format!("Int<{i}>"),
        CellValue::Float(x) => format!("Float<{x:?}>"),
        CellValue::Text(t) => format!("String<{t}>"),
        CellValue::Null => "Null<>".to_string(),
    }
}

impl From<CellValue> for TestParam {
    fn from(value: CellValue) -> Self {
        Self::Scalar(value)
    }
}

impl From<bool> for TestParam {
    fn from(value: bool) -> Self {
        Self::Scalar(CellValue::from(value))
    }
}

impl From<i32> for TestParam {
    fn from(value: i32) -> Self {
        Self::Scalar(CellValue::from(value))
    }
}

impl From<i64> for TestParam {
    fn from(value: i64) -> Self {
        Self::Scalar(CellValue::from(value))
    }
}

impl From<f64> for TestParam {
    fn from(value: f64) -> Self {
        Self::Scalar(CellValue::from(value))
    }
}

impl From<&str> for TestParam {
    fn from(value: &str) -> Self {
        Self::Scalar(CellValue::from(value))
    }
}

impl From<String> for TestParam {
    fn from(value: String) -> Self {
        Self::Scalar(CellValue::from(value))
    }
}

impl From<CubeNumParam> for TestParam {
    fn from(param: CubeNumParam) -> Self {
        Self::CubeNumeric(param)
    }
}

impl From<CubeTextParam> for TestParam {
    fn from(param: CubeTextParam) -> Self {
        Self::CubeText(param)
    }
}

// ---------------------------------------------------------------------------
// CubeNumParam
// ---------------------------------------------------------------------------

/// Numeric cube lookup with optional add/subtract composition.
#[derive(Debug, Clone)]
pub struct CubeNumParam {
    cube: CubeHandle,
    coordinates: Coordinates,
    adds: Vec<TestParam>,
    subtracts: Vec<TestParam>,
}

impl CubeNumParam {
    pub fn new(
        cube: CubeHandle,
        coordinates: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            cube,
            coordinates: coordinates.into_iter().map(Into::into).collect(),
            adds: Vec::new(),
            subtracts: Vec::new(),
        }
    }

    /// Append an operand added to this lookup's value.
    ///
    /// Rejects text-typed operands immediately; only numeric-typed
    /// parameters may compose.
    pub fn add(mut self, param: impl Into<TestParam>) -> Result<Self, ParamError> {
        let param = param.into();
        if param.type_tag() == TypeTag::Text {
            return Err(ParamError::TextOperand {
                op: CompositionOp::Add,
            });
        }
        self.adds.push(param);
        Ok(self)
    }

    /// Append an operand subtracted from this lookup's value. Same typing
    /// rule as [`CubeNumParam::add`].
    pub fn subtract(mut self, param: impl Into<TestParam>) -> Result<Self, ParamError> {
        let param = param.into();
        if param.type_tag() == TypeTag::Text {
            return Err(ParamError::TextOperand {
                op: CompositionOp::Subtract,
            });
        }
        self.subtracts.push(param);
        Ok(self)
    }

    pub fn cube(&self) -> &CubeHandle {
        &self.cube
    }

    pub fn coordinates(&self) -> &Coordinates {
        &self.coordinates
    }

    pub fn adds(&self) -> &[TestParam] {
        &self.adds
    }

    pub fn subtracts(&self) -> &[TestParam] {
        &self.subtracts
    }

    /// Resolved value: the fetched cell plus the sum of `adds` minus the
    /// sum of `subtracts`.
    ///
    /// Collapsing policy, deliberately explicit: an absent cell (`#NA` or
    /// empty) contributes a base of 0 and composition still applies;
    /// operands that resolve to a non-numeric value accumulate as 0. A
    /// text cell is returned verbatim and the comparison against it then
    /// fails on its own terms.
    pub fn value(&self) -> Result<CellValue, TransportError> {
        let mut composed = 0.0;
        for operand in &self.adds {
            composed += operand.value()?.as_number().unwrap_or(0.0);
        }
        for operand in &self.subtracts {
            composed -= operand.value()?.as_number().unwrap_or(0.0);
        }

        match self.cube.fetch_value(&self.coordinates)? {
            CubeCell::Numeric(base) => Ok(CellValue::Float(base + composed)),
            CubeCell::Text(text) => Ok(CellValue::Text(text)),
            CubeCell::NotAvailable | CubeCell::Empty => Ok(CellValue::Float(composed)),
        }
    }
}

// ---------------------------------------------------------------------------
// CubeTextParam
// ---------------------------------------------------------------------------

/// Text cube lookup.
#[derive(Debug, Clone)]
pub struct CubeTextParam {
    cube: CubeHandle,
    coordinates: Coordinates,
}

impl CubeTextParam {
    pub fn new(
        cube: CubeHandle,
        coordinates: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            cube,
            coordinates: coordinates.into_iter().map(Into::into).collect(),
        }
    }

    pub fn cube(&self) -> &CubeHandle {
        &self.cube
    }

    pub fn coordinates(&self) -> &Coordinates {
        &self.coordinates
    }

    /// Resolved value: the fetched cell coerced to text, or `Null` when
    /// the cell is absent.
    pub fn value(&self) -> Result<CellValue, TransportError> {
        match self.cube.fetch_value(&self.coordinates)? {
            CubeCell::Numeric(number) => Ok(CellValue::Text(number.to_string())),
            CubeCell::Text(text) => Ok(CellValue::Text(text)),
            CubeCell::NotAvailable | CubeCell::Empty => Ok(CellValue::Null),
        }
    }
}
