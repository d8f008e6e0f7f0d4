//! Queued comparison scenarios.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::param::TestParam;

/// Tolerance used by delta equality when none is given.
pub const DEFAULT_DELTA: f64 = 0.001;

// ---------------------------------------------------------------------------
// ComparisonKind
// ---------------------------------------------------------------------------

/// The comparison a scenario performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonKind {
    Equals,
    NotEquals,
    EqualsWithDelta,
    True,
    False,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

impl ComparisonKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Equals => "equals",
            Self::NotEquals => "not_equals",
            Self::EqualsWithDelta => "equals_with_delta",
            Self::True => "true",
            Self::False => "false",
            Self::LessThan => "less_than",
            Self::LessThanOrEqual => "less_than_or_equal",
            Self::GreaterThan => "greater_than",
            Self::GreaterThanOrEqual => "greater_than_or_equal",
        }
    }

    /// Unary kinds check `actual` alone; `expected` is absent.
    pub fn is_unary(self) -> bool {
        matches!(self, Self::True | Self::False)
    }

    pub fn all() -> &'static [Self] {
        &[
            Self::Equals,
            Self::NotEquals,
            Self::EqualsWithDelta,
            Self::True,
            Self::False,
            Self::LessThan,
            Self::LessThanOrEqual,
            Self::GreaterThan,
            Self::GreaterThanOrEqual,
        ]
    }
}

impl fmt::Display for ComparisonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// TestScenario
// ---------------------------------------------------------------------------

/// One queued comparison, immutable after construction.
#[derive(Debug, Clone)]
pub struct TestScenario {
    kind: ComparisonKind,
    expected: Option<TestParam>,
    actual: TestParam,
    message: String,
    delta: f64,
}

impl TestScenario {
    /// Binary comparison with the default delta.
    pub fn comparing(
        kind: ComparisonKind,
        expected: impl Into<TestParam>,
        actual: impl Into<TestParam>,
        message: impl Into<String>,
    ) -> Self {
        Self::comparing_with_delta(kind, expected, actual, message, DEFAULT_DELTA)
    }

    /// Binary comparison with an explicit delta (only delta equality
    /// reads it).
    pub fn comparing_with_delta(
        kind: ComparisonKind,
        expected: impl Into<TestParam>,
        actual: impl Into<TestParam>,
        message: impl Into<String>,
        delta: f64,
    ) -> Self {
        Self {
            kind,
            expected: Some(expected.into()),
            actual: actual.into(),
            message: message.into(),
            delta,
        }
    }

    /// Unary truth check.
    pub fn unary(
        kind: ComparisonKind,
        actual: impl Into<TestParam>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            expected: None,
            actual: actual.into(),
            message: message.into(),
            delta: DEFAULT_DELTA,
        }
    }

    pub fn kind(&self) -> ComparisonKind {
        self.kind
    }

    pub fn expected(&self) -> Option<&TestParam> {
        self.expected.as_ref()
    }

    pub fn actual(&self) -> &TestParam {
        &self.actual
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn delta(&self) -> f64 {
        self.delta
    }
}
