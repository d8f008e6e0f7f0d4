//! Comparison evaluation.
//!
//! Runs after the batch flush, so every cube-backed value resolves from
//! cache. Scenarios are independent: a mismatch never stops later
//! scenarios, only a transport failure does.

use std::cmp::Ordering;

use crate::cell_value::CellValue;
use crate::cube::TransportError;
use crate::scenario::{ComparisonKind, TestScenario};

// ---------------------------------------------------------------------------
// EvaluationOutcome
// ---------------------------------------------------------------------------

/// Result of evaluating one scenario, with the resolved values kept for
/// message templating.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationOutcome {
    pub kind: ComparisonKind,
    pub passed: bool,
    pub expected: Option<CellValue>,
    pub actual: CellValue,
}

/// Evaluate one scenario against the already-populated cache.
pub fn evaluate_scenario(scenario: &TestScenario) -> Result<EvaluationOutcome, TransportError> {
    let actual = scenario.actual().value()?;
    let expected = match scenario.expected() {
        Some(param) => Some(param.value()?),
        None => None,
    };

    let passed = match scenario.kind() {
        ComparisonKind::True => actual == CellValue::Bool(true),
        ComparisonKind::False => actual == CellValue::Bool(false),
        kind => match &expected {
            Some(expected) => compare_pair(kind, expected, &actual, scenario.delta()),
            // binary kind without an expected side can only mismatch
            None => false,
        },
    };

    Ok(EvaluationOutcome {
        kind: scenario.kind(),
        passed,
        expected,
        actual,
    })
}

/// Binary comparison dispatch.
///
/// Ordering kinds follow assertion-argument order: `LessThan` passes when
/// `actual < expected`, matching `assert_less_than(expected, actual)`.
/// Delta equality requires both sides numeric; a non-numeric side is a
/// type mismatch and fails the scenario.
fn compare_pair(kind: ComparisonKind, expected: &CellValue, actual: &CellValue, delta: f64) -> bool {
    match kind {
        ComparisonKind::Equals => expected.equals(actual),
        ComparisonKind::NotEquals => !expected.equals(actual),
        ComparisonKind::EqualsWithDelta => match (expected.as_number(), actual.as_number()) {
            (Some(e), Some(a)) => (a - e).abs() <= delta,
            _ => false,
        },
        ComparisonKind::LessThan => {
            matches!(actual.compare(expected), Some(Ordering::Less))
        }
        ComparisonKind::LessThanOrEqual => {
            matches!(
                actual.compare(expected),
                Some(Ordering::Less | Ordering::Equal)
            )
        }
        ComparisonKind::GreaterThan => {
            matches!(actual.compare(expected), Some(Ordering::Greater))
        }
        ComparisonKind::GreaterThanOrEqual => {
            matches!(
                actual.compare(expected),
                Some(Ordering::Greater | Ordering::Equal)
            )
        }
        ComparisonKind::True | ComparisonKind::False => false,
    }
}
