//! The test-facing harness.
//!
//! Assertions registered during a test body are queued, not evaluated; the
//! host's teardown hook calls [`CubeHarness::verify`], which batches every
//! required fetch, evaluates the whole queue in registration order and
//! either succeeds silently or raises one aggregated failure listing every
//! mismatch.

use std::fmt;

use crate::cache_plan::{FetchPlan, FlushReceipt};
use crate::cube::TransportError;
use crate::evaluate::evaluate_scenario;
use crate::param::TestParam;
use crate::report::{FailureLog, FailureReport, ReportConfig};
use crate::scenario::{ComparisonKind, TestScenario, DEFAULT_DELTA};

// ---------------------------------------------------------------------------
// HarnessError
// ---------------------------------------------------------------------------

/// Terminal outcome of a failed `verify`.
#[derive(Debug, Clone, PartialEq)]
pub enum HarnessError {
    /// At least one queued comparison mismatched; every failure is listed.
    AssertionsFailed(FailureReport),
    /// The batch fetch failed; evaluation never ran.
    Transport(TransportError),
}

impl fmt::Display for HarnessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AssertionsFailed(report) => report.fmt(f),
            Self::Transport(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for HarnessError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::AssertionsFailed(_) => None,
            Self::Transport(err) => Some(err),
        }
    }
}

impl From<TransportError> for HarnessError {
    fn from(err: TransportError) -> Self {
        Self::Transport(err)
    }
}

// ---------------------------------------------------------------------------
// CubeHarness
// ---------------------------------------------------------------------------

/// Deferred assertion harness scoped to one test.
#[derive(Debug, Default)]
pub struct CubeHarness {
    queue: Vec<TestScenario>,
    failures: FailureLog,
    config: ReportConfig,
    last_flush: Option<FlushReceipt>,
}

impl CubeHarness {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ReportConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> ReportConfig {
        self.config
    }

    /// Failure-block size: a blank line is inserted after every Nth
    /// failure message. `None` or `Some(0)` disables it.
    pub fn set_block_size(&mut self, block_size: Option<u32>) {
        self.config.block_size = block_size;
    }

    /// Decimal places used by the locale-style message tokens.
    pub fn set_decimals(&mut self, decimals: usize) {
        self.config.decimals = decimals;
    }

    /// Number of queued, not-yet-verified scenarios.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Receipt of the most recent batch flush, if any.
    pub fn last_flush(&self) -> Option<&FlushReceipt> {
        self.last_flush.as_ref()
    }

    // -----------------------------------------------------------------------
    // Registration surface
    // -----------------------------------------------------------------------

    pub fn assert_equals(
        &mut self,
        expected: impl Into<TestParam>,
        actual: impl Into<TestParam>,
        message: impl Into<String>,
    ) {
        self.queue.push(TestScenario::comparing(
            ComparisonKind::Equals,
            expected,
            actual,
            message,
        ));
    }

    pub fn assert_not_equals(
        &mut self,
        expected: impl Into<TestParam>,
        actual: impl Into<TestParam>,
        message: impl Into<String>,
    ) {
        self.queue.push(TestScenario::comparing(
            ComparisonKind::NotEquals,
            expected,
            actual,
            message,
        ));
    }

    pub fn assert_equals_with_delta(
        &mut self,
        expected: impl Into<TestParam>,
        actual: impl Into<TestParam>,
        message: impl Into<String>,
        delta: f64,
    ) {
        self.queue.push(TestScenario::comparing_with_delta(
            ComparisonKind::EqualsWithDelta,
            expected,
            actual,
            message,
            delta,
        ));
    }

    /// Delta equality with the default tolerance.
    pub fn assert_almost_equals(
        &mut self,
        expected: impl Into<TestParam>,
        actual: impl Into<TestParam>,
        message: impl Into<String>,
    ) {
        self.assert_equals_with_delta(expected, actual, message, DEFAULT_DELTA);
    }

    pub fn assert_true(&mut self, actual: impl Into<TestParam>, message: impl Into<String>) {
        self.queue
            .push(TestScenario::unary(ComparisonKind::True, actual, message));
    }

    pub fn assert_false(&mut self, actual: impl Into<TestParam>, message: impl Into<String>) {
        self.queue
            .push(TestScenario::unary(ComparisonKind::False, actual, message));
    }

    /// Passes when `actual < expected`.
    pub fn assert_less_than(
        &mut self,
        expected: impl Into<TestParam>,
        actual: impl Into<TestParam>,
        message: impl Into<String>,
    ) {
        self.queue.push(TestScenario::comparing(
            ComparisonKind::LessThan,
            expected,
            actual,
            message,
        ));
    }

    pub fn assert_less_than_or_equal(
        &mut self,
        expected: impl Into<TestParam>,
        actual: impl Into<TestParam>,
        message: impl Into<String>,
    ) {
        self.queue.push(TestScenario::comparing(
            ComparisonKind::LessThanOrEqual,
            expected,
            actual,
            message,
        ));
    }

    /// Passes when `actual > expected`.
    pub fn assert_greater_than(
        &mut self,
        expected: impl Into<TestParam>,
        actual: impl Into<TestParam>,
        message: impl Into<String>,
    ) {
        self.queue.push(TestScenario::comparing(
            ComparisonKind::GreaterThan,
            expected,
            actual,
            message,
        ));
    }

    pub fn assert_greater_than_or_equal(
        &mut self,
        expected: impl Into<TestParam>,
        actual: impl Into<TestParam>,
        message: impl Into<String>,
    ) {
        self.queue.push(TestScenario::comparing(
            ComparisonKind::GreaterThanOrEqual,
            expected,
            actual,
            message,
        ));
    }

    // -----------------------------------------------------------------------
    // Teardown
    // -----------------------------------------------------------------------

    /// Run the queue: batch-fetch, evaluate, report, clear.
    ///
    /// Assertion mismatches aggregate into one
    /// [`HarnessError::AssertionsFailed`]; a transport failure aborts
    /// before evaluation and leaves the queue in place (only `clear`
    /// resets it then). Success and aggregated failure both leave the
    /// harness clean for the next test.
    pub fn verify(&mut self) -> Result<(), HarnessError> {
        let outcome = self.run_queue();
        if !matches!(outcome, Err(HarnessError::Transport(_))) {
            self.clear();
        }
        outcome
    }

    fn run_queue(&mut self) -> Result<(), HarnessError> {
        let plan = FetchPlan::discover(&self.queue);
        self.last_flush = Some(plan.flush()?);

        for scenario in &self.queue {
            let outcome = evaluate_scenario(scenario)?;
            if !outcome.passed {
                self.failures.record(scenario, &outcome, &self.config);
            }
        }

        match self.failures.take_report() {
            Some(report) => Err(HarnessError::AssertionsFailed(report)),
            None => Ok(()),
        }
    }

    /// Reset queue and failure log; configuration is kept.
    pub fn clear(&mut self) {
        self.queue.clear();
        self.failures.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::cube::{CubeCell, CubeHandle, CubeId};
    use crate::memory_backend::{memory_handle, MemoryCube};
    use crate::param::CubeNumParam;

    fn user_group_cube() -> (CubeHandle, Rc<RefCell<MemoryCube>>) {
        let mut cube = MemoryCube::new("#_USER_GROUP");
        cube.set(&["admin", "admin"], CubeCell::Numeric(1.0));
        cube.set(&["admin", "designer"], CubeCell::Numeric(1.0));
        cube.set(&["viewer", "admin"], CubeCell::Numeric(0.0));
        let shared = cube.into_shared();
        (
            memory_handle(CubeId::new("test_conn", "System/#_USER_GROUP"), &shared),
            shared,
        )
    }

    #[test]
    fn passing_queue_verifies_silently() {
        let (handle, _) = user_group_cube();
        let mut harness = CubeHarness::new();
        harness.assert_equals(
            1,
            CubeNumParam::new(handle, ["admin", "admin"]),
            "admin user is not assigned to admin group",
        );
        harness.verify().expect("all assertions hold");
        assert_eq!(harness.pending(), 0);
    }

    #[test]
    fn mismatch_raises_one_aggregated_failure() {
        let (handle, _) = user_group_cube();
        let mut harness = CubeHarness::new();
        harness.assert_not_equals(
            1,
            CubeNumParam::new(handle, ["admin", "designer"]),
            "designer assignment should differ",
        );
        let err = harness.verify().expect_err("values are equal");
        match err {
            HarnessError::AssertionsFailed(report) => {
                assert_eq!(report.count, 1);
                assert_eq!(report.messages, ["designer assignment should differ"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn failures_keep_registration_order() {
        let mut harness = CubeHarness::new();
        harness.assert_equals(1, 2, "first");
        harness.assert_true(true, "passes");
        harness.assert_equals(3, 4, "second");
        harness.assert_false(true, "third");

        let err = harness.verify().expect_err("three mismatches");
        match err {
            HarnessError::AssertionsFailed(report) => {
                assert_eq!(report.count, 3);
                assert_eq!(report.messages, ["first", "second", "third"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn verify_clears_state_after_failure() {
        let mut harness = CubeHarness::new();
        harness.assert_equals(1, 2, "mismatch");
        harness.verify().expect_err("mismatch");

        assert_eq!(harness.pending(), 0);
        harness.verify().expect("clean harness verifies");
    }

    #[test]
    fn transport_failure_aborts_without_aggregating() {
        let (handle, shared) = user_group_cube();
        shared.borrow_mut().fail_fetches();
        let mut harness = CubeHarness::new();
        harness.assert_equals(1, CubeNumParam::new(handle, ["admin", "admin"]), "msg");

        let err = harness.verify().expect_err("transport down");
        assert!(matches!(err, HarnessError::Transport(_)));
        // queue is intentionally preserved for inspection
        assert_eq!(harness.pending(), 1);
        harness.clear();
        assert_eq!(harness.pending(), 0);
    }

    #[test]
    fn flush_receipt_reflects_the_batch() {
        let (handle, _) = user_group_cube();
        let mut harness = CubeHarness::new();
        harness.assert_equals(1, CubeNumParam::new(handle.clone(), ["admin", "admin"]), "");
        harness.assert_equals(0, CubeNumParam::new(handle, ["viewer", "admin"]), "");
        harness.verify().expect("both hold");

        let receipt = harness.last_flush().expect("flush ran");
        assert_eq!(receipt.cube_count(), 1);
        assert_eq!(receipt.total_fetches(), 2);
    }

    #[test]
    fn config_setters_apply_to_reporting() {
        let mut harness = CubeHarness::new();
        harness.set_decimals(3);
        harness.set_block_size(None);
        harness.assert_equals(10.0, 10.5, "%1$$ vs %2$$");

        let err = harness.verify().expect_err("mismatch");
        match err {
            HarnessError::AssertionsFailed(report) => {
                assert_eq!(report.messages, ["10,000 vs 10,500"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn delta_assertions_use_their_tolerance() {
        let mut harness = CubeHarness::new();
        harness.assert_equals_with_delta(10.0, 10.01, "within", 0.05);
        harness.assert_almost_equals(10.0, 10.0005, "default delta");
        harness.verify().expect("both within tolerance");
    }
}
