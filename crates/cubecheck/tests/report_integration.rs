#![forbid(unsafe_code)]
//! Aggregated failure reporting through the full verify flow: placeholder
//! rendering, block separators, ordering, state reset.

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::Result;

use cubecheck::cube::{CubeCell, CubeHandle, CubeId};
use cubecheck::harness::{CubeHarness, HarnessError};
use cubecheck::memory_backend::{memory_handle, MemoryCube};
use cubecheck::param::CubeNumParam;
use cubecheck::report::FailureReport;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn pnl_handle() -> (CubeHandle, Rc<RefCell<MemoryCube>>) {
    let mut cube = MemoryCube::new("Biker/P_L");
    cube.set(
        &["Variance", "Qtr.1", "Net income"],
        CubeCell::Numeric(10.0005),
    );
    let shared = cube.into_shared();
    (memory_handle(CubeId::new("test_conn", "Biker/P_L"), &shared), shared)
}

fn failed_report(harness: &mut CubeHarness) -> FailureReport {
    match harness.verify().expect_err("at least one mismatch") {
        HarnessError::AssertionsFailed(report) => report,
        other => panic!("unexpected error: {other}"),
    }
}

// ---------------------------------------------------------------------------
// Placeholder rendering through verify
// ---------------------------------------------------------------------------

#[test]
fn locale_and_positional_tokens_render_in_the_report() {
    let (cube, _) = pnl_handle();
    let mut harness = CubeHarness::new();
    harness.set_decimals(3);
    harness.assert_equals(
        10.0,
        CubeNumParam::new(cube, ["Variance", "Qtr.1", "Net income"]),
        "%1$$ / delta is %3$0.4f",
    );

    let report = failed_report(&mut harness);
    assert_eq!(report.messages, ["10,000 / delta is 0.0005"]);
}

#[test]
fn coordinate_tokens_name_the_failing_cell() {
    let (cube, _) = pnl_handle();
    let mut harness = CubeHarness::new();
    harness.assert_equals(
        10.0,
        CubeNumParam::new(cube, ["Variance", "Qtr.1", "Net income"]),
        "cell %5$$ is off",
    );

    let report = failed_report(&mut harness);
    assert_eq!(report.messages, ["cell Variance / Qtr.1 / Net income is off"]);
}

#[test]
fn expected_coordinate_token_requires_cube_backing() {
    let (cube, _) = pnl_handle();
    let mut harness = CubeHarness::new();
    // expected is a scalar, so %4$$ has nothing to name and stays verbatim
    harness.assert_equals(
        10.0,
        CubeNumParam::new(cube, ["Variance", "Qtr.1", "Net income"]),
        "expected %4$$ actual %5$$",
    );

    let report = failed_report(&mut harness);
    assert_eq!(
        report.messages,
        ["expected %4$$ actual Variance / Qtr.1 / Net income"]
    );
}

#[test]
fn raw_positionals_fill_expected_actual_difference() {
    let mut harness = CubeHarness::new();
    harness.set_block_size(None);
    harness.assert_equals(10.0, 12.5, "e=%s a=%s d=%s");

    let report = failed_report(&mut harness);
    assert_eq!(report.messages, ["e=10 a=12.5 d=2.5"]);
}

// ---------------------------------------------------------------------------
// Aggregation shape
// ---------------------------------------------------------------------------

#[test]
fn aggregated_message_lists_every_failure_in_order() {
    let mut harness = CubeHarness::new();
    harness.set_block_size(None);
    for i in 0..4 {
        harness.assert_equals(i, i + 1, format!("mismatch {i}"));
    }

    let report = failed_report(&mut harness);
    assert_eq!(report.count, 4);
    assert_eq!(
        report.to_string(),
        "4 assertions failed:\n\tmismatch 0\n\tmismatch 1\n\tmismatch 2\n\tmismatch 3"
    );
}

#[test]
fn block_separator_appears_every_fifth_failure() {
    let mut harness = CubeHarness::new();
    for i in 0..6 {
        harness.assert_equals(i, i + 1, format!("m{i}"));
    }

    let report = failed_report(&mut harness);
    assert_eq!(report.messages[4], "m4\n");
    assert_eq!(report.messages[5], "m5");
}

#[test]
fn passing_scenarios_do_not_appear_in_the_report() {
    let mut harness = CubeHarness::new();
    harness.assert_equals(1, 1, "passes");
    harness.assert_equals(1, 2, "fails");
    harness.assert_true(true, "passes too");

    let report = failed_report(&mut harness);
    assert_eq!(report.count, 1);
    assert_eq!(report.messages, ["fails"]);
}

#[test]
fn report_round_trips_through_json() -> Result<()> {
    let mut harness = CubeHarness::new();
    harness.assert_equals(1, 2, "boom");
    let report = failed_report(&mut harness);

    let json = serde_json::to_string(&report)?;
    let back: FailureReport = serde_json::from_str(&json)?;
    assert_eq!(back, report);
    Ok(())
}

// ---------------------------------------------------------------------------
// State reset
// ---------------------------------------------------------------------------

#[test]
fn teardown_resets_harness_state() {
    let (cube, cube_mem) = pnl_handle();
    let mut harness = CubeHarness::new();
    harness.assert_equals(
        1.0,
        CubeNumParam::new(cube, ["Variance", "Qtr.1", "Net income"]),
        "off",
    );
    harness.verify().expect_err("mismatch");

    // queue and failure log are empty; a second verify is a clean no-op
    assert_eq!(harness.pending(), 0);
    harness.verify().expect("nothing queued");

    let stats = cube_mem.borrow().stats();
    assert_eq!(stats.sessions_opened, 1);
}

#[test]
fn explicit_clear_discards_queued_scenarios() {
    let mut harness = CubeHarness::new();
    harness.assert_equals(1, 2, "would fail");
    harness.clear();
    harness.verify().expect("cleared queue verifies");
}

#[test]
fn failure_counter_restarts_per_teardown() {
    let mut harness = CubeHarness::new();
    harness.set_block_size(Some(2));
    harness.assert_equals(1, 2, "a");
    let first = failed_report(&mut harness);
    assert_eq!(first.messages, ["a"]);

    // a fresh teardown starts counting from zero again
    harness.assert_equals(1, 2, "b");
    harness.assert_equals(1, 2, "c");
    let second = failed_report(&mut harness);
    assert_eq!(second.messages, ["b", "c\n"]);
}
