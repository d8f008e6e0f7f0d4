#![forbid(unsafe_code)]
//! End-to-end harness flows over the full stack: connection registry,
//! cube handles, deferred registration, batched verify.

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::Result;

use cubecheck::cube::CubeCell;
use cubecheck::harness::{CubeHarness, HarnessError};
use cubecheck::memory_backend::{MemoryConnector, MemoryCube, MemoryServer};
use cubecheck::param::{CubeNumParam, CubeTextParam};
use cubecheck::ConnectionRegistry;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Monthly taxes-on-income figures for the P&L fixture.
const MONTHLY_TAXES: &[(&str, f64)] = &[
    ("Jan", 27976.61),
    ("Feb", 41734.24),
    ("Mar", 74850.92),
    ("Apr", -75661.40),
    ("May", -46968.62),
    ("Jun", -25900.38),
    ("Jul", 116405.14),
    ("Aug", -45451.43),
    ("Sep", -26134.57),
    ("Oct", 0.0),
    ("Nov", 0.0),
    ("Dec", 0.0),
];

fn pnl_cube() -> MemoryCube {
    let mut cube = MemoryCube::new("Biker/P_L");
    for (month, taxes) in MONTHLY_TAXES {
        cube.set(
            &["Actual", "2016", *month, "10 Best Bike Seller AG", "Taxes on income"],
            CubeCell::Numeric(*taxes),
        );
    }
    cube.set(
        &["Variance", "All Years", "Qtr.1", "501 Omega Group", "Net income / (loss)"],
        CubeCell::Numeric(-28124787.7676),
    );
    cube
}

fn user_group_cube() -> MemoryCube {
    let mut cube = MemoryCube::new("System/#_USER_GROUP");
    cube.set(&["admin", "admin"], CubeCell::Numeric(1.0));
    cube.set(&["admin", "designer"], CubeCell::Numeric(1.0));
    cube.set(&["admin", "description"], CubeCell::Text("built-in".to_string()));
    cube
}

/// Registry over one in-memory server exposing both fixtures, plus the
/// shared cubes for stats assertions.
fn registry() -> (
    ConnectionRegistry,
    Rc<RefCell<MemoryCube>>,
    Rc<RefCell<MemoryCube>>,
) {
    let server = Rc::new(MemoryServer::new());
    let users = server.add_cube("System/#_USER_GROUP", user_group_cube());
    let pnl = server.add_cube("Biker/P_L", pnl_cube());
    let mut connector = MemoryConnector::new();
    connector.add_server("http://localhost:7777", server);
    (ConnectionRegistry::new(Box::new(connector)), users, pnl)
}

// ---------------------------------------------------------------------------
// End-to-end flows
// ---------------------------------------------------------------------------

#[test]
fn equal_cube_value_verifies_silently() -> Result<()> {
    let (mut registry, _, _) = registry();
    let connection = registry.connection("test_conn", "http://localhost:7777", "admin", "admin")?;
    let cube = connection.cube("System/#_USER_GROUP")?;

    let mut harness = CubeHarness::new();
    harness.assert_equals(
        1,
        CubeNumParam::new(cube, ["admin", "admin"]),
        "admin user is not assigned to admin group",
    );
    harness.verify()?;
    Ok(())
}

#[test]
fn not_equals_mismatch_surfaces_the_registered_message() -> Result<()> {
    let (mut registry, _, _) = registry();
    let connection = registry.connection("test_conn", "http://localhost:7777", "admin", "admin")?;
    let cube = connection.cube("System/#_USER_GROUP")?;

    let mut harness = CubeHarness::new();
    harness.assert_not_equals(
        1,
        CubeNumParam::new(cube, ["admin", "designer"]),
        "designer group should not mirror admin",
    );

    let err = harness.verify().expect_err("values are equal");
    match err {
        HarnessError::AssertionsFailed(report) => {
            assert_eq!(report.count, 1);
            assert_eq!(report.messages, ["designer group should not mirror admin"]);
            assert!(report
                .to_string()
                .starts_with("1 assertions failed:\n\tdesigner group"));
        }
        other => panic!("unexpected error: {other}"),
    }
    Ok(())
}

#[test]
fn twelve_months_verify_in_one_round_trip() -> Result<()> {
    let (mut registry, _, pnl) = registry();
    let connection = registry.connection("test_conn", "http://localhost:7777", "admin", "admin")?;
    let cube = connection.cube("Biker/P_L")?;

    let mut harness = CubeHarness::new();
    for (month, expected) in MONTHLY_TAXES {
        harness.assert_almost_equals(
            *expected,
            CubeNumParam::new(
                cube.clone(),
                ["Actual", "2016", *month, "10 Best Bike Seller AG", "Taxes on income"],
            ),
            "delta is %3$$",
        );
    }
    harness.verify()?;

    let stats = pnl.borrow().stats();
    assert_eq!(stats.round_trips, 1);
    assert_eq!(stats.sessions_opened, 1);

    let receipt = harness.last_flush().expect("flush ran");
    assert_eq!(receipt.cube_count(), 1);
    assert_eq!(receipt.total_fetches(), 12);
    Ok(())
}

#[test]
fn added_self_doubles_the_cube_value() -> Result<()> {
    let (mut registry, _, _) = registry();
    let connection = registry.connection("test_conn", "http://localhost:7777", "admin", "admin")?;
    let cube = connection.cube("Biker/P_L")?;
    let coordinates = ["Variance", "All Years", "Qtr.1", "501 Omega Group", "Net income / (loss)"];

    let mut harness = CubeHarness::new();
    harness.assert_equals_with_delta(
        -28124787.7676 * 2.0,
        CubeNumParam::new(cube.clone(), coordinates)
            .add(CubeNumParam::new(cube, coordinates))?,
        "doubled variance out of tolerance",
        0.001,
    );
    harness.verify()?;
    Ok(())
}

#[test]
fn subtracted_self_cancels_the_cube_value() -> Result<()> {
    let (mut registry, _, _) = registry();
    let connection = registry.connection("test_conn", "http://localhost:7777", "admin", "admin")?;
    let cube = connection.cube("Biker/P_L")?;
    let coordinates = ["Variance", "All Years", "Qtr.1", "501 Omega Group", "Net income / (loss)"];

    let mut harness = CubeHarness::new();
    harness.assert_equals_with_delta(
        0.0,
        CubeNumParam::new(cube.clone(), coordinates)
            .subtract(CubeNumParam::new(cube, coordinates))?,
        "self-subtraction should cancel",
        0.001,
    );
    harness.verify()?;
    Ok(())
}

#[test]
fn text_lookup_compares_against_scalar_text() -> Result<()> {
    let (mut registry, _, _) = registry();
    let connection = registry.connection("test_conn", "http://localhost:7777", "admin", "admin")?;
    let cube = connection.cube("System/#_USER_GROUP")?;

    let mut harness = CubeHarness::new();
    harness.assert_equals(
        "built-in",
        CubeTextParam::new(cube.clone(), ["admin", "description"]),
        "description drifted",
    );
    harness.assert_equals(
        CubeTextParam::new(cube, ["missing", "description"]),
        cubecheck::CellValue::Null,
        "absent text cell should read as null",
    );
    harness.verify()?;
    Ok(())
}

#[test]
fn truth_checks_and_orderings_run_in_one_pass() -> Result<()> {
    let (mut registry, _, _) = registry();
    let connection = registry.connection("test_conn", "http://localhost:7777", "admin", "admin")?;
    let cube = connection.cube("System/#_USER_GROUP")?;

    let mut harness = CubeHarness::new();
    harness.assert_true(true, "literal true");
    harness.assert_false(false, "literal false");
    harness.assert_greater_than(0, CubeNumParam::new(cube.clone(), ["admin", "admin"]), "positive");
    harness.assert_less_than(2, CubeNumParam::new(cube.clone(), ["admin", "admin"]), "below two");
    harness.assert_greater_than_or_equal(1, CubeNumParam::new(cube.clone(), ["admin", "admin"]), "at least one");
    harness.assert_less_than_or_equal(1, CubeNumParam::new(cube, ["admin", "admin"]), "at most one");
    harness.verify()?;
    Ok(())
}

#[test]
fn registry_reuses_connections_per_id() -> Result<()> {
    let (mut registry, _, _) = registry();
    let first = registry.connection("test_conn", "http://localhost:7777", "admin", "admin")?;
    let second = registry.connection("test_conn", "ignored", "ignored", "ignored")?;
    assert_eq!(first.id(), second.id());
    assert_eq!(second.host(), "http://localhost:7777");
    assert_eq!(registry.len(), 1);

    registry.close_all();
    assert!(registry.is_empty());
    Ok(())
}
