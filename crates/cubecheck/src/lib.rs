#![forbid(unsafe_code)]
//! Deferred, batched assertion engine for OLAP cube verification.
//!
//! Comparisons registered during a test body are queued instead of
//! evaluated; `verify()` then fetches every required coordinate in one
//! cache session per distinct cube, evaluates the whole queue and raises a
//! single aggregated failure listing every mismatch.
//!
//! ```
//! use cubecheck::cube::{CubeCell, CubeId};
//! use cubecheck::harness::CubeHarness;
//! use cubecheck::memory_backend::{memory_handle, MemoryCube};
//! use cubecheck::param::CubeNumParam;
//!
//! let mut cube = MemoryCube::new("#_USER_GROUP");
//! cube.set(&["admin", "admin"], CubeCell::Numeric(1.0));
//! let handle = memory_handle(
//!     CubeId::new("test_conn", "System/#_USER_GROUP"),
//!     &cube.into_shared(),
//! );
//!
//! let mut harness = CubeHarness::new();
//! harness.assert_equals(
//!     1,
//!     CubeNumParam::new(handle, ["admin", "admin"]),
//!     "admin user is not assigned to admin group",
//! );
//! harness.verify().expect("all assertions hold");
//! ```

pub mod cache_plan;
pub mod cell_value;
pub mod connection;
pub mod cube;
pub mod evaluate;
pub mod harness;
pub mod memory_backend;
pub mod param;
pub mod report;
pub mod scenario;

pub use cache_plan::{FetchPlan, FlushReceipt};
pub use cell_value::{CellValue, TypeTag};
pub use connection::{Connection, ConnectionRegistry, Connector, CubeProvider};
pub use cube::{CubeCell, CubeHandle, CubeId, CubeTransport, TransportError};
pub use harness::{CubeHarness, HarnessError};
pub use param::{CubeNumParam, CubeTextParam, ParamError, TestParam};
pub use report::{FailureReport, ReportConfig};
pub use scenario::{ComparisonKind, TestScenario, DEFAULT_DELTA};
