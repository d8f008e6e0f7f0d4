//! Batch-fetch planning: one cache session per distinct cube.
//!
//! Key behaviors:
//! - Worklist walk over every scenario's expected/actual parameter,
//!   including nested add/subtract operands at any depth.
//! - Registration keyed by cube identity; repeated coordinate tuples are
//!   left to the transport's idempotent batch.
//! - `flush()` opens, fills and closes one session per cube, closing each
//!   session immediately after that cube's fetch loop, before any
//!   assertion is evaluated.
//! - A serializable [`FlushReceipt`] records what the flush did.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::cube::{Coordinates, CubeHandle, CubeId, TransportError};
use crate::param::TestParam;
use crate::scenario::TestScenario;

/// Component name for structured events.
pub const CACHE_COMPONENT: &str = "cache_plan";

/// Schema version for flush receipts.
pub const FLUSH_RECEIPT_SCHEMA_VERSION: &str = "cubecheck.flush-receipt.v1";

// ---------------------------------------------------------------------------
// FetchPlan
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct CubeWork {
    cube: CubeHandle,
    coordinates: Vec<Coordinates>,
}

/// Every coordinate lookup needed to evaluate a scenario queue, grouped by
/// owning cube.
#[derive(Debug, Default)]
pub struct FetchPlan {
    per_cube: BTreeMap<CubeId, CubeWork>,
}

impl FetchPlan {
    /// Walk the queue and collect every cube-backed parameter.
    ///
    /// The traversal is an explicit worklist, not recursion: nested
    /// composition operands are pushed and drained until no new cube-backed
    /// parameter is found. Operand lists are owned values, so the walk
    /// terminates on any constructible parameter tree.
    pub fn discover(scenarios: &[TestScenario]) -> Self {
        let mut plan = Self::default();
        let mut worklist: Vec<&TestParam> = Vec::new();

        for scenario in scenarios {
            if let Some(expected) = scenario.expected() {
                worklist.push(expected);
            }
            worklist.push(scenario.actual());

            while let Some(param) = worklist.pop() {
                match param {
                    TestParam::Scalar(_) => {}
                    TestParam::CubeText(text) => {
                        plan.register(text.cube(), text.coordinates());
                    }
                    TestParam::CubeNumeric(numeric) => {
                        plan.register(numeric.cube(), numeric.coordinates());
                        worklist.extend(numeric.adds());
                        worklist.extend(numeric.subtracts());
                    }
                }
            }
        }
        plan
    }

    fn register(&mut self, cube: &CubeHandle, coordinates: &Coordinates) {
        self.per_cube
            .entry(cube.id().clone())
            .or_insert_with(|| CubeWork {
                cube: cube.clone(),
                coordinates: Vec::new(),
            })
            .coordinates
            .push(coordinates.clone());
    }

    /// Number of distinct cubes the plan touches.
    pub fn cube_count(&self) -> usize {
        self.per_cube.len()
    }

    pub fn is_empty(&self) -> bool {
        self.per_cube.is_empty()
    }

    /// Execute the batch: per distinct cube, open a cache session, fetch
    /// every registered tuple, close the session.
    ///
    /// A transport failure propagates immediately; the failing cube's
    /// session is still closed on a best-effort basis so the transport is
    /// not left buffering.
    pub fn flush(&self) -> Result<FlushReceipt, TransportError> {
        let mut cubes = Vec::with_capacity(self.per_cube.len());

        for (id, work) in &self.per_cube {
            work.cube.start_cache_session(true)?;
            for coordinates in &work.coordinates {
                if let Err(err) = work.cube.fetch_value(coordinates) {
                    let _ = work.cube.end_cache_session();
                    return Err(err);
                }
            }
            work.cube.end_cache_session()?;

            cubes.push(CubeFlush {
                cube: id.to_string(),
                coordinate_count: work.coordinates.len() as u64,
            });
        }

        Ok(FlushReceipt {
            schema_version: FLUSH_RECEIPT_SCHEMA_VERSION.to_string(),
            component: CACHE_COMPONENT.to_string(),
            cubes,
        })
    }
}

// ---------------------------------------------------------------------------
// FlushReceipt
// ---------------------------------------------------------------------------

/// Structured record of one executed flush.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CubeFlush {
    pub cube: String,
    pub coordinate_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlushReceipt {
    pub schema_version: String,
    pub component: String,
    pub cubes: Vec<CubeFlush>,
}

impl FlushReceipt {
    pub fn cube_count(&self) -> usize {
        self.cubes.len()
    }

    pub fn total_fetches(&self) -> u64 {
        self.cubes.iter().map(|c| c.coordinate_count).sum()
    }
}
