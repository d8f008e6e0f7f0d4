//! Cube collaborator seam.
//!
//! The engine never speaks the wire protocol itself; it drives a
//! [`CubeTransport`] implementation through a shared [`CubeHandle`]. The
//! contract is the batched cache session: every `fetch_value` issued
//! between `start_cache_session(true)` and `end_cache_session` is coalesced
//! by the transport into a single round trip for that cube, and subsequent
//! fetches of those coordinates are served from the transport's cache.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Ordered dimension-element names identifying one cell in a cube.
pub type Coordinates = Vec<String>;

// ---------------------------------------------------------------------------
// CubeCell
// ---------------------------------------------------------------------------

/// Raw result of a coordinate fetch.
///
/// `NotAvailable` is the `#NA` sentinel some stores return for cells that
/// exist but carry no value; `Empty` is an absent cell. The engine treats
/// both as "no value".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CubeCell {
    Numeric(f64),
    Text(String),
    NotAvailable,
    Empty,
}

impl CubeCell {
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::NotAvailable | Self::Empty)
    }
}

// ---------------------------------------------------------------------------
// TransportError
// ---------------------------------------------------------------------------

/// Failure raised by the transport collaborator.
///
/// Transport failures are always fatal for the running test; they are never
/// deferred into the aggregated assertion report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("connection to `{host}` failed: {detail}")]
    Connection { host: String, detail: String },
    #[error("unknown cube `{path}` on connection `{connection}`")]
    UnknownCube { connection: String, path: String },
    #[error("cache session on cube `{cube}` failed: {detail}")]
    Session { cube: String, detail: String },
    #[error("fetch from cube `{cube}` failed: {detail}")]
    Fetch { cube: String, detail: String },
}

// ---------------------------------------------------------------------------
// CubeTransport
// ---------------------------------------------------------------------------

/// Transport-side view of one cube.
pub trait CubeTransport {
    /// Open a batch window; fetches until the matching close are coalesced
    /// into one round trip.
    fn start_cache_session(&mut self, enabled: bool) -> Result<(), TransportError>;

    /// Fetch one cell. Inside a session this registers the coordinates for
    /// the batch; outside it is served from cache or costs a round trip.
    fn fetch_value(&mut self, coordinates: &[String]) -> Result<CubeCell, TransportError>;

    /// Close the batch window, executing the coalesced round trip.
    fn end_cache_session(&mut self) -> Result<(), TransportError>;
}

// ---------------------------------------------------------------------------
// CubeId / CubeHandle
// ---------------------------------------------------------------------------

/// Identity of a cube: owning connection plus cube path.
///
/// Batch deduplication keys on this, not on coordinates.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CubeId {
    pub connection: String,
    pub path: String,
}

impl CubeId {
    pub fn new(connection: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            connection: connection.into(),
            path: path.into(),
        }
    }
}

impl fmt::Display for CubeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.connection, self.path)
    }
}

/// Shared handle to one cube.
///
/// The engine is single-threaded by design; handles are reference-counted
/// so the same cube reached from several parameters batches once.
#[derive(Clone)]
pub struct CubeHandle {
    id: CubeId,
    transport: Rc<RefCell<dyn CubeTransport>>,
}

impl CubeHandle {
    pub fn new(id: CubeId, transport: Rc<RefCell<dyn CubeTransport>>) -> Self {
        Self { id, transport }
    }

    pub fn id(&self) -> &CubeId {
        &self.id
    }

    pub fn start_cache_session(&self, enabled: bool) -> Result<(), TransportError> {
        self.transport.borrow_mut().start_cache_session(enabled)
    }

    pub fn fetch_value(&self, coordinates: &[String]) -> Result<CubeCell, TransportError> {
        self.transport.borrow_mut().fetch_value(coordinates)
    }

    pub fn end_cache_session(&self) -> Result<(), TransportError> {
        self.transport.borrow_mut().end_cache_session()
    }
}

impl fmt::Debug for CubeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CubeHandle").field("id", &self.id).finish()
    }
}
