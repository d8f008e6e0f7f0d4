//! Deterministic in-memory cube backend.
//!
//! Reference implementation of the transport contract, used as the fixture
//! throughout the test suite. It instruments the session lifecycle so tests
//! can assert the batching guarantees directly:
//! - one round trip per non-empty cache session,
//! - evaluation reads served from cache, never the store,
//! - injectable fetch failures for the transport-abort path.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::connection::{Connection, Connector, CubeProvider};
use crate::cube::{Coordinates, CubeCell, CubeHandle, CubeId, CubeTransport, TransportError};

// ---------------------------------------------------------------------------
// SessionStats
// ---------------------------------------------------------------------------

/// Counters describing how a cube was driven.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    /// `start_cache_session` calls.
    pub sessions_opened: u64,
    /// `end_cache_session` calls.
    pub sessions_closed: u64,
    /// Network round trips: one per non-empty session, one per uncached
    /// out-of-session fetch.
    pub round_trips: u64,
    /// Out-of-session fetches answered from the session cache.
    pub cached_reads: u64,
}

// ---------------------------------------------------------------------------
// MemoryCube
// ---------------------------------------------------------------------------

/// In-memory cube with batched-session semantics.
#[derive(Debug, Default)]
pub struct MemoryCube {
    name: String,
    cells: BTreeMap<Coordinates, CubeCell>,
    cache: BTreeMap<Coordinates, CubeCell>,
    pending: Vec<Coordinates>,
    session_active: bool,
    fail_fetches: bool,
    stats: SessionStats,
}

impl MemoryCube {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Store a cell value.
    pub fn set(&mut self, coordinates: &[&str], cell: CubeCell) {
        let key: Coordinates = coordinates.iter().map(|c| c.to_string()).collect();
        self.cells.insert(key, cell);
    }

    /// Make every subsequent fetch fail, for transport-abort tests.
    pub fn fail_fetches(&mut self) {
        self.fail_fetches = true;
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn into_shared(self) -> Rc<RefCell<MemoryCube>> {
        Rc::new(RefCell::new(self))
    }

    fn lookup(&self, coordinates: &[String]) -> CubeCell {
        self.cells
            .get(coordinates)
            .cloned()
            .unwrap_or(CubeCell::Empty)
    }
}

impl CubeTransport for MemoryCube {
    fn start_cache_session(&mut self, enabled: bool) -> Result<(), TransportError> {
        if self.session_active {
            return Err(TransportError::Session {
                cube: self.name.clone(),
                detail: "session already open".to_string(),
            });
        }
        self.stats.sessions_opened += 1;
        self.session_active = enabled;
        self.pending.clear();
        Ok(())
    }

    fn fetch_value(&mut self, coordinates: &[String]) -> Result<CubeCell, TransportError> {
        if self.fail_fetches {
            return Err(TransportError::Fetch {
                cube: self.name.clone(),
                detail: "injected failure".to_string(),
            });
        }
        if self.session_active {
            // batch registration only; the value is not live yet
            self.pending.push(coordinates.to_vec());
            return Ok(CubeCell::Empty);
        }
        if let Some(cached) = self.cache.get(coordinates) {
            self.stats.cached_reads += 1;
            return Ok(cached.clone());
        }
        self.stats.round_trips += 1;
        Ok(self.lookup(coordinates))
    }

    fn end_cache_session(&mut self) -> Result<(), TransportError> {
        if !self.session_active {
            return Err(TransportError::Session {
                cube: self.name.clone(),
                detail: "no session open".to_string(),
            });
        }
        self.stats.sessions_closed += 1;
        if !self.pending.is_empty() {
            self.stats.round_trips += 1;
            for coordinates in std::mem::take(&mut self.pending) {
                let cell = self.lookup(&coordinates);
                self.cache.insert(coordinates, cell);
            }
        }
        self.session_active = false;
        Ok(())
    }
}

/// Build a [`CubeHandle`] over a shared in-memory cube.
pub fn memory_handle(id: CubeId, cube: &Rc<RefCell<MemoryCube>>) -> CubeHandle {
    CubeHandle::new(id, Rc::clone(cube) as Rc<RefCell<dyn CubeTransport>>)
}

// ---------------------------------------------------------------------------
// MemoryServer / MemoryConnector
// ---------------------------------------------------------------------------

/// One in-memory "server": a set of named cubes behind a connection.
#[derive(Debug, Default)]
pub struct MemoryServer {
    cubes: RefCell<BTreeMap<String, Rc<RefCell<MemoryCube>>>>,
    closed: RefCell<bool>,
}

impl MemoryServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a cube under `path`, returning the shared instance for
    /// seeding cells and reading stats.
    pub fn add_cube(&self, path: &str, cube: MemoryCube) -> Rc<RefCell<MemoryCube>> {
        let shared = cube.into_shared();
        self.cubes
            .borrow_mut()
            .insert(path.to_string(), Rc::clone(&shared));
        shared
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }
}

impl CubeProvider for MemoryServer {
    fn open_cube(&self, connection_id: &str, path: &str) -> Result<CubeHandle, TransportError> {
        let cubes = self.cubes.borrow();
        let shared = cubes.get(path).ok_or_else(|| TransportError::UnknownCube {
            connection: connection_id.to_string(),
            path: path.to_string(),
        })?;
        Ok(memory_handle(CubeId::new(connection_id, path), shared))
    }

    fn close(&self) {
        *self.closed.borrow_mut() = true;
    }
}

/// Connector mapping host names to pre-built [`MemoryServer`]s.
#[derive(Default)]
pub struct MemoryConnector {
    servers: BTreeMap<String, Rc<MemoryServer>>,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_server(&mut self, host: &str, server: Rc<MemoryServer>) {
        self.servers.insert(host.to_string(), server);
    }
}

impl Connector for MemoryConnector {
    fn connect(
        &self,
        id: &str,
        host: &str,
        _username: &str,
        _password: &str,
    ) -> Result<Connection, TransportError> {
        let server = self
            .servers
            .get(host)
            .ok_or_else(|| TransportError::Connection {
                host: host.to_string(),
                detail: "unknown host".to_string(),
            })?;
        Ok(Connection::new(id, host, Rc::clone(server) as Rc<dyn CubeProvider>))
    }
}
