//! Explicit connection registry.
//!
//! Repeated lookups with the same id return the same connection, so every
//! harness in a test binary shares one transport per store. Cleanup is an
//! explicit call (`remove`/`close_all`), not a destructor side effect.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::cube::{CubeHandle, TransportError};

// ---------------------------------------------------------------------------
// Collaborator traits
// ---------------------------------------------------------------------------

/// Factory for live connections; the transport crate implements this.
pub trait Connector {
    fn connect(
        &self,
        id: &str,
        host: &str,
        username: &str,
        password: &str,
    ) -> Result<Connection, TransportError>;
}

/// Cube lookup surface of one live connection.
pub trait CubeProvider {
    fn open_cube(&self, connection_id: &str, path: &str) -> Result<CubeHandle, TransportError>;

    fn close(&self);
}

// ---------------------------------------------------------------------------
// Connection
// ---------------------------------------------------------------------------

/// Handle to one live connection.
#[derive(Clone)]
pub struct Connection {
    id: String,
    host: String,
    provider: Rc<dyn CubeProvider>,
}

impl Connection {
    pub fn new(id: impl Into<String>, host: impl Into<String>, provider: Rc<dyn CubeProvider>) -> Self {
        Self {
            id: id.into(),
            host: host.into(),
            provider,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn cube(&self, path: &str) -> Result<CubeHandle, TransportError> {
        self.provider.open_cube(&self.id, path)
    }

    pub fn close(&self) {
        self.provider.close();
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("host", &self.host)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// ConnectionRegistry
// ---------------------------------------------------------------------------

/// Registry of connections keyed by caller-chosen id.
pub struct ConnectionRegistry {
    connector: Box<dyn Connector>,
    connections: BTreeMap<String, Connection>,
}

impl ConnectionRegistry {
    pub fn new(connector: Box<dyn Connector>) -> Self {
        Self {
            connector,
            connections: BTreeMap::new(),
        }
    }

    /// Look up or open the connection registered under `id`.
    ///
    /// Idempotent per id: the host and credentials are only used the first
    /// time an id is seen.
    pub fn connection(
        &mut self,
        id: &str,
        host: &str,
        username: &str,
        password: &str,
    ) -> Result<Connection, TransportError> {
        if let Some(existing) = self.connections.get(id) {
            return Ok(existing.clone());
        }
        let connection = self.connector.connect(id, host, username, password)?;
        self.connections.insert(id.to_string(), connection.clone());
        Ok(connection)
    }

    /// Close and drop the connection under `id`; reports whether one existed.
    pub fn remove(&mut self, id: &str) -> bool {
        match self.connections.remove(id) {
            Some(connection) => {
                connection.close();
                true
            }
            None => false,
        }
    }

    /// Drop all registered connections without closing them.
    pub fn clear(&mut self) {
        self.connections.clear();
    }

    /// Close every registered connection and drop them.
    pub fn close_all(&mut self) {
        for connection in self.connections.values() {
            connection.close();
        }
        self.connections.clear();
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

impl fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("connections", &self.connections.keys().collect::<Vec<_>>())
            .finish()
    }
}
