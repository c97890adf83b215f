pub mod config;

use crate::core::{DriverError, Result};
use crate::cursor::Cursor;
use crate::protocol::{HttpTransport, ProtocolClient, Transport};
use crate::session::SessionManager;
use serde_json::{Map, Value};
use std::fmt;

pub use config::{ConnectionConfig, Scheme};

/// An open connection to one database.
///
/// Owns the session (and with it the auth token) and hands out cursors.
/// A connection is not safe for concurrent use; callers wanting concurrency
/// open one connection per worker.
pub struct Connection {
    config: ConnectionConfig,
    session: SessionManager,
    closed: bool,
}

impl Connection {
    /// Open a connection: build the HTTP transport and log in.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use faircom_jsonapi::{Connection, ConnectionConfig};
    ///
    /// # fn main() -> faircom_jsonapi::Result<()> {
    /// let config = ConnectionConfig::new("localhost").credentials("ADMIN", "ADMIN");
    /// let conn = Connection::open(config)?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn open(config: ConnectionConfig) -> Result<Self> {
        config.validate().map_err(DriverError::Interface)?;
        let transport = HttpTransport::new(config.endpoint(), config.request_timeout)?;
        Self::open_with_transport(config, Box::new(transport))
    }

    /// Open over a caller-supplied transport.
    ///
    /// This is the seam for pooling layers and tests; the login handshake
    /// still runs.
    pub fn open_with_transport(
        config: ConnectionConfig,
        transport: Box<dyn Transport>,
    ) -> Result<Self> {
        let client = ProtocolClient::new(transport, config.debug);
        let mut session = SessionManager::new(client);
        session.login(&config.username, &config.password)?;

        Ok(Self {
            config,
            session,
            closed: false,
        })
    }

    /// Create a cursor bound to this connection. Any number may be open at
    /// once.
    pub fn cursor(&self) -> Result<Cursor<'_>> {
        self.ensure_open()?;
        Ok(Cursor::new(self))
    }

    /// No-op: the wire protocol is statement-at-a-time, every statement is
    /// auto-committed by the server.
    pub fn commit(&self) -> Result<()> {
        self.ensure_open()
    }

    /// No-op, see [`Connection::commit`].
    pub fn rollback(&self) -> Result<()> {
        self.ensure_open()
    }

    /// Close the session (best effort) and mark the connection closed.
    /// Idempotent and infallible from the caller's point of view.
    pub fn close(&mut self) {
        if !self.closed {
            self.session.logout();
            self.closed = true;
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn database(&self) -> &str {
        &self.config.database
    }

    pub(crate) fn dispatch(
        &self,
        action: &str,
        params: &Map<String, Value>,
    ) -> Result<Map<String, Value>> {
        self.ensure_open()?;
        self.session.dispatch(action, params)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(DriverError::Interface("connection is closed".into()));
        }
        Ok(())
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

// The transport is a trait object, so Debug is written by hand. The password
// is deliberately left out.
impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("endpoint", &self.config.endpoint())
            .field("database", &self.config.database)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}
