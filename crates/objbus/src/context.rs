//! Lazily established bus connections.
//!
//! A process usually talks to at most one session bus and one system bus.
//! [`BusContext`] owns both slots: each has an [`ObjectRegistry`] from the
//! start, so objects can be exported before any connection exists, and the
//! connection itself is opened through a [`BusConnector`] the first time it
//! is requested.

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

use thiserror::Error;
use tracing::{debug, info, warn};

use objbus_config::{BusAddress, Config};

use crate::registry::ObjectRegistry;

/// Tracing target for connection management.
pub(crate) const CONTEXT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::context");

/// The two well-known message buses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BusKind {
    /// Per-login-session bus.
    Session,
    /// System-wide bus.
    System,
}

impl BusKind {
    /// Configured address of this bus.
    #[must_use]
    pub fn address(self, config: &Config) -> &BusAddress {
        match self {
            Self::Session => config.session_bus(),
            Self::System => config.system_bus(),
        }
    }
}

impl fmt::Display for BusKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Session => "session",
            Self::System => "system",
        };
        formatter.write_str(label)
    }
}

/// Error returned when parsing a bus kind fails.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unsupported bus kind: {0}")]
pub struct BusKindParseError(String);

impl BusKindParseError {
    /// The value that could not be parsed.
    #[must_use]
    pub fn value(&self) -> &str {
        self.0.as_str()
    }
}

impl FromStr for BusKind {
    type Err = BusKindParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "session" => Ok(Self::Session),
            "system" => Ok(Self::System),
            other => Err(BusKindParseError(other.to_owned())),
        }
    }
}

/// A connector failed to open a bus connection.
#[derive(Debug, Error)]
#[error("failed to connect to the {kind} bus at '{address}': {message}")]
pub struct ConnectError {
    /// Bus that could not be reached.
    pub kind: BusKind,
    address: String,
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ConnectError {
    /// Builds an error without an underlying source.
    #[must_use]
    pub fn new(kind: BusKind, address: &BusAddress, message: impl Into<String>) -> Self {
        Self {
            kind,
            address: address.to_string(),
            message: message.into(),
            source: None,
        }
    }

    /// Builds an error wrapping the transport's own error.
    #[must_use]
    pub fn with_source(
        kind: BusKind,
        address: &BusAddress,
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            kind,
            address: address.to_string(),
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Address that was dialled.
    #[must_use]
    pub fn address(&self) -> &str {
        self.address.as_str()
    }

    /// Human-readable failure description.
    #[must_use]
    pub fn message(&self) -> &str {
        self.message.as_str()
    }
}

/// Opens transport connections.
///
/// The connector receives the registry that must serve inbound calls on the
/// new connection; it typically wires it up as the connection's
/// [`MessageHandler`](crate::MessageHandler).
pub trait BusConnector: Send + Sync {
    /// Handle to an open connection.
    type Connection: Send + Sync;

    /// Connects to `address` on behalf of the `kind` bus.
    ///
    /// # Errors
    ///
    /// Returns a [`ConnectError`] when the bus cannot be reached.
    fn connect(
        &self,
        kind: BusKind,
        address: &BusAddress,
        handler: ObjectRegistry,
    ) -> Result<Self::Connection, ConnectError>;
}

struct BusSlot<T> {
    registry: ObjectRegistry,
    connection: Mutex<Option<Arc<T>>>,
}

impl<T> BusSlot<T> {
    fn new() -> Self {
        Self {
            registry: ObjectRegistry::new(),
            connection: Mutex::new(None),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Arc<T>>> {
        self.connection
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }
}

/// Owner of the session and system bus connections of a process.
pub struct BusContext<C: BusConnector> {
    config: Config,
    connector: C,
    session: BusSlot<C::Connection>,
    system: BusSlot<C::Connection>,
}

impl<C: BusConnector> BusContext<C> {
    /// Creates a context. No connection is opened yet.
    #[must_use]
    pub fn new(config: Config, connector: C) -> Self {
        Self {
            config,
            connector,
            session: BusSlot::new(),
            system: BusSlot::new(),
        }
    }

    /// The resolved configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The connector used for new connections.
    #[must_use]
    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Registry serving inbound calls on the `kind` bus.
    #[must_use]
    pub fn registry(&self, kind: BusKind) -> &ObjectRegistry {
        &self.slot(kind).registry
    }

    /// Returns the connection for `kind`, opening it on first use.
    ///
    /// Concurrent first callers are serialised so only one connection is
    /// opened. A failed attempt is reported to its caller and not
    /// remembered; the next call dials again.
    ///
    /// # Errors
    ///
    /// Returns the connector's [`ConnectError`].
    pub fn get_or_connect(&self, kind: BusKind) -> Result<Arc<C::Connection>, ConnectError> {
        let slot = self.slot(kind);
        let mut connection = slot.lock();
        if let Some(existing) = connection.as_ref() {
            return Ok(Arc::clone(existing));
        }

        let address = kind.address(&self.config);
        debug!(target: CONTEXT_TARGET, bus = %kind, address = %address, "connecting");
        match self
            .connector
            .connect(kind, address, slot.registry.clone())
        {
            Ok(opened) => {
                let opened = Arc::new(opened);
                *connection = Some(Arc::clone(&opened));
                info!(target: CONTEXT_TARGET, bus = %kind, address = %address, "connected");
                Ok(opened)
            }
            Err(error) => {
                warn!(
                    target: CONTEXT_TARGET,
                    bus = %kind,
                    address = %address,
                    error = %error,
                    "connection attempt failed"
                );
                Err(error)
            }
        }
    }

    /// Returns `true` once a connection for `kind` has been established.
    #[must_use]
    pub fn is_connected(&self, kind: BusKind) -> bool {
        self.slot(kind).lock().is_some()
    }

    fn slot(&self, kind: BusKind) -> &BusSlot<C::Connection> {
        match kind {
            BusKind::Session => &self.session,
            BusKind::System => &self.system,
        }
    }
}

impl<C: BusConnector> fmt::Debug for BusContext<C> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("BusContext")
            .field("config", &self.config)
            .field("session_connected", &self.is_connected(BusKind::Session))
            .field("system_connected", &self.is_connected(BusKind::System))
            .finish_non_exhaustive()
    }
}
