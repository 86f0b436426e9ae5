//! Test doubles shared by unit and behaviour tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use objbus_config::{BusAddress, Config};

use crate::context::{BusConnector, BusKind, ConnectError};
use crate::errors::MethodError;
use crate::method::{MethodBinding, MethodSignature};
use crate::node::MethodTable;
use crate::registry::ObjectRegistry;
use crate::value::{Value, ValueKind};

/// Connection handed out by [`RecordingConnector`].
#[derive(Debug)]
pub(crate) struct FakeConnection {
    pub(crate) kind: BusKind,
    pub(crate) address: String,
    pub(crate) handler: ObjectRegistry,
}

/// Connector that records every attempt and can fail a fixed number of times.
#[derive(Debug, Default)]
pub(crate) struct RecordingConnector {
    attempts: Mutex<Vec<BusKind>>,
    failures_left: AtomicUsize,
}

impl RecordingConnector {
    /// Builds a connector whose first `times` attempts fail.
    pub(crate) fn failing(times: usize) -> Self {
        Self {
            attempts: Mutex::default(),
            failures_left: AtomicUsize::new(times),
        }
    }

    /// Kinds dialled so far, in order.
    pub(crate) fn attempts(&self) -> Vec<BusKind> {
        self.attempts
            .lock()
            .expect("recording connector mutex poisoned")
            .clone()
    }
}

impl BusConnector for RecordingConnector {
    type Connection = FakeConnection;

    fn connect(
        &self,
        kind: BusKind,
        address: &BusAddress,
        handler: ObjectRegistry,
    ) -> Result<Self::Connection, ConnectError> {
        self.attempts
            .lock()
            .expect("recording connector mutex poisoned")
            .push(kind);
        let should_fail = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(ConnectError::new(kind, address, "bus unavailable"));
        }
        Ok(FakeConnection {
            kind,
            address: address.to_string(),
            handler,
        })
    }
}

/// Configuration pointing both buses at scratch sockets.
pub(crate) fn scratch_config() -> Config {
    Config {
        session_bus: BusAddress::unix_path("/tmp/objbus-session"),
        system_bus: BusAddress::unix_path("/tmp/objbus-system"),
        ..Config::default()
    }
}

/// A table with one `Tag` method answering `label`.
pub(crate) fn tagged_table(label: impl Into<String>) -> MethodTable {
    let label = label.into();
    let mut methods = MethodTable::new();
    methods.insert(
        "Tag".to_owned(),
        MethodBinding::new(
            MethodSignature::new(Vec::new(), vec![ValueKind::Str]),
            move |_| Ok::<_, MethodError>(vec![Value::Str(label.clone())]),
        ),
    );
    methods
}
