//! In-process object registry and method dispatcher for a message bus.
//!
//! Applications export objects by registering interface tables at object
//! paths. Inbound method calls are routed by path, interface and member name
//! to a [`MethodBinding`], which adapts the decoded arguments and runs the
//! handler.
//!
//! Path resolution happens in two phases. A node registered at exactly the
//! requested path serves all of its interfaces. Otherwise the nearest
//! registered ancestor lends the interfaces it registered with subtree scope,
//! which lets one registration answer for a whole family of dynamic paths.
//! Every object additionally answers `org.freedesktop.DBus.Introspectable`,
//! listing the immediate children of its path.
//!
//! The wire format is out of scope: a transport decodes messages into
//! [`MethodCall`]s and encodes the replies produced by a [`MessageHandler`].
//! [`BusContext`] owns the session and system bus connections of a process
//! and opens them lazily through a [`BusConnector`].

mod bootstrap;
mod context;
mod dispatch;
mod errors;
mod method;
mod node;
pub mod path;
mod registry;
pub mod telemetry;
pub mod value;

pub use bootstrap::{BootstrapError, ConfigLoader, SystemConfigLoader, bootstrap, bootstrap_with};
pub use context::{BusConnector, BusContext, BusKind, BusKindParseError, ConnectError};
pub use dispatch::{MessageHandler, MethodCall};
pub use errors::{
    BusError, CallError, DispatchError, InvocationError, MethodError, RegistryError, names,
};
pub use method::{CallContext, HandlerFn, MethodBinding, MethodSignature};
pub use node::{InterfaceMap, InterfaceTable, MethodTable};
pub use path::{ObjectPath, PathError};
pub use registry::{
    INTROSPECT_METHOD, INTROSPECTABLE_INTERFACE, ObjectRegistry, Resolution, ResolvedObject,
};
pub use telemetry::{TelemetryError, TelemetryHandle};
pub use value::{ArgSlot, Value, ValueKind, ValueTypeError};

#[cfg(test)]
mod tests;
