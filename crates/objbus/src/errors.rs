//! Error types for registration, invocation and dispatch.
//!
//! Registration problems go back to the application that tried to export an
//! object. Invocation and application errors travel back to the transport,
//! which encodes them onto the wire using [`DispatchError::error_name`] and
//! [`DispatchError::message`].

use std::error::Error as StdError;
use std::fmt;

use thiserror::Error;

use crate::path::PathError;
use crate::value::{Value, ValueKind, ValueTypeError};

/// Well-known error names understood by bus clients.
pub mod names {
    /// Generic failure.
    pub const FAILED: &str = "org.freedesktop.DBus.Error.Failed";
    /// No object handles the requested path.
    pub const UNKNOWN_OBJECT: &str = "org.freedesktop.DBus.Error.UnknownObject";
    /// The object does not implement the requested interface.
    pub const UNKNOWN_INTERFACE: &str = "org.freedesktop.DBus.Error.UnknownInterface";
    /// The interface has no such method.
    pub const UNKNOWN_METHOD: &str = "org.freedesktop.DBus.Error.UnknownMethod";
    /// Arguments did not match the method signature.
    pub const INVALID_ARGS: &str = "org.freedesktop.DBus.Error.InvalidArgs";
}

/// Structured error carried on the bus: a symbolic name plus a body.
///
/// `BusError::default()` (empty name, empty body) is the "no error" sentinel;
/// handlers returning it are treated as successful.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BusError {
    name: String,
    body: Vec<Value>,
}

impl BusError {
    /// Builds an error whose body is a single message string.
    #[must_use]
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            body: vec![Value::Str(message.into())],
        }
    }

    /// Builds an error with an arbitrary body.
    #[must_use]
    pub fn with_body(name: impl Into<String>, body: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            body,
        }
    }

    /// Builds an `org.freedesktop.DBus.Error.Failed` error.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::new(names::FAILED, message)
    }

    /// Symbolic error name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Error body values.
    #[must_use]
    pub fn body(&self) -> &[Value] {
        self.body.as_slice()
    }

    /// Human-readable message: the first body value when it is a string.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.body.first().and_then(Value::as_str)
    }

    /// Returns `true` for the zero sentinel.
    #[must_use]
    pub fn is_unset(&self) -> bool {
        self.name.is_empty() && self.body.is_empty()
    }
}

impl fmt::Display for BusError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.message() {
            Some(message) => write!(formatter, "{}: {message}", self.name),
            None => formatter.write_str(&self.name),
        }
    }
}

impl StdError for BusError {}

/// Error returned by a method handler.
#[derive(Debug, Error)]
pub enum MethodError {
    /// Typed bus error, forwarded with its own name.
    #[error(transparent)]
    Bus(#[from] BusError),
    /// Any other error; reported to clients as `Failed`.
    #[error(transparent)]
    Other(Box<dyn StdError + Send + Sync>),
}

impl MethodError {
    /// Wraps an arbitrary error.
    pub fn other(error: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self::Other(error.into())
    }

    /// Shorthand for a `Failed` bus error.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Bus(BusError::failed(message))
    }

    /// Name to put on the wire.
    #[must_use]
    pub fn error_name(&self) -> &str {
        match self {
            Self::Bus(error) if !error.name().is_empty() => error.name(),
            Self::Bus(_) | Self::Other(_) => names::FAILED,
        }
    }

    /// Returns `true` when this is the zero bus-error sentinel, either
    /// typed or boxed inside [`MethodError::Other`].
    #[must_use]
    pub fn is_unset(&self) -> bool {
        match self {
            Self::Bus(error) => error.is_unset(),
            Self::Other(inner) => inner
                .downcast_ref::<BusError>()
                .is_some_and(BusError::is_unset),
        }
    }
}

impl From<ValueTypeError> for MethodError {
    fn from(error: ValueTypeError) -> Self {
        Self::Other(Box::new(error))
    }
}

/// Argument or result shape did not match a method's signature.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvocationError {
    /// Wrong number of arguments.
    #[error("expected {expected} argument(s), received {received}")]
    ArityMismatch {
        /// Declared parameter count.
        expected: usize,
        /// Supplied argument count.
        received: usize,
    },
    /// The transport never decoded a value into this slot.
    #[error("argument {index} was never decoded")]
    UnfilledArgument {
        /// Zero-based argument position.
        index: usize,
    },
    /// An argument had a different type than declared.
    #[error("argument {index} has type '{found}', expected '{expected}'")]
    KindMismatch {
        /// Zero-based argument position.
        index: usize,
        /// Declared kind.
        expected: ValueKind,
        /// Supplied kind.
        found: ValueKind,
    },
    /// The handler returned a different number of values than declared.
    #[error("handler returned {returned} value(s), signature declares {declared}")]
    ReturnArityMismatch {
        /// Declared return count.
        declared: usize,
        /// Values actually returned.
        returned: usize,
    },
}

/// Failure of [`MethodBinding::call`](crate::MethodBinding::call).
#[derive(Debug, Error)]
pub enum CallError {
    /// Arguments could not be adapted to the handler.
    #[error("invocation failed: {0}")]
    Invocation(#[from] InvocationError),
    /// The handler ran and reported an error.
    #[error(transparent)]
    Application(#[from] MethodError),
}

impl CallError {
    /// Name to put on the wire.
    #[must_use]
    pub fn error_name(&self) -> &str {
        match self {
            Self::Invocation(_) => names::INVALID_ARGS,
            Self::Application(error) => error.error_name(),
        }
    }
}

/// Errors surfaced while registering objects.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The object path failed validation.
    #[error("invalid object path: {0}")]
    InvalidPath(#[from] PathError),
    /// The interface name failed validation.
    #[error("invalid interface name '{name}': {reason}")]
    InvalidInterface {
        /// Offending name.
        name: String,
        /// What was wrong with it.
        reason: &'static str,
    },
}

impl RegistryError {
    /// Creates an invalid interface error.
    pub fn invalid_interface(name: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidInterface {
            name: name.into(),
            reason,
        }
    }
}

/// Errors returned to the transport for an inbound call.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The target path is not an object path.
    #[error("no object at path '{path}'")]
    UnknownObject {
        /// Requested path.
        path: String,
    },
    /// The resolved object lacks the requested interface.
    #[error("interface '{interface}' does not exist at path '{path}'")]
    UnknownInterface {
        /// Requested path.
        path: String,
        /// Requested interface.
        interface: String,
    },
    /// No matching method exists.
    #[error("method '{method}' does not exist{} at path '{path}'", interface_suffix(.interface.as_deref()))]
    UnknownMethod {
        /// Requested path.
        path: String,
        /// Requested interface, when one was named.
        interface: Option<String>,
        /// Requested method.
        method: String,
    },
    /// The method was found but the call failed.
    #[error(transparent)]
    Call(#[from] CallError),
}

fn interface_suffix(interface: Option<&str>) -> String {
    interface
        .map(|name| format!(" on interface '{name}'"))
        .unwrap_or_default()
}

impl DispatchError {
    /// Creates an unknown object error.
    pub fn unknown_object(path: impl Into<String>) -> Self {
        Self::UnknownObject { path: path.into() }
    }

    /// Creates an unknown interface error.
    pub fn unknown_interface(path: impl Into<String>, interface: impl Into<String>) -> Self {
        Self::UnknownInterface {
            path: path.into(),
            interface: interface.into(),
        }
    }

    /// Creates an unknown method error.
    pub fn unknown_method(
        path: impl Into<String>,
        interface: Option<&str>,
        method: impl Into<String>,
    ) -> Self {
        Self::UnknownMethod {
            path: path.into(),
            interface: interface.map(str::to_owned),
            method: method.into(),
        }
    }

    /// Symbolic error name for the reply.
    #[must_use]
    pub fn error_name(&self) -> &str {
        match self {
            Self::UnknownObject { .. } => names::UNKNOWN_OBJECT,
            Self::UnknownInterface { .. } => names::UNKNOWN_INTERFACE,
            Self::UnknownMethod { .. } => names::UNKNOWN_METHOD,
            Self::Call(error) => error.error_name(),
        }
    }

    /// Message for the reply body.
    ///
    /// Bus errors raised by handlers keep their own message; everything else
    /// uses the display text.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Call(CallError::Application(MethodError::Bus(error))) => error
                .message()
                .map_or_else(|| error.name().to_owned(), str::to_owned),
            other => other.to_string(),
        }
    }
}
