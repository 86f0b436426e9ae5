//! Connection-facing adapter: routes decoded method calls to bindings.
//!
//! A transport decodes an inbound message into a [`MethodCall`] and hands it
//! to a [`MessageHandler`]. The reply is either the result values or a
//! [`DispatchError`] whose [`error_name`](DispatchError::error_name) and
//! [`message`](DispatchError::message) go back onto the wire.

use tracing::{debug, warn};

use crate::errors::DispatchError;
use crate::method::CallContext;
use crate::registry::ObjectRegistry;
use crate::value::{ArgSlot, Value};

/// Tracing target for dispatch operations.
pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

/// One decoded inbound method call.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    path: String,
    interface: Option<String>,
    member: String,
    sender: Option<String>,
    args: Vec<ArgSlot>,
}

impl MethodCall {
    /// Creates a call with no interface, sender or arguments.
    #[must_use]
    pub fn new(path: impl Into<String>, member: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            interface: None,
            member: member.into(),
            sender: None,
            args: Vec::new(),
        }
    }

    /// Names the target interface.
    #[must_use]
    pub fn with_interface(mut self, interface: impl Into<String>) -> Self {
        self.interface = Some(interface.into());
        self
    }

    /// Records the caller's unique bus name.
    #[must_use]
    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = Some(sender.into());
        self
    }

    /// Replaces the argument slots.
    #[must_use]
    pub fn with_args(mut self, args: Vec<ArgSlot>) -> Self {
        self.args = args;
        self
    }

    /// Appends one decoded argument.
    #[must_use]
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.args.push(ArgSlot::filled(value));
        self
    }

    /// Target object path.
    #[must_use]
    pub fn path(&self) -> &str {
        self.path.as_str()
    }

    /// Target interface, if the caller named one.
    #[must_use]
    pub fn interface(&self) -> Option<&str> {
        self.interface.as_deref()
    }

    /// Method name.
    #[must_use]
    pub fn member(&self) -> &str {
        self.member.as_str()
    }

    /// Caller's unique bus name.
    #[must_use]
    pub fn sender(&self) -> Option<&str> {
        self.sender.as_deref()
    }

    /// Argument slots in order.
    #[must_use]
    pub fn args(&self) -> &[ArgSlot] {
        self.args.as_slice()
    }
}

/// Serves inbound method calls for one connection.
pub trait MessageHandler: Send + Sync {
    /// Routes `call` and returns the reply values.
    ///
    /// # Errors
    ///
    /// Returns a [`DispatchError`] describing why no reply values exist.
    fn handle_call(&self, call: MethodCall) -> Result<Vec<Value>, DispatchError>;
}

impl MessageHandler for ObjectRegistry {
    fn handle_call(&self, call: MethodCall) -> Result<Vec<Value>, DispatchError> {
        let MethodCall {
            path,
            interface,
            member,
            sender,
            args,
        } = call;

        debug!(
            target: DISPATCH_TARGET,
            path = %path,
            interface = interface.as_deref().unwrap_or(""),
            member = %member,
            sender = sender.as_deref().unwrap_or(""),
            args = args.len(),
            "dispatching method call"
        );

        let Some(object) = self.resolve(&path) else {
            warn!(target: DISPATCH_TARGET, path = %path, "call targets a malformed path");
            return Err(DispatchError::unknown_object(path));
        };

        let requested = interface.as_deref().filter(|name| !name.is_empty());
        if let Some(name) = requested
            && !object.has_interface(name)
        {
            debug!(
                target: DISPATCH_TARGET,
                path = %path,
                interface = name,
                "interface not served at path"
            );
            return Err(DispatchError::unknown_interface(path, name));
        }

        let Some(binding) = object.lookup_method(requested.unwrap_or(""), &member) else {
            debug!(
                target: DISPATCH_TARGET,
                path = %path,
                member = %member,
                "method not found"
            );
            return Err(DispatchError::unknown_method(path, requested, member));
        };

        let context = CallContext::new(&path, requested, &member).with_sender(sender.as_deref());
        binding.call(&context, args).map_err(|error| {
            warn!(
                target: DISPATCH_TARGET,
                path = %path,
                member = %member,
                error_name = error.error_name(),
                error = %error,
                "method call failed"
            );
            DispatchError::from(error)
        })
    }
}
