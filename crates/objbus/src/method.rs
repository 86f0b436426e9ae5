//! Method bindings: one uniform calling convention for every exported method.
//!
//! Registrants hand over a closure that already has the shape
//! `(arguments) -> Result<results, MethodError>`, optionally paired with a
//! [`MethodSignature`]. The signature is metadata for the marshaller and a
//! shape check before the call; dispatch itself is always a direct call
//! through the closure.

use std::fmt;
use std::sync::Arc;

use crate::errors::{CallError, InvocationError, MethodError};
use crate::value::{ArgSlot, Value, ValueKind};

/// Uniform handler signature stored in a [`MethodBinding`].
pub type HandlerFn =
    dyn Fn(&CallContext<'_>, Vec<Value>) -> Result<Vec<Value>, MethodError> + Send + Sync;

/// Addressing information of the call being served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallContext<'a> {
    path: &'a str,
    interface: Option<&'a str>,
    member: &'a str,
    sender: Option<&'a str>,
}

impl<'a> CallContext<'a> {
    /// Builds a context for a call on `path`.
    #[must_use]
    pub fn new(path: &'a str, interface: Option<&'a str>, member: &'a str) -> Self {
        Self {
            path,
            interface,
            member,
            sender: None,
        }
    }

    /// Attaches the unique name of the caller.
    #[must_use]
    pub fn with_sender(mut self, sender: Option<&'a str>) -> Self {
        self.sender = sender;
        self
    }

    /// Target object path.
    #[must_use]
    pub fn path(&self) -> &'a str {
        self.path
    }

    /// Interface named by the caller, if any.
    #[must_use]
    pub fn interface(&self) -> Option<&'a str> {
        self.interface
    }

    /// Method name.
    #[must_use]
    pub fn member(&self) -> &'a str {
        self.member
    }

    /// Caller's unique bus name, when the transport knows it.
    #[must_use]
    pub fn sender(&self) -> Option<&'a str> {
        self.sender
    }
}

/// Parameter and return kinds of a method.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MethodSignature {
    parameters: Vec<ValueKind>,
    returns: Vec<ValueKind>,
}

impl MethodSignature {
    /// Builds a signature from parameter and return kinds.
    #[must_use]
    pub fn new(parameters: Vec<ValueKind>, returns: Vec<ValueKind>) -> Self {
        Self {
            parameters,
            returns,
        }
    }

    /// Parameter kinds in order.
    #[must_use]
    pub fn parameters(&self) -> &[ValueKind] {
        self.parameters.as_slice()
    }

    /// Return kinds in order.
    #[must_use]
    pub fn returns(&self) -> &[ValueKind] {
        self.returns.as_slice()
    }

    /// Concatenated parameter signature, e.g. `sa{sv}`.
    #[must_use]
    pub fn parameter_signature(&self) -> String {
        self.parameters.iter().map(ToString::to_string).collect()
    }

    /// Concatenated return signature.
    #[must_use]
    pub fn return_signature(&self) -> String {
        self.returns.iter().map(ToString::to_string).collect()
    }
}

/// A callable method plus its optional signature descriptor.
///
/// Cloning is cheap; clones share the handler.
#[derive(Clone)]
pub struct MethodBinding {
    signature: Option<MethodSignature>,
    handler: Arc<HandlerFn>,
}

impl MethodBinding {
    /// Binds a handler that only needs the arguments.
    pub fn new<F>(signature: MethodSignature, handler: F) -> Self
    where
        F: Fn(Vec<Value>) -> Result<Vec<Value>, MethodError> + Send + Sync + 'static,
    {
        Self::with_context(signature, move |_context, args| handler(args))
    }

    /// Binds a handler that also receives the call's addressing information.
    pub fn with_context<F>(signature: MethodSignature, handler: F) -> Self
    where
        F: Fn(&CallContext<'_>, Vec<Value>) -> Result<Vec<Value>, MethodError>
            + Send
            + Sync
            + 'static,
    {
        Self::from_parts(Some(signature), handler)
    }

    /// Binds a handler without a descriptor. Arguments are passed through
    /// unchecked and the accessors report zero parameters and returns.
    pub fn untyped<F>(handler: F) -> Self
    where
        F: Fn(Vec<Value>) -> Result<Vec<Value>, MethodError> + Send + Sync + 'static,
    {
        Self::from_parts(None, move |_context, args| handler(args))
    }

    fn from_parts<F>(signature: Option<MethodSignature>, handler: F) -> Self
    where
        F: Fn(&CallContext<'_>, Vec<Value>) -> Result<Vec<Value>, MethodError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            signature,
            handler: Arc::new(handler),
        }
    }

    /// The descriptor, when one was supplied.
    #[must_use]
    pub fn signature(&self) -> Option<&MethodSignature> {
        self.signature.as_ref()
    }

    /// Number of declared parameters.
    #[must_use]
    pub fn parameter_count(&self) -> usize {
        self.signature
            .as_ref()
            .map_or(0, |signature| signature.parameters.len())
    }

    /// Zero value of parameter `index`.
    #[must_use]
    pub fn parameter_zero_value(&self, index: usize) -> Option<Value> {
        self.signature
            .as_ref()
            .and_then(|signature| signature.parameters.get(index))
            .map(ValueKind::zero)
    }

    /// Number of declared return values.
    #[must_use]
    pub fn return_count(&self) -> usize {
        self.signature
            .as_ref()
            .map_or(0, |signature| signature.returns.len())
    }

    /// Zero value of return `index`.
    #[must_use]
    pub fn return_zero_value(&self, index: usize) -> Option<Value> {
        self.signature
            .as_ref()
            .and_then(|signature| signature.returns.get(index))
            .map(ValueKind::zero)
    }

    /// Unwraps the argument slots, runs the handler and normalises its
    /// outcome.
    ///
    /// A handler returning the zero [`BusError`](crate::BusError) sentinel
    /// succeeds with the zero values of the declared returns.
    ///
    /// # Errors
    ///
    /// [`CallError::Invocation`] when the arguments or results do not fit the
    /// signature, [`CallError::Application`] for any other handler error.
    pub fn call(
        &self,
        context: &CallContext<'_>,
        args: Vec<ArgSlot>,
    ) -> Result<Vec<Value>, CallError> {
        let values = self.adapt_arguments(args)?;
        match (self.handler)(context, values) {
            Ok(results) => Ok(self.check_results(results)?),
            Err(error) if error.is_unset() => Ok(self.zero_results()),
            Err(error) => Err(CallError::Application(error)),
        }
    }

    fn adapt_arguments(&self, args: Vec<ArgSlot>) -> Result<Vec<Value>, InvocationError> {
        if let Some(signature) = &self.signature
            && signature.parameters.len() != args.len()
        {
            return Err(InvocationError::ArityMismatch {
                expected: signature.parameters.len(),
                received: args.len(),
            });
        }

        let mut values = Vec::with_capacity(args.len());
        for (index, slot) in args.into_iter().enumerate() {
            let value = slot
                .into_value()
                .ok_or(InvocationError::UnfilledArgument { index })?;
            if let Some(expected) = self
                .signature
                .as_ref()
                .and_then(|signature| signature.parameters.get(index))
                && !expected.accepts(&value)
            {
                return Err(InvocationError::KindMismatch {
                    index,
                    expected: expected.clone(),
                    found: value.kind(),
                });
            }
            values.push(value);
        }
        Ok(values)
    }

    fn check_results(&self, results: Vec<Value>) -> Result<Vec<Value>, InvocationError> {
        match &self.signature {
            Some(signature) if signature.returns.len() != results.len() => {
                Err(InvocationError::ReturnArityMismatch {
                    declared: signature.returns.len(),
                    returned: results.len(),
                })
            }
            _ => Ok(results),
        }
    }

    fn zero_results(&self) -> Vec<Value> {
        self.signature
            .as_ref()
            .map(|signature| signature.returns.iter().map(ValueKind::zero).collect())
            .unwrap_or_default()
    }
}

impl fmt::Debug for MethodBinding {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("MethodBinding")
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::*;
    use crate::errors::BusError;

    fn context() -> CallContext<'static> {
        CallContext::new("/calc", Some("com.example.Calc"), "Add")
    }

    #[fixture]
    fn adder() -> MethodBinding {
        MethodBinding::new(
            MethodSignature::new(
                vec![ValueKind::Int32, ValueKind::Int32],
                vec![ValueKind::Int32],
            ),
            |args| {
                let mut args = args.into_iter();
                let left = i32::try_from(args.next().unwrap_or(Value::Int32(0)))?;
                let right = i32::try_from(args.next().unwrap_or(Value::Int32(0)))?;
                Ok(vec![Value::Int32(left + right)])
            },
        )
    }

    #[rstest]
    fn calls_through_with_unwrapped_arguments(adder: MethodBinding) {
        let results = adder
            .call(
                &context(),
                vec![ArgSlot::filled(2_i32), ArgSlot::filled(40_i32)],
            )
            .expect("call should succeed");
        assert_eq!(results, vec![Value::Int32(42)]);
    }

    #[rstest]
    fn reports_signature_metadata(adder: MethodBinding) {
        assert_eq!(adder.parameter_count(), 2);
        assert_eq!(adder.return_count(), 1);
        assert_eq!(adder.parameter_zero_value(1), Some(Value::Int32(0)));
        assert_eq!(adder.return_zero_value(0), Some(Value::Int32(0)));
        assert_eq!(adder.parameter_zero_value(2), None);
        let signature = adder.signature().expect("typed binding");
        assert_eq!(signature.parameter_signature(), "ii");
        assert_eq!(signature.return_signature(), "i");
    }

    #[rstest]
    #[case(vec![ArgSlot::filled(1_i32)], InvocationError::ArityMismatch { expected: 2, received: 1 })]
    #[case(
        vec![ArgSlot::filled(1_i32), ArgSlot::empty()],
        InvocationError::UnfilledArgument { index: 1 }
    )]
    #[case(
        vec![ArgSlot::filled("one"), ArgSlot::filled(2_i32)],
        InvocationError::KindMismatch { index: 0, expected: ValueKind::Int32, found: ValueKind::Str }
    )]
    fn rejects_mismatched_arguments(
        adder: MethodBinding,
        #[case] args: Vec<ArgSlot>,
        #[case] expected: InvocationError,
    ) {
        let error = adder.call(&context(), args).expect_err("call should fail");
        match error {
            CallError::Invocation(actual) => assert_eq!(actual, expected),
            CallError::Application(other) => panic!("unexpected application error: {other}"),
        }
    }

    #[test]
    fn zero_bus_error_is_not_an_error() {
        let binding = MethodBinding::new(
            MethodSignature::new(Vec::new(), vec![ValueKind::Str]),
            |_| Err(MethodError::Bus(BusError::default())),
        );
        let results = binding
            .call(&context(), Vec::new())
            .expect("sentinel must normalise to success");
        assert_eq!(results, vec![Value::Str(String::new())]);
    }

    #[test]
    fn boxed_zero_bus_error_is_not_an_error() {
        let binding = MethodBinding::new(
            MethodSignature::new(Vec::new(), vec![ValueKind::Int32]),
            |_| Err(MethodError::other(BusError::default())),
        );
        let results = binding
            .call(&context(), Vec::new())
            .expect("boxed sentinel must normalise to success");
        assert_eq!(results, vec![Value::Int32(0)]);

        let untyped = MethodBinding::untyped(|_| Err(MethodError::other(BusError::default())));
        let results = untyped
            .call(&context(), Vec::new())
            .expect("boxed sentinel must normalise to success");
        assert!(results.is_empty());
    }

    #[test]
    fn real_bus_errors_propagate_verbatim() {
        let binding = MethodBinding::untyped(|_| {
            Err(BusError::new("com.example.Error.Nope", "no").into())
        });
        let error = binding
            .call(&context(), Vec::new())
            .expect_err("error should propagate");
        assert_eq!(error.error_name(), "com.example.Error.Nope");
    }

    #[test]
    fn untyped_bindings_skip_shape_checks() {
        let binding = MethodBinding::untyped(Ok);
        let results = binding
            .call(
                &context(),
                vec![ArgSlot::filled(true), ArgSlot::filled("x")],
            )
            .expect("untyped call should succeed");
        assert_eq!(results, vec![Value::Bool(true), Value::from("x")]);
        assert_eq!(binding.parameter_count(), 0);
        assert_eq!(binding.return_zero_value(0), None);
    }

    #[test]
    fn untyped_bindings_still_reject_unfilled_slots() {
        let binding = MethodBinding::untyped(Ok);
        let error = binding
            .call(&context(), vec![ArgSlot::empty()])
            .expect_err("empty slot should fail");
        assert!(matches!(
            error,
            CallError::Invocation(InvocationError::UnfilledArgument { index: 0 })
        ));
    }

    #[test]
    fn wrong_result_count_is_an_invocation_error() {
        let binding = MethodBinding::new(MethodSignature::default(), |_| {
            Ok(vec![Value::Bool(true)])
        });
        let error = binding
            .call(&context(), Vec::new())
            .expect_err("extra result should fail");
        assert!(matches!(
            error,
            CallError::Invocation(InvocationError::ReturnArityMismatch {
                declared: 0,
                returned: 1
            })
        ));
    }

    #[test]
    fn context_aware_handlers_see_the_target_path() {
        let binding = MethodBinding::with_context(
            MethodSignature::new(Vec::new(), vec![ValueKind::Str]),
            |context, _| Ok(vec![Value::from(context.path())]),
        );
        let results = binding.call(&context(), Vec::new()).expect("call");
        assert_eq!(results, vec![Value::from("/calc")]);
    }
}
