//! Behaviour and property suites for the registry and bus context.

mod context_behaviour;
pub(crate) mod support;
