//! Child listing XML and the built-in `Introspectable` interface.

use std::collections::BTreeSet;
use std::sync::{Arc, RwLock, Weak};

use crate::errors::MethodError;
use crate::method::{MethodBinding, MethodSignature};
use crate::node::{InterfaceMap, InterfaceTable, MethodTable};
use crate::path::child_segment;
use crate::value::{Value, ValueKind};

use super::ObjectTable;

/// Interface every object answers.
pub const INTROSPECTABLE_INTERFACE: &str = "org.freedesktop.DBus.Introspectable";

/// Method of [`INTROSPECTABLE_INTERFACE`] returning the child listing.
pub const INTROSPECT_METHOD: &str = "Introspect";

/// Renders the `<node>` document listing the immediate children of `path`.
pub(super) fn render(objects: &ObjectTable, path: &str) -> String {
    let children: BTreeSet<&str> = objects
        .keys()
        .filter_map(|object| child_segment(path, object.as_str()))
        .collect();

    if children.is_empty() {
        return render_empty();
    }

    let mut xml = String::from("<node>");
    for child in children {
        xml.push_str("\n\t<node name=\"");
        xml.push_str(child);
        xml.push_str("\"/>");
    }
    xml.push_str("\n</node>");
    xml
}

/// The `<node>` document of a path without children.
pub(super) fn render_empty() -> String {
    String::from("<node>\n</node>")
}

/// Built-in interfaces shared by every object of one registry.
///
/// The handlers hold a weak reference so the registry can still be dropped.
pub(super) fn default_interfaces(objects: Weak<RwLock<ObjectTable>>) -> InterfaceMap {
    let mut methods = MethodTable::new();
    methods.insert(
        INTROSPECT_METHOD.to_owned(),
        MethodBinding::with_context(
            MethodSignature::new(Vec::new(), vec![ValueKind::Str]),
            move |context, _args| {
                let Some(objects) = objects.upgrade() else {
                    return Err(MethodError::failed("object registry is no longer available"));
                };
                let table = objects.read().unwrap_or_else(|poison| poison.into_inner());
                Ok(vec![Value::Str(render(&table, context.path()))])
            },
        ),
    );

    let mut interfaces = InterfaceMap::new();
    interfaces.insert(
        INTROSPECTABLE_INTERFACE.to_owned(),
        Arc::new(InterfaceTable::new(methods, true)),
    );
    interfaces
}
