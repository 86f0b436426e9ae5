//! Path namespace for one bus connection.
//!
//! The registry maps object paths to nodes, nodes to interface tables and
//! tables to method bindings. Lookups resolve a path in two phases:
//!
//! 1. **Exact**: a node registered at the path serves all of its interfaces.
//! 2. **Fallback**: otherwise the nearest registered ancestor lends the
//!    interfaces it registered with subtree scope.
//!
//! Either way the built-in interfaces (currently introspection) are merged
//! in, so every well-formed path resolves to something. Registrations at the
//! exact path always win over inherited and built-in interfaces of the same
//! name.
//!
//! Resolution returns a [`ResolvedObject`] snapshot. Method handlers run
//! against the snapshot after every registry lock has been released, so a
//! slow handler only holds up its own call.

mod introspect;

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, trace};

use crate::errors::RegistryError;
use crate::method::MethodBinding;
use crate::node::{InterfaceMap, InterfaceTable, MethodTable, ObjectNode};
use crate::path::{ObjectPath, ancestors, validate};

pub use introspect::{INTROSPECT_METHOD, INTROSPECTABLE_INTERFACE};

/// Tracing target for registry operations.
pub(crate) const REGISTRY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::registry");

/// Longest interface name the bus accepts.
const MAX_INTERFACE_NAME_LEN: usize = 255;

type ObjectTable = HashMap<ObjectPath, Arc<ObjectNode>>;

/// How a [`ResolvedObject`] was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A node is registered at the requested path.
    Exact,
    /// The nearest registered ancestor lent its subtree-scoped interfaces.
    Inherited {
        /// Path of that ancestor.
        from: ObjectPath,
    },
    /// Nothing is registered at or above the path; only built-ins apply.
    DefaultsOnly,
}

/// Effective set of interfaces serving one path.
#[derive(Debug, Clone)]
pub struct ResolvedObject {
    path: String,
    resolution: Resolution,
    interfaces: InterfaceMap,
}

impl ResolvedObject {
    /// Path the object was resolved for.
    #[must_use]
    pub fn path(&self) -> &str {
        self.path.as_str()
    }

    /// Whether the object came from an exact, inherited or built-in match.
    #[must_use]
    pub fn resolution(&self) -> &Resolution {
        &self.resolution
    }

    /// Looks up one interface.
    #[must_use]
    pub fn interface(&self, name: &str) -> Option<&InterfaceTable> {
        self.interfaces.get(name).map(Arc::as_ref)
    }

    /// Returns `true` when the interface is served here.
    #[must_use]
    pub fn has_interface(&self, name: &str) -> bool {
        self.interfaces.contains_key(name)
    }

    /// Interface names in ascending order.
    pub fn interface_names(&self) -> impl Iterator<Item = &str> {
        self.interfaces.keys().map(String::as_str)
    }

    /// Finds `method` on `interface`.
    ///
    /// An empty interface name searches every interface in name order and
    /// returns the first match.
    #[must_use]
    pub fn lookup_method(&self, interface: &str, method: &str) -> Option<&MethodBinding> {
        if interface.is_empty() {
            return self
                .interfaces
                .values()
                .find_map(|table| table.method(method));
        }
        self.interfaces.get(interface)?.method(method)
    }
}

/// Registry of exported objects for one connection.
///
/// Cloning yields another handle to the same registry.
#[derive(Clone)]
pub struct ObjectRegistry {
    objects: Arc<RwLock<ObjectTable>>,
    defaults: Arc<InterfaceMap>,
}

impl ObjectRegistry {
    /// Creates an empty registry with the built-in interfaces installed.
    #[must_use]
    pub fn new() -> Self {
        let objects = Arc::new(RwLock::new(ObjectTable::new()));
        let defaults = Arc::new(introspect::default_interfaces(Arc::downgrade(&objects)));
        Self { objects, defaults }
    }

    /// Installs (or replaces) `interface` at `path`.
    ///
    /// The node for `path` is created on first use. With `subtree_scope` the
    /// interface also serves descendants that have no node of their own.
    ///
    /// # Errors
    ///
    /// [`RegistryError::InvalidPath`] for a malformed path and
    /// [`RegistryError::InvalidInterface`] for a malformed interface name.
    pub fn register(
        &self,
        path: &str,
        interface: &str,
        methods: MethodTable,
        subtree_scope: bool,
    ) -> Result<(), RegistryError> {
        let path = ObjectPath::new(path)?;
        validate_interface_name(interface)?;
        let table = Arc::new(InterfaceTable::new(methods, subtree_scope));

        debug!(
            target: REGISTRY_TARGET,
            path = %path,
            interface,
            methods = table.len(),
            subtree_scope,
            "registering interface"
        );

        {
            let objects = self.read();
            if let Some(node) = objects.get(&path) {
                node.insert(interface.to_owned(), table);
                return Ok(());
            }
        }

        self.write()
            .entry(path)
            .or_default()
            .insert(interface.to_owned(), table);
        Ok(())
    }

    /// Removes the node at `path` with all of its interfaces.
    ///
    /// Ancestors' subtree-scoped interfaces keep applying to `path`.
    /// Returns `true` when a node was removed.
    pub fn unregister(&self, path: &str) -> bool {
        let removed = self.write().remove(path).is_some();
        debug!(target: REGISTRY_TARGET, path, removed, "unregistering object");
        removed
    }

    /// Removes one interface from the node at `path`, keeping the node.
    ///
    /// Returns `true` when the interface was registered there.
    pub fn unregister_interface(&self, path: &str, interface: &str) -> bool {
        let removed = self
            .read()
            .get(path)
            .is_some_and(|node| node.remove(interface));
        debug!(
            target: REGISTRY_TARGET,
            path,
            interface,
            removed,
            "unregistering interface"
        );
        removed
    }

    /// Returns `true` when a node is registered at exactly `path`.
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.read().contains_key(path)
    }

    /// Paths with a registered node, in ascending order.
    #[must_use]
    pub fn registered_paths(&self) -> Vec<ObjectPath> {
        let mut paths: Vec<_> = self.read().keys().cloned().collect();
        paths.sort_unstable();
        paths
    }

    /// Resolves the interfaces serving `path`.
    ///
    /// Returns `None` only when `path` is not a well-formed object path.
    #[must_use]
    pub fn resolve(&self, path: &str) -> Option<ResolvedObject> {
        if validate(path).is_err() {
            trace!(target: REGISTRY_TARGET, path, "ignoring malformed lookup path");
            return None;
        }

        let (resolution, mut interfaces) = {
            let objects = self.read();
            match objects.get(path) {
                Some(node) => (Resolution::Exact, node.snapshot()),
                None => ancestors(path)
                    .find_map(|ancestor| objects.get_key_value(ancestor))
                    .map_or_else(
                        || (Resolution::DefaultsOnly, InterfaceMap::new()),
                        |(from, node)| {
                            (
                                Resolution::Inherited { from: from.clone() },
                                node.subtree_snapshot(),
                            )
                        },
                    ),
            }
        };

        for (name, table) in self.defaults.iter() {
            interfaces
                .entry(name.clone())
                .or_insert_with(|| Arc::clone(table));
        }

        trace!(
            target: REGISTRY_TARGET,
            path,
            resolution = ?resolution,
            interfaces = interfaces.len(),
            "resolved object"
        );

        Some(ResolvedObject {
            path: path.to_owned(),
            resolution,
            interfaces,
        })
    }

    /// Renders the child listing for `path`.
    ///
    /// Each immediate child segment of a registered descendant appears once,
    /// in ascending order. A malformed path has no children.
    #[must_use]
    pub fn introspect(&self, path: &str) -> String {
        if validate(path).is_err() {
            trace!(target: REGISTRY_TARGET, path, "introspecting malformed path");
            return introspect::render_empty();
        }
        introspect::render(&self.read(), path)
    }

    /// Resolves `path` and finds `method` on `interface` (or on any
    /// interface when `interface` is empty).
    #[must_use]
    pub fn lookup_method(&self, path: &str, interface: &str, method: &str) -> Option<MethodBinding> {
        self.resolve(path)?
            .lookup_method(interface, method)
            .cloned()
    }

    fn read(&self) -> RwLockReadGuard<'_, ObjectTable> {
        self.objects
            .read()
            .unwrap_or_else(|poison| poison.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, ObjectTable> {
        self.objects
            .write()
            .unwrap_or_else(|poison| poison.into_inner())
    }
}

impl Default for ObjectRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ObjectRegistry {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ObjectRegistry")
            .field("objects", &self.read().len())
            .field("defaults", &self.defaults.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Checks an interface name: two or more `.`-separated elements of
/// `[A-Za-z0-9_]`, none starting with a digit, at most 255 bytes.
fn validate_interface_name(name: &str) -> Result<(), RegistryError> {
    if name.is_empty() {
        return Err(RegistryError::invalid_interface(name, "name is empty"));
    }
    if name.len() > MAX_INTERFACE_NAME_LEN {
        return Err(RegistryError::invalid_interface(name, "name exceeds 255 bytes"));
    }

    let mut elements = 0_usize;
    for element in name.split('.') {
        let Some(first) = element.chars().next() else {
            return Err(RegistryError::invalid_interface(name, "name has an empty element"));
        };
        if first.is_ascii_digit() {
            return Err(RegistryError::invalid_interface(
                name,
                "element starts with a digit",
            ));
        }
        if !element
            .chars()
            .all(|character| character.is_ascii_alphanumeric() || character == '_')
        {
            return Err(RegistryError::invalid_interface(
                name,
                "element contains an invalid character",
            ));
        }
        elements += 1;
    }

    if elements < 2 {
        return Err(RegistryError::invalid_interface(
            name,
            "name needs at least two elements",
        ));
    }
    Ok(())
}
