//! Per-path bookkeeping: interface tables and the nodes that own them.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::method::MethodBinding;

/// Methods of one interface, keyed by method name.
pub type MethodTable = HashMap<String, MethodBinding>;

/// Interface name to table, ordered by name.
pub type InterfaceMap = BTreeMap<String, Arc<InterfaceTable>>;

/// The methods registered under one interface name.
///
/// Tables are immutable: re-registering an interface swaps in a new table.
#[derive(Debug, Default)]
pub struct InterfaceTable {
    methods: MethodTable,
    subtree_scope: bool,
}

impl InterfaceTable {
    /// Builds a table. With `subtree_scope` set the table also serves every
    /// descendant path that has no registration of its own.
    #[must_use]
    pub fn new(methods: MethodTable, subtree_scope: bool) -> Self {
        Self {
            methods,
            subtree_scope,
        }
    }

    /// Looks up a method by name.
    #[must_use]
    pub fn method(&self, name: &str) -> Option<&MethodBinding> {
        self.methods.get(name)
    }

    /// Method names in ascending order.
    #[must_use]
    pub fn method_names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.methods.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Whether the table applies to the whole subtree.
    #[must_use]
    pub fn is_subtree_scoped(&self) -> bool {
        self.subtree_scope
    }

    /// Number of methods.
    #[must_use]
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    /// Returns `true` when the table has no methods.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

/// Everything registered at one exact path.
///
/// The node carries its own lock so interface changes here never contend
/// with lookups elsewhere in the tree.
#[derive(Debug, Default)]
pub(crate) struct ObjectNode {
    interfaces: RwLock<HashMap<String, Arc<InterfaceTable>>>,
}

impl ObjectNode {
    /// Installs or replaces the table for `name`.
    pub(crate) fn insert(&self, name: String, table: Arc<InterfaceTable>) {
        self.write().insert(name, table);
    }

    /// Removes the table for `name`, reporting whether one existed.
    pub(crate) fn remove(&self, name: &str) -> bool {
        self.write().remove(name).is_some()
    }

    /// Copies every table.
    pub(crate) fn snapshot(&self) -> InterfaceMap {
        self.read()
            .iter()
            .map(|(name, table)| (name.clone(), Arc::clone(table)))
            .collect()
    }

    /// Copies only the subtree-scoped tables.
    pub(crate) fn subtree_snapshot(&self) -> InterfaceMap {
        self.read()
            .iter()
            .filter(|(_, table)| table.is_subtree_scoped())
            .map(|(name, table)| (name.clone(), Arc::clone(table)))
            .collect()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<InterfaceTable>>> {
        self.interfaces
            .read()
            .unwrap_or_else(|poison| poison.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<InterfaceTable>>> {
        self.interfaces
            .write()
            .unwrap_or_else(|poison| poison.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method::MethodSignature;

    fn table(subtree_scope: bool) -> Arc<InterfaceTable> {
        let mut methods = MethodTable::new();
        methods.insert(
            "Ping".to_owned(),
            MethodBinding::new(MethodSignature::default(), |_| Ok(Vec::new())),
        );
        Arc::new(InterfaceTable::new(methods, subtree_scope))
    }

    #[test]
    fn subtree_snapshot_filters_exact_only_tables() {
        let node = ObjectNode::default();
        node.insert("com.example.Exact".to_owned(), table(false));
        node.insert("com.example.Tree".to_owned(), table(true));

        let all: Vec<_> = node.snapshot().into_keys().collect();
        let inherited: Vec<_> = node.subtree_snapshot().into_keys().collect();
        assert_eq!(all, ["com.example.Exact", "com.example.Tree"]);
        assert_eq!(inherited, ["com.example.Tree"]);
    }

    #[test]
    fn insert_replaces_existing_table() {
        let node = ObjectNode::default();
        node.insert("com.example.Foo".to_owned(), table(true));
        node.insert(
            "com.example.Foo".to_owned(),
            Arc::new(InterfaceTable::new(MethodTable::new(), false)),
        );

        let snapshot = node.snapshot();
        let current = snapshot.get("com.example.Foo").expect("table present");
        assert!(current.is_empty());
        assert!(!current.is_subtree_scoped());
    }

    #[test]
    fn remove_reports_presence() {
        let node = ObjectNode::default();
        node.insert("com.example.Foo".to_owned(), table(false));
        assert!(node.remove("com.example.Foo"));
        assert!(!node.remove("com.example.Foo"));
    }

    #[test]
    fn method_names_are_sorted() {
        let mut methods = MethodTable::new();
        for name in ["Zeta", "Alpha", "Mid"] {
            methods.insert(
                name.to_owned(),
                MethodBinding::untyped(|_| Ok(Vec::new())),
            );
        }
        let table = InterfaceTable::new(methods, false);
        assert_eq!(table.method_names(), ["Alpha", "Mid", "Zeta"]);
        assert_eq!(table.len(), 3);
        assert!(table.method("Mid").is_some());
        assert!(table.method("Missing").is_none());
    }
}
