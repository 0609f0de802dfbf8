//! Scoped value lookup (`Scope`) for handing a publisher down a component tree.
//!
//! A `Scope` is a node in a tree. Values provided on a node are visible to that
//! node and every descendant, without being threaded through the layers in
//! between. Lookup walks from the node toward the root and returns the nearest
//! value of the requested type.
//!
//! # Design
//!
//! `Scope` is cheaply cloneable (`Rc` inside). Children hold a strong reference
//! to their parent; parents never reference their children, so dropping a
//! subtree releases it.
//!
//! # Example
//!
//! ```
//! use ftui_store::scope::Scope;
//!
//! let root = Scope::root();
//! root.provide(String::from("dark"));
//!
//! let leaf = root.child().child();
//! assert_eq!(leaf.lookup::<String>().as_deref(), Some("dark"));
//! assert!(leaf.lookup::<u32>().is_none());
//! ```

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_SCOPE_ID: AtomicU64 = AtomicU64::new(1);

fn next_scope_id() -> u64 {
    NEXT_SCOPE_ID.fetch_add(1, Ordering::Relaxed)
}

struct ScopeNode {
    id: u64,
    values: RefCell<Vec<(TypeId, Rc<dyn Any>)>>,
    parent: Option<Rc<ScopeNode>>,
}

/// A position in the component tree that can provide and look up values.
#[derive(Clone)]
pub struct Scope {
    node: Rc<ScopeNode>,
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope")
            .field("id", &self.node.id)
            .field("values", &self.node.values.borrow().len())
            .field("depth", &self.depth())
            .finish()
    }
}

impl Scope {
    /// Create a root scope with no parent.
    #[must_use]
    pub fn root() -> Self {
        Self::new_node(None)
    }

    /// Derive a child scope. The child sees everything its ancestors provide.
    #[must_use]
    pub fn child(&self) -> Self {
        Self::new_node(Some(Rc::clone(&self.node)))
    }

    fn new_node(parent: Option<Rc<ScopeNode>>) -> Self {
        Self {
            node: Rc::new(ScopeNode {
                id: next_scope_id(),
                values: RefCell::new(Vec::new()),
                parent,
            }),
        }
    }

    /// Unique identifier for this scope node.
    #[inline]
    #[must_use]
    pub fn id(&self) -> u64 {
        self.node.id
    }

    /// Number of ancestors between this node and the root.
    #[must_use]
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut cursor = self.node.parent.as_ref();
        while let Some(node) = cursor {
            depth += 1;
            cursor = node.parent.as_ref();
        }
        depth
    }

    /// Provide `value` at this node, replacing any value of the same type
    /// previously provided here. Ancestors are unaffected.
    pub fn provide<T: 'static>(&self, value: T) {
        let key = TypeId::of::<T>();
        let value: Rc<dyn Any> = Rc::new(value);
        let mut values = self.node.values.borrow_mut();
        match values.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => values.push((key, value)),
        }
    }

    /// Look up the nearest value of type `T`, starting at this node.
    #[must_use]
    pub fn lookup<T: Clone + 'static>(&self) -> Option<T> {
        let key = TypeId::of::<T>();
        let mut cursor = Some(&self.node);
        while let Some(node) = cursor {
            let found = node
                .values
                .borrow()
                .iter()
                .find(|(k, _)| *k == key)
                .and_then(|(_, v)| v.downcast_ref::<T>().cloned());
            if found.is_some() {
                return found;
            }
            cursor = node.parent.as_ref();
        }
        None
    }

    /// Whether a value of type `T` is visible from this node.
    #[must_use]
    pub fn contains<T: 'static>(&self) -> bool {
        let key = TypeId::of::<T>();
        let mut cursor = Some(&self.node);
        while let Some(node) = cursor {
            if node.values.borrow().iter().any(|(k, _)| *k == key) {
                return true;
            }
            cursor = node.parent.as_ref();
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_walks_to_root() {
        let root = Scope::root();
        root.provide(7u32);
        let leaf = root.child().child().child();
        assert_eq!(leaf.lookup::<u32>(), Some(7));
        assert_eq!(leaf.depth(), 3);
    }

    #[test]
    fn nearest_value_shadows_ancestors() {
        let root = Scope::root();
        root.provide(1u32);
        let mid = root.child();
        mid.provide(2u32);
        let leaf = mid.child();
        assert_eq!(leaf.lookup::<u32>(), Some(2));
        assert_eq!(root.lookup::<u32>(), Some(1));
    }

    #[test]
    fn siblings_are_isolated() {
        let root = Scope::root();
        let left = root.child();
        let right = root.child();
        left.provide("left");
        assert_eq!(left.lookup::<&str>(), Some("left"));
        assert!(right.lookup::<&str>().is_none());
        assert!(!right.contains::<&str>());
    }

    #[test]
    fn provide_replaces_same_type_on_same_node() {
        let root = Scope::root();
        root.provide(1i64);
        root.provide(2i64);
        assert_eq!(root.lookup::<i64>(), Some(2));
        assert!(format!("{root:?}").contains("values: 1"));
    }

    #[test]
    fn missing_value_is_none() {
        let root = Scope::root();
        assert!(root.child().lookup::<String>().is_none());
    }

    #[test]
    fn scope_ids_are_unique() {
        let a = Scope::root();
        let b = a.child();
        assert_ne!(a.id(), b.id());
    }
}
