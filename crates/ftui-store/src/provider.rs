//! Owner side of a store: the render output slot and the commit step.
//!
//! A [`Provider`] stands in for the component that owns the state. Mutators
//! write the next snapshot into a [`StateHandle`] (the owner's "render"); the
//! host calls [`Provider::commit`] once that render has committed, which runs
//! the publisher's change detection.
//!
//! # Example
//!
//! ```
//! use std::rc::Rc;
//! use ftui_store::{Provider, RenderQueue, Scope, SiteId, Selector};
//!
//! struct Counter {
//!     count: i64,
//! }
//!
//! struct Actions {
//!     increment: Rc<dyn Fn()>,
//! }
//!
//! let provider = Provider::new(Counter { count: 0 }, |state| {
//!     let state = state.clone();
//!     Actions {
//!         increment: Rc::new(move || state.update(|s| Counter { count: s.count + 1 })),
//!     }
//! });
//! let scope = Scope::root();
//! provider.mount(&scope);
//!
//! let queue = RenderQueue::new();
//! let site = SiteId::next();
//! let selector =
//!     Selector::<Counter, Actions, i64>::mount(&scope, site, queue.clone(), |s| s.count).unwrap();
//!
//! (provider.publisher().mutators().increment)();
//! assert!(provider.commit());
//! assert_eq!(queue.drain(), vec![site]);
//! assert_eq!(selector.select(|s| s.count), 1);
//! ```

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::publisher::{Publisher, StoreConfig};
use crate::scope::Scope;

/// The owner's latest render output, shared with its mutators.
///
/// Cloning a `StateHandle` creates a new handle to the **same** slot.
pub struct StateHandle<S> {
    slot: Rc<RefCell<Rc<S>>>,
    dirty: Rc<Cell<bool>>,
}

impl<S> Clone for StateHandle<S> {
    fn clone(&self) -> Self {
        Self {
            slot: Rc::clone(&self.slot),
            dirty: Rc::clone(&self.dirty),
        }
    }
}

impl<S> std::fmt::Debug for StateHandle<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateHandle")
            .field("dirty", &self.dirty.get())
            .finish()
    }
}

impl<S> StateHandle<S> {
    fn new(initial: Rc<S>) -> Self {
        Self {
            slot: Rc::new(RefCell::new(initial)),
            dirty: Rc::new(Cell::new(false)),
        }
    }

    /// Latest snapshot written, committed or not.
    #[must_use]
    pub fn get(&self) -> Rc<S> {
        Rc::clone(&*self.slot.borrow())
    }

    pub fn set(&self, next: S) {
        self.set_rc(Rc::new(next));
    }

    /// Write an already shared snapshot. Writing the current pointer back
    /// does not make the owner dirty.
    pub fn set_rc(&self, next: Rc<S>) {
        let mut slot = self.slot.borrow_mut();
        if !Rc::ptr_eq(&*slot, &next) {
            *slot = next;
            self.dirty.set(true);
        }
    }

    /// Derive the next snapshot from the latest one.
    pub fn update(&self, f: impl FnOnce(&S) -> S) {
        let next = f(&self.get());
        self.set(next);
    }

    /// Whether a write happened since the last commit.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }
}

/// The state owner: render output slot plus the publisher handed to consumers.
pub struct Provider<S, M> {
    publisher: Publisher<S, M>,
    handle: StateHandle<S>,
}

impl<S, M> std::fmt::Debug for Provider<S, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provider")
            .field("publisher", &self.publisher)
            .field("dirty", &self.handle.is_dirty())
            .finish()
    }
}

impl<S: 'static, M: 'static> Provider<S, M> {
    /// Create a provider. `mutators` receives the state handle so the
    /// mutator set can write new snapshots.
    pub fn new(initial: S, mutators: impl FnOnce(&StateHandle<S>) -> M) -> Self {
        Self::with_config(initial, StoreConfig::default(), mutators)
    }

    pub fn with_config(
        initial: S,
        config: StoreConfig,
        mutators: impl FnOnce(&StateHandle<S>) -> M,
    ) -> Self {
        let initial = Rc::new(initial);
        let handle = StateHandle::new(Rc::clone(&initial));
        let publisher = Publisher::with_config(initial, mutators(&handle), config);
        Self { publisher, handle }
    }

    /// The published value for this provider.
    #[must_use]
    pub fn publisher(&self) -> Publisher<S, M> {
        self.publisher.clone()
    }

    #[must_use]
    pub fn handle(&self) -> StateHandle<S> {
        self.handle.clone()
    }

    /// Provide the publisher at `scope` for every descendant.
    pub fn mount(&self, scope: &Scope) {
        scope.provide(self.publisher.clone());
    }

    /// Render a new snapshot without committing it.
    pub fn replace(&self, next: S) {
        self.handle.set(next);
    }

    pub fn replace_rc(&self, next: Rc<S>) {
        self.handle.set_rc(next);
    }

    /// Commit phase: hand the latest render output to the publisher.
    /// Returns whether listeners were notified.
    pub fn commit(&self) -> bool {
        self.handle.dirty.set(false);
        self.publisher.commit(self.handle.get())
    }
}
