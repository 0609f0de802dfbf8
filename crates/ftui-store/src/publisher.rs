#![forbid(unsafe_code)]

//! The publishing half of the store: a snapshot slot plus a listener registry.
//!
//! # Design
//!
//! [`Publisher<S, M>`] is created once per provider and handed down the tree.
//! It wraps the provider's current snapshot (`Rc<S>`) and a fixed mutator set
//! (`M`). The provider calls [`Publisher::commit`] after each of its renders
//! commits; if the snapshot pointer changed, the new snapshot is stored and
//! every registered listener runs, in registration order, with no arguments.
//!
//! Cloning a `Publisher` creates a new handle to the **same** publisher. The
//! handle never changes identity as snapshots churn.
//!
//! # Invariants
//!
//! 1. `get_state()` returns the snapshot stored by the latest `commit` that
//!    observed a new pointer (or the initial snapshot).
//! 2. The new snapshot is stored before the first listener runs.
//! 3. Committing the same pointer is a no-op (no notifications).
//! 4. Each notification pass iterates a frozen copy of the registry. A
//!    listener unsubscribed mid-pass is skipped if not yet reached; a
//!    listener subscribed mid-pass first runs on the next pass.
//! 5. Dropping the last [`Subscription`] for a registration removes it; the
//!    registry returns to size zero once every subscriber has gone.
//!
//! # Failure Modes
//!
//! - **Listener panics**: the panic unwinds out of `commit`. The snapshot is
//!   already stored; listeners after the panicking one miss this pass.
//! - **Leaked subscriptions**: a registry that keeps growing is reported
//!   through a `store.listener_threshold` warning (see [`StoreConfig`]).

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_PUBLISHER_ID: AtomicU64 = AtomicU64::new(1);

/// Configuration for a [`Publisher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Name attached to every log event emitted by the publisher.
    /// Default: `"store"`.
    pub label: &'static str,

    /// Registry size above which a leak warning is logged, once per
    /// crossing. `0` disables the warning.
    /// Default: 1024.
    pub listener_warn_threshold: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            label: "store",
            listener_warn_threshold: 1024,
        }
    }
}

impl StoreConfig {
    #[must_use]
    pub fn with_label(mut self, label: &'static str) -> Self {
        self.label = label;
        self
    }

    #[must_use]
    pub fn with_listener_warn_threshold(mut self, threshold: usize) -> Self {
        self.listener_warn_threshold = threshold;
        self
    }
}

#[derive(Clone)]
struct ListenerEntry {
    id: u64,
    active: Rc<Cell<bool>>,
    callback: Rc<dyn Fn()>,
}

struct Registry {
    publisher_id: u64,
    label: &'static str,
    warn_threshold: usize,
    warned: bool,
    next_id: u64,
    entries: Vec<ListenerEntry>,
}

impl Registry {
    fn insert(&mut self, callback: Rc<dyn Fn()>) -> (u64, Rc<Cell<bool>>) {
        self.next_id += 1;
        let id = self.next_id;
        let active = Rc::new(Cell::new(true));
        self.entries.push(ListenerEntry {
            id,
            active: Rc::clone(&active),
            callback,
        });
        (id, active)
    }

    fn remove(&mut self, id: u64) -> Option<ListenerEntry> {
        let pos = self.entries.iter().position(|e| e.id == id)?;
        let entry = self.entries.remove(pos);
        if self.entries.len() <= self.warn_threshold {
            self.warned = false;
        }
        Some(entry)
    }

    fn crossed_threshold(&mut self) -> bool {
        if self.warn_threshold == 0 || self.warned || self.entries.len() <= self.warn_threshold {
            return false;
        }
        self.warned = true;
        true
    }
}

struct PublisherInner<S, M> {
    id: u64,
    state: RefCell<Rc<S>>,
    mutators: Rc<M>,
    registry: Rc<RefCell<Registry>>,
}

/// The published value: snapshot accessor, listener registry, and mutators.
pub struct Publisher<S, M> {
    inner: Rc<PublisherInner<S, M>>,
}

impl<S, M> Clone for Publisher<S, M> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

/// Non-owning handle to a [`Publisher`], for listeners stored inside it.
pub struct WeakPublisher<S, M> {
    inner: Weak<PublisherInner<S, M>>,
}

impl<S, M> Clone for WeakPublisher<S, M> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<S, M> WeakPublisher<S, M> {
    /// The publisher, if any strong handle is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<Publisher<S, M>> {
        self.inner.upgrade().map(|inner| Publisher { inner })
    }
}

impl<S, M> std::fmt::Debug for Publisher<S, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let registry = self.inner.registry.borrow();
        f.debug_struct("Publisher")
            .field("id", &self.inner.id)
            .field("label", &registry.label)
            .field("listeners", &registry.entries.len())
            .finish()
    }
}

impl<S: 'static, M: 'static> Publisher<S, M> {
    /// Create a publisher over an initial snapshot and a mutator set.
    #[must_use]
    pub fn new(initial: Rc<S>, mutators: M) -> Self {
        Self::with_config(initial, mutators, StoreConfig::default())
    }

    #[must_use]
    pub fn with_config(initial: Rc<S>, mutators: M, config: StoreConfig) -> Self {
        let id = NEXT_PUBLISHER_ID.fetch_add(1, Ordering::Relaxed);
        Self {
            inner: Rc::new(PublisherInner {
                id,
                state: RefCell::new(initial),
                mutators: Rc::new(mutators),
                registry: Rc::new(RefCell::new(Registry {
                    publisher_id: id,
                    label: config.label,
                    warn_threshold: config.listener_warn_threshold,
                    warned: false,
                    next_id: 0,
                    entries: Vec::new(),
                })),
            }),
        }
    }

    /// Unique identifier for this publisher (shared by all its clones).
    #[inline]
    #[must_use]
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Whether two handles refer to the same publisher.
    #[inline]
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// A handle that does not keep the publisher alive.
    #[must_use]
    pub fn downgrade(&self) -> WeakPublisher<S, M> {
        WeakPublisher {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// The most recently committed snapshot.
    #[must_use]
    pub fn get_state(&self) -> Rc<S> {
        Rc::clone(&*self.inner.state.borrow())
    }

    /// The mutator set supplied at construction.
    #[inline]
    #[must_use]
    pub fn mutators(&self) -> &M {
        &self.inner.mutators
    }

    /// Shared handle to the mutator set. Pointer-stable for the publisher's
    /// lifetime.
    #[must_use]
    pub fn shared_mutators(&self) -> Rc<M> {
        Rc::clone(&self.inner.mutators)
    }

    /// Number of live registrations.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.registry.borrow().entries.len()
    }

    /// Register `listener` to run after every snapshot change.
    ///
    /// Registering the same closure twice yields two independent
    /// registrations. The listener stays registered until the returned
    /// [`Subscription`] is unsubscribed or dropped.
    pub fn subscribe(&self, listener: impl Fn() + 'static) -> Subscription {
        let (id, active, label, listeners, crossed, threshold) = {
            let mut registry = self.inner.registry.borrow_mut();
            let (id, active) = registry.insert(Rc::new(listener));
            let crossed = registry.crossed_threshold();
            (
                id,
                active,
                registry.label,
                registry.entries.len(),
                crossed,
                registry.warn_threshold,
            )
        };
        tracing::debug!(
            message = "store.subscribe",
            label,
            publisher_id = self.inner.id,
            listener_id = id,
            listeners
        );
        if crossed {
            tracing::warn!(
                message = "store.listener_threshold",
                label,
                publisher_id = self.inner.id,
                listeners,
                threshold
            );
        }
        Subscription {
            registry: Rc::downgrade(&self.inner.registry),
            id,
            active,
            detached: false,
        }
    }

    /// Commit-phase change detection.
    ///
    /// Stores `next` and notifies every registered listener if `next` is a
    /// different allocation from the stored snapshot. Returns whether
    /// listeners were notified. Must be called after the owner's render has
    /// committed, never while it is rendering.
    pub fn commit(&self, next: Rc<S>) -> bool {
        if Rc::ptr_eq(&*self.inner.state.borrow(), &next) {
            return false;
        }
        let previous = self.inner.state.replace(next);

        let (label, listeners) = {
            let registry = self.inner.registry.borrow();
            (registry.label, registry.entries.clone())
        };
        let span = tracing::trace_span!(
            "store.notify",
            label,
            publisher_id = self.inner.id,
            listeners = listeners.len()
        );
        let _guard = span.enter();
        for entry in &listeners {
            if entry.active.get() {
                (entry.callback)();
            }
        }
        drop(previous);
        true
    }
}

/// Registration handle returned by [`Publisher::subscribe`].
///
/// Dropping the handle unsubscribes. Unsubscribing is idempotent and safe to
/// call from inside a listener during notification.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    registry: Weak<RefCell<Registry>>,
    id: u64,
    active: Rc<Cell<bool>>,
    detached: bool,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.active.get())
            .field("detached", &self.detached)
            .finish()
    }
}

impl Subscription {
    /// Registration id, unique within its publisher.
    #[inline]
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Whether the listener is still registered.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.get() && self.registry.strong_count() > 0
    }

    /// Remove the listener. Calls after the first are no-ops.
    pub fn unsubscribe(&self) {
        if !self.active.replace(false) {
            return;
        }
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        let (removed, publisher_id, label, listeners) = {
            let mut reg = registry.borrow_mut();
            let removed = reg.remove(self.id);
            (removed, reg.publisher_id, reg.label, reg.entries.len())
        };
        tracing::debug!(
            message = "store.unsubscribe",
            label,
            publisher_id,
            listener_id = self.id,
            listeners
        );
        // The callback may own other subscriptions; drop it outside the borrow.
        drop(removed);
    }

    /// Keep the listener registered for the publisher's whole lifetime
    /// instead of removing it when this handle drops.
    pub fn detach(mut self) {
        self.detached = true;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if !self.detached {
            self.unsubscribe();
        }
    }
}
