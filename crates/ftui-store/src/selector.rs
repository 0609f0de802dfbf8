#![forbid(unsafe_code)]

//! Selectors: per-site projections that re-render only when their slice changes.
//!
//! # Design
//!
//! A [`Selector<S, M, K>`] belongs to one consuming site. It finds the
//! [`Publisher<S, M>`] in its [`Scope`], runs a projection `Fn(&S) -> K` over
//! the current snapshot, and subscribes once. On every snapshot change the
//! subscription re-runs the *latest* projection and compares the result with
//! the cached one using [`Identity`]; only a different result marks the site
//! for re-render through its [`RenderScheduler`].
//!
//! The change handler lives inside the publisher's registry, so it holds only
//! weak handles to the publisher and to the selector's cache. Neither keeps
//! the other alive.
//!
//! # Invariants
//!
//! 1. [`Selector::select`] always returns `project(publisher.get_state())`
//!    for the projection it was given, never a stale cached value.
//! 2. The change handler uses the projection from the most recent
//!    `select` call (or the mount projection if `select` was never called).
//! 3. A re-render is requested only when the new projection is not
//!    [`identical`](Identity::identical) to the cached one.
//! 4. Exactly one registration per selector; unmount or drop removes it.
//!
//! # Failure Modes
//!
//! - **Impure projection**: a projection is run more often than there are
//!   snapshot changes (once per `select`, once per notification). Side
//!   effects in it run that many times.
//! - **Fresh allocations**: a projection returning a new `Rc` on every call
//!   requests a re-render on every snapshot change.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::error::{Result, StoreError};
use crate::identity::Identity;
use crate::publisher::{Publisher, Subscription};
use crate::schedule::{RenderScheduler, SiteId};
use crate::scope::Scope;

type Projection<S, K> = Rc<dyn Fn(&S) -> K>;

/// Shared interior reachable from the change handler.
struct SelectorCache<S, K> {
    /// Latest projection supplied by the site.
    project: RefCell<Projection<S, K>>,
    /// Last projected value.
    last: RefCell<K>,
    /// Re-render requests issued by the change handler.
    renders_requested: Cell<u64>,
}

/// A consuming site's subscription to a slice of a publisher's state.
pub struct Selector<S, M, K> {
    publisher: Publisher<S, M>,
    cache: Rc<SelectorCache<S, K>>,
    site: SiteId,
    subscription: Subscription,
}

impl<S, M, K: std::fmt::Debug> std::fmt::Debug for Selector<S, M, K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Selector")
            .field("site", &self.site)
            .field("last", &self.cache.last.borrow())
            .field("renders_requested", &self.cache.renders_requested.get())
            .field("mounted", &self.subscription.is_active())
            .finish()
    }
}

impl<S, M, K> Selector<S, M, K>
where
    S: 'static,
    M: 'static,
    K: Identity + Clone + 'static,
{
    /// Mount a selector for `site`, using the nearest publisher in `scope`.
    ///
    /// # Errors
    ///
    /// [`StoreError::MissingProvider`] if no `Publisher<S, M>` is visible
    /// from `scope`.
    pub fn mount(
        scope: &Scope,
        site: SiteId,
        scheduler: impl RenderScheduler + 'static,
        project: impl Fn(&S) -> K + 'static,
    ) -> Result<Self> {
        let publisher = scope
            .lookup::<Publisher<S, M>>()
            .ok_or_else(StoreError::missing_provider::<Publisher<S, M>>)?;
        Ok(Self::attach(publisher, site, scheduler, project))
    }

    /// Mount a selector on an explicitly supplied publisher.
    pub fn attach(
        publisher: Publisher<S, M>,
        site: SiteId,
        scheduler: impl RenderScheduler + 'static,
        project: impl Fn(&S) -> K + 'static,
    ) -> Self {
        let project: Projection<S, K> = Rc::new(project);
        let initial = project(&publisher.get_state());
        let cache = Rc::new(SelectorCache {
            project: RefCell::new(project),
            last: RefCell::new(initial),
            renders_requested: Cell::new(0),
        });

        let weak_cache = Rc::downgrade(&cache);
        let weak_publisher = publisher.downgrade();
        let subscription = publisher.subscribe(move || {
            let (Some(cache), Some(publisher)) = (weak_cache.upgrade(), weak_publisher.upgrade())
            else {
                return;
            };
            let project = Rc::clone(&*cache.project.borrow());
            let next = project(&publisher.get_state());
            if cache.last.borrow().identical(&next) {
                return;
            }
            *cache.last.borrow_mut() = next;
            cache.renders_requested.set(cache.renders_requested.get() + 1);
            tracing::trace!(
                message = "store.select.changed",
                publisher_id = publisher.id(),
                site = site.raw()
            );
            scheduler.request_render(site);
        });

        Self {
            publisher,
            cache,
            site,
            subscription,
        }
    }

    /// Synchronous read path: install `project` as the latest projection and
    /// return its value over the current snapshot.
    pub fn select(&self, project: impl Fn(&S) -> K + 'static) -> K {
        let project: Projection<S, K> = Rc::new(project);
        *self.cache.project.borrow_mut() = Rc::clone(&project);
        self.store(project(&self.publisher.get_state()))
    }

    /// Re-run the latest projection over the current snapshot.
    pub fn refresh(&self) -> K {
        let project = Rc::clone(&*self.cache.project.borrow());
        self.store(project(&self.publisher.get_state()))
    }

    fn store(&self, value: K) -> K {
        *self.cache.last.borrow_mut() = value.clone();
        value
    }

    /// Last projected value, without recomputing.
    #[must_use]
    pub fn value(&self) -> K {
        self.cache.last.borrow().clone()
    }

    /// The consuming site this selector re-renders.
    #[inline]
    #[must_use]
    pub fn site(&self) -> SiteId {
        self.site
    }

    #[must_use]
    pub fn publisher(&self) -> &Publisher<S, M> {
        &self.publisher
    }

    /// Number of re-renders this selector has requested.
    #[must_use]
    pub fn renders_requested(&self) -> u64 {
        self.cache.renders_requested.get()
    }

    /// Whether the change handler is still registered.
    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.subscription.is_active()
    }

    /// Tear down: remove the change handler from the publisher.
    ///
    /// Dropping the selector has the same effect.
    pub fn unmount(self) {
        self.subscription.unsubscribe();
    }
}

/// Mount a selector on the publisher provided in `scope`.
///
/// # Errors
///
/// [`StoreError::MissingProvider`] if `scope` has no `Publisher<S, M>`.
pub fn use_selector<S, M, K>(
    scope: &Scope,
    site: SiteId,
    scheduler: impl RenderScheduler + 'static,
    project: impl Fn(&S) -> K + 'static,
) -> Result<Selector<S, M, K>>
where
    S: 'static,
    M: 'static,
    K: Identity + Clone + 'static,
{
    Selector::mount(scope, site, scheduler, project)
}
