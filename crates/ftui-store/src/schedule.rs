//! Re-render requests from selectors to the host.
//!
//! A selector never re-renders itself. When its projection changes it calls
//! [`RenderScheduler::request_render`] with its [`SiteId`]; the host decides
//! when the site runs again. [`RenderQueue`] is a coalescing implementation
//! for hosts (and tests) that drive rendering in explicit passes.
//!
//! # Invariants
//!
//! 1. A site marked several times before a drain appears once in the drain.
//! 2. Drained sites come out in first-mark order.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_SITE_ID: AtomicU64 = AtomicU64::new(1);

/// Identifier of one consuming site (a component instance using a selector).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SiteId(pub u64);

impl SiteId {
    /// Allocate a fresh, process-unique site id.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_SITE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Host hook that marks a consuming site as needing to re-run.
pub trait RenderScheduler {
    fn request_render(&self, site: SiteId);
}

impl<F: Fn(SiteId)> RenderScheduler for F {
    fn request_render(&self, site: SiteId) {
        self(site)
    }
}

/// Coalescing queue of sites awaiting a re-render.
///
/// Cloning a `RenderQueue` creates a new handle to the **same** queue.
#[derive(Debug, Clone, Default)]
pub struct RenderQueue {
    pending: Rc<RefCell<Pending>>,
}

/// Sites in first-mark order, plus a set for O(1) coalescing.
#[derive(Debug, Default)]
struct Pending {
    order: Vec<SiteId>,
    marked: HashSet<SiteId>,
}

impl RenderQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `site` is marked and not yet drained.
    #[must_use]
    pub fn is_pending(&self, site: SiteId) -> bool {
        self.pending.borrow().marked.contains(&site)
    }

    /// Number of distinct sites awaiting a re-render.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.borrow().order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.borrow().order.is_empty()
    }

    /// Take every pending site, leaving the queue empty.
    pub fn drain(&self) -> Vec<SiteId> {
        let mut pending = self.pending.borrow_mut();
        pending.marked.clear();
        std::mem::take(&mut pending.order)
    }
}

impl RenderScheduler for RenderQueue {
    fn request_render(&self, site: SiteId) {
        let mut pending = self.pending.borrow_mut();
        if pending.marked.insert(site) {
            pending.order.push(site);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn marks_coalesce_within_a_pass() {
        let queue = RenderQueue::new();
        let a = SiteId::next();
        let b = SiteId::next();
        queue.request_render(a);
        queue.request_render(b);
        queue.request_render(a);
        assert_eq!(queue.len(), 2);
        assert!(queue.is_pending(a));
        assert_eq!(queue.drain(), vec![a, b]);
        assert!(queue.is_empty());
        assert!(!queue.is_pending(a));
    }

    #[test]
    fn heavy_pass_keeps_first_mark_order() {
        let queue = RenderQueue::new();
        let sites: Vec<SiteId> = (0..2_000).map(|_| SiteId::next()).collect();
        for _ in 0..3 {
            for site in sites.iter().rev() {
                queue.request_render(*site);
            }
        }
        assert_eq!(queue.len(), sites.len());
        let drained = queue.drain();
        assert!(drained.iter().eq(sites.iter().rev()));

        // A drained site can be marked again in the next pass.
        queue.request_render(sites[0]);
        assert_eq!(queue.drain(), vec![sites[0]]);
    }

    #[test]
    fn clone_shares_queue() {
        let queue = RenderQueue::new();
        let handle = queue.clone();
        let site = SiteId::next();
        handle.request_render(site);
        assert!(queue.is_pending(site));
    }

    #[test]
    fn closures_are_schedulers() {
        let hits = Cell::new(0u32);
        let scheduler = |_site: SiteId| hits.set(hits.get() + 1);
        scheduler.request_render(SiteId::next());
        scheduler.request_render(SiteId::next());
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn site_ids_are_unique() {
        assert_ne!(SiteId::next(), SiteId::next());
        assert_eq!(SiteId(9).raw(), 9);
    }
}
