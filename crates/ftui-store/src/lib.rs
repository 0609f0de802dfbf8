#![forbid(unsafe_code)]

//! Selector-based state subscriptions for FrankenTUI providers.
//!
//! A provider shares one state snapshot and a fixed set of mutators with the
//! sites below it. Each consuming site subscribes to a *slice* of that state
//! and re-renders only when its slice changes, instead of re-rendering on
//! every change to the shared value.
//!
//! - [`Publisher`]: the published value. Holds the latest snapshot, detects
//!   snapshot replacement at commit time, and fans out to listeners.
//! - [`Subscription`]: RAII registration handle; dropping it unsubscribes.
//! - [`Selector`]: per-site projection with an identity-compared cache that
//!   requests a re-render only when the projection changes.
//! - [`SetterAccessor`]: memoized, write-only access to the mutator set.
//! - [`Scope`]: scoped value lookup used to hand the publisher down a tree.
//! - [`Provider`]: owner-side render slot and commit step.
//!
//! # Architecture
//!
//! Everything is single-threaded and synchronous (`Rc<RefCell<..>>`). The
//! host drives rendering: it calls [`Provider::commit`] after the owner
//! commits, and drains its [`RenderScheduler`] (for example a
//! [`RenderQueue`]) to learn which sites must run again.
//!
//! # Invariants
//!
//! 1. A new snapshot is visible through `get_state()` before any listener
//!    is notified of it.
//! 2. Listeners are notified in registration order, once per snapshot
//!    replacement, and never for a pointer-identical commit.
//! 3. A selector re-renders if and only if its projection result is not
//!    [`identical`](Identity::identical) to the previous one.
//! 4. Unmounting every selector returns the publisher's registry to size 0.

pub mod error;
pub mod identity;
pub mod provider;
pub mod publisher;
pub mod schedule;
pub mod scope;
pub mod selector;
pub mod setters;

pub use error::{Result, StoreError};
pub use identity::Identity;
pub use provider::{Provider, StateHandle};
pub use publisher::{Publisher, StoreConfig, Subscription, WeakPublisher};
pub use schedule::{RenderQueue, RenderScheduler, SiteId};
pub use scope::Scope;
pub use selector::{Selector, use_selector};
pub use setters::{SetterAccessor, use_setters};
