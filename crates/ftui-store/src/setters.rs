//! Write-only access to a publisher's mutator set.
//!
//! Sites that only trigger state changes use [`SetterAccessor`] (or the
//! one-shot [`use_setters`]) instead of a selector. They never subscribe, so
//! snapshot changes never re-render them.

use std::marker::PhantomData;
use std::rc::Rc;

use crate::error::{Result, StoreError};
use crate::publisher::Publisher;
use crate::scope::Scope;

/// Memoized lookup of a publisher's mutators, keyed by publisher identity.
pub struct SetterAccessor<S, M> {
    cached: Option<(u64, Rc<M>)>,
    _state: PhantomData<fn() -> S>,
}

impl<S, M> Default for SetterAccessor<S, M> {
    fn default() -> Self {
        Self {
            cached: None,
            _state: PhantomData,
        }
    }
}

impl<S, M> std::fmt::Debug for SetterAccessor<S, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SetterAccessor")
            .field("publisher_id", &self.cached.as_ref().map(|(id, _)| *id))
            .finish()
    }
}

impl<S: 'static, M: 'static> SetterAccessor<S, M> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The mutator set of the nearest `Publisher<S, M>` in `scope`.
    ///
    /// Returns the same `Rc` on every call while the resolved publisher stays
    /// the same; snapshot changes never invalidate it.
    ///
    /// # Errors
    ///
    /// [`StoreError::MissingProvider`] if `scope` has no `Publisher<S, M>`.
    pub fn resolve(&mut self, scope: &Scope) -> Result<Rc<M>> {
        let publisher = scope
            .lookup::<Publisher<S, M>>()
            .ok_or_else(StoreError::missing_provider::<Publisher<S, M>>)?;
        Ok(self.resolve_from(&publisher))
    }

    /// Like [`resolve`](Self::resolve), for an explicitly supplied publisher.
    pub fn resolve_from(&mut self, publisher: &Publisher<S, M>) -> Rc<M> {
        if let Some((id, mutators)) = &self.cached
            && *id == publisher.id()
        {
            return Rc::clone(mutators);
        }
        let mutators = publisher.shared_mutators();
        self.cached = Some((publisher.id(), Rc::clone(&mutators)));
        mutators
    }
}

/// One-shot lookup of the mutator set provided in `scope`.
///
/// # Errors
///
/// [`StoreError::MissingProvider`] if `scope` has no `Publisher<S, M>`.
pub fn use_setters<S: 'static, M: 'static>(scope: &Scope) -> Result<Rc<M>> {
    SetterAccessor::<S, M>::new().resolve(scope)
}
