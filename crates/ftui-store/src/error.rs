//! Errors surfaced by consumers of a [`Publisher`](crate::Publisher).

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A selector or setter accessor was used on a scope with no enclosing
    /// provider of the expected publisher type.
    #[error("no {publisher} provided in any enclosing scope (used outside of a provider?)")]
    MissingProvider { publisher: &'static str },
}

impl StoreError {
    #[must_use]
    pub fn missing_provider<T: ?Sized>() -> Self {
        Self::MissingProvider {
            publisher: std::any::type_name::<T>(),
        }
    }
}
