//! Identity comparison for projected values.
//!
//! Selectors decide whether to re-render by asking whether the new projection
//! is *the same value* as the previous one. Shared handles (`Rc`, `Arc`)
//! compare by pointer, never by contents: a projection that allocates a fresh
//! `Rc` on every call is always "different", even when the contents match.
//! Scalars and strings compare by value, since there is no allocation to
//! distinguish them.
//!
//! # Invariants
//!
//! 1. `identical` is reflexive for every type except floats holding `NaN`.
//! 2. No implementation in this crate inspects the pointee of a shared handle.

use std::rc::Rc;
use std::sync::Arc;

/// Strict identity between two projected values.
pub trait Identity {
    /// Whether `self` and `other` are the same value.
    fn identical(&self, other: &Self) -> bool;
}

impl<T: ?Sized> Identity for Rc<T> {
    #[inline]
    fn identical(&self, other: &Self) -> bool {
        Rc::ptr_eq(self, other)
    }
}

impl<T: ?Sized> Identity for Arc<T> {
    #[inline]
    fn identical(&self, other: &Self) -> bool {
        Arc::ptr_eq(self, other)
    }
}

macro_rules! identity_by_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Identity for $ty {
                #[inline]
                fn identical(&self, other: &Self) -> bool {
                    self == other
                }
            }
        )*
    };
}

identity_by_value!(
    (),
    bool,
    char,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    f32,
    f64,
    &'static str,
    String,
);

impl<T: Identity> Identity for Option<T> {
    fn identical(&self, other: &Self) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.identical(b),
            (None, None) => true,
            _ => false,
        }
    }
}

macro_rules! identity_tuple {
    ($($name:ident : $idx:tt),+) => {
        impl<$($name: Identity),+> Identity for ($($name,)+) {
            fn identical(&self, other: &Self) -> bool {
                $(self.$idx.identical(&other.$idx))&&+
            }
        }
    };
}

identity_tuple!(A: 0);
identity_tuple!(A: 0, B: 1);
identity_tuple!(A: 0, B: 1, C: 2);
identity_tuple!(A: 0, B: 1, C: 2, D: 3);
