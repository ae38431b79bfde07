// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Property handles.

use core::fmt;
use core::hash::{Hash, Hasher};
use core::marker::PhantomData;

/// Index of a registration in a [`PropertyRegistry`](crate::PropertyRegistry).
///
/// Ids are dense and assigned in registration order. A `u16` keeps the
/// per-element stores compact.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PropertyId(u16);

impl PropertyId {
    /// Wraps a raw registration index.
    #[must_use]
    #[inline]
    pub const fn new(index: u16) -> Self {
        Self(index)
    }

    /// The raw registration index.
    #[must_use]
    #[inline]
    pub const fn index(self) -> u16 {
        self.0
    }
}

impl fmt::Debug for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A typed handle to a registered property.
///
/// The value type is carried in a phantom parameter, so reading a
/// `Property<f64>` always yields an `f64` and writing a `&str` into it does
/// not compile. Handles are `Copy` and as small as a [`PropertyId`].
///
/// Handles are obtained from
/// [`PropertyRegistry::register`](crate::PropertyRegistry::register) or
/// [`PropertyRegistry::find_typed`](crate::PropertyRegistry::find_typed).
pub struct Property<T> {
    id: PropertyId,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Property<T> {
    /// Reinterprets a raw id as a typed handle.
    ///
    /// The registry checks the value type whenever an erased value is written
    /// through an id, so a handle with the wrong `T` reads as absent rather
    /// than as a wrongly typed value.
    #[must_use]
    #[inline]
    pub const fn from_id(id: PropertyId) -> Self {
        Self {
            id,
            _marker: PhantomData,
        }
    }

    /// The untyped id.
    #[must_use]
    #[inline]
    pub const fn id(self) -> PropertyId {
        self.id
    }
}

impl<T> Copy for Property<T> {}

impl<T> Clone for Property<T> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> PartialEq for Property<T> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for Property<T> {}

impl<T> Hash for Property<T> {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<T> From<Property<T>> for PropertyId {
    fn from(property: Property<T>) -> Self {
        property.id
    }
}

impl<T> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Property")
            .field(&self.id)
            .field(&core::any::type_name::<T>())
            .finish()
    }
}
