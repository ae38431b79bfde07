// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Type-erased property values.
//!
//! Every value that flows through the property system (local values, style
//! setters, defaults, change notifications) is carried as an [`ErasedValue`].
//! Erasure keeps the per-element stores and the notification bus homogeneous
//! while [`Property<T>`](crate::Property) keeps the public API typed.

use core::any::{Any, TypeId};
use core::fmt;

/// Bound satisfied by every type that can be stored in a property.
///
/// `PartialEq` is required so that redundant writes can be detected and no
/// change notification is emitted when the effective value did not change.
/// Types with identity semantics (templates, shared collections) implement
/// `PartialEq` as pointer equality.
pub trait PropertyValue: Clone + PartialEq + 'static {}

impl<T: Clone + PartialEq + 'static> PropertyValue for T {}

/// A type-erased property value.
///
/// # Example
///
/// ```rust
/// use trellis_property::ErasedValue;
///
/// let value = ErasedValue::new(42_i32);
/// assert!(value.is::<i32>());
/// assert_eq!(value.downcast_ref::<i32>(), Some(&42));
///
/// // Equality compares the payloads, and values of different types are never equal.
/// assert_eq!(value, ErasedValue::new(42_i32));
/// assert_ne!(value, ErasedValue::new(42_i64));
/// ```
pub struct ErasedValue {
    inner: Box<dyn ErasedPayload>,
}

impl ErasedValue {
    /// Erases a concrete value.
    #[must_use]
    pub fn new<T: PropertyValue>(value: T) -> Self {
        Self {
            inner: Box::new(value),
        }
    }

    /// Returns the [`TypeId`] of the contained value.
    #[must_use]
    #[inline]
    pub fn value_type_id(&self) -> TypeId {
        self.inner.as_any().type_id()
    }

    /// Returns the Rust type name of the contained value.
    #[must_use]
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.inner.type_name()
    }

    /// Returns `true` if the contained value is a `T`.
    #[must_use]
    #[inline]
    pub fn is<T: 'static>(&self) -> bool {
        self.inner.as_any().is::<T>()
    }

    /// Borrows the contained value as a `T`, if it is one.
    #[must_use]
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.inner.as_any().downcast_ref()
    }

    /// Clones the contained value out as a `T`, if it is one.
    #[must_use]
    pub fn get<T: PropertyValue>(&self) -> Option<T> {
        self.downcast_ref::<T>().cloned()
    }
}

impl Clone for ErasedValue {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone_boxed(),
        }
    }
}

impl PartialEq for ErasedValue {
    fn eq(&self, other: &Self) -> bool {
        self.inner.eq_erased(other.inner.as_any())
    }
}

impl fmt::Debug for ErasedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErasedValue")
            .field("type", &self.type_name())
            .finish_non_exhaustive()
    }
}

trait ErasedPayload: Any {
    fn as_any(&self) -> &dyn Any;
    fn clone_boxed(&self) -> Box<dyn ErasedPayload>;
    fn eq_erased(&self, other: &dyn Any) -> bool;
    fn type_name(&self) -> &'static str;
}

impl<T: PropertyValue> ErasedPayload for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn clone_boxed(&self) -> Box<dyn ErasedPayload> {
        Box::new(self.clone())
    }

    fn eq_erased(&self, other: &dyn Any) -> bool {
        other.downcast_ref::<T>().is_some_and(|other| self == other)
    }

    fn type_name(&self) -> &'static str {
        core::any::type_name::<T>()
    }
}
