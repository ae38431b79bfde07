// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Property metadata and its builder.

use core::fmt;

use crate::value::PropertyValue;

/// Callback applied to every local value before it is stored.
///
/// Use it to clamp or normalize values.
pub type CoerceValueCallback<T> = Box<dyn Fn(T) -> T>;

/// Factory producing a default value.
pub type DefaultFactory<T> = Box<dyn Fn() -> T>;

/// How a property obtains its default value.
pub enum DefaultValue<T> {
    /// A literal shared by every element.
    Value(T),
    /// Built on first use and then shared by every element.
    Lazy(DefaultFactory<T>),
    /// Built separately for each element that carries the property.
    ///
    /// Use this for mutable defaults that must not be shared, such as a
    /// fresh collection per element.
    PerInstance(DefaultFactory<T>),
}

impl<T> DefaultValue<T> {
    /// Returns `true` for [`DefaultValue::PerInstance`].
    #[must_use]
    pub fn is_per_instance(&self) -> bool {
        matches!(self, Self::PerInstance(_))
    }
}

impl<T: fmt::Debug> fmt::Debug for DefaultValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Lazy(_) => f.write_str("Lazy(..)"),
            Self::PerInstance(_) => f.write_str("PerInstance(..)"),
        }
    }
}

/// Configuration of a registered property.
///
/// # Example
///
/// ```rust
/// use trellis_property::{DefaultValue, PropertyMetadataBuilder};
///
/// let metadata = PropertyMetadataBuilder::new(12.0_f64)
///     .inherits(true)
///     .coerce(|size| size.max(1.0))
///     .build();
///
/// assert!(metadata.inherits());
/// assert!(matches!(metadata.default_value(), DefaultValue::Value(v) if *v == 12.0));
/// assert_eq!(metadata.coerce(-3.0), 1.0);
/// ```
pub struct PropertyMetadata<T> {
    default_value: DefaultValue<T>,
    inherits: bool,
    attached: bool,
    coerce_callback: Option<CoerceValueCallback<T>>,
}

impl<T: PropertyValue> PropertyMetadata<T> {
    /// The default value source.
    #[must_use]
    #[inline]
    pub fn default_value(&self) -> &DefaultValue<T> {
        &self.default_value
    }

    /// Whether elements without a closer value take their nearest ancestor's.
    #[must_use]
    #[inline]
    pub fn inherits(&self) -> bool {
        self.inherits
    }

    /// Whether elements of any kind may carry this property.
    #[must_use]
    #[inline]
    pub fn attached(&self) -> bool {
        self.attached
    }

    /// Runs the coerce callback, if any.
    #[inline]
    pub fn coerce(&self, value: T) -> T {
        match &self.coerce_callback {
            Some(callback) => callback(value),
            None => value,
        }
    }

    /// Builds a default value.
    ///
    /// Every call runs the factory for lazy and per-instance defaults. The
    /// registry caches the lazy case.
    #[must_use]
    pub fn make_default(&self) -> T {
        match &self.default_value {
            DefaultValue::Value(value) => value.clone(),
            DefaultValue::Lazy(factory) | DefaultValue::PerInstance(factory) => factory(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for PropertyMetadata<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyMetadata")
            .field("default_value", &self.default_value)
            .field("inherits", &self.inherits)
            .field("attached", &self.attached)
            .field("has_coerce_callback", &self.coerce_callback.is_some())
            .finish()
    }
}

/// Builder for [`PropertyMetadata`].
pub struct PropertyMetadataBuilder<T> {
    metadata: PropertyMetadata<T>,
}

impl<T: PropertyValue> PropertyMetadataBuilder<T> {
    /// Starts from a literal default value.
    #[must_use]
    pub fn new(default_value: T) -> Self {
        Self::with_default(DefaultValue::Value(default_value))
    }

    /// Starts from a default built once, on first use, then shared.
    #[must_use]
    pub fn lazy(factory: impl Fn() -> T + 'static) -> Self {
        Self::with_default(DefaultValue::Lazy(Box::new(factory)))
    }

    /// Starts from a default built once per element.
    #[must_use]
    pub fn per_instance(factory: impl Fn() -> T + 'static) -> Self {
        Self::with_default(DefaultValue::PerInstance(Box::new(factory)))
    }

    fn with_default(default_value: DefaultValue<T>) -> Self {
        Self {
            metadata: PropertyMetadata {
                default_value,
                inherits: false,
                attached: false,
                coerce_callback: None,
            },
        }
    }

    /// Marks the property as inheritable.
    #[must_use]
    pub fn inherits(mut self, inherits: bool) -> Self {
        self.metadata.inherits = inherits;
        self
    }

    /// Marks the property as attached, settable on elements of any kind.
    #[must_use]
    pub fn attached(mut self, attached: bool) -> Self {
        self.metadata.attached = attached;
        self
    }

    /// Installs a coerce callback.
    #[must_use]
    pub fn coerce(mut self, callback: impl Fn(T) -> T + 'static) -> Self {
        self.metadata.coerce_callback = Some(Box::new(callback));
        self
    }

    /// Finishes the metadata.
    #[must_use]
    pub fn build(self) -> PropertyMetadata<T> {
        self.metadata
    }
}

impl<T: fmt::Debug> fmt::Debug for PropertyMetadataBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PropertyMetadataBuilder")
            .field(&self.metadata)
            .finish()
    }
}
