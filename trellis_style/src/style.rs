// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shared setter lists.

use std::rc::Rc;

use trellis_property::{ErasedValue, Property, PropertyId, PropertyValue};

/// The value carried by a setter.
///
/// Both variants resolve to a value assigned to the property. A template
/// setter assigns the template object itself; building content from it is
/// the template binder's job once the value takes effect on a host.
#[derive(Clone, Debug, PartialEq)]
pub enum SetterValue {
    /// A plain value.
    Literal(ErasedValue),
    /// A content template.
    Template(ErasedValue),
}

impl SetterValue {
    /// The value assigned to the property.
    #[must_use]
    pub fn value(&self) -> &ErasedValue {
        match self {
            Self::Literal(value) | Self::Template(value) => value,
        }
    }

    /// Returns `true` for template setters.
    #[must_use]
    pub fn is_template(&self) -> bool {
        matches!(self, Self::Template(_))
    }
}

/// A shared, immutable list of property setters.
///
/// Cloning is a reference-count bump, so one style can back any number of
/// rules and elements. Build one with [`StyleBuilder`].
///
/// # Example
///
/// ```rust
/// use trellis_property::{ElementKind, PropertyMetadataBuilder, PropertyRegistry};
/// use trellis_style::StyleBuilder;
///
/// static CONTROL: ElementKind = ElementKind::new("Control");
///
/// let registry = PropertyRegistry::new();
/// let width = registry
///     .register(&CONTROL, "Width", PropertyMetadataBuilder::new(0.0_f64).build())
///     .unwrap();
///
/// let style = StyleBuilder::new().set(width, 4.0).build();
/// assert_eq!(style.get(width), Some(&4.0));
/// assert_eq!(style.len(), 1);
/// ```
#[derive(Clone, Debug, Default)]
pub struct Style {
    inner: Rc<Vec<(PropertyId, SetterValue)>>,
}

impl Style {
    /// Returns `true` if there are no setters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Number of setters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// The setter for `id`, if any.
    #[must_use]
    pub fn setter(&self, id: PropertyId) -> Option<&SetterValue> {
        self.inner
            .binary_search_by_key(&id, |(pid, _)| *pid)
            .ok()
            .map(|idx| &self.inner[idx].1)
    }

    /// The typed value set for `property`, if any.
    #[must_use]
    pub fn get<T: PropertyValue>(&self, property: Property<T>) -> Option<&T> {
        self.setter(property.id())
            .and_then(|setter| setter.value().downcast_ref())
    }

    /// Setters in property-id order.
    pub fn setters(&self) -> impl Iterator<Item = (PropertyId, &SetterValue)> + '_ {
        self.inner.iter().map(|(id, setter)| (*id, setter))
    }

    /// Ids of the properties this style sets.
    pub fn property_ids(&self) -> impl Iterator<Item = PropertyId> + '_ {
        self.inner.iter().map(|(id, _)| *id)
    }

    /// Returns `true` if both handles share the same setter list.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Builder for [`Style`].
#[derive(Debug, Default)]
pub struct StyleBuilder {
    entries: Vec<(PropertyId, SetterValue)>,
}

impl StyleBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a literal value. A later setter for the same property replaces it.
    #[must_use]
    pub fn set<T: PropertyValue>(self, property: Property<T>, value: T) -> Self {
        self.push(property.id(), SetterValue::Literal(ErasedValue::new(value)))
    }

    /// Assigns a template to an optional template-valued property.
    #[must_use]
    pub fn template<T: PropertyValue>(self, property: Property<Option<T>>, template: T) -> Self {
        self.push(
            property.id(),
            SetterValue::Template(ErasedValue::new(Some(template))),
        )
    }

    /// Adds an already erased setter.
    #[must_use]
    pub fn setter(self, id: PropertyId, value: SetterValue) -> Self {
        self.push(id, value)
    }

    fn push(mut self, id: PropertyId, value: SetterValue) -> Self {
        match self.entries.binary_search_by_key(&id, |(pid, _)| *pid) {
            Ok(idx) => self.entries[idx].1 = value,
            Err(idx) => self.entries.insert(idx, (id, value)),
        }
        self
    }

    /// Finishes the style.
    #[must_use]
    pub fn build(self) -> Style {
        Style {
            inner: Rc::new(self.entries),
        }
    }
}
