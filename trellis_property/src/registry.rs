// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The property registry.
//!
//! Registrations are keyed by `(owner kind, name)` and are immutable once
//! made. The registry itself is append-only, which is why it can hand out
//! shared [`PropertyRegistration`]s while still accepting new registrations
//! through `&self`.

use core::any::{Any, TypeId};
use core::cell::{OnceCell, RefCell};
use core::fmt;
use std::rc::Rc;

use hashbrown::HashMap;

use crate::error::PropertyError;
use crate::id::{Property, PropertyId};
use crate::kind::ElementKind;
use crate::metadata::{DefaultValue, PropertyMetadata};
use crate::value::{ErasedValue, PropertyValue};

/// Largest number of registrations a registry accepts.
pub const MAX_PROPERTIES: usize = u16::MAX as usize;

/// A registered property.
pub struct PropertyRegistration {
    id: PropertyId,
    owner: &'static ElementKind,
    name: &'static str,
    type_id: TypeId,
    type_name: &'static str,
    metadata: Box<dyn ErasedMetadata>,
    shared_default: OnceCell<ErasedValue>,
}

impl PropertyRegistration {
    /// The property's id.
    #[must_use]
    #[inline]
    pub fn id(&self) -> PropertyId {
        self.id
    }

    /// The kind that declared the property.
    #[must_use]
    #[inline]
    pub fn owner(&self) -> &'static ElementKind {
        self.owner
    }

    /// The property name.
    #[must_use]
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The [`TypeId`] of the value type.
    #[must_use]
    #[inline]
    pub fn value_type_id(&self) -> TypeId {
        self.type_id
    }

    /// The Rust name of the value type.
    #[must_use]
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Whether the property inherits down the element tree.
    #[must_use]
    pub fn inherits(&self) -> bool {
        self.metadata.inherits()
    }

    /// Whether the property may be set on elements of any kind.
    #[must_use]
    pub fn attached(&self) -> bool {
        self.metadata.attached()
    }

    /// Whether each element gets its own default value.
    #[must_use]
    pub fn has_instance_default(&self) -> bool {
        self.metadata.per_instance()
    }

    /// Returns `true` if elements of `kind` may carry this property.
    #[must_use]
    pub fn applies_to(&self, kind: &ElementKind) -> bool {
        self.attached() || kind.is_a(self.owner)
    }

    /// Checks that `value` has the registered type.
    pub fn check_type(&self, value: &ErasedValue) -> Result<(), PropertyError> {
        if value.value_type_id() == self.type_id {
            Ok(())
        } else {
            Err(PropertyError::TypeMismatch {
                property: self.name,
                expected: self.type_name,
                found: value.type_name(),
            })
        }
    }

    /// Type-checks and coerces a value about to be stored locally.
    pub fn coerce(&self, value: ErasedValue) -> Result<ErasedValue, PropertyError> {
        self.check_type(&value)?;
        Ok(self.metadata.coerce(value))
    }

    /// The default shared by every element.
    ///
    /// A lazy factory runs on the first call only. A per-instance factory runs
    /// on every call; callers keep the result per element, see
    /// [`PropertyStore::insert_instance_default`](crate::PropertyStore::insert_instance_default).
    #[must_use]
    pub fn default_value(&self) -> ErasedValue {
        if self.metadata.per_instance() {
            return self.metadata.make_default();
        }
        self.shared_default
            .get_or_init(|| self.metadata.make_default())
            .clone()
    }

    /// Builds a fresh default for a new element, for per-instance properties.
    #[must_use]
    pub fn instance_default(&self) -> Option<ErasedValue> {
        self.metadata
            .per_instance()
            .then(|| self.metadata.make_default())
    }

    /// Borrows the typed metadata.
    #[must_use]
    pub fn metadata<T: PropertyValue>(&self) -> Option<&PropertyMetadata<T>> {
        self.metadata.as_any().downcast_ref()
    }
}

impl fmt::Debug for PropertyRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyRegistration")
            .field("id", &self.id)
            .field("owner", &self.owner.name())
            .field("name", &self.name)
            .field("type", &self.type_name)
            .field("inherits", &self.inherits())
            .field("attached", &self.attached())
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
struct Registrations {
    properties: Vec<Rc<PropertyRegistration>>,
    /// Property name to `(owner name, id)` for every owner declaring it.
    by_name: HashMap<&'static str, Vec<(&'static str, PropertyId)>>,
}

/// An append-only table of property registrations.
///
/// # Example
///
/// ```rust
/// use trellis_property::{ElementKind, PropertyMetadataBuilder, PropertyRegistry};
///
/// static CONTROL: ElementKind = ElementKind::new("Control");
/// static BUTTON: ElementKind = ElementKind::derived("Button", &CONTROL);
///
/// let registry = PropertyRegistry::new();
/// let width = registry
///     .register(&CONTROL, "Width", PropertyMetadataBuilder::new(0.0_f64).build())
///     .unwrap();
///
/// // Lookups walk the kind chain, so subtypes reuse base properties.
/// assert_eq!(registry.find(&BUTTON, "Width"), Some(width.id()));
///
/// // Registering the same owner and name twice fails.
/// assert!(registry
///     .register(&CONTROL, "Width", PropertyMetadataBuilder::new(1.0_f64).build())
///     .is_err());
/// ```
#[derive(Default)]
pub struct PropertyRegistry {
    inner: RefCell<Registrations>,
}

thread_local! {
    static GLOBAL: &'static PropertyRegistry = Box::leak(Box::new(PropertyRegistry::new()));
}

impl PropertyRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry shared by every tree on the current thread.
    ///
    /// It is created on first access and never torn down.
    #[must_use]
    pub fn global() -> &'static Self {
        GLOBAL.with(|registry| *registry)
    }

    /// Registers a property owned by `owner`.
    pub fn register<T: PropertyValue>(
        &self,
        owner: &'static ElementKind,
        name: &'static str,
        metadata: PropertyMetadata<T>,
    ) -> Result<Property<T>, PropertyError> {
        let mut inner = self.inner.borrow_mut();
        if inner
            .by_name
            .get(name)
            .is_some_and(|owners| owners.iter().any(|(o, _)| *o == owner.name()))
        {
            return Err(PropertyError::DuplicateRegistration {
                owner: owner.name(),
                name,
            });
        }
        let index = u16::try_from(inner.properties.len())
            .ok()
            .filter(|index| usize::from(*index) < MAX_PROPERTIES)
            .ok_or(PropertyError::RegistryFull {
                max: MAX_PROPERTIES,
            })?;
        let id = PropertyId::new(index);

        tracing::debug!(owner = owner.name(), name, ?id, "registered property");
        inner.properties.push(Rc::new(PropertyRegistration {
            id,
            owner,
            name,
            type_id: TypeId::of::<T>(),
            type_name: core::any::type_name::<T>(),
            metadata: Box::new(metadata),
            shared_default: OnceCell::new(),
        }));
        inner
            .by_name
            .entry(name)
            .or_default()
            .push((owner.name(), id));

        Ok(Property::from_id(id))
    }

    /// Number of registrations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.borrow().properties.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the registration for `id`.
    #[must_use]
    pub fn get(&self, id: PropertyId) -> Option<Rc<PropertyRegistration>> {
        self.inner
            .borrow()
            .properties
            .get(usize::from(id.index()))
            .cloned()
    }

    /// Finds a property by name for elements of `kind`.
    ///
    /// The kind chain is searched most-derived first, and the first
    /// registration found wins.
    #[must_use]
    pub fn find(&self, kind: &ElementKind, name: &str) -> Option<PropertyId> {
        let inner = self.inner.borrow();
        let owners = inner.by_name.get(name)?;
        kind.ancestry().find_map(|kind| {
            owners
                .iter()
                .find(|(owner, _)| *owner == kind.name())
                .map(|(_, id)| *id)
        })
    }

    /// Finds a property by name and checks its value type.
    pub fn find_typed<T: PropertyValue>(
        &self,
        kind: &ElementKind,
        name: &str,
    ) -> Result<Property<T>, PropertyError> {
        let id = self
            .find(kind, name)
            .ok_or_else(|| PropertyError::UnknownProperty {
                property: name.to_owned(),
                element_type: kind.name(),
            })?;
        let registration = self
            .get(id)
            .ok_or_else(|| PropertyError::unregistered(id, kind.name()))?;
        if registration.value_type_id() != TypeId::of::<T>() {
            return Err(PropertyError::TypeMismatch {
                property: registration.name(),
                expected: registration.type_name(),
                found: core::any::type_name::<T>(),
            });
        }
        Ok(Property::from_id(id))
    }

    /// The registration for `id`, if it applies to elements of `kind`.
    pub fn resolve(
        &self,
        kind: &'static ElementKind,
        id: PropertyId,
    ) -> Result<Rc<PropertyRegistration>, PropertyError> {
        let registration = self
            .get(id)
            .ok_or_else(|| PropertyError::unregistered(id, kind.name()))?;
        if registration.applies_to(kind) {
            Ok(registration)
        } else {
            Err(PropertyError::UnknownProperty {
                property: format!("{}.{}", registration.owner().name(), registration.name()),
                element_type: kind.name(),
            })
        }
    }

    /// Builds the per-instance defaults a new element of `kind` carries.
    #[must_use]
    pub fn instance_defaults(&self, kind: &ElementKind) -> Vec<(PropertyId, ErasedValue)> {
        let registrations: Vec<_> = self
            .inner
            .borrow()
            .properties
            .iter()
            .filter(|r| r.has_instance_default() && r.applies_to(kind))
            .cloned()
            .collect();
        // Factories run outside the borrow so they may register properties.
        registrations
            .iter()
            .filter_map(|r| r.instance_default().map(|value| (r.id(), value)))
            .collect()
    }

    /// Typed shared default of a property.
    #[must_use]
    pub fn default_value<T: PropertyValue>(&self, property: Property<T>) -> Option<T> {
        self.get(property.id())?.default_value().get()
    }

    /// Snapshot of all registrations, in id order.
    #[must_use]
    pub fn registrations(&self) -> Vec<Rc<PropertyRegistration>> {
        self.inner.borrow().properties.clone()
    }
}

impl fmt::Debug for PropertyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("PropertyRegistry")
            .field("count", &inner.properties.len())
            .field(
                "properties",
                &inner
                    .properties
                    .iter()
                    .map(|r| format!("{}.{}", r.owner().name(), r.name()))
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

trait ErasedMetadata: Any {
    fn as_any(&self) -> &dyn Any;
    fn inherits(&self) -> bool;
    fn attached(&self) -> bool;
    fn per_instance(&self) -> bool;
    fn make_default(&self) -> ErasedValue;
    fn coerce(&self, value: ErasedValue) -> ErasedValue;
}

impl<T: PropertyValue> ErasedMetadata for PropertyMetadata<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn inherits(&self) -> bool {
        Self::inherits(self)
    }

    fn attached(&self) -> bool {
        Self::attached(self)
    }

    fn per_instance(&self) -> bool {
        matches!(self.default_value(), DefaultValue::PerInstance(_))
    }

    fn make_default(&self) -> ErasedValue {
        ErasedValue::new(Self::make_default(self))
    }

    fn coerce(&self, value: ErasedValue) -> ErasedValue {
        match value.get::<T>() {
            Some(typed) => ErasedValue::new(Self::coerce(self, typed)),
            None => value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::PropertyMetadataBuilder;
    use std::cell::Cell;

    static VISUAL: ElementKind = ElementKind::new("Visual");
    static CONTROL: ElementKind = ElementKind::derived("Control", &VISUAL);
    static BUTTON: ElementKind = ElementKind::derived("Button", &CONTROL);
    static GRID: ElementKind = ElementKind::derived("Grid", &VISUAL);

    #[test]
    fn register_assigns_dense_ids() {
        let registry = PropertyRegistry::new();
        assert!(registry.is_empty());
        let a = registry
            .register(&CONTROL, "A", PropertyMetadataBuilder::new(0_i32).build())
            .unwrap();
        let b = registry
            .register(&CONTROL, "B", PropertyMetadataBuilder::new(0_i32).build())
            .unwrap();
        assert_eq!(a.id().index(), 0);
        assert_eq!(b.id().index(), 1);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn duplicate_registration_is_an_error_and_changes_nothing() {
        let registry = PropertyRegistry::new();
        registry
            .register(&CONTROL, "Width", PropertyMetadataBuilder::new(0.0_f64).build())
            .unwrap();
        let err = registry
            .register(&CONTROL, "Width", PropertyMetadataBuilder::new(0_u8).build())
            .unwrap_err();
        assert_eq!(
            err,
            PropertyError::DuplicateRegistration {
                owner: "Control",
                name: "Width"
            }
        );
        assert_eq!(registry.len(), 1);
        // Same name on another owner is a different property.
        assert!(registry
            .register(&GRID, "Width", PropertyMetadataBuilder::new(0.0_f64).build())
            .is_ok());
    }

    #[test]
    fn find_walks_most_derived_first() {
        let registry = PropertyRegistry::new();
        let base = registry
            .register(&VISUAL, "Opacity", PropertyMetadataBuilder::new(1.0_f64).build())
            .unwrap();
        let shadow = registry
            .register(&CONTROL, "Opacity", PropertyMetadataBuilder::new(0.5_f64).build())
            .unwrap();

        assert_eq!(registry.find(&GRID, "Opacity"), Some(base.id()));
        assert_eq!(registry.find(&BUTTON, "Opacity"), Some(shadow.id()));
        assert_eq!(registry.find(&BUTTON, "Missing"), None);
    }

    #[test]
    fn find_typed_checks_the_value_type() {
        let registry = PropertyRegistry::new();
        let width = registry
            .register(&CONTROL, "Width", PropertyMetadataBuilder::new(0.0_f64).build())
            .unwrap();
        assert_eq!(registry.find_typed::<f64>(&BUTTON, "Width"), Ok(width));
        assert!(matches!(
            registry.find_typed::<i32>(&BUTTON, "Width"),
            Err(PropertyError::TypeMismatch { .. })
        ));
        assert!(matches!(
            registry.find_typed::<f64>(&GRID, "Width"),
            Err(PropertyError::UnknownProperty { .. })
        ));
    }

    #[test]
    fn resolve_respects_owner_and_attached() {
        let registry = PropertyRegistry::new();
        let width = registry
            .register(&CONTROL, "Width", PropertyMetadataBuilder::new(0.0_f64).build())
            .unwrap();
        let row = registry
            .register(
                &GRID,
                "Row",
                PropertyMetadataBuilder::new(0_u32).attached(true).build(),
            )
            .unwrap();

        assert!(registry.resolve(&BUTTON, width.id()).is_ok());
        assert!(registry.resolve(&GRID, width.id()).is_err());
        assert!(registry.resolve(&BUTTON, row.id()).is_ok());
        assert!(registry.resolve(&BUTTON, PropertyId::new(99)).is_err());
    }

    #[test]
    fn lazy_default_is_built_once() {
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let registry = PropertyRegistry::new();
        let items = registry
            .register(
                &CONTROL,
                "Panel",
                PropertyMetadataBuilder::lazy(move || {
                    counter.set(counter.get() + 1);
                    String::from("vertical")
                })
                .build(),
            )
            .unwrap();

        assert_eq!(calls.get(), 0);
        assert_eq!(registry.default_value(items).as_deref(), Some("vertical"));
        assert_eq!(registry.default_value(items).as_deref(), Some("vertical"));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn per_instance_defaults_are_built_per_element() {
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let registry = PropertyRegistry::new();
        let tags = registry
            .register(
                &CONTROL,
                "Tags",
                PropertyMetadataBuilder::per_instance(move || {
                    counter.set(counter.get() + 1);
                    vec![counter.get()]
                })
                .build(),
            )
            .unwrap();

        let first = registry.instance_defaults(&BUTTON);
        let second = registry.instance_defaults(&BUTTON);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].0, tags.id());
        assert_ne!(first[0].1, second[0].1);
        assert!(registry.instance_defaults(&GRID).is_empty());
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn coerce_checks_type_then_applies_callback() {
        let registry = PropertyRegistry::new();
        let opacity = registry
            .register(
                &VISUAL,
                "Opacity",
                PropertyMetadataBuilder::new(1.0_f64)
                    .coerce(|v| v.clamp(0.0, 1.0))
                    .build(),
            )
            .unwrap();
        let registration = registry.get(opacity.id()).unwrap();
        assert_eq!(
            registration.coerce(ErasedValue::new(4.0_f64)).unwrap(),
            ErasedValue::new(1.0_f64)
        );
        assert!(registration.coerce(ErasedValue::new("x")).is_err());
        assert!(registration.metadata::<f64>().is_some());
        assert!(registration.metadata::<f32>().is_none());
    }

    #[test]
    fn global_is_per_thread_and_stable() {
        let a = PropertyRegistry::global();
        let b = PropertyRegistry::global();
        assert!(core::ptr::eq(a, b));
        let other = std::thread::spawn(|| PropertyRegistry::global() as *const _ as usize)
            .join()
            .unwrap();
        assert_ne!(other, a as *const _ as usize);
    }

    #[test]
    fn debug_lists_qualified_names() {
        let registry = PropertyRegistry::new();
        registry
            .register(&CONTROL, "Width", PropertyMetadataBuilder::new(0.0_f64).build())
            .unwrap();
        let debug = format!("{registry:?}");
        assert!(debug.contains("Control.Width"));
    }
}
