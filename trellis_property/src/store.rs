// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-element sparse property storage.
//!
//! Entries live in sorted vectors searched by [`PropertyId`]. Elements
//! usually set only a handful of properties, so a contiguous, binary-searched
//! list beats a hash map on both memory and lookup time, and the first few
//! local entries stay inline.
//!
//! A store holds the two value sources that belong to the element itself:
//! local values and per-instance defaults. Styled and inherited values are
//! resolved by the layers above.

use smallvec::SmallVec;

use crate::id::{Property, PropertyId};
use crate::registry::PropertyRegistry;
use crate::value::{ErasedValue, PropertyValue};

const INLINE_CAPACITY: usize = 8;

/// Local values and per-instance defaults of one element.
///
/// # Example
///
/// ```rust
/// use trellis_property::{ElementKind, PropertyMetadataBuilder, PropertyRegistry, PropertyStore};
///
/// static VISUAL: ElementKind = ElementKind::new("Visual");
///
/// let registry = PropertyRegistry::new();
/// let width = registry
///     .register(&VISUAL, "Width", PropertyMetadataBuilder::new(0.0_f64).build())
///     .unwrap();
///
/// let mut store = PropertyStore::new(1_u32);
/// assert_eq!(store.get_effective_local(width, &registry), Some(0.0));
///
/// store.set_local(width, 100.0);
/// assert_eq!(store.get_local(width), Some(&100.0));
///
/// // Clearing hands back the previous value.
/// assert!(store.clear_local(width).is_some());
/// assert_eq!(store.get_effective_local(width, &registry), Some(0.0));
/// ```
#[derive(Clone, Debug)]
pub struct PropertyStore<K> {
    local: SmallVec<[(PropertyId, ErasedValue); INLINE_CAPACITY]>,
    /// Stored out of line; most elements have none.
    instance_defaults: Vec<(PropertyId, ErasedValue)>,
    owner: K,
}

fn find(entries: &[(PropertyId, ErasedValue)], id: PropertyId) -> Result<usize, usize> {
    entries.binary_search_by_key(&id, |(pid, _)| *pid)
}

fn get(entries: &[(PropertyId, ErasedValue)], id: PropertyId) -> Option<&ErasedValue> {
    find(entries, id).ok().map(|idx| &entries[idx].1)
}

impl<K: Copy> PropertyStore<K> {
    /// Creates an empty store for `owner`.
    #[must_use]
    pub fn new(owner: K) -> Self {
        Self {
            local: SmallVec::new(),
            instance_defaults: Vec::new(),
            owner,
        }
    }

    /// Creates a store seeded with per-instance defaults.
    ///
    /// See [`PropertyRegistry::instance_defaults`].
    #[must_use]
    pub fn with_instance_defaults(
        owner: K,
        mut defaults: Vec<(PropertyId, ErasedValue)>,
    ) -> Self {
        defaults.sort_by_key(|(id, _)| *id);
        defaults.dedup_by_key(|(id, _)| *id);
        Self {
            local: SmallVec::new(),
            instance_defaults: defaults,
            owner,
        }
    }

    /// The owner key.
    #[must_use]
    #[inline]
    pub fn owner(&self) -> K {
        self.owner
    }

    /// Returns `true` if no local values are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.local.is_empty()
    }

    /// Number of local values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.local.len()
    }

    /// Ids with a local value, ascending.
    pub fn local_ids(&self) -> impl Iterator<Item = PropertyId> + '_ {
        self.local.iter().map(|(id, _)| *id)
    }

    // Typed access.

    /// The local value, if set.
    #[must_use]
    pub fn get_local<T: PropertyValue>(&self, property: Property<T>) -> Option<&T> {
        get(&self.local, property.id()).and_then(ErasedValue::downcast_ref)
    }

    /// Sets the local value, returning the previous one.
    pub fn set_local<T: PropertyValue>(
        &mut self,
        property: Property<T>,
        value: T,
    ) -> Option<ErasedValue> {
        self.set_local_erased(property.id(), ErasedValue::new(value))
    }

    /// Clears the local value, returning it.
    pub fn clear_local<T: PropertyValue>(&mut self, property: Property<T>) -> Option<ErasedValue> {
        self.clear_local_erased(property.id())
    }

    /// Returns `true` if a local value is set.
    #[must_use]
    pub fn has_local(&self, id: PropertyId) -> bool {
        find(&self.local, id).is_ok()
    }

    /// Local, then per-instance default, then the registry's shared default.
    ///
    /// Styled and inherited values are not considered.
    #[must_use]
    pub fn get_effective_local<T: PropertyValue>(
        &self,
        property: Property<T>,
        registry: &PropertyRegistry,
    ) -> Option<T> {
        if let Some(value) = self.get_local(property) {
            return Some(value.clone());
        }
        self.default_value(property.id(), registry)
            .and_then(|value| value.get())
    }

    // Erased access.

    /// The erased local value, if set.
    #[must_use]
    pub fn local(&self, id: PropertyId) -> Option<&ErasedValue> {
        get(&self.local, id)
    }

    /// Stores an erased local value, returning the previous one.
    ///
    /// The caller is responsible for type-checking against the registration.
    pub fn set_local_erased(&mut self, id: PropertyId, value: ErasedValue) -> Option<ErasedValue> {
        match find(&self.local, id) {
            Ok(idx) => Some(core::mem::replace(&mut self.local[idx].1, value)),
            Err(idx) => {
                self.local.insert(idx, (id, value));
                None
            }
        }
    }

    /// Removes an erased local value, returning it.
    pub fn clear_local_erased(&mut self, id: PropertyId) -> Option<ErasedValue> {
        find(&self.local, id)
            .ok()
            .map(|idx| self.local.remove(idx).1)
    }

    /// Removes every local value and instance default.
    ///
    /// Returns the ids that had local values.
    pub fn clear(&mut self) -> Vec<PropertyId> {
        self.instance_defaults.clear();
        self.local.drain(..).map(|(id, _)| id).collect()
    }

    /// The element's own default for `id`, if it has one.
    #[must_use]
    pub fn instance_default(&self, id: PropertyId) -> Option<&ErasedValue> {
        get(&self.instance_defaults, id)
    }

    /// Gives the element its own default for `id` unless it already has one.
    ///
    /// Returns `false` if a default was already present.
    pub fn insert_instance_default(&mut self, id: PropertyId, value: ErasedValue) -> bool {
        match find(&self.instance_defaults, id) {
            Ok(_) => false,
            Err(idx) => {
                self.instance_defaults.insert(idx, (id, value));
                true
            }
        }
    }

    /// Per-instance default, falling back to the registry's shared default.
    #[must_use]
    pub fn default_value(&self, id: PropertyId, registry: &PropertyRegistry) -> Option<ErasedValue> {
        if let Some(value) = self.instance_default(id) {
            return Some(value.clone());
        }
        registry.get(id).map(|registration| registration.default_value())
    }
}
