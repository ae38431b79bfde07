// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Live value forwarding between two `(element, property)` endpoints.

use hashbrown::HashMap;
use trellis_property::{ErasedValue, Property, PropertyId, PropertyValue};

use crate::engine::Mutation;
use crate::error::TreeError;
use crate::id::{BindingId, ElementId, SubscriptionId};
use crate::notify::{Event, Topic};
use crate::tree::ElementTree;

/// Direction of a binding.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum BindingMode {
    /// Source changes are pushed to the target.
    #[default]
    OneWay,
    /// Changes on either side are pushed to the other.
    TwoWay,
}

#[derive(Debug)]
pub(crate) struct BindingRecord {
    source: ElementId,
    target: ElementId,
    forward: SubscriptionId,
    reverse: Option<SubscriptionId>,
}

impl BindingRecord {
    pub(crate) fn subscriptions(&self) -> impl Iterator<Item = SubscriptionId> + use<> {
        core::iter::once(self.forward).chain(self.reverse)
    }

    fn touches(&self, element: ElementId) -> bool {
        self.source == element || self.target == element
    }
}

#[derive(Debug, Default)]
pub(crate) struct Bindings {
    next: u64,
    records: HashMap<BindingId, BindingRecord>,
}

impl Bindings {
    fn insert(&mut self, record: BindingRecord) -> BindingId {
        self.next += 1;
        let id = BindingId(self.next);
        self.records.insert(id, record);
        id
    }

    fn remove(&mut self, id: BindingId) -> Option<BindingRecord> {
        self.records.remove(&id)
    }

    /// Removes every binding with an endpoint on `element`.
    pub(crate) fn remove_element(&mut self, element: ElementId) -> Vec<BindingRecord> {
        let ids: Vec<_> = self
            .records
            .iter()
            .filter(|(_, record)| record.touches(element))
            .map(|(id, _)| *id)
            .collect();
        ids.into_iter()
            .filter_map(|id| self.records.remove(&id))
            .collect()
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}

impl ElementTree {
    /// Binds `target_property` on `target` to `source_property` on `source`.
    ///
    /// The target receives the source's effective value now and on every
    /// change, as a local value. A two-way binding also pushes target changes
    /// back to the source. A value is only written when it differs from the
    /// receiving side's effective value, which stops a two-way pair from
    /// echoing.
    ///
    /// Bindings hold ids, not elements. Destroying either endpoint disposes
    /// the binding.
    pub fn bind<T: PropertyValue>(
        &self,
        source: ElementId,
        source_property: Property<T>,
        target: ElementId,
        target_property: Property<T>,
        mode: BindingMode,
    ) -> Result<BindingId, TreeError> {
        let initial = self.get_erased(source, source_property.id())?;
        self.get_erased(target, target_property.id())?;

        let forward = self.forwarder(source, source_property.id(), target, target_property.id());
        let reverse = (mode == BindingMode::TwoWay)
            .then(|| self.forwarder(target, target_property.id(), source, source_property.id()));
        let id = self.core.borrow_mut().bindings.insert(BindingRecord {
            source,
            target,
            forward,
            reverse,
        });
        tracing::trace!(binding = ?id, %source, %target, ?mode, "bound");
        self.push_value(target, target_property.id(), &initial);
        Ok(id)
    }

    fn forwarder(
        &self,
        from: ElementId,
        from_property: PropertyId,
        to: ElementId,
        to_property: PropertyId,
    ) -> SubscriptionId {
        self.subscribe(from, Topic::Property(from_property), move |tree, event| {
            if let Event::Property(change) = event {
                tree.push_value(to, to_property, &change.new);
            }
        })
    }

    /// Writes `value` as a local value unless it is already effective.
    fn push_value(&self, element: ElementId, property: PropertyId, value: &ErasedValue) {
        match self.get_erased(element, property) {
            Ok(current) if current == *value => {}
            Ok(_) => {
                let result = self.run(Mutation::SetLocal {
                    element,
                    property,
                    value: value.clone(),
                });
                if let Err(error) = result {
                    self.report(error);
                }
            }
            // The endpoint went away; the binding is disposed with it.
            Err(_) => {}
        }
    }

    /// Disposes a binding. Returns `false` if it was already gone.
    pub fn unbind(&self, id: BindingId) -> bool {
        let mut core = self.core.borrow_mut();
        let Some(record) = core.bindings.remove(id) else {
            return false;
        };
        let handlers: Vec<_> = record
            .subscriptions()
            .filter_map(|subscription| core.subscriptions.remove(subscription))
            .collect();
        drop(core);
        drop(handlers);
        true
    }

    /// Number of live bindings.
    #[must_use]
    pub fn binding_count(&self) -> usize {
        self.core.borrow().bindings.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;
    use std::rc::Rc;
    use trellis_property::{ElementKind, PropertyMetadataBuilder, PropertyRegistry};

    static BOX: ElementKind = ElementKind::new("BindingBox");

    fn setup() -> (ElementTree, Property<String>) {
        let registry: &'static PropertyRegistry = Box::leak(Box::new(PropertyRegistry::new()));
        let text = registry
            .register(&BOX, "Text", PropertyMetadataBuilder::new(String::new()).build())
            .unwrap();
        (ElementTree::with_registry(registry), text)
    }

    fn count_changes(tree: &ElementTree, element: ElementId, property: Property<String>) -> Rc<Cell<usize>> {
        let count = Rc::new(Cell::new(0));
        let counter = count.clone();
        tree.observe_with_history(element, property, move |_, old, new| {
            if old != new {
                counter.set(counter.get() + 1);
            }
        })
        .unwrap();
        count
    }

    #[test]
    fn one_way_pushes_initial_and_later_values() {
        let (tree, text) = setup();
        let source = tree.create(&BOX);
        let target = tree.create(&BOX);
        tree.set_local(source, text, "a".into()).unwrap();
        tree.bind(source, text, target, text, BindingMode::OneWay)
            .unwrap();
        assert_eq!(tree.get(target, text).unwrap(), "a");
        tree.set_local(source, text, "b".into()).unwrap();
        assert_eq!(tree.get(target, text).unwrap(), "b");
        tree.set_local(target, text, "c".into()).unwrap();
        assert_eq!(tree.get(source, text).unwrap(), "b");
    }

    #[test]
    fn two_way_round_trip_settles() {
        let (tree, text) = setup();
        let source = tree.create(&BOX);
        let target = tree.create(&BOX);
        tree.bind(source, text, target, text, BindingMode::TwoWay)
            .unwrap();
        let source_changes = count_changes(&tree, source, text);
        let target_changes = count_changes(&tree, target, text);

        tree.set_local(target, text, "x".into()).unwrap();
        assert_eq!(tree.get(source, text).unwrap(), "x");
        assert_eq!(source_changes.get(), 1);
        assert_eq!(target_changes.get(), 1);
        assert_eq!(tree.queued(), 0);
    }

    #[test]
    fn destroying_an_endpoint_disposes_the_binding() {
        let (tree, text) = setup();
        let source = tree.create(&BOX);
        let target = tree.create(&BOX);
        let id = tree
            .bind(source, text, target, text, BindingMode::TwoWay)
            .unwrap();
        assert_eq!(tree.binding_count(), 1);
        tree.destroy(target).unwrap();
        assert_eq!(tree.binding_count(), 0);
        assert_eq!(tree.subscription_count(), 0);
        tree.set_local(source, text, "still fine".into()).unwrap();
        assert!(!tree.unbind(id));
    }

    #[test]
    fn unbind_stops_forwarding() {
        let (tree, text) = setup();
        let source = tree.create(&BOX);
        let target = tree.create(&BOX);
        let id = tree
            .bind(source, text, target, text, BindingMode::OneWay)
            .unwrap();
        assert!(tree.unbind(id));
        tree.set_local(source, text, "late".into()).unwrap();
        assert_eq!(tree.get(target, text).unwrap(), "");
    }
}
