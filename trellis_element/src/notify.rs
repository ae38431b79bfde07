// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The change notification bus.
//!
//! Subscriptions are keyed by `(element, topic)`. Delivery is synchronous and
//! runs outside every internal borrow, so handlers may read the tree, mutate
//! it (mutations are queued until the current delivery finishes) and
//! unsubscribe anything, themselves included.

use core::cell::RefCell;
use core::mem;
use std::rc::Rc;

use hashbrown::HashMap;
use smallvec::SmallVec;
use trellis_property::{ErasedValue, Property, PropertyId, PropertyValue};

use crate::classes::ClassChange;
use crate::error::TreeError;
use crate::id::{ElementId, SubscriptionId};
use crate::tree::ElementTree;

/// A change in an element's effective value.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct PropertyChange {
    /// The element whose value changed.
    pub(crate) element: ElementId,
    /// The property.
    pub(crate) property: PropertyId,
    /// Effective value before the change.
    pub(crate) old: ErasedValue,
    /// Effective value after the change.
    pub(crate) new: ErasedValue,
}

#[derive(Clone, Debug)]
pub(crate) enum Event {
    Property(PropertyChange),
    Class(ClassChange),
    TemplateApplied(ElementId),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) enum Topic {
    Property(PropertyId),
    Classes,
    TemplateApplied,
}

impl Event {
    fn key(&self) -> (ElementId, Topic) {
        match self {
            Self::Property(change) => (change.element, Topic::Property(change.property)),
            Self::Class(change) => (change.element, Topic::Classes),
            Self::TemplateApplied(host) => (*host, Topic::TemplateApplied),
        }
    }
}

pub(crate) type Handler = Rc<RefCell<dyn FnMut(&ElementTree, &Event)>>;

struct Entry {
    key: (ElementId, Topic),
    handler: Handler,
}

/// Subscription table of one tree.
#[derive(Default)]
pub(crate) struct Subscriptions {
    next: u64,
    entries: HashMap<SubscriptionId, Entry>,
    by_key: HashMap<(ElementId, Topic), SmallVec<[SubscriptionId; 2]>>,
}

impl Subscriptions {
    pub(crate) fn insert(&mut self, element: ElementId, topic: Topic, handler: Handler) -> SubscriptionId {
        self.next += 1;
        let id = SubscriptionId(self.next);
        let key = (element, topic);
        self.entries.insert(id, Entry { key, handler });
        self.by_key.entry(key).or_default().push(id);
        id
    }

    /// Removes a subscription, handing back its handler so the caller can
    /// drop it outside any borrow.
    pub(crate) fn remove(&mut self, id: SubscriptionId) -> Option<Handler> {
        let entry = self.entries.remove(&id)?;
        if let Some(ids) = self.by_key.get_mut(&entry.key) {
            ids.retain(|other| *other != id);
            if ids.is_empty() {
                self.by_key.remove(&entry.key);
            }
        }
        Some(entry.handler)
    }

    /// Removes every subscription on `element`.
    pub(crate) fn remove_element(&mut self, element: ElementId) -> Vec<Handler> {
        let keys: Vec<_> = self
            .by_key
            .keys()
            .filter(|(el, _)| *el == element)
            .copied()
            .collect();
        let mut removed = Vec::new();
        for key in keys {
            for id in self.by_key.remove(&key).unwrap_or_default() {
                if let Some(entry) = self.entries.remove(&id) {
                    removed.push(entry.handler);
                }
            }
        }
        removed
    }

    fn snapshot(&self, key: (ElementId, Topic)) -> SmallVec<[SubscriptionId; 2]> {
        self.by_key.get(&key).cloned().unwrap_or_default()
    }

    fn handler(&self, id: SubscriptionId) -> Option<Handler> {
        self.entries.get(&id).map(|entry| entry.handler.clone())
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

impl core::fmt::Debug for Subscriptions {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Subscriptions")
            .field("count", &self.entries.len())
            .finish_non_exhaustive()
    }
}

/// Raises the dispatch depth for its lifetime. Mutations requested while
/// the depth is non-zero are queued.
struct DispatchGuard<'a>(&'a ElementTree);

impl<'a> DispatchGuard<'a> {
    fn enter(tree: &'a ElementTree) -> Self {
        tree.core.borrow_mut().dispatch_depth += 1;
        Self(tree)
    }
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        self.0.core.borrow_mut().dispatch_depth -= 1;
    }
}

/// History subscription state.
enum History<T> {
    /// Nothing delivered yet; the next delivery is the synthetic initial one.
    Pending,
    /// Last value delivered.
    Steady(T),
}

impl ElementTree {
    pub(crate) fn dispatch(&self, events: Vec<Event>) {
        if events.is_empty() {
            return;
        }
        let _guard = DispatchGuard::enter(self);
        for event in &events {
            if let Event::Property(change) = event {
                tracing::trace!(element = %change.element, property = ?change.property, "property changed");
            }
            let ids = self.core.borrow().subscriptions.snapshot(event.key());
            for id in ids {
                // Checked per handler so unsubscribing mid-dispatch takes effect at once.
                let Some(handler) = self.core.borrow().subscriptions.handler(id) else {
                    continue;
                };
                self.call(id, &handler, event);
            }
        }
    }

    /// Runs one handler. A delivery that reaches a handler which is still
    /// running is deferred until it returns, keeping its deliveries in order.
    fn call(&self, id: SubscriptionId, handler: &Handler, event: &Event) {
        let Ok(mut running) = handler.try_borrow_mut() else {
            tracing::debug!(subscription = ?id, "handler is running; deferring delivery");
            self.core.borrow_mut().deferred.push_back((id, event.clone()));
            return;
        };
        (*running)(self, event);
        drop(running);
        loop {
            let next = {
                let mut core = self.core.borrow_mut();
                if core.subscriptions.handler(id).is_none() {
                    core.deferred.retain(|(deferred, _)| *deferred != id);
                    return;
                }
                let idx = core.deferred.iter().position(|(deferred, _)| *deferred == id);
                idx.and_then(|idx| core.deferred.remove(idx))
            };
            let Some((_, event)) = next else {
                return;
            };
            if let Ok(mut running) = handler.try_borrow_mut() {
                (*running)(self, &event);
            }
        }
    }

    pub(crate) fn subscribe(
        &self,
        element: ElementId,
        topic: Topic,
        handler: impl FnMut(&Self, &Event) + 'static,
    ) -> SubscriptionId {
        let handler: Handler = Rc::new(RefCell::new(handler));
        self.core
            .borrow_mut()
            .subscriptions
            .insert(element, topic, handler)
    }

    /// Delivers one synthetic event to a single subscription, then replays
    /// whatever it queued.
    fn deliver_initial(&self, id: SubscriptionId, event: &Event) {
        let Some(handler) = self.core.borrow().subscriptions.handler(id) else {
            return;
        };
        {
            let _guard = DispatchGuard::enter(self);
            self.call(id, &handler, event);
        }
        drop(handler);
        self.drain();
    }

    fn initial_change(&self, element: ElementId, property: PropertyId) -> Result<Event, TreeError> {
        let current = self.get_erased(element, property)?;
        Ok(Event::Property(PropertyChange {
            element,
            property,
            old: current.clone(),
            new: current,
        }))
    }

    /// Observes the effective value of `property` on `element`.
    ///
    /// The handler receives the current value immediately, then every new
    /// effective value. Redundant writes are not delivered.
    pub fn observe<T: PropertyValue>(
        &self,
        element: ElementId,
        property: Property<T>,
        mut handler: impl FnMut(&Self, &T) + 'static,
    ) -> Result<SubscriptionId, TreeError> {
        let initial = self.initial_change(element, property.id())?;
        let id = self.subscribe(element, Topic::Property(property.id()), move |tree, event| {
            if let Event::Property(change) = event
                && let Some(new) = change.new.downcast_ref::<T>()
            {
                handler(tree, new);
            }
        });
        self.deliver_initial(id, &initial);
        Ok(id)
    }

    /// Observes `(previous, current)` transitions of `property` on `element`.
    ///
    /// The first delivery happens immediately and is the synthetic
    /// `(current, current)` pair, so a late subscriber still sees the present
    /// state. Every later delivery pairs the previously delivered value with
    /// the new one.
    pub fn observe_with_history<T: PropertyValue>(
        &self,
        element: ElementId,
        property: Property<T>,
        mut handler: impl FnMut(&Self, &T, &T) + 'static,
    ) -> Result<SubscriptionId, TreeError> {
        let initial = self.initial_change(element, property.id())?;
        let mut state = History::<T>::Pending;
        let id = self.subscribe(element, Topic::Property(property.id()), move |tree, event| {
            let Event::Property(change) = event else {
                return;
            };
            let Some(new) = change.new.downcast_ref::<T>() else {
                return;
            };
            let previous = match mem::replace(&mut state, History::Steady(new.clone())) {
                History::Pending => new.clone(),
                History::Steady(last) => last,
            };
            handler(tree, &previous, new);
        });
        self.deliver_initial(id, &initial);
        Ok(id)
    }

    /// Observes class tag additions and removals on `element`.
    pub fn observe_classes(
        &self,
        element: ElementId,
        mut handler: impl FnMut(&Self, &ClassChange) + 'static,
    ) -> Result<SubscriptionId, TreeError> {
        self.check_element(element)?;
        Ok(self.subscribe(element, Topic::Classes, move |tree, event| {
            if let Event::Class(change) = event {
                handler(tree, change);
            }
        }))
    }

    /// Runs `handler` after every successful template instantiation on `host`.
    pub fn on_template_applied(
        &self,
        host: ElementId,
        mut handler: impl FnMut(&Self, ElementId) + 'static,
    ) -> Result<SubscriptionId, TreeError> {
        self.check_element(host)?;
        Ok(self.subscribe(host, Topic::TemplateApplied, move |tree, event| {
            if let Event::TemplateApplied(host) = event {
                handler(tree, *host);
            }
        }))
    }

    /// Cancels a subscription. Returns `false` if it was already gone.
    ///
    /// Safe to call from any handler, including the one being cancelled; a
    /// cancelled handler receives nothing further, even from a delivery that
    /// is already in progress.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let removed = self.core.borrow_mut().subscriptions.remove(id);
        removed.is_some()
    }

    /// Number of live subscriptions, bindings included.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.core.borrow().subscriptions.len()
    }
}
