// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Item sources projected by items controls.
//!
//! A source reports its item count and may support count notification.
//! Sources without notification are evaluated once, when assigned.

use core::cell::RefCell;
use core::fmt;
use std::rc::{Rc, Weak};

/// Callback receiving a source's new item count.
pub type CountCallback = Box<dyn Fn(usize)>;

/// A collection an items control can project.
pub trait Items {
    /// Current number of items.
    fn count(&self) -> usize;

    /// Registers `callback` to run whenever the count changes.
    ///
    /// Returns `None` if the source cannot notify. The callback stays
    /// registered until the returned handle is dropped.
    fn subscribe_count(&self, _callback: CountCallback) -> Option<CountSubscription> {
        None
    }
}

impl<T> Items for Vec<T> {
    fn count(&self) -> usize {
        self.len()
    }
}

/// A shared handle to an item source. Equality is identity.
#[derive(Clone)]
pub struct ItemsSource(Rc<dyn Items>);

impl ItemsSource {
    /// Wraps a source.
    pub fn new(items: impl Items + 'static) -> Self {
        Self(Rc::new(items))
    }

    /// Current number of items.
    #[must_use]
    pub fn count(&self) -> usize {
        self.0.count()
    }

    /// See [`Items::subscribe_count`].
    pub fn subscribe_count(&self, callback: CountCallback) -> Option<CountSubscription> {
        self.0.subscribe_count(callback)
    }
}

impl<T: 'static> From<ObservableList<T>> for ItemsSource {
    fn from(list: ObservableList<T>) -> Self {
        Self::new(list)
    }
}

impl PartialEq for ItemsSource {
    fn eq(&self, other: &Self) -> bool {
        core::ptr::addr_eq(Rc::as_ptr(&self.0), Rc::as_ptr(&other.0))
    }
}

impl fmt::Debug for ItemsSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemsSource")
            .field("count", &self.count())
            .finish_non_exhaustive()
    }
}

/// Keeps a count callback registered. Dropping it unregisters the callback.
pub struct CountSubscription {
    unsubscribe: Option<Box<dyn FnOnce()>>,
}

impl CountSubscription {
    /// A handle that runs `unsubscribe` when dropped.
    pub fn new(unsubscribe: impl FnOnce() + 'static) -> Self {
        Self {
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }
}

impl Drop for CountSubscription {
    fn drop(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl fmt::Debug for CountSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CountSubscription")
            .field("active", &self.unsubscribe.is_some())
            .finish()
    }
}

struct ListState<T> {
    items: Vec<T>,
    next: u64,
    listeners: Vec<(u64, Rc<dyn Fn(usize)>)>,
}

/// A list that notifies count listeners when items are added or removed.
///
/// Clones share the same list.
pub struct ObservableList<T> {
    state: Rc<RefCell<ListState<T>>>,
}

impl<T> Clone for ObservableList<T> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

impl<T> Default for ObservableList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ObservableList<T> {
    /// An empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::from_vec(Vec::new())
    }

    /// A list holding `items`.
    #[must_use]
    pub fn from_vec(items: Vec<T>) -> Self {
        Self {
            state: Rc::new(RefCell::new(ListState {
                items,
                next: 0,
                listeners: Vec::new(),
            })),
        }
    }

    /// Number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.borrow().items.len()
    }

    /// Returns `true` if the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A clone of the item at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<T>
    where
        T: Clone,
    {
        self.state.borrow().items.get(index).cloned()
    }

    /// Appends an item.
    pub fn push(&self, item: T) {
        self.mutate(|items| items.push(item));
    }

    /// Inserts an item at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index > len`.
    pub fn insert(&self, index: usize, item: T) {
        self.mutate(|items| items.insert(index, item));
    }

    /// Removes and returns the item at `index`, if there is one.
    pub fn remove(&self, index: usize) -> Option<T> {
        self.mutate(|items| (index < items.len()).then(|| items.remove(index)))
    }

    /// Removes every item.
    pub fn clear(&self) {
        self.mutate(Vec::clear);
    }

    fn mutate<R>(&self, f: impl FnOnce(&mut Vec<T>) -> R) -> R {
        let (result, before, after, listeners) = {
            let mut state = self.state.borrow_mut();
            let before = state.items.len();
            let result = f(&mut state.items);
            let after = state.items.len();
            let listeners: Vec<_> = state.listeners.iter().map(|(_, l)| l.clone()).collect();
            (result, before, after, listeners)
        };
        if before != after {
            // Unborrowed, so listeners may read or mutate the list.
            for listener in listeners {
                listener(after);
            }
        }
        result
    }
}

impl<T: 'static> Items for ObservableList<T> {
    fn count(&self) -> usize {
        self.len()
    }

    fn subscribe_count(&self, callback: CountCallback) -> Option<CountSubscription> {
        let key = {
            let mut state = self.state.borrow_mut();
            state.next += 1;
            let key = state.next;
            state.listeners.push((key, Rc::from(callback)));
            key
        };
        let weak: Weak<RefCell<ListState<T>>> = Rc::downgrade(&self.state);
        Some(CountSubscription::new(move || {
            if let Some(state) = weak.upgrade() {
                let removed = {
                    let mut state = state.borrow_mut();
                    let idx = state.listeners.iter().position(|(k, _)| *k == key);
                    idx.map(|idx| state.listeners.remove(idx))
                };
                drop(removed);
            }
        }))
    }
}

impl<T: fmt::Debug> fmt::Debug for ObservableList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.state.try_borrow() {
            Ok(state) => f
                .debug_struct("ObservableList")
                .field("items", &state.items)
                .field("listeners", &state.listeners.len())
                .finish(),
            Err(_) => f.write_str("ObservableList(<busy>)"),
        }
    }
}
