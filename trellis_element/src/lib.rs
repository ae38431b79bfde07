// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Trellis Element: a reactive element tree with styled, inherited and bound
//! property values.
//!
//! Elements live in an [`ElementTree`] and are addressed by generational
//! [`ElementId`]s. Each element has a kind, an ordered set of class tags, a
//! parent and children, and sparse property values.
//!
//! ## Effective values
//!
//! | Precedence | Source |
//! |------------|--------|
//! | 1 | local value ([`ElementTree::set_local`]) |
//! | 2 | winning setter of a matching style rule ([`ElementTree::add_rule`]) |
//! | 3 | own value of the nearest ancestor, for inheritable properties |
//! | 4 | per-instance default, else the registered default |
//!
//! Styled rules compete by specificity, then declaration order. Only elements
//! under an [attached](ElementTree::attach) root are styled.
//!
//! ## Change notification
//!
//! Observers ([`ElementTree::observe`], [`ElementTree::observe_with_history`])
//! see each change of an effective value exactly once, synchronously, in
//! mutation order. Mutations made from inside a handler are queued and
//! replayed after the current delivery.
//!
//! ## Templates and bindings
//!
//! A [`ControlTemplate`] assigned to a template property is instantiated
//! into content under its host. Bindings made with
//! [`TemplateContext::bind_to_host`] forward host values into the content
//! and are disposed with it.
//!
//! ## Example
//!
//! ```rust
//! use trellis_element::{EMPTY, ElementTree, ObservableList, controls};
//!
//! let tree = ElementTree::new();
//! let props = controls::ControlProperties::for_registry(tree.registry()).unwrap();
//! let list = ObservableList::new();
//!
//! let items = controls::create_items_control(&tree).unwrap();
//! tree.set_local(items, props.items, Some(list.clone().into())).unwrap();
//! assert!(tree.has_class(items, EMPTY).unwrap());
//!
//! list.push("first");
//! assert!(!tree.has_class(items, EMPTY).unwrap());
//! ```
//!
//! This crate is `std`-only: trees are single-threaded and use `Rc`.

mod binding;
mod classes;
pub mod controls;
mod element;
mod engine;
mod error;
mod id;
mod items;
mod notify;
mod template;
mod tree;

pub use binding::BindingMode;
pub use classes::{ClassChange, EMPTY};
pub use element::ElementFlags;
pub use error::TreeError;
pub use id::{BindingId, ElementId, SubscriptionId};
pub use items::{CountCallback, CountSubscription, Items, ItemsSource, ObservableList};
pub use template::{ContentFactory, ControlTemplate, TemplateContext};
pub use tree::{ElementTree, ErrorSink, ValueSource, WeakTree};
