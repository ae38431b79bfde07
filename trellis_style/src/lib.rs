// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Trellis Style: selectors, style rules and the styled value layer.
//!
//! This crate answers "which styled value applies?" for an element described
//! by a [`SelectorInputs`] snapshot. It knows nothing about element trees or
//! change notification; `trellis_element` decides when to re-match and turns
//! the results into effective values.
//!
//! ## Core Concepts
//!
//! - [`Selector`]: a single-element predicate. A type test matches the kind
//!   and everything derived from it. Class tests require tags, and tags
//!   starting with `:` are pseudo-classes.
//! - [`Specificity`]: `(pseudos, classes, type)`, compared lexicographically.
//! - [`Style`]: a shared list of setters, each a literal or a template
//!   ([`SetterValue`]).
//! - [`Styles`]: the mutable rule set. [`RuleId`]s are declaration order.
//! - [`StyleRank`]: specificity, then declaration order. The highest rank wins.
//! - [`AppliedStyles`]: one element's applied styled values, ranked.
//!
//! ## Example
//!
//! ```rust
//! use trellis_property::{ElementKind, PropertyMetadataBuilder, PropertyRegistry};
//! use trellis_style::{AppliedStyles, Selector, SelectorInputs, StyleBuilder, Styles};
//!
//! static ITEMS: ElementKind = ElementKind::new("ItemsControl");
//!
//! let registry = PropertyRegistry::new();
//! let opacity = registry
//!     .register(&ITEMS, "Opacity", PropertyMetadataBuilder::new(1.0_f64).build())
//!     .unwrap();
//!
//! let mut styles = Styles::new();
//! styles.add_rule(
//!     Selector::of_type(&ITEMS).class(":empty"),
//!     StyleBuilder::new().set(opacity, 0.5).build(),
//! );
//!
//! let classes = vec![String::from(":empty")];
//! let inputs = SelectorInputs::new(&ITEMS, &classes);
//!
//! let mut applied = AppliedStyles::default();
//! for rule in styles.matching(&inputs) {
//!     for (property, setter) in rule.style().setters() {
//!         applied.set_styled(property, rule.rank(), setter.value().clone());
//!     }
//! }
//! assert_eq!(applied.value(opacity.id()).and_then(|v| v.get()), Some(0.5));
//! ```

mod applied;
mod selector;
mod style;
mod stylesheet;

pub use applied::{AppliedEntry, AppliedStyles};
pub use selector::{PSEUDO_PREFIX, Selector, SelectorInputs, Specificity, is_pseudo_class};
pub use style::{SetterValue, Style, StyleBuilder};
pub use stylesheet::{RuleId, StyleRank, StyleRule, Styles};
