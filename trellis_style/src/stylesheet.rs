// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rule-based style selection.
//!
//! [`Styles`] is a mutable, ordered collection of [`StyleRule`]s. Each rule
//! pairs a [`Selector`] with a [`Style`]. The embedder supplies a
//! [`SelectorInputs`] snapshot per element and decides when to re-match.

use core::fmt;

use trellis_property::{ErasedValue, PropertyId};

use crate::selector::{Selector, SelectorInputs, Specificity};
use crate::style::Style;

/// Identifies a rule in a [`Styles`] collection.
///
/// Ids are handed out in increasing order and never reused, so they double
/// as declaration order.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RuleId(u32);

impl RuleId {
    /// The declaration index.
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RuleId({})", self.0)
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rule #{}", self.0)
    }
}

/// Precedence of a styled value: specificity first, then declaration order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StyleRank {
    /// Selector specificity.
    pub specificity: Specificity,
    /// The declaring rule, later rules winning ties.
    pub rule: RuleId,
}

/// A single rule in a [`Styles`] collection.
#[derive(Clone, Debug)]
pub struct StyleRule {
    id: RuleId,
    selector: Selector,
    style: Style,
}

impl StyleRule {
    /// The rule's id.
    #[must_use]
    pub fn id(&self) -> RuleId {
        self.id
    }

    /// The rule's selector.
    #[must_use]
    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    /// The rule's setters.
    #[must_use]
    pub fn style(&self) -> &Style {
        &self.style
    }

    /// Rank of the values this rule supplies.
    #[must_use]
    pub fn rank(&self) -> StyleRank {
        StyleRank {
            specificity: self.selector.specificity(),
            rule: self.id,
        }
    }
}

/// An ordered, mutable set of style rules.
///
/// # Example
///
/// ```rust
/// use trellis_property::{ElementKind, PropertyMetadataBuilder, PropertyRegistry};
/// use trellis_style::{Selector, SelectorInputs, StyleBuilder, Styles};
///
/// static CONTROL: ElementKind = ElementKind::new("Control");
///
/// let registry = PropertyRegistry::new();
/// let width = registry
///     .register(&CONTROL, "Width", PropertyMetadataBuilder::new(0.0_f64).build())
///     .unwrap();
///
/// let mut styles = Styles::new();
/// styles.add_rule(Selector::of_type(&CONTROL), StyleBuilder::new().set(width, 1.0).build());
/// let wide = styles.add_rule(
///     Selector::of_type(&CONTROL).class("wide"),
///     StyleBuilder::new().set(width, 9.0).build(),
/// );
///
/// let classes = vec![String::from("wide")];
/// let inputs = SelectorInputs::new(&CONTROL, &classes);
/// assert_eq!(styles.best_value(&inputs, width.id()).and_then(|v| v.get()), Some(9.0));
///
/// styles.remove_rule(wide);
/// assert_eq!(styles.best_value(&inputs, width.id()).and_then(|v| v.get()), Some(1.0));
/// ```
#[derive(Clone, Debug, Default)]
pub struct Styles {
    /// Sorted by id, which is declaration order.
    rules: Vec<StyleRule>,
    next_id: u32,
}

impl Styles {
    /// Creates an empty rule set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a rule, returning its id.
    pub fn add_rule(&mut self, selector: Selector, style: Style) -> RuleId {
        let id = self.reserve_id();
        self.insert_rule(id, selector, style);
        id
    }

    /// Hands out the id the next declared rule will carry, without adding a
    /// rule yet. Pair with [`insert_rule`](Self::insert_rule).
    pub fn reserve_id(&mut self) -> RuleId {
        let id = RuleId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        id
    }

    /// Inserts a rule under an id from [`reserve_id`](Self::reserve_id).
    ///
    /// Rules stay ordered by id whatever order reserved ids are inserted in.
    /// Returns `false`, leaving the set unchanged, if `id` is already in use.
    pub fn insert_rule(&mut self, id: RuleId, selector: Selector, style: Style) -> bool {
        match self.rules.binary_search_by_key(&id, |rule| rule.id) {
            Ok(_) => false,
            Err(idx) => {
                self.rules.insert(
                    idx,
                    StyleRule {
                        id,
                        selector,
                        style,
                    },
                );
                true
            }
        }
    }

    /// Removes a rule, returning it.
    pub fn remove_rule(&mut self, id: RuleId) -> Option<StyleRule> {
        let idx = self.rules.binary_search_by_key(&id, |rule| rule.id).ok()?;
        Some(self.rules.remove(idx))
    }

    /// Looks up a rule.
    #[must_use]
    pub fn get(&self, id: RuleId) -> Option<&StyleRule> {
        self.rules
            .binary_search_by_key(&id, |rule| rule.id)
            .ok()
            .map(|idx| &self.rules[idx])
    }

    /// Number of rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns `true` if there are no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rules in declaration order.
    pub fn rules(&self) -> impl Iterator<Item = &StyleRule> + '_ {
        self.rules.iter()
    }

    /// Rules matching `inputs`, in declaration order.
    pub fn matching<'a>(
        &'a self,
        inputs: &SelectorInputs<'_>,
    ) -> impl Iterator<Item = &'a StyleRule> {
        self.rules.iter().filter(|rule| rule.selector.matches(inputs))
    }

    /// Returns `true` if any rule's selector mentions the class tag `tag`.
    #[must_use]
    pub fn depends_on_class(&self, tag: &str) -> bool {
        self.rules.iter().any(|rule| rule.selector.mentions_class(tag))
    }

    /// The winning styled value for one property.
    #[must_use]
    pub fn best_value(&self, inputs: &SelectorInputs<'_>, id: PropertyId) -> Option<&ErasedValue> {
        self.matching(inputs)
            .filter_map(|rule| Some((rule.rank(), rule.style.setter(id)?)))
            .max_by_key(|(rank, _)| *rank)
            .map(|(_, setter)| setter.value())
    }
}
