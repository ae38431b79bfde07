// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Selector inputs and selector predicates for style matching.
//!
//! Selectors are single-element predicates over a [`SelectorInputs`]
//! snapshot: an optional type test plus a set of required class tags.
//! Combinators are left to the embedder.

use core::fmt;

use trellis_property::ElementKind;

/// Prefix that marks a class tag as a pseudo-class.
pub const PSEUDO_PREFIX: char = ':';

/// Returns `true` if `tag` names a pseudo-class such as `:empty`.
#[must_use]
pub fn is_pseudo_class(tag: &str) -> bool {
    tag.starts_with(PSEUDO_PREFIX)
}

/// Bucketed selector specificity: `(pseudos, classes, type)`.
///
/// The fields are ordered highest-weight-first so that derived `Ord` gives
/// CSS-like lexicographic ordering: pseudo-class count outranks class count,
/// which outranks the presence of a type test.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Specificity(pub u32, pub u32, pub u32);

/// A borrowed snapshot of one element's selector-relevant state.
#[derive(Copy, Clone, Debug)]
pub struct SelectorInputs<'a> {
    /// The element's kind.
    pub kind: &'static ElementKind,
    /// The element's class tags, pseudo-classes included, in any order.
    pub classes: &'a [String],
}

impl<'a> SelectorInputs<'a> {
    /// Bundles a kind and its class tags.
    #[must_use]
    pub fn new(kind: &'static ElementKind, classes: &'a [String]) -> Self {
        Self { kind, classes }
    }

    fn has_class(&self, tag: &str) -> bool {
        self.classes.iter().any(|class| class == tag)
    }
}

/// A predicate over [`SelectorInputs`].
///
/// # Example
///
/// ```rust
/// use trellis_property::ElementKind;
/// use trellis_style::{Selector, SelectorInputs, Specificity};
///
/// static CONTROL: ElementKind = ElementKind::new("Control");
/// static LIST: ElementKind = ElementKind::derived("List", &CONTROL);
///
/// let selector = Selector::of_type(&CONTROL).class(":empty");
/// let classes = vec![String::from(":empty")];
///
/// assert!(selector.matches(&SelectorInputs::new(&LIST, &classes)));
/// assert!(!selector.matches(&SelectorInputs::new(&LIST, &[])));
/// assert_eq!(selector.specificity(), Specificity(1, 0, 1));
/// ```
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Selector {
    kind: Option<&'static ElementKind>,
    /// Sorted and deduplicated.
    classes: Vec<String>,
}

impl Selector {
    /// Matches every element.
    #[must_use]
    pub fn any() -> Self {
        Self::default()
    }

    /// Matches elements whose kind is `kind` or derives from it.
    #[must_use]
    pub fn of_type(kind: &'static ElementKind) -> Self {
        Self {
            kind: Some(kind),
            classes: Vec::new(),
        }
    }

    /// Additionally requires the class tag `tag`.
    ///
    /// Tags starting with `:` are pseudo-classes.
    #[must_use]
    pub fn class(mut self, tag: impl Into<String>) -> Self {
        let tag = tag.into();
        if let Err(idx) = self.classes.binary_search(&tag) {
            self.classes.insert(idx, tag);
        }
        self
    }

    /// The required kind, if any.
    #[must_use]
    pub fn kind(&self) -> Option<&'static ElementKind> {
        self.kind
    }

    /// The required class tags, sorted.
    #[must_use]
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Returns `true` if the class tag `tag` affects whether this selector matches.
    #[must_use]
    pub fn mentions_class(&self, tag: &str) -> bool {
        self.classes.iter().any(|class| class == tag)
    }

    /// Returns `true` if this selector matches the given inputs.
    #[must_use]
    pub fn matches(&self, inputs: &SelectorInputs<'_>) -> bool {
        if let Some(required) = self.kind
            && !inputs.kind.is_a(required)
        {
            return false;
        }
        self.classes.iter().all(|class| inputs.has_class(class))
    }

    /// Returns a bucketed specificity score.
    #[must_use]
    pub fn specificity(&self) -> Specificity {
        let pseudos = self.classes.iter().filter(|c| is_pseudo_class(c)).count();
        let classes = self.classes.len() - pseudos;
        Specificity(
            u32::try_from(pseudos).unwrap_or(u32::MAX),
            u32::try_from(classes).unwrap_or(u32::MAX),
            u32::from(self.kind.is_some()),
        )
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Selector({self})")
    }
}

/// Formats in a CSS-like shorthand: `List.primary:empty`, or `*` for any.
impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            Some(kind) => f.write_str(kind.name())?,
            None if self.classes.is_empty() => f.write_str("*")?,
            None => {}
        }
        for class in &self.classes {
            if is_pseudo_class(class) {
                f.write_str(class)?;
            } else {
                write!(f, ".{class}")?;
            }
        }
        Ok(())
    }
}
