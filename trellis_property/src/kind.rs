// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Runtime element types.

use core::fmt;
use core::iter;

/// A runtime element type with single inheritance.
///
/// Kinds are declared as `static` items and referenced by `&'static` pointer.
/// They own properties, are matched by type selectors, and determine which
/// properties an element may carry.
///
/// Two kinds are the same kind when their names are equal, so each name must
/// be declared once.
///
/// # Example
///
/// ```rust
/// use trellis_property::ElementKind;
///
/// static CONTROL: ElementKind = ElementKind::new("Control");
/// static BUTTON: ElementKind = ElementKind::derived("Button", &CONTROL);
///
/// assert!(BUTTON.is_a(&CONTROL));
/// assert!(!CONTROL.is_a(&BUTTON));
///
/// let chain: Vec<_> = BUTTON.ancestry().map(|k| k.name()).collect();
/// assert_eq!(chain, ["Button", "Control"]);
/// ```
pub struct ElementKind {
    name: &'static str,
    base: Option<&'static ElementKind>,
}

impl ElementKind {
    /// Declares a root kind.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self { name, base: None }
    }

    /// Declares a kind deriving from `base`.
    #[must_use]
    pub const fn derived(name: &'static str, base: &'static Self) -> Self {
        Self {
            name,
            base: Some(base),
        }
    }

    /// Returns the kind's name.
    #[must_use]
    #[inline]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the direct base kind, if any.
    #[must_use]
    #[inline]
    pub const fn base(&self) -> Option<&'static Self> {
        self.base
    }

    /// Iterates this kind and its bases, most-derived first.
    pub fn ancestry(&self) -> impl Iterator<Item = &Self> + '_ {
        iter::successors(Some(self), |kind| kind.base)
    }

    /// Returns `true` if this kind is `other` or derives from it.
    #[must_use]
    pub fn is_a(&self, other: &Self) -> bool {
        self.ancestry().any(|kind| kind == other)
    }

    /// Number of base kinds between this kind and its root.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.ancestry().count() - 1
    }
}

impl PartialEq for ElementKind {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for ElementKind {}

impl fmt::Debug for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.base {
            Some(base) => write!(f, "ElementKind({} : {})", self.name, base.name),
            None => write!(f, "ElementKind({})", self.name),
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
