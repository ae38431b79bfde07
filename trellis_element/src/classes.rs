// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Element class tags.

use crate::id::ElementId;

/// Pseudo-class carried by items controls whose source has no items.
pub const EMPTY: &str = ":empty";

/// An insertion-ordered, duplicate-free set of class tags.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Classes {
    tags: Vec<String>,
}

impl Classes {
    /// Returns `true` if `tag` is present.
    #[must_use]
    pub(crate) fn contains(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Adds `tag`. Returns `false` if it was already present.
    pub(crate) fn insert(&mut self, tag: &str) -> bool {
        if self.contains(tag) {
            return false;
        }
        self.tags.push(tag.to_owned());
        true
    }

    /// Removes `tag`. Returns `false` if it was absent.
    pub(crate) fn remove(&mut self, tag: &str) -> bool {
        match self.tags.iter().position(|t| t == tag) {
            Some(idx) => {
                self.tags.remove(idx);
                true
            }
            None => false,
        }
    }

    /// The tags in insertion order.
    #[must_use]
    pub(crate) fn as_slice(&self) -> &[String] {
        &self.tags
    }

    /// Number of tags.
    #[must_use]
    pub(crate) fn len(&self) -> usize {
        self.tags.len()
    }

    /// Returns `true` if there are no tags.
    #[must_use]
    pub(crate) fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

/// A class tag added to or removed from an element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassChange {
    /// The element whose class set changed.
    pub element: ElementId,
    /// The tag.
    pub class: String,
    /// `true` if added, `false` if removed.
    pub added: bool,
}
