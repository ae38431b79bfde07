// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Element, subscription and binding identifiers.

use core::fmt;

/// Identifier for an element in an [`ElementTree`](crate::ElementTree).
///
/// A slot index plus a generation counter.
///
/// - On creation, a fresh slot is allocated with generation `1`.
/// - On destroy, the slot is freed; ids pointing at it become stale.
/// - On reuse of a freed slot, its generation is incremented, producing a new,
///   distinct id.
///
/// Stale ids never alias a different live element because the generation
/// must match. Use [`ElementTree::contains`](crate::ElementTree::contains) to
/// check liveness.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ElementId(pub(crate) u32, pub(crate) u32);

impl ElementId {
    pub(crate) const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }

    /// The slot generation.
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.1
    }
}

impl fmt::Debug for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ElementId({}v{})", self.0, self.1)
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.0, self.1)
    }
}

/// Handle to a change subscription. See [`ElementTree::unsubscribe`](crate::ElementTree::unsubscribe).
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(pub(crate) u64);

/// Handle to a live binding. See [`ElementTree::unbind`](crate::ElementTree::unbind).
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BindingId(pub(crate) u64);
