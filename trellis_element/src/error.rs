// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use trellis_property::PropertyError;
use trellis_style::RuleId;

use crate::id::ElementId;

/// Errors raised by [`ElementTree`](crate::ElementTree) operations.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    /// A registry or typed-access failure.
    #[error(transparent)]
    Property(#[from] PropertyError),
    /// The id is stale or was never issued by this tree.
    #[error("element {0} does not exist")]
    ElementNotFound(ElementId),
    /// Appending would make an element its own ancestor.
    #[error("appending {child} under {parent} would create a cycle")]
    Cycle {
        /// The would-be parent.
        parent: ElementId,
        /// The would-be child.
        child: ElementId,
    },
    /// The child already has a parent.
    #[error("{child} is already a child of {parent}")]
    AlreadyParented {
        /// The element being appended.
        child: ElementId,
        /// Its current parent.
        parent: ElementId,
    },
    /// A content factory failed while instantiating a template.
    #[error("template instantiation for {host} failed: {message}")]
    Template {
        /// The host whose template failed.
        host: ElementId,
        /// What went wrong.
        message: String,
    },
    /// A style rule could not be applied to an element and was rolled back for it.
    #[error("{rule} could not be applied to {element}: {source}")]
    StyleApplication {
        /// The rolled back rule.
        rule: RuleId,
        /// The element it was matched against.
        element: ElementId,
        /// Why a setter was rejected.
        source: PropertyError,
    },
}

impl TreeError {
    /// Convenience constructor for [`TreeError::Template`].
    pub fn template(host: ElementId, message: impl Into<String>) -> Self {
        Self::Template {
            host,
            message: message.into(),
        }
    }
}
