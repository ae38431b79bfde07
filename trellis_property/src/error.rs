// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::id::PropertyId;

/// Errors raised by the property registry and by typed property access.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PropertyError {
    /// `(owner, name)` was registered before.
    #[error("property `{owner}.{name}` is already registered")]
    DuplicateRegistration {
        /// Owner kind name.
        owner: &'static str,
        /// Property name.
        name: &'static str,
    },
    /// The property is not registered for the element's kind chain.
    #[error("property `{property}` is not registered for element type `{element_type}`")]
    UnknownProperty {
        /// Property name, or the id when no registration exists.
        property: String,
        /// The element kind that was asked.
        element_type: &'static str,
    },
    /// A value of the wrong type was supplied for the property.
    #[error("property `{property}` holds `{expected}`, got `{found}`")]
    TypeMismatch {
        /// Property name.
        property: &'static str,
        /// Registered value type.
        expected: &'static str,
        /// Supplied value type.
        found: &'static str,
    },
    /// All property ids are in use.
    #[error("property registry is full ({max} registrations)")]
    RegistryFull {
        /// The registration limit.
        max: usize,
    },
}

impl PropertyError {
    pub(crate) fn unregistered(id: PropertyId, element_type: &'static str) -> Self {
        Self::UnknownProperty {
            property: format!("{id:?}"),
            element_type,
        }
    }
}
