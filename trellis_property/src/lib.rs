// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Trellis Property: the vocabulary of the reactive property system.
//!
//! This crate defines what a property *is*. Value resolution across styles,
//! inheritance and change notification live in `trellis_element`, and style
//! rules in `trellis_style`.
//!
//! ## Core Concepts
//!
//! - [`ElementKind`] is a runtime element type with single inheritance. Kinds
//!   own properties and are matched by type selectors.
//! - [`PropertyRegistry`] maps `(owner kind, name)` to a registration holding
//!   the value type, default, inheritance flag and coercion. It is
//!   append-only; [`PropertyRegistry::global`] is the shared per-thread table.
//! - [`Property<T>`] is a `Copy` typed handle; [`PropertyId`] is its erased form.
//! - [`ErasedValue`] carries values through the untyped plumbing.
//! - [`PropertyStore`] is the sparse per-element store for local values and
//!   per-instance defaults.
//!
//! ## Defaults
//!
//! | Builder | Evaluated | Shared |
//! |---------|-----------|--------|
//! | [`PropertyMetadataBuilder::new`] | at registration | yes |
//! | [`PropertyMetadataBuilder::lazy`] | on first use, cached | yes |
//! | [`PropertyMetadataBuilder::per_instance`] | per element | no |
//!
//! ## Quick Start
//!
//! ```rust
//! use trellis_property::{
//!     ElementKind, PropertyMetadataBuilder, PropertyRegistry, PropertyStore,
//! };
//!
//! static CONTROL: ElementKind = ElementKind::new("Control");
//! static BUTTON: ElementKind = ElementKind::derived("Button", &CONTROL);
//!
//! let registry = PropertyRegistry::new();
//! let font_size = registry
//!     .register(
//!         &CONTROL,
//!         "FontSize",
//!         PropertyMetadataBuilder::new(12.0_f64)
//!             .inherits(true)
//!             .coerce(|size| size.max(1.0))
//!             .build(),
//!     )
//!     .unwrap();
//!
//! // Buttons see the property declared on their base kind.
//! assert_eq!(registry.find(&BUTTON, "FontSize"), Some(font_size.id()));
//!
//! let mut store = PropertyStore::new(0_u32);
//! store.set_local(font_size, 16.0);
//! assert_eq!(store.get_effective_local(font_size, &registry), Some(16.0));
//! ```

mod error;
mod id;
mod kind;
mod metadata;
mod registry;
mod store;
mod value;

pub use error::PropertyError;
pub use id::{Property, PropertyId};
pub use kind::ElementKind;
pub use metadata::{
    CoerceValueCallback, DefaultFactory, DefaultValue, PropertyMetadata, PropertyMetadataBuilder,
};
pub use registry::{MAX_PROPERTIES, PropertyRegistration, PropertyRegistry};
pub use store::PropertyStore;
pub use value::{ErasedValue, PropertyValue};
