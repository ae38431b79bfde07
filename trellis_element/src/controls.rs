// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Built-in control kinds, their properties and the items control.
//!
//! The items control keeps the [`EMPTY`](crate::EMPTY) pseudo-class in step
//! with its item source: it is present while the source is missing or has no
//! items. Styles select on it like on any other class.

use trellis_property::{
    ElementKind, Property, PropertyError, PropertyMetadata, PropertyMetadataBuilder,
    PropertyRegistry, PropertyValue,
};

use crate::classes::EMPTY;
use crate::error::TreeError;
use crate::id::ElementId;
use crate::items::{CountSubscription, ItemsSource};
use crate::template::{ControlTemplate, TemplateContext};
use crate::tree::ElementTree;

/// Base of all controls.
pub static CONTROL: ElementKind = ElementKind::new("Control");
/// A control whose content comes from a template.
pub static TEMPLATED_CONTROL: ElementKind = ElementKind::derived("TemplatedControl", &CONTROL);
/// A control projecting an item source.
pub static ITEMS_CONTROL: ElementKind = ElementKind::derived("ItemsControl", &TEMPLATED_CONTROL);
/// Hosts the items panel inside an items control's template.
pub static ITEMS_PRESENTER: ElementKind = ElementKind::derived("ItemsPresenter", &TEMPLATED_CONTROL);
/// A control laying out children.
pub static PANEL: ElementKind = ElementKind::derived("Panel", &CONTROL);
/// A panel stacking its children.
pub static STACK_PANEL: ElementKind = ElementKind::derived("StackPanel", &PANEL);

/// Template part name of an items control's presenter.
pub const ITEMS_PRESENTER_PART: &str = "itemsPresenter";

/// Handles to the built-in control properties of one registry.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ControlProperties {
    /// `TemplatedControl.Template`.
    pub template: Property<Option<ControlTemplate>>,
    /// `ItemsControl.Items`.
    pub items: Property<Option<ItemsSource>>,
    /// `ItemsControl.ItemsPanel`. Defaults to a shared vertical stack panel template.
    pub items_panel: Property<ControlTemplate>,
}

impl ControlProperties {
    /// Looks up the control properties in `registry`, registering them on
    /// first use.
    pub fn for_registry(registry: &PropertyRegistry) -> Result<Self, PropertyError> {
        Ok(Self {
            template: find_or_register(registry, &TEMPLATED_CONTROL, "Template", || {
                PropertyMetadataBuilder::new(None).build()
            })?,
            items: find_or_register(registry, &ITEMS_CONTROL, "Items", || {
                PropertyMetadataBuilder::new(None).build()
            })?,
            items_panel: find_or_register(registry, &ITEMS_CONTROL, "ItemsPanel", || {
                PropertyMetadataBuilder::lazy(default_panel).build()
            })?,
        })
    }
}

fn find_or_register<T: PropertyValue>(
    registry: &PropertyRegistry,
    owner: &'static ElementKind,
    name: &'static str,
    metadata: impl FnOnce() -> PropertyMetadata<T>,
) -> Result<Property<T>, PropertyError> {
    match registry.find(owner, name) {
        Some(_) => registry.find_typed(owner, name),
        None => registry.register(owner, name, metadata()),
    }
}

fn default_panel() -> ControlTemplate {
    ControlTemplate::new(|cx: &mut TemplateContext<'_>| Ok(cx.create(&STACK_PANEL)))
}

/// Creates an items control.
///
/// Assigning a source evaluates emptiness at once and, if the source can
/// notify, follows its count from then on; the previous source's listener is
/// dropped. When the control's template is applied, the part named
/// [`ITEMS_PRESENTER_PART`] receives the items panel as its template.
pub fn create_items_control(tree: &ElementTree) -> Result<ElementId, TreeError> {
    let props = ControlProperties::for_registry(tree.registry())?;
    let element = tree.create(&ITEMS_CONTROL);

    let weak = tree.downgrade();
    let mut listener: Option<CountSubscription> = None;
    tree.observe_with_history(element, props.items, move |tree, old, new| {
        if old == new && listener.is_some() {
            return;
        }
        listener = None;
        let count = new.as_ref().map_or(0, ItemsSource::count);
        if let Err(error) = tree.set_class(element, EMPTY, count == 0) {
            tree.report(error);
        }
        if let Some(source) = new {
            let weak = weak.clone();
            listener = source.subscribe_count(Box::new(move |count| {
                let Some(tree) = weak.upgrade() else {
                    return;
                };
                if let Err(error) = tree.set_class(element, EMPTY, count == 0) {
                    tree.report(error);
                }
            }));
        }
    })?;

    tree.on_template_applied(element, move |tree, host| {
        let Some(presenter) = tree.find_template_child(host, ITEMS_PRESENTER_PART) else {
            tracing::debug!(%host, "items control template has no presenter");
            return;
        };
        let panel = tree
            .get(host, props.items_panel)
            .and_then(|panel| tree.set_local(presenter, props.template, Some(panel)));
        if let Err(error) = panel {
            tree.report(error);
        }
    })?;
    Ok(element)
}

/// The panel instantiated inside an items control's presenter.
#[must_use]
pub fn items_panel_root(tree: &ElementTree, items_control: ElementId) -> Option<ElementId> {
    let presenter = tree.find_template_child(items_control, ITEMS_PRESENTER_PART)?;
    tree.template_root(presenter).ok().flatten()
}
