// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The element tree: structure, classes, value resolution and the mutation queue.

use core::cell::RefCell;
use core::fmt;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use trellis_property::{
    ElementKind, ErasedValue, Property, PropertyError, PropertyId, PropertyRegistration,
    PropertyRegistry, PropertyStore, PropertyValue,
};
use trellis_style::{AppliedStyles, RuleId, Selector, Style, Styles};

use crate::binding::Bindings;
use crate::classes::Classes;
use crate::element::{Arena, ElementData, ElementFlags};
use crate::engine::Mutation;
use crate::error::TreeError;
use crate::id::{ElementId, SubscriptionId};
use crate::notify::{Event, Subscriptions};

/// Receives errors that no caller can observe directly.
pub type ErrorSink = Rc<dyn Fn(&TreeError)>;

/// Where an element's effective value comes from.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ValueSource {
    /// A local value set on the element.
    Local,
    /// The winning setter of a matching style rule.
    Styled(RuleId),
    /// The own value of the nearest ancestor that has one.
    Inherited(ElementId),
    /// The per-instance or registered default.
    Default,
}

pub(crate) struct TreeCore {
    pub(crate) registry: &'static PropertyRegistry,
    pub(crate) elements: Arena,
    pub(crate) styles: Styles,
    pub(crate) subscriptions: Subscriptions,
    pub(crate) bindings: Bindings,
    pub(crate) queue: VecDeque<Mutation>,
    pub(crate) dispatch_depth: usize,
    pub(crate) apply_depth: usize,
    pub(crate) draining: bool,
    pub(crate) error_sink: Option<ErrorSink>,
    /// Deliveries waiting for a running handler to return.
    pub(crate) deferred: VecDeque<(SubscriptionId, Event)>,
    /// Registrations already given to existing elements as per-instance defaults.
    pub(crate) backfilled: usize,
}

impl TreeCore {
    pub(crate) fn data(&self, id: ElementId) -> Result<&ElementData, TreeError> {
        self.elements.get(id).ok_or(TreeError::ElementNotFound(id))
    }

    pub(crate) fn data_mut(&mut self, id: ElementId) -> Result<&mut ElementData, TreeError> {
        self.elements
            .get_mut(id)
            .ok_or(TreeError::ElementNotFound(id))
    }

    pub(crate) fn registration(
        &self,
        id: ElementId,
        property: PropertyId,
    ) -> Result<Rc<PropertyRegistration>, TreeError> {
        let kind = self.data(id)?.kind;
        Ok(self.registry.resolve(kind, property)?)
    }

    /// The effective value of `property` on `id`.
    pub(crate) fn effective(&self, id: ElementId, property: PropertyId) -> Result<ErasedValue, TreeError> {
        let registration = self.registration(id, property)?;
        let data = self.data(id)?;
        Ok(self.resolve_with(data, &registration))
    }

    /// Local, then styled, then inherited (if the property inherits), then default.
    pub(crate) fn resolve_with(&self, data: &ElementData, registration: &PropertyRegistration) -> ErasedValue {
        let property = registration.id();
        if let Some(value) = data.own_value(property) {
            return value.clone();
        }
        if registration.inherits()
            && let Some(value) = self.inherited(data, property)
        {
            return value.clone();
        }
        data.store
            .instance_default(property)
            .cloned()
            .unwrap_or_else(|| registration.default_value())
    }

    fn inherited(&self, data: &ElementData, property: PropertyId) -> Option<&ErasedValue> {
        let mut next = data.parent;
        while let Some(parent) = next {
            let ancestor = self.elements.get(parent)?;
            if let Some(value) = ancestor.own_value(property) {
                return Some(value);
            }
            next = ancestor.parent;
        }
        None
    }

    fn value_source(&self, id: ElementId, property: PropertyId) -> Result<ValueSource, TreeError> {
        let registration = self.registration(id, property)?;
        let data = self.data(id)?;
        if data.store.has_local(property) {
            return Ok(ValueSource::Local);
        }
        if let Some(entry) = data.styles.winner(property) {
            return Ok(ValueSource::Styled(entry.rank.rule));
        }
        if registration.inherits() {
            for ancestor in self.elements.ancestors(id) {
                if self
                    .elements
                    .get(ancestor)
                    .is_some_and(|a| a.own_value(property).is_some())
                {
                    return Ok(ValueSource::Inherited(ancestor));
                }
            }
        }
        Ok(ValueSource::Default)
    }

    /// Returns `true` if `ancestor` is `id` or one of its ancestors.
    pub(crate) fn is_self_or_ancestor(&self, ancestor: ElementId, id: ElementId) -> bool {
        ancestor == id || self.elements.ancestors(id).any(|a| a == ancestor)
    }
}

impl fmt::Debug for TreeCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeCore")
            .field("elements", &self.elements.len())
            .field("rules", &self.styles.len())
            .field("subscriptions", &self.subscriptions)
            .field("queued", &self.queue.len())
            .finish_non_exhaustive()
    }
}

/// A tree of elements with reactive, styled property values.
///
/// `ElementTree` is a cheap, clonable handle. All clones share the same
/// tree. Every operation is synchronous and confined to the thread that
/// created the tree.
///
/// ## Re-entrancy
///
/// Mutations requested while change handlers are running are queued and
/// replayed in FIFO order once the current delivery completes. The call that
/// queued them returns `Ok` after eager validation; failures that only show
/// up at replay time go to the [error sink](Self::set_error_sink).
#[derive(Clone)]
pub struct ElementTree {
    pub(crate) core: Rc<RefCell<TreeCore>>,
}

/// A non-owning handle to an [`ElementTree`].
#[derive(Clone, Debug)]
pub struct WeakTree(Weak<RefCell<TreeCore>>);

impl WeakTree {
    /// The tree, if it is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<ElementTree> {
        self.0.upgrade().map(|core| ElementTree { core })
    }
}

impl fmt::Debug for ElementTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.core.try_borrow() {
            Ok(core) => f.debug_tuple("ElementTree").field(&*core).finish(),
            Err(_) => f.write_str("ElementTree(<busy>)"),
        }
    }
}

impl Default for ElementTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ElementTree {
    /// Creates an empty tree using this thread's [global registry](PropertyRegistry::global).
    #[must_use]
    pub fn new() -> Self {
        Self::with_registry(PropertyRegistry::global())
    }

    /// Creates an empty tree resolving properties against `registry`.
    #[must_use]
    pub fn with_registry(registry: &'static PropertyRegistry) -> Self {
        let core = TreeCore {
            registry,
            elements: Arena::default(),
            styles: Styles::new(),
            subscriptions: Subscriptions::default(),
            bindings: Bindings::default(),
            queue: VecDeque::new(),
            dispatch_depth: 0,
            apply_depth: 0,
            draining: false,
            error_sink: None,
            deferred: VecDeque::new(),
            backfilled: registry.len(),
        };
        Self {
            core: Rc::new(RefCell::new(core)),
        }
    }

    /// The registry this tree resolves against.
    #[must_use]
    pub fn registry(&self) -> &'static PropertyRegistry {
        self.core.borrow().registry
    }

    /// A non-owning handle to this tree.
    #[must_use]
    pub fn downgrade(&self) -> WeakTree {
        WeakTree(Rc::downgrade(&self.core))
    }

    /// Replaces the sink for unhandled errors.
    ///
    /// Without a sink, errors are logged with `tracing::error!`.
    pub fn set_error_sink(&self, sink: impl Fn(&TreeError) + 'static) {
        self.core.borrow_mut().error_sink = Some(Rc::new(sink));
    }

    pub(crate) fn report(&self, error: TreeError) {
        let sink = self.core.borrow().error_sink.clone();
        match sink {
            Some(sink) => sink(&error),
            None => tracing::error!(%error, "unhandled tree error"),
        }
    }

    /// Builds per-instance defaults that existing elements are missing
    /// because the property was registered after they were created.
    ///
    /// Each element gets its own value once; later reads return that value.
    pub(crate) fn backfill_instance_defaults(&self) {
        let pending: Vec<(ElementId, Rc<PropertyRegistration>)> = {
            let mut core = self.core.borrow_mut();
            let registered = core.registry.len();
            if core.backfilled >= registered {
                return;
            }
            let late: Vec<_> = core
                .registry
                .registrations()
                .into_iter()
                .skip(core.backfilled)
                .filter(|r| r.has_instance_default())
                .collect();
            core.backfilled = registered;
            let mut pending = Vec::new();
            for id in core.elements.ids() {
                let Some(data) = core.elements.get(id) else {
                    continue;
                };
                for registration in &late {
                    if registration.applies_to(data.kind)
                        && data.store.instance_default(registration.id()).is_none()
                    {
                        pending.push((id, registration.clone()));
                    }
                }
            }
            pending
        };
        // Factories run before the tree is borrowed again.
        let built: Vec<_> = pending
            .into_iter()
            .filter_map(|(id, r)| Some((id, r.id(), r.instance_default()?)))
            .collect();
        let mut core = self.core.borrow_mut();
        for (id, property, value) in built {
            if let Some(data) = core.elements.get_mut(id) {
                data.store.insert_instance_default(property, value);
            }
        }
    }

    pub(crate) fn check_element(&self, id: ElementId) -> Result<(), TreeError> {
        self.core.borrow().data(id).map(|_| ())
    }

    // Structure.

    /// Creates a detached element of `kind`.
    ///
    /// Per-instance defaults of every property that applies to `kind` are
    /// evaluated now, once for this element. Per-instance properties
    /// registered later are evaluated once per element on the tree's next
    /// read or mutation.
    pub fn create(&self, kind: &'static ElementKind) -> ElementId {
        self.create_element(kind, None, None)
    }

    /// Creates a detached, named element of `kind`.
    pub fn create_named(&self, kind: &'static ElementKind, name: impl Into<String>) -> ElementId {
        self.create_element(kind, Some(name.into()), None)
    }

    pub(crate) fn create_element(
        &self,
        kind: &'static ElementKind,
        name: Option<String>,
        templated_parent: Option<ElementId>,
    ) -> ElementId {
        let registry = self.registry();
        // Factories run before the tree is borrowed.
        let defaults = registry.instance_defaults(kind);
        let flags = if templated_parent.is_some() {
            ElementFlags::TEMPLATE_PART
        } else {
            ElementFlags::empty()
        };
        let id = self.core.borrow_mut().elements.insert(|id| ElementData {
            kind,
            name,
            classes: Classes::default(),
            parent: None,
            children: Vec::new(),
            flags,
            store: PropertyStore::with_instance_defaults(id, defaults),
            styles: AppliedStyles::default(),
            templated_parent,
            template: None,
        });
        tracing::trace!(element = %id, kind = kind.name(), "created element");
        id
    }

    /// Returns `true` if `id` refers to a live element.
    #[must_use]
    pub fn contains(&self, id: ElementId) -> bool {
        self.core.borrow().elements.contains(id)
    }

    /// Number of live elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.core.borrow().elements.len()
    }

    /// Returns `true` if the tree has no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The element's kind.
    pub fn kind(&self, id: ElementId) -> Result<&'static ElementKind, TreeError> {
        Ok(self.core.borrow().data(id)?.kind)
    }

    /// The element's name, if it was created with one.
    pub fn name(&self, id: ElementId) -> Result<Option<String>, TreeError> {
        Ok(self.core.borrow().data(id)?.name.clone())
    }

    /// The element's parent.
    pub fn parent(&self, id: ElementId) -> Result<Option<ElementId>, TreeError> {
        Ok(self.core.borrow().data(id)?.parent)
    }

    /// The element's children, in order.
    pub fn children(&self, id: ElementId) -> Result<Vec<ElementId>, TreeError> {
        Ok(self.core.borrow().data(id)?.children.clone())
    }

    /// Returns `true` if the element is under an attached root.
    pub fn is_attached(&self, id: ElementId) -> Result<bool, TreeError> {
        Ok(self.core.borrow().data(id)?.is_attached())
    }

    /// The element's lifecycle flags.
    pub fn flags(&self, id: ElementId) -> Result<ElementFlags, TreeError> {
        Ok(self.core.borrow().data(id)?.flags)
    }

    /// The host whose template created this element.
    pub fn templated_parent(&self, id: ElementId) -> Result<Option<ElementId>, TreeError> {
        Ok(self.core.borrow().data(id)?.templated_parent)
    }

    /// Appends `child` as the last child of `parent`.
    ///
    /// `child` must not already have a parent and must not be `parent` or
    /// one of its ancestors. If `parent` is attached, the child's subtree
    /// becomes attached and is styled.
    pub fn append_child(&self, parent: ElementId, child: ElementId) -> Result<(), TreeError> {
        self.run(Mutation::AppendChild { parent, child })
    }

    /// Removes `id` from its parent, if any, and detaches its subtree.
    ///
    /// Detached elements lose their styled values.
    pub fn detach(&self, id: ElementId) -> Result<(), TreeError> {
        self.run(Mutation::Detach { element: id })
    }

    /// Marks `root` and its subtree as attached and styles them.
    pub fn attach(&self, root: ElementId) -> Result<(), TreeError> {
        self.run(Mutation::Attach { root })
    }

    /// Destroys `id` and its subtree.
    ///
    /// Subscriptions on destroyed elements, bindings touching them and
    /// template instances they host are released. No change events are
    /// delivered for destroyed elements.
    pub fn destroy(&self, id: ElementId) -> Result<(), TreeError> {
        self.run(Mutation::Destroy { element: id })
    }

    // Classes.

    /// The element's class tags, in insertion order.
    pub fn classes(&self, id: ElementId) -> Result<Vec<String>, TreeError> {
        Ok(self.core.borrow().data(id)?.classes.as_slice().to_vec())
    }

    /// Returns `true` if the element carries `tag`.
    pub fn has_class(&self, id: ElementId, tag: &str) -> Result<bool, TreeError> {
        Ok(self.core.borrow().data(id)?.classes.contains(tag))
    }

    /// Adds a class tag. Adding a present tag does nothing.
    pub fn add_class(&self, id: ElementId, tag: &str) -> Result<(), TreeError> {
        self.set_class(id, tag, true)
    }

    /// Removes a class tag. Removing an absent tag does nothing.
    pub fn remove_class(&self, id: ElementId, tag: &str) -> Result<(), TreeError> {
        self.set_class(id, tag, false)
    }

    /// Adds or removes a class tag.
    pub fn set_class(&self, id: ElementId, tag: &str, present: bool) -> Result<(), TreeError> {
        self.run(Mutation::SetClass {
            element: id,
            class: tag.to_owned(),
            present,
        })
    }

    // Values.

    /// The effective value of `property` on `id`.
    ///
    /// Fails only if the element is gone or the property does not apply to
    /// its kind; an unset property yields its default.
    pub fn get<T: PropertyValue>(&self, id: ElementId, property: Property<T>) -> Result<T, TreeError> {
        self.backfill_instance_defaults();
        let core = self.core.borrow();
        let registration = core.registration(id, property.id())?;
        let value = core.resolve_with(core.data(id)?, &registration);
        value.get().ok_or_else(|| {
            PropertyError::TypeMismatch {
                property: registration.name(),
                expected: registration.type_name(),
                found: core::any::type_name::<T>(),
            }
            .into()
        })
    }

    /// The effective value of `property` on `id`, type-erased.
    pub fn get_erased(&self, id: ElementId, property: PropertyId) -> Result<ErasedValue, TreeError> {
        self.backfill_instance_defaults();
        self.core.borrow().effective(id, property)
    }

    /// The local value of `property` on `id`, if one is set.
    pub fn local<T: PropertyValue>(&self, id: ElementId, property: Property<T>) -> Result<Option<T>, TreeError> {
        let core = self.core.borrow();
        core.registration(id, property.id())?;
        Ok(core.data(id)?.store.get_local(property).cloned())
    }

    /// Where the effective value of `property` on `id` comes from.
    pub fn value_source<T: PropertyValue>(
        &self,
        id: ElementId,
        property: Property<T>,
    ) -> Result<ValueSource, TreeError> {
        self.core.borrow().value_source(id, property.id())
    }

    /// Sets a local value. Local values beat every other source.
    ///
    /// The registered coercion runs first. Observers see the change before
    /// this returns, unless the call is made from inside a change handler, in
    /// which case it is queued.
    pub fn set_local<T: PropertyValue>(
        &self,
        id: ElementId,
        property: Property<T>,
        value: T,
    ) -> Result<(), TreeError> {
        self.set_local_erased(id, property.id(), ErasedValue::new(value))
    }

    /// Sets a type-erased local value after checking its type.
    pub fn set_local_erased(
        &self,
        id: ElementId,
        property: PropertyId,
        value: ErasedValue,
    ) -> Result<(), TreeError> {
        self.run(Mutation::SetLocal {
            element: id,
            property,
            value,
        })
    }

    /// Removes a local value, revealing the styled, inherited or default value.
    pub fn clear_local<T: PropertyValue>(&self, id: ElementId, property: Property<T>) -> Result<(), TreeError> {
        self.run(Mutation::ClearLocal {
            element: id,
            property: property.id(),
        })
    }

    // Styles.

    /// Adds a style rule and restyles attached elements.
    ///
    /// Every setter is checked against its property's registered type now.
    /// Whether a property applies to a matched element is checked per
    /// element; a rule with an inapplicable setter is rolled back for that
    /// element and the error goes to the error sink.
    ///
    /// The id is assigned at once, in declaration order. From inside a change
    /// handler the rule takes effect when the queue replays, like any other
    /// mutation.
    pub fn add_rule(&self, selector: Selector, style: Style) -> Result<RuleId, TreeError> {
        let registry = self.registry();
        for (property, setter) in style.setters() {
            let registration = registry
                .get(property)
                .ok_or_else(|| PropertyError::UnknownProperty {
                    property: format!("{property:?}"),
                    element_type: selector.kind().map_or("*", ElementKind::name),
                })?;
            registration.check_type(setter.value())?;
        }
        let rule = self.core.borrow_mut().styles.reserve_id();
        self.run(Mutation::AddRule {
            rule,
            selector,
            style,
        })?;
        Ok(rule)
    }

    /// Removes a style rule and restyles attached elements.
    ///
    /// Returns `false` if the rule did not exist, counting rules added or
    /// removed by queued mutations.
    pub fn remove_rule(&self, rule: RuleId) -> Result<bool, TreeError> {
        if !self.core.borrow().rule_will_exist(rule) {
            return Ok(false);
        }
        self.run(Mutation::RemoveRule { rule })?;
        Ok(true)
    }

    /// Number of rules in effect.
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.core.borrow().styles.len()
    }

    // Queue.

    /// Runs `mutation` now, or queues it if a delivery is in progress.
    pub(crate) fn run(&self, mutation: Mutation) -> Result<(), TreeError> {
        let mutation = self.validate(mutation)?;
        {
            let mut core = self.core.borrow_mut();
            if core.dispatch_depth > 0 || core.draining {
                tracing::trace!(?mutation, "queued mutation");
                core.queue.push_back(mutation);
                return Ok(());
            }
        }
        self.apply(mutation)?;
        self.drain();
        Ok(())
    }

    /// Runs `mutation` now, bypassing the queue.
    pub(crate) fn run_now(&self, mutation: Mutation) -> Result<(), TreeError> {
        let mutation = self.validate(mutation)?;
        self.apply(mutation)
    }

    /// Replays queued mutations in FIFO order.
    pub(crate) fn drain(&self) {
        {
            let mut core = self.core.borrow_mut();
            if core.draining || core.dispatch_depth > 0 || core.apply_depth > 0 {
                return;
            }
            core.draining = true;
        }
        let _guard = DrainGuard(self);
        loop {
            let next = self.core.borrow_mut().queue.pop_front();
            let Some(mutation) = next else {
                break;
            };
            if let Err(error) = self.apply(mutation) {
                self.report(error);
            }
        }
    }

    /// Number of mutations waiting to be replayed.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.core.borrow().queue.len()
    }

    pub(crate) fn apply(&self, mutation: Mutation) -> Result<(), TreeError> {
        self.backfill_instance_defaults();
        if let Mutation::Instantiate { host, property } = mutation {
            return self.instantiate_now(host, property).map(|_| ());
        }
        let outcome = {
            let _guard = ApplyGuard::enter(self);
            let result = self.core.borrow_mut().apply(mutation);
            result?
        };
        let crate::engine::Outcome {
            events,
            errors,
            garbage,
        } = outcome;
        // Released handlers and values may own tree handles; drop them unborrowed.
        drop(garbage);
        for error in errors {
            self.report(error);
        }
        for event in &events {
            if let Event::Property(change) = event
                && self.is_template_property(change.property)
                && let Err(error) = self.instantiate_now(change.element, change.property)
            {
                self.report(error);
            }
        }
        self.dispatch(events);
        Ok(())
    }
}

/// Raises the apply depth for its lifetime, holding back queue replay.
pub(crate) struct ApplyGuard<'a>(&'a ElementTree);

impl<'a> ApplyGuard<'a> {
    pub(crate) fn enter(tree: &'a ElementTree) -> Self {
        tree.core.borrow_mut().apply_depth += 1;
        Self(tree)
    }
}

impl Drop for ApplyGuard<'_> {
    fn drop(&mut self) {
        self.0.core.borrow_mut().apply_depth -= 1;
    }
}

struct DrainGuard<'a>(&'a ElementTree);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.core.borrow_mut().draining = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_property::PropertyMetadataBuilder;
    use trellis_style::StyleBuilder;

    static CONTROL: ElementKind = ElementKind::new("TreeControl");
    static BUTTON: ElementKind = ElementKind::derived("TreeButton", &CONTROL);
    static OTHER: ElementKind = ElementKind::new("TreeOther");

    struct Props {
        width: Property<f64>,
        font: Property<u32>,
        tags: Property<Vec<u32>>,
    }

    fn props() -> Props {
        let registry = PropertyRegistry::global();
        let width = registry.find_typed(&CONTROL, "Width").or_else(|_| {
            registry.register(&CONTROL, "Width", PropertyMetadataBuilder::new(0.0_f64).build())
        });
        let font = registry.find_typed(&CONTROL, "FontSize").or_else(|_| {
            registry.register(
                &CONTROL,
                "FontSize",
                PropertyMetadataBuilder::new(12_u32).inherits(true).build(),
            )
        });
        let tags = registry.find_typed(&CONTROL, "Tags").or_else(|_| {
            registry.register(
                &CONTROL,
                "Tags",
                PropertyMetadataBuilder::per_instance(Vec::new).build(),
            )
        });
        Props {
            width: width.unwrap(),
            font: font.unwrap(),
            tags: tags.unwrap(),
        }
    }

    #[test]
    fn default_after_clear_is_idempotent() {
        let p = props();
        let tree = ElementTree::new();
        let el = tree.create(&BUTTON);
        tree.set_local(el, p.font, 20).unwrap();
        tree.clear_local(el, p.font).unwrap();
        for _ in 0..3 {
            assert_eq!(tree.get(el, p.font).unwrap(), 12);
        }
        assert_eq!(tree.value_source(el, p.font).unwrap(), ValueSource::Default);
    }

    #[test]
    fn inheritance_walks_to_nearest_ancestor_with_a_value() {
        let p = props();
        let tree = ElementTree::new();
        let root = tree.create(&CONTROL);
        let mid = tree.create(&CONTROL);
        let leaf = tree.create(&BUTTON);
        tree.append_child(root, mid).unwrap();
        tree.append_child(mid, leaf).unwrap();
        tree.set_local(root, p.font, 16).unwrap();
        assert_eq!(tree.get(leaf, p.font).unwrap(), 16);
        assert_eq!(tree.value_source(leaf, p.font).unwrap(), ValueSource::Inherited(root));
        tree.set_local(mid, p.font, 18).unwrap();
        assert_eq!(tree.get(leaf, p.font).unwrap(), 18);

        // Width does not inherit.
        tree.set_local(root, p.width, 40.0).unwrap();
        assert_eq!(tree.get(leaf, p.width).unwrap(), 0.0);
    }

    #[test]
    fn per_instance_defaults_are_not_shared() {
        let p = props();
        let tree = ElementTree::new();
        let a = tree.create(&CONTROL);
        let b = tree.create(&CONTROL);
        let mut tags = tree.get(a, p.tags).unwrap();
        tags.push(1);
        tree.set_local(a, p.tags, tags).unwrap();
        assert_eq!(tree.get(a, p.tags).unwrap(), vec![1]);
        assert!(tree.get(b, p.tags).unwrap().is_empty());
    }

    #[test]
    fn unknown_property_surfaces() {
        let p = props();
        let tree = ElementTree::new();
        let other = tree.create(&OTHER);
        let err = tree.set_local(other, p.width, 1.0).unwrap_err();
        assert!(matches!(
            err,
            TreeError::Property(trellis_property::PropertyError::UnknownProperty { .. })
        ));
        assert!(tree.get(other, p.width).is_err());
    }

    #[test]
    fn structure_is_validated() {
        let tree = ElementTree::new();
        let a = tree.create(&CONTROL);
        let b = tree.create(&CONTROL);
        tree.append_child(a, b).unwrap();
        assert_eq!(
            tree.append_child(b, a),
            Err(TreeError::Cycle { parent: b, child: a })
        );
        assert_eq!(
            tree.append_child(a, b),
            Err(TreeError::AlreadyParented { child: b, parent: a })
        );
        assert_eq!(tree.children(a).unwrap(), vec![b]);
        tree.detach(b).unwrap();
        assert_eq!(tree.parent(b).unwrap(), None);
        tree.destroy(a).unwrap();
        assert!(!tree.contains(a));
        assert_eq!(tree.kind(a), Err(TreeError::ElementNotFound(a)));
    }

    #[test]
    fn destroy_removes_the_whole_subtree() {
        let tree = ElementTree::new();
        let root = tree.create(&CONTROL);
        let child = tree.create(&CONTROL);
        let grandchild = tree.create(&CONTROL);
        tree.append_child(root, child).unwrap();
        tree.append_child(child, grandchild).unwrap();
        tree.destroy(child).unwrap();
        assert!(tree.children(root).unwrap().is_empty());
        assert!(!tree.contains(grandchild));
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn styles_apply_only_while_attached() {
        let p = props();
        let tree = ElementTree::new();
        let root = tree.create(&CONTROL);
        let button = tree.create(&BUTTON);
        tree.append_child(root, button).unwrap();
        tree.add_rule(
            Selector::of_type(&BUTTON),
            StyleBuilder::new().set(p.width, 10.0).build(),
        )
        .unwrap();
        assert_eq!(tree.get(button, p.width).unwrap(), 0.0);
        tree.attach(root).unwrap();
        assert_eq!(tree.get(button, p.width).unwrap(), 10.0);
        assert!(tree.is_attached(button).unwrap());
        tree.detach(button).unwrap();
        assert_eq!(tree.get(button, p.width).unwrap(), 0.0);
    }

    #[test]
    fn error_sink_receives_style_rollbacks() {
        static LABEL: ElementKind = ElementKind::new("TreeLabel");
        let p = props();
        let tree = ElementTree::new();
        let errors = Rc::new(RefCell::new(Vec::new()));
        let sink = errors.clone();
        tree.set_error_sink(move |e| sink.borrow_mut().push(e.clone()));
        let label = tree.create(&LABEL);
        tree.attach(label).unwrap();
        let rule = tree
            .add_rule(Selector::any(), StyleBuilder::new().set(p.width, 3.0).build())
            .unwrap();
        assert!(matches!(
            errors.borrow().as_slice(),
            [TreeError::StyleApplication { rule: r, element, .. }] if *r == rule && *element == label
        ));
        assert!(tree.remove_rule(rule).unwrap());
        assert!(!tree.remove_rule(rule).unwrap());
    }
}
