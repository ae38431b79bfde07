// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Mutation application, change detection and the style engine.
//!
//! Every mutation computes a *scope*: the `(element, property)` pairs whose
//! effective value it may change. The scope is snapshotted before and after
//! the mutation, and each pair whose value differs becomes one change event.
//! Inheritable properties widen the scope to the element's descendants.

use core::any::Any;

use hashbrown::HashSet;
use smallvec::SmallVec;
use trellis_property::{ErasedValue, PropertyId};
use trellis_style::{AppliedStyles, RuleId, Selector, SelectorInputs, Style};

use crate::classes::ClassChange;
use crate::element::ElementFlags;
use crate::error::TreeError;
use crate::id::ElementId;
use crate::notify::{Event, PropertyChange};
use crate::tree::{ElementTree, TreeCore};

#[derive(Debug)]
pub(crate) enum Mutation {
    SetLocal {
        element: ElementId,
        property: PropertyId,
        value: ErasedValue,
    },
    ClearLocal {
        element: ElementId,
        property: PropertyId,
    },
    SetClass {
        element: ElementId,
        class: String,
        present: bool,
    },
    AppendChild {
        parent: ElementId,
        child: ElementId,
    },
    Detach {
        element: ElementId,
    },
    Attach {
        root: ElementId,
    },
    Destroy {
        element: ElementId,
    },
    AddRule {
        rule: RuleId,
        selector: Selector,
        style: Style,
    },
    RemoveRule {
        rule: RuleId,
    },
    Instantiate {
        host: ElementId,
        property: PropertyId,
    },
}

/// What applying a mutation produced.
#[derive(Default)]
pub(crate) struct Outcome {
    pub(crate) events: Vec<Event>,
    pub(crate) errors: Vec<TreeError>,
    /// Values and handlers released by the mutation, dropped once the tree is unborrowed.
    pub(crate) garbage: Vec<Box<dyn Any>>,
}

#[derive(Default)]
struct Scope {
    pairs: Vec<(ElementId, PropertyId)>,
    seen: HashSet<(ElementId, PropertyId)>,
}

impl Scope {
    fn push(&mut self, element: ElementId, property: PropertyId) {
        if self.seen.insert((element, property)) {
            self.pairs.push((element, property));
        }
    }
}

type Snapshot = Vec<Option<ErasedValue>>;

impl ElementTree {
    /// Checks a mutation against the current tree and normalizes it.
    ///
    /// Local values are type-checked and coerced here, outside any borrow.
    pub(crate) fn validate(&self, mutation: Mutation) -> Result<Mutation, TreeError> {
        match mutation {
            Mutation::SetLocal {
                element,
                property,
                value,
            } => {
                let registration = self.core.borrow().registration(element, property)?;
                let value = registration.coerce(value)?;
                Ok(Mutation::SetLocal {
                    element,
                    property,
                    value,
                })
            }
            Mutation::ClearLocal { element, property } => {
                self.core.borrow().registration(element, property)?;
                Ok(mutation)
            }
            Mutation::AppendChild { parent, child } => {
                self.core.borrow().check_append(parent, child)?;
                Ok(mutation)
            }
            Mutation::SetClass { element, .. }
            | Mutation::Detach { element }
            | Mutation::Destroy { element }
            | Mutation::Attach { root: element } => {
                self.check_element(element)?;
                Ok(mutation)
            }
            Mutation::Instantiate { host, property } => {
                self.core.borrow().registration(host, property)?;
                Ok(mutation)
            }
            Mutation::AddRule { .. } | Mutation::RemoveRule { .. } => Ok(mutation),
        }
    }
}

impl TreeCore {
    pub(crate) fn check_append(&self, parent: ElementId, child: ElementId) -> Result<(), TreeError> {
        self.data(parent)?;
        if let Some(current) = self.data(child)?.parent {
            return Err(TreeError::AlreadyParented {
                child,
                parent: current,
            });
        }
        if self.is_self_or_ancestor(child, parent) {
            return Err(TreeError::Cycle { parent, child });
        }
        Ok(())
    }

    /// Applies one validated mutation. The tree state is re-checked since a
    /// queued mutation may have gone stale.
    pub(crate) fn apply(&mut self, mutation: Mutation) -> Result<Outcome, TreeError> {
        let mut outcome = Outcome::default();
        match mutation {
            Mutation::SetLocal {
                element,
                property,
                value,
            } => {
                let scope = self.property_scope(element, property)?;
                let before = self.snapshot(&scope);
                let previous = self.data_mut(element)?.store.set_local_erased(property, value);
                outcome.garbage.extend(previous.map(|v| Box::new(v) as Box<dyn Any>));
                self.diff(&scope, &before, &mut outcome.events);
            }
            Mutation::ClearLocal { element, property } => {
                let scope = self.property_scope(element, property)?;
                let before = self.snapshot(&scope);
                let previous = self.data_mut(element)?.store.clear_local_erased(property);
                outcome.garbage.extend(previous.map(|v| Box::new(v) as Box<dyn Any>));
                self.diff(&scope, &before, &mut outcome.events);
            }
            Mutation::SetClass {
                element,
                class,
                present,
            } => {
                let classes = &mut self.data_mut(element)?.classes;
                let changed = if present {
                    classes.insert(&class)
                } else {
                    classes.remove(&class)
                };
                if changed {
                    outcome.events.push(Event::Class(ClassChange {
                        element,
                        class,
                        added: present,
                    }));
                    self.restyle(&[element], &mut outcome);
                }
            }
            Mutation::AppendChild { parent, child } => {
                self.check_append(parent, child)?;
                let attached = self.data(parent)?.is_attached();
                let subtree = self.elements.subtree(child);
                self.relink(&subtree, attached, &mut outcome, |core| {
                    if let Some(data) = core.elements.get_mut(parent) {
                        data.children.push(child);
                    }
                    if let Some(data) = core.elements.get_mut(child) {
                        data.parent = Some(parent);
                    }
                });
            }
            Mutation::Detach { element } => {
                let parent = self.data(element)?.parent;
                let subtree = self.elements.subtree(element);
                self.relink(&subtree, false, &mut outcome, |core| {
                    if let Some(parent) = parent
                        && let Some(data) = core.elements.get_mut(parent)
                    {
                        data.children.retain(|c| *c != element);
                    }
                    if let Some(data) = core.elements.get_mut(element) {
                        data.parent = None;
                    }
                });
            }
            Mutation::Attach { root } => {
                if !self.data(root)?.is_attached() {
                    let subtree = self.elements.subtree(root);
                    self.relink(&subtree, true, &mut outcome, |_| {});
                }
            }
            Mutation::Destroy { element } => {
                self.destroy_subtree(element, &mut outcome)?;
            }
            Mutation::AddRule {
                rule,
                selector,
                style,
            } => {
                tracing::debug!(%rule, %selector, setters = style.len(), "adding style rule");
                if self.styles.insert_rule(rule, selector, style) {
                    self.restyle_attached(&mut outcome);
                }
            }
            Mutation::RemoveRule { rule } => {
                // Removing twice is harmless; the second removal finds nothing.
                if let Some(removed) = self.styles.remove_rule(rule) {
                    tracing::debug!(%rule, selector = %removed.selector(), "removed style rule");
                    outcome.garbage.push(Box::new(removed));
                    self.restyle_attached(&mut outcome);
                }
            }
            // Applied by `ElementTree::apply`, which runs the factory unborrowed.
            Mutation::Instantiate { .. } => {}
        }
        Ok(outcome)
    }

    /// Returns `true` if `rule` is in the rule set once the queue has drained.
    pub(crate) fn rule_will_exist(&self, rule: RuleId) -> bool {
        let mut present = self.styles.get(rule).is_some();
        for mutation in &self.queue {
            match mutation {
                Mutation::AddRule { rule: queued, .. } if *queued == rule => present = true,
                Mutation::RemoveRule { rule: queued } if *queued == rule => present = false,
                _ => {}
            }
        }
        present
    }

    fn restyle_attached(&mut self, outcome: &mut Outcome) {
        let attached: Vec<_> = self
            .elements
            .ids()
            .filter(|id| self.elements.get(*id).is_some_and(|d| d.is_attached()))
            .collect();
        self.restyle(&attached, outcome);
    }

    // Scopes and snapshots.

    /// `(element, property)`, widened to descendants if the property inherits.
    fn property_scope(&self, element: ElementId, property: PropertyId) -> Result<Scope, TreeError> {
        let registration = self.registration(element, property)?;
        let mut scope = Scope::default();
        if registration.inherits() {
            for id in self.elements.subtree(element) {
                scope.push(id, property);
            }
        } else {
            scope.push(element, property);
        }
        Ok(scope)
    }

    fn snapshot(&self, scope: &Scope) -> Snapshot {
        scope
            .pairs
            .iter()
            .map(|&(element, property)| self.effective(element, property).ok())
            .collect()
    }

    fn diff(&self, scope: &Scope, before: &Snapshot, events: &mut Vec<Event>) {
        for (&(element, property), old) in scope.pairs.iter().zip(before) {
            let Some(old) = old else {
                continue;
            };
            let Ok(new) = self.effective(element, property) else {
                continue;
            };
            if *old != new {
                events.push(Event::Property(PropertyChange {
                    element,
                    property,
                    old: old.clone(),
                    new,
                }));
            }
        }
    }

    // Style engine.

    /// Matches the rule set against one element.
    ///
    /// A rule whose setters do not all apply to the element's kind is rolled
    /// back as a whole for that element.
    fn compute_styles(&self, id: ElementId, attached: bool, errors: &mut Vec<TreeError>) -> AppliedStyles {
        let mut applied = AppliedStyles::default();
        let Some(data) = self.elements.get(id) else {
            return applied;
        };
        if !attached {
            return applied;
        }
        let inputs = SelectorInputs::new(data.kind, data.classes.as_slice());
        'rules: for rule in self.styles.matching(&inputs) {
            let mut staged: SmallVec<[(PropertyId, ErasedValue); 4]> = SmallVec::new();
            for (property, setter) in rule.style().setters() {
                let checked = self
                    .registry
                    .resolve(data.kind, property)
                    .and_then(|registration| registration.check_type(setter.value()));
                match checked {
                    Ok(()) => staged.push((property, setter.value().clone())),
                    Err(source) => {
                        tracing::warn!(
                            rule = %rule.id(),
                            element = %id,
                            error = %source,
                            "rolling back style rule for element"
                        );
                        errors.push(TreeError::StyleApplication {
                            rule: rule.id(),
                            element: id,
                            source,
                        });
                        continue 'rules;
                    }
                }
            }
            for (property, value) in staged {
                applied.set_styled(property, rule.rank(), value);
            }
        }
        applied
    }

    /// Pushes the scope entries a styled property touches.
    fn scope_styled(&self, scope: &mut Scope, element: ElementId, property: PropertyId) {
        let inherits = self
            .registry
            .get(property)
            .is_some_and(|registration| registration.inherits());
        if inherits {
            for id in self.elements.subtree(element) {
                scope.push(id, property);
            }
        } else {
            scope.push(element, property);
        }
    }

    /// Recomputes and installs the applied styles of `elements`.
    fn restyle(&mut self, elements: &[ElementId], outcome: &mut Outcome) {
        let mut scope = Scope::default();
        let mut computed = Vec::with_capacity(elements.len());
        for &id in elements {
            let Some(data) = self.elements.get(id) else {
                continue;
            };
            let styles = self.compute_styles(id, data.is_attached(), &mut outcome.errors);
            for property in data.styles.properties().into_iter().chain(styles.properties()) {
                self.scope_styled(&mut scope, id, property);
            }
            computed.push((id, styles));
        }
        let before = self.snapshot(&scope);
        for (id, styles) in computed {
            if let Some(data) = self.elements.get_mut(id) {
                data.styles = styles;
            }
        }
        self.diff(&scope, &before, &mut outcome.events);
    }

    /// Changes the structure around `subtree` (its root first) and restyles it.
    ///
    /// Every inheritable property may change for the moved elements, so the
    /// scope covers all of them in addition to the styled properties.
    fn relink(
        &mut self,
        subtree: &[ElementId],
        attached: bool,
        outcome: &mut Outcome,
        link: impl FnOnce(&mut Self),
    ) {
        let inheritable: Vec<_> = self
            .registry
            .registrations()
            .into_iter()
            .filter(|registration| registration.inherits())
            .collect();
        let mut scope = Scope::default();
        let mut computed = Vec::with_capacity(subtree.len());
        for &id in subtree {
            let Some(data) = self.elements.get(id) else {
                continue;
            };
            for registration in &inheritable {
                if registration.applies_to(data.kind) {
                    scope.push(id, registration.id());
                }
            }
            let styles = self.compute_styles(id, attached, &mut outcome.errors);
            for property in data.styles.properties().into_iter().chain(styles.properties()) {
                scope.push(id, property);
            }
            computed.push((id, styles));
        }
        let before = self.snapshot(&scope);
        link(self);
        for (id, styles) in computed {
            if let Some(data) = self.elements.get_mut(id) {
                data.flags.set(ElementFlags::ATTACHED, attached);
                data.styles = styles;
            }
        }
        self.diff(&scope, &before, &mut outcome.events);
    }

    fn destroy_subtree(&mut self, element: ElementId, outcome: &mut Outcome) -> Result<(), TreeError> {
        let parent = self.data(element)?.parent;
        if let Some(parent) = parent
            && let Some(data) = self.elements.get_mut(parent)
        {
            data.children.retain(|c| *c != element);
        }
        let mut subtree = self.elements.subtree(element);
        let mut seen: HashSet<ElementId> = subtree.iter().copied().collect();
        // Template content moved away from its host still goes with the host.
        let mut next = 0;
        while next < subtree.len() {
            let root = self
                .elements
                .get(subtree[next])
                .and_then(|data| data.template.as_ref())
                .map(|instance| instance.root);
            next += 1;
            let Some(root) = root else {
                continue;
            };
            if seen.contains(&root) || !self.elements.contains(root) {
                continue;
            }
            if let Some(parent) = self.elements.get(root).and_then(|data| data.parent)
                && let Some(data) = self.elements.get_mut(parent)
            {
                data.children.retain(|c| *c != root);
            }
            for id in self.elements.subtree(root) {
                if seen.insert(id) {
                    subtree.push(id);
                }
            }
        }
        for &id in &subtree {
            for handler in self.subscriptions.remove_element(id) {
                outcome.garbage.push(Box::new(handler));
            }
            for record in self.bindings.remove_element(id) {
                for subscription in record.subscriptions() {
                    if let Some(handler) = self.subscriptions.remove(subscription) {
                        outcome.garbage.push(Box::new(handler));
                    }
                }
            }
        }
        for &id in &subtree {
            if let Some(data) = self.elements.remove(id) {
                outcome.garbage.push(Box::new(data));
            }
        }
        tracing::trace!(element = %element, count = subtree.len(), "destroyed subtree");
        Ok(())
    }
}
