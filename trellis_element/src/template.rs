// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Control templates and their instantiation.
//!
//! A template is an opaque content factory. Assigning one to a host's
//! template property (locally or through a style setter) instantiates it:
//! the previous instance is torn down, the factory builds a fresh subtree
//! through a [`TemplateContext`], and the root is appended under the host.
//! Bindings created with [`TemplateContext::bind_to_host`] belong to the
//! instance and are disposed with it.

use core::any::TypeId;
use core::fmt;
use std::rc::Rc;

use trellis_property::{ElementKind, Property, PropertyId, PropertyValue};

use crate::binding::BindingMode;
use crate::engine::Mutation;
use crate::error::TreeError;
use crate::id::{BindingId, ElementId};
use crate::notify::Event;
use crate::tree::{ApplyGuard, ElementTree};

/// Builds the content of a templated host.
pub trait ContentFactory {
    /// Creates the content subtree and returns its root.
    ///
    /// The root must be left without a parent; it is appended under the host
    /// once the factory returns.
    fn create(&self, cx: &mut TemplateContext<'_>) -> Result<ElementId, TreeError>;
}

impl<F> ContentFactory for F
where
    F: Fn(&mut TemplateContext<'_>) -> Result<ElementId, TreeError>,
{
    fn create(&self, cx: &mut TemplateContext<'_>) -> Result<ElementId, TreeError> {
        self(cx)
    }
}

/// A shareable content factory. Two templates are equal only if they are
/// the same factory.
#[derive(Clone)]
pub struct ControlTemplate(Rc<dyn ContentFactory>);

impl ControlTemplate {
    /// Wraps a factory.
    pub fn new(factory: impl ContentFactory + 'static) -> Self {
        Self(Rc::new(factory))
    }

    /// Returns `true` if both handles share one factory.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        core::ptr::addr_eq(Rc::as_ptr(&self.0), Rc::as_ptr(&other.0))
    }

    fn build(&self, cx: &mut TemplateContext<'_>) -> Result<ElementId, TreeError> {
        self.0.create(cx)
    }
}

impl PartialEq for ControlTemplate {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for ControlTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ControlTemplate({:p})", Rc::as_ptr(&self.0).cast::<()>())
    }
}

/// The live content of a templated host.
#[derive(Debug)]
pub(crate) struct TemplateInstance {
    pub(crate) root: ElementId,
    pub(crate) bindings: Vec<BindingId>,
}

/// Handed to a [`ContentFactory`] while it builds content for one host.
///
/// Everything done through the context takes effect immediately, even when
/// the instantiation was triggered from a change handler.
#[derive(Debug)]
pub struct TemplateContext<'a> {
    tree: &'a ElementTree,
    host: ElementId,
    created: Vec<ElementId>,
    bindings: Vec<BindingId>,
}

impl<'a> TemplateContext<'a> {
    /// The host being templated.
    #[must_use]
    pub fn host(&self) -> ElementId {
        self.host
    }

    /// The tree, for reads.
    #[must_use]
    pub fn tree(&self) -> &'a ElementTree {
        self.tree
    }

    /// Creates a template part.
    pub fn create(&mut self, kind: &'static ElementKind) -> ElementId {
        let id = self.tree.create_element(kind, None, Some(self.host));
        self.created.push(id);
        id
    }

    /// Creates a named template part, findable with
    /// [`ElementTree::find_template_child`].
    pub fn create_named(&mut self, kind: &'static ElementKind, name: impl Into<String>) -> ElementId {
        let id = self
            .tree
            .create_element(kind, Some(name.into()), Some(self.host));
        self.created.push(id);
        id
    }

    /// Appends `child` under `parent`.
    pub fn append_child(&mut self, parent: ElementId, child: ElementId) -> Result<(), TreeError> {
        self.tree.run_now(Mutation::AppendChild { parent, child })
    }

    /// Sets a local value on a part.
    pub fn set_local<T: PropertyValue>(
        &mut self,
        element: ElementId,
        property: Property<T>,
        value: T,
    ) -> Result<(), TreeError> {
        self.tree.run_now(Mutation::SetLocal {
            element,
            property: property.id(),
            value: trellis_property::ErasedValue::new(value),
        })
    }

    /// Adds a class tag to a part.
    pub fn add_class(&mut self, element: ElementId, tag: &str) -> Result<(), TreeError> {
        self.tree.run_now(Mutation::SetClass {
            element,
            class: tag.to_owned(),
            present: true,
        })
    }

    /// Binds `target_property` on `target` to `host_property` on the host.
    ///
    /// The binding lives as long as this template instance.
    pub fn bind_to_host<T: PropertyValue>(
        &mut self,
        host_property: Property<T>,
        target: ElementId,
        target_property: Property<T>,
        mode: BindingMode,
    ) -> Result<BindingId, TreeError> {
        let id = self
            .tree
            .bind(self.host, host_property, target, target_property, mode)?;
        self.bindings.push(id);
        Ok(id)
    }
}

impl ElementTree {
    /// Instantiates the template held by `property` on `host`.
    ///
    /// Instantiation also happens on its own whenever the effective value of
    /// a template property changes; this forces a fresh instance of the
    /// current template. An empty template only tears down the old content.
    pub fn instantiate(
        &self,
        host: ElementId,
        property: Property<Option<ControlTemplate>>,
    ) -> Result<(), TreeError> {
        self.run(Mutation::Instantiate {
            host,
            property: property.id(),
        })
    }

    /// Root of the content instantiated for `host`.
    pub fn template_root(&self, host: ElementId) -> Result<Option<ElementId>, TreeError> {
        let core = self.core.borrow();
        Ok(core.data(host)?.template.as_ref().map(|t| t.root))
    }

    /// Finds the part named `name` created by `host`'s current template.
    #[must_use]
    pub fn find_template_child(&self, host: ElementId, name: &str) -> Option<ElementId> {
        let core = self.core.borrow();
        let root = core.data(host).ok()?.template.as_ref()?.root;
        core.elements.subtree(root).into_iter().find(|id| {
            core.elements.get(*id).is_some_and(|data| {
                data.templated_parent == Some(host) && data.name.as_deref() == Some(name)
            })
        })
    }

    pub(crate) fn is_template_property(&self, property: PropertyId) -> bool {
        self.registry()
            .get(property)
            .is_some_and(|r| r.value_type_id() == TypeId::of::<Option<ControlTemplate>>())
    }

    /// Tears down `host`'s content and builds it from the current template.
    pub(crate) fn instantiate_now(
        &self,
        host: ElementId,
        property: PropertyId,
    ) -> Result<Option<ElementId>, TreeError> {
        let _guard = ApplyGuard::enter(self);
        let previous = self.core.borrow_mut().data_mut(host)?.template.take();
        if let Some(previous) = previous {
            self.teardown(host, previous);
        }

        let template = self
            .get_erased(host, property)?
            .get::<Option<ControlTemplate>>()
            .flatten();
        let Some(template) = template else {
            return Ok(None);
        };

        let mut cx = TemplateContext {
            tree: self,
            host,
            created: Vec::new(),
            bindings: Vec::new(),
        };
        let built = template.build(&mut cx).and_then(|root| {
            if !cx.created.contains(&root) {
                return Err(TreeError::template(host, format!("{root} was not created by the template")));
            }
            self.run_now(Mutation::AppendChild { parent: host, child: root })?;
            Ok(root)
        });
        let TemplateContext {
            created, bindings, ..
        } = cx;

        let root = match built {
            Ok(root) => root,
            Err(error) => {
                for binding in bindings {
                    self.unbind(binding);
                }
                for element in created.into_iter().rev() {
                    if self.contains(element)
                        && let Err(error) = self.run_now(Mutation::Destroy { element })
                    {
                        self.report(error);
                    }
                }
                tracing::debug!(%host, %error, "template instantiation rolled back");
                return Err(match error {
                    TreeError::Template { .. } => error,
                    other => TreeError::template(host, other.to_string()),
                });
            }
        };

        self.core.borrow_mut().data_mut(host)?.template = Some(TemplateInstance { root, bindings });
        tracing::debug!(%host, %root, parts = created.len(), "template applied");
        self.dispatch(vec![Event::TemplateApplied(host)]);
        Ok(Some(root))
    }

    fn teardown(&self, host: ElementId, instance: TemplateInstance) {
        for binding in instance.bindings {
            self.unbind(binding);
        }
        let root = instance.root;
        // The root goes wherever it was moved to.
        if self.contains(root)
            && let Err(error) = self.run_now(Mutation::Destroy { element: root })
        {
            self.report(error);
        }
        tracing::debug!(%host, %root, "template torn down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;
    use trellis_property::{PropertyMetadataBuilder, PropertyRegistry};

    static HOST: ElementKind = ElementKind::new("TemplateHost");
    static PART: ElementKind = ElementKind::new("TemplatePart");

    struct Props {
        template: Property<Option<ControlTemplate>>,
        label: Property<String>,
        text: Property<String>,
    }

    fn setup() -> (ElementTree, Props) {
        let registry: &'static PropertyRegistry = Box::leak(Box::new(PropertyRegistry::new()));
        let props = Props {
            template: registry
                .register(&HOST, "Template", PropertyMetadataBuilder::new(None).build())
                .unwrap(),
            label: registry
                .register(&HOST, "Label", PropertyMetadataBuilder::new(String::new()).build())
                .unwrap(),
            text: registry
                .register(&PART, "Text", PropertyMetadataBuilder::new(String::new()).build())
                .unwrap(),
        };
        (ElementTree::with_registry(registry), props)
    }

    #[test]
    fn assigning_a_template_instantiates_it_once() {
        let (tree, p) = setup();
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let text = p.text;
        let template = ControlTemplate::new(move |cx: &mut TemplateContext<'_>| {
            counter.set(counter.get() + 1);
            let part = cx.create_named(&PART, "PART_Text");
            cx.set_local(part, text, "hello".into())?;
            Ok(part)
        });
        let host = tree.create(&HOST);
        tree.set_local(host, p.template, Some(template.clone())).unwrap();
        tree.set_local(host, p.template, Some(template)).unwrap();
        assert_eq!(calls.get(), 1);

        let part = tree.find_template_child(host, "PART_Text").unwrap();
        assert_eq!(tree.template_root(host).unwrap(), Some(part));
        assert_eq!(tree.parent(part).unwrap(), Some(host));
        assert_eq!(tree.templated_parent(part).unwrap(), Some(host));
        assert_eq!(tree.get(part, p.text).unwrap(), "hello");
    }

    #[test]
    fn clearing_the_template_tears_down_content() {
        let (tree, p) = setup();
        let label = p.label;
        let text = p.text;
        let template = ControlTemplate::new(move |cx: &mut TemplateContext<'_>| {
            let part = cx.create(&PART);
            cx.bind_to_host(label, part, text, BindingMode::OneWay)?;
            Ok(part)
        });
        let host = tree.create(&HOST);
        tree.set_local(host, p.template, Some(template)).unwrap();
        let root = tree.template_root(host).unwrap().unwrap();
        assert_eq!(tree.binding_count(), 1);

        tree.clear_local(host, p.template).unwrap();
        assert_eq!(tree.template_root(host).unwrap(), None);
        assert!(!tree.contains(root));
        assert_eq!(tree.binding_count(), 0);
        assert!(tree.children(host).unwrap().is_empty());
    }

    #[test]
    fn moved_content_is_torn_down_with_its_template() {
        let (tree, p) = setup();
        let template = ControlTemplate::new(|cx: &mut TemplateContext<'_>| Ok(cx.create(&PART)));
        let host = tree.create(&HOST);
        let elsewhere = tree.create(&PART);
        tree.set_local(host, p.template, Some(template.clone())).unwrap();
        let root = tree.template_root(host).unwrap().unwrap();
        tree.detach(root).unwrap();
        tree.append_child(elsewhere, root).unwrap();

        tree.clear_local(host, p.template).unwrap();
        assert!(!tree.contains(root));
        assert!(tree.children(elsewhere).unwrap().is_empty());

        // Destroying the host also takes content that was moved away.
        tree.set_local(host, p.template, Some(template)).unwrap();
        let root = tree.template_root(host).unwrap().unwrap();
        tree.detach(root).unwrap();
        tree.destroy(host).unwrap();
        assert!(!tree.contains(root));
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn bind_to_host_fails_for_inapplicable_property() {
        let (tree, p) = setup();
        let text = p.text;
        // `Text` is owned by PART, so the host cannot be a binding source for it.
        let template = ControlTemplate::new(move |cx: &mut TemplateContext<'_>| {
            let part = cx.create(&PART);
            cx.bind_to_host(text, part, text, BindingMode::OneWay)?;
            Ok(part)
        });
        let host = tree.create(&HOST);
        let errors = Rc::new(Cell::new(0));
        let counter = errors.clone();
        tree.set_error_sink(move |e| {
            assert!(matches!(e, TreeError::Template { .. }));
            counter.set(counter.get() + 1);
        });
        tree.set_local(host, p.template, Some(template)).unwrap();
        assert_eq!(errors.get(), 1);
        assert_eq!(tree.template_root(host).unwrap(), None);
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn template_equality_is_identity() {
        let a = ControlTemplate::new(|cx: &mut TemplateContext<'_>| Ok(cx.create(&PART)));
        let b = ControlTemplate::new(|cx: &mut TemplateContext<'_>| Ok(cx.create(&PART)));
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn applied_hook_runs_after_each_instantiation() {
        let (tree, p) = setup();
        let host = tree.create(&HOST);
        let seen = Rc::new(Cell::new(0));
        let counter = seen.clone();
        tree.on_template_applied(host, move |tree, host| {
            assert!(tree.template_root(host).unwrap().is_some());
            counter.set(counter.get() + 1);
        })
        .unwrap();
        let template = ControlTemplate::new(|cx: &mut TemplateContext<'_>| Ok(cx.create(&PART)));
        tree.set_local(host, p.template, Some(template)).unwrap();
        tree.instantiate(host, p.template).unwrap();
        assert_eq!(seen.get(), 2);
    }
}
