// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-element data and the generational arena that owns it.

use trellis_property::{ElementKind, ErasedValue, PropertyId, PropertyStore};
use trellis_style::AppliedStyles;

use crate::classes::Classes;
use crate::id::ElementId;
use crate::template::TemplateInstance;

bitflags::bitflags! {
    /// Element lifecycle flags.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ElementFlags: u8 {
        /// The element is under an attached root and participates in styling.
        const ATTACHED = 0b0000_0001;
        /// The element was created by a template for its templated parent.
        const TEMPLATE_PART = 0b0000_0010;
    }
}

#[derive(Debug)]
pub(crate) struct ElementData {
    pub(crate) kind: &'static ElementKind,
    pub(crate) name: Option<String>,
    pub(crate) classes: Classes,
    pub(crate) parent: Option<ElementId>,
    pub(crate) children: Vec<ElementId>,
    pub(crate) flags: ElementFlags,
    pub(crate) store: PropertyStore<ElementId>,
    pub(crate) styles: AppliedStyles,
    pub(crate) templated_parent: Option<ElementId>,
    pub(crate) template: Option<TemplateInstance>,
}

impl ElementData {
    pub(crate) fn is_attached(&self) -> bool {
        self.flags.contains(ElementFlags::ATTACHED)
    }

    /// Local value, else the winning styled value.
    pub(crate) fn own_value(&self, id: PropertyId) -> Option<&ErasedValue> {
        self.store.local(id).or_else(|| self.styles.value(id))
    }
}

/// Slot storage with generation counters and a free list.
#[derive(Debug, Default)]
pub(crate) struct Arena {
    slots: Vec<Option<ElementData>>,
    generations: Vec<u32>,
    free_list: Vec<usize>,
}

impl Arena {
    pub(crate) fn insert(&mut self, build: impl FnOnce(ElementId) -> ElementData) -> ElementId {
        let (idx, generation) = match self.free_list.pop() {
            Some(idx) => {
                self.generations[idx] = self.generations[idx].wrapping_add(1);
                (idx, self.generations[idx])
            }
            None => {
                self.slots.push(None);
                self.generations.push(1);
                (self.slots.len() - 1, 1)
            }
        };
        #[expect(clippy::cast_possible_truncation, reason = "slot count stays below u32::MAX")]
        let id = ElementId::new(idx as u32, generation);
        self.slots[idx] = Some(build(id));
        id
    }

    pub(crate) fn contains(&self, id: ElementId) -> bool {
        self.get(id).is_some()
    }

    pub(crate) fn get(&self, id: ElementId) -> Option<&ElementData> {
        if self.generations.get(id.idx()) != Some(&id.generation()) {
            return None;
        }
        self.slots.get(id.idx())?.as_ref()
    }

    pub(crate) fn get_mut(&mut self, id: ElementId) -> Option<&mut ElementData> {
        if self.generations.get(id.idx()) != Some(&id.generation()) {
            return None;
        }
        self.slots.get_mut(id.idx())?.as_mut()
    }

    pub(crate) fn remove(&mut self, id: ElementId) -> Option<ElementData> {
        if self.generations.get(id.idx()) != Some(&id.generation()) {
            return None;
        }
        let data = self.slots.get_mut(id.idx())?.take()?;
        self.free_list.push(id.idx());
        Some(data)
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len() - self.free_list.len()
    }

    /// Live ids in slot order.
    pub(crate) fn ids(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.slots.iter().enumerate().filter_map(|(idx, slot)| {
            slot.as_ref()?;
            #[expect(clippy::cast_possible_truncation, reason = "slot count stays below u32::MAX")]
            let id = ElementId::new(idx as u32, self.generations[idx]);
            Some(id)
        })
    }

    /// `root` and its descendants, pre-order.
    pub(crate) fn subtree(&self, root: ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(data) = self.get(id) else {
                continue;
            };
            out.push(id);
            stack.extend(data.children.iter().rev().copied());
        }
        out
    }

    /// Strict ancestors of `id`, nearest first.
    pub(crate) fn ancestors(&self, id: ElementId) -> impl Iterator<Item = ElementId> + '_ {
        core::iter::successors(self.get(id).and_then(|d| d.parent), |p| {
            self.get(*p).and_then(|d| d.parent)
        })
    }
}
