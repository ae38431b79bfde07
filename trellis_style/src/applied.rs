// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The styled value layer of one element.
//!
//! Every matching rule contributes one entry per setter. At most one entry
//! per `(property, rule)` pair exists; the entry with the highest
//! [`StyleRank`] is the element's styled value for that property.

use smallvec::SmallVec;
use trellis_property::{ErasedValue, PropertyId};

use crate::stylesheet::{RuleId, StyleRank};

/// One rule's contribution to one property.
#[derive(Clone, Debug, PartialEq)]
pub struct AppliedEntry {
    /// Target property.
    pub property: PropertyId,
    /// Precedence of the contributing rule.
    pub rank: StyleRank,
    /// The value the rule supplies.
    pub value: ErasedValue,
}

/// Styled values applied to one element.
///
/// # Example
///
/// ```rust
/// use trellis_property::{ErasedValue, PropertyId};
/// use trellis_style::{AppliedStyles, Selector, Style, Styles};
///
/// let mut styles = Styles::new();
/// let base = styles.add_rule(Selector::any(), Style::default());
/// let wide = styles.add_rule(Selector::any().class("wide"), Style::default());
///
/// let width = PropertyId::new(0);
/// let mut applied = AppliedStyles::default();
/// applied.set_styled(width, styles.get(base).unwrap().rank(), ErasedValue::new(1.0_f64));
/// applied.set_styled(width, styles.get(wide).unwrap().rank(), ErasedValue::new(9.0_f64));
/// assert_eq!(applied.value(width), Some(&ErasedValue::new(9.0_f64)));
///
/// applied.clear_styled(width, wide);
/// assert_eq!(applied.value(width), Some(&ErasedValue::new(1.0_f64)));
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AppliedStyles {
    /// Sorted by property, then rank.
    entries: SmallVec<[AppliedEntry; 4]>,
}

impl AppliedStyles {
    /// Returns `true` if no styled values are applied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of `(property, rule)` entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    fn position(&self, property: PropertyId, rank: StyleRank) -> Result<usize, usize> {
        self.entries
            .binary_search_by(|entry| (entry.property, entry.rank).cmp(&(property, rank)))
    }

    /// Installs a rule's value for `property`, replacing that rule's previous value.
    pub fn set_styled(&mut self, property: PropertyId, rank: StyleRank, value: ErasedValue) {
        if let Some(idx) = self.find_rule(property, rank.rule) {
            self.entries.remove(idx);
        }
        let entry = AppliedEntry {
            property,
            rank,
            value,
        };
        match self.position(property, rank) {
            Ok(idx) => self.entries[idx] = entry,
            Err(idx) => self.entries.insert(idx, entry),
        }
    }

    fn find_rule(&self, property: PropertyId, rule: RuleId) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.property == property && entry.rank.rule == rule)
    }

    /// Withdraws a rule's value for `property`. Returns `true` if one was applied.
    pub fn clear_styled(&mut self, property: PropertyId, rule: RuleId) -> bool {
        match self.find_rule(property, rule) {
            Some(idx) => {
                self.entries.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Withdraws every value contributed by `rule`, returning the affected properties.
    pub fn clear_rule(&mut self, rule: RuleId) -> Vec<PropertyId> {
        let mut affected = Vec::new();
        self.entries.retain(|entry| {
            if entry.rank.rule == rule {
                affected.push(entry.property);
                false
            } else {
                true
            }
        });
        affected
    }

    /// The winning styled value for `property`.
    #[must_use]
    pub fn value(&self, property: PropertyId) -> Option<&ErasedValue> {
        self.winner(property).map(|entry| &entry.value)
    }

    /// The winning entry for `property`.
    #[must_use]
    pub fn winner(&self, property: PropertyId) -> Option<&AppliedEntry> {
        // Entries for one property are contiguous and rank-ascending.
        let end = self
            .entries
            .partition_point(|entry| entry.property <= property);
        end.checked_sub(1)
            .map(|idx| &self.entries[idx])
            .filter(|entry| entry.property == property)
    }

    /// Properties with at least one styled value, ascending and unique.
    #[must_use]
    pub fn properties(&self) -> Vec<PropertyId> {
        let mut ids: Vec<_> = self.entries.iter().map(|entry| entry.property).collect();
        ids.dedup();
        ids
    }

    /// Rules contributing at least one value.
    #[must_use]
    pub fn rules(&self) -> Vec<RuleId> {
        let mut rules: Vec<_> = self.entries.iter().map(|entry| entry.rank.rule).collect();
        rules.sort_unstable();
        rules.dedup();
        rules
    }

    /// All entries, sorted by property then rank.
    pub fn entries(&self) -> impl Iterator<Item = &AppliedEntry> + '_ {
        self.entries.iter()
    }

    /// Removes everything, returning the properties that had styled values.
    pub fn clear(&mut self) -> Vec<PropertyId> {
        let properties = self.properties();
        self.entries.clear();
        properties
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::{Selector, Specificity};
    use crate::style::Style;
    use crate::stylesheet::Styles;

    fn ranks() -> (StyleRank, StyleRank, StyleRank) {
        let mut styles = Styles::new();
        let typed = styles.add_rule(Selector::any().class("t"), Style::default());
        let early = styles.add_rule(Selector::any(), Style::default());
        let late = styles.add_rule(Selector::any(), Style::default());
        let rank = |id| styles.get(id).unwrap().rank();
        (rank(typed), rank(early), rank(late))
    }

    fn v(x: i32) -> ErasedValue {
        ErasedValue::new(x)
    }

    #[test]
    fn highest_rank_wins_per_property() {
        let (class, early, late) = ranks();
        let a = PropertyId::new(1);
        let b = PropertyId::new(2);
        let mut applied = AppliedStyles::default();
        applied.set_styled(a, late, v(3));
        applied.set_styled(a, early, v(2));
        applied.set_styled(a, class, v(1));
        applied.set_styled(b, early, v(20));

        assert_eq!(applied.value(a), Some(&v(1)));
        assert_eq!(applied.value(b), Some(&v(20)));
        assert_eq!(applied.value(PropertyId::new(0)), None);
        assert_eq!(applied.value(PropertyId::new(3)), None);
        assert_eq!(applied.properties(), vec![a, b]);
        assert_eq!(applied.winner(a).unwrap().rank.specificity, Specificity(0, 1, 0));
    }

    #[test]
    fn later_declaration_wins_equal_specificity() {
        let (_, early, late) = ranks();
        let a = PropertyId::new(1);
        let mut applied = AppliedStyles::default();
        applied.set_styled(a, late, v(2));
        applied.set_styled(a, early, v(1));
        assert_eq!(applied.value(a), Some(&v(2)));
    }

    #[test]
    fn one_entry_per_property_and_rule() {
        let (_, early, _) = ranks();
        let a = PropertyId::new(1);
        let mut applied = AppliedStyles::default();
        applied.set_styled(a, early, v(1));
        applied.set_styled(a, early, v(5));
        assert_eq!(applied.len(), 1);
        assert_eq!(applied.value(a), Some(&v(5)));
    }

    #[test]
    fn clearing_falls_back_to_the_next_rank() {
        let (class, early, _) = ranks();
        let a = PropertyId::new(1);
        let mut applied = AppliedStyles::default();
        applied.set_styled(a, early, v(1));
        applied.set_styled(a, class, v(2));
        assert!(applied.clear_styled(a, class.rule));
        assert!(!applied.clear_styled(a, class.rule));
        assert_eq!(applied.value(a), Some(&v(1)));
    }

    #[test]
    fn clear_rule_reports_affected_properties() {
        let (class, early, _) = ranks();
        let mut applied = AppliedStyles::default();
        applied.set_styled(PropertyId::new(1), early, v(1));
        applied.set_styled(PropertyId::new(2), early, v(2));
        applied.set_styled(PropertyId::new(2), class, v(3));
        assert_eq!(applied.rules(), vec![class.rule, early.rule]);
        assert_eq!(
            applied.clear_rule(early.rule),
            vec![PropertyId::new(1), PropertyId::new(2)]
        );
        assert_eq!(applied.properties(), vec![PropertyId::new(2)]);
        assert_eq!(applied.clear(), vec![PropertyId::new(2)]);
        assert!(applied.is_empty());
    }
}
