//! Transactional inventory views.
//!
//! A [`MemoryInventory`] holds real stock. A [`NestedView`] overlays any other
//! view: extractions and injections against it are provisional until
//! [`NestedView::commit`] applies them to the parent. Dropping a nested view
//! discards everything done through it.

use crate::item::{ItemKey, ItemList, ItemStack};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Whether an extraction really takes items or only reports what it would take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actionable {
    Simulate,
    Modulate,
}

/// Who is acting on an inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ActionSource {
    #[default]
    Planner,
    Actor(u32),
}

pub trait InventoryView {
    /// Extract up to `request.quantity` units of `request.key`.
    /// Returns `None` when nothing is available.
    fn extract(
        &mut self,
        request: &ItemStack,
        mode: Actionable,
        src: &ActionSource,
    ) -> Option<ItemStack>;

    fn inject(&mut self, stack: &ItemStack, src: &ActionSource);

    fn available(&self, key: ItemKey) -> u64;

    /// Snapshot of everything currently available, for exact and fuzzy lookup.
    fn contents(&self) -> ItemList;
}

/// Root inventory backed by an [`ItemList`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryInventory {
    items: ItemList,
}

impl MemoryInventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_list(items: ItemList) -> Self {
        Self { items }
    }

    pub fn insert(&mut self, stack: ItemStack) {
        self.items.add(stack);
    }

    pub fn items(&self) -> &ItemList {
        &self.items
    }
}

impl FromIterator<ItemStack> for MemoryInventory {
    fn from_iter<T: IntoIterator<Item = ItemStack>>(iter: T) -> Self {
        Self::from_list(iter.into_iter().collect())
    }
}

impl InventoryView for MemoryInventory {
    fn extract(
        &mut self,
        request: &ItemStack,
        mode: Actionable,
        src: &ActionSource,
    ) -> Option<ItemStack> {
        let held = self.items.quantity(request.key);
        let taken = request.quantity.min(held);
        if taken == 0 {
            return None;
        }
        if mode == Actionable::Modulate {
            let _ = self.items.remove(request.with_quantity(taken));
        }
        tracing::trace!(key = ?request.key, requested = request.quantity, taken, ?mode, ?src, "extract");
        Some(request.with_quantity(taken))
    }

    fn inject(&mut self, stack: &ItemStack, _src: &ActionSource) {
        self.items.add(*stack);
    }

    fn available(&self, key: ItemKey) -> u64 {
        self.items.quantity(key)
    }

    fn contents(&self) -> ItemList {
        self.items.clone()
    }
}

/// Provisional overlay over a parent view.
pub struct NestedView<'a> {
    parent: &'a mut dyn InventoryView,
    /// Signed change per kind relative to the parent.
    delta: BTreeMap<ItemKey, i128>,
}

impl<'a> NestedView<'a> {
    pub fn new(parent: &'a mut dyn InventoryView) -> Self {
        Self {
            parent,
            delta: BTreeMap::new(),
        }
    }

    /// Pending net change for one kind (negative means extracted).
    pub fn pending(&self, key: ItemKey) -> i128 {
        self.delta.get(&key).copied().unwrap_or(0)
    }

    /// Apply every pending change to the parent.
    ///
    /// Returns `false`, leaving the parent untouched, if the parent can no
    /// longer supply some pending extraction in full.
    #[must_use = "a failed commit leaves the parent unchanged"]
    pub fn commit(self, src: &ActionSource) -> bool {
        let NestedView { parent, delta } = self;

        for (&key, &d) in &delta {
            if d < 0 {
                let wanted = clamp_u64(-d);
                let probe = parent.extract(&ItemStack::new(key, wanted), Actionable::Simulate, src);
                if probe.map(|s| s.quantity) != Some(wanted) {
                    tracing::debug!(?key, wanted, "nested view commit rejected");
                    return false;
                }
            }
        }

        for (&key, &d) in &delta {
            if d < 0 {
                let _ = parent.extract(&ItemStack::new(key, clamp_u64(-d)), Actionable::Modulate, src);
            } else if d > 0 {
                parent.inject(&ItemStack::new(key, clamp_u64(d)), src);
            }
        }
        true
    }
}

fn clamp_u64(v: i128) -> u64 {
    u64::try_from(v.max(0)).unwrap_or(u64::MAX)
}

impl InventoryView for NestedView<'_> {
    fn extract(
        &mut self,
        request: &ItemStack,
        mode: Actionable,
        _src: &ActionSource,
    ) -> Option<ItemStack> {
        let taken = request.quantity.min(self.available(request.key));
        if taken == 0 {
            return None;
        }
        if mode == Actionable::Modulate {
            *self.delta.entry(request.key).or_insert(0) -= i128::from(taken);
        }
        Some(request.with_quantity(taken))
    }

    fn inject(&mut self, stack: &ItemStack, _src: &ActionSource) {
        if stack.quantity > 0 {
            *self.delta.entry(stack.key).or_insert(0) += i128::from(stack.quantity);
        }
    }

    fn available(&self, key: ItemKey) -> u64 {
        clamp_u64(i128::from(self.parent.available(key)) + self.pending(key))
    }

    fn contents(&self) -> ItemList {
        let mut list = self.parent.contents();
        for (&key, &d) in &self.delta {
            if d < 0 {
                let _ = list.remove(ItemStack::new(key, clamp_u64(-d)));
            } else {
                list.add(ItemStack::new(key, clamp_u64(d)));
            }
        }
        list
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::ItemTypeId;

    fn iron() -> ItemKey {
        ItemKey::new(ItemTypeId(0))
    }
    fn gear() -> ItemKey {
        ItemKey::new(ItemTypeId(1))
    }
    fn src() -> ActionSource {
        ActionSource::Planner
    }

    fn stock(iron_qty: u64) -> MemoryInventory {
        [ItemStack::new(iron(), iron_qty)].into_iter().collect()
    }

    #[test]
    fn extract_is_partial() {
        let mut inv = stock(3);
        let got = inv.extract(&ItemStack::new(iron(), 10), Actionable::Modulate, &src());
        assert_eq!(got, Some(ItemStack::new(iron(), 3)));
        assert_eq!(inv.available(iron()), 0);
        assert!(inv.extract(&ItemStack::new(iron(), 1), Actionable::Modulate, &src()).is_none());
    }

    #[test]
    fn simulate_does_not_take() {
        let mut inv = stock(5);
        let got = inv.extract(&ItemStack::new(iron(), 2), Actionable::Simulate, &src());
        assert_eq!(got.map(|s| s.quantity), Some(2));
        assert_eq!(inv.available(iron()), 5);
    }

    #[test]
    fn dropped_nested_view_is_discarded() {
        let mut inv = stock(5);
        {
            let mut nested = NestedView::new(&mut inv);
            let got = nested.extract(&ItemStack::new(iron(), 4), Actionable::Modulate, &src());
            assert_eq!(got.map(|s| s.quantity), Some(4));
            nested.inject(&ItemStack::new(gear(), 2), &src());
            assert_eq!(nested.available(iron()), 1);
            assert_eq!(nested.available(gear()), 2);
        }
        assert_eq!(inv.available(iron()), 5);
        assert_eq!(inv.available(gear()), 0);
    }

    #[test]
    fn committed_nested_view_applies_to_parent() {
        let mut inv = stock(5);
        let mut nested = NestedView::new(&mut inv);
        let _ = nested.extract(&ItemStack::new(iron(), 4), Actionable::Modulate, &src());
        nested.inject(&ItemStack::new(gear(), 2), &src());
        assert!(nested.commit(&src()));
        assert_eq!(inv.available(iron()), 1);
        assert_eq!(inv.available(gear()), 2);
    }

    #[test]
    fn nested_views_stack() {
        let mut inv = stock(6);
        let mut outer = NestedView::new(&mut inv);
        let _ = outer.extract(&ItemStack::new(iron(), 2), Actionable::Modulate, &src());
        {
            let mut inner = NestedView::new(&mut outer);
            assert_eq!(inner.available(iron()), 4);
            let _ = inner.extract(&ItemStack::new(iron(), 4), Actionable::Modulate, &src());
            assert!(inner.commit(&src()));
        }
        assert_eq!(outer.available(iron()), 0);
        drop(outer);
        assert_eq!(inv.available(iron()), 6);
    }

    #[test]
    fn injected_items_can_be_extracted_in_the_same_view() {
        let mut inv = MemoryInventory::new();
        let mut nested = NestedView::new(&mut inv);
        nested.inject(&ItemStack::new(gear(), 3), &src());
        let got = nested.extract(&ItemStack::new(gear(), 5), Actionable::Modulate, &src());
        assert_eq!(got.map(|s| s.quantity), Some(3));
        assert_eq!(nested.pending(gear()), 0);
        assert!(nested.contents().is_empty());
    }

    #[test]
    fn contents_reflect_pending_changes() {
        let mut inv = stock(5);
        let mut nested = NestedView::new(&mut inv);
        let _ = nested.extract(&ItemStack::new(iron(), 2), Actionable::Modulate, &src());
        nested.inject(&ItemStack::new(gear(), 1), &src());
        let contents = nested.contents();
        assert_eq!(contents.quantity(iron()), 3);
        assert_eq!(contents.quantity(gear()), 1);
    }
}
