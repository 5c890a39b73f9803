use crate::id::ItemTypeId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Identity of an item kind. Two stacks with the same key are interchangeable.
///
/// `variant` distinguishes otherwise-identical items (damage, metadata, tags).
/// Fuzzy matching ignores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemKey {
    pub item_type: ItemTypeId,
    #[serde(default)]
    pub variant: u32,
}

impl ItemKey {
    pub fn new(item_type: ItemTypeId) -> Self {
        Self {
            item_type,
            variant: 0,
        }
    }

    pub fn with_variant(item_type: ItemTypeId, variant: u32) -> Self {
        Self { item_type, variant }
    }

    /// Ignore-all fuzzy equality: same item type, any variant.
    pub fn fuzzy_eq(&self, other: &ItemKey) -> bool {
        self.item_type == other.item_type
    }
}

impl From<ItemTypeId> for ItemKey {
    fn from(item_type: ItemTypeId) -> Self {
        Self::new(item_type)
    }
}

/// "This kind of item, this many units."
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    pub key: ItemKey,
    pub quantity: u64,
}

impl ItemStack {
    pub fn new(key: impl Into<ItemKey>, quantity: u64) -> Self {
        Self {
            key: key.into(),
            quantity,
        }
    }

    /// Graph equality: compares kinds, ignores quantity.
    pub fn same_kind(&self, other: &ItemStack) -> bool {
        self.key == other.key
    }

    /// Copy of this stack with a different quantity.
    #[must_use]
    pub fn with_quantity(&self, quantity: u64) -> Self {
        Self {
            key: self.key,
            quantity,
        }
    }
}

/// A multiset of item kinds, ordered by key.
///
/// Zero-quantity entries are never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemList {
    entries: BTreeMap<ItemKey, u64>,
}

impl ItemList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, stack: ItemStack) {
        if stack.quantity == 0 {
            return;
        }
        let entry = self.entries.entry(stack.key).or_insert(0);
        *entry = entry.saturating_add(stack.quantity);
    }

    /// Remove up to `stack.quantity` units. Returns the amount actually removed.
    #[must_use = "returns the quantity actually removed, which may be less than requested"]
    pub fn remove(&mut self, stack: ItemStack) -> u64 {
        let Some(held) = self.entries.get_mut(&stack.key) else {
            return 0;
        };
        let taken = stack.quantity.min(*held);
        *held -= taken;
        if *held == 0 {
            self.entries.remove(&stack.key);
        }
        taken
    }

    pub fn quantity(&self, key: ItemKey) -> u64 {
        self.entries.get(&key).copied().unwrap_or(0)
    }

    pub fn find_precise(&self, key: ItemKey) -> Option<ItemStack> {
        self.entries.get(&key).map(|&q| ItemStack::new(key, q))
    }

    /// Every held variant of `key`'s item type.
    pub fn find_fuzzy(&self, key: ItemKey) -> Vec<ItemStack> {
        let lo = ItemKey::with_variant(key.item_type, 0);
        let hi = ItemKey::with_variant(key.item_type, u32::MAX);
        self.entries
            .range(lo..=hi)
            .map(|(&k, &q)| ItemStack::new(k, q))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = ItemStack> + '_ {
        self.entries.iter().map(|(&k, &q)| ItemStack::new(k, q))
    }

    pub fn total(&self) -> u64 {
        self.entries.values().fold(0u64, |acc, &q| acc.saturating_add(q))
    }

    pub fn kinds(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl FromIterator<ItemStack> for ItemList {
    fn from_iter<T: IntoIterator<Item = ItemStack>>(iter: T) -> Self {
        let mut list = ItemList::new();
        for stack in iter {
            list.add(stack);
        }
        list
    }
}
