//! Append-only record of stock units claimed by a demand.
//!
//! A refund never edits or removes an earlier entry; it appends a
//! [`LedgerEntry::Refund`]. The net take per item kind is always the sum of
//! takes minus the sum of refunds for that kind.

use crate::item::{ItemKey, ItemStack};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerEntry {
    Take(ItemStack),
    Refund(ItemStack),
}

impl LedgerEntry {
    pub fn stack(&self) -> ItemStack {
        match self {
            LedgerEntry::Take(s) | LedgerEntry::Refund(s) => *s,
        }
    }

    /// Signed contribution of this entry to the net take.
    pub fn signed_quantity(&self) -> i128 {
        match self {
            LedgerEntry::Take(s) => i128::from(s.quantity),
            LedgerEntry::Refund(s) => -i128::from(s.quantity),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsageLedger {
    entries: Vec<LedgerEntry>,
}

impl UsageLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&mut self, stack: ItemStack) {
        if stack.quantity > 0 {
            self.entries.push(LedgerEntry::Take(stack));
        }
    }

    pub fn refund(&mut self, stack: ItemStack) {
        if stack.quantity > 0 {
            self.entries.push(LedgerEntry::Refund(stack));
        }
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    /// Net units taken across all kinds.
    pub fn net_quantity(&self) -> i128 {
        self.entries.iter().map(LedgerEntry::signed_quantity).sum()
    }

    /// Net units taken of one kind.
    pub fn net(&self, key: ItemKey) -> i128 {
        self.entries
            .iter()
            .filter(|e| e.stack().key == key)
            .map(LedgerEntry::signed_quantity)
            .sum()
    }

    /// Kinds with a positive net take, in order of first appearance.
    pub fn net_stacks(&self) -> Vec<ItemStack> {
        let mut order: Vec<ItemKey> = Vec::new();
        for entry in &self.entries {
            let key = entry.stack().key;
            if !order.contains(&key) {
                order.push(key);
            }
        }
        order
            .into_iter()
            .filter_map(|key| {
                let net = self.net(key);
                (net > 0).then(|| ItemStack::new(key, u64::try_from(net).unwrap_or(u64::MAX)))
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop all entries. Only used when a tree is reset for a fresh pass.
    pub(crate) fn reset(&mut self) {
        self.entries.clear();
    }
}
