//! Presentable crafting plans and the reservation sink filled on commit.
//!
//! A [`Plan`] is a flattened, per-item summary of a resolved tree: what is
//! taken from stock, what will be crafted, what will be emitted, and what is
//! missing. Plans can be shipped to another process with [`Plan::to_bytes`].

use crate::id::RecipeId;
use crate::item::{ItemKey, ItemList, ItemStack};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Magic number identifying an encoded plan.
pub const PLAN_MAGIC: u32 = 0x9C0C_0001;

/// Current plan format version.
pub const PLAN_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanEntry {
    pub from_stock: u64,
    pub to_craft: u64,
    pub to_emit: u64,
    pub missing: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    entries: BTreeMap<ItemKey, PlanEntry>,
}

impl Plan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_from_stock(&mut self, stack: ItemStack) {
        let entry = self.entry(stack.key);
        entry.from_stock = entry.from_stock.saturating_add(stack.quantity);
    }

    pub fn add_to_craft(&mut self, stack: ItemStack) {
        let entry = self.entry(stack.key);
        entry.to_craft = entry.to_craft.saturating_add(stack.quantity);
    }

    pub fn add_to_emit(&mut self, stack: ItemStack) {
        let entry = self.entry(stack.key);
        entry.to_emit = entry.to_emit.saturating_add(stack.quantity);
    }

    pub fn add_missing(&mut self, stack: ItemStack) {
        let entry = self.entry(stack.key);
        entry.missing = entry.missing.saturating_add(stack.quantity);
    }

    fn entry(&mut self, key: ItemKey) -> &mut PlanEntry {
        self.entries.entry(key).or_default()
    }

    pub fn get(&self, key: ItemKey) -> PlanEntry {
        self.entries.get(&key).copied().unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ItemKey, PlanEntry)> + '_ {
        self.entries.iter().map(|(&k, &e)| (k, e))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn missing(&self) -> ItemList {
        self.iter()
            .map(|(key, e)| ItemStack::new(key, e.missing))
            .collect()
    }

    /// Encode with a magic + version header.
    pub fn to_bytes(&self) -> Result<Vec<u8>, PlanEncodeError> {
        let encoded = EncodedPlan {
            magic: PLAN_MAGIC,
            version: PLAN_FORMAT_VERSION,
            plan: self.clone(),
        };
        bitcode::serialize(&encoded).map_err(|e| PlanEncodeError(e.to_string()))
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, PlanDecodeError> {
        let decoded: EncodedPlan =
            bitcode::deserialize(data).map_err(|e| PlanDecodeError::Decode(e.to_string()))?;
        if decoded.magic != PLAN_MAGIC {
            return Err(PlanDecodeError::InvalidMagic(decoded.magic));
        }
        if decoded.version != PLAN_FORMAT_VERSION {
            return Err(PlanDecodeError::UnsupportedVersion(decoded.version));
        }
        Ok(decoded.plan)
    }
}

#[derive(Serialize, Deserialize)]
struct EncodedPlan {
    magic: u32,
    version: u32,
    plan: Plan,
}

#[derive(Debug, thiserror::Error)]
#[error("bitcode encoding failed: {0}")]
pub struct PlanEncodeError(String);

#[derive(Debug, thiserror::Error)]
pub enum PlanDecodeError {
    #[error("invalid magic number: expected 0x{:08X}, got 0x{:08X}", PLAN_MAGIC, .0)]
    InvalidMagic(u32),
    #[error("unsupported plan version: expected {}, got {}", PLAN_FORMAT_VERSION, .0)]
    UnsupportedVersion(u32),
    #[error("bitcode decoding failed: {0}")]
    Decode(String),
}

/// Receives real resource custody when a plan is committed.
pub trait ReservationSink {
    /// Units extracted from stock on behalf of the job.
    fn add_storage(&mut self, stack: ItemStack);
    /// Units the job will produce from an infinite source.
    fn add_emitted(&mut self, stack: ItemStack);
    /// A recipe the job must run `runs` times.
    fn add_crafting(&mut self, recipe: RecipeId, runs: u64);
}

/// The default sink: just collects everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reservation {
    pub storage: ItemList,
    pub emitted: ItemList,
    pub crafting: Vec<(RecipeId, u64)>,
}

impl Reservation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total runs scheduled for `recipe`.
    pub fn runs_of(&self, recipe: RecipeId) -> u64 {
        self.crafting
            .iter()
            .filter(|(r, _)| *r == recipe)
            .map(|(_, n)| n)
            .sum()
    }
}

impl ReservationSink for Reservation {
    fn add_storage(&mut self, stack: ItemStack) {
        self.storage.add(stack);
    }

    fn add_emitted(&mut self, stack: ItemStack) {
        self.emitted.add(stack);
    }

    fn add_crafting(&mut self, recipe: RecipeId, runs: u64) {
        self.crafting.push((recipe, runs));
    }
}
