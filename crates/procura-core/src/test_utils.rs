//! Shared test helpers for unit tests, integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]`. Every fixture
//! catalog registers the same item list in the same order, so the item
//! constructors below are valid for all of them.

use crate::catalog::{Catalog, CatalogBuilder, RecipeDetails, RecipeSlot};
use crate::context::{JobHandle, ResolutionContext};
use crate::error::CraftError;
use crate::id::{ItemTypeId, RecipeId};
use crate::inventory::{ActionSource, Actionable, InventoryView, MemoryInventory};
use crate::item::{ItemKey, ItemList, ItemStack};

// ===========================================================================
// Item constructors
// ===========================================================================

pub const ITEM_NAMES: &[&str] = &[
    "iron_ore",
    "iron_plate",
    "gear",
    "coal",
    "charcoal",
    "stick",
    "torch",
    "log",
    "plank",
    "seed",
    "water",
    "ice",
];

fn key(index: u32) -> ItemKey {
    ItemKey::new(ItemTypeId(index))
}

pub fn iron_ore() -> ItemKey {
    key(0)
}
pub fn iron_plate() -> ItemKey {
    key(1)
}
pub fn gear() -> ItemKey {
    key(2)
}
pub fn coal() -> ItemKey {
    key(3)
}
pub fn charcoal() -> ItemKey {
    key(4)
}
pub fn stick() -> ItemKey {
    key(5)
}
pub fn torch() -> ItemKey {
    key(6)
}
pub fn log() -> ItemKey {
    key(7)
}
pub fn plank() -> ItemKey {
    key(8)
}
pub fn seed() -> ItemKey {
    key(9)
}
pub fn water() -> ItemKey {
    key(10)
}
pub fn ice() -> ItemKey {
    key(11)
}

// ===========================================================================
// Stock helpers
// ===========================================================================

pub fn stock(items: &[(ItemKey, u64)]) -> MemoryInventory {
    items.iter().map(|&(k, q)| ItemStack::new(k, q)).collect()
}

pub fn slot(item: ItemKey, quantity: u64) -> RecipeSlot {
    RecipeSlot::exact(ItemStack::new(item, quantity))
}

// ===========================================================================
// Catalog fixtures
// ===========================================================================

/// A builder with every fixture item registered.
pub fn base_builder() -> CatalogBuilder {
    let mut b = CatalogBuilder::new();
    for name in ITEM_NAMES {
        b.register_item(name);
    }
    b
}

/// ore -> plate (1:1), 2 plates -> gear.
pub fn gear_catalog() -> Catalog {
    let mut b = base_builder();
    b.register_recipe("smelt_iron", vec![slot(iron_ore(), 1)], vec![ItemStack::new(iron_plate(), 1)]);
    b.register_recipe("press_gear", vec![slot(iron_plate(), 2)], vec![ItemStack::new(gear(), 1)]);
    b.build().expect("gear catalog")
}

/// Gears from a plate + coal mold (tried first) or from two plates.
pub fn fallback_catalog() -> Catalog {
    let mut b = base_builder();
    b.register_recipe(
        "mold_gear",
        vec![slot(iron_plate(), 1), slot(coal(), 1)],
        vec![ItemStack::new(gear(), 1)],
    );
    b.register_recipe("press_gear", vec![slot(iron_plate(), 2)], vec![ItemStack::new(gear(), 1)]);
    b.build().expect("fallback catalog")
}

/// Water is emittable; the melting recipe must never be expanded.
pub fn emitter_catalog() -> Catalog {
    let mut b = base_builder();
    b.register_recipe("melt_ice", vec![slot(ice(), 1)], vec![ItemStack::new(water(), 1)]);
    b.register_emitter(water());
    b.build().expect("emitter catalog")
}

/// A seed and water grow into two seeds.
pub fn self_feeding_catalog() -> Catalog {
    let mut b = base_builder();
    b.register_recipe(
        "grow_seed",
        vec![slot(seed(), 1), slot(water(), 1)],
        vec![ItemStack::new(seed(), 2)],
    );
    b.build().expect("self-feeding catalog")
}

/// Logs saw into planks and planks glue back into logs.
pub fn mutual_catalog() -> Catalog {
    let mut b = base_builder();
    b.register_recipe("saw_log", vec![slot(log(), 1)], vec![ItemStack::new(plank(), 4)]);
    b.register_recipe("glue_planks", vec![slot(plank(), 4)], vec![ItemStack::new(log(), 1)]);
    b.build().expect("mutual catalog")
}

/// Torches from coal (or charcoal) and a stick, sticks from planks, planks
/// from logs.
pub fn torch_catalog() -> Catalog {
    let mut b = base_builder();
    b.register_recipe(
        "torch",
        vec![
            RecipeSlot::with_substitutes(ItemStack::new(coal(), 1), vec![charcoal()]),
            slot(stick(), 1),
        ],
        vec![ItemStack::new(torch(), 4)],
    );
    b.register_recipe("sticks", vec![slot(plank(), 1), slot(plank(), 1)], vec![ItemStack::new(stick(), 4)]);
    b.register_recipe("saw_log", vec![slot(log(), 1)], vec![ItemStack::new(plank(), 4)]);
    b.mutate_recipe("torch", |r| {
        r.craftable = true;
        r.can_substitute = true;
    })
    .expect("torch recipe");
    b.mutate_recipe("sticks", |r| r.craftable = true)
        .expect("sticks recipe");
    b.build().expect("torch catalog")
}

// ===========================================================================
// Context
// ===========================================================================

/// A [`ResolutionContext`] that records everything it is told.
#[derive(Debug, Default)]
pub struct TestContext {
    pub handle: JobHandle,
    /// `None` accepts every claim unchanged.
    pub claims: Option<MemoryInventory>,
    pub missing: ItemList,
    pub refunded: ItemList,
    pub cost: u64,
    pub tasks: Vec<(RecipeId, u64, usize)>,
    /// Checkpoints passed so far.
    pub checkpoints: usize,
    /// Cancel the handle once this many checkpoints have passed.
    pub cancel_after: Option<usize>,
}

impl TestContext {
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Lets `checkpoints` checkpoints through, then cancels.
    pub fn cancelling_after(checkpoints: usize) -> Self {
        Self {
            cancel_after: Some(checkpoints),
            ..Self::default()
        }
    }

    pub fn with_claims(pool: MemoryInventory) -> Self {
        Self {
            claims: Some(pool),
            ..Self::default()
        }
    }
}

impl ResolutionContext for TestContext {
    fn check_pause_or_cancel(&mut self) -> Result<(), CraftError> {
        if self.cancel_after.is_some_and(|n| self.checkpoints >= n) {
            self.handle.cancel();
        }
        self.checkpoints += 1;
        self.handle.checkpoint()
    }

    fn record_missing(&mut self, stack: ItemStack) {
        self.missing.add(stack);
    }

    fn record_cost(&mut self, units: u64) {
        self.cost = self.cost.saturating_add(units);
    }

    fn refund(&mut self, stack: ItemStack) {
        self.refunded.add(stack);
        if let Some(pool) = &mut self.claims {
            pool.inject(&stack, &ActionSource::Planner);
        }
    }

    fn check_use(&mut self, stack: ItemStack) -> Option<ItemStack> {
        match &mut self.claims {
            Some(pool) => pool.extract(&stack, Actionable::Modulate, &ActionSource::Planner),
            None => Some(stack),
        }
    }

    fn record_task(&mut self, recipe: &RecipeDetails, runs: u64, depth: usize) {
        self.tasks.push((recipe.id, runs, depth));
    }
}
