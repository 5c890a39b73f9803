//! Recipe catalog: which recipes exist and which items can be emitted.
//!
//! The resolver only consumes the [`RecipeCatalog`] trait. [`Catalog`] is the
//! in-memory implementation, built once through [`CatalogBuilder`] and
//! immutable afterwards.

use crate::id::{ItemTypeId, RecipeId};
use crate::item::{ItemKey, ItemStack};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// One input position of a recipe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeSlot {
    /// The item (and per-run quantity) the slot normally takes.
    pub stack: ItemStack,
    /// Alternative items accepted when the recipe permits substitution.
    pub substitutes: Vec<ItemKey>,
    /// Accept any variant of the accepted item types.
    pub fuzzy: bool,
}

impl RecipeSlot {
    pub fn exact(stack: ItemStack) -> Self {
        Self {
            stack,
            substitutes: Vec::new(),
            fuzzy: false,
        }
    }

    pub fn with_substitutes(stack: ItemStack, substitutes: Vec<ItemKey>) -> Self {
        Self {
            stack,
            substitutes,
            fuzzy: false,
        }
    }

    #[must_use]
    pub fn fuzzy(mut self) -> Self {
        self.fuzzy = true;
        self
    }
}

/// Everything the resolver needs to know about one recipe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeDetails {
    pub id: RecipeId,
    pub name: String,
    /// Ordered input slots. Order is significant and stable.
    pub inputs: Vec<RecipeSlot>,
    pub outputs: Vec<ItemStack>,
    /// A crafting-grid recipe (as opposed to a fixed machine conversion).
    pub craftable: bool,
    /// Slots may be filled with substitutes.
    pub can_substitute: bool,
    /// Higher priority recipes are offered first.
    pub priority: i32,
}

impl RecipeDetails {
    /// Inputs merged by kind, in order of first appearance.
    pub fn condensed_inputs(&self) -> Vec<ItemStack> {
        condense(self.inputs.iter().map(|slot| slot.stack))
    }

    /// Outputs merged by kind, in order of first appearance.
    pub fn condensed_outputs(&self) -> Vec<ItemStack> {
        condense(self.outputs.iter().copied())
    }

    /// First slot whose primary item is `key`.
    pub fn first_slot_of(&self, key: ItemKey) -> Option<usize> {
        self.inputs.iter().position(|slot| slot.stack.key == key)
    }

    /// The primary item of `slot` followed by its declared substitutes.
    pub fn substitute_inputs(&self, slot: usize) -> Vec<ItemKey> {
        self.inputs
            .get(slot)
            .map(|s| {
                std::iter::once(s.stack.key)
                    .chain(s.substitutes.iter().copied())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether `key` may be placed into `slot`.
    pub fn is_valid_item_for_slot(&self, slot: usize, key: ItemKey) -> bool {
        let Some(s) = self.inputs.get(slot) else {
            return false;
        };
        let substitutes = if self.can_substitute {
            s.substitutes.as_slice()
        } else {
            &[]
        };
        std::iter::once(&s.stack.key)
            .chain(substitutes)
            .any(|a| *a == key || (s.fuzzy && a.fuzzy_eq(&key)))
    }

    /// Units of `key` produced by one run. Falls back to fuzzy matching when
    /// no output is an exact match.
    pub fn amount_crafted(&self, key: ItemKey) -> u64 {
        let outputs = self.condensed_outputs();
        outputs
            .iter()
            .find(|o| o.key == key)
            .or_else(|| outputs.iter().find(|o| o.key.fuzzy_eq(&key)))
            .map(|o| o.quantity)
            .unwrap_or(0)
    }

    /// Whether `key` appears among the primary inputs or the outputs.
    pub fn mentions(&self, key: ItemKey) -> bool {
        self.outputs.iter().any(|o| o.key == key)
            || self.inputs.iter().any(|slot| slot.stack.key == key)
    }
}

fn condense(stacks: impl Iterator<Item = ItemStack>) -> Vec<ItemStack> {
    let mut merged: Vec<ItemStack> = Vec::new();
    for stack in stacks {
        match merged.iter_mut().find(|m| m.key == stack.key) {
            Some(m) => m.quantity = m.quantity.saturating_add(stack.quantity),
            None => merged.push(stack),
        }
    }
    merged
}

/// Query interface the resolver consumes.
pub trait RecipeCatalog {
    /// Recipes able to produce `item`, in the order they should be tried.
    /// `parent` and `slot` describe where the demand sits, when it is not
    /// the top-level request.
    fn recipes_for(
        &self,
        item: ItemKey,
        parent: Option<&RecipeDetails>,
        slot: Option<usize>,
    ) -> Vec<Arc<RecipeDetails>>;

    /// Whether `item` can be produced from nothing.
    fn can_emit(&self, item: ItemKey) -> bool;
}

/// Builder for constructing an immutable [`Catalog`].
/// Three-phase lifecycle: registration -> mutation -> finalization.
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    item_names: Vec<String>,
    item_name_to_id: HashMap<String, ItemTypeId>,
    recipes: Vec<RecipeDetails>,
    recipe_name_to_id: HashMap<String, RecipeId>,
    emitters: HashSet<ItemKey>,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Phase 1: Register an item type. Returns its ID.
    pub fn register_item(&mut self, name: &str) -> ItemTypeId {
        let id = ItemTypeId(self.item_names.len() as u32);
        self.item_names.push(name.to_string());
        self.item_name_to_id.insert(name.to_string(), id);
        id
    }

    /// Phase 1: Register a recipe as a fixed conversion. Returns its ID.
    pub fn register_recipe(
        &mut self,
        name: &str,
        inputs: Vec<RecipeSlot>,
        outputs: Vec<ItemStack>,
    ) -> RecipeId {
        let id = RecipeId(self.recipes.len() as u32);
        self.recipes.push(RecipeDetails {
            id,
            name: name.to_string(),
            inputs,
            outputs,
            craftable: false,
            can_substitute: false,
            priority: 0,
        });
        self.recipe_name_to_id.insert(name.to_string(), id);
        id
    }

    /// Phase 1: Mark an item as an infinite source.
    pub fn register_emitter(&mut self, item: impl Into<ItemKey>) {
        self.emitters.insert(item.into());
    }

    /// Phase 2: Mutate an existing recipe by name.
    pub fn mutate_recipe<F>(&mut self, name: &str, f: F) -> Result<(), CatalogError>
    where
        F: FnOnce(&mut RecipeDetails),
    {
        let id = self
            .recipe_name_to_id
            .get(name)
            .ok_or(CatalogError::NotFound(name.to_string()))?;
        let recipe = &mut self.recipes[id.0 as usize];
        f(recipe);
        // The id is owned by the catalog.
        recipe.id = *id;
        Ok(())
    }

    pub fn item_id(&self, name: &str) -> Option<ItemTypeId> {
        self.item_name_to_id.get(name).copied()
    }

    pub fn recipe_id(&self, name: &str) -> Option<RecipeId> {
        self.recipe_name_to_id.get(name).copied()
    }

    /// Phase 3: Validate and freeze.
    pub fn build(self) -> Result<Catalog, CatalogError> {
        let known = |key: &ItemKey| (key.item_type.0 as usize) < self.item_names.len();

        for recipe in &self.recipes {
            if recipe.outputs.is_empty() {
                return Err(CatalogError::EmptyOutputs(recipe.name.clone()));
            }
            let slot_keys = recipe
                .inputs
                .iter()
                .flat_map(|s| std::iter::once(&s.stack.key).chain(s.substitutes.iter()));
            let output_keys = recipe.outputs.iter().map(|o| &o.key);
            if let Some(bad) = slot_keys.chain(output_keys).find(|k| !known(k)) {
                return Err(CatalogError::InvalidItemRef(bad.item_type));
            }
        }
        if let Some(bad) = self.emitters.iter().find(|k| !known(k)) {
            return Err(CatalogError::InvalidItemRef(bad.item_type));
        }

        let recipes: Vec<Arc<RecipeDetails>> = self.recipes.into_iter().map(Arc::new).collect();

        let mut producers: HashMap<ItemKey, Vec<RecipeId>> = HashMap::new();
        for recipe in &recipes {
            for output in recipe.condensed_outputs() {
                producers.entry(output.key).or_default().push(recipe.id);
            }
        }
        // Stable sort keeps registration order among equal priorities.
        for ids in producers.values_mut() {
            ids.sort_by_key(|id| std::cmp::Reverse(recipes[id.0 as usize].priority));
        }

        Ok(Catalog {
            item_names: self.item_names,
            item_name_to_id: self.item_name_to_id,
            recipes,
            recipe_name_to_id: self.recipe_name_to_id,
            producers,
            emitters: self.emitters,
        })
    }
}

/// Immutable catalog. Frozen after build().
#[derive(Debug)]
pub struct Catalog {
    item_names: Vec<String>,
    item_name_to_id: HashMap<String, ItemTypeId>,
    recipes: Vec<Arc<RecipeDetails>>,
    recipe_name_to_id: HashMap<String, RecipeId>,
    producers: HashMap<ItemKey, Vec<RecipeId>>,
    emitters: HashSet<ItemKey>,
}

impl Catalog {
    pub fn get_recipe(&self, id: RecipeId) -> Option<&Arc<RecipeDetails>> {
        self.recipes.get(id.0 as usize)
    }

    pub fn item_id(&self, name: &str) -> Option<ItemTypeId> {
        self.item_name_to_id.get(name).copied()
    }

    pub fn item_name(&self, id: ItemTypeId) -> Option<&str> {
        self.item_names.get(id.0 as usize).map(String::as_str)
    }

    pub fn recipe_id(&self, name: &str) -> Option<RecipeId> {
        self.recipe_name_to_id.get(name).copied()
    }

    pub fn item_count(&self) -> usize {
        self.item_names.len()
    }

    pub fn recipe_count(&self) -> usize {
        self.recipes.len()
    }
}

impl RecipeCatalog for Catalog {
    fn recipes_for(
        &self,
        item: ItemKey,
        _parent: Option<&RecipeDetails>,
        _slot: Option<usize>,
    ) -> Vec<Arc<RecipeDetails>> {
        self.producers
            .get(&item)
            .map(|ids| {
                ids.iter()
                    .map(|id| Arc::clone(&self.recipes[id.0 as usize]))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn can_emit(&self, item: ItemKey) -> bool {
        self.emitters.contains(&item)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid item reference: {0:?}")]
    InvalidItemRef(ItemTypeId),
    #[error("recipe '{0}' produces nothing")]
    EmptyOutputs(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_builder() -> CatalogBuilder {
        let mut b = CatalogBuilder::new();
        let iron_ore = b.register_item("iron_ore");
        let iron_plate = b.register_item("iron_plate");
        b.register_recipe(
            "smelt_iron",
            vec![RecipeSlot::exact(ItemStack::new(iron_ore, 1))],
            vec![ItemStack::new(iron_plate, 1)],
        );
        b
    }

    #[test]
    fn register_and_build() {
        let cat = setup_builder().build().unwrap();
        assert_eq!(cat.item_count(), 2);
        assert_eq!(cat.recipe_count(), 1);
        assert_eq!(cat.item_name(ItemTypeId(1)), Some("iron_plate"));
    }

    #[test]
    fn lookup_finds_producers_only() {
        let cat = setup_builder().build().unwrap();
        let plate = ItemKey::new(cat.item_id("iron_plate").unwrap());
        let ore = ItemKey::new(cat.item_id("iron_ore").unwrap());
        assert_eq!(cat.recipes_for(plate, None, None).len(), 1);
        assert!(cat.recipes_for(ore, None, None).is_empty());
    }

    #[test]
    fn lookup_orders_by_priority_then_registration() {
        let mut b = setup_builder();
        let ore = b.item_id("iron_ore").unwrap();
        let plate = b.item_id("iron_plate").unwrap();
        b.register_recipe(
            "smelt_iron_slow",
            vec![RecipeSlot::exact(ItemStack::new(ore, 2))],
            vec![ItemStack::new(plate, 1)],
        );
        b.register_recipe(
            "smelt_iron_fast",
            vec![RecipeSlot::exact(ItemStack::new(ore, 1))],
            vec![ItemStack::new(plate, 2)],
        );
        b.mutate_recipe("smelt_iron_fast", |r| r.priority = 5).unwrap();
        let cat = b.build().unwrap();

        let names: Vec<String> = cat
            .recipes_for(ItemKey::new(plate), None, None)
            .iter()
            .map(|r| r.name.clone())
            .collect();
        assert_eq!(names, vec!["smelt_iron_fast", "smelt_iron", "smelt_iron_slow"]);
    }

    #[test]
    fn emitters_are_reported() {
        let mut b = setup_builder();
        let ore = b.item_id("iron_ore").unwrap();
        b.register_emitter(ore);
        let cat = b.build().unwrap();
        assert!(cat.can_emit(ItemKey::new(ore)));
        assert!(!cat.can_emit(ItemKey::new(cat.item_id("iron_plate").unwrap())));
    }

    #[test]
    fn mutate_nonexistent_fails() {
        let mut b = setup_builder();
        let result = b.mutate_recipe("nonexistent", |_| {});
        assert!(matches!(result, Err(CatalogError::NotFound(name)) if name == "nonexistent"));
    }

    #[test]
    fn invalid_item_ref_fails() {
        let mut b = CatalogBuilder::new();
        let plate = b.register_item("plate");
        b.register_recipe(
            "bad",
            vec![RecipeSlot::exact(ItemStack::new(ItemTypeId(999), 1))],
            vec![ItemStack::new(plate, 1)],
        );
        match b.build() {
            Err(CatalogError::InvalidItemRef(id)) => assert_eq!(id, ItemTypeId(999)),
            other => panic!("expected InvalidItemRef, got: {other:?}"),
        }
    }

    #[test]
    fn recipe_without_outputs_fails() {
        let mut b = CatalogBuilder::new();
        let ore = b.register_item("ore");
        b.register_recipe("void", vec![RecipeSlot::exact(ItemStack::new(ore, 1))], vec![]);
        assert!(matches!(b.build(), Err(CatalogError::EmptyOutputs(_))));
    }

    #[test]
    fn condensed_inputs_merge_slots() {
        let mut b = CatalogBuilder::new();
        let plank = b.register_item("plank");
        let chest = b.register_item("chest");
        b.register_recipe(
            "chest",
            (0..8)
                .map(|_| RecipeSlot::exact(ItemStack::new(plank, 1)))
                .collect(),
            vec![ItemStack::new(chest, 1)],
        );
        let cat = b.build().unwrap();
        let recipe = cat.get_recipe(RecipeId(0)).unwrap();
        assert_eq!(recipe.condensed_inputs(), vec![ItemStack::new(plank, 8)]);
        assert_eq!(recipe.first_slot_of(ItemKey::new(plank)), Some(0));
    }

    #[test]
    fn slot_validity_respects_substitution_and_fuzzy() {
        let oak = ItemKey::new(ItemTypeId(0));
        let birch = ItemKey::new(ItemTypeId(1));
        let damaged_oak = ItemKey::with_variant(ItemTypeId(0), 3);
        let mut recipe = RecipeDetails {
            id: RecipeId(0),
            name: "stick".into(),
            inputs: vec![RecipeSlot::with_substitutes(ItemStack::new(oak, 1), vec![birch])],
            outputs: vec![ItemStack::new(ItemTypeId(2), 4)],
            craftable: true,
            can_substitute: false,
            priority: 0,
        };
        assert!(recipe.is_valid_item_for_slot(0, oak));
        assert!(!recipe.is_valid_item_for_slot(0, birch));
        assert!(!recipe.is_valid_item_for_slot(1, oak));

        recipe.can_substitute = true;
        assert!(recipe.is_valid_item_for_slot(0, birch));
        assert!(!recipe.is_valid_item_for_slot(0, damaged_oak));

        recipe.inputs[0].fuzzy = true;
        assert!(recipe.is_valid_item_for_slot(0, damaged_oak));
        assert_eq!(recipe.substitute_inputs(0), vec![oak, birch]);
    }

    #[test]
    fn amount_crafted_falls_back_to_fuzzy() {
        let recipe = RecipeDetails {
            id: RecipeId(0),
            name: "dye".into(),
            inputs: vec![],
            outputs: vec![ItemStack::new(ItemKey::with_variant(ItemTypeId(4), 1), 2)],
            craftable: false,
            can_substitute: false,
            priority: 0,
        };
        assert_eq!(recipe.amount_crafted(ItemKey::with_variant(ItemTypeId(4), 1)), 2);
        assert_eq!(recipe.amount_crafted(ItemKey::with_variant(ItemTypeId(4), 9)), 2);
        assert_eq!(recipe.amount_crafted(ItemKey::new(ItemTypeId(5))), 0);
    }
}
