//! Serde data file structs for catalog definitions.
//!
//! These structs define the on-disk format for items, recipes, emittable
//! items and starting stock. They are deserialized from RON, JSON, or TOML
//! data files and then resolved into core types by the loader.

use serde::Deserialize;
use serde::de::DeserializeOwned;

// ===========================================================================
// Items
// ===========================================================================

/// An item type definition in a data file.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemData {
    pub name: String,
}

// ===========================================================================
// Recipes
// ===========================================================================

/// A recipe input slot, supporting both short tuple form and full form with
/// substitutes.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SlotData {
    /// Short form: `("item_name", quantity)`.
    Short(String, u64),
    /// Full form with explicit fields.
    Full {
        item: String,
        quantity: u64,
        #[serde(default)]
        substitutes: Vec<String>,
        #[serde(default)]
        fuzzy: bool,
    },
}

impl SlotData {
    pub fn item(&self) -> &str {
        match self {
            SlotData::Short(item, _) | SlotData::Full { item, .. } => item,
        }
    }

    pub fn quantity(&self) -> u64 {
        match self {
            SlotData::Short(_, quantity) | SlotData::Full { quantity, .. } => *quantity,
        }
    }
}

/// A recipe definition in a data file.
#[derive(Debug, Clone, Deserialize)]
pub struct RecipeData {
    pub name: String,
    pub inputs: Vec<SlotData>,
    pub outputs: Vec<(String, u64)>,
    #[serde(default)]
    pub craftable: bool,
    #[serde(default)]
    pub can_substitute: bool,
    #[serde(default)]
    pub priority: i32,
}

// ===========================================================================
// Stock
// ===========================================================================

/// A starting stock entry.
#[derive(Debug, Clone, Deserialize)]
pub struct StockData {
    pub item: String,
    pub quantity: u64,
}

// ===========================================================================
// TOML wrappers (TOML does not support top-level arrays)
// ===========================================================================

/// A TOML table holding one definition list under a named key.
pub trait TomlList: DeserializeOwned {
    type Entry: DeserializeOwned;

    fn into_entries(self) -> Vec<Self::Entry>;
}

#[derive(Debug, Clone, Deserialize)]
pub struct TomlItems {
    pub items: Vec<ItemData>,
}

impl TomlList for TomlItems {
    type Entry = ItemData;

    fn into_entries(self) -> Vec<ItemData> {
        self.items
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TomlRecipes {
    pub recipes: Vec<RecipeData>,
}

impl TomlList for TomlRecipes {
    type Entry = RecipeData;

    fn into_entries(self) -> Vec<RecipeData> {
        self.recipes
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TomlEmitters {
    pub emitters: Vec<String>,
}

impl TomlList for TomlEmitters {
    type Entry = String;

    fn into_entries(self) -> Vec<String> {
        self.emitters
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TomlStock {
    pub stock: Vec<StockData>,
}

impl TomlList for TomlStock {
    type Entry = StockData;

    fn into_entries(self) -> Vec<StockData> {
        self.stock
    }
}

// ===========================================================================
// Tests
// ===========================================================================
