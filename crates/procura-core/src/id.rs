use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    /// Identifies a demand (a wanted quantity of one item) in a crafting tree.
    pub struct DemandId;

    /// Identifies one application of a recipe in a crafting tree.
    pub struct RecipeNodeId;
}

/// Identifies an item type in the catalog. Cheap to copy and compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemTypeId(pub u32);

/// Identifies a recipe in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecipeId(pub u32);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_type_id_equality() {
        let a = ItemTypeId(0);
        let b = ItemTypeId(0);
        let c = ItemTypeId(1);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn ids_are_hashable() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(RecipeId(0), "smelt_iron");
        map.insert(RecipeId(1), "press_gear");
        assert_eq!(map[&RecipeId(1)], "press_gear");
    }

    #[test]
    fn node_keys_come_from_distinct_arenas() {
        let mut demands = slotmap::SlotMap::<DemandId, u32>::with_key();
        let a = demands.insert(1);
        let b = demands.insert(2);
        assert_ne!(a, b);
        assert_eq!(demands[a], 1);
    }
}
