//! Catalog loading: locate the definition files in a directory, parse them
//! and turn item names into the keys the resolver works with.
//!
//! Every definition file may be written as `.ron`, `.toml` or `.json`.
//! [`load_catalog`] is the entry point; the helpers below are public so
//! tools can read single files the same way.

use crate::schema::{
    ItemData, RecipeData, SlotData, TomlEmitters, TomlItems, TomlList, TomlRecipes, TomlStock,
};
use procura_core::catalog::{Catalog, CatalogBuilder, CatalogError, RecipeSlot};
use procura_core::config::JobOptions;
use procura_core::id::{ItemTypeId, RecipeId};
use procura_core::inventory::MemoryInventory;
use procura_core::item::{ItemKey, ItemStack};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

// ===========================================================================
// Errors
// ===========================================================================

#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// `items` or `recipes` is absent.
    #[error("catalog directory {dir} has no '{file}' definition file")]
    MissingRequired { file: &'static str, dir: PathBuf },

    #[error("{file} is not a .ron, .toml or .json definition file")]
    UnsupportedFormat { file: PathBuf },

    /// The same definition file exists in two formats.
    #[error("{a} and {b} define the same catalog file")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    #[error("cannot parse {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// A recipe, emitter or stock entry names an item that was never declared.
    #[error("{file} refers to undeclared {expected_kind} '{name}'")]
    UnresolvedRef {
        file: PathBuf,
        name: String,
        expected_kind: &'static str,
    },

    #[error("'{name}' is declared twice in {file}")]
    DuplicateName { file: PathBuf, name: String },

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Formats and file lookup
// ===========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

const EXTENSIONS: [(&str, Format); 3] = [
    ("ron", Format::Ron),
    ("toml", Format::Toml),
    ("json", Format::Json),
];

pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    let ext = path.extension().and_then(|e| e.to_str());
    EXTENSIONS
        .iter()
        .find(|(known, _)| Some(*known) == ext)
        .map(|&(_, format)| format)
        .ok_or_else(|| DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        })
}

/// The definition file `stem` in `dir`, whichever format it is written in.
/// Two formats of the same file are ambiguous and rejected.
pub fn find_data_file(dir: &Path, stem: &str) -> Result<Option<PathBuf>, DataLoadError> {
    let mut present = EXTENSIONS
        .iter()
        .map(|(ext, _)| dir.join(format!("{stem}.{ext}")))
        .filter(|path| path.exists());

    let first = present.next();
    match (first, present.next()) {
        (Some(a), Some(b)) => Err(DataLoadError::ConflictingFormats { a, b }),
        (first, _) => Ok(first),
    }
}

pub fn require_data_file(dir: &Path, stem: &'static str) -> Result<PathBuf, DataLoadError> {
    find_data_file(dir, stem)?.ok_or_else(|| DataLoadError::MissingRequired {
        file: stem,
        dir: dir.to_path_buf(),
    })
}

// ===========================================================================
// Parsing
// ===========================================================================

fn parse_error(path: &Path, detail: impl ToString) -> DataLoadError {
    DataLoadError::Parse {
        file: path.to_path_buf(),
        detail: detail.to_string(),
    }
}

pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let text = std::fs::read_to_string(path)?;
    match format {
        Format::Ron => ron::from_str(&text).map_err(|e| parse_error(path, e)),
        Format::Json => serde_json::from_str(&text).map_err(|e| parse_error(path, e)),
        Format::Toml => toml::from_str(&text).map_err(|e| parse_error(path, e)),
    }
}

/// Read a list of definitions. RON and JSON files hold the list itself;
/// TOML files hold the table `W`, which wraps it under a named key.
pub fn deserialize_list<W: TomlList>(path: &Path) -> Result<Vec<W::Entry>, DataLoadError> {
    match detect_format(path)? {
        Format::Toml => deserialize_file::<W>(path).map(TomlList::into_entries),
        Format::Ron | Format::Json => deserialize_file(path),
    }
}

// ===========================================================================
// Names
// ===========================================================================

/// Look up a declared name, reporting `file` as the place it was referenced.
pub fn resolve_name<'a, V>(
    declared: &'a HashMap<String, V>,
    name: &str,
    file: &Path,
    expected_kind: &'static str,
) -> Result<&'a V, DataLoadError> {
    declared
        .get(name)
        .ok_or_else(|| DataLoadError::UnresolvedRef {
            file: file.to_path_buf(),
            name: name.to_owned(),
            expected_kind,
        })
}

pub fn check_duplicate<V>(
    declared: &HashMap<String, V>,
    name: &str,
    file: &Path,
) -> Result<(), DataLoadError> {
    if !declared.contains_key(name) {
        return Ok(());
    }
    Err(DataLoadError::DuplicateName {
        file: file.to_path_buf(),
        name: name.to_owned(),
    })
}

// ===========================================================================
// Catalog loading
// ===========================================================================

/// Everything loaded from a data directory.
#[derive(Debug)]
pub struct LoadedCatalog {
    pub catalog: Catalog,
    /// Starting stock, empty when no `stock` file exists.
    pub stock: MemoryInventory,
    /// Job options from the `resolver` file, defaulted when absent.
    pub options: JobOptions,
    pub names: HashMap<String, ItemTypeId>,
}

impl LoadedCatalog {
    /// Key of a named item.
    pub fn item(&self, name: &str) -> Option<ItemKey> {
        self.names.get(name).map(|&id| ItemKey::new(id))
    }
}

/// Load a catalog definition from `dir`.
///
/// Required files: `items`, `recipes`. Optional: `emitters`, `stock`,
/// `resolver`. Each may be `.ron`, `.toml` or `.json`.
pub fn load_catalog(dir: &Path) -> Result<LoadedCatalog, DataLoadError> {
    let mut builder = CatalogBuilder::new();
    let mut names: HashMap<String, ItemTypeId> = HashMap::new();

    // -- Items --
    let items_path = require_data_file(dir, "items")?;
    let items: Vec<ItemData> = deserialize_list::<TomlItems>(&items_path)?;
    for item in &items {
        check_duplicate(&names, &item.name, &items_path)?;
        let id = builder.register_item(&item.name);
        names.insert(item.name.clone(), id);
    }

    // -- Recipes --
    let recipes_path = require_data_file(dir, "recipes")?;
    let recipes: Vec<RecipeData> = deserialize_list::<TomlRecipes>(&recipes_path)?;
    let mut recipe_ids: HashMap<String, RecipeId> = HashMap::new();
    for recipe in &recipes {
        check_duplicate(&recipe_ids, &recipe.name, &recipes_path)?;
        let id = register_recipe(&mut builder, &names, recipe, &recipes_path)?;
        recipe_ids.insert(recipe.name.clone(), id);
    }

    // -- Emitters --
    if let Some(path) = find_data_file(dir, "emitters")? {
        let emitters = deserialize_list::<TomlEmitters>(&path)?;
        for name in &emitters {
            let id = *resolve_name(&names, name, &path, "item")?;
            builder.register_emitter(id);
        }
    }

    // -- Stock --
    let mut stock = MemoryInventory::new();
    if let Some(path) = find_data_file(dir, "stock")? {
        let entries = deserialize_list::<TomlStock>(&path)?;
        for entry in &entries {
            let id = *resolve_name(&names, &entry.item, &path, "item")?;
            stock.insert(ItemStack::new(id, entry.quantity));
        }
    }

    // -- Resolver options --
    let options = match find_data_file(dir, "resolver")? {
        Some(path) => deserialize_file(&path)?,
        None => JobOptions::default(),
    };

    let catalog = builder.build()?;
    tracing::info!(
        dir = %dir.display(),
        items = catalog.item_count(),
        recipes = catalog.recipe_count(),
        stock_kinds = stock.items().kinds(),
        "loaded catalog"
    );

    Ok(LoadedCatalog {
        catalog,
        stock,
        options,
        names,
    })
}

fn register_recipe(
    builder: &mut CatalogBuilder,
    names: &HashMap<String, ItemTypeId>,
    recipe: &RecipeData,
    file: &Path,
) -> Result<RecipeId, DataLoadError> {
    let item = |name: &str| -> Result<ItemKey, DataLoadError> {
        resolve_name(names, name, file, "item").map(|&id| ItemKey::new(id))
    };

    let mut inputs = Vec::with_capacity(recipe.inputs.len());
    for slot in &recipe.inputs {
        let stack = ItemStack::new(item(slot.item())?, slot.quantity());
        let resolved = match slot {
            SlotData::Short(..) => RecipeSlot::exact(stack),
            SlotData::Full {
                substitutes, fuzzy, ..
            } => {
                let subs = substitutes
                    .iter()
                    .map(|s| item(s))
                    .collect::<Result<Vec<_>, _>>()?;
                let slot = RecipeSlot::with_substitutes(stack, subs);
                if *fuzzy { slot.fuzzy() } else { slot }
            }
        };
        inputs.push(resolved);
    }

    let outputs = recipe
        .outputs
        .iter()
        .map(|(name, quantity)| -> Result<ItemStack, DataLoadError> {
            Ok(ItemStack::new(item(name)?, *quantity))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let id = builder.register_recipe(&recipe.name, inputs, outputs);
    builder.mutate_recipe(&recipe.name, |r| {
        r.craftable = recipe.craftable;
        r.can_substitute = recipe.can_substitute;
        r.priority = recipe.priority;
    })?;
    Ok(id)
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use procura_core::catalog::RecipeCatalog;
    use procura_core::inventory::InventoryView;
    use std::fs;

    /// Create a temporary directory with a unique name for test isolation.
    fn make_test_dir(suffix: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "procura_data_test_{suffix}_{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn cleanup(dir: &Path) {
        let _ = fs::remove_dir_all(dir);
    }

    // -----------------------------------------------------------------------
    // Formats and file lookup
    // -----------------------------------------------------------------------

    #[test]
    fn only_known_extensions_are_definition_files() {
        assert_eq!(detect_format(Path::new("items.ron")).unwrap(), Format::Ron);
        assert_eq!(detect_format(Path::new("items.toml")).unwrap(), Format::Toml);
        assert_eq!(detect_format(Path::new("items.json")).unwrap(), Format::Json);
        assert!(matches!(
            detect_format(Path::new("items.yaml")),
            Err(DataLoadError::UnsupportedFormat { .. })
        ));
        assert!(matches!(
            detect_format(Path::new("items")),
            Err(DataLoadError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn optional_file_may_be_absent() {
        let dir = make_test_dir("find");
        fs::write(dir.join("items.json"), "[]").unwrap();

        assert_eq!(find_data_file(&dir, "items").unwrap(), Some(dir.join("items.json")));
        assert_eq!(find_data_file(&dir, "stock").unwrap(), None);

        cleanup(&dir);
    }

    #[test]
    fn same_file_in_two_formats_is_rejected() {
        let dir = make_test_dir("find_conflict");
        fs::write(dir.join("items.ron"), "[]").unwrap();
        fs::write(dir.join("items.json"), "[]").unwrap();

        let result = find_data_file(&dir, "items");
        assert!(matches!(result, Err(DataLoadError::ConflictingFormats { .. })));

        cleanup(&dir);
    }

    #[test]
    fn recipes_file_is_required() {
        let dir = make_test_dir("require_missing");

        let result = require_data_file(&dir, "recipes");
        assert!(matches!(
            result,
            Err(DataLoadError::MissingRequired { file: "recipes", .. })
        ));

        cleanup(&dir);
    }

    // -----------------------------------------------------------------------
    // Parsing
    // -----------------------------------------------------------------------

    #[test]
    fn toml_list_is_read_from_its_table() {
        let dir = make_test_dir("list_toml");
        let path = dir.join("items.toml");
        fs::write(&path, "[[items]]\nname = \"iron_ore\"\n\n[[items]]\nname = \"gear\"\n").unwrap();

        let items = deserialize_list::<TomlItems>(&path).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].name, "gear");

        // An items file read as recipes lacks the `recipes` table.
        let wrong = deserialize_list::<TomlRecipes>(&path);
        assert!(matches!(wrong, Err(DataLoadError::Parse { .. })));

        cleanup(&dir);
    }

    #[test]
    fn malformed_ron_is_a_parse_error() {
        let dir = make_test_dir("deser_parse_err");
        let path = dir.join("bad.ron");
        fs::write(&path, "this is not valid RON {{{").unwrap();

        let result: Result<Vec<ItemData>, _> = deserialize_file(&path);
        assert!(matches!(result, Err(DataLoadError::Parse { .. })));

        cleanup(&dir);
    }

    // -----------------------------------------------------------------------
    // Names
    // -----------------------------------------------------------------------

    #[test]
    fn undeclared_item_is_unresolved() {
        let map: HashMap<String, u32> = HashMap::new();
        let result = resolve_name(&map, "iron_ore", Path::new("stock.ron"), "item");
        assert!(matches!(
            result,
            Err(DataLoadError::UnresolvedRef { ref name, expected_kind: "item", .. }) if name == "iron_ore"
        ));
    }

    #[test]
    fn redeclared_item_is_a_duplicate() {
        let mut map = HashMap::new();
        map.insert("iron_ore".to_string(), 42u32);
        assert!(check_duplicate(&map, "gear", Path::new("items.ron")).is_ok());
        assert!(matches!(
            check_duplicate(&map, "iron_ore", Path::new("items.ron")),
            Err(DataLoadError::DuplicateName { ref name, .. }) if name == "iron_ore"
        ));
    }

    // -----------------------------------------------------------------------
    // load_catalog
    // -----------------------------------------------------------------------

    fn write_gear_data(dir: &Path) {
        fs::write(
            dir.join("items.ron"),
            r#"[(name: "iron_ore"), (name: "iron_plate"), (name: "gear"), (name: "water")]"#,
        )
        .unwrap();
        fs::write(
            dir.join("recipes.json"),
            r#"[
                {"name": "smelt_iron", "inputs": [["iron_ore", 1]], "outputs": [["iron_plate", 1]]},
                {"name": "press_gear", "inputs": [["iron_plate", 2]], "outputs": [["gear", 1]], "priority": 3}
            ]"#,
        )
        .unwrap();
    }

    #[test]
    fn load_minimal_catalog() {
        let dir = make_test_dir("load_minimal");
        write_gear_data(&dir);

        let loaded = load_catalog(&dir).unwrap();
        assert_eq!(loaded.catalog.item_count(), 4);
        assert_eq!(loaded.catalog.recipe_count(), 2);
        assert!(loaded.stock.items().is_empty());
        assert_eq!(loaded.options, JobOptions::default());

        let gear = loaded.item("gear").unwrap();
        let recipes = loaded.catalog.recipes_for(gear, None, None);
        assert_eq!(recipes.len(), 1);
        assert_eq!(recipes[0].priority, 3);
        assert_eq!(recipes[0].inputs[0].stack.quantity, 2);

        cleanup(&dir);
    }

    #[test]
    fn load_full_catalog_in_toml() {
        let dir = make_test_dir("load_full");
        write_gear_data(&dir);
        fs::write(dir.join("emitters.toml"), "emitters = [\"water\"]\n").unwrap();
        fs::write(
            dir.join("stock.toml"),
            "[[stock]]\nitem = \"iron_ore\"\nquantity = 12\n\n[[stock]]\nitem = \"gear\"\nquantity = 1\n",
        )
        .unwrap();
        fs::write(
            dir.join("resolver.toml"),
            "exclude_target_from_stock = true\n\n[resolver]\nnode_overhead = 2\n",
        )
        .unwrap();

        let loaded = load_catalog(&dir).unwrap();
        let water = loaded.item("water").unwrap();
        assert!(loaded.catalog.can_emit(water));
        assert_eq!(loaded.stock.available(loaded.item("iron_ore").unwrap()), 12);
        assert_eq!(loaded.stock.available(loaded.item("gear").unwrap()), 1);
        assert!(loaded.options.exclude_target_from_stock);
        assert_eq!(loaded.options.resolver.node_overhead, 2);
        assert_eq!(loaded.options.resolver.task_overhead, 8);

        cleanup(&dir);
    }

    #[test]
    fn substitutes_resolve_to_item_keys() {
        let dir = make_test_dir("load_subs");
        fs::write(
            dir.join("items.json"),
            r#"[{"name": "coal"}, {"name": "charcoal"}, {"name": "stick"}, {"name": "torch"}]"#,
        )
        .unwrap();
        fs::write(
            dir.join("recipes.json"),
            r#"[{
                "name": "torch",
                "inputs": [{"item": "coal", "quantity": 1, "substitutes": ["charcoal"]}, ["stick", 1]],
                "outputs": [["torch", 4]],
                "craftable": true,
                "can_substitute": true
            }]"#,
        )
        .unwrap();

        let loaded = load_catalog(&dir).unwrap();
        let torch = loaded.item("torch").unwrap();
        let charcoal = loaded.item("charcoal").unwrap();
        let recipe = &loaded.catalog.recipes_for(torch, None, None)[0];
        assert!(recipe.craftable);
        assert!(recipe.can_substitute);
        assert!(recipe.is_valid_item_for_slot(0, charcoal));
        assert!(!recipe.is_valid_item_for_slot(1, charcoal));

        cleanup(&dir);
    }

    #[test]
    fn unknown_item_in_recipe_is_rejected() {
        let dir = make_test_dir("load_unresolved");
        fs::write(dir.join("items.ron"), r#"[(name: "gear")]"#).unwrap();
        fs::write(
            dir.join("recipes.ron"),
            r#"[(name: "press_gear", inputs: [("iron_plate", 2)], outputs: [("gear", 1)])]"#,
        )
        .unwrap();

        let result = load_catalog(&dir);
        assert!(matches!(
            result,
            Err(DataLoadError::UnresolvedRef { ref name, .. }) if name == "iron_plate"
        ));

        cleanup(&dir);
    }

    #[test]
    fn duplicate_item_is_rejected() {
        let dir = make_test_dir("load_duplicate");
        fs::write(dir.join("items.ron"), r#"[(name: "gear"), (name: "gear")]"#).unwrap();
        fs::write(dir.join("recipes.ron"), "[]").unwrap();

        assert!(matches!(
            load_catalog(&dir),
            Err(DataLoadError::DuplicateName { ref name, .. }) if name == "gear"
        ));

        cleanup(&dir);
    }

    #[test]
    fn recipe_without_outputs_fails_catalog_validation() {
        let dir = make_test_dir("load_empty_outputs");
        fs::write(dir.join("items.ron"), r#"[(name: "gear")]"#).unwrap();
        fs::write(
            dir.join("recipes.ron"),
            r#"[(name: "void", inputs: [("gear", 1)], outputs: [])]"#,
        )
        .unwrap();

        assert!(matches!(
            load_catalog(&dir),
            Err(DataLoadError::Catalog(CatalogError::EmptyOutputs(ref name))) if name == "void"
        ));

        cleanup(&dir);
    }

    #[test]
    fn missing_recipes_file_is_reported() {
        let dir = make_test_dir("load_no_recipes");
        fs::write(dir.join("items.ron"), r#"[(name: "gear")]"#).unwrap();

        assert!(matches!(
            load_catalog(&dir),
            Err(DataLoadError::MissingRequired { file: "recipes", .. })
        ));

        cleanup(&dir);
    }

    #[test]
    fn error_display_messages() {
        let e = DataLoadError::MissingRequired {
            file: "items",
            dir: PathBuf::from("/data"),
        };
        assert!(format!("{e}").contains("items"));
        assert!(format!("{e}").contains("/data"));

        let e = DataLoadError::UnresolvedRef {
            file: PathBuf::from("recipes.ron"),
            name: "iron_ore".to_string(),
            expected_kind: "item",
        };
        let msg = format!("{e}");
        assert!(msg.contains("iron_ore"));
        assert!(msg.contains("recipes.ron"));

        let e: DataLoadError = CatalogError::EmptyOutputs("void".to_string()).into();
        assert!(format!("{e}").contains("void"));
    }
}
