//! Procura Data -- loads recipe catalogs, emitters, starting stock and
//! resolver options from RON, TOML or JSON files.

pub mod loader;
pub mod schema;

pub use loader::{load_catalog, DataLoadError, LoadedCatalog};
