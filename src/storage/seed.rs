//! Catalog Bootstrap
//!
//! Runs once at startup, before any request is served: seeds the item
//! table from a JSON file when it is empty, then loads the catalog that
//! the action layer keeps for its lifetime.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

use super::{Storage, StorageError};
use crate::game::model::{Catalog, Item, ItemId};

/// Catalog seeding errors.
#[derive(Debug, Error)]
pub enum SeedError {
    /// Seed file could not be read.
    #[error("failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),

    /// Seed file is not a JSON array of items.
    #[error("invalid catalog file: {0}")]
    Json(#[from] serde_json::Error),

    /// Seed file lists the same item key twice.
    #[error("duplicate item id {0} in catalog file")]
    DuplicateItem(ItemId),

    /// Storage failure while seeding.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Parse a JSON array of items with unique keys.
pub fn parse_catalog(json: &str) -> Result<Vec<Item>, SeedError> {
    let items: Vec<Item> = serde_json::from_str(json)?;

    let mut seen = BTreeSet::new();
    if let Some(item) = items.iter().find(|item| !seen.insert(item.id)) {
        return Err(SeedError::DuplicateItem(item.id));
    }
    Ok(items)
}

/// Insert the items from `path` if the item table is empty.
///
/// The batch is written atomically, so a failed seed leaves the table
/// empty and the next start retries. Returns the number of items inserted
/// (0 when already seeded).
pub fn seed_catalog_if_empty(store: &dyn Storage, path: impl AsRef<Path>) -> Result<usize, SeedError> {
    if !store.select_items()?.is_empty() {
        debug!("item catalog already seeded");
        return Ok(0);
    }

    let path = path.as_ref();
    info!("seeding item catalog from {}", path.display());

    let items = parse_catalog(&fs::read_to_string(path)?)?;
    let count = store.insert_items(items)?;

    info!("seeded {} items", count);
    Ok(count)
}

/// Load the full catalog from storage.
pub fn load_catalog(store: &dyn Storage) -> Result<Catalog, StorageError> {
    let catalog = Catalog::new(store.select_items()?);
    info!("loaded {} catalog items", catalog.len());
    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use std::io::Write;

    const CATALOG: &str = r#"[
        {"id": 1, "name": "Lemonade Stand", "price": 10, "price_multiplier": 1.5, "coins_per_click": 1, "coins_multiplier": 1.2},
        {"id": 2, "name": "Newspaper", "price": 100, "price_multiplier": 1.6, "coins_per_click": 5, "coins_multiplier": 1.3, "click_cooldown": 10, "max_level": 50}
    ]"#;

    fn write_catalog(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("clicker-seed-{}-{}.json", name, std::process::id()));
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_parse_catalog() {
        let items = parse_catalog(CATALOG).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].click_cooldown, 10);
        assert_eq!(items[1].max_level, 50);
    }

    #[test]
    fn test_seed_empty_table() {
        let store = MemoryStore::new();
        let path = write_catalog("empty", CATALOG);

        assert_eq!(seed_catalog_if_empty(&store, &path).unwrap(), 2);
        let catalog = load_catalog(&store).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get(1).unwrap().name, "Lemonade Stand");

        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_seed_is_idempotent() {
        let store = MemoryStore::new();
        let path = write_catalog("twice", CATALOG);

        seed_catalog_if_empty(&store, &path).unwrap();
        assert_eq!(seed_catalog_if_empty(&store, &path).unwrap(), 0);
        assert_eq!(store.select_items().unwrap().len(), 2);

        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_seeded_table_skips_file() {
        let store = MemoryStore::new();
        store.insert_item(parse_catalog(CATALOG).unwrap().remove(0)).unwrap();

        // Missing file is never opened once the table has rows.
        let result = seed_catalog_if_empty(&store, "/nonexistent/items.json");
        assert_eq!(result.unwrap(), 0);
    }

    #[test]
    fn test_duplicate_ids_leave_table_empty() {
        let store = MemoryStore::new();
        let path = write_catalog(
            "duplicate",
            r#"[
                {"id": 1, "name": "a", "price": 1, "coins_per_click": 1},
                {"id": 2, "name": "b", "price": 1, "coins_per_click": 1},
                {"id": 2, "name": "c", "price": 1, "coins_per_click": 1},
                {"id": 3, "name": "d", "price": 1, "coins_per_click": 1}
            ]"#,
        );

        let result = seed_catalog_if_empty(&store, &path);
        assert!(matches!(result, Err(SeedError::DuplicateItem(2))));
        assert!(store.select_items().unwrap().is_empty());

        // still unseeded, so the next start retries and fails again
        assert!(seed_catalog_if_empty(&store, &path).is_err());

        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_conflict_with_existing_rows_writes_nothing() {
        let store = MemoryStore::new();
        let items = parse_catalog(CATALOG).unwrap();
        store.insert_item(items[1].clone()).unwrap();

        let result = store.insert_items(items);
        assert!(matches!(result, Err(StorageError::Conflict(_))));
        assert_eq!(store.select_items().unwrap().len(), 1);
    }

    #[test]
    fn test_missing_file() {
        let store = MemoryStore::new();
        let result = seed_catalog_if_empty(&store, "/nonexistent/items.json");
        assert!(matches!(result, Err(SeedError::Io(_))));
    }

    #[test]
    fn test_invalid_json() {
        let store = MemoryStore::new();
        let path = write_catalog("invalid", "{ not json");
        let result = seed_catalog_if_empty(&store, &path);
        assert!(matches!(result, Err(SeedError::Json(_))));
        let _ = fs::remove_file(path);
    }
}
