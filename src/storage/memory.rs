//! In-memory store, used by tests and when no database path is configured.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

use super::{Storage, StorageError, StorageResult};
use crate::game::model::{
    AccountKey, Item, ItemId, Ownership, OwnershipField, Player, PlayerField,
};

#[derive(Default)]
struct Tables {
    players: BTreeMap<AccountKey, Player>,
    items: BTreeMap<ItemId, Item>,
    ownerships: BTreeMap<(AccountKey, ItemId), Ownership>,
}

/// Table set held in process memory.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StorageResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| StorageError::Database("table lock poisoned".into()))
    }

    fn write(&self) -> StorageResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| StorageError::Database("table lock poisoned".into()))
    }
}

impl Storage for MemoryStore {
    fn insert_player(&self, player: Player) -> StorageResult<Player> {
        debug!("inserting player {}", player.account_key);
        let mut tables = self.write()?;
        if tables.players.contains_key(&player.account_key) {
            return Err(StorageError::Conflict(format!("player {}", player.account_key)));
        }
        tables.players.insert(player.account_key, player.clone());
        Ok(player)
    }

    fn select_player(&self, account_key: AccountKey) -> StorageResult<Player> {
        debug!("selecting player {}", account_key);
        self.read()?
            .players
            .get(&account_key)
            .cloned()
            .ok_or_else(|| StorageError::player_not_found(account_key))
    }

    fn update_player(&self, account_key: AccountKey, field: PlayerField) -> StorageResult<Player> {
        debug!("updating player {} {} -> {:?}", account_key, field.name(), field);
        let mut tables = self.write()?;
        let player = tables
            .players
            .get_mut(&account_key)
            .ok_or_else(|| StorageError::player_not_found(account_key))?;
        field.apply(player);
        Ok(player.clone())
    }

    fn insert_item(&self, item: Item) -> StorageResult<Item> {
        debug!("inserting item {}", item.id);
        let mut tables = self.write()?;
        if tables.items.contains_key(&item.id) {
            return Err(StorageError::Conflict(format!("item {}", item.id)));
        }
        tables.items.insert(item.id, item.clone());
        Ok(item)
    }

    fn insert_items(&self, items: Vec<Item>) -> StorageResult<usize> {
        debug!("inserting {} items", items.len());
        let mut tables = self.write()?;

        let mut batch = BTreeMap::new();
        for item in items {
            if tables.items.contains_key(&item.id) || batch.contains_key(&item.id) {
                return Err(StorageError::Conflict(format!("item {}", item.id)));
            }
            batch.insert(item.id, item);
        }

        let count = batch.len();
        tables.items.append(&mut batch);
        Ok(count)
    }

    fn select_items(&self) -> StorageResult<Vec<Item>> {
        debug!("selecting all items");
        Ok(self.read()?.items.values().cloned().collect())
    }

    fn insert_ownership(&self, ownership: Ownership) -> StorageResult<Ownership> {
        debug!(
            "inserting ownership {}:{} at level {}",
            ownership.account_key, ownership.item_id, ownership.level
        );
        let key = (ownership.account_key, ownership.item_id);
        let mut tables = self.write()?;
        if tables.ownerships.contains_key(&key) {
            return Err(StorageError::Conflict(format!("ownership {}:{}", key.0, key.1)));
        }
        tables.ownerships.insert(key, ownership.clone());
        Ok(ownership)
    }

    fn select_ownership(&self, account_key: AccountKey, item_id: ItemId) -> StorageResult<Ownership> {
        debug!("selecting ownership {}:{}", account_key, item_id);
        self.read()?
            .ownerships
            .get(&(account_key, item_id))
            .cloned()
            .ok_or_else(|| StorageError::ownership_not_found(account_key, item_id))
    }

    fn select_ownerships(&self, account_key: AccountKey) -> StorageResult<Vec<Ownership>> {
        debug!("selecting ownerships of {}", account_key);
        Ok(self
            .read()?
            .ownerships
            .range((account_key, ItemId::MIN)..=(account_key, ItemId::MAX))
            .map(|(_, o)| o.clone())
            .collect())
    }

    fn update_ownership(
        &self,
        account_key: AccountKey,
        item_id: ItemId,
        field: OwnershipField,
    ) -> StorageResult<Ownership> {
        debug!("updating ownership {}:{} {} -> {:?}", account_key, item_id, field.name(), field);
        let mut tables = self.write()?;
        let ownership = tables
            .ownerships
            .get_mut(&(account_key, item_id))
            .ok_or_else(|| StorageError::ownership_not_found(account_key, item_id))?;
        field.apply(ownership);
        Ok(ownership.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_item(id: ItemId) -> Item {
        Item {
            id,
            name: format!("item-{}", id),
            image_url: String::new(),
            price: 10,
            price_multiplier: 1.5,
            coins_per_click: 1,
            coins_multiplier: 1.2,
            click_cooldown: 0,
            max_level: 0,
        }
    }

    #[test]
    fn test_player_roundtrip() {
        let store = MemoryStore::new();
        assert!(store.select_player(1).unwrap_err().is_not_found());

        store.insert_player(Player::new(1, 100, 0, 10)).unwrap();
        let updated = store.update_player(1, PlayerField::Coins(250)).unwrap();
        assert_eq!(updated.coins, 250);
        assert_eq!(store.select_player(1).unwrap().coins, 250);
    }

    #[test]
    fn test_duplicate_player_conflicts() {
        let store = MemoryStore::new();
        store.insert_player(Player::new(1, 0, 0, 0)).unwrap();
        let result = store.insert_player(Player::new(1, 0, 0, 0));
        assert!(matches!(result, Err(StorageError::Conflict(_))));
    }

    #[test]
    fn test_update_missing_player() {
        let store = MemoryStore::new();
        let result = store.update_player(9, PlayerField::Gold(1));
        assert!(result.unwrap_err().is_not_found());
    }

    #[test]
    fn test_ownerships_scoped_to_account() {
        let store = MemoryStore::new();
        store.insert_ownership(Ownership::new(1, 2, 1)).unwrap();
        store.insert_ownership(Ownership::new(1, 1, 3)).unwrap();
        store.insert_ownership(Ownership::new(2, 1, 5)).unwrap();

        let owned = store.select_ownerships(1).unwrap();
        let ids: Vec<_> = owned.iter().map(|o| o.item_id).collect();
        assert_eq!(ids, vec![1, 2]);

        let updated = store.update_ownership(2, 1, OwnershipField::Level(6)).unwrap();
        assert_eq!(updated.level, 6);
        assert_eq!(store.select_ownership(1, 1).unwrap().level, 3);
    }

    #[test]
    fn test_insert_items_batch() {
        let store = MemoryStore::new();
        let count = store.insert_items(vec![test_item(2), test_item(1)]).unwrap();
        assert_eq!(count, 2);

        let ids: Vec<_> = store.select_items().unwrap().iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_insert_items_all_or_nothing() {
        let store = MemoryStore::new();
        let result = store.insert_items(vec![test_item(1), test_item(2), test_item(2), test_item(3)]);
        assert!(matches!(result, Err(StorageError::Conflict(_))));
        assert!(store.select_items().unwrap().is_empty());

        store.insert_item(test_item(5)).unwrap();
        let result = store.insert_items(vec![test_item(4), test_item(5)]);
        assert!(matches!(result, Err(StorageError::Conflict(_))));
        assert_eq!(store.select_items().unwrap().len(), 1);
    }

    #[test]
    fn test_duplicate_ownership_conflicts() {
        let store = MemoryStore::new();
        store.insert_ownership(Ownership::new(1, 1, 1)).unwrap();
        let result = store.insert_ownership(Ownership::new(1, 1, 2));
        assert!(matches!(result, Err(StorageError::Conflict(_))));
    }
}
