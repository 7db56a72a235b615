//! Embedded database store backed by `native_db`.
//!
//! One model per table. Ownership rows use a composite `"account:item"`
//! primary key plus a secondary key on the account for per-player scans.

use native_db::*;
use native_model::{native_model, Model};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;
use tracing::debug;

use super::{Storage, StorageError, StorageResult};
use crate::game::model::{
    AccountKey, Item, ItemId, Ownership, OwnershipField, Player, PlayerField,
};

// =============================================================================
// MODELS
// =============================================================================

/// Stored player row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[native_model(id = 1, version = 1)]
#[native_db]
pub struct StoredPlayer {
    /// Primary key - account key.
    #[primary_key]
    pub account_key: u64,
    /// Balance.
    pub coins: u64,
    /// Lifetime earnings since last reset.
    pub earned_coins: u64,
    /// Secondary currency.
    pub gold: u64,
    /// Prestige count.
    pub investors: u64,
    /// Last entry time.
    pub last_seen: u64,
}

impl StoredPlayer {
    fn from_player(player: &Player) -> Self {
        Self {
            account_key: player.account_key,
            coins: player.coins,
            earned_coins: player.earned_coins,
            gold: player.gold,
            investors: player.investors,
            last_seen: player.last_seen,
        }
    }

    fn to_player(&self) -> Player {
        Player {
            account_key: self.account_key,
            coins: self.coins,
            earned_coins: self.earned_coins,
            gold: self.gold,
            investors: self.investors,
            last_seen: self.last_seen,
        }
    }
}

/// Stored catalog item row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[native_model(id = 2, version = 1)]
#[native_db]
pub struct StoredItem {
    /// Primary key - item ID.
    #[primary_key]
    pub id: u64,
    /// Display name.
    pub name: String,
    /// Image reference.
    pub image_url: String,
    /// Base price.
    pub price: u64,
    /// Price growth.
    pub price_multiplier: f64,
    /// Base yield.
    pub coins_per_click: u64,
    /// Yield growth.
    pub coins_multiplier: f64,
    /// Click cooldown in seconds.
    pub click_cooldown: u64,
    /// Level cap.
    pub max_level: u64,
}

impl StoredItem {
    fn from_item(item: &Item) -> Self {
        Self {
            id: item.id,
            name: item.name.clone(),
            image_url: item.image_url.clone(),
            price: item.price,
            price_multiplier: item.price_multiplier,
            coins_per_click: item.coins_per_click,
            coins_multiplier: item.coins_multiplier,
            click_cooldown: item.click_cooldown,
            max_level: item.max_level,
        }
    }

    fn to_item(&self) -> Item {
        Item {
            id: self.id,
            name: self.name.clone(),
            image_url: self.image_url.clone(),
            price: self.price,
            price_multiplier: self.price_multiplier,
            coins_per_click: self.coins_per_click,
            coins_multiplier: self.coins_multiplier,
            click_cooldown: self.click_cooldown,
            max_level: self.max_level,
        }
    }
}

/// Stored ownership row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[native_model(id = 3, version = 1)]
#[native_db]
pub struct StoredOwnership {
    /// Primary key - composite of account key and item ID.
    #[primary_key]
    pub key: String,
    /// Owning account.
    #[secondary_key]
    pub account_key: u64,
    /// Owned item.
    pub item_id: u64,
    /// Level.
    pub level: u64,
    /// Next allowed click.
    pub next_click: u64,
    /// Last accepted click.
    pub last_click: u64,
}

impl StoredOwnership {
    fn composite_key(account_key: AccountKey, item_id: ItemId) -> String {
        format!("{}:{}", account_key, item_id)
    }

    fn from_ownership(ownership: &Ownership) -> Self {
        Self {
            key: Self::composite_key(ownership.account_key, ownership.item_id),
            account_key: ownership.account_key,
            item_id: ownership.item_id,
            level: ownership.level,
            next_click: ownership.next_click,
            last_click: ownership.last_click,
        }
    }

    fn to_ownership(&self) -> Ownership {
        Ownership {
            account_key: self.account_key,
            item_id: self.item_id,
            level: self.level,
            next_click: self.next_click,
            last_click: self.last_click,
        }
    }
}

static MODELS: OnceLock<Models> = OnceLock::new();

fn models() -> StorageResult<&'static Models> {
    if let Some(models) = MODELS.get() {
        return Ok(models);
    }

    let mut models = Models::new();
    models.define::<StoredPlayer>()?;
    models.define::<StoredItem>()?;
    models.define::<StoredOwnership>()?;
    Ok(MODELS.get_or_init(|| models))
}

// =============================================================================
// STORE
// =============================================================================

/// Persistent table set in a single database file.
pub struct NativeStore {
    db: Database<'static>,
}

impl NativeStore {
    /// Open or create a database at the given path.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Builder::new().create(models()?, path.as_ref())?;
        Ok(Self { db })
    }

    /// Create an in-memory database.
    pub fn in_memory() -> StorageResult<Self> {
        let db = Builder::new().create_in_memory(models()?)?;
        Ok(Self { db })
    }
}

impl Storage for NativeStore {
    fn insert_player(&self, player: Player) -> StorageResult<Player> {
        debug!("inserting player {}", player.account_key);
        let rw = self.db.rw_transaction()?;
        if rw.get().primary::<StoredPlayer>(player.account_key)?.is_some() {
            return Err(StorageError::Conflict(format!("player {}", player.account_key)));
        }
        rw.insert(StoredPlayer::from_player(&player))?;
        rw.commit()?;
        Ok(player)
    }

    fn select_player(&self, account_key: AccountKey) -> StorageResult<Player> {
        debug!("selecting player {}", account_key);
        let r = self.db.r_transaction()?;
        let stored: Option<StoredPlayer> = r.get().primary(account_key)?;
        stored
            .map(|s| s.to_player())
            .ok_or_else(|| StorageError::player_not_found(account_key))
    }

    fn update_player(&self, account_key: AccountKey, field: PlayerField) -> StorageResult<Player> {
        debug!("updating player {} {} -> {:?}", account_key, field.name(), field);
        let rw = self.db.rw_transaction()?;
        let stored: Option<StoredPlayer> = rw.get().primary(account_key)?;
        let mut player = stored
            .map(|s| s.to_player())
            .ok_or_else(|| StorageError::player_not_found(account_key))?;
        field.apply(&mut player);
        rw.upsert(StoredPlayer::from_player(&player))?;
        rw.commit()?;
        Ok(player)
    }

    fn insert_item(&self, item: Item) -> StorageResult<Item> {
        debug!("inserting item {}", item.id);
        let rw = self.db.rw_transaction()?;
        if rw.get().primary::<StoredItem>(item.id)?.is_some() {
            return Err(StorageError::Conflict(format!("item {}", item.id)));
        }
        rw.insert(StoredItem::from_item(&item))?;
        rw.commit()?;
        Ok(item)
    }

    fn insert_items(&self, items: Vec<Item>) -> StorageResult<usize> {
        debug!("inserting {} items", items.len());
        let rw = self.db.rw_transaction()?;
        let count = items.len();
        for item in &items {
            // reads see this transaction's own writes, so repeats in the batch conflict too
            if rw.get().primary::<StoredItem>(item.id)?.is_some() {
                return Err(StorageError::Conflict(format!("item {}", item.id)));
            }
            rw.insert(StoredItem::from_item(item))?;
        }
        rw.commit()?;
        Ok(count)
    }

    fn select_items(&self) -> StorageResult<Vec<Item>> {
        debug!("selecting all items");
        let r = self.db.r_transaction()?;
        let scan = r.scan().primary::<StoredItem>()?;
        let iter = scan.all()?;
        let items: Result<Vec<StoredItem>, _> = iter.collect();
        let items = items.map_err(|e| StorageError::Database(e.to_string()))?;
        Ok(items.iter().map(StoredItem::to_item).collect())
    }

    fn insert_ownership(&self, ownership: Ownership) -> StorageResult<Ownership> {
        debug!(
            "inserting ownership {}:{} at level {}",
            ownership.account_key, ownership.item_id, ownership.level
        );
        let stored = StoredOwnership::from_ownership(&ownership);
        let rw = self.db.rw_transaction()?;
        if rw.get().primary::<StoredOwnership>(stored.key.clone())?.is_some() {
            return Err(StorageError::Conflict(format!("ownership {}", stored.key)));
        }
        rw.insert(stored)?;
        rw.commit()?;
        Ok(ownership)
    }

    fn select_ownership(&self, account_key: AccountKey, item_id: ItemId) -> StorageResult<Ownership> {
        debug!("selecting ownership {}:{}", account_key, item_id);
        let r = self.db.r_transaction()?;
        let stored: Option<StoredOwnership> =
            r.get().primary(StoredOwnership::composite_key(account_key, item_id))?;
        stored
            .map(|s| s.to_ownership())
            .ok_or_else(|| StorageError::ownership_not_found(account_key, item_id))
    }

    fn select_ownerships(&self, account_key: AccountKey) -> StorageResult<Vec<Ownership>> {
        debug!("selecting ownerships of {}", account_key);
        let r = self.db.r_transaction()?;
        let scan = r
            .scan()
            .secondary::<StoredOwnership>(StoredOwnershipKey::account_key)?;
        let iter = scan.start_with(account_key)?;
        let rows: Result<Vec<StoredOwnership>, _> = iter.collect();
        let rows = rows.map_err(|e| StorageError::Database(e.to_string()))?;

        let mut owned: Vec<Ownership> = rows
            .iter()
            .filter(|row| row.account_key == account_key)
            .map(StoredOwnership::to_ownership)
            .collect();
        owned.sort_by_key(|o| o.item_id);
        Ok(owned)
    }

    fn update_ownership(
        &self,
        account_key: AccountKey,
        item_id: ItemId,
        field: OwnershipField,
    ) -> StorageResult<Ownership> {
        debug!("updating ownership {}:{} {} -> {:?}", account_key, item_id, field.name(), field);
        let rw = self.db.rw_transaction()?;
        let stored: Option<StoredOwnership> =
            rw.get().primary(StoredOwnership::composite_key(account_key, item_id))?;
        let mut ownership = stored
            .map(|s| s.to_ownership())
            .ok_or_else(|| StorageError::ownership_not_found(account_key, item_id))?;
        field.apply(&mut ownership);
        rw.upsert(StoredOwnership::from_ownership(&ownership))?;
        rw.commit()?;
        Ok(ownership)
    }
}

impl From<native_db::db_type::Error> for StorageError {
    fn from(err: native_db::db_type::Error) -> Self {
        StorageError::Database(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_item(id: ItemId) -> Item {
        Item {
            id,
            name: format!("item-{}", id),
            image_url: format!("/img/{}.png", id),
            price: 100,
            price_multiplier: 1.5,
            coins_per_click: 2,
            coins_multiplier: 1.1,
            click_cooldown: 5,
            max_level: 10,
        }
    }

    #[test]
    fn test_player_lifecycle() {
        let store = NativeStore::in_memory().unwrap();
        assert!(store.select_player(42).unwrap_err().is_not_found());

        store.insert_player(Player::new(42, 1000, 0, 100)).unwrap();
        let player = store.update_player(42, PlayerField::LastSeen(200)).unwrap();
        assert_eq!(player.last_seen, 200);
        assert_eq!(store.select_player(42).unwrap(), player);

        let dup = store.insert_player(Player::new(42, 0, 0, 0));
        assert!(matches!(dup, Err(StorageError::Conflict(_))));
    }

    #[test]
    fn test_items() {
        let store = NativeStore::in_memory().unwrap();
        store.insert_item(test_item(2)).unwrap();
        store.insert_item(test_item(1)).unwrap();

        let items = store.select_items().unwrap();
        assert_eq!(items, vec![test_item(1), test_item(2)]);
    }

    #[test]
    fn test_insert_items_all_or_nothing() {
        let store = NativeStore::in_memory().unwrap();
        let result = store.insert_items(vec![test_item(1), test_item(2), test_item(2), test_item(3)]);
        assert!(matches!(result, Err(StorageError::Conflict(_))));
        assert!(store.select_items().unwrap().is_empty());

        assert_eq!(store.insert_items(vec![test_item(1), test_item(2)]).unwrap(), 2);
        assert_eq!(store.select_items().unwrap().len(), 2);
    }

    #[test]
    fn test_ownerships() {
        let store = NativeStore::in_memory().unwrap();
        store.insert_ownership(Ownership::new(7, 3, 1)).unwrap();
        store.insert_ownership(Ownership::new(7, 1, 2)).unwrap();
        store.insert_ownership(Ownership::new(8, 1, 9)).unwrap();

        let owned = store.select_ownerships(7).unwrap();
        let ids: Vec<_> = owned.iter().map(|o| o.item_id).collect();
        assert_eq!(ids, vec![1, 3]);

        let updated = store.update_ownership(7, 3, OwnershipField::Level(4)).unwrap();
        assert_eq!(updated.level, 4);
        assert_eq!(store.select_ownership(7, 3).unwrap().level, 4);
        assert_eq!(store.select_ownership(8, 1).unwrap().level, 9);
        assert!(store.select_ownership(8, 3).unwrap_err().is_not_found());
    }
}
