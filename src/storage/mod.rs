//! Storage Layer
//!
//! CRUD contract over the players / items / ownership table set.
//! Every call returns a fully materialized record. A missing row is the
//! distinguished [`StorageError::NotFound`] outcome, so callers can treat
//! it as "create" instead of "fail".
//!
//! Calls are synchronous and blocking. The network layer runs them off
//! the async runtime.

pub mod memory;
pub mod native;
pub mod seed;

use thiserror::Error;

use crate::game::model::{
    AccountKey, Item, ItemId, Ownership, OwnershipField, Player, PlayerField,
};

pub use memory::MemoryStore;
pub use native::NativeStore;
pub use seed::{load_catalog, seed_catalog_if_empty, SeedError};

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// No row for the requested key.
    #[error("record not found: {0}")]
    NotFound(String),

    /// A row with this key already exists.
    #[error("duplicate key: {0}")]
    Conflict(String),

    /// Backend failure.
    #[error("database error: {0}")]
    Database(String),
}

impl StorageError {
    /// Whether this is the "no such row" outcome.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }

    pub(crate) fn player_not_found(account_key: AccountKey) -> Self {
        StorageError::NotFound(format!("player {}", account_key))
    }

    pub(crate) fn ownership_not_found(account_key: AccountKey, item_id: ItemId) -> Self {
        StorageError::NotFound(format!("ownership {}:{}", account_key, item_id))
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Persistence collaborator used by the action layer.
pub trait Storage: Send + Sync {
    /// Insert a new player. Fails with `Conflict` if the key exists.
    fn insert_player(&self, player: Player) -> StorageResult<Player>;

    /// Look up a player by account key.
    fn select_player(&self, account_key: AccountKey) -> StorageResult<Player>;

    /// Set one player field and return the updated record.
    fn update_player(&self, account_key: AccountKey, field: PlayerField) -> StorageResult<Player>;

    /// Insert a catalog item. Fails with `Conflict` if the key exists.
    fn insert_item(&self, item: Item) -> StorageResult<Item>;

    /// Insert a batch of catalog items atomically. Fails with `Conflict`,
    /// writing nothing, if any key exists or repeats within the batch.
    fn insert_items(&self, items: Vec<Item>) -> StorageResult<usize>;

    /// All catalog items, in key order.
    fn select_items(&self) -> StorageResult<Vec<Item>>;

    /// Insert an ownership record. Fails with `Conflict` if the pair exists.
    fn insert_ownership(&self, ownership: Ownership) -> StorageResult<Ownership>;

    /// Look up one ownership record.
    fn select_ownership(&self, account_key: AccountKey, item_id: ItemId) -> StorageResult<Ownership>;

    /// All ownership records of a player, in item key order.
    fn select_ownerships(&self, account_key: AccountKey) -> StorageResult<Vec<Ownership>>;

    /// Set one ownership field and return the updated record.
    fn update_ownership(
        &self,
        account_key: AccountKey,
        item_id: ItemId,
        field: OwnershipField,
    ) -> StorageResult<Ownership>;
}
