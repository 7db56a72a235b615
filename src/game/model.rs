//! Persisted Records
//!
//! Players, catalog items and ownership records as the storage layer
//! materializes them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Externally supplied numeric player identifier.
pub type AccountKey = u64;

/// Catalog item identifier.
pub type ItemId = u64;

// =============================================================================
// PLAYER
// =============================================================================

/// A player account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Account key (caller-provided, never generated).
    pub account_key: AccountKey,
    /// Current balance.
    pub coins: u64,
    /// Coins earned since the last reset.
    pub earned_coins: u64,
    /// Secondary currency.
    pub gold: u64,
    /// Prestige count.
    pub investors: u64,
    /// Last entry time (Unix seconds).
    pub last_seen: u64,
}

impl Player {
    /// Fresh account with `coins` as both balance and lifetime earnings.
    pub fn new(account_key: AccountKey, coins: u64, gold: u64, now: u64) -> Self {
        Self {
            account_key,
            coins,
            earned_coins: coins,
            gold,
            investors: 0,
            last_seen: now,
        }
    }
}

/// Single-field update of a [`Player`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayerField {
    /// Set balance.
    Coins(u64),
    /// Set lifetime earnings.
    EarnedCoins(u64),
    /// Set gold.
    Gold(u64),
    /// Set prestige count.
    Investors(u64),
    /// Set last-seen timestamp.
    LastSeen(u64),
}

impl PlayerField {
    /// Apply this update to a record.
    pub fn apply(self, player: &mut Player) {
        match self {
            PlayerField::Coins(v) => player.coins = v,
            PlayerField::EarnedCoins(v) => player.earned_coins = v,
            PlayerField::Gold(v) => player.gold = v,
            PlayerField::Investors(v) => player.investors = v,
            PlayerField::LastSeen(v) => player.last_seen = v,
        }
    }

    /// Column name, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            PlayerField::Coins(_) => "coins",
            PlayerField::EarnedCoins(_) => "earned_coins",
            PlayerField::Gold(_) => "gold",
            PlayerField::Investors(_) => "investors",
            PlayerField::LastSeen(_) => "last_seen",
        }
    }
}

// =============================================================================
// CATALOG
// =============================================================================

fn default_multiplier() -> f64 {
    1.0
}

/// A purchasable upgrade, shared by all players. Immutable after seeding.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Item key.
    pub id: ItemId,
    /// Display name.
    pub name: String,
    /// Image reference for the client.
    #[serde(default)]
    pub image_url: String,
    /// Price of the first level.
    pub price: u64,
    /// Price growth per level.
    #[serde(default = "default_multiplier")]
    pub price_multiplier: f64,
    /// Yield of the first level.
    pub coins_per_click: u64,
    /// Yield growth per level.
    #[serde(default = "default_multiplier")]
    pub coins_multiplier: f64,
    /// Seconds between clicks (0 = no cooldown).
    #[serde(default)]
    pub click_cooldown: u64,
    /// Highest purchasable level (0 = uncapped).
    #[serde(default)]
    pub max_level: u64,
}

impl Item {
    /// Whether another level can be bought from `level`.
    pub fn can_upgrade_from(&self, level: u64) -> bool {
        self.max_level == 0 || level < self.max_level
    }
}

/// The seeded item catalog, loaded once at startup.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    items: BTreeMap<ItemId, Item>,
}

impl Catalog {
    /// Build from a list of items. Later duplicates replace earlier ones.
    pub fn new(items: impl IntoIterator<Item = Item>) -> Self {
        Self {
            items: items.into_iter().map(|item| (item.id, item)).collect(),
        }
    }

    /// Look up an item.
    pub fn get(&self, id: ItemId) -> Option<&Item> {
        self.items.get(&id)
    }

    /// Whether an item exists.
    pub fn contains(&self, id: ItemId) -> bool {
        self.items.contains_key(&id)
    }

    /// All items in key order.
    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// =============================================================================
// OWNERSHIP
// =============================================================================

/// A player's level in one item. Unique per (account, item).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ownership {
    /// Owning account.
    pub account_key: AccountKey,
    /// Owned item.
    pub item_id: ItemId,
    /// Current level (0 = not owned).
    pub level: u64,
    /// Earliest time the next click is accepted (Unix seconds).
    pub next_click: u64,
    /// Time of the last accepted click (Unix seconds).
    pub last_click: u64,
}

impl Ownership {
    /// New record at `level` with no click history.
    pub fn new(account_key: AccountKey, item_id: ItemId, level: u64) -> Self {
        Self {
            account_key,
            item_id,
            level,
            next_click: 0,
            last_click: 0,
        }
    }
}

/// Single-field update of an [`Ownership`] record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OwnershipField {
    /// Set level.
    Level(u64),
    /// Set next allowed click time.
    NextClick(u64),
    /// Set last click time.
    LastClick(u64),
}

impl OwnershipField {
    /// Apply this update to a record.
    pub fn apply(self, ownership: &mut Ownership) {
        match self {
            OwnershipField::Level(v) => ownership.level = v,
            OwnershipField::NextClick(v) => ownership.next_click = v,
            OwnershipField::LastClick(v) => ownership.last_click = v,
        }
    }

    /// Column name, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            OwnershipField::Level(_) => "level",
            OwnershipField::NextClick(_) => "next_click",
            OwnershipField::LastClick(_) => "last_click",
        }
    }
}
