//! Action Orchestration
//!
//! The four player actions: enter, click, buy, reset. Each is a short
//! read-modify-write sequence against storage, run under the account's
//! lock, ending with a freshly assembled [`GameView`].
//!
//! ```text
//!   enter ──► (create account?) ──► offline accrual ──► last_seen = now
//!   click ──► cooldown check ──► coins += yield ──► click times
//!   buy   ──► level cap ──► balance check ──► coins -= price ──► level + 1
//!   reset ──► investors += earned / threshold ──► coins = earned = 0 ──► levels
//! ```
//!
//! Validation failures happen before the first write. A storage failure
//! part-way through aborts the action without rollback.

use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::config::{env_or, ConfigError};
use crate::core::offline::offline_earnings;
use crate::core::prestige::prestige_multiplier;
use crate::core::progression::{GrowthLaw, Progression};
use crate::game::locks::AccountLocks;
use crate::game::model::{
    AccountKey, Catalog, ItemId, Ownership, OwnershipField, Player, PlayerField,
};
use crate::game::view::{assemble, investors_after_reset, GameView};
use crate::storage::{Storage, StorageError};

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Game rules.
#[derive(Debug, Clone, PartialEq)]
pub struct GameConfig {
    /// Balance of a new account.
    pub starting_coins: u64,
    /// Gold of a new account.
    pub starting_gold: u64,
    /// Item every account owns at level 1 from the start.
    pub starter_item: ItemId,
    /// Lifetime coins per investor earned on reset.
    pub coins_per_investor: u64,
    /// Yield bonus per investor, as a fraction.
    pub percent_per_investor: f64,
    /// Longest offline period credited on entry.
    pub max_offline_secs: u64,
    /// Credit idle yield on entry.
    pub offline_earnings: bool,
    /// Price and yield growth laws.
    pub progression: Progression,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            starting_coins: 0,
            starting_gold: 0,
            starter_item: 1,
            coins_per_investor: 1_000_000,
            percent_per_investor: 0.02,
            max_offline_secs: 3600, // 60 minutes
            offline_earnings: true,
            progression: Progression::default(),
        }
    }
}

impl GameConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            starting_coins: env_or("CLICKER_STARTING_COINS", defaults.starting_coins)?,
            starting_gold: env_or("CLICKER_STARTING_GOLD", defaults.starting_gold)?,
            starter_item: env_or("CLICKER_STARTER_ITEM", defaults.starter_item)?,
            coins_per_investor: env_or("CLICKER_COINS_PER_INVESTOR", defaults.coins_per_investor)?,
            percent_per_investor: env_or(
                "CLICKER_PERCENT_PER_INVESTOR",
                defaults.percent_per_investor,
            )?,
            max_offline_secs: env_or("CLICKER_MAX_OFFLINE_SECS", defaults.max_offline_secs)?,
            offline_earnings: env_or("CLICKER_OFFLINE_EARNINGS", defaults.offline_earnings)?,
            progression: Progression::new(
                env_or::<GrowthLaw>("CLICKER_PRICE_GROWTH", defaults.progression.price_law)?,
                env_or::<GrowthLaw>("CLICKER_YIELD_GROWTH", defaults.progression.yield_law)?,
            ),
        })
    }
}

// =============================================================================
// ERRORS
// =============================================================================

/// Action errors.
#[derive(Debug, Error)]
pub enum ActionError {
    /// Balance below the upgrade price.
    #[error("not enough coins")]
    InsufficientCoins {
        /// Price of the next level.
        price: u64,
        /// Current balance.
        balance: u64,
    },

    /// Click arrived before the item's cooldown elapsed.
    #[error("you can't click now")]
    CooldownActive {
        /// Earliest accepted click time.
        next_click: u64,
    },

    /// Item is already at its level cap.
    #[error("max level reached")]
    MaxLevelReached {
        /// Level cap.
        max_level: u64,
    },

    /// No account with this key.
    #[error("account {0} not found")]
    UnknownAccount(AccountKey),

    /// No catalog item with this key.
    #[error("item {0} not found")]
    UnknownItem(ItemId),

    /// Storage failure.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl ActionError {
    /// Whether the request was rejected by a game rule (no mutation).
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ActionError::InsufficientCoins { .. }
                | ActionError::CooldownActive { .. }
                | ActionError::MaxLevelReached { .. }
        )
    }

    /// Whether an account or item key does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ActionError::UnknownAccount(_) | ActionError::UnknownItem(_))
    }
}

/// Result type for actions.
pub type ActionResult<T> = Result<T, ActionError>;

// =============================================================================
// SERVICE
// =============================================================================

/// Runs player actions against a store and the seeded catalog.
pub struct GameService {
    store: Arc<dyn Storage>,
    catalog: Arc<Catalog>,
    config: GameConfig,
    locks: AccountLocks,
}

impl GameService {
    /// Create a service. The catalog must already be seeded and loaded.
    pub fn new(store: Arc<dyn Storage>, catalog: Arc<Catalog>, config: GameConfig) -> Self {
        if !catalog.contains(config.starter_item) {
            warn!("starter item {} is not in the catalog", config.starter_item);
        }

        Self {
            store,
            catalog,
            config,
            locks: AccountLocks::new(),
        }
    }

    /// Game rules in effect.
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// The item catalog.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Log in, creating the account on first entry.
    ///
    /// Credits offline yield since the last entry, then stamps `now`.
    #[instrument(skip(self))]
    pub fn enter(&self, account_key: AccountKey, now: u64) -> ActionResult<GameView> {
        self.locks.with_account(account_key, || {
            info!("try to enter game: account {}", account_key);

            let player = match self.store.select_player(account_key) {
                Ok(player) => player,
                Err(e) if e.is_not_found() => self.create_account(account_key, now)?,
                Err(e) => return Err(e.into()),
            };

            let ownerships = self.store.select_ownerships(account_key)?;

            let mut earned = 0;
            if self.config.offline_earnings {
                earned = self.offline_earnings(&player, &ownerships, now);
                if earned > 0 {
                    debug!("account {} earned {} coins offline", account_key, earned);
                    self.credit(&player, earned)?;
                }
            }

            let player = self.store.update_player(account_key, PlayerField::LastSeen(now))?;

            let mut view = assemble(&player, &self.catalog, &ownerships, &self.config);
            view.offline_earnings = earned;
            Ok(view)
        })
    }

    /// Click an item, adding its current yield to the balance.
    ///
    /// Unowned items yield nothing. Clicks inside an item's cooldown
    /// window are rejected without mutation.
    #[instrument(skip(self))]
    pub fn click(&self, account_key: AccountKey, item_id: ItemId, now: u64) -> ActionResult<GameView> {
        self.locks.with_account(account_key, || {
            info!("try to click: account {} item {}", account_key, item_id);

            let mut player = self.player(account_key)?;
            let item = self
                .catalog
                .get(item_id)
                .ok_or(ActionError::UnknownItem(item_id))?;
            let ownership = self.ownership(account_key, item_id)?;

            if let Some(owned) = &ownership {
                if now < owned.next_click {
                    debug!("click rejected: account {} item {} until {}", account_key, item_id, owned.next_click);
                    return Err(ActionError::CooldownActive { next_click: owned.next_click });
                }
            }

            let level = ownership.as_ref().map_or(0, |o| o.level);
            let coins = self.config.progression.yield_per_click(
                item.coins_per_click,
                level,
                item.coins_multiplier,
                prestige_multiplier(player.investors, self.config.percent_per_investor),
            );

            if coins > 0 {
                player = self.credit(&player, coins)?;
            }

            if ownership.is_some() {
                self.store
                    .update_ownership(account_key, item_id, OwnershipField::LastClick(now))?;
                self.store.update_ownership(
                    account_key,
                    item_id,
                    OwnershipField::NextClick(now.saturating_add(item.click_cooldown)),
                )?;
            }

            self.view(&player)
        })
    }

    /// Buy the next level of an item.
    ///
    /// The first purchase creates the ownership record at level 1.
    #[instrument(skip(self))]
    pub fn buy(&self, account_key: AccountKey, item_id: ItemId) -> ActionResult<GameView> {
        self.locks.with_account(account_key, || {
            info!("try to buy: account {} item {}", account_key, item_id);

            let player = self.player(account_key)?;
            let item = self
                .catalog
                .get(item_id)
                .ok_or(ActionError::UnknownItem(item_id))?;
            let ownership = self.ownership(account_key, item_id)?;
            let level = ownership.as_ref().map_or(0, |o| o.level);

            if !item.can_upgrade_from(level) {
                return Err(ActionError::MaxLevelReached { max_level: item.max_level });
            }

            let price = self
                .config
                .progression
                .upgrade_price(item.price, level, item.price_multiplier);

            if player.coins < price {
                debug!("buy rejected: account {} has {} of {}", account_key, player.coins, price);
                return Err(ActionError::InsufficientCoins { price, balance: player.coins });
            }

            let player = self
                .store
                .update_player(account_key, PlayerField::Coins(player.coins - price))?;

            match ownership {
                None => {
                    self.store.insert_ownership(Ownership::new(account_key, item_id, 1))?;
                }
                Some(owned) => {
                    self.store.update_ownership(
                        account_key,
                        item_id,
                        OwnershipField::Level(owned.level + 1),
                    )?;
                }
            }

            info!("account {} bought item {} level {} for {}", account_key, item_id, level + 1, price);
            self.view(&player)
        })
    }

    /// Prestige: convert lifetime earnings into investors and start over.
    ///
    /// Balance and earnings go to zero; every item drops to level 0 except
    /// the starter item, which returns to level 1.
    #[instrument(skip(self))]
    pub fn reset(&self, account_key: AccountKey) -> ActionResult<GameView> {
        self.locks.with_account(account_key, || {
            info!("try to reset game: account {}", account_key);

            let player = self.player(account_key)?;
            let investors = investors_after_reset(&player, &self.config);

            self.store
                .update_player(account_key, PlayerField::Investors(investors))?;
            self.store
                .update_player(account_key, PlayerField::EarnedCoins(0))?;
            let player = self.store.update_player(account_key, PlayerField::Coins(0))?;

            let starter = self.config.starter_item;
            let mut starter_found = false;

            for owned in self.store.select_ownerships(account_key)? {
                let target = if owned.item_id == starter {
                    starter_found = true;
                    1
                } else {
                    0
                };

                if owned.level != target {
                    self.store
                        .update_ownership(account_key, owned.item_id, OwnershipField::Level(target))?;
                }
            }

            if !starter_found {
                self.store.insert_ownership(Ownership::new(account_key, starter, 1))?;
            }

            info!("account {} reset with {} investors", account_key, investors);
            self.view(&player)
        })
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    fn create_account(&self, account_key: AccountKey, now: u64) -> ActionResult<Player> {
        warn!("account {} not found, creating new account", account_key);

        let player = self.store.insert_player(Player::new(
            account_key,
            self.config.starting_coins,
            self.config.starting_gold,
            now,
        ))?;
        self.store
            .insert_ownership(Ownership::new(account_key, self.config.starter_item, 1))?;

        Ok(player)
    }

    fn player(&self, account_key: AccountKey) -> ActionResult<Player> {
        self.store.select_player(account_key).map_err(|e| {
            if e.is_not_found() {
                ActionError::UnknownAccount(account_key)
            } else {
                e.into()
            }
        })
    }

    fn ownership(&self, account_key: AccountKey, item_id: ItemId) -> ActionResult<Option<Ownership>> {
        match self.store.select_ownership(account_key, item_id) {
            Ok(owned) => Ok(Some(owned)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Add `coins` to both balance and lifetime earnings.
    fn credit(&self, player: &Player, coins: u64) -> ActionResult<Player> {
        let account_key = player.account_key;
        self.store.update_player(
            account_key,
            PlayerField::Coins(player.coins.saturating_add(coins)),
        )?;
        Ok(self.store.update_player(
            account_key,
            PlayerField::EarnedCoins(player.earned_coins.saturating_add(coins)),
        )?)
    }

    fn offline_earnings(&self, player: &Player, ownerships: &[Ownership], now: u64) -> u64 {
        let multiplier = prestige_multiplier(player.investors, self.config.percent_per_investor);
        let progression = &self.config.progression;

        let per_minute = ownerships.iter().filter_map(|owned| {
            let item = self.catalog.get(owned.item_id)?;
            Some(progression.yield_per_minute(
                item.coins_per_click,
                owned.level,
                item.coins_multiplier,
                multiplier,
            ))
        });

        offline_earnings(
            now.saturating_sub(player.last_seen),
            self.config.max_offline_secs,
            per_minute,
        )
    }

    fn view(&self, player: &Player) -> ActionResult<GameView> {
        let ownerships = self.store.select_ownerships(player.account_key)?;
        Ok(assemble(player, &self.catalog, &ownerships, &self.config))
    }
}

// =============================================================================
// TESTS
// =============================================================================
