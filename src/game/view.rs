//! Game-View Assembler
//!
//! Merges the item catalog with a player's ownership records into the
//! view returned by every action. Nothing here is persisted; the view is
//! rebuilt from storage on each request.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::prestige::{prestige_count, prestige_multiplier};
use crate::game::actions::GameConfig;
use crate::game::model::{AccountKey, Catalog, Item, ItemId, Ownership, Player};

/// Per-item view.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItemView {
    /// Item key.
    pub id: ItemId,
    /// Display name.
    pub name: String,
    /// Image reference.
    pub image_url: String,
    /// Owned level (0 = not owned).
    pub current_level: u64,
    /// Level cap (0 = uncapped).
    pub max_level: u64,
    /// Price to buy the next level.
    pub current_price: u64,
    /// Price of the purchase after the next one (`current_price` is the
    /// price of the next one).
    pub next_level_price: u64,
    /// Click cooldown in seconds.
    #[serde(rename = "click_timeout")]
    pub click_cooldown: u64,
    /// Earliest accepted click time.
    pub next_click: u64,
    /// Last accepted click time.
    pub last_click: u64,
    /// Yield per click at the current level.
    pub current_coins_per_click: u64,
    /// Yield per click one level up.
    pub next_level_coins_per_click: u64,
    /// Idle yield per minute at the current level.
    pub current_coins_per_minute: u64,
}

/// The assembled game state for one player.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameView {
    /// Account key.
    #[serde(rename = "telegram_id")]
    pub account_key: AccountKey,
    /// Last entry time.
    pub last_seen: u64,
    /// Balance.
    pub current_coins: u64,
    /// Coins earned since the last reset.
    pub earned_coins: u64,
    /// Secondary currency.
    pub current_gold: u64,
    /// Investors held now.
    pub current_investors: u64,
    /// Investors held after a reset right now.
    pub investors_after_reset: u64,
    /// Yield multiplier in effect.
    pub current_investors_multiplier: f64,
    /// Yield multiplier after a reset right now.
    pub investors_multiplier_after_reset: f64,
    /// Bonus per investor, in percent.
    pub percents_per_investor: f64,
    /// Coins credited for offline time by this request.
    pub offline_earnings: u64,
    /// Every catalog item, keyed by item key.
    pub cards: BTreeMap<ItemId, ItemView>,
}

impl GameView {
    /// Look up one item.
    pub fn item(&self, id: ItemId) -> Option<&ItemView> {
        self.cards.get(&id)
    }
}

/// Investors a player would hold after resetting now.
///
/// Resets add to the stored count, so this never drops below it.
pub fn investors_after_reset(player: &Player, config: &GameConfig) -> u64 {
    player
        .investors
        .saturating_add(prestige_count(player.earned_coins, config.coins_per_investor))
}

fn item_view(item: &Item, ownership: Option<&Ownership>, multiplier: f64, config: &GameConfig) -> ItemView {
    let progression = &config.progression;
    let level = ownership.map_or(0, |o| o.level);
    let next = level.saturating_add(1);

    ItemView {
        id: item.id,
        name: item.name.clone(),
        image_url: item.image_url.clone(),
        current_level: level,
        max_level: item.max_level,
        current_price: progression.upgrade_price(item.price, level, item.price_multiplier),
        next_level_price: progression.upgrade_price(item.price, next, item.price_multiplier),
        click_cooldown: item.click_cooldown,
        next_click: ownership.map_or(0, |o| o.next_click),
        last_click: ownership.map_or(0, |o| o.last_click),
        current_coins_per_click: progression.yield_per_click(
            item.coins_per_click,
            level,
            item.coins_multiplier,
            multiplier,
        ),
        next_level_coins_per_click: progression.yield_per_click(
            item.coins_per_click,
            next,
            item.coins_multiplier,
            multiplier,
        ),
        current_coins_per_minute: progression.yield_per_minute(
            item.coins_per_click,
            level,
            item.coins_multiplier,
            multiplier,
        ),
    }
}

/// Merge catalog and ownership into per-item views.
///
/// Every catalog item starts at level 0. Ownership records at level 0 or
/// referencing items missing from the catalog are skipped.
pub fn merge_items(
    catalog: &Catalog,
    ownerships: &[Ownership],
    multiplier: f64,
    config: &GameConfig,
) -> BTreeMap<ItemId, ItemView> {
    let mut cards: BTreeMap<ItemId, ItemView> = catalog
        .iter()
        .map(|item| (item.id, item_view(item, None, multiplier, config)))
        .collect();

    for ownership in ownerships {
        if ownership.level < 1 {
            continue;
        }
        let Some(item) = catalog.get(ownership.item_id) else {
            continue;
        };
        cards.insert(item.id, item_view(item, Some(ownership), multiplier, config));
    }

    cards
}

/// Build the full game view for `player`.
pub fn assemble(
    player: &Player,
    catalog: &Catalog,
    ownerships: &[Ownership],
    config: &GameConfig,
) -> GameView {
    let current_multiplier = prestige_multiplier(player.investors, config.percent_per_investor);
    let after_reset = investors_after_reset(player, config);

    GameView {
        account_key: player.account_key,
        last_seen: player.last_seen,
        current_coins: player.coins,
        earned_coins: player.earned_coins,
        current_gold: player.gold,
        current_investors: player.investors,
        investors_after_reset: after_reset,
        current_investors_multiplier: current_multiplier,
        investors_multiplier_after_reset: prestige_multiplier(after_reset, config.percent_per_investor),
        percents_per_investor: config.percent_per_investor * 100.0,
        offline_earnings: 0,
        cards: merge_items(catalog, ownerships, current_multiplier, config),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        Catalog::new(vec![
            Item {
                id: 1,
                name: "Lemonade".into(),
                image_url: "/img/1.png".into(),
                price: 100,
                price_multiplier: 1.5,
                coins_per_click: 1,
                coins_multiplier: 2.1,
                click_cooldown: 0,
                max_level: 0,
            },
            Item {
                id: 2,
                name: "Bakery".into(),
                image_url: "/img/2.png".into(),
                price: 10,
                price_multiplier: 3.0,
                coins_per_click: 10,
                coins_multiplier: 2.0,
                click_cooldown: 30,
                max_level: 5,
            },
        ])
    }

    fn config() -> GameConfig {
        GameConfig {
            coins_per_investor: 1_000,
            percent_per_investor: 0.02,
            ..Default::default()
        }
    }

    #[test]
    fn test_unowned_items_at_level_zero() {
        let player = Player::new(1, 0, 0, 0);
        let view = assemble(&player, &catalog(), &[], &config());

        assert_eq!(view.cards.len(), 2);
        let item = view.item(2).unwrap();
        assert_eq!(item.current_level, 0);
        assert_eq!(item.current_price, 10);
        assert_eq!(item.next_level_price, 30);
        assert_eq!(item.current_coins_per_click, 0);
        assert_eq!(item.next_level_coins_per_click, 10);
        assert_eq!(item.click_cooldown, 30);
    }

    #[test]
    fn test_owned_item_overrides() {
        let player = Player::new(1, 0, 0, 0);
        let mut owned = Ownership::new(1, 1, 3);
        owned.next_click = 77;
        owned.last_click = 70;
        let view = assemble(&player, &catalog(), &[owned], &config());

        let item = view.item(1).unwrap();
        assert_eq!(item.current_level, 3);
        assert_eq!(item.current_price, 337);
        assert_eq!(item.next_level_price, 506);
        assert_eq!(item.current_coins_per_click, 4);
        assert_eq!(item.next_level_coins_per_click, 9);
        assert_eq!(item.current_coins_per_minute, 4);
        assert_eq!(item.next_click, 77);
        assert_eq!(item.last_click, 70);
        assert_eq!(view.item(2).unwrap().current_level, 0);
    }

    #[test]
    fn test_unknown_and_zero_level_records_skipped() {
        let player = Player::new(1, 0, 0, 0);
        let records = vec![Ownership::new(1, 99, 4), Ownership::new(1, 2, 0)];
        let view = assemble(&player, &catalog(), &records, &config());

        assert_eq!(view.cards.len(), 2);
        assert!(view.item(99).is_none());
        assert_eq!(view.item(2).unwrap().current_level, 0);
        assert_eq!(view.item(2).unwrap().current_price, 10);
    }

    #[test]
    fn test_prestige_applied_to_yields() {
        let mut player = Player::new(1, 0, 0, 0);
        player.investors = 50;
        let view = assemble(&player, &catalog(), &[Ownership::new(1, 1, 2)], &config());

        assert_eq!(view.current_investors_multiplier, 2.0);
        assert_eq!(view.item(1).unwrap().current_coins_per_click, 4);
        // prices ignore prestige
        assert_eq!(view.item(1).unwrap().current_price, 225);
    }

    #[test]
    fn test_reset_preview() {
        let mut player = Player::new(1, 500, 0, 0);
        player.earned_coins = 5_500;
        player.investors = 2;
        let view = assemble(&player, &catalog(), &[], &config());

        assert_eq!(view.current_investors, 2);
        assert_eq!(view.investors_after_reset, 7);
        assert!((view.current_investors_multiplier - 1.04).abs() < 1e-12);
        assert!((view.investors_multiplier_after_reset - 1.14).abs() < 1e-12);
        assert!((view.percents_per_investor - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_view_json_shape() {
        let player = Player::new(5, 10, 3, 1_000);
        let view = assemble(&player, &catalog(), &[Ownership::new(5, 1, 1)], &config());
        let json = serde_json::to_value(&view).unwrap();

        assert_eq!(json["telegram_id"], 5);
        assert_eq!(json["current_coins"], 10);
        assert_eq!(json["current_gold"], 3);
        assert_eq!(json["cards"]["1"]["current_level"], 1);
        assert_eq!(json["cards"]["1"]["current_price"], 150);
        assert_eq!(json["cards"]["1"]["next_level_price"], 225);
        assert!(json["cards"]["1"].get("upgrade_price").is_none());
        assert!(json.get("user_id").is_none());
        assert_eq!(json["cards"]["2"]["click_timeout"], 30);
    }
}
