//! Game Logic Module
//!
//! Records, rules and actions of the clicker game.
//!
//! ## Module Structure
//!
//! - `model`: Player, item and ownership records
//! - `view`: Game-view assembly from catalog and ownership
//! - `actions`: Enter, click, buy and reset orchestration
//! - `locks`: Per-account serialization

pub mod actions;
pub mod locks;
pub mod model;
pub mod view;

// Re-export key types
pub use actions::{ActionError, ActionResult, GameConfig, GameService};
pub use locks::AccountLocks;
pub use model::{
    AccountKey, Catalog, Item, ItemId, Ownership, OwnershipField, Player, PlayerField,
};
pub use view::{assemble, investors_after_reset, merge_items, GameView, ItemView};
