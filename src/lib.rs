//! # Clicker Game Server
//!
//! Backend for an idle clicker game: players click items for coins, buy
//! item levels, and reset for a permanent yield bonus.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    CLICKER SERVER                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Pure economy math                         │
//! │  ├── progression.rs - Price and yield curves                 │
//! │  ├── prestige.rs - Investor count and multiplier             │
//! │  └── offline.rs  - Idle accrual                              │
//! │                                                              │
//! │  game/           - Game rules                                │
//! │  ├── model.rs    - Player, item and ownership records        │
//! │  ├── view.rs     - Game-view assembly                        │
//! │  ├── actions.rs  - Enter, click, buy, reset                  │
//! │  └── locks.rs    - Per-account serialization                 │
//! │                                                              │
//! │  storage/        - Persistence                               │
//! │  ├── memory.rs   - In-memory tables                          │
//! │  ├── native.rs   - Embedded native_db tables                 │
//! │  └── seed.rs     - Catalog bootstrap                         │
//! │                                                              │
//! │  network/        - HTTP surface                              │
//! │  ├── server.rs   - Server loop and routing                   │
//! │  ├── protocol.rs - Query parsing and JSON bodies             │
//! │  └── static_files.rs - Web client                            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Request Flow
//!
//! An action reads the player, the catalog and the player's ownership
//! records, runs them through the progression engine, writes the changed
//! fields back, and reassembles the game view from storage.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod core;
pub mod game;
pub mod network;
pub mod storage;

// Re-export commonly used types
pub use config::{AppConfig, ConfigError, StorageConfig};
pub use core::progression::{GrowthLaw, Progression};
pub use game::actions::{ActionError, GameConfig, GameService};
pub use game::model::{AccountKey, Catalog, Item, ItemId, Ownership, Player};
pub use game::view::{GameView, ItemView};
pub use network::server::{GameServer, ServerConfig};
pub use storage::{MemoryStore, NativeStore, Storage, StorageError};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
