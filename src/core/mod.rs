//! Core Progression Primitives
//!
//! Pure, stateless economy math. No I/O, no clock, no storage.
//!
//! - `progression`: upgrade price and yield curves
//! - `prestige`: investor count and multiplier
//! - `offline`: idle accrual settled on entry

pub mod offline;
pub mod prestige;
pub mod progression;

pub use offline::{offline_earnings, offline_minutes};
pub use prestige::{prestige_count, prestige_multiplier};
pub use progression::{upgrade_price, yield_per_click, yield_per_minute, GrowthLaw, Progression};
