//! Progression Engine
//!
//! Pure functions mapping (base stat, level, growth multiplier) to the
//! current value of an item: upgrade price, yield per click, yield per minute.
//! No I/O, no shared state.
//!
//! ## Rounding
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  price(level)  = trunc(base * m * m * ... * m)   (level × m)│
//! │  yield(level)  = trunc(base * m * ... * m * prestige)       │
//! │                              └─ (level - 1) × m ─┘          │
//! │                                                             │
//! │  Intermediate products stay in f64. Only the final          │
//! │  conversion to an integer truncates (floors).               │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Exponentiation is a multiplication loop, never `powf`: persisted
//! expectations depend on the exact float rounding of the loop.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// GROWTH LAW
// =============================================================================

/// How a base value grows with each level step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrowthLaw {
    /// Compound growth: `base * multiplier^steps`, by repeated multiplication.
    #[default]
    Geometric,
    /// Arithmetic growth: each step adds `base * (multiplier - 1)`.
    Linear,
}

impl GrowthLaw {
    /// Grow `base` by `steps` level steps. Returns the untruncated value.
    pub fn grow(self, base: u64, steps: u64, multiplier: f64) -> f64 {
        match self {
            GrowthLaw::Geometric => {
                let mut value = base as f64;
                for _ in 0..steps {
                    value *= multiplier;
                }
                value
            }
            GrowthLaw::Linear => {
                let base = base as f64;
                base + base * (multiplier - 1.0) * steps as f64
            }
        }
    }
}

impl fmt::Display for GrowthLaw {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrowthLaw::Geometric => write!(f, "geometric"),
            GrowthLaw::Linear => write!(f, "linear"),
        }
    }
}

impl FromStr for GrowthLaw {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "geometric" => Ok(GrowthLaw::Geometric),
            "linear" => Ok(GrowthLaw::Linear),
            other => Err(format!("unknown growth law: {}", other)),
        }
    }
}

/// Truncate a non-negative float to an integer quantity.
///
/// `as` saturates: negatives and NaN become 0, overflow becomes `u64::MAX`.
#[inline]
fn truncate(value: f64) -> u64 {
    value as u64
}

// =============================================================================
// PROGRESSION
// =============================================================================

/// Growth laws in effect for prices and yields.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progression {
    /// Law applied to upgrade prices.
    pub price_law: GrowthLaw,
    /// Law applied to per-click and per-minute yields.
    pub yield_law: GrowthLaw,
}

impl Progression {
    /// Create with explicit laws.
    pub const fn new(price_law: GrowthLaw, yield_law: GrowthLaw) -> Self {
        Self { price_law, yield_law }
    }

    /// Price to move from `level` to `level + 1`.
    ///
    /// Level 0 costs exactly `base_price`.
    pub fn upgrade_price(&self, base_price: u64, level: u64, multiplier: f64) -> u64 {
        if level == 0 {
            return base_price;
        }
        truncate(self.price_law.grow(base_price, level, multiplier))
    }

    /// Currency yielded by one click at `level`.
    ///
    /// Zero at level 0; level 1 yields `base_yield * prestige_multiplier`.
    pub fn yield_per_click(
        &self,
        base_yield: u64,
        level: u64,
        multiplier: f64,
        prestige_multiplier: f64,
    ) -> u64 {
        if level == 0 {
            return 0;
        }
        truncate(self.yield_law.grow(base_yield, level - 1, multiplier) * prestige_multiplier)
    }

    /// Currency accrued per minute of idle time at `level`.
    pub fn yield_per_minute(
        &self,
        base_yield: u64,
        level: u64,
        multiplier: f64,
        prestige_multiplier: f64,
    ) -> u64 {
        self.yield_per_click(base_yield, level, multiplier, prestige_multiplier)
    }
}

/// [`Progression::upgrade_price`] under geometric growth.
pub fn upgrade_price(base_price: u64, level: u64, multiplier: f64) -> u64 {
    Progression::default().upgrade_price(base_price, level, multiplier)
}

/// [`Progression::yield_per_click`] under geometric growth.
pub fn yield_per_click(base_yield: u64, level: u64, multiplier: f64, prestige_multiplier: f64) -> u64 {
    Progression::default().yield_per_click(base_yield, level, multiplier, prestige_multiplier)
}

/// [`Progression::yield_per_minute`] under geometric growth.
pub fn yield_per_minute(base_yield: u64, level: u64, multiplier: f64, prestige_multiplier: f64) -> u64 {
    Progression::default().yield_per_minute(base_yield, level, multiplier, prestige_multiplier)
}

// =============================================================================
// TESTS
// =============================================================================
