//! Investor Prestige
//!
//! Resetting progress converts lifetime earnings into investors.
//! Each investor adds a fixed fraction to every yield.

/// Investors earned by `lifetime_earned` coins at `threshold` coins each.
///
/// A zero threshold earns nothing.
pub fn prestige_count(lifetime_earned: u64, threshold: u64) -> u64 {
    lifetime_earned.checked_div(threshold).unwrap_or(0)
}

/// Yield multiplier for `count` investors: `1 + count * percent_per_unit`.
///
/// `percent_per_unit` is a fraction (`0.02` = 2% per investor).
pub fn prestige_multiplier(count: u64, percent_per_unit: f64) -> f64 {
    1.0 + count as f64 * percent_per_unit
}
