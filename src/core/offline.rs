//! Offline Earnings
//!
//! Idle accrual is settled synchronously when a player enters the game.
//! There is no ticking process.

/// Seconds in one accrual unit.
pub const SECONDS_PER_MINUTE: u64 = 60;

/// Whole minutes of offline time credited for `elapsed_secs`, capped at
/// `max_offline_secs`.
pub fn offline_minutes(elapsed_secs: u64, max_offline_secs: u64) -> u64 {
    elapsed_secs.min(max_offline_secs) / SECONDS_PER_MINUTE
}

/// Coins accrued while offline.
///
/// `per_minute_yields` holds one entry per owned item, already scaled by
/// level and prestige. Saturates instead of overflowing.
pub fn offline_earnings<I>(elapsed_secs: u64, max_offline_secs: u64, per_minute_yields: I) -> u64
where
    I: IntoIterator<Item = u64>,
{
    let minutes = offline_minutes(elapsed_secs, max_offline_secs);
    if minutes == 0 {
        return 0;
    }

    per_minute_yields
        .into_iter()
        .fold(0u64, |acc, per_minute| acc.saturating_add(per_minute.saturating_mul(minutes)))
}
