//! Trader standing clamp.

use crate::profile::{ProfileSnapshot, TraderInfo};

pub const STANDING_LOWER_BOUND: f64 = -7.0;
pub const STANDING_UPPER_BOUND: f64 = 15.0;

pub fn clamp_standing(value: f64, lower: f64, upper: f64) -> f64 {
    value.max(lower).min(upper)
}

/// Clamp the post-session standing with `trader_id` into `[lower, upper]`
/// and write it to the merged profile and, if present, the secondary
/// persona. Returns the written value; None when the post-session profile
/// has no entry for the trader.
pub fn apply_standing_clamp(
    merged: &mut ProfileSnapshot,
    post: &ProfileSnapshot,
    secondary: Option<&mut ProfileSnapshot>,
    trader_id: &str,
    lower: f64,
    upper: f64,
) -> Option<f64> {
    let Some(raw) = post.standing(trader_id) else {
        log::debug!("standing: no post-session entry for trader {trader_id}");
        return None;
    };
    let clamped = clamp_standing(raw, lower, upper);

    merged
        .traders_info
        .entry(trader_id.to_string())
        .or_insert_with(TraderInfo::default)
        .standing = clamped;

    if let Some(other) = secondary {
        other
            .traders_info
            .entry(trader_id.to_string())
            .or_insert_with(TraderInfo::default)
            .standing = clamped;
    }

    if clamped != raw {
        log::debug!("standing: trader {trader_id} clamped {raw} -> {clamped}");
    }
    Some(clamped)
}
