//! # Progress
//!
//! XP to level arithmetic shared by the server and the tester.
//!
//! ## Bands
//!
//! - Every level spans a fixed band of [`XP_PER_LEVEL`] points
//! - Level 1 starts at 0 XP, level 2 at 100 XP, level 3 at 200 XP, ...
//! - Exact multiples of 100 open the next level, so 100 XP is level 2 at 0%
//! - Negative XP is clamped to level 1 instead of being rejected
//!
//! ## Level is derived
//!
//! The stored `level` column is always rewritten from `xp` on every update.
//! Never bump it on its own, advance XP to [`start_of_level`] instead.
use serde::{Deserialize, Serialize};

pub const XP_PER_LEVEL: i64 = 100;

/// Level for a cumulative XP total.
pub fn level_from_xp(total_xp: i64) -> i64 {
    if total_xp < 0 {
        return 1;
    }

    total_xp / XP_PER_LEVEL + 1
}

/// First XP value belonging to `level`. Levels below 1 map to 0.
pub fn start_of_level(level: i64) -> i64 {
    level.max(1).saturating_sub(1).saturating_mul(XP_PER_LEVEL)
}

/// Where an XP total sits inside its level band.
///
/// Built by [`progress_from_xp`], never stored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub current_xp: i64,
    pub current_level: i64,
    pub xp_for_current_level: i64,
    pub xp_for_next_level: i64,
    pub xp_progress: i64,
    pub xp_needed: i64,
    pub progress_percentage: f64,
}

impl ProgressSnapshot {
    pub fn xp_remaining(&self) -> i64 {
        self.xp_needed - self.xp_progress
    }

    pub fn is_level_complete(&self) -> bool {
        self.xp_progress >= self.xp_needed
    }
}

pub fn progress_from_xp(current_xp: i64) -> ProgressSnapshot {
    let current_level = level_from_xp(current_xp);

    let xp_for_current_level = start_of_level(current_level);
    // saturates only within 100 of i64::MAX
    let xp_for_next_level = xp_for_current_level.saturating_add(XP_PER_LEVEL);

    let xp_progress = current_xp - xp_for_current_level;
    let xp_needed = XP_PER_LEVEL;

    let percentage = (xp_progress as f64 / xp_needed as f64 * 100.0).clamp(0.0, 100.0);

    ProgressSnapshot {
        current_xp,
        current_level,
        xp_for_current_level,
        xp_for_next_level,
        xp_progress,
        xp_needed,
        progress_percentage: round_hundredths(percentage),
    }
}

fn round_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
