//! Milestone bonuses
//!
//! Every fifth level pays a one-time currency bonus from a fixed tier table.

use serde::{Deserialize, Serialize};

/// Highest level covered by the bonus table
pub const MILESTONE_MAX_LEVEL: u32 = 100;

/// Levels between two milestones
pub const MILESTONE_STEP: u32 = 5;

/// Bonus paid on reaching the final level
pub const FINAL_BONUS: u64 = 10_000;

/// Currency bonus for reaching `level`.
///
/// Zero unless `level` is a positive multiple of five. Levels above the table
/// are a caller bug: they panic in debug builds and pay nothing otherwise.
pub fn bonus_for(level: u32) -> u64 {
    debug_assert!(
        level <= MILESTONE_MAX_LEVEL,
        "bonus requested for level {} beyond {}",
        level,
        MILESTONE_MAX_LEVEL
    );
    if level > MILESTONE_MAX_LEVEL {
        log::warn!("Milestone bonus requested for out-of-range level {}", level);
        return 0;
    }
    if level == 0 || level % MILESTONE_STEP != 0 {
        return 0;
    }

    match level {
        MILESTONE_MAX_LEVEL => FINAL_BONUS,
        1..=19 => 250,
        20..=59 => 750,
        60..=99 => 2_500,
        _ => 0,
    }
}

/// Whether reaching `level` pays a bonus
pub fn is_milestone(level: u32) -> bool {
    bonus_for(level) > 0
}

/// One level crossed by a single XP grant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelUp {
    pub level: u32,
    /// Milestone bonus credited for this level (0 if none)
    pub bonus: u64,
}

/// Level ups for every level in `(old_level, new_level]`.
///
/// Curves configured past the bonus table pay nothing for the extra levels.
pub fn level_ups_between(old_level: u32, new_level: u32) -> Vec<LevelUp> {
    ((old_level + 1)..=new_level)
        .map(|level| {
            let bonus = if level <= MILESTONE_MAX_LEVEL { bonus_for(level) } else { 0 };
            LevelUp { level, bonus }
        })
        .collect()
}
