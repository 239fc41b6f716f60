//! Offline maintenance
//!
//! Operator tasks run with the bot stopped: re-deriving every stored level
//! after a curve change, and restoring XP totals by hand.

use crate::error::StoreError;
use crate::progression::ProgressionCurve;
use crate::session::UserId;
use crate::store::UserStore;

/// One user whose stored level disagreed with the curve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelChange {
    pub user_id: UserId,
    pub old_level: u32,
    pub new_level: u32,
}

/// Result of a recalculation pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecalcReport {
    pub scanned: usize,
    pub changes: Vec<LevelChange>,
}

/// Re-derive every stored user's level from `curve`.
///
/// Only users whose level changes are written back, in a single batch. With
/// `dry_run` nothing is written.
pub fn recalculate_levels(
    store: &dyn UserStore,
    curve: &ProgressionCurve,
    dry_run: bool,
) -> Result<RecalcReport, StoreError> {
    let users = store.all()?;
    let scanned = users.len();

    let mut changes = Vec::new();
    let mut changed_users = Vec::new();
    for mut user in users {
        let level = curve.level_for(user.xp);
        if level != user.level {
            changes.push(LevelChange {
                user_id: user.user_id,
                old_level: user.level,
                new_level: level,
            });
            user.level = level;
            changed_users.push(user);
        }
    }

    if !dry_run && !changed_users.is_empty() {
        store.save_many(&changed_users)?;
    }

    log::info!(
        "Level recalculation: {} users scanned, {} changed{}",
        scanned,
        changes.len(),
        if dry_run { " (dry run)" } else { "" }
    );
    Ok(RecalcReport { scanned, changes })
}

/// Set a user's XP total and re-derive the level.
///
/// Creates the user if unknown. Returns the new level.
pub fn restore_xp(
    store: &dyn UserStore,
    curve: &ProgressionCurve,
    user_id: UserId,
    xp: u64,
    nick: Option<&str>,
) -> Result<u32, StoreError> {
    let mut user = store.fetch(user_id)?;
    user.xp = xp;
    user.level = curve.level_for(xp);
    if let Some(nick) = nick {
        user.set_nick(nick);
    }
    store.save(&user)?;

    log::info!("Restored user {}: {} XP, level {}", user_id, xp, user.level);
    Ok(user.level)
}
