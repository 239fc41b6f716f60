//! Per-message XP and currency gain
//!
//! XP decays harmonically with the number of messages sent that day and is
//! capped per day. A small flat salary is paid for the first few messages.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::progress::UserProgress;
use crate::progression::{level_ups_between, message_gain, LevelUp, ProgressionCurve};

/// Tunables for per-message rewards
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GainRules {
    /// XP of a message with no decay applied
    pub base_xp: u32,
    /// Decay factor: the n-th message of the day earns `base / (1 + phi * n)`
    pub phi: f64,
    /// Most XP a member can earn in one day
    pub daily_cap: u64,
    /// Coins paid per message while under `money_message_limit`
    pub money_per_message: u64,
    pub money_message_limit: u32,
    /// Seconds between two rewarded messages
    pub cooldown_secs: i64,
}

impl Default for GainRules {
    fn default() -> Self {
        Self {
            base_xp: 200,
            phi: 0.5,
            daily_cap: 4_000,
            money_per_message: 5,
            money_message_limit: 5,
            cooldown_secs: 30,
        }
    }
}

impl GainRules {
    pub fn cooldown(&self) -> Duration {
        Duration::seconds(self.cooldown_secs)
    }
}

/// What one rewarded message changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GainOutcome {
    pub xp_gain: u64,
    /// Flat per-message coins
    pub salary: u64,
    /// Sum of milestone bonuses from `level_ups`
    pub bonus: u64,
    /// One entry per level crossed, in order
    pub level_ups: Vec<LevelUp>,
}

impl GainOutcome {
    /// Total coins credited
    pub fn currency_gain(&self) -> u64 {
        self.salary + self.bonus
    }

    /// Level reached, if the message crossed at least one threshold
    pub fn new_level(&self) -> Option<u32> {
        self.level_ups.last().map(|up| up.level)
    }
}

/// Apply one accepted message to `user`.
///
/// The caller has already checked eligibility and the cooldown; this always
/// counts the message.
pub fn apply_message_gain(
    rules: &GainRules,
    curve: &ProgressionCurve,
    user: &mut UserProgress,
    now: DateTime<Utc>,
) -> GainOutcome {
    user.roll_over_day(now.date_naive());
    user.messages_today = user.messages_today.saturating_add(1);
    let count = user.messages_today;

    let raw_gain = message_gain(rules.base_xp, rules.phi, count);
    let xp_gain = raw_gain.min(rules.daily_cap.saturating_sub(user.xp_today));

    let mut outcome = GainOutcome {
        xp_gain,
        ..GainOutcome::default()
    };

    if count <= rules.money_message_limit {
        outcome.salary = rules.money_per_message;
        user.add_coins(rules.money_per_message);
    }

    if xp_gain > 0 {
        user.xp = user.xp.saturating_add(xp_gain);
        user.xp_today += xp_gain;

        let old_level = user.level;
        let new_level = curve.level_for(user.xp);
        if new_level > old_level {
            outcome.level_ups = level_ups_between(old_level, new_level);
            outcome.bonus = outcome.level_ups.iter().map(|up| up.bonus).sum();
            user.add_coins(outcome.bonus);
        }
        user.level = new_level;
    }

    user.last_message_at = Some(now);
    outcome
}
