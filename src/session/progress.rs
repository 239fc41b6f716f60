//! Per-user progression record

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Discord snowflake of a member
pub type UserId = u64;

/// Everything the bot tracks about one member
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserProgress {
    pub user_id: UserId,
    /// Last seen display name
    pub nick: Option<String>,
    /// Lifetime XP
    pub xp: u64,
    /// Always `level_for(xp)` on the current curve
    pub level: u32,
    /// Ignis balance
    pub coins: u64,
    /// Shop purchases, by item key
    pub items: Vec<String>,
    /// Time of the last message that earned XP
    pub last_message_at: Option<DateTime<Utc>>,
    /// Day the daily counters below belong to
    pub last_active_day: Option<NaiveDate>,
    pub messages_today: u32,
    pub xp_today: u64,
}

impl UserProgress {
    /// Fresh record for a member who has never been seen
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            ..Self::default()
        }
    }

    /// Reset the daily counters if `today` is a new day.
    /// Returns true if a reset happened.
    pub fn roll_over_day(&mut self, today: NaiveDate) -> bool {
        if self.last_active_day == Some(today) {
            return false;
        }
        self.last_active_day = Some(today);
        self.messages_today = 0;
        self.xp_today = 0;
        true
    }

    /// Whether the last rewarded message is more recent than `cooldown`
    pub fn cooldown_active(&self, now: DateTime<Utc>, cooldown: Duration) -> bool {
        match self.last_message_at {
            Some(last) => now - last < cooldown,
            None => false,
        }
    }

    /// Update the stored display name; returns true if it changed
    pub fn set_nick(&mut self, nick: &str) -> bool {
        if self.nick.as_deref() == Some(nick) {
            return false;
        }
        self.nick = Some(nick.to_string());
        true
    }

    /// Name to show in rankings
    pub fn display_name(&self) -> String {
        match &self.nick {
            Some(nick) if !nick.is_empty() => nick.clone(),
            _ => format!("User {}", self.user_id),
        }
    }

    pub fn add_coins(&mut self, amount: u64) {
        self.coins = self.coins.saturating_add(amount);
    }

    /// Spend coins, returns false if not enough
    pub fn spend_coins(&mut self, amount: u64) -> bool {
        if self.coins >= amount {
            self.coins -= amount;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_roll_over_day_resets_counters() {
        let mut user = UserProgress::new(7);
        let monday = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        assert!(user.roll_over_day(monday));

        user.messages_today = 12;
        user.xp_today = 900;
        assert!(!user.roll_over_day(monday));
        assert_eq!(user.messages_today, 12);

        assert!(user.roll_over_day(monday.succ_opt().unwrap()));
        assert_eq!(user.messages_today, 0);
        assert_eq!(user.xp_today, 0);
    }

    #[test]
    fn test_cooldown() {
        let mut user = UserProgress::new(7);
        let now = Utc.with_ymd_and_hms(2024, 3, 4, 10, 0, 0).unwrap();
        let cooldown = Duration::seconds(30);
        assert!(!user.cooldown_active(now, cooldown));

        user.last_message_at = Some(now);
        assert!(user.cooldown_active(now + Duration::seconds(29), cooldown));
        assert!(!user.cooldown_active(now + Duration::seconds(30), cooldown));
    }

    #[test]
    fn test_coins() {
        let mut user = UserProgress::new(1);
        user.add_coins(100);
        assert!(!user.spend_coins(101));
        assert!(user.spend_coins(60));
        assert_eq!(user.coins, 40);
    }

    #[test]
    fn test_display_name() {
        let mut user = UserProgress::new(42);
        assert_eq!(user.display_name(), "User 42");
        assert!(user.set_nick("Ember"));
        assert!(!user.set_nick("Ember"));
        assert_eq!(user.display_name(), "Ember");
    }
}
