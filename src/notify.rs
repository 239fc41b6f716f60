//! Level-up notifications
//!
//! The session reports every level crossed to a sink; the chat layer decides
//! how to show it.

use parking_lot::Mutex;
use rand::seq::SliceRandom;

use crate::progression::LevelUp;
use crate::session::UserId;

/// Celebration lines picked at random for level-up announcements
pub const LEVEL_UP_MESSAGES: &[&str] = &[
    "you burn brighter than ever, and the adventure is only beginning!",
    "the warmth of your determination now lights up a new level.",
    "your legend is slowly being written in the clouds. Let's keep climbing!",
    "you cross the skies with grace, I admire your progress!",
    "your passion burns with a new glow, I'm proud of you!",
    "a fair wind carries you ever higher. Keep going!",
    "the balloon rises again, lifted by your remarkable efforts.",
    "every new level brings you closer to the stars.",
    "your inner fire grows, and with it Lady Flamme's wonder.",
    "another step on your quest: enjoy the view!",
];

/// Receives one call per level crossed
pub trait LevelUpSink: Send + Sync {
    fn on_level_up(&self, user_id: UserId, display_name: &str, level_up: LevelUp);
}

/// Announcement text for a level up
pub fn format_level_up(display_name: &str, level_up: LevelUp, flavour: &str) -> String {
    let mut text = format!("{} → Level {}: {}", display_name, level_up.level, flavour);
    if level_up.bonus > 0 {
        text.push_str(&format!(" MILESTONE {} REACHED! +{} Ignis", level_up.level, level_up.bonus));
    }
    text
}

/// Logs each level up with a random celebration line
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl LevelUpSink for LogSink {
    fn on_level_up(&self, user_id: UserId, display_name: &str, level_up: LevelUp) {
        let flavour = LEVEL_UP_MESSAGES
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or("well done!");
        log::info!("[{}] {}", user_id, format_level_up(display_name, level_up, flavour));
    }
}

/// Keeps every notification; used by simulations and tests
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<(UserId, LevelUp)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(UserId, LevelUp)> {
        self.events.lock().clone()
    }

    /// Total milestone bonus announced so far
    pub fn total_bonus(&self) -> u64 {
        self.events.lock().iter().map(|(_, up)| up.bonus).sum()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl LevelUpSink for RecordingSink {
    fn on_level_up(&self, user_id: UserId, _display_name: &str, level_up: LevelUp) {
        self.events.lock().push((user_id, level_up));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_level_up() {
        let plain = format_level_up("Ember", LevelUp { level: 3, bonus: 0 }, "nice");
        assert_eq!(plain, "Ember → Level 3: nice");

        let milestone = format_level_up("Ember", LevelUp { level: 5, bonus: 250 }, "nice");
        assert!(milestone.ends_with("MILESTONE 5 REACHED! +250 Ignis"));
    }

    #[test]
    fn test_recording_sink() {
        let sink = RecordingSink::new();
        sink.on_level_up(1, "a", LevelUp { level: 4, bonus: 0 });
        sink.on_level_up(1, "a", LevelUp { level: 5, bonus: 250 });
        assert_eq!(sink.events().len(), 2);
        assert_eq!(sink.total_bonus(), 250);

        sink.clear();
        assert!(sink.events().is_empty());
    }
}
