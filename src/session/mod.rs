//! Message-driven progression
//!
//! Entry point for every chat message: eligibility, cooldown, XP and coin
//! gain, level-up notifications.

pub mod progress;
pub mod gain;
pub mod eligibility;

pub use progress::{UserId, UserProgress};
pub use gain::{apply_message_gain, GainOutcome, GainRules};
pub use eligibility::{MessageEvent, DEFAULT_MIN_LEN};

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::clock::Clock;
use crate::error::StoreError;
use crate::notify::LevelUpSink;
use crate::progression::ProgressionCurve;
use crate::store::WriteBackCache;

/// Applies message rewards to cached user records
pub struct ProgressionSession {
    curve: Arc<ProgressionCurve>,
    rules: GainRules,
    min_len: usize,
    cache: Arc<WriteBackCache>,
    sink: Arc<dyn LevelUpSink>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for ProgressionSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressionSession")
            .field("max_level", &self.curve.max_level())
            .field("rules", &self.rules)
            .field("min_len", &self.min_len)
            .field("cache", &self.cache)
            .finish()
    }
}

impl ProgressionSession {
    pub fn new(
        curve: Arc<ProgressionCurve>,
        rules: GainRules,
        cache: Arc<WriteBackCache>,
        sink: Arc<dyn LevelUpSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            curve,
            rules,
            min_len: DEFAULT_MIN_LEN,
            cache,
            sink,
            clock,
        }
    }

    /// Minimum trimmed length for text-only messages
    pub fn with_min_len(mut self, min_len: usize) -> Self {
        self.min_len = min_len;
        self
    }

    pub fn curve(&self) -> &Arc<ProgressionCurve> {
        &self.curve
    }

    pub fn rules(&self) -> &GainRules {
        &self.rules
    }

    pub fn cache(&self) -> &Arc<WriteBackCache> {
        &self.cache
    }

    /// Handle a message arriving now
    pub fn handle_message(&self, event: &MessageEvent) -> Result<Option<GainOutcome>, StoreError> {
        self.handle_message_at(event, self.clock.now())
    }

    /// Handle a message arriving at `now`.
    ///
    /// Returns `None` when the message does not qualify or the user is still
    /// in cooldown; in both cases the user's record is left untouched.
    pub fn handle_message_at(
        &self,
        event: &MessageEvent,
        now: DateTime<Utc>,
    ) -> Result<Option<GainOutcome>, StoreError> {
        if !event.qualifies(self.min_len) {
            return Ok(None);
        }

        let cooldown = self.rules.cooldown();
        let outcome = self.cache.with_user(event.user_id, |user| {
            if user.cooldown_active(now, cooldown) {
                return None;
            }
            user.set_nick(&event.display_name);
            Some(apply_message_gain(&self.rules, &self.curve, user, now))
        })?;

        if let Some(outcome) = &outcome {
            for level_up in &outcome.level_ups {
                self.sink.on_level_up(event.user_id, &event.display_name, *level_up);
            }
            if !outcome.level_ups.is_empty() {
                log::debug!(
                    "User {} reached level {} (+{} bonus)",
                    event.user_id,
                    outcome.new_level().unwrap_or_default(),
                    outcome.bonus
                );
            }
        }

        Ok(outcome)
    }
}
