//! Which messages can earn XP

use super::progress::UserId;

/// Minimum trimmed length of a text-only message
pub const DEFAULT_MIN_LEN: usize = 5;

/// The parts of a chat message the reward logic looks at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageEvent {
    pub user_id: UserId,
    pub display_name: String,
    pub content: String,
    /// Attachments, stickers or embeds
    pub has_media: bool,
    pub from_bot: bool,
    /// Sent in a server channel rather than a DM
    pub in_guild: bool,
}

impl MessageEvent {
    /// A plain guild text message from a member
    pub fn text(user_id: UserId, display_name: &str, content: &str) -> Self {
        Self {
            user_id,
            display_name: display_name.to_string(),
            content: content.to_string(),
            has_media: false,
            from_bot: false,
            in_guild: true,
        }
    }

    pub fn with_media(mut self) -> Self {
        self.has_media = true;
        self
    }

    /// Bots and DMs never qualify; media always does; text needs `min_len`
    /// characters once trimmed.
    pub fn qualifies(&self, min_len: usize) -> bool {
        if self.from_bot || !self.in_guild {
            return false;
        }
        self.has_media || self.content.trim().chars().count() >= min_len
    }
}
