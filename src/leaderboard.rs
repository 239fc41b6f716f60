//! Leaderboard
//!
//! Ranks members by XP (then Ignis) and serves pages of the ranking. Rebuilding
//! reads every user, so the ranking is cached for a short time.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::Serialize;

use crate::error::StoreError;
use crate::progression::{progress_percent, ProgressionCurve};
use crate::session::{UserId, UserProgress};
use crate::store::{FlushReport, WriteBackCache};

/// Page sizes a caller may ask for
pub const PAGE_SIZES: [usize; 3] = [50, 100, 200];

/// One ranked member
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardEntry {
    /// 1-based position
    pub rank: usize,
    pub user_id: UserId,
    pub name: String,
    pub level: u32,
    pub xp: u64,
    pub coins: u64,
    /// Progress through the current level, 0..=100
    pub percent: u8,
}

/// Rank `users` by XP, then coins, then id
pub fn build_leaderboard(mut users: Vec<UserProgress>, curve: &ProgressionCurve) -> Vec<LeaderboardEntry> {
    users.sort_by(|a, b| {
        b.xp.cmp(&a.xp)
            .then(b.coins.cmp(&a.coins))
            .then(a.user_id.cmp(&b.user_id))
    });

    users
        .into_iter()
        .enumerate()
        .map(|(i, user)| LeaderboardEntry {
            rank: i + 1,
            user_id: user.user_id,
            name: user.display_name(),
            level: curve.level_for(user.xp),
            xp: user.xp,
            coins: user.coins,
            percent: progress_percent(curve, user.xp),
        })
        .collect()
}

/// A slice of the ranking
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    pub entries: Vec<LeaderboardEntry>,
    pub page: usize,
    pub per_page: usize,
    pub pages: usize,
    pub total: usize,
}

/// Cut page `page` (1-based) out of `entries`.
///
/// Unsupported page sizes fall back to the smallest one; pages past the end
/// are clamped to the last page.
pub fn paginate(entries: &[LeaderboardEntry], page: usize, per_page: usize) -> Page {
    let per_page = if PAGE_SIZES.contains(&per_page) { per_page } else { PAGE_SIZES[0] };
    let total = entries.len();
    let pages = total.div_ceil(per_page).max(1);
    let page = page.clamp(1, pages);

    let start = (page - 1) * per_page;
    let end = (start + per_page).min(total);
    Page {
        entries: entries.get(start..end).map(<[_]>::to_vec).unwrap_or_default(),
        page,
        per_page,
        pages,
        total,
    }
}

/// Ranking cached for `ttl`
#[derive(Debug)]
pub struct LeaderboardCache {
    ttl: Duration,
    state: Mutex<Option<(DateTime<Utc>, Arc<Vec<LeaderboardEntry>>)>>,
}

impl LeaderboardCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            state: Mutex::new(None),
        }
    }

    /// Cached ranking, rebuilt with `rebuild` if missing or older than the TTL
    pub fn get_or_rebuild<E>(
        &self,
        now: DateTime<Utc>,
        rebuild: impl FnOnce() -> Result<Vec<LeaderboardEntry>, E>,
    ) -> Result<Arc<Vec<LeaderboardEntry>>, E> {
        let mut state = self.state.lock();
        if let Some((built_at, entries)) = state.as_ref() {
            if now - *built_at <= self.ttl {
                return Ok(Arc::clone(entries));
            }
        }

        let entries = Arc::new(rebuild()?);
        log::info!("Leaderboard rebuilt ({} members)", entries.len());
        *state = Some((now, Arc::clone(&entries)));
        Ok(entries)
    }

    /// Force the next read to rebuild
    pub fn invalidate(&self) {
        *self.state.lock() = None;
        log::info!("Leaderboard cache invalidated");
    }
}

/// What an admin cache reset did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResetReport {
    pub flush: FlushReport,
    pub evicted: usize,
}

/// Ranking of every member, read through the write-back cache so unsaved
/// progress shows up
#[derive(Debug)]
pub struct Leaderboard {
    curve: Arc<ProgressionCurve>,
    users: Arc<WriteBackCache>,
    cache: LeaderboardCache,
}

impl Leaderboard {
    pub fn new(curve: Arc<ProgressionCurve>, users: Arc<WriteBackCache>, ttl: Duration) -> Self {
        Self {
            curve,
            users,
            cache: LeaderboardCache::new(ttl),
        }
    }

    /// Full ranking, at most `ttl` old
    pub fn ranking(&self, now: DateTime<Utc>) -> Result<Arc<Vec<LeaderboardEntry>>, StoreError> {
        self.cache
            .get_or_rebuild::<StoreError>(now, || Ok(build_leaderboard(self.users.merged_users()?, &self.curve)))
    }

    pub fn page(&self, now: DateTime<Utc>, page: usize, per_page: usize) -> Result<Page, StoreError> {
        Ok(paginate(&self.ranking(now)?, page, per_page))
    }

    /// A member's entry, or `None` if they have never been seen
    pub fn entry_for(&self, now: DateTime<Utc>, user_id: UserId) -> Result<Option<LeaderboardEntry>, StoreError> {
        Ok(self.ranking(now)?.iter().find(|e| e.user_id == user_id).cloned())
    }

    /// Save pending progress, drop clean cached users and force the next
    /// read to rebuild
    pub fn reset(&self) -> ResetReport {
        let flush = self.users.flush();
        let evicted = self.users.evict_clean();
        self.cache.invalidate();
        ResetReport { flush, evicted }
    }
}
