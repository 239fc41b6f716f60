//! Experience and leveling
//!
//! XP lookups against the progression curve, the per-message gain formula and
//! progress helpers for rank displays.

use super::curve::ProgressionCurve;

/// Level reached with `xp` total experience.
///
/// Greatest `i` with `curve[i] <= xp`: landing exactly on a threshold
/// completes that level, and anything past the last threshold stays at the
/// max level.
pub fn level_for(curve: &ProgressionCurve, xp: u64) -> u32 {
    let reached = curve.thresholds().partition_point(|&threshold| threshold <= xp);
    // thresholds[0] == 0, so at least one entry is always reached
    reached.saturating_sub(1) as u32
}

/// Unrounded XP for the `count`-th message of the day (1-based)
pub fn message_xp(base_xp: u32, phi: f64, count: u32) -> f64 {
    f64::from(base_xp) / (1.0 + phi * f64::from(count))
}

/// XP granted for the `count`-th message of the day, before the daily cap.
///
/// Exact halves round to the even neighbour.
pub fn message_gain(base_xp: u32, phi: f64, count: u32) -> u64 {
    message_xp(base_xp, phi, count).round_ties_even() as u64
}

/// XP a player earns in a day sending `messages` messages
pub fn daily_reference_xp(base_xp: u32, phi: f64, messages: u32) -> f64 {
    (1..=messages).map(|n| message_xp(base_xp, phi, n)).sum()
}

/// Cumulative XP range `(start, end)` of the level after `level`.
///
/// At the max level there is nothing left to climb, so the last level's range
/// is returned instead.
pub fn level_bounds(curve: &ProgressionCurve, level: u32) -> (u64, u64) {
    let max = curve.max_level();
    let level = level.min(max.saturating_sub(1));
    let start = curve.threshold(level).unwrap_or(0);
    let end = curve.threshold(level + 1).unwrap_or(start);
    (start, end)
}

/// XP earned into the current level and XP that level spans
pub fn level_progress(curve: &ProgressionCurve, xp: u64) -> (u64, u64) {
    let (start, end) = level_bounds(curve, level_for(curve, xp));
    let needed = end - start;
    (xp.saturating_sub(start).min(needed), needed)
}

/// Percentage through the current level, 0..=100
pub fn progress_percent(curve: &ProgressionCurve, xp: u64) -> u8 {
    let (current, needed) = level_progress(curve, xp);
    if needed == 0 {
        return 100;
    }
    (current.saturating_mul(100) / needed).min(100) as u8
}

/// Text progress bar like `[██████░░░░░░]`
pub fn progress_bar(current: u64, needed: u64, length: usize) -> String {
    let (current, needed) = if needed == 0 { (1, 1) } else { (current, needed) };
    let ratio = (current as f64 / needed as f64).clamp(0.0, 1.0);
    let filled = (length as f64 * ratio) as usize;

    let mut bar = String::with_capacity(length * 3 + 2);
    bar.push('[');
    bar.extend(std::iter::repeat('█').take(filled));
    bar.extend(std::iter::repeat('░').take(length - filled));
    bar.push(']');
    bar
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progression::curve::{build_curve, CurveParams, MAX_LEVEL};

    fn curve() -> ProgressionCurve {
        build_curve(&CurveParams::default()).unwrap()
    }

    #[test]
    fn test_level_for_thresholds() {
        let curve = curve();
        for i in 0..=MAX_LEVEL {
            let t = curve.threshold(i).unwrap();
            assert_eq!(level_for(&curve, t), i, "exact threshold of level {}", i);
            if i >= 1 {
                assert_eq!(level_for(&curve, t - 1), i - 1, "just below level {}", i);
            }
            assert_eq!(level_for(&curve, t + 1), i, "just above level {}", i);
        }
    }

    #[test]
    fn test_level_for_saturates() {
        let curve = curve();
        assert_eq!(level_for(&curve, 0), 0);
        assert_eq!(level_for(&curve, curve.terminal_xp() + 100_000), MAX_LEVEL);
        assert_eq!(level_for(&curve, u64::MAX), MAX_LEVEL);
        assert_eq!(curve.level_for(curve.terminal_xp()), MAX_LEVEL);
    }

    #[test]
    fn test_message_gain_decays() {
        assert_eq!(message_gain(200, 0.5, 1), 133);
        assert_eq!(message_gain(200, 0.5, 2), 100);
        assert_eq!(message_gain(200, 0.5, 6), 50);
        // 12.5 and 2.5 round to even
        assert_eq!(message_gain(200, 0.5, 30), 12);
        assert_eq!(message_gain(200, 0.5, 158), 2);
        // 13.33 still rounds to nearest
        assert_eq!(message_gain(200, 0.5, 29), 13);
        assert!(message_gain(200, 0.5, 1000) < message_gain(200, 0.5, 10));
    }

    #[test]
    fn test_daily_reference_xp() {
        let daily = daily_reference_xp(200, 0.5, 10);
        assert!((daily - 641.2842712842714).abs() < 1e-9);
        assert_eq!(daily_reference_xp(200, 0.5, 0), 0.0);
    }

    #[test]
    fn test_level_progress() {
        let curve = curve();
        let (start, end) = level_bounds(&curve, 0);
        assert_eq!((start, end), (0, 128));
        assert_eq!(level_progress(&curve, 64), (64, 128));
        assert_eq!(progress_percent(&curve, 64), 50);

        // Max level shows a full bar over the last level's span
        let top = curve.terminal_xp();
        let (current, needed) = level_progress(&curve, top + 5_000);
        assert_eq!(current, needed);
        assert_eq!(progress_percent(&curve, top + 5_000), 100);
    }

    #[test]
    fn test_progress_bar() {
        assert_eq!(progress_bar(0, 100, 12), "[░░░░░░░░░░░░]");
        assert_eq!(progress_bar(50, 100, 12), "[██████░░░░░░]");
        assert_eq!(progress_bar(100, 100, 12), "[████████████]");
        assert_eq!(progress_bar(150, 100, 12), "[████████████]");
        assert_eq!(progress_bar(10, 0, 12), "[████████████]");
    }
}
