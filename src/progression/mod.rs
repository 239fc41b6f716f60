//! Progression systems

pub mod spline;
pub mod curve;
pub mod xp;
pub mod milestones;

pub use curve::{build_curve, CurveParams, Knot, KnotSet, ProgressionCurve, MAX_LEVEL};
pub use xp::{level_for, message_gain, daily_reference_xp, level_bounds, level_progress, progress_percent, progress_bar};
pub use milestones::{bonus_for, is_milestone, level_ups_between, LevelUp};
