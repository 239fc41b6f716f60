//! Progression curve construction
//!
//! Turns a few designer knots (level -> days spent clearing that level) into
//! the cumulative XP table used for every level lookup. The table is built
//! once at startup and never changes for the lifetime of the process.

use serde::{Deserialize, Serialize};

use super::spline::NaturalSpline;
use super::xp::daily_reference_xp;
use crate::error::CurveError;

/// Highest reachable level
pub const MAX_LEVEL: u32 = 100;

/// Default XP granted by the first message of a day before decay
pub const DEFAULT_BASE_XP: u32 = 200;

/// Default decay factor for per-message XP
pub const DEFAULT_PHI: f64 = 0.5;

/// Messages per day sent by the reference player the curve is tuned for
pub const DEFAULT_TARGET_DAILY_MESSAGES: u32 = 10;

/// A designer anchor: clearing `level` should take about `days` days for the
/// reference player.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Knot {
    pub level: u32,
    pub days: f64,
}

impl Knot {
    pub const fn new(level: u32, days: f64) -> Self {
        Self { level, days }
    }
}

/// Ordered knots shaping the difficulty curve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KnotSet(Vec<Knot>);

impl KnotSet {
    pub fn new(knots: Vec<Knot>) -> Self {
        Self(knots)
    }

    pub fn knots(&self) -> &[Knot] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Check the knots can shape a curve ending at `max_level`
    pub fn validate(&self, max_level: u32) -> Result<(), CurveError> {
        if self.0.len() < 2 {
            return Err(CurveError::TooFewKnots(self.0.len()));
        }
        for pair in self.0.windows(2) {
            if pair[1].level <= pair[0].level {
                return Err(CurveError::KnotLevelsNotIncreasing {
                    previous: pair[0].level,
                    next: pair[1].level,
                });
            }
        }
        for knot in &self.0 {
            if knot.level < 1 {
                return Err(CurveError::KnotBelowLevelOne);
            }
            if knot.level > max_level {
                return Err(CurveError::KnotOutOfRange { level: knot.level, max_level });
            }
            if !knot.days.is_finite() {
                return Err(CurveError::NonFiniteKnot { level: knot.level });
            }
        }
        Ok(())
    }
}

impl Default for KnotSet {
    fn default() -> Self {
        Self(vec![
            Knot::new(1, 0.2),
            Knot::new(15, 1.8),
            Knot::new(60, 18.0),
            Knot::new(100, 85.0),
        ])
    }
}

/// Everything needed to build a curve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurveParams {
    pub knots: KnotSet,
    /// Per-message decay used to derive the reference daily XP
    pub phi: f64,
    /// Messages per day of the reference player
    pub target_daily_messages: u32,
    pub base_xp: u32,
    pub max_level: u32,
    /// Pin `curve[max_level]` to this value by scaling every level's cost
    pub terminal_xp: Option<u64>,
}

impl Default for CurveParams {
    fn default() -> Self {
        Self {
            knots: KnotSet::default(),
            phi: DEFAULT_PHI,
            target_daily_messages: DEFAULT_TARGET_DAILY_MESSAGES,
            base_xp: DEFAULT_BASE_XP,
            max_level: MAX_LEVEL,
            terminal_xp: None,
        }
    }
}

impl CurveParams {
    fn validate(&self) -> Result<(), CurveError> {
        if self.max_level == 0 {
            return Err(CurveError::InvalidMaxLevel);
        }
        if !(self.phi.is_finite() && self.phi > 0.0) {
            return Err(CurveError::InvalidPhi(self.phi));
        }
        if self.target_daily_messages == 0 {
            return Err(CurveError::InvalidTargetMessages);
        }
        if self.base_xp == 0 {
            return Err(CurveError::InvalidBaseXp);
        }
        if self.terminal_xp == Some(0) {
            return Err(CurveError::InvalidTerminalXp);
        }
        self.knots.validate(self.max_level)
    }
}

/// Cumulative XP needed to have reached each level.
///
/// `thresholds[0] == 0` and the sequence is strictly increasing, so a level
/// lookup is a binary search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressionCurve {
    thresholds: Vec<u64>,
    /// XP per day of the reference player, kept for reporting in days
    daily_reference_xp: u64,
}

impl ProgressionCurve {
    /// Wrap an existing table, checking its invariants
    pub fn from_thresholds(thresholds: Vec<u64>, daily_reference_xp: u64) -> Result<Self, CurveError> {
        match thresholds.first() {
            None => return Err(CurveError::InvalidMaxLevel),
            Some(&first) if first != 0 => return Err(CurveError::NonZeroStart(first)),
            Some(_) => {}
        }
        if thresholds.len() < 2 {
            return Err(CurveError::InvalidMaxLevel);
        }
        check_strictly_increasing(&thresholds)?;
        Ok(Self { thresholds, daily_reference_xp })
    }

    pub fn max_level(&self) -> u32 {
        (self.thresholds.len() - 1) as u32
    }

    pub fn thresholds(&self) -> &[u64] {
        &self.thresholds
    }

    /// Cumulative XP needed to have reached `level`
    pub fn threshold(&self, level: u32) -> Option<u64> {
        self.thresholds.get(level as usize).copied()
    }

    /// XP needed to go from `level - 1` to `level`
    pub fn required_for(&self, level: u32) -> Option<u64> {
        if level == 0 {
            return Some(0);
        }
        let upper = self.threshold(level)?;
        let lower = self.threshold(level - 1)?;
        Some(upper - lower)
    }

    /// Cumulative XP at the max level
    pub fn terminal_xp(&self) -> u64 {
        self.thresholds.last().copied().unwrap_or(0)
    }

    pub fn daily_reference_xp(&self) -> u64 {
        self.daily_reference_xp
    }

    /// Level reached with `xp` total experience
    pub fn level_for(&self, xp: u64) -> u32 {
        super::xp::level_for(self, xp)
    }
}

fn check_strictly_increasing(thresholds: &[u64]) -> Result<(), CurveError> {
    for (i, pair) in thresholds.windows(2).enumerate() {
        if pair[1] <= pair[0] {
            return Err(CurveError::NotIncreasing {
                level: (i + 1) as u32,
                previous: pair[0],
                current: pair[1],
            });
        }
    }
    Ok(())
}

/// Build the cumulative XP table.
///
/// Each level's cost is `spline(level) * daily_reference_xp`, where the spline
/// passes through the knots with natural boundary conditions. Costs are summed
/// in floating point and each cumulative value is rounded to the nearest
/// integer (halves away from zero). Any rounding collision or non-positive cost
/// is reported as a configuration error instead of producing a broken table.
pub fn build_curve(params: &CurveParams) -> Result<ProgressionCurve, CurveError> {
    params.validate()?;

    let xs: Vec<f64> = params.knots.knots().iter().map(|k| f64::from(k.level)).collect();
    let ys: Vec<f64> = params.knots.knots().iter().map(|k| k.days).collect();
    let spline = NaturalSpline::fit(&xs, &ys).ok_or(CurveError::TooFewKnots(xs.len()))?;

    let daily_xp = daily_reference_xp(params.base_xp, params.phi, params.target_daily_messages);

    let mut costs = Vec::with_capacity(params.max_level as usize);
    for level in 1..=params.max_level {
        let days = spline.eval(f64::from(level));
        let cost = days * daily_xp;
        if !(cost.is_finite() && cost > 0.0) {
            return Err(CurveError::NonPositiveCost { level, days });
        }
        costs.push(cost);
    }

    let raw_total: f64 = costs.iter().sum();
    let scale = match params.terminal_xp {
        Some(terminal) => terminal as f64 / raw_total,
        None => 1.0,
    };

    let mut thresholds = Vec::with_capacity(costs.len() + 1);
    thresholds.push(0u64);
    let mut cumulative = 0.0;
    for cost in &costs {
        cumulative += cost * scale;
        thresholds.push(cumulative.round() as u64);
    }
    if let (Some(terminal), Some(last)) = (params.terminal_xp, thresholds.last_mut()) {
        *last = terminal;
    }

    check_strictly_increasing(&thresholds)?;

    let curve = ProgressionCurve {
        thresholds,
        daily_reference_xp: daily_xp.round() as u64,
    };
    log::info!(
        "Progression curve built: {} levels, {} XP/day reference, {} XP at level {}",
        curve.max_level(),
        curve.daily_reference_xp(),
        curve.terminal_xp(),
        curve.max_level()
    );
    Ok(curve)
}
