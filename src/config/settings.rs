//! RON settings loader
//!
//! Loads bot settings from a RON file, falling back to built-in defaults when
//! the file is absent. A file that exists but does not parse is an error: a
//! silently ignored typo would change everyone's curve.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::economy::Catalog;
use crate::error::ConfigError;
use crate::progression::{CurveParams, KnotSet, MAX_LEVEL};
use crate::session::{GainRules, DEFAULT_MIN_LEN};
use crate::store::default_store_path;

/// Default location of the settings file, relative to the working directory
pub const DEFAULT_SETTINGS_PATH: &str = "config/settings.ron";

/// Per-message reward tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct XpSettings {
    /// Minimum trimmed length of a text-only message
    pub min_len: usize,
    pub cooldown_secs: i64,
    pub base_xp: u32,
    /// Shared by the gain decay and the curve's reference day
    pub phi: f64,
    pub daily_cap: u64,
    pub money_per_message: u64,
    pub money_message_limit: u32,
}

impl Default for XpSettings {
    fn default() -> Self {
        let rules = GainRules::default();
        Self {
            min_len: DEFAULT_MIN_LEN,
            cooldown_secs: rules.cooldown_secs,
            base_xp: rules.base_xp,
            phi: rules.phi,
            daily_cap: rules.daily_cap,
            money_per_message: rules.money_per_message,
            money_message_limit: rules.money_message_limit,
        }
    }
}

/// Curve shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurveSettings {
    pub knots: KnotSet,
    pub target_daily_messages: u32,
    pub max_level: u32,
    pub terminal_xp: Option<u64>,
}

impl Default for CurveSettings {
    fn default() -> Self {
        let params = CurveParams::default();
        Self {
            knots: params.knots,
            target_daily_messages: params.target_daily_messages,
            max_level: MAX_LEVEL,
            terminal_xp: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// User store file; the platform data directory when unset
    pub path: Option<PathBuf>,
    pub flush_interval_secs: u64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            path: None,
            flush_interval_secs: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeaderboardSettings {
    pub ttl_secs: i64,
    pub default_per_page: usize,
}

impl Default for LeaderboardSettings {
    fn default() -> Self {
        Self {
            ttl_secs: 30,
            default_per_page: 50,
        }
    }
}

/// Everything configurable about the bot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub xp: XpSettings,
    pub curve: CurveSettings,
    pub store: StoreSettings,
    pub leaderboard: LeaderboardSettings,
    pub shop: Catalog,
}

impl Settings {
    /// Load settings from `path`, or defaults if the file does not exist
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            log::info!("No settings file at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = ron::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Settings loaded from {:?}", path);
        Ok(settings)
    }

    /// Settings as pretty RON, e.g. to write out a starter file
    pub fn to_ron_pretty(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
    }

    /// Curve inputs; the decay and base XP come from the `xp` section
    pub fn curve_params(&self) -> CurveParams {
        CurveParams {
            knots: self.curve.knots.clone(),
            phi: self.xp.phi,
            target_daily_messages: self.curve.target_daily_messages,
            base_xp: self.xp.base_xp,
            max_level: self.curve.max_level,
            terminal_xp: self.curve.terminal_xp,
        }
    }

    pub fn gain_rules(&self) -> GainRules {
        GainRules {
            base_xp: self.xp.base_xp,
            phi: self.xp.phi,
            daily_cap: self.xp.daily_cap,
            money_per_message: self.xp.money_per_message,
            money_message_limit: self.xp.money_message_limit,
            cooldown_secs: self.xp.cooldown_secs,
        }
    }

    pub fn store_path(&self) -> PathBuf {
        self.store.path.clone().unwrap_or_else(default_store_path)
    }

    pub fn flush_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.store.flush_interval_secs.max(1))
    }

    pub fn leaderboard_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.leaderboard.ttl_secs)
    }
}
