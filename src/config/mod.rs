//! Bot configuration

pub mod settings;

pub use settings::{
    CurveSettings, LeaderboardSettings, Settings, StoreSettings, XpSettings, DEFAULT_SETTINGS_PATH,
};
