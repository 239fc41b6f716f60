//! Lady Flamme - XP, levels and Ignis for a Discord community
//!
//! Members earn XP for chatting. A designer-shaped spline curve turns XP into
//! levels, milestone levels pay out Ignis, and Ignis buys items in the shop.

pub mod progression;
pub mod session;
pub mod store;
pub mod economy;
pub mod leaderboard;
pub mod maintenance;
pub mod notify;
pub mod clock;
pub mod config;
pub mod error;

// Re-export commonly used types
pub use progression::{build_curve, CurveParams, LevelUp, ProgressionCurve};
pub use session::{GainOutcome, GainRules, MessageEvent, ProgressionSession, UserId, UserProgress};
pub use store::{UserStore, WriteBackCache};
pub use config::Settings;
pub use error::{ConfigError, CurveError, ShopError, StoreError};
