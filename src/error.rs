//! Error types
//!
//! One enum per concern. Curve and config errors are fatal at startup; store
//! errors are transient and only ever delay a flush.

use std::path::PathBuf;

use thiserror::Error;

/// The progression curve cannot be built from its configuration
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CurveError {
    #[error("need at least 2 knots, got {0}")]
    TooFewKnots(usize),
    #[error("knot levels must strictly increase ({previous} then {next})")]
    KnotLevelsNotIncreasing { previous: u32, next: u32 },
    #[error("knot levels start at 1")]
    KnotBelowLevelOne,
    #[error("knot at level {level} is past the max level {max_level}")]
    KnotOutOfRange { level: u32, max_level: u32 },
    #[error("knot at level {level} has a non-finite day count")]
    NonFiniteKnot { level: u32 },
    #[error("decay factor must be a positive number, got {0}")]
    InvalidPhi(f64),
    #[error("target daily messages must be at least 1")]
    InvalidTargetMessages,
    #[error("base XP must be at least 1")]
    InvalidBaseXp,
    #[error("max level must be at least 1")]
    InvalidMaxLevel,
    #[error("terminal XP must be at least 1")]
    InvalidTerminalXp,
    #[error("level {level} would cost a non-positive amount of XP ({days} days)")]
    NonPositiveCost { level: u32, days: f64 },
    #[error("curve must start at 0 XP, starts at {0}")]
    NonZeroStart(u64),
    #[error("curve not strictly increasing at level {level}: {previous} then {current}")]
    NotIncreasing { level: u32, previous: u64, current: u64 },
}

/// Reading or writing user records failed
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode user records: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("failed to parse user records in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("user store version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// A shop purchase was refused
#[derive(Debug, Error)]
pub enum ShopError {
    #[error("no item named `{0}` in the shop")]
    UnknownItem(String),
    #[error("insufficient funds: balance {balance}, price {price}")]
    InsufficientFunds { balance: u64, price: u64 },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Settings could not be loaded
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },
    #[error(transparent)]
    Curve(#[from] CurveError),
}
