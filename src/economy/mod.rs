//! Ignis economy
//!
//! Catalog of shop items and balance-checked purchases.

pub mod shop;

pub use shop::{Catalog, ItemDef, Receipt, Shop};
