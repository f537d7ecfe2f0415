//! Domain types for MCP Lab

pub mod item;

pub use item::{Item, ItemError, ItemKeys, KeyKind, LogisticType};

/// Round a monetary amount to cents.
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
