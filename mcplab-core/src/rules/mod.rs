//! Fee schedules — the typed, validated form of the channel rule document.
//!
//! A [`RuleConfig`] is produced once per batch by [`RuleConfig::from_json_str`]
//! or [`RuleConfig::from_value`] and is read-only afterwards. Overrides never
//! mutate it; they derive a new config (see `overrides::merge`).

pub mod ladder;
mod loader;

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::domain::LogisticType;

pub use ladder::{FixedCostLadder, Tier};

pub(crate) use loader::{amount, as_object, fraction, parse_ladder};

/// Load-time rejection of a rule document. Always fatal for the batch.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("missing required field '{field}'")]
    MissingField { field: String },
    #[error("field '{field}' must be {expected}, got {value}")]
    WrongType {
        field: String,
        expected: &'static str,
        value: String,
    },
    #[error("field '{field}' must be a fraction in [0, 1], got {value}")]
    OutOfRange { field: String, value: f64 },
    #[error("field '{field}' must be a non-negative amount, got {value}")]
    NegativeAmount { field: String, value: f64 },
    #[error("tier {index} of '{ladder}' is malformed: {reason}")]
    MalformedTier {
        ladder: String,
        index: usize,
        reason: String,
    },
    #[error("ladder '{ladder}' has {count} fallback tiers, at most one is allowed")]
    MultipleFallbacks { ladder: String, count: usize },
    #[error("mcp_min ({min}) is greater than mcp_max ({max})")]
    MarginRange { min: f64, max: f64 },
}

impl ConfigError {
    /// Field path the error refers to, when it names one.
    pub fn field(&self) -> Option<&str> {
        match self {
            ConfigError::MissingField { field }
            | ConfigError::WrongType { field, .. }
            | ConfigError::OutOfRange { field, .. }
            | ConfigError::NegativeAmount { field, .. } => Some(field),
            ConfigError::MalformedTier { ladder, .. }
            | ConfigError::MultipleFallbacks { ladder, .. } => Some(ladder),
            ConfigError::Json(_) | ConfigError::MarginRange { .. } => None,
        }
    }
}

/// Channel-wide percentages. All fractions in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Defaults {
    pub tax_pct: f64,
    pub marketing_pct: f64,
    /// Inbound shipping charged as a fraction of the purchase cost.
    pub shipping_pct_on_cost: f64,
    pub margin_min: f64,
    pub margin_max: f64,
}

/// Commission fraction per logistics class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Commission {
    pub seller_pct: f64,
    pub full_pct: f64,
}

impl Commission {
    pub fn for_logistics(&self, logistic_type: LogisticType) -> f64 {
        match logistic_type {
            LogisticType::Full => self.full_pct,
            LogisticType::Seller => self.seller_pct,
        }
    }
}

/// Schedule for one logistics class.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LogisticsSchedule {
    pub ladder: FixedCostLadder,
    /// Blocks the engine does not interpret (e.g. `frete_gratis_*`), kept
    /// verbatim for collaborators.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extras: BTreeMap<String, Value>,
}

/// Validated fee schedule for one sales channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleConfig {
    pub channel: String,
    pub defaults: Defaults,
    pub commission: Commission,
    pub full: LogisticsSchedule,
    pub seller: LogisticsSchedule,
}

impl RuleConfig {
    /// Parse and validate a rule document from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let doc: Value = serde_json::from_str(json)?;
        Self::from_value(&doc)
    }

    /// Validate an already-parsed rule document.
    pub fn from_value(doc: &Value) -> Result<Self, ConfigError> {
        loader::parse_document(doc)
    }

    pub fn schedule(&self, logistic_type: LogisticType) -> &LogisticsSchedule {
        match logistic_type {
            LogisticType::Full => &self.full,
            LogisticType::Seller => &self.seller,
        }
    }

    pub fn ladder(&self, logistic_type: LogisticType) -> &FixedCostLadder {
        &self.schedule(logistic_type).ladder
    }

    pub fn commission_pct(&self, logistic_type: LogisticType) -> f64 {
        self.commission.for_logistics(logistic_type)
    }

    /// Sum of the price-proportional fee fractions for a logistics class.
    pub fn variable_fee_pct(&self, logistic_type: LogisticType) -> f64 {
        self.defaults.tax_pct + self.defaults.marketing_pct + self.commission_pct(logistic_type)
    }

    /// Stable content hash of the config (BLAKE3, hex).
    ///
    /// Two configs with identical values share a fingerprint, so persisted
    /// results can be keyed by the rule version that produced them.
    pub fn fingerprint(&self) -> String {
        let canonical = serde_json::to_vec(self).unwrap_or_default();
        blake3::hash(&canonical).to_hex().to_string()
    }
}
