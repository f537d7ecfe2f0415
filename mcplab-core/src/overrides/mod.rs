//! Overrides — per-item and per-scenario patches on top of the base config.
//!
//! Resolution is a single ordered chain: `mlb → sku → gtin → scenario`. The
//! first candidate that exists, is well-formed and is active on the as-of
//! date wins; every later candidate is ignored, even for fields the winner
//! leaves unset. Entries with a malformed window or bad knobs are skipped
//! with a warning and the chain moves on. Entries outside their window are
//! skipped silently (inactive, not an error).

pub mod knobs;
pub mod window;

use std::borrow::Cow;
use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::{ItemKeys, KeyKind};
use crate::rules::{as_object, RuleConfig};

pub use knobs::{merge, Knobs};
pub use window::ValidityWindow;

/// Fatal problems with the override document as a whole.
#[derive(Debug, Error)]
pub enum OverrideError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("override document: {0}")]
    Shape(String),
}

/// A single override entry that cannot be applied. Recoverable: the entry is
/// skipped during resolution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OverrideInvalid {
    #[error("malformed validity window: {0}")]
    Window(String),
    #[error("unknown override knob '{0}'")]
    UnknownKnob(String),
    #[error("invalid knob value: {0}")]
    Knob(String),
    #[error("entry must be an object, got {0}")]
    NotAnObject(String),
}

/// Link of the precedence chain an override matched on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchSource {
    Mlb,
    Sku,
    Gtin,
    Scenario,
}

impl From<KeyKind> for MatchSource {
    fn from(kind: KeyKind) -> Self {
        match kind {
            KeyKind::Mlb => MatchSource::Mlb,
            KeyKind::Sku => MatchSource::Sku,
            KeyKind::Gtin => MatchSource::Gtin,
        }
    }
}

/// One well-formed override.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverrideEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub campaign_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window: Option<ValidityWindow>,
    pub knobs: Knobs,
}

impl OverrideEntry {
    pub fn is_active(&self, as_of: NaiveDate) -> bool {
        self.window.map_or(true, |w| w.contains(as_of))
    }

    fn parse(value: &Value) -> Result<Self, OverrideInvalid> {
        let obj = value
            .as_object()
            .ok_or_else(|| OverrideInvalid::NotAnObject(value.to_string()))?;

        let window = match obj.get("vigencia") {
            Some(v) => ValidityWindow::parse(v)?,
            None => None,
        };
        let campaign_id = match obj.get("campanha_id") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        };
        let knobs = Knobs::from_entry(obj)?;

        Ok(Self {
            campaign_id,
            window,
            knobs,
        })
    }
}

/// The winning override for one item.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverrideMatch<'a> {
    pub source: MatchSource,
    /// Item key or scenario name the entry is stored under.
    pub key: &'a str,
    pub entry: &'a OverrideEntry,
}

impl<'a> OverrideMatch<'a> {
    pub fn knobs(&self) -> &'a Knobs {
        &self.entry.knobs
    }

    pub fn campaign_id(&self) -> Option<&'a str> {
        self.entry.campaign_id.as_deref()
    }

    pub fn price_override(&self) -> Option<f64> {
        self.entry.knobs.price_override
    }
}

/// Effective config for one item plus the override that produced it.
#[derive(Debug, Clone)]
pub struct Resolution<'a> {
    /// Borrowed base when no override applied or it only moves the price.
    pub config: Cow<'a, RuleConfig>,
    pub matched: Option<OverrideMatch<'a>>,
}

impl Resolution<'_> {
    pub fn price_override(&self) -> Option<f64> {
        self.matched.and_then(|m| m.price_override())
    }
}

type Slot = Result<OverrideEntry, OverrideInvalid>;

/// All overrides for one channel, loaded once per batch.
#[derive(Debug, Clone, Default)]
pub struct OverrideSet {
    channel: Option<String>,
    scenarios: BTreeMap<String, Slot>,
    per_item: BTreeMap<String, Slot>,
}

impl OverrideSet {
    /// A set with no overrides; every resolution returns `None`.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_json_str(json: &str) -> Result<Self, OverrideError> {
        let doc: Value = serde_json::from_str(json)?;
        Self::from_value(&doc)
    }

    pub fn from_value(doc: &Value) -> Result<Self, OverrideError> {
        let root = as_object(doc, "<root>").map_err(|e| OverrideError::Shape(e.to_string()))?;

        let channel = match root.get("canal") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.trim().to_string()),
            Some(other) => {
                return Err(OverrideError::Shape(format!(
                    "'canal' must be a string, got {other}"
                )))
            }
        };

        let set = Self {
            channel,
            scenarios: parse_section(root, "cenarios")?,
            per_item: parse_section(root, "por_item")?,
        };

        for (section, key, reason) in set.invalid_entries() {
            warn!(section, key, %reason, "override entry is invalid and will be skipped");
        }
        Ok(set)
    }

    pub fn channel(&self) -> Option<&str> {
        self.channel.as_deref()
    }

    pub fn scenario_names(&self) -> impl Iterator<Item = &str> {
        self.scenarios.keys().map(String::as_str)
    }

    pub fn has_scenario(&self, name: &str) -> bool {
        self.scenarios.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.scenarios.len() + self.per_item.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `(section, key, reason)` for every entry that failed to parse.
    pub fn invalid_entries(&self) -> impl Iterator<Item = (&'static str, &str, &OverrideInvalid)> {
        let scenarios = self
            .scenarios
            .iter()
            .filter_map(|(k, s)| s.as_ref().err().map(|e| ("cenarios", k.as_str(), e)));
        let items = self
            .per_item
            .iter()
            .filter_map(|(k, s)| s.as_ref().err().map(|e| ("por_item", k.as_str(), e)));
        scenarios.chain(items)
    }

    /// Find the override in force for an item on `as_of`.
    pub fn resolve(
        &self,
        keys: &ItemKeys,
        scenario: Option<&str>,
        as_of: NaiveDate,
    ) -> Option<OverrideMatch<'_>> {
        let item_chain = keys
            .ordered()
            .map(|(kind, key)| (MatchSource::from(kind), self.per_item.get_key_value(key)));
        let scenario_link = scenario
            .map(|name| (MatchSource::Scenario, self.scenarios.get_key_value(name.trim())));

        item_chain
            .chain(scenario_link)
            .find_map(|(source, slot)| {
                let (key, slot) = slot?;
                match slot {
                    Err(reason) => {
                        warn!(?source, key = key.as_str(), %reason, "skipping invalid override");
                        None
                    }
                    Ok(entry) if !entry.is_active(as_of) => {
                        debug!(?source, key = key.as_str(), %as_of, "override outside its validity window");
                        None
                    }
                    Ok(entry) => Some(OverrideMatch {
                        source,
                        key: key.as_str(),
                        entry,
                    }),
                }
            })
    }

    /// Resolve and merge in one step.
    pub fn effective_config<'a>(
        &'a self,
        base: &'a RuleConfig,
        keys: &ItemKeys,
        scenario: Option<&str>,
        as_of: NaiveDate,
    ) -> Resolution<'a> {
        let matched = self.resolve(keys, scenario, as_of);
        let config = match matched {
            Some(m) if m.knobs().touches_config() => Cow::Owned(merge(base, m.knobs())),
            _ => Cow::Borrowed(base),
        };
        Resolution { config, matched }
    }
}

fn parse_section(root: &Map<String, Value>, name: &str) -> Result<BTreeMap<String, Slot>, OverrideError> {
    match root.get(name) {
        None | Some(Value::Null) => Ok(BTreeMap::new()),
        Some(Value::Object(entries)) => Ok(entries
            .iter()
            .map(|(key, value)| (key.trim().to_string(), OverrideEntry::parse(value)))
            .collect()),
        Some(other) => Err(OverrideError::Shape(format!(
            "'{name}' must be an object, got {other}"
        ))),
    }
}
