//! Validity windows (`vigencia`) for overrides.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::OverrideInvalid;

/// Inclusive date range. A missing bound leaves that side open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidityWindow {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl ValidityWindow {
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        Self { from, to }
    }

    /// Whether `date` falls inside the window (bounds inclusive).
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.map_or(true, |from| from <= date) && self.to.map_or(true, |to| date <= to)
    }

    /// Parse a `vigencia` value. `null` means "always active".
    pub(crate) fn parse(value: &Value) -> Result<Option<Self>, OverrideInvalid> {
        let obj = match value {
            Value::Null => return Ok(None),
            Value::Object(obj) => obj,
            other => {
                return Err(OverrideInvalid::Window(format!(
                    "expected an object with 'from'/'to', got {other}"
                )))
            }
        };

        let from = parse_bound(obj.get("from"), "from")?;
        let to = parse_bound(obj.get("to"), "to")?;

        if let (Some(f), Some(t)) = (from, to) {
            if f > t {
                return Err(OverrideInvalid::Window(format!(
                    "'from' ({f}) is after 'to' ({t})"
                )));
            }
        }

        if from.is_none() && to.is_none() {
            return Ok(None);
        }
        Ok(Some(Self { from, to }))
    }
}

fn parse_bound(value: Option<&Value>, name: &str) -> Result<Option<NaiveDate>, OverrideInvalid> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => parse_date(s).map(Some).ok_or_else(|| {
            OverrideInvalid::Window(format!("'{name}' is not a YYYY-MM-DD date: {s:?}"))
        }),
        Some(other) => Err(OverrideInvalid::Window(format!(
            "'{name}' must be a date string, got {other}"
        ))),
    }
}

/// Accepts `YYYY-MM-DD`, optionally followed by a time part (`T...` or ` ...`),
/// which is ignored.
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let date_part = match raw.char_indices().nth(10) {
        Some((idx, 'T')) | Some((idx, ' ')) => &raw[..idx],
        Some(_) => return None,
        None => raw,
    };
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}
