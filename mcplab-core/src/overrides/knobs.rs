//! Override knobs and the merge onto a base config.
//!
//! `merge` overwrites exactly the fields a knob names. Everything else is
//! copied from the base, and the base is never touched.

use serde::Serialize;
use serde_json::{Map, Value};

use super::OverrideInvalid;
use crate::rules::{amount, fraction, parse_ladder, FixedCostLadder, RuleConfig};

/// Keys on an override entry that are metadata rather than knobs.
pub(crate) const RESERVED_KEYS: &[&str] = &["campanha_id", "vigencia"];

/// The named fields an override may patch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Knobs {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marketing_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_pct_on_cost: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin_min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin_max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commission_full_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commission_seller_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_ladder: Option<FixedCostLadder>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seller_ladder: Option<FixedCostLadder>,
    /// Absolute fixed cost per unit, replacing both ladders.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixed_tariff: Option<f64>,
    /// Price the item is evaluated at instead of its listed price.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_override: Option<f64>,
}

impl Knobs {
    /// Parse the knob keys of one override entry.
    pub(crate) fn from_entry(obj: &Map<String, Value>) -> Result<Self, OverrideInvalid> {
        let mut knobs = Knobs::default();
        let mut shared_commission = None;

        for (key, value) in obj {
            if RESERVED_KEYS.contains(&key.as_str()) || value.is_null() {
                continue;
            }
            let bad = |e: crate::rules::ConfigError| OverrideInvalid::Knob(e.to_string());
            match key.as_str() {
                "imposto_pct" => knobs.tax_pct = Some(fraction(value, key).map_err(bad)?),
                "marketing_pct" => knobs.marketing_pct = Some(fraction(value, key).map_err(bad)?),
                "frete_pct_sobre_custo" => {
                    knobs.shipping_pct_on_cost = Some(fraction(value, key).map_err(bad)?)
                }
                "mcp_min" => knobs.margin_min = Some(fraction(value, key).map_err(bad)?),
                "mcp_max" => knobs.margin_max = Some(fraction(value, key).map_err(bad)?),
                "comissao_pct" => shared_commission = Some(fraction(value, key).map_err(bad)?),
                "comissao_full_pct" => {
                    knobs.commission_full_pct = Some(fraction(value, key).map_err(bad)?)
                }
                "comissao_seller_pct" => {
                    knobs.commission_seller_pct = Some(fraction(value, key).map_err(bad)?)
                }
                "custo_fixo_full" => knobs.full_ladder = Some(parse_ladder(value, key).map_err(bad)?),
                "custo_fixo_nao_full" => {
                    knobs.seller_ladder = Some(parse_ladder(value, key).map_err(bad)?)
                }
                "tarifa_fixa" => knobs.fixed_tariff = Some(amount(value, key).map_err(bad)?),
                "preco" => {
                    let price = amount(value, key).map_err(bad)?;
                    if price <= 0.0 {
                        return Err(OverrideInvalid::Knob(format!(
                            "field 'preco' must be a positive price, got {price}"
                        )));
                    }
                    knobs.price_override = Some(price);
                }
                other => return Err(OverrideInvalid::UnknownKnob(other.to_string())),
            }
        }

        // A class-specific commission beats the shared one.
        if let Some(pct) = shared_commission {
            knobs.commission_full_pct.get_or_insert(pct);
            knobs.commission_seller_pct.get_or_insert(pct);
        }
        Ok(knobs)
    }

    /// True when no knob is set.
    pub fn is_empty(&self) -> bool {
        *self == Knobs::default()
    }

    /// True when the knobs change the rule config (as opposed to only the price).
    pub fn touches_config(&self) -> bool {
        Knobs {
            price_override: None,
            ..self.clone()
        } != Knobs::default()
    }
}

/// Derive an effective config: `base` with only the named knobs overwritten.
pub fn merge(base: &RuleConfig, knobs: &Knobs) -> RuleConfig {
    let mut merged = base.clone();
    let d = &mut merged.defaults;

    if let Some(v) = knobs.tax_pct {
        d.tax_pct = v;
    }
    if let Some(v) = knobs.marketing_pct {
        d.marketing_pct = v;
    }
    if let Some(v) = knobs.shipping_pct_on_cost {
        d.shipping_pct_on_cost = v;
    }
    if let Some(v) = knobs.margin_min {
        d.margin_min = v;
    }
    if let Some(v) = knobs.margin_max {
        d.margin_max = v;
    }
    if let Some(v) = knobs.commission_full_pct {
        merged.commission.full_pct = v;
    }
    if let Some(v) = knobs.commission_seller_pct {
        merged.commission.seller_pct = v;
    }
    if let Some(ladder) = &knobs.full_ladder {
        merged.full.ladder = ladder.clone();
    }
    if let Some(ladder) = &knobs.seller_ladder {
        merged.seller.ladder = ladder.clone();
    }
    // The absolute tariff is applied last so it wins over ladder knobs.
    if let Some(tariff) = knobs.fixed_tariff {
        merged.full.ladder = FixedCostLadder::flat(tariff);
        merged.seller.ladder = FixedCostLadder::flat(tariff);
    }
    merged
}
