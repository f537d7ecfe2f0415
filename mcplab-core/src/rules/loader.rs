//! Fee-schedule document parsing and validation.
//!
//! The document is walked as a `serde_json::Value` rather than derived
//! straight into typed structs so that every rejection can name the field
//! path and the value that was actually received.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use super::ladder::{FixedCostLadder, Tier};
use super::{Commission, ConfigError, Defaults, LogisticsSchedule, RuleConfig};

const LADDER_KEY: &str = "custo_fixo_por_unidade_brl";

pub(crate) fn parse_document(doc: &Value) -> Result<RuleConfig, ConfigError> {
    let root = as_object(doc, "<root>")?;

    let channel = match required(root, "", "canal")? {
        Value::String(s) if !s.trim().is_empty() => s.trim().to_string(),
        other => return Err(wrong_type("canal", "a non-empty string", other)),
    };

    let defaults = parse_defaults(required(root, "", "default")?)?;
    let commission = parse_commission(required(root, "", "comissao")?)?;
    let full = parse_schedule(required(root, "", "full")?, "full")?;
    let seller = parse_schedule(required(root, "", "nao_full")?, "nao_full")?;

    Ok(RuleConfig {
        channel,
        defaults,
        commission,
        full,
        seller,
    })
}

fn parse_defaults(value: &Value) -> Result<Defaults, ConfigError> {
    let obj = as_object(value, "default")?;
    let defaults = Defaults {
        tax_pct: fraction(required(obj, "default", "imposto_pct")?, "default.imposto_pct")?,
        marketing_pct: fraction(
            required(obj, "default", "marketing_pct")?,
            "default.marketing_pct",
        )?,
        shipping_pct_on_cost: fraction(
            required(obj, "default", "frete_pct_sobre_custo")?,
            "default.frete_pct_sobre_custo",
        )?,
        margin_min: fraction(required(obj, "default", "mcp_min")?, "default.mcp_min")?,
        margin_max: fraction(required(obj, "default", "mcp_max")?, "default.mcp_max")?,
    };
    check_margin_range(&defaults)?;
    Ok(defaults)
}

fn check_margin_range(defaults: &Defaults) -> Result<(), ConfigError> {
    if defaults.margin_min > defaults.margin_max {
        return Err(ConfigError::MarginRange {
            min: defaults.margin_min,
            max: defaults.margin_max,
        });
    }
    Ok(())
}

fn parse_commission(value: &Value) -> Result<Commission, ConfigError> {
    let obj = as_object(value, "comissao")?;
    let classic = fraction(
        required(obj, "comissao", "classico_pct")?,
        "comissao.classico_pct",
    )?;
    let full_pct = match obj.get("full") {
        Some(v) if !v.is_null() => fraction(v, "comissao.full")?,
        _ => classic,
    };
    let seller_pct = match obj.get("seller") {
        Some(v) if !v.is_null() => fraction(v, "comissao.seller")?,
        _ => classic,
    };
    Ok(Commission {
        seller_pct,
        full_pct,
    })
}

fn parse_schedule(value: &Value, block: &str) -> Result<LogisticsSchedule, ConfigError> {
    let obj = as_object(value, block)?;
    let ladder_path = format!("{block}.{LADDER_KEY}");
    let ladder = parse_ladder(required(obj, block, LADDER_KEY)?, &ladder_path)?;
    let extras: BTreeMap<String, Value> = obj
        .iter()
        .filter(|(k, _)| k.as_str() != LADDER_KEY)
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    Ok(LogisticsSchedule { ladder, extras })
}

/// Parse a tier array. Shared with ladder-replacing override knobs.
pub(crate) fn parse_ladder(value: &Value, path: &str) -> Result<FixedCostLadder, ConfigError> {
    let items = value
        .as_array()
        .ok_or_else(|| wrong_type(path, "an array of tiers", value))?;

    let tiers = items
        .iter()
        .enumerate()
        .map(|(index, raw)| parse_tier(raw, path, index))
        .collect::<Result<Vec<_>, _>>()?;

    let fallbacks = tiers.iter().filter(|t| t.is_fallback()).count();
    if fallbacks > 1 {
        return Err(ConfigError::MultipleFallbacks {
            ladder: path.to_string(),
            count: fallbacks,
        });
    }
    Ok(FixedCostLadder::from_validated(tiers))
}

fn parse_tier(raw: &Value, ladder: &str, index: usize) -> Result<Tier, ConfigError> {
    let malformed = |reason: String| ConfigError::MalformedTier {
        ladder: ladder.to_string(),
        index,
        reason,
    };

    let obj = raw
        .as_object()
        .ok_or_else(|| malformed(format!("expected an object, got {raw}")))?;

    let is_fallback = match obj.get("otherwise") {
        None | Some(Value::Null) | Some(Value::Bool(false)) => false,
        Some(Value::Bool(true)) => true,
        Some(other) => return Err(malformed(format!("'otherwise' must be a boolean, got {other}"))),
    };

    let max_price = obj.get("max_preco").filter(|v| !v.is_null());
    let value = obj.get("valor").filter(|v| !v.is_null());
    let pct = obj.get("valor_pct_do_preco").filter(|v| !v.is_null());

    if is_fallback {
        if max_price.is_some() {
            return Err(malformed("fallback tier cannot carry 'max_preco'".into()));
        }
        if pct.is_some() {
            return Err(malformed(
                "fallback tier carries an absolute 'valor', not 'valor_pct_do_preco'".into(),
            ));
        }
        let value = value.ok_or_else(|| malformed("fallback tier is missing 'valor'".into()))?;
        let value = amount(value, &format!("{ladder}[{index}].valor"))?;
        return Ok(Tier::Fallback { value });
    }

    let max_price = max_price.ok_or_else(|| malformed("missing 'max_preco'".into()))?;
    let max_price = amount(max_price, &format!("{ladder}[{index}].max_preco"))?;

    match (value, pct) {
        (Some(v), None) => Ok(Tier::FixedValue {
            max_price,
            value: amount(v, &format!("{ladder}[{index}].valor"))?,
        }),
        (None, Some(p)) => Ok(Tier::PercentOfPrice {
            max_price,
            pct: fraction(p, &format!("{ladder}[{index}].valor_pct_do_preco"))?,
        }),
        (Some(_), Some(_)) => Err(malformed(
            "carries both 'valor' and 'valor_pct_do_preco'".into(),
        )),
        (None, None) => Err(malformed(
            "needs one of 'valor' or 'valor_pct_do_preco'".into(),
        )),
    }
}

// ─── Field helpers ───────────────────────────────────────────────────

pub(crate) fn as_object<'a>(
    value: &'a Value,
    path: &str,
) -> Result<&'a Map<String, Value>, ConfigError> {
    value
        .as_object()
        .ok_or_else(|| wrong_type(path, "an object", value))
}

fn required<'a>(
    obj: &'a Map<String, Value>,
    parent: &str,
    key: &str,
) -> Result<&'a Value, ConfigError> {
    match obj.get(key) {
        Some(v) if !v.is_null() => Ok(v),
        _ => Err(ConfigError::MissingField {
            field: join(parent, key),
        }),
    }
}

fn number(value: &Value, path: &str) -> Result<f64, ConfigError> {
    value
        .as_f64()
        .filter(|v| v.is_finite())
        .ok_or_else(|| wrong_type(path, "a number", value))
}

/// A percentage expressed as a fraction in [0, 1].
pub(crate) fn fraction(value: &Value, path: &str) -> Result<f64, ConfigError> {
    let v = number(value, path)?;
    if !(0.0..=1.0).contains(&v) {
        return Err(ConfigError::OutOfRange {
            field: path.to_string(),
            value: v,
        });
    }
    Ok(v)
}

/// A non-negative money amount.
pub(crate) fn amount(value: &Value, path: &str) -> Result<f64, ConfigError> {
    let v = number(value, path)?;
    if v < 0.0 {
        return Err(ConfigError::NegativeAmount {
            field: path.to_string(),
            value: v,
        });
    }
    Ok(v)
}

fn wrong_type(path: &str, expected: &'static str, got: &Value) -> ConfigError {
    ConfigError::WrongType {
        field: path.to_string(),
        expected,
        value: got.to_string(),
    }
}

fn join(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}
