//! Listing economics — fee breakdown and contribution margin for one item.
//!
//! Pure function of the item and its effective rule config. Missing cost and
//! non-positive prices are ordinary states, not errors:
//! - without cost the margin is reported before cost ("margin without cost")
//!   and `has_cost` is false;
//! - with price <= 0 the margin percentage is 0 and `valid` is false.

use serde::{Deserialize, Serialize};

use crate::domain::{Item, LogisticType};
use crate::rules::RuleConfig;

/// Fee breakdown and margin for one item at one price.
///
/// Serialized field names follow the output contract consumed by the
/// persistence layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricsResult {
    #[serde(rename = "comissao")]
    pub commission_value: f64,
    #[serde(rename = "comissao_pct")]
    pub commission_pct: f64,
    #[serde(rename = "custo_fixo")]
    pub fixed_cost_value: f64,
    #[serde(rename = "imposto")]
    pub tax_value: f64,
    #[serde(rename = "imposto_pct")]
    pub tax_pct: f64,
    #[serde(rename = "marketing")]
    pub marketing_value: f64,
    pub marketing_pct: f64,
    #[serde(rename = "frete")]
    pub shipping_value: f64,
    #[serde(rename = "mc_valor")]
    pub margin_value_abs: f64,
    #[serde(rename = "mcp_pct")]
    pub margin_value_pct: f64,
    pub has_cost: bool,
    /// False when the price was not positive; only serialized in that case.
    #[serde(default = "default_valid", skip_serializing_if = "is_valid")]
    pub valid: bool,
}

fn default_valid() -> bool {
    true
}

fn is_valid(valid: &bool) -> bool {
    *valid
}

impl MetricsResult {
    /// Compute metrics at the item's own price.
    pub fn compute(item: &Item, config: &RuleConfig) -> Self {
        compute_at_price(item.price, item.purchase_cost, item.logistic_type, config)
    }

    /// Sum of every fee charged against the price.
    pub fn total_fees(&self) -> f64 {
        self.commission_value
            + self.fixed_cost_value
            + self.tax_value
            + self.marketing_value
            + self.shipping_value
    }

    pub fn is_negative_margin(&self) -> bool {
        self.margin_value_abs < 0.0
    }
}

/// Compute the fee breakdown and margin for an item.
pub fn compute(item: &Item, config: &RuleConfig) -> MetricsResult {
    MetricsResult::compute(item, config)
}

/// Compute metrics for an explicit price/cost/class triple.
pub fn compute_at_price(
    price: f64,
    purchase_cost: Option<f64>,
    logistic_type: LogisticType,
    config: &RuleConfig,
) -> MetricsResult {
    let defaults = &config.defaults;

    let commission_pct = config.commission_pct(logistic_type);
    let commission_value = price * commission_pct;
    let fixed_cost_value = config.ladder(logistic_type).fixed_cost(price);
    let tax_value = price * defaults.tax_pct;
    let marketing_value = price * defaults.marketing_pct;
    let shipping_value = shipping_on_cost(purchase_cost, config);

    let net_revenue =
        price - commission_value - fixed_cost_value - tax_value - marketing_value - shipping_value;

    let (margin_value_abs, has_cost) = match purchase_cost {
        Some(cost) => (net_revenue - cost, true),
        None => (net_revenue, false),
    };

    let valid = price > 0.0;
    let margin_value_pct = if valid { margin_value_abs / price } else { 0.0 };

    MetricsResult {
        commission_value,
        commission_pct,
        fixed_cost_value,
        tax_value,
        tax_pct: defaults.tax_pct,
        marketing_value,
        marketing_pct: defaults.marketing_pct,
        shipping_value,
        margin_value_abs,
        margin_value_pct,
        has_cost,
        valid,
    }
}

/// Inbound shipping charged on the purchase cost (zero without cost).
pub fn shipping_on_cost(purchase_cost: Option<f64>, config: &RuleConfig) -> f64 {
    purchase_cost.map_or(0.0, |cost| cost * config.defaults.shipping_pct_on_cost)
}
