//! What-if simulation: re-price an item and apply a subsidy.
//!
//! The subsidy is netted against the total fee burden and the net fees are
//! floored at zero, so a subsidy can never turn fees into income. The source
//! item is never modified.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::Item;
use crate::metrics::{compute_at_price, MetricsResult};
use crate::overrides::{MatchSource, OverrideSet};
use crate::rules::RuleConfig;

/// Fee-by-fee view of a simulated price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeeDecomposition {
    pub commission: f64,
    pub fixed_cost: f64,
    pub tax: f64,
    pub marketing: f64,
    pub shipping: f64,
    /// Sum of the five fees before subsidy.
    pub gross_fees: f64,
    /// Portion of the subsidy actually absorbed (never more than `gross_fees`).
    pub subsidy_applied: f64,
    pub net_fees: f64,
}

/// Result of a what-if evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Simulation {
    /// Price the item was evaluated at.
    pub price: f64,
    /// Metrics with the subsidy already reflected in the margin.
    pub metrics: MetricsResult,
    pub decomposition: FeeDecomposition,
    /// Simulated price minus the item's listed price.
    pub price_delta: f64,
    /// Simulated margin minus the margin at the listed price (no subsidy).
    pub margin_delta: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_source: Option<MatchSource>,
}

/// Evaluate `item` at `price_override` (or its own price) with `subsidy`.
pub fn simulate(
    item: &Item,
    price_override: Option<f64>,
    subsidy: f64,
    config: &RuleConfig,
) -> Simulation {
    let price = price_override.unwrap_or(item.price);
    let subsidy = if subsidy.is_finite() { subsidy.max(0.0) } else { 0.0 };

    let raw = compute_at_price(price, item.purchase_cost, item.logistic_type, config);
    let baseline = MetricsResult::compute(item, config);

    let gross_fees = raw.total_fees();
    let subsidy_applied = subsidy.min(gross_fees);
    let net_fees = (gross_fees - subsidy).max(0.0);

    let mut metrics = raw;
    metrics.margin_value_abs = raw.margin_value_abs + subsidy_applied;
    metrics.margin_value_pct = if metrics.valid {
        metrics.margin_value_abs / price
    } else {
        0.0
    };

    Simulation {
        price,
        metrics,
        decomposition: FeeDecomposition {
            commission: raw.commission_value,
            fixed_cost: raw.fixed_cost_value,
            tax: raw.tax_value,
            marketing: raw.marketing_value,
            shipping: raw.shipping_value,
            gross_fees,
            subsidy_applied,
            net_fees,
        },
        price_delta: price - item.price,
        margin_delta: metrics.margin_value_abs - baseline.margin_value_abs,
        override_source: None,
    }
}

/// Resolve overrides for the item first, then simulate on the effective config.
///
/// An explicit `price_override` argument wins over an override's `preco` knob.
pub fn simulate_with_overrides(
    item: &Item,
    price_override: Option<f64>,
    subsidy: f64,
    base: &RuleConfig,
    overrides: &OverrideSet,
    scenario: Option<&str>,
    as_of: NaiveDate,
) -> Simulation {
    let resolution = overrides.effective_config(base, &item.keys, scenario, as_of);
    let price = price_override.or(resolution.price_override());
    let mut sim = simulate(item, price, subsidy, &resolution.config);
    sim.override_source = resolution.matched.map(|m| m.source);
    sim
}
