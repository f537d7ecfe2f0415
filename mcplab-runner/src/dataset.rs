//! Dataset builder — the per-item pipeline over a batch of listings.
//!
//! For every item, in fixed order:
//! 1. attach the purchase cost from the catalog collaborator
//! 2. resolve and merge overrides into an effective config
//! 3. compute the fee breakdown and margin
//! 4. solve the min/max price bounds (FULL listings with cost only)
//!
//! Items are independent. A rejected item or an infeasible bound never stops
//! the batch; only rule/override loading (done before the builder exists)
//! can fail a run.

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use mcplab_core::{
    Item, ItemError, ItemKeys, LogisticType, MatchSource, MetricsResult, OverrideSet,
    PriceSolution, PriceSolver, RuleConfig, SolveError, SolverSettings,
};

use crate::catalog::CostCatalog;

/// Current schema version for persisted batch reports.
pub const SCHEMA_VERSION: u32 = 1;

/// Min/max listing price for the configured margin band.
///
/// Serialized names follow the output contract.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceBounds {
    #[serde(rename = "preco_minimo")]
    pub price_min: Option<f64>,
    #[serde(rename = "preco_maximo")]
    pub price_max: Option<f64>,
    /// Set when a solve hit the iteration cap; only serialized when true.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub approximate: bool,
}

/// Where the purchase cost on a row came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostSource {
    Catalog,
    Item,
    Missing,
}

/// Outcome of one bound solve, kept for the summary counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundStatus {
    Solved,
    Approximate,
    Infeasible,
    /// The solve itself failed: a non-finite target, or a zero price from
    /// zero cost on an empty ladder.
    Unsolvable,
    /// SELLER listing, or no cost to solve from.
    NotApplicable,
}

/// Fully evaluated item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetRow {
    #[serde(flatten)]
    pub keys: ItemKeys,
    pub logistic_type: LogisticType,
    /// Listed price.
    pub price: f64,
    /// Price the metrics were computed at (differs when an override sets `preco`).
    pub evaluated_price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchase_cost: Option<f64>,
    pub cost_source: CostSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_source: Option<MatchSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign_id: Option<String>,
    pub metrics: MetricsResult,
    pub bounds: PriceBounds,
    pub min_status: BoundStatus,
    pub max_status: BoundStatus,
}

/// An item that could not be evaluated at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedItem {
    /// Position in the input batch.
    pub index: usize,
    #[serde(flatten)]
    pub keys: ItemKeys,
    pub reason: String,
}

/// Batch-level counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub items: usize,
    pub evaluated: usize,
    pub rejected: usize,
    pub with_cost: usize,
    pub overridden: usize,
    pub negative_margin: usize,
    pub bounds_solved: usize,
    pub bounds_infeasible: usize,
    pub bounds_approximate: usize,
    #[serde(default)]
    pub bounds_unsolvable: usize,
}

impl BatchSummary {
    fn from_rows(items: usize, rows: &[DatasetRow], rejected: usize) -> Self {
        let statuses = || rows.iter().flat_map(|r| [r.min_status, r.max_status]);
        Self {
            items,
            evaluated: rows.len(),
            rejected,
            with_cost: rows.iter().filter(|r| r.metrics.has_cost).count(),
            overridden: rows.iter().filter(|r| r.override_source.is_some()).count(),
            negative_margin: rows.iter().filter(|r| r.metrics.is_negative_margin()).count(),
            bounds_solved: statuses().filter(|s| *s == BoundStatus::Solved).count(),
            bounds_infeasible: statuses().filter(|s| *s == BoundStatus::Infeasible).count(),
            bounds_approximate: statuses().filter(|s| *s == BoundStatus::Approximate).count(),
            bounds_unsolvable: statuses().filter(|s| *s == BoundStatus::Unsolvable).count(),
        }
    }
}

/// Everything a batch run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub channel: String,
    /// Fingerprint of the base rule config in force.
    pub rules_fingerprint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenario: Option<String>,
    pub as_of: NaiveDate,
    pub summary: BatchSummary,
    pub rows: Vec<DatasetRow>,
    pub rejected: Vec<RejectedItem>,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Per-item pipeline over a shared, read-only rule config and override set.
pub struct DatasetBuilder<'a> {
    rules: &'a RuleConfig,
    overrides: &'a OverrideSet,
    catalog: Option<&'a dyn CostCatalog>,
    scenario: Option<String>,
    as_of: NaiveDate,
    solver: PriceSolver,
    parallel: bool,
}

impl<'a> DatasetBuilder<'a> {
    pub fn new(rules: &'a RuleConfig, overrides: &'a OverrideSet, as_of: NaiveDate) -> Self {
        if let Some(channel) = overrides.channel() {
            if channel != rules.channel {
                warn!(
                    rules = %rules.channel,
                    overrides = channel,
                    "override document targets a different channel"
                );
            }
        }
        Self {
            rules,
            overrides,
            catalog: None,
            scenario: None,
            as_of,
            solver: PriceSolver::default(),
            parallel: false,
        }
    }

    pub fn with_catalog(mut self, catalog: &'a dyn CostCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn with_scenario(mut self, scenario: Option<String>) -> Self {
        if let Some(name) = scenario.as_deref() {
            if !self.overrides.has_scenario(name) {
                warn!(scenario = name, "scenario not present in override document");
            }
        }
        self.scenario = scenario;
        self
    }

    pub fn with_solver(mut self, settings: SolverSettings) -> Self {
        self.solver = PriceSolver::new(settings);
        self
    }

    /// Enables or disables parallel evaluation across items.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Run the pipeline for one item.
    pub fn build_item(&self, item: &Item) -> Result<DatasetRow, ItemError> {
        item.validate()?;

        // (a) cost
        let (purchase_cost, cost_source) = match self.catalog.and_then(|c| c.purchase_cost(&item.keys)) {
            Some(cost) if cost.is_finite() && cost >= 0.0 => (Some(cost), CostSource::Catalog),
            _ => match item.purchase_cost {
                Some(cost) => (Some(cost), CostSource::Item),
                None => (None, CostSource::Missing),
            },
        };

        // (b) overrides
        let resolution = self.overrides.effective_config(
            self.rules,
            &item.keys,
            self.scenario.as_deref(),
            self.as_of,
        );
        let config = resolution.config.as_ref();
        let evaluated_price = resolution.price_override().unwrap_or(item.price);

        // (c) metrics
        let metrics = mcplab_core::metrics::compute_at_price(
            evaluated_price,
            purchase_cost,
            item.logistic_type,
            config,
        );

        // (d) bounds
        let key = item.keys.primary().unwrap_or_default();
        let (price_min, min_status) =
            self.solve_bound(key, purchase_cost, item.logistic_type, config.defaults.margin_min, config);
        let (price_max, max_status) =
            self.solve_bound(key, purchase_cost, item.logistic_type, config.defaults.margin_max, config);

        let matched = resolution.matched;
        Ok(DatasetRow {
            keys: item.keys.clone(),
            logistic_type: item.logistic_type,
            price: item.price,
            evaluated_price,
            purchase_cost,
            cost_source,
            override_source: matched.map(|m| m.source),
            override_key: matched.map(|m| m.key.to_string()),
            campaign_id: matched.and_then(|m| m.campaign_id()).map(String::from),
            metrics,
            bounds: PriceBounds {
                price_min,
                price_max,
                approximate: min_status == BoundStatus::Approximate
                    || max_status == BoundStatus::Approximate,
            },
            min_status,
            max_status,
        })
    }

    fn solve_bound(
        &self,
        key: &str,
        purchase_cost: Option<f64>,
        logistic_type: LogisticType,
        target: f64,
        config: &RuleConfig,
    ) -> (Option<f64>, BoundStatus) {
        let Some(cost) = purchase_cost else {
            return (None, BoundStatus::NotApplicable);
        };
        match self.solver.solve_detailed(cost, logistic_type, target, config) {
            Ok(PriceSolution {
                price, converged, ..
            }) if converged => (Some(price), BoundStatus::Solved),
            Ok(solution) => {
                debug!(
                    key,
                    target,
                    price = solution.price,
                    iterations = solution.iterations,
                    "price solve hit the iteration cap; keeping last estimate"
                );
                (Some(solution.price), BoundStatus::Approximate)
            }
            Err(SolveError::UnsupportedLogistics(_)) => (None, BoundStatus::NotApplicable),
            Err(e @ SolveError::Infeasible { .. }) => {
                debug!(key, target, error = %e, "no price for target margin");
                (None, BoundStatus::Infeasible)
            }
            Err(e) => {
                warn!(key, target, error = %e, "price solve failed");
                (None, BoundStatus::Unsolvable)
            }
        }
    }

    /// Run the pipeline over a batch. Output rows keep input order.
    pub fn build(&self, items: &[Item]) -> BatchReport {
        let outcomes: Vec<Result<DatasetRow, ItemError>> = if self.parallel {
            items.par_iter().map(|item| self.build_item(item)).collect()
        } else {
            items.iter().map(|item| self.build_item(item)).collect()
        };

        let mut rows = Vec::with_capacity(items.len());
        let mut rejected = Vec::new();
        for (index, (item, outcome)) in items.iter().zip(outcomes).enumerate() {
            match outcome {
                Ok(row) => rows.push(row),
                Err(e) => {
                    warn!(index, error = %e, "item rejected");
                    rejected.push(RejectedItem {
                        index,
                        keys: item.keys.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        let summary = BatchSummary::from_rows(items.len(), &rows, rejected.len());
        info!(
            items = summary.items,
            evaluated = summary.evaluated,
            rejected = summary.rejected,
            overridden = summary.overridden,
            bounds_infeasible = summary.bounds_infeasible,
            bounds_approximate = summary.bounds_approximate,
            "batch complete"
        );

        BatchReport {
            schema_version: SCHEMA_VERSION,
            channel: self.rules.channel.clone(),
            rules_fingerprint: self.rules.fingerprint(),
            scenario: self.scenario.clone(),
            as_of: self.as_of,
            summary,
            rows,
            rejected,
        }
    }
}
