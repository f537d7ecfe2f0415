//! Target-margin price solver.
//!
//! Solves `margin = (P - cost - shipping - fixed(P) - fees_pct * P) / P` for
//! `P`. With `k = 1 - fees_pct` this rearranges to
//! `P * (k - margin) = cost + shipping + fixed(P)`. `fixed(P)` is a step
//! function of the price, so the solution is found by fixed-point iteration:
//! seed ignoring the fixed cost, then re-evaluate the ladder at each estimate
//! until two estimates agree within the tolerance or the iteration cap is hit.
//!
//! Only FULL listings have a defined solve; SELLER listings are rejected.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{round_cents, LogisticType};
use crate::metrics::shipping_on_cost;
use crate::rules::{FixedCostLadder, RuleConfig};

/// Convergence controls.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolverSettings {
    /// Stop once successive estimates differ by at most this much (default 0.01).
    pub tolerance: f64,
    /// Hard cap on refinement steps (default 6).
    pub max_iterations: usize,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            tolerance: 0.01,
            max_iterations: 6,
        }
    }
}

/// Outcome of a successful solve, with convergence diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSolution {
    /// Solved price, rounded to cents.
    pub price: f64,
    /// Refinement steps performed after the seed.
    pub iterations: usize,
    /// False when the cap was reached before the tolerance was met.
    pub converged: bool,
    /// Every estimate, seed first, unrounded.
    pub trajectory: Vec<f64>,
}

impl PriceSolution {
    /// The price is usable but was not proven to converge.
    pub fn is_approximate(&self) -> bool {
        !self.converged
    }
}

/// Reasons no price is returned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolveError {
    #[error("price bounds are only defined for FULL listings, got {0}")]
    UnsupportedLogistics(LogisticType),
    #[error("target margin {target} is unreachable: fees leave only {k} of the price")]
    Infeasible { k: f64, target: f64 },
    #[error("invalid solver input: {0}")]
    InvalidInput(String),
    #[error("solve produced a non-positive price ({0})")]
    Degenerate(f64),
}

/// Price solver bound to a set of convergence settings.
#[derive(Debug, Clone, Copy, Default)]
pub struct PriceSolver {
    settings: SolverSettings,
}

impl PriceSolver {
    pub fn new(settings: SolverSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> SolverSettings {
        self.settings
    }

    /// Price achieving `target_margin`, or `None` when infeasible/unsupported.
    pub fn solve(
        &self,
        purchase_cost: f64,
        logistic_type: LogisticType,
        target_margin: f64,
        config: &RuleConfig,
    ) -> Option<f64> {
        self.solve_detailed(purchase_cost, logistic_type, target_margin, config)
            .ok()
            .map(|s| s.price)
    }

    /// Solve and return the full diagnostics.
    pub fn solve_detailed(
        &self,
        purchase_cost: f64,
        logistic_type: LogisticType,
        target_margin: f64,
        config: &RuleConfig,
    ) -> Result<PriceSolution, SolveError> {
        if !logistic_type.is_full() {
            return Err(SolveError::UnsupportedLogistics(logistic_type));
        }
        if !purchase_cost.is_finite() || purchase_cost < 0.0 {
            return Err(SolveError::InvalidInput(format!(
                "purchase cost must be a finite non-negative number, got {purchase_cost}"
            )));
        }
        if !target_margin.is_finite() {
            return Err(SolveError::InvalidInput(format!(
                "target margin must be finite, got {target_margin}"
            )));
        }

        let k = 1.0 - config.variable_fee_pct(logistic_type);
        let denominator = k - target_margin;
        if denominator <= 0.0 {
            return Err(SolveError::Infeasible {
                k,
                target: target_margin,
            });
        }

        let ladder = config.ladder(logistic_type);
        let base = purchase_cost + shipping_on_cost(Some(purchase_cost), config);

        let seed = base / denominator;
        let (price, iterations, converged, trajectory) =
            iterate(seed, self.settings, |p| (base + ladder.fixed_cost(p)) / denominator);

        let price = round_to_cent_within_tier(price, ladder);
        if price <= 0.0 {
            return Err(SolveError::Degenerate(price));
        }

        Ok(PriceSolution {
            price,
            iterations,
            converged,
            trajectory,
        })
    }
}

/// Run `step` from `seed` until successive values agree within the tolerance.
///
/// Returns `(last, iterations, converged, trajectory)`. On hitting the cap the
/// last computed value is still returned.
fn iterate<F>(seed: f64, settings: SolverSettings, step: F) -> (f64, usize, bool, Vec<f64>)
where
    F: Fn(f64) -> f64,
{
    let mut trajectory = Vec::with_capacity(settings.max_iterations + 1);
    trajectory.push(seed);

    let mut current = seed;
    for i in 1..=settings.max_iterations {
        let next = step(current);
        trajectory.push(next);
        if (next - current).abs() <= settings.tolerance {
            return (next, i, true, trajectory);
        }
        current = next;
    }
    (current, settings.max_iterations, false, trajectory)
}

/// Round to cents without leaving the tier the estimate was solved in.
///
/// Plain rounding can move an estimate just above a `max_preco` boundary
/// back onto it, which charges a different fixed cost than the one solved for.
fn round_to_cent_within_tier(price: f64, ladder: &FixedCostLadder) -> f64 {
    let rounded = round_cents(price);
    if ladder.select(rounded) == ladder.select(price) {
        rounded
    } else if rounded < price {
        (price * 100.0).ceil() / 100.0
    } else {
        (price * 100.0).floor() / 100.0
    }
}

/// Solve with default settings.
pub fn solve(
    purchase_cost: f64,
    logistic_type: LogisticType,
    target_margin: f64,
    config: &RuleConfig,
) -> Option<f64> {
    PriceSolver::default().solve(purchase_cost, logistic_type, target_margin, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::compute_at_price;
    use crate::rules::{FixedCostLadder, Tier};
    use crate::test_helpers::sample_rules;

    #[test]
    fn infeasible_when_fees_exceed_target() {
        // k = 1 - (0.08 + 0.02 + 0.12) = 0.78 < 0.80
        let cfg = sample_rules();
        let err = PriceSolver::default()
            .solve_detailed(50.0, LogisticType::Full, 0.80, &cfg)
            .unwrap_err();
        assert!(matches!(err, SolveError::Infeasible { .. }));
        assert_eq!(solve(50.0, LogisticType::Full, 0.80, &cfg), None);
    }

    #[test]
    fn basic_solve_stays_in_first_tier() {
        let cfg = sample_rules();
        let sol = PriceSolver::default()
            .solve_detailed(50.0, LogisticType::Full, 0.20, &cfg)
            .unwrap();

        // seed 50 / 0.58 ≈ 86.21, then (50 + 5) / 0.58 ≈ 94.83
        assert!((sol.trajectory[0] - 86.2069).abs() < 1e-3);
        assert_eq!(sol.price, 94.83);
        assert!(sol.converged);
        assert_eq!(sol.iterations, 2);

        let m = compute_at_price(sol.price, Some(50.0), LogisticType::Full, &cfg);
        assert!((m.margin_value_pct - 0.20).abs() <= 0.01);
    }

    #[test]
    fn seller_has_no_solve() {
        let cfg = sample_rules();
        let err = PriceSolver::default()
            .solve_detailed(50.0, LogisticType::Seller, 0.20, &cfg)
            .unwrap_err();
        assert_eq!(err, SolveError::UnsupportedLogistics(LogisticType::Seller));
    }

    #[test]
    fn crossing_into_fallback_tier() {
        // cost 70: seed 70/0.58 ≈ 120.7 lands in the fallback (8)
        let cfg = sample_rules();
        let sol = PriceSolver::default()
            .solve_detailed(70.0, LogisticType::Full, 0.20, &cfg)
            .unwrap();
        assert!(sol.converged);
        assert!((sol.price - round_cents(78.0 / 0.58)).abs() < 1e-9);
    }

    #[test]
    fn rounding_keeps_the_solved_tier() {
        // 45.822 / 0.58 ≈ 79.0034 sits in the fallback (0), but 79.00 would
        // fall back into the <=79 tier (6.75) and miss the target badly.
        let mut cfg = sample_rules();
        cfg.full.ladder = FixedCostLadder::from_validated(vec![
            Tier::FixedValue {
                max_price: 29.0,
                value: 6.25,
            },
            Tier::FixedValue {
                max_price: 50.0,
                value: 6.5,
            },
            Tier::FixedValue {
                max_price: 79.0,
                value: 6.75,
            },
            Tier::Fallback { value: 0.0 },
        ]);
        let sol = PriceSolver::default()
            .solve_detailed(45.822, LogisticType::Full, 0.20, &cfg)
            .unwrap();
        assert!(sol.converged);
        assert_eq!(sol.price, 79.01);

        let m = compute_at_price(sol.price, Some(45.822), LogisticType::Full, &cfg);
        assert_eq!(m.fixed_cost_value, 0.0);
        assert!((m.margin_value_pct - 0.20).abs() <= 0.01);
    }

    #[test]
    fn shipping_on_cost_raises_price() {
        let mut cfg = sample_rules();
        let plain = solve(50.0, LogisticType::Full, 0.20, &cfg).unwrap();
        cfg.defaults.shipping_pct_on_cost = 0.10;
        let with_shipping = solve(50.0, LogisticType::Full, 0.20, &cfg).unwrap();
        assert!(with_shipping > plain);
    }

    #[test]
    fn oscillation_at_boundary_hits_cap_and_returns_estimate() {
        // Up to 100 the tier charges 60, above it nothing: the estimate
        // flips between ~86 and ~190 and never settles.
        let mut cfg = sample_rules();
        cfg.full.ladder = FixedCostLadder::from_validated(vec![
            Tier::FixedValue {
                max_price: 100.0,
                value: 60.0,
            },
            Tier::Fallback { value: 0.0 },
        ]);
        let sol = PriceSolver::default()
            .solve_detailed(50.0, LogisticType::Full, 0.20, &cfg)
            .unwrap();
        assert!(!sol.converged);
        assert!(sol.is_approximate());
        assert_eq!(sol.iterations, 6);
        assert_eq!(sol.trajectory.len(), 7);
    }

    #[test]
    fn custom_settings_are_honoured() {
        let cfg = sample_rules();
        let solver = PriceSolver::new(SolverSettings {
            tolerance: 0.01,
            max_iterations: 1,
        });
        let sol = solver
            .solve_detailed(50.0, LogisticType::Full, 0.20, &cfg)
            .unwrap();
        assert_eq!(sol.iterations, 1);
        assert!(!sol.converged);
    }

    #[test]
    fn negative_cost_rejected() {
        let cfg = sample_rules();
        let err = PriceSolver::default()
            .solve_detailed(-1.0, LogisticType::Full, 0.20, &cfg)
            .unwrap_err();
        assert!(matches!(err, SolveError::InvalidInput(_)));
    }

    #[test]
    fn zero_cost_without_fixed_cost_is_degenerate() {
        let mut cfg = sample_rules();
        cfg.full.ladder = FixedCostLadder::default();
        let err = PriceSolver::default()
            .solve_detailed(0.0, LogisticType::Full, 0.20, &cfg)
            .unwrap_err();
        assert!(matches!(err, SolveError::Degenerate(_)));
    }
}
