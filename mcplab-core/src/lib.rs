//! MCP Lab Core — marketplace listing economics.
//!
//! This crate contains the pure computational core:
//! - Fee-schedule loading and validation (`rules`)
//! - Per-item / per-scenario overrides with validity windows (`overrides`)
//! - Fee breakdown and contribution margin (`metrics`)
//! - Target-margin price solver over a stepped fixed-cost ladder (`solver`)
//! - What-if re-pricing with subsidies (`simulator`)
//!
//! Nothing here performs I/O; documents arrive as JSON text or values and
//! results leave as plain serializable structs.

pub mod domain;
pub mod metrics;
pub mod overrides;
pub mod rules;
pub mod simulator;
pub mod solver;

#[cfg(test)]
mod test_helpers;

pub use domain::{Item, ItemError, ItemKeys, KeyKind, LogisticType};
pub use metrics::MetricsResult;
pub use overrides::{
    merge, Knobs, MatchSource, OverrideEntry, OverrideError, OverrideInvalid, OverrideMatch,
    OverrideSet, Resolution, ValidityWindow,
};
pub use rules::{ConfigError, FixedCostLadder, RuleConfig, Tier};
pub use simulator::{simulate, simulate_with_overrides, FeeDecomposition, Simulation};
pub use solver::{PriceSolution, PriceSolver, SolveError, SolverSettings};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: shared batch inputs and per-item outputs are
    /// Send + Sync, so item evaluation can fan out across worker threads.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<RuleConfig>();
        require_sync::<RuleConfig>();
        require_send::<OverrideSet>();
        require_sync::<OverrideSet>();
        require_send::<Item>();
        require_sync::<Item>();
        require_send::<MetricsResult>();
        require_sync::<MetricsResult>();
        require_send::<PriceSolver>();
        require_sync::<PriceSolver>();
        require_send::<PriceSolution>();
        require_sync::<PriceSolution>();
        require_send::<Simulation>();
        require_sync::<Simulation>();
    }

    #[test]
    fn resolution_is_send_for_parallel_batches() {
        fn require_send<T: Send>(_: &T) {}
        let base = test_helpers::sample_rules();
        let set = OverrideSet::empty();
        let as_of = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let r = set.effective_config(&base, &ItemKeys::mlb("MLB1"), None, as_of);
        require_send(&r);
    }
}
