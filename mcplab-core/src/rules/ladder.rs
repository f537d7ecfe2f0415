//! Fixed-cost tier ladders.
//!
//! A ladder is an ordered list of price bands. Selection walks the explicit
//! tiers in document order and takes the first whose `max_price` covers the
//! price; the fallback tier (at most one) catches everything above. A ladder
//! without fallback yields no tier, and therefore no fixed cost, past its last
//! explicit band.

use serde::Serialize;

/// One band of a fixed-cost ladder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Tier {
    /// Absolute fixed cost per unit for prices up to `max_price`.
    FixedValue { max_price: f64, value: f64 },
    /// Fixed cost as a fraction of the price, for prices up to `max_price`.
    PercentOfPrice { max_price: f64, pct: f64 },
    /// Catch-all band for prices above every explicit tier.
    Fallback { value: f64 },
}

impl Tier {
    /// Upper price bound of an explicit tier; `None` for the fallback.
    pub fn max_price(&self) -> Option<f64> {
        match self {
            Tier::FixedValue { max_price, .. } | Tier::PercentOfPrice { max_price, .. } => {
                Some(*max_price)
            }
            Tier::Fallback { .. } => None,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Tier::Fallback { .. })
    }

    /// Fixed cost this tier charges at `price`.
    pub fn charge(&self, price: f64) -> f64 {
        match self {
            Tier::FixedValue { value, .. } | Tier::Fallback { value } => *value,
            Tier::PercentOfPrice { pct, .. } => price * pct,
        }
    }
}

/// Ordered fixed-cost bands for one logistics class.
///
/// Construction goes through the loader, which guarantees at most one
/// fallback and non-negative bounds.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FixedCostLadder {
    tiers: Vec<Tier>,
}

impl FixedCostLadder {
    pub(crate) fn from_validated(tiers: Vec<Tier>) -> Self {
        Self { tiers }
    }

    /// A ladder that charges `value` at every price.
    pub fn flat(value: f64) -> Self {
        Self {
            tiers: vec![Tier::Fallback { value }],
        }
    }

    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }

    pub fn fallback(&self) -> Option<&Tier> {
        self.tiers.iter().find(|t| t.is_fallback())
    }

    /// Tier in force at `price`, or `None` when nothing matches.
    pub fn select(&self, price: f64) -> Option<&Tier> {
        self.tiers
            .iter()
            .find(|t| t.max_price().is_some_and(|max| max >= price))
            .or_else(|| self.fallback())
    }

    /// Fixed cost at `price`; zero when no tier matches.
    pub fn fixed_cost(&self, price: f64) -> f64 {
        self.select(price).map_or(0.0, |t| t.charge(price))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ladder() -> FixedCostLadder {
        FixedCostLadder::from_validated(vec![
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
        ])
    }

    #[test]
    fn first_covering_tier_wins() {
        let l = ladder();
        assert_eq!(l.fixed_cost(10.0), 6.25);
        assert_eq!(l.fixed_cost(29.0), 6.25); // bound is inclusive
        assert_eq!(l.fixed_cost(29.01), 6.5);
        assert_eq!(l.fixed_cost(79.0), 6.75);
    }

    #[test]
    fn fallback_above_last_band() {
        let l = ladder();
        assert_eq!(l.select(500.0), Some(&Tier::Fallback { value: 0.0 }));
    }

    #[test]
    fn document_order_not_sorted_order() {
        // An unsorted ladder still picks the first covering tier as written.
        let l = FixedCostLadder::from_validated(vec![
            Tier::FixedValue {
                max_price: 100.0,
                value: 9.0,
            },
            Tier::FixedValue {
                max_price: 50.0,
                value: 3.0,
            },
        ]);
        assert_eq!(l.fixed_cost(40.0), 9.0);
    }

    #[test]
    fn no_fallback_means_no_tier() {
        let l = FixedCostLadder::from_validated(vec![Tier::FixedValue {
            max_price: 79.0,
            value: 6.0,
        }]);
        assert_eq!(l.select(80.0), None);
        assert_eq!(l.fixed_cost(80.0), 0.0);
    }

    #[test]
    fn percent_tier_scales_with_price() {
        let l = FixedCostLadder::from_validated(vec![
            Tier::PercentOfPrice {
                max_price: 79.0,
                pct: 0.1,
            },
            Tier::Fallback { value: 12.0 },
        ]);
        assert!((l.fixed_cost(50.0) - 5.0).abs() < 1e-12);
        assert_eq!(l.fixed_cost(80.0), 12.0);
    }

    #[test]
    fn fallback_position_does_not_shadow_explicit_tiers() {
        let l = FixedCostLadder::from_validated(vec![
            Tier::Fallback { value: 20.0 },
            Tier::FixedValue {
                max_price: 100.0,
                value: 5.0,
            },
        ]);
        assert_eq!(l.fixed_cost(60.0), 5.0);
        assert_eq!(l.fixed_cost(160.0), 20.0);
    }

    #[test]
    fn flat_ladder_charges_everywhere() {
        let l = FixedCostLadder::flat(4.0);
        assert_eq!(l.fixed_cost(0.0), 4.0);
        assert_eq!(l.fixed_cost(10_000.0), 4.0);
    }
}
