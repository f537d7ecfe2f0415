//! Golden pricing scenarios.
//!
//! Hand-computed fixtures for the solver, the calculator and the override
//! chain, driven entirely through the public document-loading API.

use chrono::NaiveDate;
use serde_json::json;
use mcplab_core::metrics::compute_at_price;
use mcplab_core::{
    simulate_with_overrides, Item, ItemKeys, LogisticType, MatchSource, MetricsResult,
    OverrideSet, PriceSolver, RuleConfig, SolveError,
};

fn rules() -> RuleConfig {
    RuleConfig::from_json_str(
        r#"{
            "canal": "mercado_livre",
            "default": {
                "imposto_pct": 0.08,
                "marketing_pct": 0.02,
                "frete_pct_sobre_custo": 0.0,
                "mcp_min": 0.10,
                "mcp_max": 0.25
            },
            "comissao": {"classico_pct": 0.14, "full": 0.12, "seller": 0.14},
            "full": {
                "custo_fixo_por_unidade_brl": [
                    {"max_preco": 100, "valor": 5},
                    {"otherwise": true, "valor": 8}
                ]
            },
            "nao_full": {
                "custo_fixo_por_unidade_brl": [
                    {"max_preco": 29.0, "valor": 6.25},
                    {"max_preco": 79.0, "valor_pct_do_preco": 0.08}
                ],
                "frete_gratis_acima_de_79": {"custo_medio": 22.9}
            }
        }"#,
    )
    .unwrap()
}

fn overrides() -> OverrideSet {
    OverrideSet::from_value(&json!({
        "canal": "mercado_livre",
        "cenarios": {
            "campanha_dezembro": {"marketing_pct": 0.08, "comissao_pct": 0.10}
        },
        "por_item": {
            "MLB555": {
                "campanha_id": "DEAL-42",
                "vigencia": {"from": "2024-11-20", "to": "2024-11-30"},
                "marketing_pct": 0.03
            },
            "SKU-777": {"imposto_pct": 0.05}
        }
    }))
    .unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn scenario_infeasible_target() {
    // k = 1 - (0.08 + 0.02 + 0.12) = 0.78, target 0.80
    let cfg = rules();
    let solver = PriceSolver::default();
    assert_eq!(solver.solve(50.0, LogisticType::Full, 0.80, &cfg), None);
    assert!(matches!(
        solver.solve_detailed(50.0, LogisticType::Full, 0.80, &cfg),
        Err(SolveError::Infeasible { .. })
    ));
}

#[test]
fn scenario_basic_solve() {
    let cfg = rules();
    let sol = PriceSolver::default()
        .solve_detailed(50.0, LogisticType::Full, 0.20, &cfg)
        .unwrap();

    assert!((sol.trajectory[0] - 50.0 / 0.58).abs() < 1e-9);
    assert!((sol.price - 94.83).abs() < 1e-9);
    assert!(sol.converged);

    let m = compute_at_price(sol.price, Some(50.0), LogisticType::Full, &cfg);
    assert!((m.margin_value_pct - 0.20).abs() <= 0.01);
    assert_eq!(m.fixed_cost_value, 5.0);
}

#[test]
fn scenario_seller_without_cost() {
    let cfg = rules();
    let item = Item {
        keys: ItemKeys {
            sku: Some("SKU-1".into()),
            ..ItemKeys::default()
        },
        price: 60.0,
        purchase_cost: None,
        logistic_type: LogisticType::Seller,
    };
    let m = MetricsResult::compute(&item, &cfg);
    assert!(!m.has_cost);
    assert_eq!(m.shipping_value, 0.0);

    let net_revenue = 60.0 - m.commission_value - m.fixed_cost_value - m.tax_value - m.marketing_value;
    assert!((m.margin_value_abs - net_revenue).abs() < 1e-12);
    // percent tier: 8% of 60
    assert!((m.fixed_cost_value - 4.8).abs() < 1e-12);
}

#[test]
fn seller_above_last_band_without_fallback_has_no_fixed_cost() {
    let cfg = rules();
    let m = compute_at_price(150.0, Some(40.0), LogisticType::Seller, &cfg);
    assert_eq!(m.fixed_cost_value, 0.0);
}

#[test]
fn seller_bounds_are_not_invented() {
    let cfg = rules();
    assert_eq!(
        PriceSolver::default().solve(50.0, LogisticType::Seller, 0.2, &cfg),
        None
    );
}

#[test]
fn precedence_item_override_beats_scenario() {
    let set = overrides();
    let keys = ItemKeys {
        mlb: Some("MLB555".into()),
        sku: Some("SKU-777".into()),
        gtin: None,
    };
    let m = set
        .resolve(&keys, Some("campanha_dezembro"), date(2024, 11, 25))
        .unwrap();
    assert_eq!(m.source, MatchSource::Mlb);
    assert_eq!(m.knobs().marketing_pct, Some(0.03));
    assert_eq!(m.campaign_id(), Some("DEAL-42"));
}

#[test]
fn temporal_exclusion_moves_down_the_chain() {
    let set = overrides();
    let keys = ItemKeys {
        mlb: Some("MLB555".into()),
        sku: Some("SKU-777".into()),
        gtin: None,
    };
    // MLB555 expired on 2024-11-30; the sku override is next in line.
    let m = set
        .resolve(&keys, Some("campanha_dezembro"), date(2024, 12, 5))
        .unwrap();
    assert_eq!(m.source, MatchSource::Sku);
    assert_eq!(m.knobs().tax_pct, Some(0.05));
}

#[test]
fn scenario_applies_when_no_item_override() {
    let set = overrides();
    let base = rules();
    let r = set.effective_config(
        &base,
        &ItemKeys::mlb("MLB999"),
        Some("campanha_dezembro"),
        date(2024, 12, 5),
    );
    assert_eq!(r.config.defaults.marketing_pct, 0.08);
    assert_eq!(r.config.commission.full_pct, 0.10);
    assert_eq!(r.config.commission.seller_pct, 0.10);
    assert_eq!(r.config.defaults.tax_pct, 0.08);
}

#[test]
fn simulation_reuses_override_resolution() {
    let base = rules();
    let set = overrides();
    let item = Item {
        keys: ItemKeys::mlb("MLB555"),
        price: 100.0,
        purchase_cost: Some(50.0),
        logistic_type: LogisticType::Full,
    };
    let sim = simulate_with_overrides(&item, Some(110.0), 5.0, &base, &set, None, date(2024, 11, 25));
    assert_eq!(sim.override_source, Some(MatchSource::Mlb));
    assert!((sim.decomposition.marketing - 3.3).abs() < 1e-9);
    assert_eq!(sim.decomposition.subsidy_applied, 5.0);
    assert!((sim.price_delta - 10.0).abs() < 1e-9);
}
