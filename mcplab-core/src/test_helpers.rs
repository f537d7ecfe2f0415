//! Shared fixtures for unit tests.

use serde_json::{json, Value};

use crate::domain::{Item, ItemKeys, LogisticType};
use crate::rules::RuleConfig;

/// Rule document used across unit tests: tax 8%, marketing 2%, commission
/// 12% FULL / 14% SELLER, FULL ladder `[<=100 → 5, otherwise → 8]`.
pub fn sample_rules_value() -> Value {
    json!({
        "canal": "mercado_livre",
        "default": {
            "imposto_pct": 0.08,
            "marketing_pct": 0.02,
            "frete_pct_sobre_custo": 0.0,
            "mcp_min": 0.10,
            "mcp_max": 0.30
        },
        "comissao": {"classico_pct": 0.14, "full": 0.12},
        "full": {
            "custo_fixo_por_unidade_brl": [
                {"max_preco": 100.0, "valor": 5.0},
                {"otherwise": true, "valor": 8.0}
            ]
        },
        "nao_full": {
            "custo_fixo_por_unidade_brl": [
                {"max_preco": 79.0, "valor_pct_do_preco": 0.10},
                {"otherwise": true, "valor": 0.0}
            ],
            "frete_gratis_acima_de": {"valor": 79.0}
        }
    })
}

pub fn sample_rules_json() -> String {
    sample_rules_value().to_string()
}

pub fn sample_rules() -> RuleConfig {
    RuleConfig::from_value(&sample_rules_value()).unwrap()
}

pub fn full_item(price: f64, cost: Option<f64>) -> Item {
    Item {
        keys: ItemKeys::mlb("MLB100"),
        price,
        purchase_cost: cost,
        logistic_type: LogisticType::Full,
    }
}

pub fn seller_item(price: f64, cost: Option<f64>) -> Item {
    Item {
        keys: ItemKeys::mlb("MLB200"),
        price,
        purchase_cost: cost,
        logistic_type: LogisticType::Seller,
    }
}
