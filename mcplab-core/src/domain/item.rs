//! Item records as handed over by the catalog/listing collaborators.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Logistics class of a listing. Each class has its own commission and
/// fixed-cost schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogisticType {
    /// Marketplace-fulfilled (the marketplace warehouses and ships).
    #[serde(alias = "fulfillment", alias = "full")]
    Full,
    /// Seller-fulfilled.
    #[serde(
        alias = "seller",
        alias = "cross_docking",
        alias = "drop_off",
        alias = "xd_drop_off",
        alias = "self_service",
        alias = "NAO_FULL",
        alias = "nao_full"
    )]
    Seller,
}

impl LogisticType {
    pub fn is_full(self) -> bool {
        matches!(self, LogisticType::Full)
    }
}

impl fmt::Display for LogisticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogisticType::Full => write!(f, "FULL"),
            LogisticType::Seller => write!(f, "SELLER"),
        }
    }
}

/// The identifiers an item can be looked up by, in override precedence order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemKeys {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mlb: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gtin: Option<String>,
}

impl ItemKeys {
    pub fn mlb(mlb: &str) -> Self {
        Self {
            mlb: Some(mlb.to_string()),
            ..Self::default()
        }
    }

    /// Non-empty identifiers in precedence order (`mlb`, `sku`, `gtin`).
    pub fn ordered(&self) -> impl Iterator<Item = (KeyKind, &str)> {
        [
            (KeyKind::Mlb, self.mlb.as_deref()),
            (KeyKind::Sku, self.sku.as_deref()),
            (KeyKind::Gtin, self.gtin.as_deref()),
        ]
        .into_iter()
        .filter_map(|(kind, key)| {
            key.map(str::trim)
                .filter(|k| !k.is_empty())
                .map(|k| (kind, k))
        })
    }

    pub fn is_empty(&self) -> bool {
        self.ordered().next().is_none()
    }

    /// The most specific identifier present, for log lines and report keys.
    pub fn primary(&self) -> Option<&str> {
        self.ordered().next().map(|(_, k)| k)
    }
}

/// Which identifier a lookup matched on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyKind {
    Mlb,
    Sku,
    Gtin,
}

/// A listing to evaluate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    #[serde(flatten)]
    pub keys: ItemKeys,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchase_cost: Option<f64>,
    pub logistic_type: LogisticType,
}

/// Reasons an item record cannot be evaluated at all.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ItemError {
    #[error("item has no identifier (mlb, sku or gtin)")]
    MissingIdentifier,
    #[error("item '{key}': price is not a finite number ({price})")]
    InvalidPrice { key: String, price: f64 },
    #[error("item '{key}': purchase cost is not a finite non-negative number ({cost})")]
    InvalidCost { key: String, cost: f64 },
}

impl Item {
    pub fn new(keys: ItemKeys, price: f64, logistic_type: LogisticType) -> Self {
        Self {
            keys,
            price,
            purchase_cost: None,
            logistic_type,
        }
    }

    pub fn with_cost(mut self, cost: f64) -> Self {
        self.purchase_cost = Some(cost);
        self
    }

    /// Check the record is usable. Zero or negative prices are allowed (they
    /// produce an invalid-flagged metrics result); NaN and infinities are not.
    pub fn validate(&self) -> Result<(), ItemError> {
        let key = self.keys.primary().ok_or(ItemError::MissingIdentifier)?;
        if !self.price.is_finite() {
            return Err(ItemError::InvalidPrice {
                key: key.to_string(),
                price: self.price,
            });
        }
        if let Some(cost) = self.purchase_cost {
            if !cost.is_finite() || cost < 0.0 {
                return Err(ItemError::InvalidCost {
                    key: key.to_string(),
                    cost,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_document_record() {
        let item: Item = serde_json::from_str(
            r#"{"mlb": "MLB123", "sku": "SKU-9", "price": 99.9, "purchase_cost": 40.0, "logistic_type": "FULL"}"#,
        )
        .unwrap();
        assert_eq!(item.keys.mlb.as_deref(), Some("MLB123"));
        assert_eq!(item.keys.gtin, None);
        assert_eq!(item.purchase_cost, Some(40.0));
        assert_eq!(item.logistic_type, LogisticType::Full);
    }

    #[test]
    fn marketplace_logistic_aliases() {
        let full: LogisticType = serde_json::from_str(r#""fulfillment""#).unwrap();
        let seller: LogisticType = serde_json::from_str(r#""cross_docking""#).unwrap();
        assert_eq!(full, LogisticType::Full);
        assert_eq!(seller, LogisticType::Seller);
    }

    #[test]
    fn ordered_keys_skip_blanks() {
        let keys = ItemKeys {
            mlb: Some("  ".into()),
            sku: Some("SKU-1".into()),
            gtin: Some("789".into()),
        };
        let ordered: Vec<_> = keys.ordered().collect();
        assert_eq!(ordered, vec![(KeyKind::Sku, "SKU-1"), (KeyKind::Gtin, "789")]);
        assert_eq!(keys.primary(), Some("SKU-1"));
    }

    #[test]
    fn validate_rejects_missing_identifier() {
        let item = Item::new(ItemKeys::default(), 10.0, LogisticType::Seller);
        assert_eq!(item.validate(), Err(ItemError::MissingIdentifier));
    }

    #[test]
    fn validate_rejects_nan_price_but_accepts_zero() {
        let nan = Item::new(ItemKeys::mlb("MLB1"), f64::NAN, LogisticType::Full);
        assert!(matches!(nan.validate(), Err(ItemError::InvalidPrice { .. })));

        let zero = Item::new(ItemKeys::mlb("MLB1"), 0.0, LogisticType::Full);
        assert!(zero.validate().is_ok());
    }

    #[test]
    fn validate_rejects_negative_cost() {
        let item = Item::new(ItemKeys::mlb("MLB1"), 10.0, LogisticType::Full).with_cost(-1.0);
        assert!(matches!(item.validate(), Err(ItemError::InvalidCost { .. })));
    }
}
