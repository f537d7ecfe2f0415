//! Purchase-cost lookup — the catalog collaborator seen by the dataset builder.
//!
//! The real catalog lives outside this workspace; the builder only needs
//! "cost for this item, if known". `CostTable` is the in-memory
//! implementation used by the CLI and tests, loadable from JSON or CSV.

use std::collections::HashMap;
use std::path::Path;

use mcplab_core::ItemKeys;
use serde::Deserialize;
use thiserror::Error;

/// Source of purchase costs, shared read-only across worker threads.
pub trait CostCatalog: Send + Sync {
    /// Cost for the item, looked up by its identifiers.
    fn purchase_cost(&self, keys: &ItemKeys) -> Option<f64>;
}

/// Errors loading a cost table.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read cost file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid cost JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid cost CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("cost for '{key}' must be a finite non-negative number, got {value}")]
    InvalidCost { key: String, value: f64 },
}

/// Costs keyed by any item identifier (mlb, sku or gtin).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CostTable {
    costs: HashMap<String, f64>,
}

#[derive(Debug, Deserialize)]
struct CsvCostRow {
    key: String,
    purchase_cost: f64,
}

impl CostTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, cost: f64) -> Result<(), CatalogError> {
        let key = key.into().trim().to_string();
        if !cost.is_finite() || cost < 0.0 {
            return Err(CatalogError::InvalidCost { key, value: cost });
        }
        self.costs.insert(key, cost);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.costs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.costs.is_empty()
    }

    /// Parse a JSON object `{ "<key>": cost, ... }`.
    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let raw: HashMap<String, f64> = serde_json::from_str(json)?;
        let mut table = Self::new();
        for (key, cost) in raw {
            table.insert(key, cost)?;
        }
        Ok(table)
    }

    /// Parse CSV with a `key,purchase_cost` header.
    pub fn from_csv_str(data: &str) -> Result<Self, CatalogError> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(data.as_bytes());
        let mut table = Self::new();
        for row in reader.deserialize::<CsvCostRow>() {
            let row = row?;
            table.insert(row.key, row.purchase_cost)?;
        }
        Ok(table)
    }

    /// Load from a `.csv` or `.json` file, chosen by extension.
    pub fn from_path(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let is_csv = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
        if is_csv {
            Self::from_csv_str(&content)
        } else {
            Self::from_json_str(&content)
        }
    }
}

impl CostCatalog for CostTable {
    fn purchase_cost(&self, keys: &ItemKeys) -> Option<f64> {
        keys.ordered().find_map(|(_, key)| self.costs.get(key).copied())
    }
}

impl CostCatalog for HashMap<String, f64> {
    fn purchase_cost(&self, keys: &ItemKeys) -> Option<f64> {
        keys.ordered().find_map(|(_, key)| self.get(key).copied())
    }
}
