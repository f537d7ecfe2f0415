//! MCP Lab Runner — batch evaluation over `mcplab-core`.
//!
//! This crate builds on `mcplab-core` to provide:
//! - Cost catalog collaborator trait and an in-memory cost table
//! - Dataset builder: cost, overrides, metrics and price bounds per item
//! - TOML batch configuration naming the input documents
//! - JSON and CSV export of batch reports

pub mod catalog;
pub mod config;
pub mod dataset;
pub mod export;

pub use catalog::{CatalogError, CostCatalog, CostTable};
pub use config::{load_items, load_overrides, load_rules, BatchConfig, BatchConfigError, BatchInputs};
pub use dataset::{
    BatchReport, BatchSummary, BoundStatus, CostSource, DatasetBuilder, DatasetRow, PriceBounds,
    RejectedItem, SCHEMA_VERSION,
};
pub use export::{export_json, export_rows_csv, import_json, save_report};
