//! Report export — JSON and CSV.
//!
//! - **JSON**: the full `BatchReport`, with schema versioning
//! - **CSV**: one line per evaluated row, flat columns for spreadsheets
//!
//! Persisted reports carry a `schema_version`; newer versions are rejected on load.

use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::dataset::{BatchReport, DatasetRow, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `BatchReport` to pretty JSON.
pub fn export_json(report: &BatchReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize BatchReport to JSON")
}

/// Deserialize a `BatchReport` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<BatchReport> {
    let report: BatchReport =
        serde_json::from_str(json).context("failed to deserialize BatchReport from JSON")?;
    if report.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            report.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(report)
}

// ─── CSV export ─────────────────────────────────────────────────────

const CSV_HEADER: [&str; 24] = [
    "mlb",
    "sku",
    "gtin",
    "logistic_type",
    "price",
    "evaluated_price",
    "purchase_cost",
    "cost_source",
    "override_source",
    "override_key",
    "campanha_id",
    "comissao",
    "comissao_pct",
    "custo_fixo",
    "imposto",
    "imposto_pct",
    "marketing",
    "marketing_pct",
    "frete",
    "mc_valor",
    "mcp_pct",
    "preco_minimo",
    "preco_maximo",
    "approximate",
];

fn opt(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn text(value: Option<&str>) -> String {
    value.unwrap_or_default().to_string()
}

fn label<T: serde::Serialize>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(s)) => s,
        _ => String::new(),
    }
}

/// Export evaluated rows as CSV. Missing values are empty cells.
pub fn export_rows_csv(rows: &[DatasetRow]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(CSV_HEADER)?;

    for row in rows {
        let m = &row.metrics;
        wtr.write_record([
            text(row.keys.mlb.as_deref()),
            text(row.keys.sku.as_deref()),
            text(row.keys.gtin.as_deref()),
            row.logistic_type.to_string(),
            row.price.to_string(),
            row.evaluated_price.to_string(),
            opt(row.purchase_cost),
            label(&row.cost_source),
            row.override_source.as_ref().map(label).unwrap_or_default(),
            text(row.override_key.as_deref()),
            text(row.campaign_id.as_deref()),
            m.commission_value.to_string(),
            m.commission_pct.to_string(),
            m.fixed_cost_value.to_string(),
            m.tax_value.to_string(),
            m.tax_pct.to_string(),
            m.marketing_value.to_string(),
            m.marketing_pct.to_string(),
            m.shipping_value.to_string(),
            m.margin_value_abs.to_string(),
            m.margin_value_pct.to_string(),
            opt(row.bounds.price_min),
            opt(row.bounds.price_max),
            row.bounds.approximate.to_string(),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── File output ────────────────────────────────────────────────────

/// Write the report as `report.json` and `rows.csv` under `dir`.
pub fn save_report(report: &BatchReport, dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output directory {}", dir.display()))?;

    let json_path = dir.join("report.json");
    std::fs::write(&json_path, export_json(report)?)
        .with_context(|| format!("failed to write {}", json_path.display()))?;

    let csv_path = dir.join("rows.csv");
    std::fs::write(&csv_path, export_rows_csv(&report.rows)?)
        .with_context(|| format!("failed to write {}", csv_path.display()))?;

    Ok(())
}
