//! Batch configuration — a TOML file naming the input documents for one run.
//!
//! ```toml
//! rules = "rules.json"
//! overrides = "overrides.json"   # optional
//! costs = "costs.csv"            # optional, .csv or .json
//! items = "items.json"
//! scenario = "campanha_dezembro" # optional
//! as_of = "2024-11-25"           # optional, defaults to today
//! parallel = true
//!
//! [solver]
//! tolerance = 0.01
//! max_iterations = 6
//! ```
//!
//! Relative paths are resolved against the directory holding the config file.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use mcplab_core::{ConfigError, Item, OverrideError, OverrideSet, RuleConfig, SolverSettings};

use crate::catalog::{CatalogError, CostTable};
use crate::dataset::{BatchReport, DatasetBuilder};

/// Errors loading a batch configuration or any document it names.
#[derive(Debug, Error)]
pub enum BatchConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid batch config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid rule config {path}: {source}")]
    Rules {
        path: String,
        #[source]
        source: ConfigError,
    },
    #[error("invalid override document {path}: {source}")]
    Overrides {
        path: String,
        #[source]
        source: OverrideError,
    },
    #[error(transparent)]
    Costs(#[from] CatalogError),
    #[error("invalid items file {path}: {source}")]
    Items {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid solver settings: {0}")]
    Solver(String),
}

/// `[solver]` table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSection {
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for SolverSection {
    fn default() -> Self {
        let defaults = SolverSettings::default();
        Self {
            tolerance: defaults.tolerance,
            max_iterations: defaults.max_iterations,
        }
    }
}

impl From<SolverSection> for SolverSettings {
    fn from(s: SolverSection) -> Self {
        SolverSettings {
            tolerance: s.tolerance,
            max_iterations: s.max_iterations,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchConfig {
    pub rules: PathBuf,
    #[serde(default)]
    pub overrides: Option<PathBuf>,
    #[serde(default)]
    pub costs: Option<PathBuf>,
    pub items: PathBuf,
    #[serde(default)]
    pub scenario: Option<String>,
    #[serde(default)]
    pub as_of: Option<NaiveDate>,
    #[serde(default)]
    pub parallel: bool,
    #[serde(default)]
    pub solver: SolverSection,
}

/// Documents loaded from a `BatchConfig`.
#[derive(Debug, Clone)]
pub struct BatchInputs {
    pub rules: RuleConfig,
    pub overrides: OverrideSet,
    pub costs: Option<CostTable>,
    pub items: Vec<Item>,
}

impl BatchConfig {
    /// Parse TOML; relative paths are resolved against `base_dir`.
    pub fn from_toml(content: &str, base_dir: &Path) -> Result<Self, BatchConfigError> {
        let mut config: BatchConfig = toml::from_str(content)?;
        config.resolve_paths(base_dir);
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, BatchConfigError> {
        let content = read(path)?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_toml(&content, base_dir)
    }

    fn resolve_paths(&mut self, base_dir: &Path) {
        let join = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base_dir.join(&*p);
            }
        };
        join(&mut self.rules);
        join(&mut self.items);
        if let Some(p) = self.overrides.as_mut() {
            join(p);
        }
        if let Some(p) = self.costs.as_mut() {
            join(p);
        }
    }

    fn validate(&self) -> Result<(), BatchConfigError> {
        let s = self.solver;
        if !s.tolerance.is_finite() || s.tolerance <= 0.0 {
            return Err(BatchConfigError::Solver(format!(
                "tolerance must be positive, got {}",
                s.tolerance
            )));
        }
        if s.max_iterations == 0 {
            return Err(BatchConfigError::Solver("max_iterations must be at least 1".into()));
        }
        Ok(())
    }

    /// The evaluation date, defaulting to today's local date.
    pub fn effective_as_of(&self) -> NaiveDate {
        self.as_of
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }

    /// Load every document the config names.
    pub fn load_inputs(&self) -> Result<BatchInputs, BatchConfigError> {
        let rules = load_rules(&self.rules)?;
        let overrides = match &self.overrides {
            Some(path) => load_overrides(path)?,
            None => OverrideSet::empty(),
        };
        let costs = self
            .costs
            .as_deref()
            .map(CostTable::from_path)
            .transpose()?;
        let items = load_items(&self.items)?;
        Ok(BatchInputs {
            rules,
            overrides,
            costs,
            items,
        })
    }

    /// Load inputs and run the dataset builder over them.
    pub fn run(&self) -> Result<BatchReport, BatchConfigError> {
        let inputs = self.load_inputs()?;
        let mut builder = DatasetBuilder::new(&inputs.rules, &inputs.overrides, self.effective_as_of())
            .with_scenario(self.scenario.clone())
            .with_solver(self.solver.into())
            .with_parallelism(self.parallel);
        if let Some(costs) = &inputs.costs {
            builder = builder.with_catalog(costs);
        }
        Ok(builder.build(&inputs.items))
    }
}

fn read(path: &Path) -> Result<String, BatchConfigError> {
    std::fs::read_to_string(path).map_err(|source| BatchConfigError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Load and validate a rule config document.
pub fn load_rules(path: &Path) -> Result<RuleConfig, BatchConfigError> {
    RuleConfig::from_json_str(&read(path)?).map_err(|source| BatchConfigError::Rules {
        path: path.display().to_string(),
        source,
    })
}

/// Load an override document.
pub fn load_overrides(path: &Path) -> Result<OverrideSet, BatchConfigError> {
    OverrideSet::from_json_str(&read(path)?).map_err(|source| BatchConfigError::Overrides {
        path: path.display().to_string(),
        source,
    })
}

/// Load a JSON array of item records.
pub fn load_items(path: &Path) -> Result<Vec<Item>, BatchConfigError> {
    serde_json::from_str(&read(path)?).map_err(|source| BatchConfigError::Items {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_gets_defaults() {
        let cfg = BatchConfig::from_toml(
            r#"
            rules = "rules.json"
            items = "items.json"
            "#,
            Path::new("/data/run"),
        )
        .unwrap();
        assert_eq!(cfg.rules, PathBuf::from("/data/run/rules.json"));
        assert_eq!(cfg.overrides, None);
        assert!(!cfg.parallel);
        assert_eq!(SolverSettings::from(cfg.solver), SolverSettings::default());
    }

    #[test]
    fn absolute_paths_are_kept() {
        let cfg = BatchConfig::from_toml(
            r#"
            rules = "/etc/mcplab/rules.json"
            items = "items.json"
            costs = "costs/costs.csv"
            as_of = "2024-11-25"

            [solver]
            max_iterations = 10
            "#,
            Path::new("/data/run"),
        )
        .unwrap();
        assert_eq!(cfg.rules, PathBuf::from("/etc/mcplab/rules.json"));
        assert_eq!(cfg.costs, Some(PathBuf::from("/data/run/costs/costs.csv")));
        assert_eq!(cfg.effective_as_of(), NaiveDate::from_ymd_opt(2024, 11, 25).unwrap());
        assert_eq!(cfg.solver.max_iterations, 10);
        assert_eq!(cfg.solver.tolerance, 0.01);
    }

    #[test]
    fn zero_iterations_rejected() {
        let err = BatchConfig::from_toml(
            "rules = \"r.json\"\nitems = \"i.json\"\n[solver]\nmax_iterations = 0\n",
            Path::new("."),
        )
        .unwrap_err();
        assert!(matches!(err, BatchConfigError::Solver(_)));
    }

    #[test]
    fn missing_items_key_is_a_toml_error() {
        let err = BatchConfig::from_toml("rules = \"r.json\"\n", Path::new(".")).unwrap_err();
        assert!(matches!(err, BatchConfigError::Toml(_)));
    }
}
